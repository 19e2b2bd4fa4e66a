//! Per-request authentication context

use std::net::IpAddr;

use axum::http::HeaderMap;
use platform::client::{ClientInfo, extract_client_info, extract_client_ip};
use platform::cookie::extract_cookie;

use crate::application::config::AuthConfig;

/// Everything a flow needs to know about the caller, extracted once at
/// the edge and passed explicitly
///
/// Flows never reach back into headers; if a flow needs a request fact,
/// it is a field here.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub client: ClientInfo,
    /// Raw session cookie value, if the request carried one
    pub session_token: Option<String>,
    /// Raw pending-verification cookie value, if present
    pub pending_token: Option<String>,
    /// CSRF token from the `X-CSRF-Token`/`X-XSRF-Token` header, if any
    pub csrf_header: Option<String>,
}

impl AuthContext {
    /// Build the context from request headers
    pub fn from_request(
        config: &AuthConfig,
        headers: &HeaderMap,
        direct_ip: Option<IpAddr>,
    ) -> Self {
        let ip = extract_client_ip(headers, direct_ip);
        let client = extract_client_info(headers, ip);

        let csrf_header = headers
            .get("x-csrf-token")
            .or_else(|| headers.get("x-xsrf-token"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self {
            client,
            session_token: extract_cookie(headers, &config.session_cookie.name),
            pending_token: extract_cookie(headers, &config.pending_cookie.name),
            csrf_header,
        }
    }

    /// Key used for rate-limit windows
    pub fn rate_limit_key(&self) -> String {
        self.client.rate_limit_key()
    }
}
