//! Client identification utilities
//!
//! Common functions for identifying clients via HTTP headers. Sessions
//! record the device descriptor and origin address; the rate limiter keys
//! its windows off the same identity.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

use crate::crypto::sha256;

/// Client identity derived from request headers
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Client IP address (from X-Forwarded-For or direct connection)
    pub ip: Option<IpAddr>,
    /// User-Agent string, used as the device descriptor
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }

    /// Get IP as string (for database storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }

    /// Device descriptor for session metadata
    pub fn device(&self) -> Option<String> {
        self.user_agent.clone()
    }

    /// Stable key for rate-limit windows
    ///
    /// Prefers the origin IP; falls back to a hash of the User-Agent so a
    /// proxy that strips connection info still gets per-device throttling.
    pub fn rate_limit_key(&self) -> String {
        if let Some(ip) = self.ip {
            return ip.to_string();
        }
        match &self.user_agent {
            Some(ua) => {
                let hash = sha256(ua.as_bytes());
                format!("ua:{}", crate::crypto::to_base64_url(&hash[..12]))
            }
            None => "anonymous".to_string(),
        }
    }
}

/// Extract client identity from request headers
///
/// Unlike strict fingerprinting, a missing User-Agent is tolerated; the
/// descriptor is only metadata for session listings.
pub fn extract_client_info(headers: &HeaderMap, client_ip: Option<IpAddr>) -> ClientInfo {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    ClientInfo::new(client_ip, user_agent)
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For first (for reverse proxy setups), then falls
/// back to the direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    // X-Forwarded-For: first IP in the list is the originating client
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}
