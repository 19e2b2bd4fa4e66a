pub mod challenge;
pub mod credential;
pub mod session;
pub mod user;

pub use challenge::PendingChallenge;
pub use credential::Credential;
pub use session::{ActivityStatus, DegradedSession, SessionInfo, UserSession};
pub use user::User;
