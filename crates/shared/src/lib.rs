//! Shared Kernel - Domain-crossing minimal core
//!
//! The smallest common vocabulary shared by every crate in the workspace:
//! - Unified error type and result alias
//! - Typed ID wrappers for domain entities
//!
//! **Design Principle**: only things that are hard to change and mean the
//! same thing in every domain belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;

    pub use app_error::{AppError, AppResult, OptionExt, ResultExt};
    pub use kind::ErrorKind;
}
pub mod id;
