pub mod access_service;
pub mod auth_service;
pub mod error;
pub mod guard;
pub mod project_service;
pub mod visibility;

pub use access_service::AccessDirectory;
pub use auth_service::{AuthError, AuthService};
pub use error::AccessError;
pub use guard::Identity;
pub use project_service::ProjectService;
pub use visibility::{DanglingGrantObserver, LogDanglingGrants, PageRequest, VisibilityResolver};
