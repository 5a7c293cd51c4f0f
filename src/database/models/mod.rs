pub mod access;
pub mod project;
pub mod user;

pub use access::{AccessGrant, AccessLevel};
pub use project::{NewProject, Project};
pub use user::{NewUser, Role, User};
