use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{AccessGrant, AccessLevel, NewProject, NewUser, Project, User};

/// Kind of row a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Project,
    User,
    Grant,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Project => f.write_str("project"),
            Entity::User => f.write_str("user"),
            Entity::Grant => f.write_str("access grant"),
        }
    }
}

/// Errors surfaced by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for projects. No authorization happens here.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;

    async fn find_project(&self, id: i64) -> Result<Project, StoreError>;

    async fn find_project_by_name(&self, owner_id: i64, name: &str) -> Result<Option<Project>, StoreError>;

    /// Persists name and description; `updated_at` is refreshed by the store.
    async fn update_project(&self, project: &Project) -> Result<Project, StoreError>;

    /// Deletes the project together with its grants and suites.
    async fn delete_project(&self, id: i64) -> Result<(), StoreError>;

    /// Most recently created first.
    async fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, StoreError>;

    /// Unfiltered listing, most recently created first.
    async fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, StoreError>;
}

/// Persistence for access grants.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Check-then-insert. A duplicate `(project_id, user_id)` pair, whether
    /// caught by the check or by the unique index, is `StoreError::Conflict`.
    async fn create_grant(&self, project_id: i64, user_id: i64, level: AccessLevel) -> Result<AccessGrant, StoreError>;

    async fn find_grant(&self, id: i64) -> Result<AccessGrant, StoreError>;

    async fn find_grant_for(&self, project_id: i64, user_id: i64) -> Result<Option<AccessGrant>, StoreError>;

    async fn update_grant_level(&self, id: i64, level: AccessLevel) -> Result<AccessGrant, StoreError>;

    async fn delete_grant(&self, id: i64) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_grants_by_project(&self, project_id: i64) -> Result<Vec<AccessGrant>, StoreError>;

    /// Newest first.
    async fn list_grants_by_user(&self, user_id: i64) -> Result<Vec<AccessGrant>, StoreError>;

    /// Ids of every project the user holds a grant on, in grant insertion order.
    async fn granted_project_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Duplicate email or username is `StoreError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: i64) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}
