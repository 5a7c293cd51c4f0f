use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database::models::{AccessGrant, AccessLevel, NewProject, NewUser, Project, User};
use crate::database::store::{AccessStore, Entity, HealthCheck, ProjectStore, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    grants: Vec<AccessGrant>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps keep "newest first" ordering total
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }
}

/// In-process store with the same semantics as the Postgres schema,
/// including cascades and the unique `(project_id, user_id)` grant key.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a project row while leaving its grants behind, reproducing a
    /// dangling grant the way a corrupted database would hold one.
    pub async fn remove_project_without_cascade(&self, id: i64) {
        let mut tables = self.tables.write().await;
        tables.projects.retain(|p| p.id != id);
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == project.owner_id) {
            return Err(StoreError::NotFound(Entity::User));
        }
        let now = tables.now();
        let created = Project {
            id: tables.next_id(),
            name: project.name,
            description: project.description,
            owner_id: project.owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(created.clone());
        Ok(created)
    }

    async fn find_project(&self, id: i64) -> Result<Project, StoreError> {
        let tables = self.tables.read().await;
        tables
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(Entity::Project))
    }

    async fn find_project_by_name(&self, owner_id: i64, name: &str) -> Result<Option<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .iter()
            .find(|p| p.owner_id == owner_id && p.name == name)
            .cloned())
    }

    async fn update_project(&self, project: &Project) -> Result<Project, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.now();
        let stored = tables
            .projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or(StoreError::NotFound(Entity::Project))?;
        stored.name = project.name.clone();
        stored.description = project.description.clone();
        stored.updated_at = now;
        Ok(stored.clone())
    }

    async fn delete_project(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.projects.len();
        tables.projects.retain(|p| p.id != id);
        if tables.projects.len() == before {
            return Err(StoreError::NotFound(Entity::Project));
        }
        tables.grants.retain(|g| g.project_id != id);
        Ok(())
    }

    async fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(projects)
    }

    async fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;
        let mut projects = tables.projects.clone();
        projects.sort_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(projects
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn create_grant(&self, project_id: i64, user_id: i64, level: AccessLevel) -> Result<AccessGrant, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .grants
            .iter()
            .any(|g| g.project_id == project_id && g.user_id == user_id)
        {
            return Err(StoreError::Conflict("user already has access to this project".to_string()));
        }
        let now = tables.now();
        let grant = AccessGrant {
            id: tables.next_id(),
            project_id,
            user_id,
            level,
            created_at: now,
            updated_at: now,
        };
        tables.grants.push(grant.clone());
        Ok(grant)
    }

    async fn find_grant(&self, id: i64) -> Result<AccessGrant, StoreError> {
        let tables = self.tables.read().await;
        tables
            .grants
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(Entity::Grant))
    }

    async fn find_grant_for(&self, project_id: i64, user_id: i64) -> Result<Option<AccessGrant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .find(|g| g.project_id == project_id && g.user_id == user_id)
            .cloned())
    }

    async fn update_grant_level(&self, id: i64, level: AccessLevel) -> Result<AccessGrant, StoreError> {
        let mut tables = self.tables.write().await;
        let now = tables.now();
        let grant = tables
            .grants
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound(Entity::Grant))?;
        grant.level = level;
        grant.updated_at = now;
        Ok(grant.clone())
    }

    async fn delete_grant(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.grants.len();
        tables.grants.retain(|g| g.id != id);
        if tables.grants.len() == before {
            return Err(StoreError::NotFound(Entity::Grant));
        }
        Ok(())
    }

    async fn list_grants_by_project(&self, project_id: i64) -> Result<Vec<AccessGrant>, StoreError> {
        let tables = self.tables.read().await;
        let mut grants: Vec<AccessGrant> = tables
            .grants
            .iter()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| Reverse((g.created_at, g.id)));
        Ok(grants)
    }

    async fn list_grants_by_user(&self, user_id: i64) -> Result<Vec<AccessGrant>, StoreError> {
        let tables = self.tables.read().await;
        let mut grants: Vec<AccessGrant> = tables
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| Reverse((g.created_at, g.id)));
        Ok(grants)
    }

    async fn granted_project_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .map(|g| g.project_id)
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::Conflict("username or email already registered".to_string()));
        }
        let now = tables.now();
        let created = User {
            id: tables.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> Result<User, StoreError> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(Entity::User))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
