use std::sync::Arc;

use tracing::info;

use crate::database::models::{AccessGrant, AccessLevel, Project};
use crate::database::store::{AccessStore, Entity, ProjectStore, UserStore};
use crate::services::error::AccessError;

/// Authoritative answer to "what can user U do on project P".
///
/// Ownership is derived from `projects.owner_id` on every call and never
/// stored as a grant. The directory knows nothing about roles: the admin
/// override is applied by [`crate::services::guard`].
#[derive(Clone)]
pub struct AccessDirectory {
    projects: Arc<dyn ProjectStore>,
    grants: Arc<dyn AccessStore>,
    users: Arc<dyn UserStore>,
}

impl AccessDirectory {
    pub fn new(projects: Arc<dyn ProjectStore>, grants: Arc<dyn AccessStore>, users: Arc<dyn UserStore>) -> Self {
        Self { projects, grants, users }
    }

    /// Load the project and fail unless `user_id` owns it
    async fn owned_project(&self, project_id: i64, user_id: i64, action: &str) -> Result<Project, AccessError> {
        let project = self.projects.find_project(project_id).await?;
        if project.owner_id != user_id {
            return Err(AccessError::permission_denied(format!(
                "only the project owner may {} access",
                action
            )));
        }
        Ok(project)
    }

    /// Grant `target_user_id` access to a project owned by `granter_id`
    pub async fn grant_access(
        &self,
        project_id: i64,
        granter_id: i64,
        target_user_id: i64,
        level: AccessLevel,
    ) -> Result<AccessGrant, AccessError> {
        let project = self.owned_project(project_id, granter_id, "grant").await?;

        if target_user_id == project.owner_id {
            return Err(AccessError::validation(
                "user_id",
                "the project owner already has full access and cannot be granted access",
            ));
        }

        self.users.find_user(target_user_id).await?;

        let grant = self.grants.create_grant(project_id, target_user_id, level).await?;
        info!(
            project_id,
            user_id = target_user_id,
            level = %level,
            grant_id = grant.id,
            "Granted project access"
        );
        Ok(grant)
    }

    /// Change the level of an existing grant. The requester must own the
    /// grant's project at the time of the call.
    pub async fn update_access(
        &self,
        access_id: i64,
        requester_id: i64,
        level: AccessLevel,
    ) -> Result<AccessGrant, AccessError> {
        let grant = self.grants.find_grant(access_id).await?;
        self.owned_project(grant.project_id, requester_id, "update").await?;

        let updated = self.grants.update_grant_level(access_id, level).await?;
        info!(
            project_id = updated.project_id,
            grant_id = access_id,
            level = %level,
            "Updated project access"
        );
        Ok(updated)
    }

    pub async fn revoke_access(&self, access_id: i64, requester_id: i64) -> Result<(), AccessError> {
        let grant = self.grants.find_grant(access_id).await?;
        self.owned_project(grant.project_id, requester_id, "revoke").await?;

        self.grants.delete_grant(access_id).await?;
        info!(
            project_id = grant.project_id,
            user_id = grant.user_id,
            grant_id = access_id,
            "Revoked project access"
        );
        Ok(())
    }

    /// Owner, or any grant. Edit grants count as view access.
    pub async fn has_view_access(&self, project_id: i64, user_id: i64) -> Result<bool, AccessError> {
        let project = self.projects.find_project(project_id).await?;
        if project.owner_id == user_id {
            return Ok(true);
        }
        let grant = self.grants.find_grant_for(project_id, user_id).await?;
        Ok(matches!(
            grant.map(|g| g.level),
            Some(AccessLevel::View) | Some(AccessLevel::Edit)
        ))
    }

    /// Owner, or a grant at the edit level.
    pub async fn has_edit_access(&self, project_id: i64, user_id: i64) -> Result<bool, AccessError> {
        let project = self.projects.find_project(project_id).await?;
        if project.owner_id == user_id {
            return Ok(true);
        }
        let grant = self.grants.find_grant_for(project_id, user_id).await?;
        Ok(matches!(grant.map(|g| g.level), Some(AccessLevel::Edit)))
    }

    pub async fn is_owner(&self, project_id: i64, user_id: i64) -> Result<bool, AccessError> {
        let project = self.projects.find_project(project_id).await?;
        Ok(project.owner_id == user_id)
    }

    /// All grants on a project, newest first. Callers check ownership.
    pub async fn list_grants(&self, project_id: i64) -> Result<Vec<AccessGrant>, AccessError> {
        Ok(self.grants.list_grants_by_project(project_id).await?)
    }

    /// All grants held by a user, newest first
    pub async fn list_user_grants(&self, user_id: i64) -> Result<Vec<AccessGrant>, AccessError> {
        Ok(self.grants.list_grants_by_user(user_id).await?)
    }

    /// Resolve a grant addressed as `/projects/:project_id/access/:access_id`.
    /// A grant belonging to a different project is reported as missing.
    pub async fn grant_in_project(&self, project_id: i64, access_id: i64) -> Result<AccessGrant, AccessError> {
        let grant = self.grants.find_grant(access_id).await?;
        if grant.project_id != project_id {
            return Err(AccessError::not_found(Entity::Grant));
        }
        Ok(grant)
    }
}
