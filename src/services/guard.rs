// Admin override, applied once at the request boundary on top of the
// role-agnostic AccessDirectory: effective = is_admin(role) || directory.has_x(..)

use crate::database::models::Role;
use crate::services::access_service::AccessDirectory;
use crate::services::error::AccessError;

/// Who is asking, as carried by a validated bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Project existence is checked before the role, so a missing project is
/// NotFound for admins too.
pub async fn require_view(directory: &AccessDirectory, identity: Identity, project_id: i64) -> Result<(), AccessError> {
    let allowed = directory.has_view_access(project_id, identity.user_id).await?;
    if !allowed && !identity.role.is_admin() {
        return Err(AccessError::permission_denied("you don't have permission to view this project"));
    }
    Ok(())
}

pub async fn require_edit(directory: &AccessDirectory, identity: Identity, project_id: i64) -> Result<(), AccessError> {
    let allowed = directory.has_edit_access(project_id, identity.user_id).await?;
    if !allowed && !identity.role.is_admin() {
        return Err(AccessError::permission_denied("you don't have permission to update this project"));
    }
    Ok(())
}

/// Owner or admin; used for project deletion
pub async fn require_owner(directory: &AccessDirectory, identity: Identity, project_id: i64) -> Result<(), AccessError> {
    let allowed = directory.is_owner(project_id, identity.user_id).await?;
    if !allowed && !identity.role.is_admin() {
        return Err(AccessError::permission_denied("you don't have permission to delete this project"));
    }
    Ok(())
}

/// Strict owner check with no admin override; used for grant management
pub async fn require_strict_owner(
    directory: &AccessDirectory,
    identity: Identity,
    project_id: i64,
) -> Result<(), AccessError> {
    if !directory.is_owner(project_id, identity.user_id).await? {
        return Err(AccessError::permission_denied(
            "only the project owner may manage access to this project",
        ));
    }
    Ok(())
}
