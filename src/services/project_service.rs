use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::database::models::{NewProject, Project};
use crate::database::store::ProjectStore;
use crate::services::error::AccessError;
use crate::services::visibility::PageRequest;

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    /// Absent or empty keeps the current name
    #[serde(default)]
    pub name: Option<String>,
    /// Always replaces the current description
    #[serde(default)]
    pub description: String,
}

fn validate_name(name: &str) -> Result<(), AccessError> {
    let len = name.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(AccessError::validation(
            "name",
            format!("must be between {} and {} characters", NAME_MIN, NAME_MAX),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AccessError> {
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(AccessError::validation(
            "description",
            format!("must be at most {} characters", DESCRIPTION_MAX),
        ));
    }
    Ok(())
}

/// Project CRUD. Authorization is the caller's job (see `services::guard`).
#[derive(Clone)]
pub struct ProjectService {
    projects: Arc<dyn ProjectStore>,
}

impl ProjectService {
    pub fn new(projects: Arc<dyn ProjectStore>) -> Self {
        Self { projects }
    }

    pub async fn create(&self, owner_id: i64, input: ProjectCreate) -> Result<Project, AccessError> {
        let name = input.name.trim().to_string();
        validate_name(&name)?;
        validate_description(&input.description)?;

        if self.projects.find_project_by_name(owner_id, &name).await?.is_some() {
            return Err(AccessError::Conflict {
                reason: "project with this name already exists".to_string(),
            });
        }

        let project = self
            .projects
            .create_project(NewProject {
                name,
                description: input.description,
                owner_id,
            })
            .await?;
        info!(project_id = project.id, owner_id, "Created project");
        Ok(project)
    }

    pub async fn get(&self, id: i64) -> Result<Project, AccessError> {
        Ok(self.projects.find_project(id).await?)
    }

    pub async fn update(&self, id: i64, input: ProjectUpdate) -> Result<Project, AccessError> {
        let mut project = self.projects.find_project(id).await?;

        if let Some(name) = input.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            validate_name(&name)?;
            project.name = name;
        }
        validate_description(&input.description)?;
        project.description = input.description;

        Ok(self.projects.update_project(&project).await?)
    }

    /// Removes the project; its grants and suites go with it
    pub async fn delete(&self, id: i64) -> Result<(), AccessError> {
        self.projects.delete_project(id).await?;
        info!(project_id = id, "Deleted project");
        Ok(())
    }

    /// Every project, newest first. Reserved for admins.
    pub async fn list(&self, page: i64, page_size: i64) -> Result<Vec<Project>, AccessError> {
        let page = PageRequest::new(page, page_size);
        Ok(self.projects.list_projects(page.page_size, page.offset()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_is_bounded() {
        assert!(validate_name("ab").is_err());
        assert!(validate_name("abc").is_ok());
        assert!(validate_name(&"x".repeat(100)).is_ok());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn description_length_is_bounded() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"d".repeat(500)).is_ok());
        match validate_description(&"d".repeat(501)) {
            Err(AccessError::Validation { field, .. }) => assert_eq!(field, "description"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
