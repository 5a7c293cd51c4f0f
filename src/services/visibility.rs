use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::database::models::Project;
use crate::database::store::{AccessStore, ProjectStore, StoreError};
use crate::services::error::AccessError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// 1-based page request, normalized on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Non-positive values fall back to page 1 and a page size of 10.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: if page < 1 { DEFAULT_PAGE } else { page },
            page_size: if page_size < 1 { DEFAULT_PAGE_SIZE } else { page_size },
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Slice `[offset, offset + page_size)` of `items`, clamped to its length
    pub fn slice<T>(&self, mut items: Vec<T>) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        if start >= items.len() {
            return Vec::new();
        }
        let end = start.saturating_add(self.page_size as usize).min(items.len());
        items.truncate(end);
        items.split_off(start)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

/// Notified when a granted project id cannot be resolved to a project.
pub trait DanglingGrantObserver: Send + Sync {
    fn dangling_grant(&self, user_id: i64, project_id: i64, error: &StoreError);
}

/// Default observer: one warning per skipped id
pub struct LogDanglingGrants;

impl DanglingGrantObserver for LogDanglingGrants {
    fn dangling_grant(&self, user_id: i64, project_id: i64, error: &StoreError) {
        warn!(user_id, project_id, %error, "Skipping granted project that could not be loaded");
    }
}

/// Computes the projects a non-admin user may list: the ones they own,
/// newest first, followed by the ones granted to them.
#[derive(Clone)]
pub struct VisibilityResolver {
    projects: Arc<dyn ProjectStore>,
    grants: Arc<dyn AccessStore>,
    observer: Arc<dyn DanglingGrantObserver>,
}

impl VisibilityResolver {
    pub fn new(projects: Arc<dyn ProjectStore>, grants: Arc<dyn AccessStore>) -> Self {
        Self::with_observer(projects, grants, Arc::new(LogDanglingGrants))
    }

    pub fn with_observer(
        projects: Arc<dyn ProjectStore>,
        grants: Arc<dyn AccessStore>,
        observer: Arc<dyn DanglingGrantObserver>,
    ) -> Self {
        Self { projects, grants, observer }
    }

    pub async fn accessible_projects(&self, user_id: i64, page: i64, page_size: i64) -> Result<Vec<Project>, AccessError> {
        let page = PageRequest::new(page, page_size);

        let owned = self.projects.list_projects_by_owner(user_id).await?;
        let granted_ids = self.grants.granted_project_ids(user_id).await?;

        if owned.is_empty() && granted_ids.is_empty() {
            return Ok(Vec::new());
        }

        // A stray grant on an owned project must not list it twice
        let owned_ids: HashSet<i64> = owned.iter().map(|p| p.id).collect();
        let granted_ids: Vec<i64> = granted_ids
            .into_iter()
            .filter(|id| !owned_ids.contains(id))
            .collect();

        if granted_ids.is_empty() {
            return Ok(page.slice(owned));
        }

        let mut visible = owned;
        visible.reserve(granted_ids.len());
        for project_id in granted_ids {
            match self.projects.find_project(project_id).await {
                Ok(project) => visible.push(project),
                Err(error) => self.observer.dangling_grant(user_id, project_id, &error),
            }
        }

        debug!(user_id, total = visible.len(), page = page.page, "Resolved accessible projects");
        Ok(page.slice(visible))
    }
}
