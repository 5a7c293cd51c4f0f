use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::database::models::{AccessGrant, AccessLevel, NewProject, NewUser, Project, User};
use crate::database::store::{AccessStore, Entity, HealthCheck, ProjectStore, StoreError, UserStore};

const PROJECT_COLUMNS: &str = "id, name, description, owner_id, created_at, updated_at";
const GRANT_COLUMNS: &str = "id, project_id, user_id, level, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Store implementation over a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

fn decode_error(column: &str, message: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}

fn grant_from_row(row: &PgRow) -> Result<AccessGrant, sqlx::Error> {
    let level: String = row.try_get("level")?;
    Ok(AccessGrant {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        user_id: row.try_get("user_id")?,
        level: level.parse::<AccessLevel>().map_err(|e| decode_error("level", e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse().map_err(|e| decode_error("role", e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let sql = format!(
            "INSERT INTO projects (name, description, owner_id) VALUES ($1, $2, $3) RETURNING {}",
            PROJECT_COLUMNS
        );
        let created = sqlx::query_as::<_, Project>(&sql)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_project(&self, id: i64) -> Result<Project, StoreError> {
        let sql = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);
        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(Entity::Project))
    }

    async fn find_project_by_name(&self, owner_id: i64, name: &str) -> Result<Option<Project>, StoreError> {
        let sql = format!(
            "SELECT {} FROM projects WHERE owner_id = $1 AND name = $2",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(owner_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn update_project(&self, project: &Project) -> Result<Project, StoreError> {
        let sql = format!(
            "UPDATE projects SET name = $1, description = $2, updated_at = NOW() WHERE id = $3 RETURNING {}",
            PROJECT_COLUMNS
        );
        sqlx::query_as::<_, Project>(&sql)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(Entity::Project))
    }

    async fn delete_project(&self, id: i64) -> Result<(), StoreError> {
        // Grants and suites go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(Entity::Project));
        }
        Ok(())
    }

    async fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, StoreError> {
        let sql = format!(
            "SELECT {} FROM projects WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
            PROJECT_COLUMNS
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, StoreError> {
        let sql = format!(
            "SELECT {} FROM projects ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            PROJECT_COLUMNS
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }
}

#[async_trait]
impl AccessStore for PgStore {
    async fn create_grant(&self, project_id: i64, user_id: i64, level: AccessLevel) -> Result<AccessGrant, StoreError> {
        if self.find_grant_for(project_id, user_id).await?.is_some() {
            return Err(StoreError::Conflict("user already has access to this project".to_string()));
        }

        let sql = format!(
            "INSERT INTO project_access (project_id, user_id, level) VALUES ($1, $2, $3) RETURNING {}",
            GRANT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(project_id)
            .bind(user_id)
            .bind(level.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // Lost the race against a concurrent grant for the same pair
                if is_unique_violation(&e) {
                    StoreError::Conflict("user already has access to this project".to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(grant_from_row(&row)?)
    }

    async fn find_grant(&self, id: i64) -> Result<AccessGrant, StoreError> {
        let sql = format!("SELECT {} FROM project_access WHERE id = $1", GRANT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(Entity::Grant))?;
        Ok(grant_from_row(&row)?)
    }

    async fn find_grant_for(&self, project_id: i64, user_id: i64) -> Result<Option<AccessGrant>, StoreError> {
        let sql = format!(
            "SELECT {} FROM project_access WHERE project_id = $1 AND user_id = $2",
            GRANT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(grant_from_row).transpose()?)
    }

    async fn update_grant_level(&self, id: i64, level: AccessLevel) -> Result<AccessGrant, StoreError> {
        let sql = format!(
            "UPDATE project_access SET level = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            GRANT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(level.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(Entity::Grant))?;
        Ok(grant_from_row(&row)?)
    }

    async fn delete_grant(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM project_access WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(Entity::Grant));
        }
        Ok(())
    }

    async fn list_grants_by_project(&self, project_id: i64) -> Result<Vec<AccessGrant>, StoreError> {
        let sql = format!(
            "SELECT {} FROM project_access WHERE project_id = $1 ORDER BY created_at DESC, id DESC",
            GRANT_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(project_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(grant_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_grants_by_user(&self, user_id: i64) -> Result<Vec<AccessGrant>, StoreError> {
        let sql = format!(
            "SELECT {} FROM project_access WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            GRANT_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(grant_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn granted_project_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT project_id FROM project_access WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict("username or email already registered".to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(user_from_row(&row)?)
    }

    async fn find_user(&self, id: i64) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(Entity::User))?;
        Ok(user_from_row(&row)?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(email).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
