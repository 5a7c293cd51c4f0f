use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, JwtError, JwtKeys};
use crate::database::models::{NewUser, Role, User};
use crate::database::store::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => AuthError::Conflict(reason),
            other => AuthError::Store(other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: User,
}

impl UserCreate {
    fn validate(&self) -> Result<(), AuthError> {
        let username_len = self.username.chars().count();
        if !(3..=50).contains(&username_len) {
            return Err(AuthError::Validation {
                field: "username",
                reason: "must be between 3 and 50 characters".to_string(),
            });
        }
        let email_ok = self
            .email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
            .unwrap_or(false);
        if !email_ok {
            return Err(AuthError::Validation {
                field: "email",
                reason: "must be a valid email address".to_string(),
            });
        }
        if self.password.chars().count() < 8 {
            return Err(AuthError::Validation {
                field: "password",
                reason: "must be at least 8 characters".to_string(),
            });
        }
        Ok(())
    }
}

/// Credential provider: registration, login and token issuance
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(&self, input: UserCreate) -> Result<User, AuthError> {
        input.validate()?;

        let password_hash = hash_password(&input.password).map_err(|e| AuthError::Hash(e.to_string()))?;
        let user = self
            .users
            .create_user(NewUser {
                username: input.username,
                email: input.email,
                password_hash,
                role: input.role.unwrap_or_default(),
            })
            .await?;

        info!(user_id = user.id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller
    pub async fn login(&self, input: UserLogin) -> Result<LoginResponse, AuthError> {
        let user = match self.users.find_user_by_email(&input.email).await? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(&user.password_hash, &input.password) {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.issue(&user)?;
        Ok(LoginResponse {
            token,
            expires_in: self.keys.expiry_hours() * 3600,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn service() -> AuthService {
        let keys = JwtKeys::new("auth-service-test", 1).unwrap();
        AuthService::new(Arc::new(MemoryStore::new()), keys)
    }

    fn signup(email: &str) -> UserCreate {
        UserCreate {
            username: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            password: "long-enough".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn register_defaults_to_user_role() {
        let user = service().register(signup("ann@example.com")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "long-enough");
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let mut input = signup("bob@example.com");
        input.password = "short".to_string();
        let err = service().register(input).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { field: "password", .. }));
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let svc = service();
        let user = svc.register(signup("cat@example.com")).await.unwrap();

        let response = svc
            .login(UserLogin {
                email: "cat@example.com".to_string(),
                password: "long-enough".to_string(),
            })
            .await
            .unwrap();
        let claims = svc.keys().validate(&response.token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(response.expires_in, 3600);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let svc = service();
        svc.register(signup("dan@example.com")).await.unwrap();

        let wrong = svc
            .login(UserLogin {
                email: "dan@example.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();
        let unknown = svc
            .login(UserLogin {
                email: "nobody@example.com".to_string(),
                password: "long-enough".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
    }
}
