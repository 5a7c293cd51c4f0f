#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use tcm_api::app::{app, AppState};
use tcm_api::auth::JwtKeys;
use tcm_api::database::models::{NewProject, NewUser, Project, Role, User};
use tcm_api::database::{MemoryStore, ProjectStore, UserStore};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn keys() -> JwtKeys {
    JwtKeys::new(JWT_SECRET, 1).expect("test secret is non-empty")
}

/// Server bound to a free local port, serving from its own MemoryStore
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Each tokio test owns its runtime, so every test spawns its own server.
    pub async fn spawn() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), keys());

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(state, CorsLayer::permissive(), false);
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register through the API and return (user id, bearer token)
    pub async fn signup(&self, username: &str, role: Role) -> Result<(i64, String)> {
        let email = format!("{}@example.com", username);
        let res = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": PASSWORD,
                "role": role.as_str(),
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        let id = body["data"]["id"].as_i64().context("register response missing id")?;

        let res = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        let token = body["data"]["token"].as_str().context("login response missing token")?;
        Ok((id, token.to_string()))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await?;
        read(res).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).bearer_auth(token).json(&body).send().await?;
        read(res).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.put(self.url(path)).bearer_auth(token).json(&body).send().await?;
        read(res).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.delete(self.url(path)).bearer_auth(token).send().await?;
        read(res).await
    }
}

async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let body = res.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

/// Insert a user directly; the password hash is never checked by these callers.
pub async fn seed_user(store: &MemoryStore, username: &str) -> User {
    store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "unused".to_string(),
            role: Role::User,
        })
        .await
        .expect("seed user")
}

pub async fn seed_project(store: &MemoryStore, owner_id: i64, name: &str) -> Project {
    store
        .create_project(NewProject {
            name: name.to_string(),
            description: String::new(),
            owner_id,
        })
        .await
        .expect("seed project")
}
