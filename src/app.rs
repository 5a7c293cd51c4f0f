use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::JwtKeys;
use crate::database::store::{AccessStore, HealthCheck, ProjectStore, UserStore};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::{AccessDirectory, AuthService, DanglingGrantObserver, LogDanglingGrants, ProjectService, VisibilityResolver};

/// Shared request state: every service over one backing store
#[derive(Clone)]
pub struct AppState {
    pub projects: ProjectService,
    pub directory: AccessDirectory,
    pub resolver: VisibilityResolver,
    pub auth: AuthService,
    pub health: Arc<dyn HealthCheck>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, keys: JwtKeys) -> Self
    where
        S: ProjectStore + AccessStore + UserStore + HealthCheck + 'static,
    {
        Self::with_observer(store, keys, Arc::new(LogDanglingGrants))
    }

    pub fn with_observer<S>(store: Arc<S>, keys: JwtKeys, observer: Arc<dyn DanglingGrantObserver>) -> Self
    where
        S: ProjectStore + AccessStore + UserStore + HealthCheck + 'static,
    {
        let projects: Arc<dyn ProjectStore> = store.clone();
        let grants: Arc<dyn AccessStore> = store.clone();
        let users: Arc<dyn UserStore> = store.clone();

        Self {
            projects: ProjectService::new(projects.clone()),
            directory: AccessDirectory::new(projects.clone(), grants.clone(), users.clone()),
            resolver: VisibilityResolver::with_observer(projects, grants, observer),
            auth: AuthService::new(users, keys),
            health: store,
        }
    }
}

pub fn app(state: AppState, cors: CorsLayer, request_logging: bool) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(handlers::health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(cors);

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{access, projects};

    Router::new()
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/:id",
            get(projects::show).put(projects::update).delete(projects::delete),
        )
        .route("/api/v1/projects/:id/access", get(access::list).post(access::grant))
        .route(
            "/api/v1/projects/:id/access/:access_id",
            put(access::update).delete(access::revoke),
        )
        .route("/api/v1/me/access", get(access::mine))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Test Case Management API",
            "version": version,
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/v1/auth/register, /api/v1/auth/login (public - token acquisition)",
                "projects": "/api/v1/projects[/:id] (protected)",
                "access": "/api/v1/projects/:id/access[/:access_id] (protected, owner only)",
                "me": "/api/v1/me/access (protected)",
            }
        }
    }))
}
