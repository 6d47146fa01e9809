use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::accounts;
use crate::auth::middleware::JwtSecret;
use crate::files::routes as file_routes;
use crate::state::AppState;
use crate::tasks::crud as task_crud;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Add standard security headers to every response.
async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        "X-Content-Type-Options",
        axum::http::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "X-XSS-Protection",
        axum::http::HeaderValue::from_static("1; mode=block"),
    );
    response
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 requests per minute per IP on auth endpoints.
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5) // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Auth routes with rate limiting
    let auth_routes = Router::new()
        .route("/auth/register", axum::routing::post(accounts::register))
        .route("/auth/login", axum::routing::post(accounts::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Task CRUD (JWT required — Claims extractor validates the token)
    let task_routes = Router::new()
        .route("/tasks", axum::routing::post(task_crud::create_task))
        .route("/tasks", axum::routing::get(task_crud::list_tasks))
        .route("/tasks/{id}", axum::routing::get(task_crud::get_task))
        .route("/tasks/{id}", axum::routing::put(task_crud::update_task))
        .route("/tasks/{id}", axum::routing::delete(task_crud::delete_task));

    // Attachment upload/download. Uploads may exceed axum's default body
    // cap, so the limit follows the configured maximum plus multipart
    // framing overhead.
    let max_upload_bytes = state.max_upload_size_mb as usize * 1024 * 1024;
    let attachment_routes = Router::new()
        .route(
            "/tasks/{id}/files",
            axum::routing::post(file_routes::upload_file),
        )
        .route("/files/{id}", axum::routing::get(file_routes::download_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes + 64 * 1024));

    // WebSocket chat endpoint (identifier via query param, not JWT header)
    let ws_routes = Router::new().route("/ws/chat", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(task_routes)
        .merge(attachment_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .layer(middleware::from_fn(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
