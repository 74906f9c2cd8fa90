use std::path::PathBuf;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};

use crate::{
    error::{AppError, Result},
    models::session::Session,
    state::AppState,
};

/// Reads a page from the public directory and serves it as HTML.
///
/// The navbar middleware decorates the result on the way out. A missing
/// file is a structured 404, not a crash.
pub async fn send_page(state: &AppState, file: &str) -> Result<Response> {
    let path = PathBuf::from(&state.config.public_dir).join(file);

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Html(bytes).into_response()),
        Err(e) => {
            tracing::error!("Error serving page {}: {}", path.display(), e);
            Err(AppError::NotFound)
        }
    }
}

/// Serves the verification page at the site root.
pub async fn index(State(state): State<AppState>) -> Result<Response> {
    send_page(&state, "verify.html").await
}

/// Serves the protected certificate page.
pub async fn good(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    tracing::info!("Certificate page requested by: {}", session.user_id);
    send_page(&state, "good.html").await
}

/// Serves the protected degree certificate page.
pub async fn degree(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    tracing::info!("Degree certificate page requested by: {}", session.user_id);
    send_page(&state, "certificatedegree.html").await
}

/// Serves the public verification page.
pub async fn verification(State(state): State<AppState>) -> Result<Response> {
    send_page(&state, "verify.html").await
}

/// Serves the public authentication page.
pub async fn authentication(State(state): State<AppState>) -> Result<Response> {
    send_page(&state, "authentication.html").await
}

/// Serves the site map page.
pub async fn sitepaths(State(state): State<AppState>) -> Result<Response> {
    send_page(&state, "sitemap.html").await
}

/// Fallback for unmatched routes: the 404 page when it exists, a JSON
/// description otherwise.
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    tracing::info!("404 - Route not found: {}", uri);

    let path = PathBuf::from(&state.config.public_dir).join("notfound.html");
    match tokio::fs::read(&path).await {
        Ok(bytes) => (StatusCode::NOT_FOUND, Html(bytes)).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(sonic_rs::json!({
                "error": "404 Not Found",
                "path": uri.path(),
                "message": "This route does not exist. Please check the URL and try again.",
            })),
        )
            .into_response(),
    }
}
