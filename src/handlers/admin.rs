use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use sonic_rs::Value;

use crate::{
    error::{AppError, Result},
    handlers::pages,
    models::session::Session,
    models::user::{NewUser, UpdateUser},
    state::AppState,
    validation::users as validate,
};

/// Serves the admin panel page.
pub async fn panel(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    tracing::info!("Admin panel requested by: {}", session.user_id);
    pages::send_page(&state, "admin.html").await
}

/// Lists every user stored in the spreadsheet.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>> {
    tracing::info!("Admin fetching all users");
    let users = state.datastore.get_users().await?;
    Ok(Json(users))
}

/// Adds a user after local shape checks.
pub async fn add_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<Json<Value>> {
    validate::validate_new_user(&payload)?;

    tracing::info!("Admin adding new user: {}", payload.username);
    let result = state.datastore.add_user(&payload).await?;
    Ok(Json(result))
}

/// Updates a user. The password travels upstream only when one was
/// entered.
pub async fn update_user(
    State(state): State<AppState>,
    Path(original_username): Path<String>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<Value>> {
    validate::validate_update_user(&payload)?;

    tracing::info!(
        "Admin updating user: {} -> {}",
        original_username,
        payload.username
    );
    let result = state
        .datastore
        .update_user(&original_username, &payload)
        .await?;
    Ok(Json(result))
}

/// Deletes a user. Self-deletion is rejected locally; the spreadsheet is
/// never asked.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
) -> Result<Json<Value>> {
    if username == session.user_id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    tracing::info!("Admin deleting user: {}", username);
    let result = state.datastore.delete_user(&username).await?;
    Ok(Json(result))
}
