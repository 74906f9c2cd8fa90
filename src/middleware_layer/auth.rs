use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::session::Session,
    models::user::Role,
    state::AppState,
};

/// The name of the signed session cookie.
pub const SESSION_COOKIE: &str = "session_id";

/// Resolves the session bound to the request's signed cookie, if any.
///
/// Tampered or unparsable cookies and expired records all resolve to
/// `None`, which is treated as anonymous everywhere.
pub fn current_session(state: &AppState, cookies: &Cookies) -> Option<Session> {
    let cookie = cookies.signed(&state.cookie_key).get(SESSION_COOKIE)?;
    let session_id = Uuid::parse_str(cookie.value()).ok()?;
    state.sessions.get(session_id)
}

/// Read-and-decide access check shared by the auth middlewares.
///
/// Anonymous requests are redirected to the login page, on JSON routes
/// too; the injected navbar script relies on that redirect not being `ok`.
/// A session with the wrong role gets the structured forbidden reply and
/// no redirect.
fn gate(
    state: &AppState,
    cookies: &Cookies,
    required_role: Option<Role>,
) -> std::result::Result<Session, Response> {
    let Some(session) = current_session(state, cookies) else {
        tracing::debug!("No active session, redirecting to login");
        return Err(Redirect::to("/login").into_response());
    };

    if let Some(required) = required_role {
        if session.role != required {
            tracing::warn!(
                "Access denied for {}: requires {}, has {}",
                session.user_id,
                required,
                session.role
            );
            return Err(AppError::Forbidden {
                required_role: required.to_string(),
                user_role: session.role.to_string(),
            }
            .into_response());
        }
    }

    Ok(session)
}

/// A middleware that requires any active session.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match gate(&state, &cookies, None) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(response) => response,
    }
}

/// A middleware that requires an active session with the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match gate(&state, &cookies, Some(Role::Admin)) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(response) => response,
    }
}
