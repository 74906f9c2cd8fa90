use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::Result,
    handlers::pages,
    middleware_layer::auth::{current_session, SESSION_COOKIE},
    models::session::Session,
    models::user::Role,
    state::AppState,
};

/// The request payload for a credential submit.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The current-session info returned by `/me` for the navbar script.
#[derive(Serialize)]
pub struct MeResponse {
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "sessionActive")]
    pub session_active: bool,
}

/// Creates the session cookie with the portal's attributes.
fn create_session_cookie(value: String, max_age_hours: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);

    let is_production = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "development".to_string())
        == "production";

    cookie.set_http_only(true);
    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::hours(max_age_hours));
    cookie.set_path("/");

    cookie
}

/// Serves the login page, or bounces an already-authenticated browser home.
pub async fn login_page(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    if current_session(&state, &cookies).is_some() {
        return Ok(Redirect::to("/good").into_response());
    }

    pages::send_page(&state, "login.html").await
}

/// Handles a credential submit against the spreadsheet endpoint.
///
/// An explicit rejection and an unusable reply redirect back to the login
/// page with different error indicators, so the page can tell the user
/// which of the two happened.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(payload): Form<LoginRequest>,
) -> Response {
    tracing::info!("🔐 Login attempt for: {}", payload.username);

    match state
        .datastore
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(Some(user)) => {
            let session_id = state.sessions.create(&user);
            let cookie =
                create_session_cookie(session_id.to_string(), state.config.session_ttl_hours);
            cookies.signed(&state.cookie_key).add(cookie);

            tracing::info!("✅ Login successful for: {} ({})", user.username, user.role);
            Redirect::to("/good").into_response()
        }
        Ok(None) => {
            tracing::info!("Login failed for: {}", payload.username);
            Redirect::to("/login?error=invalid").into_response()
        }
        Err(e) => {
            tracing::error!("Login error for {}: {}", payload.username, e);
            Redirect::to("/login?error=server").into_response()
        }
    }
}

/// Destroys the session, if any, and bounces back to the login page.
///
/// Safe to call with no active session: the cookie is cleared either way.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    if let Some(cookie) = cookies.signed(&state.cookie_key).get(SESSION_COOKIE) {
        if let Ok(session_id) = Uuid::parse_str(cookie.value()) {
            if let Some(session) = state.sessions.remove(session_id) {
                tracing::info!("👋 User logged out: {}", session.user_id);
            }
        }
    }

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    Redirect::to("/login").into_response()
}

/// Returns the current session's identity.
#[axum::debug_handler]
pub async fn me(Extension(session): Extension<Session>) -> Json<MeResponse> {
    Json(MeResponse {
        username: session.user_id,
        email: session.user_email,
        role: session.role,
        session_active: true,
    })
}
