use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get, post, put},
};

use std::net::SocketAddr;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;

mod models {
    pub mod session;
    pub mod user;
}

mod services {
    pub mod datastore;
    pub mod sessions;
}

mod handlers {
    pub mod admin;
    pub mod auth;
    pub mod pages;
    pub mod records;
}

mod middleware_layer {
    pub mod auth;
    pub mod inject;
}

mod validation {
    pub mod users;
}

use config::Config;
use state::AppState;

/// Assembles the portal router: public pages and proxies, session-gated
/// pages, and the admin surface, all wrapped by the navbar injection.
fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/logout",
            get(handlers::auth::logout).post(handlers::auth::logout),
        )
        .route("/", get(handlers::pages::index))
        .route("/verification", get(handlers::pages::verification))
        .route("/authentication", get(handlers::pages::authentication))
        .route("/sitepaths", get(handlers::pages::sitepaths))
        .route("/verify", get(handlers::records::verify))
        .route("/add_TO_database", post(handlers::records::add_to_database))
        .route(
            "/load_data_from_database",
            get(handlers::records::load_from_database),
        )
        .with_state(state.clone());

    let session_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/good", get(handlers::pages::good))
        .route("/degree", get(handlers::pages::degree))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin", get(handlers::admin::panel))
        .route(
            "/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::add_user),
        )
        .route(
            "/admin/users/{username}",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_admin,
        ))
        .with_state(state.clone());

    // Static assets fall through to the 404 page, like every other
    // unmatched path.
    let static_pages = ServeDir::new(&state.config.public_dir)
        .not_found_service(any(handlers::pages::not_found).with_state(state.clone()));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .fallback_service(static_pages)
        .layer(from_fn(middleware_layer::inject::inject_navbar))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)?;
    tracing::info!("✅ AppState initialized");

    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.port));
    let app = app(state);

    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("🔐 Protected pages: /good, /degree, /admin");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::{Form, Query};
    use axum::http::{header, Request, StatusCode};
    use axum::Json;
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use tower::ServiceExt;
    use zeroize::Zeroizing;

    use crate::middleware_layer::auth::SESSION_COOKIE;
    use crate::models::user::{RemoteUser, Role};

    fn test_config(script_url: &str, public_dir: &str) -> Config {
        Config {
            script_url: script_url.to_string(),
            api_key: Zeroizing::new("test-api-key".to_string()),
            session_secret: Zeroizing::new("0123456789abcdef0123456789abcdef".to_string()),
            port: 0,
            session_ttl_hours: 24,
            public_dir: public_dir.to_string(),
        }
    }

    fn test_state(script_url: &str, public_dir: &str) -> AppState {
        AppState::new(&test_config(script_url, public_dir)).expect("build state")
    }

    /// The spreadsheet endpoint is bound to an unroutable address: any
    /// test using this state proves its route never calls out.
    fn offline_state() -> AppState {
        test_state("http://127.0.0.1:9/exec", "public-does-not-exist")
    }

    /// Binds a session directly in the store and returns the signed cookie
    /// header a browser would present for it.
    fn login_as(state: &AppState, username: &str, role: Role) -> String {
        let user = RemoteUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            role,
        };
        let session_id = state.sessions.create(&user);

        let mut jar = tower_cookies::cookie::CookieJar::new();
        jar.signed_mut(&state.cookie_key).add(tower_cookies::Cookie::new(
            SESSION_COOKIE,
            session_id.to_string(),
        ));
        let cookie = jar.get(SESSION_COOKIE).expect("signed cookie");

        format!("{}={}", cookie.name(), cookie.value())
    }

    async fn spawn_collaborator(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind collaborator");
        let addr = listener.local_addr().expect("collaborator addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve collaborator");
        });
        format!("http://{}/exec", addr)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("parse body")
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn admin_route_without_session_redirects_to_login() {
        let response = app(offline_state())
            .oneshot(
                Request::builder()
                    .uri("/admin/users")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /admin/users");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn admin_route_with_user_session_is_forbidden() {
        let state = offline_state();
        let cookie = login_as(&state, "user1", Role::User);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/admin/users")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /admin/users");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["requiredRole"], "admin");
        assert_eq!(body["userRole"], "user");
    }

    #[tokio::test]
    async fn protected_page_without_session_redirects_to_login() {
        let response = app(offline_state())
            .oneshot(
                Request::builder()
                    .uri("/good")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /good");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn me_without_session_redirects_like_a_page() {
        let response = app(offline_state())
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /me");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn me_reports_the_session_identity() {
        let state = offline_state();
        let cookie = login_as(&state, "alice", Role::User);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /me");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["role"], "user");
        assert_eq!(body["sessionActive"], true);
    }

    #[tokio::test]
    async fn expired_session_is_anonymous() {
        let mut config = test_config("http://127.0.0.1:9/exec", "public-does-not-exist");
        config.session_ttl_hours = -1;
        let state = AppState::new(&config).expect("build state");
        let cookie = login_as(&state, "bob", Role::User);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/good")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /good");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn logout_without_session_still_redirects_cleanly() {
        let response = app(offline_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /logout");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn verify_requires_a_certificate_number() {
        let response = app(offline_state())
            .oneshot(
                Request::builder()
                    .uri("/verify")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /verify");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Certificate number is required");
    }

    #[tokio::test]
    async fn self_delete_is_rejected_locally() {
        let state = offline_state();
        let cookie = login_as(&state, "admin", Role::Admin);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/admin/users/admin")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call delete");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "You cannot delete your own account");
    }

    #[tokio::test]
    async fn add_user_with_missing_fields_is_rejected_locally() {
        let state = offline_state();
        let cookie = login_as(&state, "admin", Role::Admin);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/users")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username": "alice"}"#))
                    .expect("build request"),
            )
            .await
            .expect("call add user");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "All fields are required");
    }

    #[tokio::test]
    async fn login_success_binds_session_and_redirects_home() {
        let upstream = Router::new().route(
            "/exec",
            post(|| async {
                Json(serde_json::json!({
                    "success": true,
                    "user": {
                        "username": "admin",
                        "email": "admin@example.com",
                        "role": "admin",
                    },
                }))
            }),
        );
        let script_url = spawn_collaborator(upstream).await;
        let app = app(test_state(&script_url, "public-does-not-exist"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=password123"))
                    .expect("build request"),
            )
            .await
            .expect("call /login");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/good");

        let set_cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .expect("cookie header")
            .to_string();
        let cookie_pair = set_cookie.split(';').next().expect("cookie pair").to_string();
        assert!(cookie_pair.starts_with("session_id="));

        // The bound identity is exactly what the endpoint replied with.
        let me = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /me");

        assert_eq!(me.status(), StatusCode::OK);
        let body = body_json(me).await;
        assert_eq!(body["username"], "admin");
        assert_eq!(body["email"], "admin@example.com");
        assert_eq!(body["role"], "admin");
        assert_eq!(body["sessionActive"], true);
    }

    #[tokio::test]
    async fn rejected_credentials_redirect_with_invalid_indicator() {
        let upstream = Router::new().route(
            "/exec",
            post(|| async { Json(serde_json::json!({ "success": false })) }),
        );
        let script_url = spawn_collaborator(upstream).await;

        let response = app(test_state(&script_url, "public-does-not-exist"))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=wrong"))
                    .expect("build request"),
            )
            .await
            .expect("call /login");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login?error=invalid");
    }

    #[tokio::test]
    async fn unparsable_login_reply_redirects_with_server_indicator() {
        let upstream = Router::new().route("/exec", post(|| async { "definitely not json" }));
        let script_url = spawn_collaborator(upstream).await;

        let response = app(test_state(&script_url, "public-does-not-exist"))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=password123"))
                    .expect("build request"),
            )
            .await
            .expect("call /login");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login?error=server");
    }

    #[tokio::test]
    async fn login_page_bounces_authenticated_browsers_home() {
        let state = offline_state();
        let cookie = login_as(&state, "alice", Role::User);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/login")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /login");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/good");
    }

    #[tokio::test]
    async fn verify_forwards_the_certificate_number_exactly() {
        let upstream = Router::new().route(
            "/exec",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["action"], "verify");
                assert_eq!(params["certificateNo"], "FPA/2024 #17");
                assert_eq!(params["key"], "test-api-key");
                Json(serde_json::json!({ "valid": true }))
            }),
        );
        let script_url = spawn_collaborator(upstream).await;

        let response = app(test_state(&script_url, "public-does-not-exist"))
            .oneshot(
                Request::builder()
                    .uri("/verify?certificateNo=FPA%2F2024%20%2317")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /verify");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn verify_degrades_an_unparsable_upstream_body() {
        let upstream = Router::new().route("/exec", get(|| async { "NOT JSON" }));
        let script_url = spawn_collaborator(upstream).await;

        let response = app(test_state(&script_url, "public-does-not-exist"))
            .oneshot(
                Request::builder()
                    .uri("/verify?certificateNo=CERT-1")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /verify");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "NOT JSON");
    }

    #[tokio::test]
    async fn list_users_degrades_an_unparsable_upstream_body() {
        let upstream = Router::new().route("/exec", get(|| async { "<html>oops</html>" }));
        let script_url = spawn_collaborator(upstream).await;
        let state = test_state(&script_url, "public-does-not-exist");
        let cookie = login_as(&state, "admin", Role::Admin);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/admin/users")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /admin/users");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn add_to_database_forwards_fields_and_degrades_the_reply() {
        let upstream = Router::new().route(
            "/exec",
            post(|Form(fields): Form<Vec<(String, String)>>| async move {
                assert!(fields.contains(&("key".to_string(), "test-api-key".to_string())));
                assert!(fields.contains(&("certificateNo".to_string(), "CERT-9".to_string())));
                assert!(fields.contains(&("name".to_string(), "Jane".to_string())));
                "plain text ack"
            }),
        );
        let script_url = spawn_collaborator(upstream).await;

        let response = app(test_state(&script_url, "public-does-not-exist"))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/add_TO_database")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("certificateNo=CERT-9&name=Jane"))
                    .expect("build request"),
            )
            .await
            .expect("call /add_TO_database");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Data added successfully");
    }

    #[tokio::test]
    async fn served_pages_carry_the_navbar_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("verify.html"),
            "<html><head></head><body><h1>Verify</h1></body></html>",
        )
        .expect("write page");
        let state = test_state("http://127.0.0.1:9/exec", dir.path().to_str().expect("dir"));

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/verification")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /verification");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert_eq!(body.matches("id=\"nav-links\"").count(), 1);

        let body_tag = body.find("<body>").expect("body tag");
        let nav = body.find("<nav").expect("navbar");
        let heading = body.find("<h1>").expect("heading");
        assert!(body_tag < nav && nav < heading);
    }

    #[tokio::test]
    async fn static_non_html_assets_pass_through_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("style.css"), "body { margin: 0; }").expect("write css");
        let state = test_state("http://127.0.0.1:9/exec", dir.path().to_str().expect("dir"));

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/style.css")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call /style.css");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert_eq!(body, "body { margin: 0; }");
    }

    #[tokio::test]
    async fn unmatched_routes_fall_back_to_the_404_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("notfound.html"),
            "<html><body><h1>Lost</h1></body></html>",
        )
        .expect("write page");
        let state = test_state("http://127.0.0.1:9/exec", dir.path().to_str().expect("dir"));

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/definitely/not/a/route")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call unmatched");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_string(response).await;
        assert!(body.contains("Lost"));
        // The 404 page gets the navbar too.
        assert!(body.contains("id=\"nav-links\""));
    }

    #[tokio::test]
    async fn missing_404_page_degrades_to_json() {
        let response = app(offline_state())
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("call unmatched");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "404 Not Found");
        assert_eq!(body["path"], "/nope");
    }
}
