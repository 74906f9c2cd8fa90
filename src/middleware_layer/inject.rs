use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::header;
use http_body_util::BodyExt;

use crate::error::AppError;

/// The navbar fragment inserted into every served HTML page.
///
/// The script inside fetches `/me` to decide which links to show, offers a
/// logout control, and polls `/me` every 30 seconds so an expired session
/// bounces the browser back to the login page.
const NAVBAR_HTML: &str = r##"
<nav style="position:fixed; top:0; left:0; right:0; height:60px; background:#1a202c; color:white; padding:0 20px; font-family:'Segoe UI',sans-serif; display:flex; justify-content:space-between; align-items:center; z-index:1000; box-shadow:0 2px 6px rgba(0,0,0,0.2);">
  <div style="display:flex; align-items:center; font-weight:bold; font-size:18px;">
    FUTURE PATH ADVISOR
  </div>
  <div id="nav-links" class="nav-links" style="display:flex; gap:20px; align-items:center; font-size:15px;"></div>
</nav>

<style>
  body {
    margin: 0;
    padding-top: 65px;
  }

  nav a {
    color: white !important;
    text-decoration: none;
    padding: 8px 12px;
    border-radius: 6px;
    transition: background 0.2s ease;
  }

  nav a:hover {
    background: rgba(255, 255, 255, 0.1) !important;
  }
</style>

<script>
  document.addEventListener("DOMContentLoaded", function() {
    fetch('/me', { credentials: 'include' })
      .then(res => res.ok ? res.json() : Promise.reject())
      .then(user => {
        const nav = document.getElementById('nav-links');
        if (!nav) return;

        nav.innerHTML = `
          <a href="/good">Home</a>
          <a href="/verification">Verify</a>
          ${user.role === 'admin' ? '<a href="/admin">Admin</a>' : ''}
          <a href="#" onclick="logout()" style="color:#f56565;">Logout</a>
        `;
      })
      .catch(() => {
        const nav = document.getElementById('nav-links');
        if (nav) nav.innerHTML = '<a href="/login">Login</a>';
      });
  });

  function logout() {
    fetch('/logout', { method: 'POST', credentials: 'include' })
      .then(() => window.location.href = '/login')
      .catch(() => window.location.href = '/login');
  }

  // Auto-logout on session expiry
  setInterval(() => {
    fetch('/me', { credentials: 'include' })
      .then(response => {
        if (!response.ok) {
          window.location.href = '/login';
        }
      })
      .catch(() => {
        window.location.href = '/login';
      });
  }, 30000);
</script>
"##;

/// Rewrites outgoing HTML responses to carry the shared navbar.
///
/// Decoration is best-effort: a body that cannot be buffered, is not
/// UTF-8, or has no body tag is served exactly as produced. Non-HTML
/// responses pass through untouched.
pub async fn inject_navbar(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/html"))
        .unwrap_or(false);

    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::error!("Navbar injection failed to read body: {}", e);
            return AppError::Internal(format!("buffering response body: {}", e)).into_response();
        }
    };

    match insert_after_body(&bytes, NAVBAR_HTML) {
        Some(decorated) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(decorated))
        }
        None => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Inserts `fragment` immediately after the first opening body tag,
/// matched case-insensitively.
///
/// Returns `None` when the content is not UTF-8 or has no body tag.
fn insert_after_body(content: &[u8], fragment: &str) -> Option<String> {
    let html = std::str::from_utf8(content).ok()?;
    let lower = html.to_ascii_lowercase();

    let start = lower.find("<body")?;
    let close = start + lower[start..].find('>')?;
    let insert_at = close + 1;

    let mut decorated = String::with_capacity(html.len() + fragment.len() + 1);
    decorated.push_str(&html[..insert_at]);
    decorated.push('\n');
    decorated.push_str(fragment);
    decorated.push_str(&html[insert_at..]);

    Some(decorated)
}
