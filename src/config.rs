use std::env;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the spreadsheet script endpoint.
    pub script_url: String,
    /// The shared secret sent with every script request.
    pub api_key: Zeroizing<String>,
    /// The secret the session cookie signing key is derived from.
    pub session_secret: Zeroizing<String>,
    /// The port to listen on.
    pub port: u16,
    /// The duration of a session in hours.
    pub session_ttl_hours: i64,
    /// The directory static pages are served from.
    pub public_dir: String,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let session_secret = env::var("SESSION_SECRET")
            .context("SESSION_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if session_secret.len() < 32 {
            anyhow::bail!("SESSION_SECRET must be at least 32 bytes");
        }

        Ok(Self {
            script_url: env::var("SCRIPT_URL")
                .context("SCRIPT_URL must be set")?,
            api_key: Zeroizing::new(
                env::var("API_KEY").context("API_KEY must be set")?,
            ),
            session_secret: Zeroizing::new(session_secret),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid PORT")?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("Invalid SESSION_TTL_HOURS")?,
            public_dir: env::var("PUBLIC_DIR")
                .unwrap_or_else(|_| "public".to_string()),
        })
    }
}
