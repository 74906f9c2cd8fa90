use tower_cookies::Key;

use crate::config::Config;
use crate::error::Result;
use crate::services::datastore::DatastoreClient;
use crate::services::sessions::SessionStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The process-held session registry.
    pub sessions: SessionStore,
    /// The spreadsheet endpoint client.
    pub datastore: DatastoreClient,
    /// The key session cookies are signed with.
    pub cookie_key: Key,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let sessions = SessionStore::new(config.session_ttl_hours);
        tracing::info!(
            "✅ Session store initialized (TTL {}h)",
            config.session_ttl_hours
        );

        let datastore = DatastoreClient::new(config)?;
        tracing::info!("✅ Datastore client initialized");

        let cookie_key = Key::derive_from(config.session_secret.as_bytes());
        tracing::info!("✅ Cookie signing key derived");

        Ok(AppState {
            config: config.clone(),
            sessions,
            datastore,
            cookie_key,
        })
    }
}
