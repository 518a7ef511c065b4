use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, BackendApi};
use crate::config::ClientConfig;
use crate::error::ThinkNotesError;
use crate::identity::{FirebaseProvider, IdentityProvider};
use crate::nav::{History, Navigator};
use crate::store::{MemoryStorage, SessionStorage, SqliteStorage};
use crate::thinknotes::ThinkNotes;
use crate::upload::MemoryBlobStore;

/// Builder for constructing a [`ThinkNotes`] client.
///
/// Anything not set explicitly is derived from the [`ClientConfig`] at
/// [`build()`](Self::build): SQLite session storage, the HTTP backend client
/// and the Firebase identity provider.
///
/// # Example
///
/// ```no_run
/// # use thinknotes::ThinkNotes;
/// # async fn example() -> Result<(), thinknotes::ThinkNotesError> {
/// let client = ThinkNotes::builder().from_config()?.build()?;
/// client.restore().await?;
///
/// let session = client.auth().sign_in("ada@example.com", "secret").await?;
/// println!("{:?}", session.user_identifier);
/// # Ok(())
/// # }
/// ```
pub struct ThinkNotesBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn SessionStorage>>,
    backend: Option<Arc<dyn BackendApi>>,
    provider: Option<Arc<dyn IdentityProvider>>,
    navigator: Option<Arc<dyn Navigator>>,
    blobs: Option<Arc<MemoryBlobStore>>,
}

impl ThinkNotesBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            storage: None,
            backend: None,
            provider: None,
            navigator: None,
            blobs: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from files and environment.
    ///
    /// Settings applied here can still be overridden by subsequent builder calls.
    pub fn from_config(mut self) -> Result<Self, ThinkNotesError> {
        self.config = ClientConfig::load()?;
        debug!(api_url = %self.config.api_url, "loaded client configuration");
        Ok(self)
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Whether uploads ask the backend for a generated PDF.
    pub fn want_pdf(mut self, want_pdf: bool) -> Self {
        self.config.want_pdf = want_pdf;
        self
    }

    /// Set a custom session storage backend.
    pub fn storage(mut self, storage: impl SessionStorage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Keep the session in memory only.
    pub fn memory_storage(self) -> Self {
        self.storage(MemoryStorage::new())
    }

    /// Use SQLite storage at the configured path, or `~/.thinknotes/session.db`.
    pub fn sqlite_storage(mut self) -> Result<Self, ThinkNotesError> {
        self.storage = Some(Arc::new(open_sqlite(&self.config)?));
        Ok(self)
    }

    /// Set a custom backend (the HTTP client is used otherwise).
    pub fn backend(mut self, backend: impl BackendApi + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set a custom identity provider (Firebase is used otherwise).
    pub fn provider(mut self, provider: impl IdentityProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Set the navigator. Defaults to an in-memory [`History`] at `/`.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn blob_store(mut self, blobs: Arc<MemoryBlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Build the [`ThinkNotes`] client.
    ///
    /// Fails if storage cannot be opened or, when no provider was set, if the
    /// identity configuration is incomplete.
    pub fn build(self) -> Result<ThinkNotes, ThinkNotesError> {
        let storage = match self.storage {
            Some(storage) => storage,
            None => Arc::new(open_sqlite(&self.config)?),
        };

        let provider = match self.provider {
            Some(provider) => provider,
            None => Arc::new(FirebaseProvider::new(
                self.config.identity.clone(),
                Arc::clone(&storage),
            )?),
        };

        let backend = self.backend.unwrap_or_else(|| {
            Arc::new(ApiClient::new(
                self.config.api_url.clone(),
                Arc::clone(&storage),
            ))
        });

        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(History::default()));
        let blobs = self.blobs.unwrap_or_default();

        debug!(
            provider = provider.name(),
            want_pdf = self.config.want_pdf,
            "built client"
        );

        Ok(ThinkNotes::from_parts(
            storage,
            provider,
            backend,
            navigator,
            blobs,
            self.config.want_pdf,
        ))
    }
}

impl Default for ThinkNotesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn open_sqlite(config: &ClientConfig) -> Result<SqliteStorage, ThinkNotesError> {
    let storage = match &config.storage_path {
        Some(path) => SqliteStorage::new(path),
        None => SqliteStorage::default_location(),
    };
    storage.map_err(|e| {
        ThinkNotesError::Storage(format!("failed to initialize SQLite storage: {}", e))
    })
}
