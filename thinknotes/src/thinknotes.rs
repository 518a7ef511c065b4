use std::sync::Arc;

use tracing::debug;

use crate::api::BackendApi;
use crate::auth::AuthController;
use crate::builder::ThinkNotesBuilder;
use crate::error::ThinkNotesError;
use crate::guard::RouteGuard;
use crate::identity::IdentityProvider;
use crate::nav::Navigator;
use crate::store::{Session, SessionStorage, UserBadge};
use crate::upload::{MemoryBlobStore, UploadController};

struct Inner {
    storage: Arc<dyn SessionStorage>,
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendApi>,
    navigator: Arc<dyn Navigator>,
    blobs: Arc<MemoryBlobStore>,
    want_pdf: bool,
}

/// Primary entry point for the thinknotes library.
///
/// Owns the shared collaborators and hands out the per-view controllers.
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct ThinkNotes {
    inner: Arc<Inner>,
}

impl ThinkNotes {
    pub(crate) fn from_parts(
        storage: Arc<dyn SessionStorage>,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendApi>,
        navigator: Arc<dyn Navigator>,
        blobs: Arc<MemoryBlobStore>,
        want_pdf: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                provider,
                backend,
                navigator,
                blobs,
                want_pdf,
            }),
        }
    }

    /// Create a new builder for configuring a `ThinkNotes` client.
    pub fn builder() -> ThinkNotesBuilder {
        ThinkNotesBuilder::new()
    }

    /// Let the identity provider pick up a persisted session.
    ///
    /// Call once at startup, before mounting a guard.
    pub async fn restore(&self) -> Result<(), ThinkNotesError> {
        self.inner.provider.restore().await?;
        debug!(provider = self.inner.provider.name(), "provider state restored");
        Ok(())
    }

    pub fn auth(&self) -> AuthController {
        AuthController::new(
            Arc::clone(&self.inner.provider),
            Arc::clone(&self.inner.backend),
            Arc::clone(&self.inner.storage),
            Arc::clone(&self.inner.navigator),
        )
    }

    /// Mount a guard for a protected view.
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::mount(
            Arc::clone(&self.inner.provider),
            Arc::clone(&self.inner.storage),
            Arc::clone(&self.inner.navigator),
        )
    }

    /// A fresh upload workflow sharing this client's blob store.
    pub fn uploader(&self) -> UploadController {
        UploadController::new(
            Arc::clone(&self.inner.backend),
            self.inner.blobs.clone(),
        )
        .with_pdf(self.inner.want_pdf)
    }

    /// The session as last written to storage
    pub async fn session(&self) -> Result<Session, ThinkNotesError> {
        Ok(Session::load(self.inner.storage.as_ref()).await?)
    }

    /// Display name for the header, if anyone is signed in
    pub async fn user_badge(&self) -> Result<Option<UserBadge>, ThinkNotesError> {
        let session = self.session().await?;
        if !session.is_authenticated() {
            return Ok(None);
        }
        Ok(UserBadge::load(self.inner.storage.as_ref()).await?)
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.inner.storage
    }

    pub fn blobs(&self) -> &Arc<MemoryBlobStore> {
        &self.inner.blobs
    }

    pub fn want_pdf(&self) -> bool {
        self.inner.want_pdf
    }
}
