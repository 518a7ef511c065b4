use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::identity::{AuthChange, AuthSubscription, IdentityProvider};
use crate::nav::{NavigateOptions, Navigator, routes};
use crate::store::{SessionStorage, keys};

/// Where the guard is in resolving the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Waiting for the first auth-state notification
    Checking,
    Authenticated,
    Unauthenticated,
}

/// What the guarded route should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Render nothing (no protected content, no redirect yet)
    Nothing,
    /// Render the wrapped view
    Protected,
    /// The guard has redirected to this path
    Redirect(&'static str),
}

/// Gate for a protected view, driven by provider auth-state notifications.
///
/// Subscribes once on [`mount`](Self::mount); the subscription is released
/// when the guard is unmounted or dropped.
pub struct RouteGuard {
    state: GuardState,
    subscription: Option<AuthSubscription>,
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn mount(
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let subscription = provider.subscribe();
        debug!(provider = provider.name(), "route guard mounted");
        Self {
            state: GuardState::Checking,
            subscription: Some(subscription),
            provider,
            storage,
            navigator,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn render(&self) -> GuardView {
        match self.state {
            GuardState::Checking => GuardView::Nothing,
            GuardState::Authenticated => GuardView::Protected,
            GuardState::Unauthenticated => GuardView::Redirect(routes::SIGN_IN),
        }
    }

    /// Wait for the next notification and apply it.
    ///
    /// Returns `None` once the guard is unmounted or the provider is gone.
    pub async fn process_next(&mut self) -> Option<GuardState> {
        let change = self.subscription.as_mut()?.next().await?;
        self.apply(change).await;
        Some(self.state)
    }

    /// Process notifications until the guard leaves `Checking`.
    pub async fn settle(&mut self) -> GuardState {
        while self.state == GuardState::Checking {
            if self.process_next().await.is_none() {
                break;
            }
        }
        self.state
    }

    async fn apply(&mut self, change: AuthChange) {
        let Some(identity) = change else {
            self.deny();
            return;
        };

        match self.provider.id_token(true).await {
            Ok(token) => {
                if let Err(e) = self.storage.set(keys::TOKEN, &token).await {
                    warn!(error = %e, "failed to store refreshed token");
                }
                if self.state != GuardState::Authenticated {
                    info!(uid = %identity.uid, "session confirmed");
                }
                self.state = GuardState::Authenticated;
            }
            Err(e) => {
                warn!(error = %e, uid = %identity.uid, "token refresh failed, treating session as expired");
                for key in keys::SESSION_KEYS {
                    if let Err(e) = self.storage.remove(key).await {
                        warn!(key, error = %e, "failed to clear session key");
                    }
                }
                self.deny();
            }
        }
    }

    fn deny(&mut self) {
        if self.state == GuardState::Unauthenticated {
            return;
        }
        self.state = GuardState::Unauthenticated;
        debug!("no session, redirecting to sign-in");
        self.navigator
            .navigate(routes::SIGN_IN, NavigateOptions::replace());
    }

    /// Release the auth-state subscription.
    pub fn unmount(mut self) {
        self.subscription.take();
        debug!("route guard unmounted");
    }
}
