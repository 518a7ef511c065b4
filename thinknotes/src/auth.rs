use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::api::BackendApi;
use crate::error::AuthError;
use crate::identity::IdentityProvider;
use crate::nav::{NavigateOptions, Navigator, routes};
use crate::store::{Session, SessionStorage, keys};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Client-side shape check; the provider has the final word.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::MissingField("email"));
    }
    if password.is_empty() {
        return Err(AuthError::MissingField("password"));
    }
    if !is_valid_email(email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

/// Owns sign-in, sign-up and sign-out.
///
/// Writes the session to the token store and drives navigation. Provider
/// errors are turned into [`AuthError`] categories here; nothing below this
/// boundary is shown to the user directly.
pub struct AuthController {
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendApi>,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
}

impl AuthController {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendApi>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            provider,
            backend,
            storage,
            navigator,
        }
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), AuthError> {
        self.storage
            .set(key, value)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))
    }

    async fn persist_token(&self, email: &str) -> Result<String, AuthError> {
        let token = self.provider.id_token(true).await?;
        self.store(keys::TOKEN, &token).await?;
        self.store(keys::USER_EMAIL, email).await?;
        Ok(token)
    }

    /// Revoke the provider session and remove every session key, logging failures.
    async fn clear_session(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, provider = self.provider.name(), "provider sign-out failed");
        }

        for key in keys::SESSION_KEYS {
            if let Err(e) = self.storage.remove(key).await {
                error!(key, error = %e, "failed to clear session key");
            }
        }
    }

    /// Authenticate, persist the session and go to the dashboard.
    ///
    /// If the token cannot be obtained or stored after the provider accepted
    /// the credentials, the provider session is revoked and the store cleared
    /// before the error is returned.
    ///
    /// Backend verification runs after the provider sign-in has succeeded;
    /// its failure is logged and does not fail the sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        validate_credentials(email, password)?;

        let identity = self
            .provider
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|e| debug!(error = %e, "provider sign-in failed"))?;
        let token = match self.persist_token(email).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "sign-in could not be completed, rolling back provider session");
                self.clear_session().await;
                return Err(e);
            }
        };

        let mut user_identifier = if identity.uid.is_empty() {
            email.to_string()
        } else {
            identity.uid.clone()
        };

        match self.backend.verify_session(&token).await {
            Ok(verified) => {
                if let Err(e) = self.storage.set(keys::UID, &verified.uid).await {
                    warn!(error = %e, "failed to store verified uid");
                }
                if let Some(verified_email) = verified.email.as_deref().filter(|e| !e.is_empty()) {
                    if let Err(e) = self.storage.set(keys::USER_EMAIL, verified_email).await {
                        warn!(error = %e, "failed to store verified email");
                    }
                }
                user_identifier = verified.uid;
            }
            Err(e) => {
                warn!(error = %e, "could not verify token with backend, keeping provider session");
            }
        }

        info!(user = %user_identifier, "signed in");
        self.navigator
            .navigate(routes::DASHBOARD, NavigateOptions::push());

        Ok(Session {
            token: Some(token),
            user_identifier: Some(user_identifier),
        })
    }

    /// Create an account. The caller must sign in afterwards.
    pub async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let full_name = full_name.trim();
        let email = email.trim();
        if full_name.is_empty() {
            return Err(AuthError::MissingField("full name"));
        }
        validate_credentials(email, password)?;

        let identity = self
            .provider
            .create_account(email, password, Some(full_name))
            .await?;
        info!(uid = %identity.uid, "registered account");
        Ok(())
    }

    /// End the session.
    ///
    /// Provider sign-out is best effort. Every session key is removed
    /// regardless of its outcome, then the user is sent to the landing page.
    pub async fn sign_out(&self) {
        self.clear_session().await;
        info!("signed out");
        self.navigator
            .navigate(routes::LANDING, NavigateOptions::push());
    }
}
