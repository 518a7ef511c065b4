use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::AuthSubscription;
use crate::error::ProviderError;

/// The provider's view of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Trait for third-party identity providers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password; the user becomes current.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError>;

    /// Create an account. Does not make the new user current.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, ProviderError>;

    /// ID token of the current user. `force_refresh` bypasses any cached token.
    async fn id_token(&self, force_refresh: bool) -> Result<String, ProviderError>;

    /// Resolve any persisted session and publish the initial auth state.
    async fn restore(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// End the provider session and notify subscribers.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Listen for auth-state changes.
    ///
    /// Once the provider has resolved its initial state, a new subscription
    /// immediately receives the current state.
    fn subscribe(&self) -> AuthSubscription;

    /// Get the provider name
    fn name(&self) -> &str;
}
