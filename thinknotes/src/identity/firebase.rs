use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AuthEvents, AuthSubscription, Identity, IdentityProvider};
use crate::config::IdentityConfig;
use crate::error::{ConfigError, ProviderError};
use crate::store::{SessionStorage, keys};

/// Tokens expiring within this window are refreshed even without `force_refresh`.
const EXPIRY_MARGIN_SECS: i64 = 60;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Identity provider speaking the Firebase Auth REST API.
///
/// The refresh token is persisted in the session store so a later process
/// can restore the signed-in user.
pub struct FirebaseProvider {
    http: reqwest::Client,
    config: IdentityConfig,
    storage: Arc<dyn SessionStorage>,
    user: Mutex<Option<CurrentUser>>,
    events: AuthEvents,
}

#[derive(Debug, Clone)]
struct CurrentUser {
    identity: Identity,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn expiry_from(expires_in: Option<&str>) -> DateTime<Utc> {
    let secs = expires_in
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Utc::now() + Duration::seconds(secs)
}

/// Split a provider error message such as `WEAK_PASSWORD : Password should be
/// at least 6 characters` into code and detail.
fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let raw = envelope.error.message;
            match raw.split_once(" : ") {
                Some((code, detail)) => ProviderError::Rejected {
                    code: code.trim().to_string(),
                    message: Some(detail.trim().to_string()),
                },
                None => ProviderError::Rejected {
                    code: raw.trim().to_string(),
                    message: None,
                },
            }
        }
        Err(_) => ProviderError::Rejected {
            code: format!("HTTP_{status}"),
            message: Some(body.trim().to_string()).filter(|m| !m.is_empty()),
        },
    }
}

impl FirebaseProvider {
    /// Create a provider. Fails if the identity configuration is incomplete.
    pub fn new(
        config: IdentityConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            storage,
            user: Mutex::new(None),
            events: AuthEvents::new(),
        })
    }

    /// The event source subscribers are attached to
    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    fn identity_endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.config.identity_url.trim_end_matches('/'),
            method,
            self.config.api_key()
        )
    }

    fn token_endpoint(&self) -> String {
        format!(
            "{}/v1/token?key={}",
            self.config.token_url.trim_end_matches('/'),
            self.config.api_key()
        )
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        let resp = self.http.post(url).json(body).send().await?;
        read_response(resp).await
    }

    async fn persist(&self, user: &CurrentUser) -> Result<(), ProviderError> {
        let storage_err = |e: anyhow::Error| ProviderError::Storage(e.to_string());
        self.storage
            .set(keys::REFRESH_TOKEN, &user.refresh_token)
            .await
            .map_err(storage_err)?;
        self.storage
            .set(keys::UID, &user.identity.uid)
            .await
            .map_err(storage_err)?;
        if let Some(name) = user.identity.display_name.as_deref().filter(|n| !n.is_empty()) {
            self.storage
                .set(keys::USER_NAME, name)
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ProviderError> {
        let resp = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        read_response(resp).await
    }
}

async fn read_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(parse_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| ProviderError::Rejected {
        code: "INVALID_RESPONSE".to_string(),
        message: Some(e.to_string()),
    })
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, ProviderError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account: AccountResponse = self
            .post_json(&self.identity_endpoint("signInWithPassword"), &body)
            .await?;

        let identity = Identity {
            uid: account.local_id,
            email: account.email.or_else(|| Some(email.to_string())),
            display_name: account.display_name.filter(|n| !n.is_empty()),
        };
        let user = CurrentUser {
            identity: identity.clone(),
            id_token: account.id_token,
            refresh_token: account.refresh_token,
            expires_at: expiry_from(account.expires_in.as_deref()),
        };

        self.persist(&user).await?;
        *self.user.lock().await = Some(user);
        info!(uid = %identity.uid, "signed in with identity provider");
        self.events.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, ProviderError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let account: AccountResponse = self
            .post_json(&self.identity_endpoint("signUp"), &body)
            .await?;

        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());
        if let Some(name) = display_name {
            let update = serde_json::json!({
                "idToken": account.id_token,
                "displayName": name,
                "returnSecureToken": false,
            });
            // The account already exists; keep it even if the name is not set
            if let Err(e) = self
                .post_json::<serde_json::Value>(&self.identity_endpoint("update"), &update)
                .await
            {
                warn!(error = %e, "failed to set display name on new account");
            }
        }

        info!(uid = %account.local_id, "created account");
        Ok(Identity {
            uid: account.local_id,
            email: account.email.or_else(|| Some(email.to_string())),
            display_name: display_name.map(str::to_string),
        })
    }

    async fn id_token(&self, force_refresh: bool) -> Result<String, ProviderError> {
        let mut guard = self.user.lock().await;
        let user = guard.as_mut().ok_or(ProviderError::NoCurrentUser)?;

        let fresh = user.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now();
        if !force_refresh && fresh && !user.id_token.is_empty() {
            return Ok(user.id_token.clone());
        }

        let refreshed = self.refresh(&user.refresh_token).await?;
        user.id_token = refreshed.id_token;
        user.refresh_token = refreshed.refresh_token;
        user.expires_at = expiry_from(refreshed.expires_in.as_deref());
        debug!(uid = %user.identity.uid, "refreshed ID token");

        let user = user.clone();
        drop(guard);
        self.persist(&user).await?;
        Ok(user.id_token)
    }

    /// Resolve the persisted session and publish the initial auth state.
    ///
    /// With a stored refresh token the user becomes current with an expired
    /// ID token, so the first `id_token` call refreshes it.
    async fn restore(&self) -> Result<(), ProviderError> {
        let storage_err = |e: anyhow::Error| ProviderError::Storage(e.to_string());

        let refresh_token = self.storage.get(keys::REFRESH_TOKEN).await.map_err(storage_err)?;
        let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) else {
            debug!("no persisted provider session");
            self.events.publish(None);
            return Ok(());
        };

        let identity = Identity {
            uid: self
                .storage
                .get(keys::UID)
                .await
                .map_err(storage_err)?
                .unwrap_or_default(),
            email: self.storage.get(keys::USER_EMAIL).await.map_err(storage_err)?,
            display_name: self.storage.get(keys::USER_NAME).await.map_err(storage_err)?,
        };

        *self.user.lock().await = Some(CurrentUser {
            identity: identity.clone(),
            id_token: String::new(),
            refresh_token,
            expires_at: Utc::now(),
        });
        debug!(uid = %identity.uid, "restored provider session");
        self.events.publish(Some(identity));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let previous = self.user.lock().await.take();
        self.events.publish(None);

        if let Some(user) = previous {
            debug!(uid = %user.identity.uid, "signed out of identity provider");
        }

        self.storage
            .remove(keys::REFRESH_TOKEN)
            .await
            .map_err(|e| ProviderError::Storage(e.to_string()))
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    fn name(&self) -> &str {
        "firebase"
    }
}
