use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::SessionStorage;

/// Persisted key names shared by every reader and writer of session state.
pub mod keys {
    /// Bearer credential attached to backend requests
    pub const TOKEN: &str = "token";
    /// Provider refresh token, used to restore a session after restart
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USER_EMAIL: &str = "user_email";
    pub const USER_NAME: &str = "user_name";
    pub const UID: &str = "uid";

    /// Every key that belongs to a session; sign-out removes all of them.
    pub const SESSION_KEYS: &[&str] = &[TOKEN, REFRESH_TOKEN, USER_EMAIL, USER_NAME, UID];
}

/// The signed-in session as seen from the token store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user_identifier: Option<String>,
}

impl Session {
    /// Read the current session back from storage.
    ///
    /// The user identifier is the uid when known, otherwise the email.
    pub async fn load(storage: &dyn SessionStorage) -> Result<Self> {
        let token = storage.get(keys::TOKEN).await?;
        let user_identifier = match storage.get(keys::UID).await? {
            Some(uid) => Some(uid),
            None => storage.get(keys::USER_EMAIL).await?,
        };
        Ok(Self {
            token,
            user_identifier,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Display name for the signed-in user, as shown in the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBadge {
    pub display_name: String,
}

impl UserBadge {
    /// Prefer the stored user name, fall back to the email.
    pub async fn load(storage: &dyn SessionStorage) -> Result<Option<Self>> {
        let name = match storage.get(keys::USER_NAME).await? {
            Some(name) if !name.trim().is_empty() => Some(name),
            _ => storage.get(keys::USER_EMAIL).await?,
        };
        Ok(name.map(|display_name| Self { display_name }))
    }
}
