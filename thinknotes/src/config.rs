use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";

const PROJECT_CONFIG_FILE: &str = "thinknotes.toml";

/// Client configuration
///
/// Precedence: CLI flags > environment > project file (`./thinknotes.toml`)
/// > global file (`~/.thinknotes/config.toml`) > defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the ThinkNotes backend
    pub api_url: String,

    /// Session database path; `None` means `~/.thinknotes/session.db`
    pub storage_path: Option<PathBuf>,

    /// Ask the backend for a generated PDF alongside the summary
    pub want_pdf: bool,

    pub identity: IdentityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            storage_path: None,
            want_pdf: true,
            identity: IdentityConfig::default(),
        }
    }
}

/// Identity provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    pub identity_url: String,
    pub token_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            auth_domain: None,
            project_id: None,
            app_id: None,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl IdentityConfig {
    /// Check that every required key is present and non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("api_key", &self.api_key),
            ("auth_domain", &self.auth_domain),
            ("project_id", &self.project_id),
            ("app_id", &self.app_id),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, v)| v.as_deref().is_none_or(|s| s.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Incomplete(missing))
        }
    }

    /// API key, once validated
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

/// One configuration file; every field is optional so layers can be merged.
#[derive(Debug, Default, Deserialize)]
struct ConfigLayer {
    api_url: Option<String>,
    storage_path: Option<PathBuf>,
    want_pdf: Option<bool>,
    #[serde(default)]
    identity: IdentityLayer,
}

#[derive(Debug, Default, Deserialize)]
struct IdentityLayer {
    api_key: Option<String>,
    auth_domain: Option<String>,
    project_id: Option<String>,
    app_id: Option<String>,
    identity_url: Option<String>,
    token_url: Option<String>,
}

impl ClientConfig {
    /// Load from the global and project files, then apply the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let global = std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".thinknotes").join("config.toml"));
        let project = PathBuf::from(PROJECT_CONFIG_FILE);

        let mut config = Self::load_from(global.as_deref(), Some(&project))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Merge the given files over the defaults. Missing files are skipped.
    pub fn load_from(global: Option<&Path>, project: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for path in [global, project].into_iter().flatten() {
            if let Some(layer) = read_layer(path)? {
                debug!(path = %path.display(), "applying config file");
                config.apply_layer(layer);
            }
        }
        Ok(config)
    }

    fn apply_layer(&mut self, layer: ConfigLayer) {
        if let Some(v) = layer.api_url {
            self.api_url = v;
        }
        if let Some(v) = layer.storage_path {
            self.storage_path = Some(v);
        }
        if let Some(v) = layer.want_pdf {
            self.want_pdf = v;
        }

        let id = layer.identity;
        let target = &mut self.identity;
        if id.api_key.is_some() {
            target.api_key = id.api_key;
        }
        if id.auth_domain.is_some() {
            target.auth_domain = id.auth_domain;
        }
        if id.project_id.is_some() {
            target.project_id = id.project_id;
        }
        if id.app_id.is_some() {
            target.app_id = id.app_id;
        }
        if let Some(v) = id.identity_url {
            target.identity_url = v;
        }
        if let Some(v) = id.token_url {
            target.token_url = v;
        }
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("THINKNOTES_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = get("THINKNOTES_STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("THINKNOTES_WANT_PDF") {
            self.want_pdf = parse_bool(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "THINKNOTES_WANT_PDF".to_string(),
                value: v.clone(),
            })?;
        }

        let id = &mut self.identity;
        if let Some(v) = get("FIREBASE_API_KEY") {
            id.api_key = Some(v);
        }
        if let Some(v) = get("FIREBASE_AUTH_DOMAIN") {
            id.auth_domain = Some(v);
        }
        if let Some(v) = get("FIREBASE_PROJECT_ID") {
            id.project_id = Some(v);
        }
        if let Some(v) = get("FIREBASE_APP_ID") {
            id.app_id = Some(v);
        }
        if let Some(v) = get("FIREBASE_IDENTITY_URL") {
            id.identity_url = v;
        }
        if let Some(v) = get("FIREBASE_TOKEN_URL") {
            id.token_url = v;
        }

        Ok(())
    }
}

fn read_layer(path: &Path) -> Result<Option<ConfigLayer>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&text)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
