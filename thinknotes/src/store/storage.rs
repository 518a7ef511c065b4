use anyhow::Result;
use async_trait::async_trait;

/// Key/value backend for persisted session state
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value (missing keys are not an error)
    async fn remove(&self, key: &str) -> Result<()>;
}
