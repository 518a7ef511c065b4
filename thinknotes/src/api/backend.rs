use async_trait::async_trait;

use super::{UploadRequest, UploadResponse, VerifiedUser};
use crate::error::ApiError;

/// Calls the ThinkNotes backend makes available to the controllers
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Exchange a provider ID token for the backend's view of the user
    async fn verify_session(&self, id_token: &str) -> Result<VerifiedUser, ApiError>;

    /// Upload one document and get the generated summary back
    async fn upload_document(&self, request: UploadRequest) -> Result<UploadResponse, ApiError>;
}
