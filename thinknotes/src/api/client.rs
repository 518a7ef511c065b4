use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{BackendApi, UploadRequest, UploadResponse, VerifiedUser};
use crate::error::ApiError;
use crate::store::{SessionStorage, keys};

const LOGIN_PATH: &str = "/auth/login";
const UPLOAD_PATH: &str = "/api/gemini/upload";

/// HTTP client for the ThinkNotes backend.
///
/// Every request carries `Authorization: Bearer <token>` once a token is
/// present in the session store. The token is read per request, so a
/// sign-in or sign-out takes effect on the next call.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn SessionStorage>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, storage)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            storage,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with the stored bearer credential attached.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.storage.get(keys::TOKEN).await {
            Ok(Some(token)) if !token.is_empty() => builder.bearer_auth(token),
            Ok(_) => builder,
            Err(e) => {
                warn!(error = %e, "failed to read session token, sending request without it");
                builder
            }
        }
    }
}

/// Turn a response into `T`, or into [`ApiError::Status`] carrying the raw body.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "backend returned error status");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pick the most specific message out of an error body.
///
/// Preference: `detail`, then `message`, then the raw body. Non-string
/// values are rendered as JSON. Returns `None` for an empty body.
pub fn extract_server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    let render = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    for field in ["detail", "message"] {
        match value.get(field) {
            Some(Value::Null) | None => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(v) => return Some(render(v)),
        }
    }

    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(render(&other)),
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn verify_session(&self, id_token: &str) -> Result<VerifiedUser, ApiError> {
        let resp = self
            .request(Method::POST, LOGIN_PATH)
            .await
            .json(&serde_json::json!({ "id_token": id_token }))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn upload_document(&self, request: UploadRequest) -> Result<UploadResponse, ApiError> {
        let UploadRequest { file, want_pdf } = request;
        debug!(
            file_name = %file.file_name,
            size = file.bytes.len(),
            want_pdf,
            "uploading document"
        );

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part);

        let resp = self
            .request(Method::POST, UPLOAD_PATH)
            .await
            .query(&[("return_pdf", if want_pdf { "true" } else { "false" })])
            .multipart(form)
            .send()
            .await?;
        read_json(resp).await
    }
}
