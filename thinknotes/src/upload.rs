use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{BackendApi, Flashcard, UploadFile, UploadRequest};
use crate::error::UploadError;

const PDF_MIME: &str = "application/pdf";

/// Revocable handle to in-memory binary data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and releases blob handles
pub trait BlobStore: Send + Sync {
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> BlobUrl;

    /// Release a handle. Unknown handles are ignored.
    fn revoke(&self, url: &BlobUrl);
}

#[derive(Debug)]
struct Blob {
    mime_type: String,
    bytes: Vec<u8>,
}

/// Process-local blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: parking_lot::Mutex<HashMap<BlobUrl, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles that have not been revoked
    pub fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Bytes behind a live handle
    pub fn resolve(&self, url: &BlobUrl) -> Option<Vec<u8>> {
        self.blobs.lock().get(url).map(|b| b.bytes.clone())
    }

    pub fn mime_type(&self, url: &BlobUrl) -> Option<String> {
        self.blobs.lock().get(url).map(|b| b.mime_type.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> BlobUrl {
        let url = BlobUrl(format!("blob:thinknotes/{}", uuid::Uuid::new_v4()));
        self.blobs.lock().insert(
            url.clone(),
            Blob {
                mime_type: mime_type.to_string(),
                bytes,
            },
        );
        url
    }

    fn revoke(&self, url: &BlobUrl) {
        self.blobs.lock().remove(url);
    }
}

/// Display state of the output panel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputState {
    pub loading: bool,
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub pdf_url: Option<BlobUrl>,
    /// The server answered but could not produce a PDF
    pub pdf_error: Option<String>,
    /// Failure text for the last attempt
    pub message: Option<String>,
}

/// What the output panel renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputView {
    /// Busy indicator
    Loading,
    /// "No result" placeholder; a generated PDF is still offered for download
    Empty { pdf_url: Option<BlobUrl> },
    /// A failure message
    Message(String),
    Content {
        summary: Option<String>,
        flashcards: Vec<Flashcard>,
        pdf_url: Option<BlobUrl>,
    },
}

impl OutputState {
    pub fn view(&self) -> OutputView {
        if self.loading {
            return OutputView::Loading;
        }
        if let Some(message) = &self.message {
            return OutputView::Message(message.clone());
        }
        if self.summary.is_empty() && self.flashcards.is_empty() {
            return OutputView::Empty {
                pdf_url: self.pdf_url.clone(),
            };
        }
        OutputView::Content {
            summary: Some(self.summary.clone()).filter(|s| !s.is_empty()),
            flashcards: self.flashcards.clone(),
            pdf_url: self.pdf_url.clone(),
        }
    }
}

/// Result of one successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub pdf_url: Option<BlobUrl>,
    pub pdf_error: Option<String>,
}

#[derive(Default)]
struct Inner {
    file: Option<UploadFile>,
    output: OutputState,
    /// The one blob handle this controller may hold
    live_blob: Option<BlobUrl>,
}

/// Upload-and-summarize workflow for one view.
///
/// Holds at most one live blob handle. Starting a new generation does not
/// cancel one already in flight; callers check [`can_generate`](Self::can_generate)
/// before triggering.
pub struct UploadController {
    backend: Arc<dyn BackendApi>,
    blobs: Arc<dyn BlobStore>,
    want_pdf: bool,
    inner: Mutex<Inner>,
}

impl UploadController {
    pub fn new(backend: Arc<dyn BackendApi>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            backend,
            blobs,
            want_pdf: true,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Whether to ask the backend for a generated PDF (default: yes)
    pub fn with_pdf(mut self, want_pdf: bool) -> Self {
        self.want_pdf = want_pdf;
        self
    }

    pub async fn select_file(&self, file: UploadFile) {
        debug!(file_name = %file.file_name, "file selected");
        self.inner.lock().await.file = Some(file);
    }

    pub async fn clear_file(&self) {
        self.inner.lock().await.file = None;
    }

    /// Name of the selected file
    pub async fn selected_file(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .file
            .as_ref()
            .map(|f| f.file_name.clone())
    }

    pub async fn snapshot(&self) -> OutputState {
        self.inner.lock().await.output.clone()
    }

    pub async fn view(&self) -> OutputView {
        self.inner.lock().await.output.view()
    }

    /// True when a file is selected and no request is outstanding
    pub async fn can_generate(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.file.is_some() && !inner.output.loading
    }

    /// Upload the selected file and update the display state.
    ///
    /// Without a selected file this does nothing and returns `Ok(None)`.
    /// On failure the display message is set before the error is returned.
    pub async fn generate(&self) -> Result<Option<UploadResult>, UploadError> {
        let file = {
            let mut inner = self.inner.lock().await;
            let Some(file) = inner.file.clone() else {
                debug!("generate called without a selected file");
                return Ok(None);
            };

            inner.output = OutputState {
                loading: true,
                ..OutputState::default()
            };
            if let Some(url) = inner.live_blob.take() {
                self.blobs.revoke(&url);
            }
            file
        };

        info!(file_name = %file.file_name, want_pdf = self.want_pdf, "generating summary");
        let response = self
            .backend
            .upload_document(UploadRequest {
                file,
                want_pdf: self.want_pdf,
            })
            .await;

        let mut inner = self.inner.lock().await;
        inner.output.loading = false;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let err = UploadError::from(e);
                warn!(error = %err, "document processing failed");
                inner.output.message = Some(err.display_message());
                return Err(err);
            }
        };

        let summary = response.summary.unwrap_or_default();
        let flashcards = response.flashcards.unwrap_or_default();
        let mut pdf_error = response.pdf_error;

        let pdf_url = match response.pdf_b64.filter(|b| !b.is_empty()) {
            Some(encoded) => match BASE64.decode(encoded.trim()) {
                Ok(bytes) => {
                    if let Some(old) = inner.live_blob.take() {
                        self.blobs.revoke(&old);
                    }
                    let url = self.blobs.create(bytes, PDF_MIME);
                    inner.live_blob = Some(url.clone());
                    Some(url)
                }
                Err(e) => {
                    warn!(error = %e, "received PDF payload that is not valid base64");
                    if pdf_error.is_none() {
                        pdf_error = Some(format!("Failed to decode PDF: {e}"));
                    }
                    None
                }
            },
            None => None,
        };

        debug!(
            summary_len = summary.len(),
            flashcards = flashcards.len(),
            has_pdf = pdf_url.is_some(),
            "document processed"
        );

        inner.output.summary = summary.clone();
        inner.output.flashcards = flashcards.clone();
        inner.output.pdf_url = pdf_url.clone();
        inner.output.pdf_error = pdf_error.clone();

        Ok(Some(UploadResult {
            summary,
            flashcards,
            pdf_url,
            pdf_error,
        }))
    }
}

impl Drop for UploadController {
    fn drop(&mut self) {
        if let Some(url) = self.inner.get_mut().live_blob.take() {
            self.blobs.revoke(&url);
            debug!(%url, "released blob on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_blob_store_tracks_live_handles() {
        let store = MemoryBlobStore::new();
        let a = store.create(vec![1], PDF_MIME);
        let b = store.create(vec![2], PDF_MIME);
        assert_ne!(a, b);
        assert_eq!(store.live_count(), 2);
        assert_eq!(store.resolve(&a), Some(vec![1]));
        assert_eq!(store.mime_type(&b).as_deref(), Some(PDF_MIME));

        store.revoke(&a);
        store.revoke(&a);
        assert_eq!(store.live_count(), 1);
        assert_eq!(store.resolve(&a), None);
    }

    #[test]
    fn empty_result_renders_placeholder() {
        let state = OutputState::default();
        assert_eq!(state.view(), OutputView::Empty { pdf_url: None });
    }

    #[test]
    fn empty_result_still_offers_pdf() {
        let store = MemoryBlobStore::new();
        let url = store.create(vec![1], PDF_MIME);
        let state = OutputState {
            pdf_url: Some(url.clone()),
            ..OutputState::default()
        };
        assert_eq!(state.view(), OutputView::Empty { pdf_url: Some(url) });
    }

    #[test]
    fn loading_wins_over_everything() {
        let state = OutputState {
            loading: true,
            message: Some("boom".to_string()),
            ..OutputState::default()
        };
        assert_eq!(state.view(), OutputView::Loading);
    }

    #[test]
    fn flashcards_without_summary_is_content() {
        let state = OutputState {
            flashcards: vec![Flashcard {
                question: "Q".to_string(),
                answer: "A".to_string(),
            }],
            ..OutputState::default()
        };
        assert!(matches!(
            state.view(),
            OutputView::Content { summary: None, ref flashcards, .. } if flashcards.len() == 1
        ));
    }
}
