use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::UploadError;

/// Accepted document types: (extension, MIME type).
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

/// MIME type for an accepted document name, or `None` if the type is not accepted.
pub fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ACCEPTED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// A document picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Wrap in-memory bytes, rejecting types the picker does not accept.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadError> {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name)
            .ok_or_else(|| UploadError::UnsupportedFileType(file_name.clone()))?;
        Ok(Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Read a document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.is_file() {
            return Err(UploadError::NoFileSelected(display));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| UploadError::NoFileSelected(display.clone()))?;

        // Check the type before reading a potentially large file
        if mime_for(&file_name).is_none() {
            return Err(UploadError::UnsupportedFileType(file_name));
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| UploadError::Io {
            path: display,
            message: e.to_string(),
        })?;

        Self::new(file_name, bytes)
    }
}

/// One upload attempt. Exists only for the duration of the request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: UploadFile,
    pub want_pdf: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: String,
}

/// Missing and `null` card text both read as empty.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of a successful `/api/gemini/upload` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub flashcards: Option<Vec<Flashcard>>,
    #[serde(default)]
    pub pdf_b64: Option<String>,
    /// Set by the server when it could not build the PDF
    #[serde(default)]
    pub pdf_error: Option<String>,
}

/// Body of a successful `/auth/login` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}
