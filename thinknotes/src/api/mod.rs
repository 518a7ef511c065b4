mod backend;
mod client;
mod types;

pub use backend::BackendApi;
pub use client::{ApiClient, extract_server_message};
pub use types::{Flashcard, UploadFile, UploadRequest, UploadResponse, VerifiedUser, mime_for};
