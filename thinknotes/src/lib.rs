pub mod api;
pub mod auth;
pub mod builder;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod nav;
pub mod store;
mod thinknotes;
pub mod upload;

pub use api::{ApiClient, BackendApi, Flashcard, UploadFile, UploadResponse, VerifiedUser};
pub use auth::AuthController;
pub use builder::ThinkNotesBuilder;
pub use config::{ClientConfig, IdentityConfig};
pub use error::{ApiError, AuthError, ConfigError, ProviderError, ThinkNotesError, UploadError};
pub use guard::{GuardState, GuardView, RouteGuard};
pub use identity::{AuthEvents, AuthSubscription, FirebaseProvider, Identity, IdentityProvider};
pub use nav::{History, NavigateOptions, Navigator};
pub use store::{MemoryStorage, Session, SessionStorage, SqliteStorage, UserBadge};
pub use thinknotes::ThinkNotes;
pub use upload::{
    BlobStore, BlobUrl, MemoryBlobStore, OutputState, OutputView, UploadController, UploadResult,
};
