/// Generic text shown when an upload fails without a usable server message.
pub const GENERIC_UPLOAD_FAILURE: &str =
    "An error occurred while processing the file. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum ThinkNotesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("identity provider config incomplete. Missing: {}", .0.join(", "))]
    Incomplete(Vec<&'static str>),
}

/// Failure of a request to the ThinkNotes backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received
    #[error("network error: {0}")]
    Network(String),

    /// A non-2xx response; `body` is the raw response text
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Failure reported by the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with an error code such as `EMAIL_EXISTS`
    #[error("identity provider rejected the request: {code}")]
    Rejected {
        code: String,
        message: Option<String>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("no signed-in user")]
    NoCurrentUser,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

/// Sign-in, sign-up and sign-out failures, categorized for display.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("incorrect password")]
    WrongPassword,

    #[error("no user found with this email")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password is too weak")]
    WeakPassword,

    #[error("email already registered")]
    EmailInUse,

    #[error("network error: {0}")]
    Network(String),

    /// The provider no longer holds a signed-in user
    #[error("no active provider session")]
    SessionLost,

    #[error("provider error: {code}: {message}")]
    Provider { code: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Map a provider error code to a category.
    ///
    /// Accepts both REST codes (`EMAIL_NOT_FOUND`) and SDK codes
    /// (`auth/user-not-found`).
    pub fn from_provider_code(code: &str, message: Option<&str>) -> Self {
        match code {
            "EMAIL_NOT_FOUND" | "auth/user-not-found" => Self::UserNotFound,
            "INVALID_PASSWORD" | "auth/wrong-password" => Self::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" | "auth/invalid-credential" => Self::InvalidCredentials,
            "INVALID_EMAIL" | "auth/invalid-email" => Self::InvalidEmail,
            "WEAK_PASSWORD" | "auth/weak-password" => Self::WeakPassword,
            "EMAIL_EXISTS" | "auth/email-already-in-use" => Self::EmailInUse,
            _ => Self::Provider {
                code: code.to_string(),
                message: message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(code)
                    .to_string(),
            },
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField(field) => format!("Please enter your {field}."),
            Self::InvalidEmail => "Invalid email address.".to_string(),
            Self::WrongPassword => "Incorrect password.".to_string(),
            Self::UserNotFound => "No user found with this email.".to_string(),
            Self::InvalidCredentials => "Incorrect email or password.".to_string(),
            Self::WeakPassword => "Password is too weak.".to_string(),
            Self::EmailInUse => "This email is already registered.".to_string(),
            Self::Network(message) => format!("Network error: {message}"),
            Self::SessionLost => "Your session ended. Please sign in again.".to_string(),
            Self::Provider { message, .. } => message.clone(),
            Self::Storage(message) => format!("Could not save session: {message}"),
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected { code, message } => {
                Self::from_provider_code(&code, message.as_deref())
            }
            ProviderError::Network(message) => Self::Network(message),
            ProviderError::NoCurrentUser => Self::SessionLost,
            ProviderError::Storage(message) => Self::Storage(message),
        }
    }
}

/// Upload workflow failures.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The picked path does not point to a readable file
    #[error("no file selected: {0}")]
    NoFileSelected(String),

    #[error("unsupported file type: {0} (expected .pdf, .doc or .docx)")]
    UnsupportedFileType(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("server error {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Server { status: u16, detail: Option<String> },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl UploadError {
    /// The text the output panel shows for this failure.
    pub fn display_message(&self) -> String {
        match self {
            Self::Server {
                detail: Some(detail),
                ..
            } => format!("Server error: {detail}"),
            _ => GENERIC_UPLOAD_FAILURE.to_string(),
        }
    }
}

impl From<ApiError> for UploadError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Network(message) => Self::Network(message),
            ApiError::Status { status, body } => Self::Server {
                status,
                detail: crate::api::extract_server_message(&body),
            },
            ApiError::Decode(message) => Self::Decode(message),
        }
    }
}
