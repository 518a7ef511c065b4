#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use thinknotes::api::UploadRequest;
use thinknotes::{
    ApiError, AuthEvents, AuthSubscription, BackendApi, Flashcard, Identity, IdentityProvider,
    NavigateOptions, Navigator, ProviderError, UploadFile, UploadResponse, VerifiedUser,
};

pub fn identity(uid: &str, email: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        display_name: None,
    }
}

/// A scripted identity provider backed by a real [`AuthEvents`] registry.
pub struct MockProvider {
    events: AuthEvents,
    user: Mutex<Option<Identity>>,
    sign_in_failures: Mutex<VecDeque<ProviderError>>,
    fail_token_refresh: AtomicBool,
    fail_sign_out: AtomicBool,
    tokens_issued: AtomicUsize,
    created: Mutex<Vec<(String, Option<String>)>>,
    sign_outs: AtomicUsize,
}

impl MockProvider {
    /// A provider that has not resolved its initial state yet.
    pub fn unresolved() -> Self {
        Self {
            events: AuthEvents::new(),
            user: Mutex::new(None),
            sign_in_failures: Mutex::new(VecDeque::new()),
            fail_token_refresh: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
            tokens_issued: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn signed_out() -> Self {
        let provider = Self::unresolved();
        provider.events.publish(None);
        provider
    }

    pub fn signed_in(user: Identity) -> Self {
        let provider = Self::unresolved();
        *provider.user.lock().unwrap() = Some(user.clone());
        provider.events.publish(Some(user));
        provider
    }

    /// Fail the next sign-in with this error.
    pub fn fail_next_sign_in(&self, error: ProviderError) {
        self.sign_in_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_token_refresh(&self, fail: bool) {
        self.fail_token_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Push an auth-state change to every listener.
    pub fn emit(&self, change: Option<Identity>) {
        *self.user.lock().unwrap() = change.clone();
        self.events.publish(change);
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    pub fn created_accounts(&self) -> Vec<(String, Option<String>)> {
        self.created.lock().unwrap().clone()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<Identity, ProviderError> {
        if let Some(error) = self.sign_in_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let user = identity(&format!("uid-{email}"), email);
        self.emit(Some(user.clone()));
        Ok(user)
    }

    async fn create_account(
        &self,
        email: &str,
        _password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, ProviderError> {
        self.created
            .lock()
            .unwrap()
            .push((email.to_string(), display_name.map(str::to_string)));
        Ok(Identity {
            uid: format!("uid-{email}"),
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
        })
    }

    async fn id_token(&self, _force_refresh: bool) -> Result<String, ProviderError> {
        if self.fail_token_refresh.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                code: "TOKEN_EXPIRED".to_string(),
                message: None,
            });
        }
        if self.user.lock().unwrap().is_none() {
            return Err(ProviderError::NoCurrentUser);
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("id-token-{n}"))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Network("connection reset".to_string()));
        }
        self.emit(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Holds an upload inside the backend until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

/// A backend that replays scripted responses in order.
#[derive(Default)]
pub struct MockBackend {
    verify: Mutex<VecDeque<Result<VerifiedUser, ApiError>>>,
    uploads: Mutex<VecDeque<Result<UploadResponse, ApiError>>>,
    received: Mutex<Vec<(String, bool)>>,
    verified_tokens: Mutex<Vec<String>>,
    gate: Option<Arc<Gate>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn with_verify(self, result: Result<VerifiedUser, ApiError>) -> Self {
        self.verify.lock().unwrap().push_back(result);
        self
    }

    pub fn with_upload(self, result: Result<UploadResponse, ApiError>) -> Self {
        self.uploads.lock().unwrap().push_back(result);
        self
    }

    /// `(file_name, want_pdf)` for every upload received
    pub fn received(&self) -> Vec<(String, bool)> {
        self.received.lock().unwrap().clone()
    }

    pub fn verified_tokens(&self) -> Vec<String> {
        self.verified_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn verify_session(&self, id_token: &str) -> Result<VerifiedUser, ApiError> {
        self.verified_tokens
            .lock()
            .unwrap()
            .push(id_token.to_string());
        self.verify
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted verify response".to_string())))
    }

    async fn upload_document(&self, request: UploadRequest) -> Result<UploadResponse, ApiError> {
        self.received
            .lock()
            .unwrap()
            .push((request.file.file_name.clone(), request.want_pdf));

        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ApiError::Status {
                    status: 500,
                    body: String::new(),
                })
            })
    }
}

/// Records every navigation call.
#[derive(Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<(String, bool)>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(path, replace)` in call order
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(String, bool)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, options: NavigateOptions) {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), options.replace));
    }
}

pub fn pdf_file() -> UploadFile {
    UploadFile::new("notes.pdf", b"%PDF-1.4 test".to_vec()).expect("pdf is accepted")
}

pub fn response(summary: &str, cards: &[(&str, &str)], pdf_b64: Option<&str>) -> UploadResponse {
    UploadResponse {
        summary: Some(summary.to_string()),
        flashcards: Some(
            cards
                .iter()
                .map(|(q, a)| Flashcard {
                    question: q.to_string(),
                    answer: a.to_string(),
                })
                .collect(),
        ),
        pdf_b64: pdf_b64.map(str::to_string),
        pdf_error: None,
    }
}
