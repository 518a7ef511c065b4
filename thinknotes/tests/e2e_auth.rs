mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use common::{MockBackend, MockProvider, RecordingNavigator};
use thinknotes::store::keys;
use thinknotes::{
    AuthController, AuthError, GuardState, History, MemoryStorage, ProviderError, RouteGuard,
    SessionStorage, VerifiedUser,
};

struct Harness {
    provider: Arc<MockProvider>,
    backend: Arc<MockBackend>,
    storage: Arc<MemoryStorage>,
    navigator: Arc<RecordingNavigator>,
    auth: AuthController,
}

fn harness(provider: MockProvider, backend: MockBackend) -> Harness {
    let provider = Arc::new(provider);
    let backend = Arc::new(backend);
    let storage = Arc::new(MemoryStorage::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let auth = AuthController::new(
        provider.clone(),
        backend.clone(),
        storage.clone(),
        navigator.clone(),
    );
    Harness {
        provider,
        backend,
        storage,
        navigator,
        auth,
    }
}

#[tokio::test]
async fn test_sign_in_persists_session_and_opens_dashboard() {
    let backend = MockBackend::new().with_verify(Ok(VerifiedUser {
        uid: "backend-uid".to_string(),
        email: Some("ada@example.com".to_string()),
    }));
    let h = harness(MockProvider::signed_out(), backend);

    let session = h
        .auth
        .sign_in("ada@example.com", "hunter22")
        .await
        .expect("sign-in should succeed");

    assert_eq!(session.token.as_deref(), Some("id-token-1"));
    assert_eq!(session.user_identifier.as_deref(), Some("backend-uid"));
    assert_eq!(
        h.storage.get(keys::TOKEN).await.unwrap().as_deref(),
        Some("id-token-1")
    );
    assert_eq!(
        h.storage.get(keys::UID).await.unwrap().as_deref(),
        Some("backend-uid")
    );
    assert_eq!(
        h.storage.get(keys::USER_EMAIL).await.unwrap().as_deref(),
        Some("ada@example.com")
    );
    assert_eq!(h.backend.verified_tokens(), vec!["id-token-1"]);
    assert_eq!(
        h.navigator.calls(),
        vec![("/dashboard".to_string(), false)]
    );
}

#[tokio::test]
async fn test_backend_verification_failure_keeps_provider_session() {
    let h = harness(MockProvider::signed_out(), MockBackend::new());

    let session = h
        .auth
        .sign_in("ada@example.com", "hunter22")
        .await
        .expect("sign-in should succeed without backend verification");

    assert_eq!(
        session.user_identifier.as_deref(),
        Some("uid-ada@example.com")
    );
    assert!(h.storage.get(keys::TOKEN).await.unwrap().is_some());
    assert_eq!(h.storage.get(keys::UID).await.unwrap(), None);
    assert_eq!(
        h.navigator.last(),
        Some(("/dashboard".to_string(), false))
    );
}

#[tokio::test]
async fn test_rejected_credentials_write_nothing() {
    let h = harness(MockProvider::signed_out(), MockBackend::new());
    h.provider.fail_next_sign_in(ProviderError::Rejected {
        code: "INVALID_PASSWORD".to_string(),
        message: None,
    });

    let err = h
        .auth
        .sign_in("ada@example.com", "wrong")
        .await
        .expect_err("sign-in should fail");

    assert!(matches!(err, AuthError::WrongPassword));
    assert_eq!(err.user_message(), "Incorrect password.");
    assert!(h.storage.is_empty().await);
    assert!(h.navigator.calls().is_empty());
    assert!(h.backend.verified_tokens().is_empty());
}

#[tokio::test]
async fn test_malformed_input_never_reaches_provider() {
    let h = harness(MockProvider::signed_out(), MockBackend::new());
    h.provider.fail_next_sign_in(ProviderError::Rejected {
        code: "USER_DISABLED".to_string(),
        message: None,
    });

    assert!(matches!(
        h.auth.sign_in("not-an-email", "pw").await,
        Err(AuthError::InvalidEmail)
    ));
    assert!(matches!(
        h.auth.sign_in("ada@example.com", "").await,
        Err(AuthError::MissingField("password"))
    ));

    // The queued failure is still there, so the provider was never called.
    assert!(matches!(
        h.auth.sign_in("ada@example.com", "pw").await,
        Err(AuthError::Provider { code, .. }) if code == "USER_DISABLED"
    ));
}

#[tokio::test]
async fn test_sign_up_creates_account_without_session() {
    let h = harness(MockProvider::signed_out(), MockBackend::new());

    h.auth
        .sign_up("Ada Lovelace", "ada@example.com", "hunter22")
        .await
        .expect("sign-up should succeed");

    assert_eq!(
        h.provider.created_accounts(),
        vec![(
            "ada@example.com".to_string(),
            Some("Ada Lovelace".to_string())
        )]
    );
    assert!(h.storage.is_empty().await);
    assert!(h.navigator.calls().is_empty());

    let err = h
        .auth
        .sign_up("  ", "ada@example.com", "hunter22")
        .await
        .expect_err("name is required");
    assert!(matches!(err, AuthError::MissingField("full name")));
}

#[tokio::test]
async fn test_sign_out_clears_every_key_even_when_provider_fails() {
    let h = harness(
        MockProvider::signed_in(common::identity("u1", "ada@example.com")),
        MockBackend::new(),
    );
    for key in keys::SESSION_KEYS {
        h.storage.set(key, "value").await.unwrap();
    }
    h.provider.fail_sign_out(true);

    h.auth.sign_out().await;

    assert_eq!(h.provider.sign_out_calls(), 1);
    for key in keys::SESSION_KEYS {
        assert_eq!(h.storage.get(key).await.unwrap(), None, "{key} was left behind");
    }
    assert_eq!(h.navigator.last(), Some(("/".to_string(), false)));
}

#[tokio::test]
async fn test_guard_admits_user_after_sign_in() {
    let h = harness(MockProvider::signed_out(), MockBackend::new());
    let history = Arc::new(History::new("/signin"));

    h.auth
        .sign_in("ada@example.com", "hunter22")
        .await
        .expect("sign-in should succeed");

    let mut guard = RouteGuard::mount(h.provider.clone(), h.storage.clone(), history.clone());
    assert_eq!(guard.settle().await, GuardState::Authenticated);
    assert_eq!(
        h.storage.get(keys::TOKEN).await.unwrap().as_deref(),
        Some("id-token-2")
    );
    assert_eq!(history.current(), "/signin");
}

#[tokio::test]
async fn test_token_failure_after_provider_sign_in_rolls_back() {
    let h = harness(MockProvider::signed_out(), MockBackend::new());
    h.provider.fail_token_refresh(true);

    let err = h
        .auth
        .sign_in("ada@example.com", "hunter22")
        .await
        .expect_err("token could not be obtained");

    assert!(matches!(err, AuthError::Provider { ref code, .. } if code == "TOKEN_EXPIRED"));
    assert_eq!(h.provider.sign_out_calls(), 1);
    assert!(h.storage.is_empty().await);
    assert!(h.navigator.calls().is_empty());

    // A later guard must not admit the user who was told sign-in failed.
    h.provider.fail_token_refresh(false);
    let history = Arc::new(History::new("/dashboard"));
    let mut guard = RouteGuard::mount(h.provider.clone(), h.storage.clone(), history.clone());
    assert_eq!(guard.settle().await, GuardState::Unauthenticated);
    assert_eq!(h.storage.get(keys::TOKEN).await.unwrap(), None);
    assert_eq!(history.current(), "/signin");
}

/// Memory storage that refuses to write one key.
struct RejectingStorage {
    inner: MemoryStorage,
    rejected: &'static str,
}

#[async_trait]
impl SessionStorage for RejectingStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if key == self.rejected {
            anyhow::bail!("disk full");
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn test_storage_failure_after_provider_sign_in_rolls_back() {
    let provider = Arc::new(MockProvider::signed_out());
    let storage = Arc::new(RejectingStorage {
        inner: MemoryStorage::new(),
        rejected: keys::USER_EMAIL,
    });
    let navigator = Arc::new(RecordingNavigator::new());
    let auth = AuthController::new(
        provider.clone(),
        Arc::new(MockBackend::new()),
        storage.clone(),
        navigator.clone(),
    );

    let err = auth
        .sign_in("ada@example.com", "hunter22")
        .await
        .expect_err("email could not be stored");

    assert!(matches!(err, AuthError::Storage(_)));
    assert_eq!(provider.sign_out_calls(), 1);
    assert_eq!(storage.get(keys::TOKEN).await.unwrap(), None);
    assert!(navigator.calls().is_empty());
}
