use super::*;
use crate::net::types::{ApiError, LoginRequest, TokenPair};
use crate::state::store::MemoryStore;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =========================================================================
// MockAuth
// =========================================================================

#[derive(Clone, Copy)]
enum RefreshBehavior {
    Issue,
    Reject,
    NetworkDown,
    Empty,
}

struct MockAuth {
    valid: StdMutex<Vec<String>>,
    refresh: RefreshBehavior,
    refresh_delay: Duration,
    validate_down: bool,
    validate_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl MockAuth {
    fn new(valid: &[&str], refresh: RefreshBehavior) -> Self {
        Self {
            valid: StdMutex::new(valid.iter().map(|t| (*t).to_owned()).collect()),
            refresh,
            refresh_delay: Duration::ZERO,
            validate_down: false,
            validate_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuth {
    async fn login(&self, _tenant_id: &str, _request: &LoginRequest) -> Result<TokenPair, ApiError> {
        Err(ApiError::Status { status: 404, message: None })
    }

    async fn validate(&self, access_token: &str) -> Result<(), ApiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.validate_down {
            return Err(ApiError::Request("connection refused".into()));
        }
        if self.valid.lock().unwrap().iter().any(|t| t == access_token) {
            Ok(())
        } else {
            Err(ApiError::Status { status: 401, message: None })
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        match self.refresh {
            RefreshBehavior::Issue => {
                let token = format!("fresh-{n}-from-{refresh_token}");
                self.valid.lock().unwrap().push(token.clone());
                Ok(token)
            }
            RefreshBehavior::Reject => Err(ApiError::Status { status: 401, message: Some("expired".into()) }),
            RefreshBehavior::NetworkDown => Err(ApiError::Request("timeout".into())),
            RefreshBehavior::Empty => Ok(String::new()),
        }
    }
}

fn store_with(access: Option<&str>, refresh: Option<&str>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    if let Some(access) = access {
        store.set(SessionKey::AccessToken, access);
    }
    if let Some(refresh) = refresh {
        store.set(SessionKey::RefreshToken, refresh);
    }
    store
}

fn guard(api: &Arc<MockAuth>, store: &Arc<MemoryStore>) -> SessionGuard<Arc<MockAuth>, Arc<MemoryStore>> {
    SessionGuard::new(Arc::clone(api), Arc::clone(store))
}

// =========================================================================
// validate path
// =========================================================================

#[tokio::test]
async fn valid_access_token_authenticates_without_refresh() {
    let api = Arc::new(MockAuth::new(&["A"], RefreshBehavior::Issue));
    let store = store_with(Some("A"), Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Authenticated);
    assert_eq!(api.validate_calls(), 1);
    assert_eq!(api.refresh_calls(), 0);
    assert_eq!(store.get(SessionKey::AccessToken).as_deref(), Some("A"));
    assert_eq!(store.get(SessionKey::RefreshToken).as_deref(), Some("R"));
}

// =========================================================================
// refresh path
// =========================================================================

#[tokio::test]
async fn missing_access_token_refreshes_and_stores() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Issue));
    let store = store_with(None, Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Authenticated);
    assert_eq!(api.validate_calls(), 0);
    assert_eq!(api.refresh_calls(), 1);
    assert_eq!(store.get(SessionKey::AccessToken).as_deref(), Some("fresh-1-from-R"));
    assert_eq!(store.get(SessionKey::RefreshToken).as_deref(), Some("R"));
}

#[tokio::test]
async fn rejected_access_token_refreshes() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Issue));
    let store = store_with(Some("stale"), Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Authenticated);
    assert_eq!(api.validate_calls(), 1);
    assert_eq!(api.refresh_calls(), 1);
    assert_eq!(store.get(SessionKey::AccessToken).as_deref(), Some("fresh-1-from-R"));
}

#[tokio::test]
async fn validate_network_failure_falls_through_to_refresh() {
    let mut mock = MockAuth::new(&["A"], RefreshBehavior::Issue);
    mock.validate_down = true;
    let api = Arc::new(mock);
    let store = store_with(Some("A"), Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Authenticated);
    assert_eq!(api.refresh_calls(), 1);
}

#[tokio::test]
async fn blank_access_token_counts_as_absent() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Issue));
    let store = store_with(Some("  "), Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Authenticated);
    assert_eq!(api.validate_calls(), 0);
}

// =========================================================================
// unauthenticated
// =========================================================================

#[tokio::test]
async fn invalid_access_and_no_refresh_is_unauthenticated() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Issue));
    let store = store_with(Some("stale"), None);

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Unauthenticated);
    assert_eq!(api.refresh_calls(), 0);
    assert!(store.get(SessionKey::AccessToken).is_none());
}

#[tokio::test]
async fn invalid_access_and_refresh_rejected_is_unauthenticated() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Reject));
    let store = store_with(Some("stale"), Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Unauthenticated);
    assert_eq!(api.refresh_calls(), 1);
    assert!(store.get(SessionKey::AccessToken).is_none());
    assert!(store.get(SessionKey::RefreshToken).is_none());
}

#[tokio::test]
async fn refresh_network_failure_is_unauthenticated() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::NetworkDown));
    let store = store_with(None, Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Unauthenticated);
}

#[tokio::test]
async fn empty_refreshed_token_is_unauthenticated() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Empty));
    let store = store_with(None, Some("R"));

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Unauthenticated);
    assert!(store.get(SessionKey::AccessToken).is_none());
}

#[tokio::test]
async fn signed_out_makes_no_calls() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Issue));
    let store = store_with(None, None);

    assert_eq!(guard(&api, &store).evaluate().await, AuthStatus::Unauthenticated);
    assert_eq!(api.validate_calls(), 0);
    assert_eq!(api.refresh_calls(), 0);
}

#[tokio::test]
async fn keep_policy_leaves_store_untouched() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Reject));
    let store = store_with(Some("stale"), Some("R"));
    let guard = SessionGuard::with_policy(
        Arc::clone(&api),
        Arc::clone(&store),
        GuardPolicy { clear_on_unauthenticated: false },
    );

    assert_eq!(guard.evaluate().await, AuthStatus::Unauthenticated);
    assert_eq!(store.get(SessionKey::AccessToken).as_deref(), Some("stale"));
    assert_eq!(store.get(SessionKey::RefreshToken).as_deref(), Some("R"));
}

#[test]
fn policy_from_config() {
    let config = ConsoleConfig { clear_on_unauthenticated: false, ..ConsoleConfig::default() };
    assert!(!GuardPolicy::from(&config).clear_on_unauthenticated);
    assert!(GuardPolicy::default().clear_on_unauthenticated);
}

// =========================================================================
// concurrency
// =========================================================================

#[tokio::test]
async fn concurrent_evaluations_share_one_refresh() {
    let mut mock = MockAuth::new(&[], RefreshBehavior::Issue);
    mock.refresh_delay = Duration::from_millis(20);
    let api = Arc::new(mock);
    let store = store_with(Some("stale"), Some("R"));
    let guard = guard(&api, &store);

    let (a, b) = tokio::join!(guard.evaluate(), guard.evaluate());
    assert_eq!(a, AuthStatus::Authenticated);
    assert_eq!(b, AuthStatus::Authenticated);
    assert_eq!(api.refresh_calls(), 1);
    assert_eq!(store.get(SessionKey::AccessToken).as_deref(), Some("fresh-1-from-R"));
}

#[tokio::test]
async fn separate_guards_may_both_refresh() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Issue));
    let store = store_with(None, Some("R"));
    let first = guard(&api, &store);
    let second = guard(&api, &store);

    assert_eq!(first.evaluate().await, AuthStatus::Authenticated);
    store.remove(SessionKey::AccessToken);
    assert_eq!(second.evaluate().await, AuthStatus::Authenticated);

    assert_eq!(api.refresh_calls(), 2);
    assert_eq!(store.get(SessionKey::AccessToken).as_deref(), Some("fresh-2-from-R"));
}

// =========================================================================
// evaluate_state
// =========================================================================

#[tokio::test]
async fn evaluate_state_reports_roles_when_authenticated() {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"root","roles":["ROLE_SUPER_ADMIN"]}"#);
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512"}"#);
    let token = format!("{header}.{payload}.sig");
    let api = Arc::new(MockAuth::new(&[token.as_str()], RefreshBehavior::Reject));
    let store = store_with(Some(token.as_str()), None);

    let state = guard(&api, &store).evaluate_state().await;
    assert_eq!(state.status, AuthStatus::Authenticated);
    assert_eq!(state.roles, vec!["ROLE_SUPER_ADMIN"]);
    assert!(!state.loading());
}

#[tokio::test]
async fn evaluate_state_has_no_roles_when_unauthenticated() {
    let api = Arc::new(MockAuth::new(&[], RefreshBehavior::Reject));
    let store = store_with(None, None);

    let state = guard(&api, &store).evaluate_state().await;
    assert_eq!(state.status, AuthStatus::Unauthenticated);
    assert!(state.roles.is_empty());
}
