//! The session store: single source of truth for "who is logged in".
//!
//! One identity at most, held in memory, persisted through a
//! [`KeyValueStore`], restored once at process start and broadcast to every
//! subscriber on change. Mutations run to completion on the calling thread;
//! there is no internal threading and no async dispatch.
//!
//! Failure policy (deliberate): no public operation propagates an internal
//! error. Storage, JSON and token-decode failures are caught where they
//! occur, logged, and collapsed into "treat the session as absent/invalid" -
//! the store always resolves to a definite logged-in/out state.

use std::sync::{Arc, Mutex, mpsc};

use chrono::Utc;

use pathways_auth::{CurrentUser, TokenExpiry, UserType, decode_claims, evaluate_expiry};

use crate::keys;
use crate::storage::KeyValueStore;

/// Session snapshot as consumers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted session not read yet; consumers should hold still rather
    /// than act on a state that is about to be replaced.
    Loading,
    /// Initial load finished; `None` means logged out.
    Ready(Option<CurrentUser>),
}

/// A live subscription to session snapshots.
///
/// Receives the current snapshot immediately on subscribe (once the store
/// has finished its initial load) and again after every mutation, in
/// mutation order. Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<Option<CurrentUser>>,
}

impl Subscription {
    /// Next snapshot without blocking.
    pub fn try_recv(&self) -> Result<Option<CurrentUser>, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block until the next snapshot.
    pub fn recv(&self) -> Result<Option<CurrentUser>, mpsc::RecvError> {
        self.receiver.recv()
    }
}

struct Inner {
    current: Option<CurrentUser>,
    initialized: bool,
    subscribers: Vec<mpsc::Sender<Option<CurrentUser>>>,
}

/// Durable, observable holder of the authenticated identity.
///
/// Explicitly constructed and injected (one per process in production, one
/// per test elsewhere) - not a global.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl SessionStore {
    /// Construct over `storage` without reading it; the store reports
    /// [`SessionState::Loading`] until [`initialize`](Self::initialize) runs.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            inner: Mutex::new(Inner {
                current: None,
                initialized: false,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Construct and immediately run the initial load.
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(storage);
        store.initialize();
        store
    }

    /// Restore the persisted session, once. Subsequent calls are no-ops.
    ///
    /// Decision table for a persisted identity:
    /// - super-admin: accepted with no token check at all (kept as shipped;
    ///   see DESIGN.md for the sign-off flag on this asymmetry);
    /// - no token: partial state, cleared;
    /// - token with decodable claims: expiry decides (5-minute grace);
    /// - undecodable token: accepted - the backend rejects a bad token on
    ///   the next call anyway, and legacy opaque tokens must keep working.
    pub fn initialize(&self) {
        let mut inner = self.lock_inner();
        if inner.initialized {
            return;
        }

        inner.current = self.restore_session();
        inner.initialized = true;
        Self::notify(&mut inner);
    }

    /// Current snapshot, including whether the initial load has happened.
    pub fn state(&self) -> SessionState {
        let inner = self.lock_inner();
        if inner.initialized {
            SessionState::Ready(inner.current.clone())
        } else {
            SessionState::Loading
        }
    }

    /// Synchronous read of the in-memory identity.
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.lock_inner().current.clone()
    }

    /// True iff an identity with a non-empty id is materialized.
    ///
    /// Token presence is deliberately NOT rechecked here for any role; the
    /// token only influences the initial load. This reproduces the shipped
    /// behavior rather than the stricter documented intent.
    pub fn is_logged_in(&self) -> bool {
        self.lock_inner()
            .current
            .as_ref()
            .is_some_and(CurrentUser::is_present)
    }

    /// Replace the identity, persist it, notify subscribers.
    ///
    /// No shape validation beyond the type: the login response is the trust
    /// boundary here, and the backend re-authorizes every request anyway.
    pub fn set_current_user(&self, user: CurrentUser) {
        let mut inner = self.lock_inner();
        inner.current = Some(user);
        self.persist_current(&inner);
        Self::notify(&mut inner);
    }

    /// Mutate only the consent flag of a present identity, re-persist,
    /// notify. Logged no-op when no identity is present.
    pub fn update_consent(&self, consented: bool) {
        let mut inner = self.lock_inner();
        let Some(user) = inner.current.as_mut() else {
            tracing::warn!("consent update with no active session; ignoring");
            return;
        };
        user.has_consented_data_protection = consented;
        self.persist_current(&inner);
        Self::notify(&mut inner);
    }

    /// Drop the identity, erase every managed storage key, notify.
    pub fn clear_current_user(&self) {
        let mut inner = self.lock_inner();
        inner.current = None;
        self.erase_all();
        Self::notify(&mut inner);
    }

    /// Register a subscriber. Replays the current snapshot immediately if
    /// the initial load has finished.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.lock_inner();
        if inner.initialized {
            let _ = tx.send(inner.current.clone());
        }
        inner.subscribers.push(tx);
        Subscription { receiver: rx }
    }

    // ── Token + auxiliary keys ───────────────────────────────────────────

    /// Persist the raw bearer token alongside the identity.
    pub fn set_auth_token(&self, token: &str) {
        if let Err(err) = self.storage.set(keys::AUTH_TOKEN, token) {
            tracing::error!("failed to persist auth token: {err}");
        }
    }

    /// The persisted bearer token, if any.
    pub fn auth_token(&self) -> Option<String> {
        match self.storage.get(keys::AUTH_TOKEN) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("failed to read auth token: {err}");
                None
            }
        }
    }

    /// Cache the address the UNHCR-validation mail went to.
    pub fn set_validation_email(&self, email: &str) {
        if let Err(err) = self.storage.set(keys::VALIDATION_EMAIL, email) {
            tracing::warn!("failed to cache validation email: {err}");
        }
    }

    /// The cached validation address, if any.
    pub fn validation_email(&self) -> Option<String> {
        match self.storage.get(keys::VALIDATION_EMAIL) {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!("failed to read validation email: {err}");
                None
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-mutation; the snapshot is still
        // the best state we have.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run the restore decision table against persisted state.
    fn restore_session(&self) -> Option<CurrentUser> {
        let raw_user = match self.storage.get(keys::CURRENT_USER) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("failed to read persisted identity: {err}");
                self.erase_all();
                return None;
            }
        };
        let Some(raw_user) = raw_user else {
            self.erase_all();
            return None;
        };

        let user: CurrentUser = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!("persisted identity is not valid JSON ({err}); discarding");
                self.erase_all();
                return None;
            }
        };

        if user.user_type == UserType::SuperAdmin {
            return Some(user);
        }

        let token = match self.storage.get(keys::AUTH_TOKEN) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("failed to read persisted token: {err}");
                self.erase_all();
                return None;
            }
        };
        let Some(token) = token else {
            tracing::info!("persisted identity without token; discarding partial session");
            self.erase_all();
            return None;
        };

        match decode_claims(&token) {
            Ok(claims) => match evaluate_expiry(&claims, Utc::now()) {
                TokenExpiry::Expired => {
                    tracing::info!("persisted token expired beyond grace; discarding session");
                    self.erase_all();
                    None
                }
                TokenExpiry::Valid => Some(user),
            },
            Err(err) => {
                // Compatibility fallback, not an error: decision deferred to
                // the backend's own check on the next authenticated call.
                tracing::warn!("could not decode persisted token ({err}); keeping session");
                Some(user)
            }
        }
    }

    fn persist_current(&self, inner: &Inner) {
        let Some(user) = inner.current.as_ref() else {
            return;
        };
        match serde_json::to_string(user) {
            Ok(json) => {
                if let Err(err) = self.storage.set(keys::CURRENT_USER, &json) {
                    tracing::error!("failed to persist session identity: {err}");
                }
            }
            Err(err) => {
                tracing::error!("failed to serialize session identity: {err}");
            }
        }
    }

    fn erase_all(&self) {
        for key in keys::MANAGED {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, "failed to erase session key: {err}");
            }
        }
    }

    /// Synchronous, in-order fan-out; dead subscribers are pruned as a side
    /// effect of publishing.
    fn notify(inner: &mut Inner) {
        let snapshot = inner.current.clone();
        inner
            .subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use pathways_auth::{CompanyRole, claims::EXPIRY_GRACE_SECS};
    use pathways_core::{AccountId, CompanyId};

    fn refugee(id: &str) -> CurrentUser {
        CurrentUser::new(AccountId::new(id), "amina@mail.org", UserType::Refugee)
    }

    fn mint_token(exp: Option<i64>) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = match exp {
            Some(exp) => URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#)),
            None => URL_SAFE_NO_PAD.encode(b"{}"),
        };
        format!("{header}.{payload}.fakesig")
    }

    fn seeded_store(user: &CurrentUser, token: Option<&str>) -> Arc<MemoryStore> {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(keys::CURRENT_USER, &serde_json::to_string(user).unwrap())
            .unwrap();
        if let Some(token) = token {
            storage.set(keys::AUTH_TOKEN, token).unwrap();
        }
        storage
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));

        let mut user = refugee("u-1");
        user.company_id = Some(CompanyId::new("c-1"));
        user.role = Some(CompanyRole::CompanyUser);
        user.phone = Some("+49 151 0000".to_string());

        store.set_current_user(user.clone());
        assert_eq!(store.current_user(), Some(user));
        assert!(store.is_logged_in());
    }

    #[test]
    fn clear_erases_every_managed_key() {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::open(storage.clone());
        store.set_current_user(refugee("u-1"));
        store.set_auth_token(&mint_token(None));
        storage.set(keys::VALIDATION_EMAIL, "amina@mail.org").unwrap();
        storage.set(keys::API_CACHE, "{}").unwrap();

        store.clear_current_user();

        assert_eq!(store.current_user(), None);
        assert!(!store.is_logged_in());
        for key in keys::MANAGED {
            assert_eq!(storage.get(key).unwrap(), None, "key {key} should be erased");
        }
    }

    #[test]
    fn consent_update_without_identity_is_a_noop() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        store.update_consent(true);
        assert_eq!(store.current_user(), None);
    }

    #[test]
    fn consent_update_changes_only_the_flag() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));

        let mut user = refugee("u-2");
        user.first_name = Some("Amina".to_string());
        user.last_name = Some("Haddad".to_string());
        store.set_current_user(user.clone());

        store.update_consent(true);

        let updated = store.current_user().unwrap();
        assert!(updated.has_consented_data_protection);
        let mut expected = user;
        expected.has_consented_data_protection = true;
        assert_eq!(updated, expected);
    }

    #[test]
    fn consent_update_is_persisted() {
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::open(storage.clone());
        store.set_current_user(refugee("u-3"));
        store.update_consent(true);

        let raw = storage.get(keys::CURRENT_USER).unwrap().unwrap();
        let persisted: CurrentUser = serde_json::from_str(&raw).unwrap();
        assert!(persisted.has_consented_data_protection);
    }

    #[test]
    fn subscribe_after_load_replays_current_snapshot() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        store.set_current_user(refugee("u-4"));

        let sub = store.subscribe();
        let replay = sub.try_recv().unwrap();
        assert_eq!(replay.unwrap().id, AccountId::new("u-4"));
        // Exactly once - no second snapshot without a mutation.
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn subscribe_before_load_gets_no_replay_until_initialize() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let sub = store.subscribe();
        assert!(sub.try_recv().is_err());

        store.initialize();
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn every_mutation_fans_out_in_order() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        let sub = store.subscribe();
        let _ = sub.try_recv();

        store.set_current_user(refugee("u-5"));
        store.update_consent(true);
        store.clear_current_user();

        assert_eq!(sub.try_recv().unwrap().unwrap().id, AccountId::new("u-5"));
        assert!(sub.try_recv().unwrap().unwrap().has_consented_data_protection);
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn dropped_subscription_is_pruned_on_next_publish() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        let sub = store.subscribe();
        drop(sub);

        // Publishing after the drop must not fail or leak the sender.
        store.set_current_user(refugee("u-6"));
        let live = store.subscribe();
        assert!(live.try_recv().unwrap().is_some());
    }

    #[test]
    fn restore_accepts_super_admin_without_token() {
        let admin = CurrentUser::new(AccountId::new("sa-1"), "root@platform.org", UserType::SuperAdmin);
        let store = SessionStore::open(seeded_store(&admin, None));

        assert!(store.is_logged_in());
        assert_eq!(store.current_user().unwrap().user_type, UserType::SuperAdmin);
    }

    #[test]
    fn restore_discards_non_admin_identity_without_token() {
        let store = SessionStore::open(seeded_store(&refugee("u-7"), None));
        assert!(!store.is_logged_in());
        assert_eq!(store.state(), SessionState::Ready(None));
    }

    #[test]
    fn restore_discards_expired_token_beyond_grace() {
        let exp = Utc::now().timestamp() - EXPIRY_GRACE_SECS - 100;
        let storage = seeded_store(&refugee("u-8"), Some(&mint_token(Some(exp))));
        let store = SessionStore::open(storage.clone());

        assert!(!store.is_logged_in());
        for key in keys::MANAGED {
            assert_eq!(storage.get(key).unwrap(), None);
        }
    }

    #[test]
    fn restore_keeps_token_expired_within_grace() {
        let exp = Utc::now().timestamp() - 60;
        let store = SessionStore::open(seeded_store(&refugee("u-9"), Some(&mint_token(Some(exp)))));
        assert!(store.is_logged_in());
    }

    #[test]
    fn restore_keeps_valid_and_expiryless_tokens() {
        let exp = Utc::now().timestamp() + 3600;
        let store = SessionStore::open(seeded_store(&refugee("u-10"), Some(&mint_token(Some(exp)))));
        assert!(store.is_logged_in());

        let store = SessionStore::open(seeded_store(&refugee("u-11"), Some(&mint_token(None))));
        assert!(store.is_logged_in());
    }

    #[test]
    fn restore_keeps_session_on_undecodable_token() {
        // Not a three-segment JWT at all - compatibility fallback applies.
        let store = SessionStore::open(seeded_store(&refugee("u-12"), Some("opaque-legacy-token")));
        assert!(store.is_logged_in());
    }

    #[test]
    fn restore_discards_unparseable_identity_json() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::CURRENT_USER, "{not json").unwrap();
        storage.set(keys::AUTH_TOKEN, &mint_token(None)).unwrap();

        let store = SessionStore::open(storage.clone());
        assert!(!store.is_logged_in());
        assert_eq!(storage.get(keys::AUTH_TOKEN).unwrap(), None);
    }

    #[test]
    fn restore_with_empty_storage_is_logged_out() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        assert!(!store.is_logged_in());
        assert_eq!(store.state(), SessionState::Ready(None));
    }

    #[test]
    fn initialize_runs_once() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        let sub = store.subscribe();
        let _ = sub.try_recv();

        // A second initialize must not replay or mutate.
        store.initialize();
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn state_reports_loading_before_initialize() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(store.state(), SessionState::Loading);
    }

    #[test]
    fn validation_email_caches_until_logout() {
        let store = SessionStore::open(Arc::new(MemoryStore::new()));
        store.set_validation_email("amina@mail.org");
        assert_eq!(store.validation_email().as_deref(), Some("amina@mail.org"));

        store.clear_current_user();
        assert_eq!(store.validation_email(), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_user() -> impl Strategy<Value = CurrentUser> {
            (
                "[a-z0-9-]{1,16}",
                "[a-z]{1,10}@[a-z]{1,10}\\.org",
                prop_oneof![
                    Just(UserType::SuperAdmin),
                    Just(UserType::Admin),
                    Just(UserType::EmployerAdmin),
                    Just(UserType::CompanyUser),
                    Just(UserType::Refugee),
                ],
                prop_oneof![
                    Just(None),
                    Just(Some(CompanyRole::CompanyAdmin)),
                    Just(Some(CompanyRole::CompanyUser)),
                ],
                proptest::option::of("[a-z0-9-]{1,8}"),
                any::<bool>(),
            )
                .prop_map(|(id, email, user_type, role, company, consent)| {
                    let mut user = CurrentUser::new(AccountId::new(id), email, user_type);
                    user.role = role;
                    user.company_id = company.map(CompanyId::new);
                    user.has_consented_data_protection = consent;
                    user
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: set-then-get round-trips any well-formed identity.
            #[test]
            fn set_get_round_trips(user in any_user()) {
                let store = SessionStore::open(Arc::new(MemoryStore::new()));
                store.set_current_user(user.clone());
                prop_assert_eq!(store.current_user(), Some(user));
            }

            /// Property: a consent update changes the flag and nothing else.
            #[test]
            fn consent_update_preserves_other_fields(user in any_user(), flag in any::<bool>()) {
                let store = SessionStore::open(Arc::new(MemoryStore::new()));
                store.set_current_user(user.clone());
                store.update_consent(flag);

                let mut expected = user;
                expected.has_consented_data_protection = flag;
                prop_assert_eq!(store.current_user(), Some(expected));
            }
        }
    }
}
