//! Test doubles shared across integration tests.

#![allow(dead_code, missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use biokey_core::platform::{
    AuthOutcome, AuthPolicy, AuthRequest, Authenticator, KeySpec, PlatformError,
    PlatformResult, PresenceGate, SecureKeyStore, SoftwareKeyStore,
};
use biokey_core::{AuthFallback, CryptoKeyManager, KeyConfig};

/// Call counters for a [`CountingKeyStore`].
#[derive(Debug, Default)]
pub struct StoreCalls {
    pub contains_key: AtomicUsize,
    pub generate_key_pair: AtomicUsize,
    pub delete_key: AtomicUsize,
    pub public_key: AtomicUsize,
    pub decrypt: AtomicUsize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.contains_key.load(Ordering::SeqCst)
            + self.generate_key_pair.load(Ordering::SeqCst)
            + self.delete_key.load(Ordering::SeqCst)
            + self.public_key.load(Ordering::SeqCst)
            + self.decrypt.load(Ordering::SeqCst)
    }
}

/// Wraps a [`SoftwareKeyStore`], counting calls and replaying scripted
/// failures before delegating.
pub struct CountingKeyStore {
    inner: SoftwareKeyStore,
    pub calls: StoreCalls,
    decrypt_script: Mutex<VecDeque<PlatformError>>,
    generate_failure: Mutex<Option<PlatformError>>,
    delete_failure: Mutex<Option<PlatformError>>,
    public_key_failure: Mutex<Option<PlatformError>>,
}

impl CountingKeyStore {
    pub fn new(presence: Arc<PresenceGate>) -> Self {
        Self {
            inner: SoftwareKeyStore::in_memory(presence),
            calls: StoreCalls::default(),
            decrypt_script: Mutex::new(VecDeque::new()),
            generate_failure: Mutex::new(None),
            delete_failure: Mutex::new(None),
            public_key_failure: Mutex::new(None),
        }
    }

    /// The next `decrypt` calls fail with `errors`, in order.
    pub fn script_decrypt_failures(&self, errors: impl IntoIterator<Item = PlatformError>) {
        self.decrypt_script.lock().unwrap().extend(errors);
    }

    pub fn fail_generate_with(&self, error: PlatformError) {
        *self.generate_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_delete_with(&self, error: PlatformError) {
        *self.delete_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_public_key_with(&self, error: PlatformError) {
        *self.public_key_failure.lock().unwrap() = Some(error);
    }

    pub fn decrypt_calls(&self) -> usize {
        self.calls.decrypt.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.calls.generate_key_pair.load(Ordering::SeqCst)
    }
}

impl SecureKeyStore for CountingKeyStore {
    fn contains_key(&self, alias: String) -> PlatformResult<bool> {
        self.calls.contains_key.fetch_add(1, Ordering::SeqCst);
        self.inner.contains_key(alias)
    }

    fn generate_key_pair(&self, alias: String, spec: KeySpec) -> PlatformResult<()> {
        self.calls.generate_key_pair.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.generate_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.inner.generate_key_pair(alias, spec)
    }

    fn delete_key(&self, alias: String) -> PlatformResult<()> {
        self.calls.delete_key.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.delete_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.inner.delete_key(alias)
    }

    fn public_key(&self, alias: String) -> PlatformResult<Option<Vec<u8>>> {
        self.calls.public_key.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.public_key_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.inner.public_key(alias)
    }

    fn decrypt(
        &self,
        alias: String,
        ciphertext: Vec<u8>,
        challenge_id: Option<u64>,
    ) -> PlatformResult<Vec<u8>> {
        self.calls.decrypt.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.decrypt_script.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.inner.decrypt(alias, ciphertext, challenge_id)
    }
}

/// Authenticator with scripted probe results and outcome. Grants the
/// presence gate on success, like the software authenticator.
pub struct ScriptedAuthenticator {
    presence: Arc<PresenceGate>,
    probes: Mutex<HashMap<AuthPolicy, PlatformResult<bool>>>,
    outcome: Mutex<PlatformResult<AuthOutcome>>,
    pub requests: Mutex<Vec<AuthRequest>>,
}

impl ScriptedAuthenticator {
    /// Every policy is available and every challenge succeeds.
    pub fn approving(presence: Arc<PresenceGate>) -> Self {
        Self {
            presence,
            probes: Mutex::new(HashMap::new()),
            outcome: Mutex::new(Ok(AuthOutcome::Succeeded)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_probe(&self, policy: AuthPolicy, result: PlatformResult<bool>) {
        self.probes.lock().unwrap().insert(policy, result);
    }

    pub fn set_outcome(&self, outcome: PlatformResult<AuthOutcome>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn challenges(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<AuthRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

fn clone_result<T: Clone>(result: &PlatformResult<T>) -> PlatformResult<T> {
    match result {
        Ok(value) => Ok(value.clone()),
        Err(error) => Err(PlatformError::Rejected(error.to_string())),
    }
}

impl Authenticator for ScriptedAuthenticator {
    fn can_authenticate(&self, policy: AuthPolicy) -> PlatformResult<bool> {
        self.probes
            .lock()
            .unwrap()
            .get(&policy)
            .map_or(Ok(true), clone_result)
    }

    fn authenticate(&self, request: AuthRequest) -> PlatformResult<AuthOutcome> {
        let alias = request.key_alias.clone();
        let challenge_id = request.challenge_id;
        self.requests.lock().unwrap().push(request);
        let outcome = clone_result(&*self.outcome.lock().unwrap());
        if matches!(outcome, Ok(AuthOutcome::Succeeded)) {
            self.presence.grant(&alias, challenge_id);
        }
        outcome
    }
}

/// A manager wired to counting doubles.
pub struct Harness {
    pub store: Arc<CountingKeyStore>,
    pub authenticator: Arc<ScriptedAuthenticator>,
    pub manager: CryptoKeyManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(KeyConfig::default())
    }

    pub fn with_fallback(fallback: AuthFallback) -> Self {
        Self::with_config(KeyConfig {
            fallback,
            ..KeyConfig::default()
        })
    }

    pub fn with_config(config: KeyConfig) -> Self {
        let presence = Arc::new(PresenceGate::new());
        let store = Arc::new(CountingKeyStore::new(Arc::clone(&presence)));
        let authenticator = Arc::new(ScriptedAuthenticator::approving(presence));
        let manager = CryptoKeyManager::new(
            Arc::clone(&store) as Arc<dyn SecureKeyStore>,
            Arc::clone(&authenticator) as Arc<dyn Authenticator>,
            config,
        )
        .unwrap();
        Self {
            store,
            authenticator,
            manager,
        }
    }
}
