//! Key lifecycle and the authenticate-then-decrypt protocol.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cipher::{encrypt_blocks, parse_public_key};
use crate::config::{AuthFallback, KeyConfig, PromptOptions};
use crate::error::{CryptoKeyError, CryptoResult};
use crate::platform::{
    AuthOutcome, AuthPolicy, AuthRequest, Authenticator, PlatformError, SecureKeyStore,
};

/// Manages one biometric-gated RSA key pair held by a platform secure store.
///
/// The manager keeps no authenticated state between calls. Every `decrypt`
/// runs the full protocol:
///
/// ```text
/// KeyLookup ──► DirectDecryptAttempt ──► Success
///                      │
///                      └─ auth required ──► AuthenticationChallenge ──► Retry ──► Success
///                                                  │                      └─► DecryptionFailed
///                                                  ├─► BiometricAuthenticationFailed
///                                                  └─► BiometricNotAvailable
/// ```
///
/// Lifecycle calls (`init_key`, `delete_key`) are serialized against data
/// calls (`encrypt`, `decrypt`); data calls run concurrently.
#[derive(uniffi::Object)]
pub struct CryptoKeyManager {
    store: Arc<dyn SecureKeyStore>,
    authenticator: Arc<dyn Authenticator>,
    config: KeyConfig,
    lifecycle: RwLock<()>,
}

impl std::fmt::Debug for CryptoKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoKeyManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Source of challenge ids, unique within the process.
static NEXT_CHALLENGE_ID: AtomicU64 = AtomicU64::new(1);

/// Phases of one decrypt call, used for logging.
#[derive(Debug, Clone, Copy)]
enum DecryptPhase {
    DirectAttempt,
    AuthenticatedRetry,
}

#[uniffi::export]
impl CryptoKeyManager {
    /// Creates a manager for the key identity described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoKeyError::InvalidArgument`] if `config` is invalid.
    #[uniffi::constructor]
    pub fn new(
        store: Arc<dyn SecureKeyStore>,
        authenticator: Arc<dyn Authenticator>,
        config: KeyConfig,
    ) -> CryptoResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            authenticator,
            config,
            lifecycle: RwLock::new(()),
        })
    }

    /// Returns the configuration of this manager.
    #[must_use]
    pub fn config(&self) -> KeyConfig {
        self.config.clone()
    }

    /// Creates the key pair unless one already exists under the alias.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoKeyError::InitFailed`] if the store cannot be queried
    /// or rejects key generation.
    pub fn init_key(&self) -> CryptoResult<()> {
        let _guard = self.lifecycle_guard();
        let alias = self.alias();

        let exists = self
            .store
            .contains_key(alias.clone())
            .map_err(|e| CryptoKeyError::InitFailed(e.to_string()))?;
        if exists {
            log::debug!("key '{alias}' already exists, nothing to initialize");
            return Ok(());
        }

        self.store
            .generate_key_pair(alias.clone(), self.config.key_spec())
            .map_err(|e| {
                log::error!("key generation for '{alias}' failed: {e}");
                CryptoKeyError::InitFailed(e.to_string())
            })?;
        log::info!(
            "generated {}-bit key '{alias}'",
            self.config.key_size_bits
        );
        Ok(())
    }

    /// Deletes the key pair. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoKeyError::DeleteFailed`] on a store failure.
    pub fn delete_key(&self) -> CryptoResult<()> {
        let _guard = self.lifecycle_guard();
        let alias = self.alias();

        let exists = self
            .store
            .contains_key(alias.clone())
            .map_err(|e| CryptoKeyError::DeleteFailed(e.to_string()))?;
        if !exists {
            log::debug!("no key '{alias}' to delete");
            return Ok(());
        }

        match self.store.delete_key(alias.clone()) {
            Ok(()) => {
                log::info!("deleted key '{alias}'");
                Ok(())
            }
            Err(PlatformError::KeyNotFound(_)) => {
                log::debug!("key '{alias}' was already gone");
                Ok(())
            }
            Err(e) => {
                log::error!("failed to delete key '{alias}': {e}");
                Err(CryptoKeyError::DeleteFailed(e.to_string()))
            }
        }
    }

    /// Encrypts `plaintext` with the public key. Never prompts the user.
    ///
    /// # Errors
    ///
    /// - [`CryptoKeyError::DataTooLarge`] if `plaintext` exceeds the configured
    ///   maximum, checked before the store is touched
    /// - [`CryptoKeyError::KeyNotFound`] if no key exists
    /// - [`CryptoKeyError::UnsupportedPlatform`] if the store cannot serve keys
    /// - [`CryptoKeyError::EncryptionFailed`] otherwise
    pub fn encrypt(&self, plaintext: Vec<u8>) -> CryptoResult<Vec<u8>> {
        let max = u64::from(self.config.max_plaintext_len);
        let size = plaintext.len() as u64;
        if size > max {
            return Err(CryptoKeyError::DataTooLarge { size, max });
        }

        let _guard = self.data_guard();
        let alias = self.alias();

        let der = match self.store.public_key(alias.clone()) {
            Ok(Some(der)) => der,
            Ok(None) | Err(PlatformError::KeyNotFound(_)) => {
                return Err(key_not_found(&alias));
            }
            Err(PlatformError::Unsupported(msg)) => {
                return Err(CryptoKeyError::UnsupportedPlatform(msg));
            }
            Err(e) => return Err(CryptoKeyError::EncryptionFailed(e.to_string())),
        };

        let public_key = parse_public_key(&der)
            .map_err(|e| CryptoKeyError::EncryptionFailed(e.to_string()))?;
        let ciphertext = encrypt_blocks(&public_key, &plaintext)
            .map_err(|e| CryptoKeyError::EncryptionFailed(e.to_string()))?;

        log::debug!(
            "encrypted {size} bytes into {} bytes with key '{alias}'",
            ciphertext.len()
        );
        Ok(ciphertext)
    }

    /// Decrypts `ciphertext` with the private key, prompting the user when
    /// the store requires a fresh authentication.
    ///
    /// At most one challenge is presented and, after it succeeds, at most
    /// one further decryption is attempted.
    ///
    /// # Errors
    ///
    /// - [`CryptoKeyError::KeyNotFound`] if no key exists
    /// - [`CryptoKeyError::BiometricAuthenticationFailed`] if the challenge
    ///   failed or was canceled
    /// - [`CryptoKeyError::BiometricNotAvailable`] if no authenticator can be used
    /// - [`CryptoKeyError::UnsupportedPlatform`] if the store cannot serve keys
    /// - [`CryptoKeyError::DecryptionFailed`] otherwise
    pub fn decrypt(&self, ciphertext: Vec<u8>, prompt: PromptOptions) -> CryptoResult<Vec<u8>> {
        let _guard = self.data_guard();
        let alias = self.alias();

        // KeyLookup
        let exists = self
            .store
            .contains_key(alias.clone())
            .map_err(|e| CryptoKeyError::DecryptionFailed(e.to_string()))?;
        if !exists {
            return Err(key_not_found(&alias));
        }

        // DirectDecryptAttempt
        match self.store.decrypt(alias.clone(), ciphertext.clone(), None) {
            Ok(plaintext) => {
                log::debug!("decrypted with key '{alias}' without a challenge");
                return Ok(plaintext);
            }
            Err(PlatformError::AuthenticationRequired(msg)) => {
                log::debug!("key '{alias}' requires authentication: {msg}");
            }
            Err(e) => return Err(decrypt_error(&alias, DecryptPhase::DirectAttempt, e)),
        }

        // AuthenticationChallenge
        let policy = self.challenge_policy().ok_or_else(|| {
            CryptoKeyError::BiometricNotAvailable(
                "no biometric or device credential can be evaluated".to_string(),
            )
        })?;
        let challenge_id = NEXT_CHALLENGE_ID.fetch_add(1, Ordering::Relaxed);
        let request = AuthRequest {
            key_alias: alias.clone(),
            challenge_id,
            policy,
            prompt: prompt.resolve(&self.config.default_prompt),
        };
        log::info!("presenting {policy:?} challenge for key '{alias}'");

        match self.authenticator.authenticate(request) {
            Ok(AuthOutcome::Succeeded) => {}
            Ok(AuthOutcome::Failed { reason }) => {
                log::warn!("authentication for key '{alias}' failed: {reason}");
                return Err(CryptoKeyError::BiometricAuthenticationFailed(reason));
            }
            Ok(AuthOutcome::Canceled { reason }) => {
                log::info!("authentication for key '{alias}' canceled: {reason}");
                return Err(CryptoKeyError::BiometricAuthenticationFailed(format!(
                    "canceled: {reason}"
                )));
            }
            Ok(AuthOutcome::Unavailable { reason }) => {
                return Err(CryptoKeyError::BiometricNotAvailable(reason));
            }
            Err(e) => {
                log::error!("authentication prompt could not be presented: {e}");
                return Err(CryptoKeyError::BiometricNotAvailable(e.to_string()));
            }
        }

        // Authenticated retry, exactly once, under this call's challenge.
        self.store
            .decrypt(alias.clone(), ciphertext, Some(challenge_id))
            .map_err(|e| decrypt_error(&alias, DecryptPhase::AuthenticatedRetry, e))
    }

    /// Reports whether an authentication challenge can currently be presented.
    ///
    /// Never fails: probe errors count as unavailable.
    #[must_use]
    pub fn is_biometric_available(&self) -> bool {
        self.challenge_policy().is_some()
    }
}

impl CryptoKeyManager {
    fn alias(&self) -> String {
        self.config.alias.clone()
    }

    fn lifecycle_guard(&self) -> RwLockWriteGuard<'_, ()> {
        self.lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn data_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Picks the policy of the next challenge according to the configured
    /// fallback, or `None` if nothing can be evaluated.
    fn challenge_policy(&self) -> Option<AuthPolicy> {
        let candidates: &[AuthPolicy] = match self.config.fallback {
            AuthFallback::BiometricOnly => &[AuthPolicy::Biometric],
            AuthFallback::DeviceCredential => {
                &[AuthPolicy::Biometric, AuthPolicy::DeviceCredential]
            }
            AuthFallback::Combined => &[AuthPolicy::BiometricOrDeviceCredential],
        };
        candidates
            .iter()
            .copied()
            .find(|policy| self.can_authenticate(*policy))
    }

    fn can_authenticate(&self, policy: AuthPolicy) -> bool {
        match self.authenticator.can_authenticate(policy) {
            Ok(available) => available,
            Err(e) => {
                log::warn!("availability probe for {policy:?} failed: {e}");
                false
            }
        }
    }
}

fn key_not_found(alias: &str) -> CryptoKeyError {
    CryptoKeyError::KeyNotFound(format!("no key under alias '{alias}'. Call initKey() first."))
}

fn decrypt_error(alias: &str, phase: DecryptPhase, err: PlatformError) -> CryptoKeyError {
    log::warn!("{phase:?} with key '{alias}' failed: {err}");
    match err {
        PlatformError::KeyNotFound(_) => key_not_found(alias),
        PlatformError::Unsupported(msg) => CryptoKeyError::UnsupportedPlatform(msg),
        other => CryptoKeyError::DecryptionFailed(other.to_string()),
    }
}
