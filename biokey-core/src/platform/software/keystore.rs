//! Portable implementation of [`SecureKeyStore`].
//!
//! Keys live in process memory or in a directory, one JSON file per alias:
//!
//! ```text
//! <root>/
//! └── <hex(alias)>.json   { version, require_user_authentication, private_key }
//! ```
//!
//! The private key is stored as hex-encoded PKCS#8 DER. This gives no
//! hardware protection; it exists for tests, desktop development and the
//! CLI, where it stands in for the Android Keystore or the iOS Keychain.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::PresenceGate;
use crate::cipher::decrypt_blocks;
use crate::platform::{KeySpec, PlatformError, PlatformResult, SecureKeyStore};

const KEY_FILE_VERSION: u32 = 1;
const KEY_FILE_EXTENSION: &str = "json";
#[cfg(unix)]
const KEY_FILE_MODE: u32 = 0o600;
const SUPPORTED_KEY_SIZES: std::ops::RangeInclusive<u32> = 1024..=4096;

#[derive(Clone)]
struct StoredKey {
    private_key: RsaPrivateKey,
    require_user_authentication: bool,
}

#[derive(Serialize, Deserialize)]
struct KeyFile {
    version: u32,
    require_user_authentication: bool,
    private_key: String,
}

enum Backend {
    Memory(Mutex<HashMap<String, StoredKey>>),
    Directory(PathBuf),
}

/// Software [`SecureKeyStore`] enforcing per-use authentication through a
/// [`PresenceGate`].
pub struct SoftwareKeyStore {
    backend: Backend,
    presence: Arc<PresenceGate>,
}

impl std::fmt::Debug for SoftwareKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Memory(_) => "memory".to_string(),
            Backend::Directory(root) => root.display().to_string(),
        };
        f.debug_struct("SoftwareKeyStore")
            .field("backend", &backend)
            .finish_non_exhaustive()
    }
}

impl SoftwareKeyStore {
    /// Creates a store that keeps keys in memory only.
    #[must_use]
    pub fn in_memory(presence: Arc<PresenceGate>) -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
            presence,
        }
    }

    /// Creates a store persisting keys under `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if the directory cannot be created.
    pub fn in_directory<P: AsRef<Path>>(
        root: P,
        presence: Arc<PresenceGate>,
    ) -> PlatformResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            PlatformError::Io(format!(
                "failed to create key directory '{}': {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            backend: Backend::Directory(root),
            presence,
        })
    }

    fn key_path(root: &Path, alias: &str) -> PathBuf {
        root.join(format!("{}.{KEY_FILE_EXTENSION}", hex::encode(alias)))
    }

    fn load(&self, alias: &str) -> PlatformResult<Option<StoredKey>> {
        match &self.backend {
            Backend::Memory(keys) => Ok(keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(alias)
                .cloned()),
            Backend::Directory(root) => {
                let path = Self::key_path(root, alias);
                let bytes = match fs::read(&path) {
                    Ok(bytes) => Zeroizing::new(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => {
                        return Err(PlatformError::Io(format!(
                            "failed to read key file '{}': {e}",
                            path.display()
                        )))
                    }
                };
                decode_key_file(&bytes).map(Some)
            }
        }
    }

    fn save(&self, alias: &str, key: StoredKey) -> PlatformResult<()> {
        match &self.backend {
            Backend::Memory(keys) => {
                keys.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(alias.to_string(), key);
                Ok(())
            }
            Backend::Directory(root) => {
                let bytes = encode_key_file(&key)?;
                let path = Self::key_path(root, alias);
                write_atomic(root, &path, &bytes).map_err(|e| {
                    PlatformError::Io(format!(
                        "failed to write key file '{}': {e}",
                        path.display()
                    ))
                })
            }
        }
    }

    fn remove(&self, alias: &str) -> PlatformResult<()> {
        match &self.backend {
            Backend::Memory(keys) => {
                let removed = keys
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(alias);
                if removed.is_none() {
                    log::debug!("no in-memory key '{alias}' to remove");
                }
                Ok(())
            }
            Backend::Directory(root) => {
                let path = Self::key_path(root, alias);
                match fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        log::debug!("no key file for '{alias}' to remove");
                        Ok(())
                    }
                    Err(e) => Err(PlatformError::Io(format!(
                        "failed to delete key file '{}': {e}",
                        path.display()
                    ))),
                }
            }
        }
    }
}

/// Writes `bytes` to a temporary file readable only by the owner, syncs it,
/// renames it over `path` and syncs `root` so the rename is durable.
fn write_atomic(root: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(KEY_FILE_MODE);

    let mut file = options.open(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    sync_directory(root)
}

#[cfg(unix)]
fn sync_directory(root: &Path) -> std::io::Result<()> {
    File::open(root)?.sync_all()
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn sync_directory(_root: &Path) -> std::io::Result<()> {
    Ok(())
}

fn encode_key_file(key: &StoredKey) -> PlatformResult<Zeroizing<Vec<u8>>> {
    let der = key
        .private_key
        .to_pkcs8_der()
        .map_err(|e| PlatformError::Rejected(format!("failed to encode private key: {e}")))?;
    let file = KeyFile {
        version: KEY_FILE_VERSION,
        require_user_authentication: key.require_user_authentication,
        private_key: hex::encode(der.as_bytes()),
    };
    serde_json::to_vec(&file)
        .map(Zeroizing::new)
        .map_err(|e| PlatformError::Io(format!("failed to serialize key file: {e}")))
}

fn decode_key_file(bytes: &[u8]) -> PlatformResult<StoredKey> {
    let file: KeyFile = serde_json::from_slice(bytes)
        .map_err(|e| PlatformError::Io(format!("corrupted key file: {e}")))?;
    if file.version != KEY_FILE_VERSION {
        return Err(PlatformError::Io(format!(
            "unsupported key file version: {}",
            file.version
        )));
    }
    let der = Zeroizing::new(
        hex::decode(&file.private_key)
            .map_err(|e| PlatformError::Io(format!("corrupted private key encoding: {e}")))?,
    );
    let private_key = RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|e| PlatformError::Io(format!("corrupted private key: {e}")))?;
    Ok(StoredKey {
        private_key,
        require_user_authentication: file.require_user_authentication,
    })
}

impl SecureKeyStore for SoftwareKeyStore {
    fn contains_key(&self, alias: String) -> PlatformResult<bool> {
        match &self.backend {
            Backend::Memory(keys) => Ok(keys
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&alias)),
            Backend::Directory(root) => {
                let path = Self::key_path(root, &alias);
                match fs::metadata(&path) {
                    Ok(metadata) => Ok(metadata.is_file()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(PlatformError::Io(format!(
                        "failed to inspect key file '{}': {e}",
                        path.display()
                    ))),
                }
            }
        }
    }

    fn generate_key_pair(&self, alias: String, spec: KeySpec) -> PlatformResult<()> {
        if !SUPPORTED_KEY_SIZES.contains(&spec.key_size_bits) {
            return Err(PlatformError::Unsupported(format!(
                "{}-bit RSA keys are not supported",
                spec.key_size_bits
            )));
        }
        let exponent = BigUint::from(spec.public_exponent);
        let private_key =
            RsaPrivateKey::new_with_exp(&mut OsRng, spec.key_size_bits as usize, &exponent)
                .map_err(|e| PlatformError::Rejected(format!("key generation failed: {e}")))?;

        self.save(
            &alias,
            StoredKey {
                private_key,
                require_user_authentication: spec.require_user_authentication,
            },
        )
    }

    fn delete_key(&self, alias: String) -> PlatformResult<()> {
        self.presence.revoke(&alias);
        self.remove(&alias)
    }

    fn public_key(&self, alias: String) -> PlatformResult<Option<Vec<u8>>> {
        let Some(key) = self.load(&alias)? else {
            return Ok(None);
        };
        RsaPublicKey::from(&key.private_key)
            .to_public_key_der()
            .map(|der| Some(der.as_bytes().to_vec()))
            .map_err(|e| PlatformError::Rejected(format!("failed to export public key: {e}")))
    }

    fn decrypt(
        &self,
        alias: String,
        ciphertext: Vec<u8>,
        challenge_id: Option<u64>,
    ) -> PlatformResult<Vec<u8>> {
        let key = self
            .load(&alias)?
            .ok_or_else(|| PlatformError::KeyNotFound(alias.clone()))?;

        let authorized = challenge_id.is_some_and(|id| self.presence.take(&alias, id));
        if key.require_user_authentication && !authorized {
            return Err(PlatformError::AuthenticationRequired(
                "Key user not authenticated".to_string(),
            ));
        }

        decrypt_blocks(&key.private_key, &ciphertext)
            .map_err(|e| PlatformError::Rejected(e.to_string()))
    }
}
