//! Secure key store trait for hardware-anchored RSA key pairs.

use super::error::PlatformResult;

/// Generation parameters for a key pair.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct KeySpec {
    /// RSA modulus size in bits.
    pub key_size_bits: u32,
    /// RSA public exponent.
    pub public_exponent: u32,
    /// Whether every private-key operation requires a fresh user
    /// authentication. No validity window, no session reuse.
    pub require_user_authentication: bool,
}

/// Hardware-backed store holding RSA key pairs by alias.
///
/// Platform implementations:
/// - Android: `AndroidKeyStore` with `PURPOSE_DECRYPT`, PKCS#1 padding and
///   `setUserAuthenticationRequired(true)` with no validity duration
/// - iOS: Keychain `SecKey` tagged with the alias, access control
///   `.privateKeyUsage | .biometryAny`
/// - Desktop and tests: [`SoftwareKeyStore`](super::SoftwareKeyStore)
///
/// Every method receives the alias explicitly. The store owns the key
/// material; callers never see the private key.
#[uniffi::export(with_foreign)]
pub trait SecureKeyStore: Send + Sync {
    /// Returns whether a key pair exists under `alias`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn contains_key(&self, alias: String) -> PlatformResult<bool>;

    /// Generates a new key pair under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unsupported`](super::PlatformError::Unsupported)
    /// if the device cannot hold such a key, or another error if the store
    /// rejects generation.
    fn generate_key_pair(&self, alias: String, spec: KeySpec) -> PlatformResult<()>;

    /// Deletes the key pair under `alias`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error on store I/O failure.
    fn delete_key(&self, alias: String) -> PlatformResult<()>;

    /// Exports the public half of the key pair as DER.
    ///
    /// Either X.509 `SubjectPublicKeyInfo` or PKCS#1 `RSAPublicKey` encoding
    /// is accepted. Returns `None` if no key exists under `alias`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot read the key.
    fn public_key(&self, alias: String) -> PlatformResult<Option<Vec<u8>>>;

    /// Decrypts `ciphertext` with the private key under `alias`.
    ///
    /// The ciphertext is one or more concatenated PKCS#1 v1.5 blocks, each
    /// as long as the modulus. All blocks are decrypted under a single
    /// authorization.
    ///
    /// `challenge_id` is `None` on the first attempt of a decrypt call and
    /// the [`AuthRequest::challenge_id`](super::AuthRequest::challenge_id) of
    /// the challenge that just succeeded on the retry. An authorization must
    /// only be used by the operation carrying its id (Android: the `Cipher`
    /// bound to that prompt's `CryptoObject`; iOS: that prompt's `LAContext`).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::AuthenticationRequired`](super::PlatformError::AuthenticationRequired)
    /// when the key needs a fresh user authentication that has not happened,
    /// [`PlatformError::KeyNotFound`](super::PlatformError::KeyNotFound) if
    /// the key is gone, or another error if decryption fails.
    fn decrypt(
        &self,
        alias: String,
        ciphertext: Vec<u8>,
        challenge_id: Option<u64>,
    ) -> PlatformResult<Vec<u8>>;
}
