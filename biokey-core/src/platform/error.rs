//! Error types for platform collaborators.

use thiserror::Error;

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Messages the Android keystore attaches to exceptions thrown when a key
/// needs fresh user authentication before it can be used.
const ANDROID_AUTH_REQUIRED_MARKERS: [&str; 3] = [
    "User authentication required",
    "Key user not authenticated",
    "android.security.KeyStoreException",
];

/// Errors raised by the secure key store and the authentication subsystem.
#[derive(Debug, Error, uniffi::Error)]
pub enum PlatformError {
    /// The key exists but its policy demands fresh user presence before the
    /// private key may be used.
    #[error("user authentication required: {0}")]
    AuthenticationRequired(String),

    /// No key is stored under the requested alias.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The device cannot provide hardware-backed keys (no secure hardware,
    /// OS version too old, unsupported parameters).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The store rejected the operation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Underlying storage I/O failure.
    #[error("io error: {0}")]
    Io(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PlatformError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

impl PlatformError {
    /// Returns `true` if the store signalled that the private key needs a
    /// fresh authentication.
    #[must_use]
    pub const fn is_authentication_required(&self) -> bool {
        matches!(self, Self::AuthenticationRequired(_))
    }
}

/// Returns `true` if a raw platform exception message reports that the key
/// needs a fresh authentication.
///
/// Store adapters that can only see exception text (for example a Kotlin
/// bridge catching `Cipher.doFinal` failures) call this and throw
/// [`PlatformError::AuthenticationRequired`] when it returns `true`.
#[uniffi::export]
#[must_use]
pub fn is_authentication_required_message(message: &str) -> bool {
    ANDROID_AUTH_REQUIRED_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Classifies a raw platform exception message, for Rust store adapters.
/// Everything that does not report a missing authentication becomes
/// [`PlatformError::Rejected`].
#[must_use]
pub fn classify_platform_message(message: String) -> PlatformError {
    if is_authentication_required_message(&message) {
        PlatformError::AuthenticationRequired(message)
    } else {
        PlatformError::Rejected(message)
    }
}
