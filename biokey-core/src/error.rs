use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Result type for key manager operations.
pub type CryptoResult<T, E = CryptoKeyError> = std::result::Result<T, E>;

/// Error outputs from the key manager.
#[derive(Debug, Error, uniffi::Error)]
pub enum CryptoKeyError {
    /// Malformed or missing call input. Never reaches the store.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The plaintext exceeds the configured maximum.
    #[error("data size {size} exceeds maximum allowed size of {max} bytes")]
    DataTooLarge {
        /// Size of the rejected plaintext.
        size: u64,
        /// Configured maximum.
        max: u64,
    },
    /// The operation needs a key that was never provisioned or was deleted.
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// The store rejected key generation.
    #[error("key initialization failed: {0}")]
    InitFailed(String),
    /// The store failed to delete the key.
    #[error("key deletion failed: {0}")]
    DeleteFailed(String),
    /// Encryption failed for a reason other than a missing key.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    /// Decryption failed for a reason other than the authentication signal.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    /// A challenge was presented but not satisfied (failed or canceled).
    #[error("biometric authentication failed: {0}")]
    BiometricAuthenticationFailed(String),
    /// No authentication mechanism can be used on this device.
    #[error("biometric authentication is not available: {0}")]
    BiometricNotAvailable(String),
    /// The OS cannot provide hardware-backed keys.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

/// Stable error codes reported to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// `INVALID_ARGUMENT`
    InvalidArgument,
    /// `DATA_TOO_LARGE`
    DataTooLarge,
    /// `KEY_NOT_FOUND`
    KeyNotFound,
    /// `INIT_FAILED`
    InitFailed,
    /// `DELETE_FAILED`
    DeleteFailed,
    /// `ENCRYPTION_FAILED`
    EncryptionFailed,
    /// `DECRYPTION_FAILED`
    DecryptionFailed,
    /// `BIOMETRIC_AUTHENTICATION_FAILED`
    BiometricAuthenticationFailed,
    /// `BIOMETRIC_NOT_AVAILABLE`
    BiometricNotAvailable,
    /// `UNSUPPORTED`
    #[strum(serialize = "UNSUPPORTED")]
    UnsupportedPlatform,
}

impl CryptoKeyError {
    /// Stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::DataTooLarge { .. } => ErrorCode::DataTooLarge,
            Self::KeyNotFound(_) => ErrorCode::KeyNotFound,
            Self::InitFailed(_) => ErrorCode::InitFailed,
            Self::DeleteFailed(_) => ErrorCode::DeleteFailed,
            Self::EncryptionFailed(_) => ErrorCode::EncryptionFailed,
            Self::DecryptionFailed(_) => ErrorCode::DecryptionFailed,
            Self::BiometricAuthenticationFailed(_) => ErrorCode::BiometricAuthenticationFailed,
            Self::BiometricNotAvailable(_) => ErrorCode::BiometricNotAvailable,
            Self::UnsupportedPlatform(_) => ErrorCode::UnsupportedPlatform,
        }
    }
}
