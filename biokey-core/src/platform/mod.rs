//! Platform abstraction traits for the key manager.
//!
//! The protocol in [`CryptoKeyManager`](crate::CryptoKeyManager) is written
//! once. Everything that touches the operating system sits behind two traits:
//!
//! - [`SecureKeyStore`]: generate, look up, export and delete key pairs, and
//!   decrypt with the private key under the store's authentication policy
//! - [`Authenticator`]: probe for and present biometric or device-credential
//!   challenges
//!
//! # Platform Implementations
//!
//! ## iOS (Swift)
//! - `SecureKeyStore`: Keychain `SecKey` with `SecAccessControl`
//! - `Authenticator`: `LocalAuthentication` (`LAContext`)
//!
//! ## Android (Kotlin)
//! - `SecureKeyStore`: `AndroidKeyStore` with `KeyGenParameterSpec`
//! - `Authenticator`: `androidx.biometric.BiometricPrompt`
//!
//! ## Desktop / tests
//! - [`SoftwareKeyStore`] and [`SoftwareAuthenticator`], linked through a
//!   shared [`PresenceGate`]

mod authenticator;
mod error;
mod keystore;
pub mod software;

pub use authenticator::{AuthOutcome, AuthPolicy, AuthRequest, Authenticator, PromptText};
pub use error::{
    classify_platform_message, is_authentication_required_message, PlatformError, PlatformResult,
};
pub use keystore::{KeySpec, SecureKeyStore};
pub use software::{PresenceGate, PresenceVerifier, SoftwareAuthenticator, SoftwareKeyStore};
