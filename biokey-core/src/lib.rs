//! `biokey-core` manages one biometric-gated RSA key pair held by a platform
//! secure store.
//!
//! Encryption never prompts the user. Decryption first tries the private key
//! directly and, when the store demands a fresh authentication, presents
//! exactly one challenge through the host's [`platform::Authenticator`] and
//! retries exactly once.
//!
//! Host applications provide a [`platform::SecureKeyStore`] and a
//! [`platform::Authenticator`] (Android Keystore with `BiometricPrompt`, iOS
//! Keychain with `LocalAuthentication`). The [`platform::software`] module
//! ships in-process implementations used by the CLI and the tests.

mod config;
pub use config::*;

mod error;
pub use error::*;

mod manager;
pub use manager::CryptoKeyManager;

mod channel;
pub use channel::{MethodResponse, MethodValue};

pub mod cipher;
pub mod logger;
pub mod platform;

uniffi::setup_scaffolding!("biokey_core");
