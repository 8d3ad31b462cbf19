//! Software implementations of the platform traits.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use biokey_core::platform::{AuthOutcome, AuthRequest, PresenceGate, SoftwareAuthenticator, SoftwareKeyStore};
//! use biokey_core::{CryptoKeyManager, KeyConfig};
//!
//! let gate = Arc::new(PresenceGate::new());
//! let store = Arc::new(SoftwareKeyStore::in_memory(Arc::clone(&gate)));
//! let authenticator = Arc::new(SoftwareAuthenticator::new(gate, |_: &AuthRequest| {
//!     AuthOutcome::Succeeded
//! }));
//!
//! let manager = CryptoKeyManager::new(store, authenticator, KeyConfig::default())?;
//! manager.init_key()?;
//! # Ok::<(), biokey_core::CryptoKeyError>(())
//! ```

mod authenticator;
mod keystore;
mod presence;

pub use authenticator::{PresenceVerifier, SoftwareAuthenticator};
pub use keystore::SoftwareKeyStore;
pub use presence::PresenceGate;
