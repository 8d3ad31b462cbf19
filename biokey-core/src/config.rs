//! Key manager configuration and defaults.

use crate::error::{CryptoKeyError, CryptoResult};
use crate::platform::{KeySpec, PromptText};

/// Alias the key pair is stored under unless configured otherwise.
pub const DEFAULT_KEY_ALIAS: &str = "flutter_biometric_crypto_key";

/// RSA modulus size.
pub const DEFAULT_KEY_SIZE_BITS: u32 = 2048;

/// RSA public exponent (F4).
pub const DEFAULT_PUBLIC_EXPONENT: u32 = 65_537;

/// Largest plaintext accepted by `encrypt`.
pub const DEFAULT_MAX_PLAINTEXT_LEN: u32 = 1024;

const DEFAULT_PROMPT_TITLE: &str = "Biometric Authentication";
const DEFAULT_PROMPT_SUBTITLE: &str = "Authenticate to decrypt data";
const DEFAULT_NEGATIVE_BUTTON_TEXT: &str = "Cancel";

const MIN_KEY_SIZE_BITS: u32 = 1024;
const MAX_KEY_SIZE_BITS: u32 = 8192;

/// What to do when strong biometrics cannot be used for a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum AuthFallback {
    /// Biometrics only; no fallback.
    BiometricOnly,
    /// Try biometrics first; if they cannot be evaluated, prompt for the
    /// device credential instead.
    DeviceCredential,
    /// One prompt that accepts biometrics or the device credential.
    Combined,
}

/// Caller-supplied prompt text. Missing fields fall back to the
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct PromptOptions {
    /// Prompt title.
    pub title: Option<String>,
    /// Prompt subtitle.
    pub subtitle: Option<String>,
    /// Prompt description.
    pub description: Option<String>,
    /// Label of the negative action.
    pub negative_button_text: Option<String>,
}

impl PromptOptions {
    /// Fills in missing fields from `defaults`.
    #[must_use]
    pub fn resolve(self, defaults: &PromptText) -> PromptText {
        PromptText {
            title: self.title.unwrap_or_else(|| defaults.title.clone()),
            subtitle: self.subtitle.unwrap_or_else(|| defaults.subtitle.clone()),
            description: self.description.or_else(|| defaults.description.clone()),
            negative_button_text: self
                .negative_button_text
                .unwrap_or_else(|| defaults.negative_button_text.clone()),
        }
    }
}

impl Default for PromptText {
    fn default() -> Self {
        Self {
            title: DEFAULT_PROMPT_TITLE.to_string(),
            subtitle: DEFAULT_PROMPT_SUBTITLE.to_string(),
            description: None,
            negative_button_text: DEFAULT_NEGATIVE_BUTTON_TEXT.to_string(),
        }
    }
}

/// Configuration of one key identity.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct KeyConfig {
    /// Alias of the key pair in the secure store.
    pub alias: String,
    /// RSA modulus size in bits.
    pub key_size_bits: u32,
    /// RSA public exponent.
    pub public_exponent: u32,
    /// Largest plaintext accepted by `encrypt`, in bytes.
    pub max_plaintext_len: u32,
    /// Whether every private-key use needs a fresh authentication.
    pub require_user_authentication: bool,
    /// Fallback when biometrics cannot be used.
    pub fallback: AuthFallback,
    /// Prompt text used where the caller supplies none.
    pub default_prompt: PromptText,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            alias: DEFAULT_KEY_ALIAS.to_string(),
            key_size_bits: DEFAULT_KEY_SIZE_BITS,
            public_exponent: DEFAULT_PUBLIC_EXPONENT,
            max_plaintext_len: DEFAULT_MAX_PLAINTEXT_LEN,
            require_user_authentication: true,
            fallback: AuthFallback::Combined,
            default_prompt: PromptText::default(),
        }
    }
}

impl KeyConfig {
    /// Default configuration with a different alias.
    #[must_use]
    pub fn with_alias(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Self::default()
        }
    }

    /// Checks the configuration for values no store could honor.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoKeyError::InvalidArgument`] describing the first
    /// offending field.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.alias.trim().is_empty() {
            return Err(CryptoKeyError::InvalidArgument(
                "key alias must not be empty".to_string(),
            ));
        }
        if !(MIN_KEY_SIZE_BITS..=MAX_KEY_SIZE_BITS).contains(&self.key_size_bits)
            || self.key_size_bits % 8 != 0
        {
            return Err(CryptoKeyError::InvalidArgument(format!(
                "key size {} must be a multiple of 8 between {MIN_KEY_SIZE_BITS} and {MAX_KEY_SIZE_BITS} bits",
                self.key_size_bits
            )));
        }
        if self.public_exponent < 3 || self.public_exponent % 2 == 0 {
            return Err(CryptoKeyError::InvalidArgument(format!(
                "public exponent {} must be odd and at least 3",
                self.public_exponent
            )));
        }
        if self.max_plaintext_len == 0 {
            return Err(CryptoKeyError::InvalidArgument(
                "max plaintext length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Generation parameters handed to the secure store.
    #[must_use]
    pub const fn key_spec(&self) -> KeySpec {
        KeySpec {
            key_size_bits: self.key_size_bits,
            public_exponent: self.public_exponent,
            require_user_authentication: self.require_user_authentication,
        }
    }
}

/// Returns the default key configuration.
#[uniffi::export]
#[must_use]
pub fn default_key_config() -> KeyConfig {
    KeyConfig::default()
}
