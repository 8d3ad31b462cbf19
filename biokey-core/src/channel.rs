//! Method-name dispatch for message-passing hosts.
//!
//! Plugin frameworks deliver a method name plus an argument map and expect
//! either a success payload or an `(errorCode, message)` pair back. This
//! module maps that shape onto [`CryptoKeyManager`].
//!
//! | Method                 | Arguments                                   | Success   |
//! |------------------------|---------------------------------------------|-----------|
//! | `initKey`              |                                             | `Null`    |
//! | `deleteKey`            |                                             | `Null`    |
//! | `encrypt`              | `data`                                      | `Bytes`   |
//! | `decrypt`              | `encrypted`, `title?`, `subtitle?`, `description?`, `negativeButtonText?` | `Bytes` |
//! | `isBiometricAvailable` |                                             | `Boolean` |

use std::collections::HashMap;
use std::str::FromStr;

use strum::EnumString;

use crate::config::PromptOptions;
use crate::error::{CryptoKeyError, CryptoResult};
use crate::manager::CryptoKeyManager;

/// A value in a method call's argument map or a success payload.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum MethodValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Boolean {
        /// The value.
        value: bool,
    },
    /// Byte array.
    Bytes {
        /// The value.
        value: Vec<u8>,
    },
    /// UTF-8 string.
    Text {
        /// The value.
        value: String,
    },
}

/// Result of a dispatched method call.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum MethodResponse {
    /// The call succeeded.
    Success {
        /// Payload.
        value: MethodValue,
    },
    /// The call failed with a stable code.
    Failure {
        /// Stable error code, e.g. `KEY_NOT_FOUND`.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// The method name is unknown.
    NotImplemented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "camelCase")]
enum Method {
    InitKey,
    DeleteKey,
    Encrypt,
    Decrypt,
    IsBiometricAvailable,
}

type Args = HashMap<String, MethodValue>;

impl From<CryptoKeyError> for MethodResponse {
    fn from(err: CryptoKeyError) -> Self {
        Self::Failure {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<CryptoResult<MethodValue>> for MethodResponse {
    fn from(result: CryptoResult<MethodValue>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(err) => err.into(),
        }
    }
}

#[uniffi::export]
impl CryptoKeyManager {
    /// Dispatches a method call by name.
    ///
    /// Unknown method names produce [`MethodResponse::NotImplemented`].
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn handle(&self, method: String, args: HashMap<String, MethodValue>) -> MethodResponse {
        let Ok(method) = Method::from_str(&method) else {
            log::debug!("method '{method}' not implemented");
            return MethodResponse::NotImplemented;
        };

        let result = match method {
            Method::InitKey => self.init_key().map(|()| MethodValue::Null),
            Method::DeleteKey => self.delete_key().map(|()| MethodValue::Null),
            Method::Encrypt => required_bytes(&args, "data", "Data is null")
                .and_then(|data| self.encrypt(data))
                .map(|value| MethodValue::Bytes { value }),
            Method::Decrypt => decrypt_args(&args)
                .and_then(|(encrypted, prompt)| self.decrypt(encrypted, prompt))
                .map(|value| MethodValue::Bytes { value }),
            Method::IsBiometricAvailable => Ok(MethodValue::Boolean {
                value: self.is_biometric_available(),
            }),
        };
        result.into()
    }
}

fn required_bytes(args: &Args, key: &str, missing: &str) -> CryptoResult<Vec<u8>> {
    match args.get(key) {
        Some(MethodValue::Bytes { value }) => Ok(value.clone()),
        _ => Err(CryptoKeyError::InvalidArgument(missing.to_string())),
    }
}

fn optional_text(args: &Args, key: &str) -> CryptoResult<Option<String>> {
    match args.get(key) {
        None | Some(MethodValue::Null) => Ok(None),
        Some(MethodValue::Text { value }) => Ok(Some(value.clone())),
        Some(_) => Err(CryptoKeyError::InvalidArgument(format!(
            "{key} must be a string"
        ))),
    }
}

fn decrypt_args(args: &Args) -> CryptoResult<(Vec<u8>, PromptOptions)> {
    let encrypted = required_bytes(args, "encrypted", "Encrypted data is null")?;
    let prompt = PromptOptions {
        title: optional_text(args, "title")?,
        subtitle: optional_text(args, "subtitle")?,
        description: optional_text(args, "description")?,
        negative_button_text: optional_text(args, "negativeButtonText")?,
    };
    Ok((encrypted, prompt))
}
