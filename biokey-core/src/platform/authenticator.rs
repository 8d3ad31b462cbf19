//! User authentication subsystem trait.

use super::error::PlatformResult;

/// Which authenticators a challenge may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum AuthPolicy {
    /// Strong biometrics only.
    Biometric,
    /// Device PIN, pattern or passcode only.
    DeviceCredential,
    /// A single prompt accepting either.
    BiometricOrDeviceCredential,
}

/// Display text for one authentication prompt, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PromptText {
    /// Prompt title.
    pub title: String,
    /// Prompt subtitle. Also used as the localized reason on iOS.
    pub subtitle: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Label of the negative (cancel) action.
    pub negative_button_text: String,
}

/// One authentication challenge handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AuthRequest {
    /// Alias of the key the challenge unlocks.
    pub key_alias: String,
    /// Identifies this challenge. The private-key operation it authorizes
    /// is the one passed the same id; no other call may use it.
    pub challenge_id: u64,
    /// Authenticators allowed for this challenge.
    pub policy: AuthPolicy,
    /// Text shown in the prompt.
    pub prompt: PromptText,
}

/// Terminal result of an authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AuthOutcome {
    /// The user authenticated.
    Succeeded,
    /// The user failed to authenticate (wrong biometric, lockout, timeout).
    Failed {
        /// Platform reason.
        reason: String,
    },
    /// The user dismissed the prompt through the negative action.
    Canceled {
        /// Platform reason.
        reason: String,
    },
    /// No authenticator matching the policy can be used.
    Unavailable {
        /// Platform reason.
        reason: String,
    },
}

/// Biometric / device-credential prompt subsystem.
///
/// - Android: `BiometricManager.canAuthenticate` and `BiometricPrompt`
/// - iOS: `LAContext.canEvaluatePolicy` and `LAContext.evaluatePolicy`
///
/// `authenticate` is called from a background thread and blocks until the
/// prompt resolves. Implementations dispatch the prompt onto the UI thread
/// themselves; the OS owns cancellation and timeouts.
#[uniffi::export(with_foreign)]
pub trait Authenticator: Send + Sync {
    /// Returns whether a challenge under `policy` can currently be presented.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails.
    fn can_authenticate(&self, policy: AuthPolicy) -> PlatformResult<bool>;

    /// Presents one challenge and blocks until it resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt could not be presented at all (for
    /// example no foreground activity).
    fn authenticate(&self, request: AuthRequest) -> PlatformResult<AuthOutcome>;
}
