use std::sync::Arc;

use super::PresenceGate;
use crate::platform::{AuthOutcome, AuthPolicy, AuthRequest, Authenticator, PlatformResult};

/// Decides the outcome of a software authentication challenge.
///
/// Implemented for closures, so tests can script outcomes inline; the CLI
/// implements it with a console confirmation.
pub trait PresenceVerifier: Send + Sync {
    /// Presents `request` to the user and returns the outcome.
    fn verify(&self, request: &AuthRequest) -> AuthOutcome;
}

impl<F> PresenceVerifier for F
where
    F: Fn(&AuthRequest) -> AuthOutcome + Send + Sync,
{
    fn verify(&self, request: &AuthRequest) -> AuthOutcome {
        self(request)
    }
}

/// Software [`Authenticator`] that grants a [`PresenceGate`] on success.
pub struct SoftwareAuthenticator {
    presence: Arc<PresenceGate>,
    verifier: Box<dyn PresenceVerifier>,
    biometrics_enrolled: bool,
    device_credential_set: bool,
}

impl std::fmt::Debug for SoftwareAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareAuthenticator")
            .field("biometrics_enrolled", &self.biometrics_enrolled)
            .field("device_credential_set", &self.device_credential_set)
            .finish_non_exhaustive()
    }
}

impl SoftwareAuthenticator {
    /// Creates an authenticator with biometrics and a device credential
    /// both enrolled.
    pub fn new(presence: Arc<PresenceGate>, verifier: impl PresenceVerifier + 'static) -> Self {
        Self {
            presence,
            verifier: Box::new(verifier),
            biometrics_enrolled: true,
            device_credential_set: true,
        }
    }

    /// Sets whether biometrics are enrolled.
    #[must_use]
    pub fn with_biometrics(mut self, enrolled: bool) -> Self {
        self.biometrics_enrolled = enrolled;
        self
    }

    /// Sets whether a device credential (PIN, passcode) is configured.
    #[must_use]
    pub fn with_device_credential(mut self, set: bool) -> Self {
        self.device_credential_set = set;
        self
    }

    const fn supports(&self, policy: AuthPolicy) -> bool {
        match policy {
            AuthPolicy::Biometric => self.biometrics_enrolled,
            AuthPolicy::DeviceCredential => self.device_credential_set,
            AuthPolicy::BiometricOrDeviceCredential => {
                self.biometrics_enrolled || self.device_credential_set
            }
        }
    }
}

impl Authenticator for SoftwareAuthenticator {
    fn can_authenticate(&self, policy: AuthPolicy) -> PlatformResult<bool> {
        Ok(self.supports(policy))
    }

    fn authenticate(&self, request: AuthRequest) -> PlatformResult<AuthOutcome> {
        if !self.supports(request.policy) {
            return Ok(AuthOutcome::Unavailable {
                reason: format!("no authenticator enrolled for {:?}", request.policy),
            });
        }

        let outcome = self.verifier.verify(&request);
        if outcome == AuthOutcome::Succeeded {
            self.presence.grant(&request.key_alias, request.challenge_id);
        }
        Ok(outcome)
    }
}
