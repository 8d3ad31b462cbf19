//! Integration tests for `CryptoKeyManager`.

mod common;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use biokey_core::platform::{
    AuthOutcome, AuthPolicy, AuthRequest, Authenticator, PlatformError, PromptText,
};
use biokey_core::{
    AuthFallback, CryptoKeyError, ErrorCode, KeyConfig, MethodResponse, MethodValue,
    PromptOptions,
};
use common::Harness;
use test_case::test_case;

fn payload(len: usize) -> Vec<u8> {
    (0..=u8::MAX).cycle().take(len).collect()
}

#[test]
fn test_init_key_is_idempotent() {
    let h = Harness::new();

    h.manager.init_key().unwrap();
    h.manager.init_key().unwrap();
    assert_eq!(h.store.generate_calls(), 1);

    // Re-running init keeps the existing key, so earlier ciphertexts still decrypt.
    let ciphertext = h.manager.encrypt(b"keep me".to_vec()).unwrap();
    h.manager.init_key().unwrap();
    let plaintext = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    assert_eq!(plaintext, b"keep me");
}

#[test]
fn test_delete_key_is_idempotent() {
    let h = Harness::new();

    h.manager.delete_key().unwrap();
    h.manager.init_key().unwrap();
    h.manager.delete_key().unwrap();
    h.manager.delete_key().unwrap();

    let err = h.manager.encrypt(b"x".to_vec()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::KeyNotFound);
}

#[test]
fn test_delete_of_absent_key_does_not_reach_store_delete() {
    let h = Harness::new();

    h.manager.delete_key().unwrap();
    assert_eq!(h.store.calls.contains_key.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.calls.delete_key.load(Ordering::SeqCst), 0);
}

#[test]
fn test_delete_tolerates_key_vanishing_before_store_delete() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    h.store
        .fail_delete_with(PlatformError::KeyNotFound("gone".into()));

    h.manager.delete_key().unwrap();
    assert_eq!(h.store.calls.delete_key.load(Ordering::SeqCst), 1);
}

#[test]
fn test_round_trip_at_size_limit() {
    let h = Harness::new();
    h.manager.init_key().unwrap();

    let plaintext = payload(1024);
    let ciphertext = h.manager.encrypt(plaintext.clone()).unwrap();
    // 1024 bytes at 245 bytes per RSA-2048 block.
    assert_eq!(ciphertext.len(), 5 * 256);

    let decrypted = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    assert_eq!(decrypted, plaintext);
    assert_eq!(h.authenticator.challenges(), 1);
    assert_eq!(h.store.decrypt_calls(), 2);
}

#[test]
fn test_round_trip_empty_plaintext() {
    let h = Harness::new();
    h.manager.init_key().unwrap();

    let ciphertext = h.manager.encrypt(Vec::new()).unwrap();
    assert_eq!(ciphertext.len(), 256);
    let decrypted = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    assert!(decrypted.is_empty());
}

#[test]
fn test_encrypt_is_probabilistic() {
    let h = Harness::new();
    h.manager.init_key().unwrap();

    let a = h.manager.encrypt(b"same".to_vec()).unwrap();
    let b = h.manager.encrypt(b"same".to_vec()).unwrap();
    assert_ne!(a, b);
    assert_eq!(h.authenticator.challenges(), 0);
}

#[test]
fn test_oversized_plaintext_rejected_before_store_access() {
    let h = Harness::new();

    let err = h.manager.encrypt(payload(1025)).unwrap_err();
    assert!(matches!(
        err,
        CryptoKeyError::DataTooLarge {
            size: 1025,
            max: 1024
        }
    ));
    assert_eq!(h.store.calls.total(), 0);

    h.manager.init_key().unwrap();
    let err = h.manager.encrypt(payload(1025)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DataTooLarge);
}

#[test]
fn test_missing_key_is_reported_without_challenge() {
    let h = Harness::new();

    let err = h.manager.encrypt(b"x".to_vec()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::KeyNotFound);

    let err = h
        .manager
        .decrypt(vec![0; 256], PromptOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::KeyNotFound);
    assert_eq!(h.authenticator.challenges(), 0);
    assert_eq!(h.store.decrypt_calls(), 0);
}

#[test]
fn test_every_decrypt_needs_a_fresh_challenge() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    for _ in 0..2 {
        let plaintext = h
            .manager
            .decrypt(ciphertext.clone(), PromptOptions::default())
            .unwrap();
        assert_eq!(plaintext, b"secret");
    }
    assert_eq!(h.authenticator.challenges(), 2);
}

#[test]
fn test_direct_decrypt_skips_challenge() {
    let h = Harness::with_config(KeyConfig {
        require_user_authentication: false,
        ..KeyConfig::default()
    });
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"open".to_vec()).unwrap();

    let plaintext = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    assert_eq!(plaintext, b"open");
    assert_eq!(h.authenticator.challenges(), 0);
    assert_eq!(h.store.decrypt_calls(), 1);
}

#[test]
fn test_retry_happens_at_most_once() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    h.store.script_decrypt_failures([
        PlatformError::AuthenticationRequired("first".into()),
        PlatformError::AuthenticationRequired("second".into()),
    ]);

    let err = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DecryptionFailed);
    assert_eq!(h.authenticator.challenges(), 1);
    assert_eq!(h.store.decrypt_calls(), 2);
}

#[test_case(
    Ok(AuthOutcome::Failed { reason: "not recognized".into() }),
    ErrorCode::BiometricAuthenticationFailed ;
    "failed challenge"
)]
#[test_case(
    Ok(AuthOutcome::Canceled { reason: "user canceled".into() }),
    ErrorCode::BiometricAuthenticationFailed ;
    "canceled challenge"
)]
#[test_case(
    Ok(AuthOutcome::Unavailable { reason: "no hardware".into() }),
    ErrorCode::BiometricNotAvailable ;
    "unavailable challenge"
)]
#[test_case(
    Err(PlatformError::Rejected("no activity".into())),
    ErrorCode::BiometricNotAvailable ;
    "prompt could not be shown"
)]
fn test_unsuccessful_challenge_is_terminal(
    outcome: Result<AuthOutcome, PlatformError>,
    expected: ErrorCode,
) {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    h.authenticator.set_outcome(outcome);
    let err = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap_err();

    assert_eq!(err.code(), expected);
    assert_eq!(h.authenticator.challenges(), 1);
    assert_eq!(h.store.decrypt_calls(), 1);
}

#[test]
fn test_canceled_challenge_is_distinguishable_by_message() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    h.authenticator.set_outcome(Ok(AuthOutcome::Canceled {
        reason: "user canceled".into(),
    }));
    let err = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap_err();
    match err {
        CryptoKeyError::BiometricAuthenticationFailed(msg) => {
            assert!(msg.starts_with("canceled"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_availability_probe_never_fails() {
    let h = Harness::new();
    assert!(h.manager.is_biometric_available());

    h.authenticator.set_probe(
        AuthPolicy::BiometricOrDeviceCredential,
        Err(PlatformError::Rejected("service crashed".into())),
    );
    assert!(!h.manager.is_biometric_available());

    h.authenticator
        .set_probe(AuthPolicy::BiometricOrDeviceCredential, Ok(false));
    assert!(!h.manager.is_biometric_available());
}

#[test]
fn test_unavailable_authenticator_blocks_decrypt_without_prompt() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    h.authenticator
        .set_probe(AuthPolicy::BiometricOrDeviceCredential, Ok(false));
    let err = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::BiometricNotAvailable);
    assert_eq!(h.authenticator.challenges(), 0);
}

#[test]
fn test_device_credential_fallback() {
    let h = Harness::with_fallback(AuthFallback::DeviceCredential);
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    h.authenticator.set_probe(AuthPolicy::Biometric, Ok(false));
    assert!(h.manager.is_biometric_available());

    let plaintext = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    assert_eq!(plaintext, b"secret");
    let request = h.authenticator.last_request().unwrap();
    assert_eq!(request.policy, AuthPolicy::DeviceCredential);
}

#[test]
fn test_biometric_only_has_no_fallback() {
    let h = Harness::with_fallback(AuthFallback::BiometricOnly);
    h.authenticator.set_probe(AuthPolicy::Biometric, Ok(false));
    assert!(!h.manager.is_biometric_available());

    h.authenticator.set_probe(AuthPolicy::Biometric, Ok(true));
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();
    h.manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    let request = h.authenticator.last_request().unwrap();
    assert_eq!(request.policy, AuthPolicy::Biometric);
}

#[test]
fn test_prompt_text_falls_back_to_defaults() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"secret".to_vec()).unwrap();

    h.manager
        .decrypt(
            ciphertext,
            PromptOptions {
                title: Some("Unlock vault".into()),
                ..PromptOptions::default()
            },
        )
        .unwrap();

    let request = h.authenticator.last_request().unwrap();
    assert_eq!(request.key_alias, "flutter_biometric_crypto_key");
    assert_eq!(request.prompt.title, "Unlock vault");
    assert_eq!(request.prompt.subtitle, "Authenticate to decrypt data");
    assert_eq!(request.prompt.negative_button_text, "Cancel");
    assert!(request.prompt.description.is_none());
}

#[test]
fn test_corrupted_ciphertext_fails_after_challenge() {
    let h = Harness::new();
    h.manager.init_key().unwrap();

    let err = h
        .manager
        .decrypt(vec![0xAB; 256], PromptOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DecryptionFailed);
    assert_eq!(h.authenticator.challenges(), 1);

    let err = h
        .manager
        .decrypt(vec![1, 2, 3], PromptOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DecryptionFailed);
}

#[test]
fn test_store_failures_map_to_operation_codes() {
    let h = Harness::new();

    h.store
        .fail_generate_with(PlatformError::Unsupported("no StrongBox".into()));
    assert_eq!(
        h.manager.init_key().unwrap_err().code(),
        ErrorCode::InitFailed
    );

    h.manager.init_key().unwrap();

    h.store
        .fail_public_key_with(PlatformError::Unsupported("API 22".into()));
    assert_eq!(
        h.manager.encrypt(b"x".to_vec()).unwrap_err().code(),
        ErrorCode::UnsupportedPlatform
    );

    h.store
        .fail_public_key_with(PlatformError::Io("disk".into()));
    assert_eq!(
        h.manager.encrypt(b"x".to_vec()).unwrap_err().code(),
        ErrorCode::EncryptionFailed
    );

    h.store.fail_delete_with(PlatformError::Io("disk".into()));
    assert_eq!(
        h.manager.delete_key().unwrap_err().code(),
        ErrorCode::DeleteFailed
    );
}

#[test]
fn test_invalid_config_rejected_at_construction() {
    let presence = Arc::new(biokey_core::platform::PresenceGate::new());
    let store = Arc::new(common::CountingKeyStore::new(Arc::clone(&presence)));
    let authenticator = Arc::new(common::ScriptedAuthenticator::approving(presence));

    let err = biokey_core::CryptoKeyManager::new(
        store,
        authenticator,
        KeyConfig::with_alias("  "),
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[test]
fn test_channel_dispatch() {
    let h = Harness::new();

    assert_eq!(
        h.manager.handle("signData".into(), HashMap::new()),
        MethodResponse::NotImplemented
    );
    assert_eq!(
        h.manager.handle("initKey".into(), HashMap::new()),
        MethodResponse::Success {
            value: MethodValue::Null
        }
    );
    assert_eq!(
        h.manager.handle("isBiometricAvailable".into(), HashMap::new()),
        MethodResponse::Success {
            value: MethodValue::Boolean { value: true }
        }
    );

    let MethodResponse::Success {
        value: MethodValue::Bytes { value: ciphertext },
    } = h.manager.handle(
        "encrypt".into(),
        HashMap::from([(
            "data".to_string(),
            MethodValue::Bytes {
                value: b"hello".to_vec(),
            },
        )]),
    )
    else {
        panic!("encrypt did not return bytes");
    };

    let response = h.manager.handle(
        "decrypt".into(),
        HashMap::from([
            (
                "encrypted".to_string(),
                MethodValue::Bytes { value: ciphertext },
            ),
            (
                "title".to_string(),
                MethodValue::Text {
                    value: "Unlock".into(),
                },
            ),
        ]),
    );
    assert_eq!(
        response,
        MethodResponse::Success {
            value: MethodValue::Bytes {
                value: b"hello".to_vec()
            }
        }
    );
    assert_eq!(h.authenticator.last_request().unwrap().prompt.title, "Unlock");
}

#[test]
fn test_channel_reports_error_codes() {
    let h = Harness::new();

    assert_eq!(
        h.manager.handle("encrypt".into(), HashMap::new()),
        MethodResponse::Failure {
            code: "INVALID_ARGUMENT".into(),
            message: "invalid argument: Data is null".into(),
        }
    );

    let response = h.manager.handle(
        "decrypt".into(),
        HashMap::from([("encrypted".to_string(), MethodValue::Null)]),
    );
    assert!(matches!(
        response,
        MethodResponse::Failure { ref code, .. } if code == "INVALID_ARGUMENT"
    ));

    let response = h.manager.handle(
        "encrypt".into(),
        HashMap::from([(
            "data".to_string(),
            MethodValue::Bytes { value: vec![1] },
        )]),
    );
    assert!(matches!(
        response,
        MethodResponse::Failure { ref code, .. } if code == "KEY_NOT_FOUND"
    ));
    assert_eq!(h.store.calls.total(), 1);
}

#[test]
fn test_concurrent_data_calls_with_lifecycle_calls() {
    let h = Arc::new(Harness::with_config(KeyConfig {
        require_user_authentication: false,
        ..KeyConfig::default()
    }));
    h.manager.init_key().unwrap();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for round in 0..3 {
                    let plaintext = format!("worker {i} round {round}").into_bytes();
                    let ciphertext = h.manager.encrypt(plaintext.clone()).unwrap();
                    let decrypted = h
                        .manager
                        .decrypt(ciphertext, PromptOptions::default())
                        .unwrap();
                    assert_eq!(decrypted, plaintext);
                    h.manager.init_key().unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(h.store.generate_calls(), 1);
}

#[test]
fn test_outstanding_grant_of_another_challenge_is_not_used() {
    let h = Harness::new();
    h.manager.init_key().unwrap();
    let ciphertext = h.manager.encrypt(b"mine".to_vec()).unwrap();

    // Another caller's challenge succeeded but its retry has not run yet.
    let foreign = AuthRequest {
        key_alias: h.manager.config().alias,
        challenge_id: u64::MAX,
        policy: AuthPolicy::BiometricOrDeviceCredential,
        prompt: PromptText::default(),
    };
    assert_eq!(
        h.authenticator.authenticate(foreign).unwrap(),
        AuthOutcome::Succeeded
    );

    let plaintext = h
        .manager
        .decrypt(ciphertext, PromptOptions::default())
        .unwrap();
    assert_eq!(plaintext, b"mine");
    // The direct attempt was refused, so this call ran its own challenge.
    assert_eq!(h.authenticator.challenges(), 2);
    assert_eq!(h.store.decrypt_calls(), 2);
    assert_ne!(h.authenticator.last_request().unwrap().challenge_id, u64::MAX);
}

#[test]
fn test_concurrent_authenticated_decrypts_each_use_their_own_challenge() {
    let h = Arc::new(Harness::new());
    h.manager.init_key().unwrap();

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for round in 0..4 {
                    let plaintext = format!("worker {i} round {round}").into_bytes();
                    let ciphertext = h.manager.encrypt(plaintext.clone()).unwrap();
                    let decrypted = h
                        .manager
                        .decrypt(ciphertext, PromptOptions::default())
                        .unwrap();
                    assert_eq!(decrypted, plaintext);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    // Every decrypt was refused directly, challenged once and retried once.
    assert_eq!(h.authenticator.challenges(), 32);
    assert_eq!(h.store.decrypt_calls(), 64);
    let ids: HashSet<u64> = h
        .authenticator
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|request| request.challenge_id)
        .collect();
    assert_eq!(ids.len(), 32);
}
