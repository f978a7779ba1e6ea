//! Released engine objects must be rejected on the host side.

use sceau_pgp::{
    ContextRequirement, Encoding, KeyGenerationRequest, PgpEncrypter, PgpError, PgpMessage, PgpPrivateKey,
    PgpSessionKey, PgpSigner, SigningContext, SymmetricCipher, VerificationContext,
};

fn private_key() -> PgpPrivateKey {
    PgpPrivateKey::generate(&KeyGenerationRequest {
        name: "release",
        email: "release@example.org",
        ..KeyGenerationRequest::default()
    })
    .expect("key generation should succeed")
}

#[test]
fn release_twice_is_a_no_op() {
    let mut key = private_key();
    key.release();
    key.release();
    assert!(matches!(key.as_key().id(), Err(PgpError::InvalidHandle("key"))));
}

#[test]
fn released_private_key_cannot_export_or_lock() {
    let mut key = private_key();
    key.release();
    assert!(matches!(key.export(Encoding::Binary), Err(PgpError::InvalidHandle("key"))));
    assert!(matches!(key.lock(b"pass"), Err(PgpError::InvalidHandle("key"))));
    assert!(matches!(key.to_public(), Err(PgpError::InvalidHandle("key"))));
}

#[test]
fn released_session_key_rejects_export_and_encryption() {
    let mut session_key = PgpSessionKey::generate(SymmetricCipher::Aes256).unwrap();
    session_key.release();
    assert!(matches!(session_key.export(), Err(PgpError::InvalidHandle("session key"))));
    assert!(matches!(session_key.cipher(), Err(PgpError::InvalidHandle("session key"))));
    let result = PgpEncrypter::new(&session_key).encrypt(b"data", Encoding::Binary);
    assert!(matches!(result, Err(PgpError::InvalidHandle("session key"))));
}

#[test]
fn released_message_rejects_inspection() {
    let key = private_key();
    let public = key.to_public().unwrap();
    let encrypted = PgpEncrypter::new(&public).encrypt(b"data", Encoding::Binary).unwrap();
    let mut message = PgpMessage::new(&encrypted, Encoding::Binary).unwrap();
    message.release();
    assert!(matches!(message.encryption_key_ids(), Err(PgpError::InvalidHandle("message"))));
    assert!(matches!(message.split(), Err(PgpError::InvalidHandle("message"))));
}

#[test]
fn released_verification_context_rejects_queries() {
    let mut context = VerificationContext::new("mail", ContextRequirement::Always).unwrap();
    context.release();
    assert!(matches!(context.value(), Err(PgpError::InvalidHandle("verification context"))));
    assert!(matches!(context.is_required(), Err(PgpError::InvalidHandle("verification context"))));
}

#[test]
fn released_signing_context_is_rejected_then_dropped() {
    let key = private_key();
    let mut context = SigningContext::new("mail", true).unwrap();
    context.release();
    let result = PgpSigner::new(&key).with_context(&context).sign(b"x", Encoding::Binary);
    assert!(matches!(result, Err(PgpError::InvalidHandle("signing context"))));
    drop(context);
}
