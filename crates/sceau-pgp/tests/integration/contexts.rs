//! Signature contexts and the `BadContext` status.

use sceau_pgp::{
    ContextRequirement, Encoding, PgpError, PgpSigner, PgpVerifier, SigningContext, VerificationContext,
    VerificationStatus,
};

use super::common::key_pair;

fn status(verifier: &PgpVerifier<'_>, data: &[u8], signature: &[u8]) -> VerificationStatus {
    verifier
        .verify_detached(data, signature, Encoding::Binary)
        .expect("verification should run")
        .status()
        .unwrap()
}

#[test]
fn matching_context_verifies() {
    let (private, public) = key_pair("alice");
    let signing = SigningContext::new("mail", true).unwrap();
    let expected = VerificationContext::new("mail", ContextRequirement::Always).unwrap();
    let signature = PgpSigner::new(&private)
        .with_context(&signing)
        .sign_detached(b"data", Encoding::Binary)
        .unwrap();
    let verifier = PgpVerifier::new(&public).with_context(&expected);
    assert_eq!(status(&verifier, b"data", &signature), VerificationStatus::Ok);
}

#[test]
fn mismatched_context_is_bad_context() {
    let (private, public) = key_pair("alice");
    let signing = SigningContext::new("mail", false).unwrap();
    let expected = VerificationContext::new("drive", ContextRequirement::Never).unwrap();
    let signature = PgpSigner::new(&private)
        .with_context(&signing)
        .sign_detached(b"data", Encoding::Binary)
        .unwrap();
    let verifier = PgpVerifier::new(&public).with_context(&expected);
    assert_eq!(status(&verifier, b"data", &signature), VerificationStatus::BadContext);
}

#[test]
fn required_context_missing_is_bad_context() {
    let (private, public) = key_pair("alice");
    let expected = VerificationContext::new("mail", ContextRequirement::Always).unwrap();
    let signature = PgpSigner::new(&private).sign_detached(b"data", Encoding::Binary).unwrap();
    let verifier = PgpVerifier::new(&public).with_context(&expected);
    assert_eq!(status(&verifier, b"data", &signature), VerificationStatus::BadContext);

    let lenient = VerificationContext::new("mail", ContextRequirement::Never).unwrap();
    let verifier = PgpVerifier::new(&public).with_context(&lenient);
    assert_eq!(status(&verifier, b"data", &signature), VerificationStatus::Ok);
}

#[test]
fn critical_context_without_expectation_is_bad_context() {
    let (private, public) = key_pair("alice");
    let signing = SigningContext::new("mail", true).unwrap();
    let signature = PgpSigner::new(&private)
        .with_context(&signing)
        .sign_detached(b"data", Encoding::Binary)
        .unwrap();
    assert_eq!(
        status(&PgpVerifier::new(&public), b"data", &signature),
        VerificationStatus::BadContext
    );
}

#[test]
fn context_attributes_round_trip() {
    let context = VerificationContext::new("drive", ContextRequirement::After(1_700_000_000_000)).unwrap();
    assert_eq!(context.value().unwrap(), "drive");
    assert!(context.is_required().unwrap());
    assert_eq!(context.is_required_after().unwrap(), 1_700_000_000_000);
}

#[test]
fn released_context_is_rejected() {
    let (private, _) = key_pair("alice");
    let mut signing = SigningContext::new("mail", false).unwrap();
    signing.release();
    let result = PgpSigner::new(&private).with_context(&signing).sign(b"x", Encoding::Binary);
    assert!(matches!(result, Err(PgpError::InvalidHandle("signing context"))));
}
