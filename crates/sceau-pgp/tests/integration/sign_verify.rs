//! Signing and verification statuses across inline, detached and
//! cleartext signatures.

use std::io::Read;

use sceau_pgp::{
    Encoding, FixedTime, PgpError, PgpKeyRing, PgpPrivateKeyRing, PgpSigner, PgpVerifier, SigningMode,
    VerificationStatus,
};

use super::common::{key_pair, private_key_at};

const YEAR_2020: u64 = 1_577_836_800;
const YEAR_2030: u64 = 1_893_456_000;

#[test]
fn detached_armored_ok_then_failed_on_other_data() {
    let (private, public) = key_pair("alice");
    let signature = PgpSigner::new(&private)
        .sign_detached(b"plain text", Encoding::AsciiArmor)
        .expect("signing should succeed");

    let verifier = PgpVerifier::new(&public);
    let good = verifier
        .verify_detached(b"plain text", &signature, Encoding::AsciiArmor)
        .expect("verification should run");
    assert_eq!(good.status().unwrap(), VerificationStatus::Ok);
    assert_eq!(good.error_message().unwrap(), None);

    let bad = verifier
        .verify_detached(b"other text", &signature, Encoding::AsciiArmor)
        .unwrap();
    assert_eq!(bad.status().unwrap(), VerificationStatus::Failed);
    assert!(bad.error_message().unwrap().is_some());
}

#[test]
fn key_from_the_future_cannot_sign_in_the_past() {
    let key = private_key_at("future", YEAR_2030);
    let past = FixedTime::from_unix(YEAR_2020);
    let result = PgpSigner::new(&key)
        .with_time(&past)
        .sign(b"plain text", Encoding::Binary);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn unrelated_key_reports_no_verifier() {
    let (alice, _) = key_pair("alice");
    let (_, bob_pub) = key_pair("bob");
    let signed = PgpSigner::new(&alice).sign(b"hello", Encoding::Binary).unwrap();
    let (content, result) = PgpVerifier::new(&bob_pub).verify_inline(&signed, Encoding::Binary).unwrap();
    assert_eq!(content, b"hello");
    assert_eq!(result.status().unwrap(), VerificationStatus::NoVerifier);
}

#[test]
fn signature_details_list_every_signer() {
    let (alice, alice_pub) = key_pair("alice");
    let (bob, _) = key_pair("bob");
    let signers = PgpPrivateKeyRing::new([&alice, &bob]);
    let signature = PgpSigner::new(signers)
        .with_time(&FixedTime::from_unix(1_700_000_000))
        .sign_detached(b"data", Encoding::Binary)
        .unwrap();

    let result = PgpVerifier::new(&alice_pub)
        .verify_detached(b"data", &signature, Encoding::Binary)
        .unwrap();
    assert_eq!(result.status().unwrap(), VerificationStatus::Ok);
    assert_eq!(result.signature_count().unwrap(), 2);

    let details = result.signatures().unwrap();
    let alice_id = alice.id().unwrap();
    let bob_id = bob.id().unwrap();
    let mine = details.iter().find(|d| d.key_id == alice_id).expect("alice signed");
    let theirs = details.iter().find(|d| d.key_id == bob_id).expect("bob signed");
    assert_eq!(mine.status, VerificationStatus::Ok);
    assert_eq!(mine.creation_time, 1_700_000_000);
    assert_eq!(theirs.status, VerificationStatus::NoVerifier);
}

#[test]
fn verification_time_before_signature_fails() {
    let (private, public) = key_pair("alice");
    let signature = PgpSigner::new(&private)
        .with_time(&FixedTime::from_unix(1_700_000_000))
        .sign_detached(b"data", Encoding::Binary)
        .unwrap();
    let result = PgpVerifier::new(&public)
        .with_time(&FixedTime::from_unix(1_650_000_000))
        .verify_detached(b"data", &signature, Encoding::Binary)
        .unwrap();
    assert_eq!(result.status().unwrap(), VerificationStatus::Failed);
}

#[test]
fn detached_stream_matches_buffer() {
    let (private, public) = key_pair("alice");
    let data = vec![0x11u8; 50_000];
    let signature = PgpSigner::new(&private)
        .sign_stream(data.as_slice(), Vec::new(), Encoding::Binary, SigningMode::Detached)
        .unwrap();
    let verifier = PgpVerifier::new(PgpKeyRing::single(&public));
    let streamed = verifier
        .verify_detached_stream(data.as_slice(), &signature, Encoding::Binary)
        .unwrap();
    assert!(streamed.status().unwrap().is_ok());
    let buffered = verifier.verify_detached(&data, &signature, Encoding::Binary).unwrap();
    assert!(buffered.status().unwrap().is_ok());
}

#[test]
fn inline_stream_yields_content_then_result() {
    let (private, public) = key_pair("alice");
    let signed = PgpSigner::new(&private).sign(b"inline content", Encoding::AsciiArmor).unwrap();
    let mut stream = PgpVerifier::new(&public)
        .open_inline_stream(signed.as_slice(), Encoding::AsciiArmor)
        .unwrap();
    assert!(matches!(stream.verification_result(), Err(PgpError::InvalidOperation(_))));
    let mut content = Vec::new();
    stream.read_to_end(&mut content).unwrap();
    assert_eq!(content, b"inline content");
    assert!(stream.verification_result().unwrap().status().unwrap().is_ok());
}

#[test]
fn tampered_cleartext_fails() {
    let (private, public) = key_pair("alice");
    let signed = PgpSigner::new(&private).sign_cleartext(b"pay bob 10").unwrap();
    let text = String::from_utf8(signed).unwrap();
    assert!(text.contains("pay bob 10"));
    let tampered = text.replace("pay bob 10", "pay bob 99");
    let (content, result) = PgpVerifier::new(&public).verify_cleartext(tampered.as_bytes()).unwrap();
    assert_eq!(content, b"pay bob 99");
    assert_eq!(result.status().unwrap(), VerificationStatus::Failed);
}

#[test]
fn released_result_rejects_queries() {
    let (private, public) = key_pair("alice");
    let signature = PgpSigner::new(&private).sign_detached(b"x", Encoding::Binary).unwrap();
    let mut result = PgpVerifier::new(&public)
        .verify_detached(b"x", &signature, Encoding::Binary)
        .unwrap();
    result.release();
    assert!(matches!(result.status(), Err(PgpError::InvalidHandle("verification result"))));
}
