//! SRP client/server agreement over a signed modulus.

use sceau_pgp::srp::{hash_mailbox_password, SERVER_SECRET_LEN};
use sceau_pgp::{PgpError, PgpKey, PgpSigner, SrpClient, SrpServer};

use super::common::key_pair;

const BITS: i32 = 2048;
const LEN: usize = 256;

/// Base64 of sixty `0xC5` bytes.
fn modulus_text() -> String {
    "xcXF".repeat(20)
}

fn modulus() -> Vec<u8> {
    vec![0xC5; 60]
}

fn signed_modulus() -> (Vec<u8>, PgpKey) {
    let (private, public) = key_pair("modulus");
    let signed = PgpSigner::new(&private)
        .sign_cleartext(modulus_text().as_bytes())
        .expect("modulus signing should succeed");
    (signed, public)
}

fn client(password: &[u8], signed: &[u8], key: &PgpKey) -> SrpClient {
    SrpClient::new("alice", password, b"saltsalt", signed, key).expect("client should accept the modulus")
}

#[test]
fn client_and_server_agree() {
    let (signed, key) = signed_modulus();
    let registration = client(b"hunter2", &signed, &key);
    let verifier = registration.derive_verifier(BITS).unwrap();
    assert_eq!(verifier.len(), LEN);

    let (server, server_ephemeral) = SrpServer::new(&modulus(), &verifier, BITS, None).unwrap();
    assert_eq!(server_ephemeral.len(), LEN);

    let login = client(b"hunter2", &signed, &key);
    let handshake = login.compute_handshake(&server_ephemeral, BITS).unwrap();
    assert_eq!(handshake.proof.len(), LEN);
    assert_eq!(handshake.ephemeral.len(), LEN);

    let server_proof = server
        .compute_exchange(&handshake.proof, &handshake.ephemeral)
        .expect("server should accept the client proof");
    assert!(handshake.verify_server_proof(&server_proof).unwrap());
    assert!(!handshake.verify_server_proof(&vec![0u8; LEN]).unwrap());
}

#[test]
fn wrong_password_is_rejected_by_the_server() {
    let (signed, key) = signed_modulus();
    let verifier = client(b"right", &signed, &key).derive_verifier(BITS).unwrap();
    let (server, server_ephemeral) = SrpServer::new(&modulus(), &verifier, BITS, None).unwrap();

    let handshake = client(b"wrong", &signed, &key)
        .compute_handshake(&server_ephemeral, BITS)
        .unwrap();
    let result = server.compute_exchange(&handshake.proof, &handshake.ephemeral);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn fixed_server_secret_is_reproducible() {
    let (signed, key) = signed_modulus();
    let verifier = client(b"pw", &signed, &key).derive_verifier(BITS).unwrap();
    let secret = [7u8; SERVER_SECRET_LEN];
    let (_, first) = SrpServer::new(&modulus(), &verifier, BITS, Some(&secret)).unwrap();
    let (_, second) = SrpServer::new(&modulus(), &verifier, BITS, Some(&secret)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn modulus_signed_by_another_key_is_rejected() {
    let (signed, _) = signed_modulus();
    let (_, stranger) = key_pair("stranger");
    let result = SrpClient::new("alice", b"pw", b"saltsalt", &signed, &stranger);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn verifier_depends_on_password() {
    let (signed, key) = signed_modulus();
    let a = client(b"one", &signed, &key).derive_verifier(BITS).unwrap();
    let b = client(b"two", &signed, &key).derive_verifier(BITS).unwrap();
    assert_ne!(a, b);
}

#[test]
fn mailbox_hash_has_fixed_length() {
    let digest = hash_mailbox_password(b"mailbox", b"0123456789abcdef").unwrap();
    assert_eq!(digest.len(), 60);
}
