//! Reading key ids and packet layout without decrypting.

use sceau_pgp::{Encoding, PgpEncrypter, PgpKeyRing, PgpMessage, PgpSigner};

use super::common::key_pair;

#[test]
fn encryption_key_ids_name_every_recipient() {
    let (_, alice) = key_pair("alice");
    let (_, bob) = key_pair("bob");
    let message = PgpEncrypter::new(PgpKeyRing::new([&alice, &bob]))
        .encrypt(b"data", Encoding::AsciiArmor)
        .unwrap();
    let parsed = PgpMessage::new(&message, Encoding::AsciiArmor).expect("message should parse");
    let mut ids = parsed.encryption_key_ids().unwrap();
    ids.sort_unstable();
    let mut expected = vec![alice.id().unwrap(), bob.id().unwrap()];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[test]
fn split_matches_key_packets_length() {
    let (_, public) = key_pair("alice");
    let message = PgpEncrypter::new(&public).encrypt(b"data", Encoding::Binary).unwrap();
    let parsed = PgpMessage::new(&message, Encoding::Binary).unwrap();
    let boundary = parsed.key_packets_length().unwrap();
    let (keys, data) = parsed.split().unwrap();
    assert_eq!(keys.len(), boundary);
    assert_eq!(keys, message[..boundary]);
    assert_eq!(data, message[boundary..]);
}

#[test]
fn signed_message_exposes_signer_ids() {
    let (private, _) = key_pair("alice");
    let signed = PgpSigner::new(&private).sign(b"data", Encoding::Binary).unwrap();
    let parsed = PgpMessage::new(&signed, Encoding::Binary).unwrap();
    assert_eq!(parsed.signature_key_ids().unwrap(), vec![private.id().unwrap()]);
    assert!(parsed.encryption_key_ids().unwrap().is_empty());
    assert_eq!(parsed.key_packets_length().unwrap(), 0);
}
