//! Encrypt → decrypt round trips across secrets, encodings and shapes.

use std::io::{Read, Write};

use sceau_pgp::{
    Compression, DecryptionSecrets, DetachedSignature, Encoding, EncryptionSecrets, EncryptionState, PgpDecrypter,
    PgpEncrypter, PgpError, PgpKeyRing, PgpPrivateKeyRing, SliceWriter, VerificationStatus,
};

use super::common::{key_pair, private_key};

#[test]
fn plain_text_armored_round_trip() {
    let (private, public) = key_pair("alice");
    let message = PgpEncrypter::new(&public)
        .encrypt(b"plain text", Encoding::AsciiArmor)
        .expect("encryption should succeed");
    assert!(message.starts_with(b"-----BEGIN PGP MESSAGE-----"));

    let (plain, result) = PgpDecrypter::new(&private)
        .decrypt(&message, Encoding::AsciiArmor)
        .expect("decryption should succeed");
    assert_eq!(plain, b"plain text");
    assert!(result.is_none());
}

#[test]
fn password_round_trip_binary() {
    let message = PgpEncrypter::new(EncryptionSecrets::Password(b"correct horse"))
        .encrypt(b"payload", Encoding::Binary)
        .unwrap();
    let (plain, _) = PgpDecrypter::new(DecryptionSecrets::Password(b"correct horse"))
        .decrypt(&message, Encoding::Binary)
        .unwrap();
    assert_eq!(plain, b"payload");
}

#[test]
fn empty_plaintext_round_trip() {
    let (private, public) = key_pair("empty");
    let message = PgpEncrypter::new(&public).encrypt(b"", Encoding::Binary).unwrap();
    let (plain, _) = PgpDecrypter::new(&private).decrypt(&message, Encoding::Binary).unwrap();
    assert!(plain.is_empty());
}

#[test]
fn several_recipients_each_decrypt() {
    let (alice, alice_pub) = key_pair("alice");
    let (bob, bob_pub) = key_pair("bob");
    let ring = PgpKeyRing::new([&alice_pub, &bob_pub]);
    let message = PgpEncrypter::new(ring).encrypt(b"for both", Encoding::Binary).unwrap();

    for key in [&alice, &bob] {
        let (plain, _) = PgpDecrypter::new(key).decrypt(&message, Encoding::Binary).unwrap();
        assert_eq!(plain, b"for both");
    }
}

#[test]
fn wrong_key_cannot_decrypt() {
    let (_, public) = key_pair("alice");
    let eve = private_key("eve");
    let message = PgpEncrypter::new(&public).encrypt(b"secret", Encoding::Binary).unwrap();
    let result = PgpDecrypter::new(&eve).decrypt(&message, Encoding::Binary);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn signed_and_encrypted_verifies() {
    let (alice, alice_pub) = key_pair("alice");
    let (bob, bob_pub) = key_pair("bob");
    let message = PgpEncrypter::new(&bob_pub)
        .with_signing_keys(&alice)
        .encrypt(b"signed secret", Encoding::Binary)
        .unwrap();

    let (plain, result) = PgpDecrypter::new(&bob)
        .with_verification_keys(&alice_pub)
        .decrypt(&message, Encoding::Binary)
        .unwrap();
    assert_eq!(plain, b"signed secret");
    assert_eq!(result.unwrap().status().unwrap(), VerificationStatus::Ok);
}

#[test]
fn detached_signature_checked_while_decrypting() {
    let (alice, alice_pub) = key_pair("alice");
    let (bob, bob_pub) = key_pair("bob");
    for state in [EncryptionState::Plain, EncryptionState::Encrypted] {
        let (message, signature) = PgpEncrypter::new(&bob_pub)
            .with_signing_keys(&alice)
            .encrypt_detached(b"detached", Encoding::Binary, state)
            .expect("detached encryption should succeed");
        let detached = DetachedSignature {
            data: &signature,
            encoding: Encoding::Binary,
            state,
        };
        let (plain, result) = PgpDecrypter::new(&bob)
            .with_verification_keys(&alice_pub)
            .with_detached_signature(detached)
            .decrypt(&message, Encoding::Binary)
            .unwrap();
        assert_eq!(plain, b"detached");
        assert!(result.unwrap().status().unwrap().is_ok(), "{state:?}");
    }
}

#[test]
fn buffer_and_writer_shapes_agree_on_plaintext() {
    let (private, public) = key_pair("alice");
    let encrypter = PgpEncrypter::new(&public);
    let data = vec![0x5Au8; 10_000];

    let mut output = vec![0u8; 16_384];
    let written = encrypter.encrypt_into(&data, &mut output, Encoding::Binary).unwrap();
    let from_slice = &output[..written];
    let from_writer = encrypter.encrypt_to_writer(&data, Vec::new(), Encoding::Binary).unwrap();

    let decrypter = PgpDecrypter::new(&private);
    assert_eq!(decrypter.decrypt(from_slice, Encoding::Binary).unwrap().0, data);
    assert_eq!(decrypter.decrypt(&from_writer, Encoding::Binary).unwrap().0, data);

    let mut plain = vec![0u8; data.len()];
    let (n, _) = decrypter.decrypt_into(&from_writer, &mut plain, Encoding::Binary).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(plain, data);
}

#[test]
fn undersized_output_buffer_fails() {
    let (_, public) = key_pair("alice");
    let mut output = [0u8; 32];
    let result = PgpEncrypter::new(&public).encrypt_to_writer(b"too big for 32 bytes", SliceWriter::new(&mut output), Encoding::Binary);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn streaming_round_trip_large_payload() {
    let (private, public) = key_pair("alice");
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let message = PgpEncrypter::new(&public)
        .with_compression(Compression::Default)
        .encrypt_stream(data.as_slice(), Vec::new(), Encoding::AsciiArmor)
        .expect("stream encryption should succeed");

    let mut stream = PgpDecrypter::new(&private)
        .open_stream(message.as_slice(), Encoding::AsciiArmor)
        .expect("decryption stream should open");
    let mut plain = Vec::new();
    stream.read_to_end(&mut plain).unwrap();
    assert_eq!(plain, data);
}

#[test]
fn stream_with_detached_signature_sink() {
    let (alice, alice_pub) = key_pair("alice");
    let (bob, bob_pub) = key_pair("bob");
    let mut stream = PgpEncrypter::new(&bob_pub)
        .with_signing_keys(PgpPrivateKeyRing::from(&alice))
        .open_stream_with_signature(Vec::new(), Vec::new(), EncryptionState::Plain, Encoding::Binary)
        .unwrap();
    stream.write_all(b"streamed with signature").unwrap();
    let output = stream.finish().unwrap();
    let signature = output.signature.unwrap();
    assert!(!signature.is_empty());
    assert!(output.key_packets.is_none());

    let (plain, result) = PgpDecrypter::new(&bob)
        .with_verification_keys(&alice_pub)
        .with_detached_signature(DetachedSignature::plain(&signature, Encoding::Binary))
        .decrypt(&output.message, Encoding::Binary)
        .unwrap();
    assert_eq!(plain, b"streamed with signature");
    assert!(result.unwrap().status().unwrap().is_ok());
}

#[test]
fn released_recipient_is_rejected_before_the_engine() {
    let (_, mut public) = key_pair("alice");
    public.release();
    let result = PgpEncrypter::new(&public).encrypt(b"x", Encoding::Binary);
    assert!(matches!(result, Err(PgpError::InvalidHandle("key"))));
}
