//! Session key generation, export and key packet exchange.

use std::io::Write;

use secrecy::ExposeSecret;
use sceau_pgp::{
    DecryptionSecrets, Encoding, FixedTime, PgpDecrypter, PgpEncrypter, PgpError, PgpKeyRing, PgpMessage,
    PgpSessionKey, SymmetricCipher,
};

use super::common::{key_pair, private_key_at};

const YEAR_2030: u64 = 1_893_456_000;

#[test]
fn token_length_follows_cipher() {
    for cipher in [SymmetricCipher::Aes128, SymmetricCipher::Aes192, SymmetricCipher::Aes256] {
        let key = PgpSessionKey::generate(cipher).expect("generation should succeed");
        let (token, exported) = key.export().unwrap();
        assert_eq!(exported, cipher);
        assert_eq!(token.expose_secret().len(), cipher.key_len());
    }
}

#[test]
fn imported_token_decrypts_what_the_original_encrypted() {
    let original = PgpSessionKey::generate(SymmetricCipher::default()).unwrap();
    let message = PgpEncrypter::new(&original).encrypt(b"bulk data", Encoding::Binary).unwrap();

    let (token, cipher) = original.export().unwrap();
    let imported = PgpSessionKey::import(token.expose_secret(), cipher).unwrap();
    let (plain, _) = PgpDecrypter::new(&imported).decrypt(&message, Encoding::Binary).unwrap();
    assert_eq!(plain, b"bulk data");
}

#[test]
fn token_of_wrong_length_is_rejected() {
    let result = PgpSessionKey::import(&[0u8; 7], SymmetricCipher::Aes256);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn key_packets_carry_the_session_key_to_recipients() {
    let (private, public) = key_pair("alice");
    let session_key = PgpSessionKey::generate(SymmetricCipher::Aes128).unwrap();
    let packets = session_key
        .encrypt_to_key_packets(&PgpKeyRing::single(&public), None)
        .expect("key packet export should succeed");

    let recovered = PgpSessionKey::decrypt_from_key_packets(&packets, &DecryptionSecrets::from(&private), None)
        .expect("key packets should open");
    assert_eq!(recovered.cipher().unwrap(), SymmetricCipher::Aes128);
    assert_eq!(
        recovered.export().unwrap().0.expose_secret(),
        session_key.export().unwrap().0.expose_secret()
    );
}

#[test]
fn split_stream_data_packet_opens_with_recovered_session_key() {
    let (private, public) = key_pair("alice");
    let mut stream = PgpEncrypter::new(&public).open_split_stream(Vec::new(), Vec::new()).unwrap();
    stream.write_all(b"split and rejoined").unwrap();
    let output = stream.finish().unwrap();
    let key_packets = output.key_packets.unwrap();

    let session_key = PgpSessionKey::decrypt_from_key_packets(&key_packets, &DecryptionSecrets::from(&private), None).unwrap();
    let (plain, _) = PgpDecrypter::new(&session_key)
        .decrypt(&output.message, Encoding::Binary)
        .unwrap();
    assert_eq!(plain, b"split and rejoined");

    let mut joined = key_packets;
    joined.extend_from_slice(&output.message);
    let message = PgpMessage::new(&joined, Encoding::Binary).unwrap();
    assert_eq!(message.encryption_key_ids().unwrap(), vec![public.id().unwrap()]);
}

#[test]
fn key_packets_cannot_be_opened_with_a_session_key() {
    let session_key = PgpSessionKey::generate(SymmetricCipher::Aes256).unwrap();
    let result = PgpSessionKey::decrypt_from_key_packets(b"irrelevant", &DecryptionSecrets::SessionKey(&session_key), None);
    assert!(matches!(result, Err(PgpError::InvalidOperation(_))));
}

#[test]
fn empty_ring_produces_no_key_packets() {
    let session_key = PgpSessionKey::generate(SymmetricCipher::Aes256).unwrap();
    let result = session_key.encrypt_to_key_packets(&PgpKeyRing::empty(), None);
    assert!(matches!(result, Err(PgpError::Pgp(_))));
}

#[test]
fn key_packets_honour_the_time_override() {
    let private = private_key_at("future", YEAR_2030);
    let public = private.to_public().unwrap();
    let ring = PgpKeyRing::single(&public);
    let later = FixedTime::from_unix(YEAR_2030 + 100);
    let session_key = PgpSessionKey::generate(SymmetricCipher::Aes256).unwrap();

    assert!(matches!(session_key.encrypt_to_key_packets(&ring, None), Err(PgpError::Pgp(_))));

    let packets = session_key
        .encrypt_to_key_packets(&ring, Some(&later))
        .expect("recipient is valid at the override time");
    let written = session_key.write_key_packets(&ring, Vec::new(), Some(&later)).unwrap();
    assert!(!written.is_empty());

    let recovered =
        PgpSessionKey::decrypt_from_key_packets(&packets, &DecryptionSecrets::from(&private), Some(&later)).unwrap();
    let message = PgpEncrypter::new(&recovered)
        .with_time(&later)
        .encrypt(b"same clock", Encoding::Binary)
        .unwrap();
    let (plain, _) = PgpDecrypter::new(&session_key).decrypt(&message, Encoding::Binary).unwrap();
    assert_eq!(plain, b"same clock");
}
