//! Session keys and the packets that carry them.

use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::crypto;
use super::error::EngineError;
use super::keys::KeyMaterial;
use super::packet::{self, tag, Fields};
use crate::abi::cipher;

const KEY_PACKET_INFO: &[u8] = b"sceau key packet";
const PASSWORD_PACKET_AAD: &[u8] = b"sceau password packet";
const CONTENT_KEY_INFO: &[u8] = b"sceau content key";
const PASSWORD_SALT_LEN: usize = 16;

/// Token length for a cipher id.
pub(crate) fn token_len(cipher_id: u8) -> Result<usize, EngineError> {
    match cipher_id {
        cipher::AES128 => Ok(16),
        cipher::AES192 => Ok(24),
        cipher::AES256 => Ok(32),
        other => Err(EngineError::invalid(format!("unsupported symmetric cipher {other}"))),
    }
}

pub(crate) struct SessionKey {
    cipher: u8,
    token: Zeroizing<Vec<u8>>,
}

impl SessionKey {
    pub(crate) fn generate(cipher_id: u8) -> Result<Self, EngineError> {
        Ok(Self {
            cipher: cipher_id,
            token: crypto::random_vec(token_len(cipher_id)?)?,
        })
    }

    pub(crate) fn from_token(token: &[u8], cipher_id: u8) -> Result<Self, EngineError> {
        let expected = token_len(cipher_id)?;
        if token.len() != expected {
            return Err(EngineError::invalid(format!(
                "session key token must be {expected} bytes for cipher {cipher_id}, got {}",
                token.len()
            )));
        }
        Ok(Self {
            cipher: cipher_id,
            token: Zeroizing::new(token.to_vec()),
        })
    }

    pub(crate) const fn cipher(&self) -> u8 {
        self.cipher
    }

    pub(crate) fn token(&self) -> &[u8] {
        &self.token
    }

    /// AES-256-GCM key used for the data layer.
    pub(crate) fn content_key(&self) -> Result<Zeroizing<Vec<u8>>, EngineError> {
        crypto::hkdf_expand(&self.token, &[self.cipher], CONTENT_KEY_INFO, 32)
    }

    fn wire(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.token.len().saturating_add(1)));
        out.push(self.cipher);
        out.extend_from_slice(&self.token);
        out
    }

    fn from_wire(bytes: &[u8]) -> Result<Self, EngineError> {
        let (cipher_id, token) = bytes
            .split_first()
            .ok_or_else(|| EngineError::malformed("empty session key payload"))?;
        Self::from_token(token, *cipher_id)
    }

    // -----------------------------------------------------------------------
    // Key packets
    // -----------------------------------------------------------------------

    /// Encrypt this session key to `recipient`, valid at `time`.
    pub(crate) fn wrap_for(&self, recipient: &KeyMaterial, time: i64) -> Result<Vec<u8>, EngineError> {
        recipient.check_usable_at(time)?;
        let ephemeral = StaticSecret::from(crypto::random_array::<32>()?);
        let ephemeral_public = PublicKey::from(&ephemeral).to_bytes();
        let recipient_public = recipient.encryption_public();
        let shared = Zeroizing::new(
            ephemeral
                .diffie_hellman(&PublicKey::from(*recipient_public))
                .to_bytes(),
        );
        let kek = key_packet_kek(&shared, &ephemeral_public, recipient_public)?;
        let key_id = recipient.key_id().to_be_bytes();
        let sealed = crypto::seal_once(&kek, &key_id, &self.wire())?;

        let mut body = Vec::with_capacity(40usize.saturating_add(sealed.len()));
        body.extend_from_slice(&key_id);
        body.extend_from_slice(&ephemeral_public);
        body.extend_from_slice(&sealed);
        packet::encode_packet(tag::KEY_PACKET, &body)
    }

    /// Encrypt this session key under a password.
    pub(crate) fn wrap_with_password(&self, password: &[u8]) -> Result<Vec<u8>, EngineError> {
        let salt = crypto::random_array::<PASSWORD_SALT_LEN>()?;
        let key = crypto::password_key(password, &salt)?;
        let sealed = crypto::seal_once(key.as_ref(), PASSWORD_PACKET_AAD, &self.wire())?;
        let mut body = Vec::with_capacity(PASSWORD_SALT_LEN.saturating_add(sealed.len()));
        body.extend_from_slice(&salt);
        body.extend_from_slice(&sealed);
        packet::encode_packet(tag::PASSWORD_PACKET, &body)
    }
}

fn key_packet_kek(
    shared: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Result<Zeroizing<Vec<u8>>, EngineError> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient_public);
    crypto::hkdf_expand(shared, &salt, KEY_PACKET_INFO, 32)
}

/// Recipient key id of a key packet body.
pub(crate) fn key_packet_recipient(body: &[u8]) -> Result<u64, EngineError> {
    Fields::new(body).u64()
}

/// Recover the session key from a key packet body with `key`.
pub(crate) fn unwrap_key_packet(body: &[u8], key: &KeyMaterial) -> Result<SessionKey, EngineError> {
    let mut f = Fields::new(body);
    let key_id = f.u64()?;
    if key_id != key.key_id() {
        return Err(EngineError::key("key packet is not addressed to this key"));
    }
    let ephemeral_public: [u8; 32] = f.array()?;
    let sealed = f.rest();
    let shared = key.agree(&ephemeral_public)?;
    let kek = key_packet_kek(&shared, &ephemeral_public, key.encryption_public())?;
    let wire = crypto::open_once(&kek, &key_id.to_be_bytes(), sealed)
        .map_err(|_| EngineError::crypto("failed to decrypt key packet"))?;
    SessionKey::from_wire(&wire)
}

/// Recover the session key from a password packet body.
pub(crate) fn unwrap_password_packet(body: &[u8], password: &[u8]) -> Result<SessionKey, EngineError> {
    let mut f = Fields::new(body);
    let salt: [u8; PASSWORD_SALT_LEN] = f.array()?;
    let key = crypto::password_key(password, &salt)?;
    let wire = crypto::open_once(key.as_ref(), PASSWORD_PACKET_AAD, f.rest())
        .map_err(|_| EngineError::crypto("incorrect password"))?;
    SessionKey::from_wire(&wire)
}

/// Recover a session key from leading key and password packets.
///
/// Key packets are tried first, then password packets.
pub(crate) fn resolve(
    key_packets: &[Vec<u8>],
    password_packets: &[Vec<u8>],
    keys: &[std::sync::Arc<KeyMaterial>],
    password: Option<&[u8]>,
) -> Result<SessionKey, EngineError> {
    if keys.is_empty() && password.is_none() {
        return Err(EngineError::key(
            "no decryption keys, session key, or password provided",
        ));
    }
    for body in key_packets {
        let recipient = key_packet_recipient(body)?;
        for key in keys.iter().filter(|k| k.key_id() == recipient) {
            match unwrap_key_packet(body, key) {
                Ok(session) => return Ok(session),
                Err(e) => tracing::debug!(key_id = recipient, error = %e, "key packet rejected"),
            }
        }
    }
    if let Some(password) = password {
        for body in password_packets {
            if let Ok(session) = unwrap_password_packet(body, password) {
                return Ok(session);
            }
        }
    }
    Err(EngineError::key(
        "none of the provided secrets can decrypt this message",
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::abi::algorithm;

    fn key() -> KeyMaterial {
        KeyMaterial::generate(1_000, algorithm::DEFAULT, None).unwrap()
    }

    fn body(packet: &[u8]) -> Vec<u8> {
        packet::read_packet(&mut &packet[..]).unwrap().unwrap().1
    }

    #[test]
    fn key_packet_round_trip() {
        let recipient = key();
        let session = SessionKey::generate(cipher::AES256).unwrap();
        let packet = session.wrap_for(&recipient, 2_000).unwrap();
        assert_eq!(packet.len(), 94);
        let recovered = unwrap_key_packet(&body(&packet), &recipient).unwrap();
        assert_eq!(recovered.token(), session.token());
        assert_eq!(recovered.cipher(), cipher::AES256);
    }

    #[test]
    fn key_packet_for_other_key_fails() {
        let session = SessionKey::generate(cipher::AES128).unwrap();
        let packet = session.wrap_for(&key(), 2_000).unwrap();
        assert!(unwrap_key_packet(&body(&packet), &key()).is_err());
    }

    #[test]
    fn wrapping_before_key_creation_fails() {
        let session = SessionKey::generate(cipher::AES256).unwrap();
        assert!(session.wrap_for(&key(), 999).is_err());
    }

    #[test]
    fn password_packet_round_trip() {
        let session = SessionKey::generate(cipher::AES192).unwrap();
        let packet = session.wrap_with_password(b"hunter2").unwrap();
        let recovered = unwrap_password_packet(&body(&packet), b"hunter2").unwrap();
        assert_eq!(recovered.token(), session.token());
        assert!(unwrap_password_packet(&body(&packet), b"wrong").is_err());
    }

    #[test]
    fn token_length_is_checked() {
        assert!(SessionKey::from_token(&[0u8; 16], cipher::AES256).is_err());
        assert!(SessionKey::from_token(&[0u8; 16], 42).is_err());
    }

    #[test]
    fn resolve_without_secrets_is_descriptive() {
        let err = resolve(&[], &[], &[], None).err().unwrap();
        assert!(err.to_string().contains("no decryption keys"));
    }

    #[test]
    fn resolve_prefers_matching_key() {
        let recipient = Arc::new(key());
        let session = SessionKey::generate(cipher::AES256).unwrap();
        let packets = vec![body(&session.wrap_for(&recipient, 2_000).unwrap())];
        let found = resolve(&packets, &[], &[Arc::clone(&recipient)], None).unwrap();
        assert_eq!(found.token(), session.token());
    }
}
