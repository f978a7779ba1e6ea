//! Decryption pipeline: session key recovery, opening, literal parsing.

use std::io::Read;
use std::sync::Arc;

use parking_lot::Mutex;
use zeroize::Zeroizing;

use super::armor;
use super::boundary::bytes;
use super::error::EngineError;
use super::handles;
use super::keys::KeyMaterial;
use super::literal::{LiteralSource, Verifier};
use super::message::split_key_packets;
use super::packet::{self, tag};
use super::seal::{self, OpenSource};
use super::session::{self, SessionKey};
use super::signature::{parse_signatures, Signature};
use super::verify::{VerificationSlot, VerifyConfig};
use crate::abi::DecryptionParams;

struct DetachedSignature {
    data: Vec<u8>,
    encrypted: bool,
    armored: bool,
}

pub(crate) struct DecryptRequest {
    keys: Vec<Arc<KeyMaterial>>,
    session_key: Option<Arc<SessionKey>>,
    password: Option<Zeroizing<Vec<u8>>>,
    verify: VerifyConfig,
    detached: Option<DetachedSignature>,
}

/// Plaintext reader plus the slot its verification lands in.
pub(crate) struct Opened<'a> {
    pub(crate) reader: Box<dyn Read + Send + 'a>,
    pub(crate) slot: VerificationSlot,
}

impl DecryptRequest {
    /// # Safety
    ///
    /// Every pointer inside `params` must be valid for its paired length.
    pub(crate) unsafe fn from_params(params: &DecryptionParams) -> Result<Self, EngineError> {
        // SAFETY: forwarded to the caller.
        let keys = unsafe { handles::keys(params.decryption_keys, params.decryption_keys_len) }?;
        // SAFETY: forwarded to the caller.
        let verification_keys =
            unsafe { handles::keys(params.verification_keys, params.verification_keys_len) }?;
        // SAFETY: forwarded to the caller.
        let password = unsafe { bytes(params.password, params.password_len) }?;
        // SAFETY: forwarded to the caller.
        let detached = unsafe { bytes(params.detached_signature, params.detached_signature_len) }?;
        Ok(Self {
            keys,
            session_key: params
                .has_session_key
                .then(|| handles::session_key(params.session_key))
                .transpose()?,
            password: (!password.is_empty()).then(|| Zeroizing::new(password.to_vec())),
            verify: VerifyConfig {
                keys: verification_keys,
                time: params.has_verification_time.then_some(params.verification_time),
                context: params
                    .has_verification_context
                    .then(|| handles::verification_context(params.verification_context))
                    .transpose()?,
            },
            detached: (!detached.is_empty()).then(|| DetachedSignature {
                data: detached.to_vec(),
                encrypted: params.detached_signature_is_encrypted,
                armored: params.detached_signature_is_armored,
            }),
        })
    }

    /// Whether the caller asked for a verification result.
    pub(crate) fn verifies(&self) -> bool {
        !self.verify.keys.is_empty()
    }

    /// Session key from a standalone key packet block.
    pub(crate) fn session_from_key_packets(&self, data: &[u8]) -> Result<SessionKey, EngineError> {
        let (keys, passwords) = split_key_packets(data)?;
        session::resolve(&keys, &passwords, &self.keys, self.password.as_deref().map(Vec::as_slice))
    }

    fn detached_signatures(&self, session: &SessionKey) -> Result<Option<Vec<Signature>>, EngineError> {
        let Some(detached) = &self.detached else {
            return Ok(None);
        };
        let raw = if detached.armored {
            armor::unarmor(&detached.data)?
        } else {
            detached.data.clone()
        };
        let raw = if detached.encrypted {
            seal::open_all(&raw, session)?
        } else {
            raw
        };
        parse_signatures(&raw).map(Some)
    }

    /// Consume the leading packets of `input` and return the plaintext
    /// reader.
    pub(crate) fn open<'a, R: Read + Send + 'a>(&self, mut input: R) -> Result<Opened<'a>, EngineError> {
        let mut key_packets = Vec::new();
        let mut password_packets = Vec::new();
        let header = loop {
            match packet::read_packet(&mut input)? {
                Some((tag::KEY_PACKET, body)) => key_packets.push(body),
                Some((tag::PASSWORD_PACKET, body)) => password_packets.push(body),
                Some((tag::SEALED, body)) => break body,
                Some((tag::LITERAL_START | tag::SIGNATURE, _)) => {
                    return Err(EngineError::malformed("message is not encrypted"))
                }
                Some((kind, _)) => {
                    return Err(EngineError::malformed(format!(
                        "unexpected packet {kind:#x} in encrypted message"
                    )))
                }
                None => return Err(EngineError::malformed("message is empty")),
            }
        };

        let session = match &self.session_key {
            Some(session) => Arc::clone(session),
            None => Arc::new(session::resolve(
                &key_packets,
                &password_packets,
                &self.keys,
                self.password.as_deref().map(Vec::as_slice),
            )?),
        };
        tracing::debug!(
            key_packets = key_packets.len(),
            password_packets = password_packets.len(),
            "session key recovered"
        );

        let opened = OpenSource::new(input, &header, &session)?;
        let slot: VerificationSlot = Arc::new(Mutex::new(None));
        let verifier = Verifier {
            config: self.verify.clone(),
            detached: self.detached_signatures(&session)?,
            slot: Arc::clone(&slot),
        };
        Ok(Opened {
            reader: Box::new(LiteralSource::new(opened, Some(verifier))),
            slot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DecryptRequest {
        DecryptRequest {
            keys: Vec::new(),
            session_key: None,
            password: None,
            verify: VerifyConfig::default(),
            detached: None,
        }
    }

    #[test]
    fn plain_message_is_rejected() {
        let data = packet::encode_packet(tag::LITERAL_START, &[0]).unwrap();
        let err = request().open(data.as_slice()).err().unwrap();
        assert!(err.to_string().contains("not encrypted"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(request().open(&[][..]).is_err());
    }

    #[test]
    fn missing_secrets_are_reported() {
        let data = packet::encode_packet(tag::SEALED, &[9; 13]).unwrap();
        let err = request().open(data.as_slice()).err().unwrap();
        assert!(err.to_string().contains("no decryption keys"));
    }
}
