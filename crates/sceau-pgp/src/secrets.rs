//! What unlocks a message: a key ring, a session key or a password.

use std::fmt;

use crate::keyring::{PgpKeyRing, PgpPrivateKeyRing};
use crate::key::{PgpKey, PgpPrivateKey};
use crate::session_key::PgpSessionKey;

static EMPTY_RING: PgpKeyRing<'static> = PgpKeyRing::empty();

/// The resolved form every operation consumes.
///
/// Absent parts are an empty ring, no session key and an empty password.
pub(crate) struct SecretsView<'s, 'a> {
    pub(crate) key_ring: &'s PgpKeyRing<'a>,
    pub(crate) session_key: Option<&'a PgpSessionKey>,
    pub(crate) password: &'a [u8],
}

/// Secrets for encryption.
#[derive(Clone)]
pub enum EncryptionSecrets<'a> {
    /// Public keys of the recipients.
    KeyRing(PgpKeyRing<'a>),
    SessionKey(&'a PgpSessionKey),
    Password(&'a [u8]),
}

impl<'a> EncryptionSecrets<'a> {
    pub(crate) fn view(&self) -> SecretsView<'_, 'a> {
        match self {
            Self::KeyRing(ring) => SecretsView {
                key_ring: ring,
                session_key: None,
                password: &[],
            },
            Self::SessionKey(session_key) => SecretsView {
                key_ring: &EMPTY_RING,
                session_key: Some(session_key),
                password: &[],
            },
            Self::Password(password) => SecretsView {
                key_ring: &EMPTY_RING,
                session_key: None,
                password,
            },
        }
    }
}

impl<'a> From<PgpKeyRing<'a>> for EncryptionSecrets<'a> {
    fn from(ring: PgpKeyRing<'a>) -> Self {
        Self::KeyRing(ring)
    }
}

impl<'a> From<&'a PgpKey> for EncryptionSecrets<'a> {
    fn from(key: &'a PgpKey) -> Self {
        Self::KeyRing(PgpKeyRing::single(key))
    }
}

impl<'a> From<&'a PgpPrivateKey> for EncryptionSecrets<'a> {
    fn from(key: &'a PgpPrivateKey) -> Self {
        Self::KeyRing(PgpKeyRing::from(key))
    }
}

impl<'a> From<&'a PgpSessionKey> for EncryptionSecrets<'a> {
    fn from(session_key: &'a PgpSessionKey) -> Self {
        Self::SessionKey(session_key)
    }
}

impl fmt::Debug for EncryptionSecrets<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyRing(ring) => f.debug_tuple("KeyRing").field(ring).finish(),
            Self::SessionKey(_) => f.write_str("SessionKey(..)"),
            Self::Password(_) => f.write_str("Password(***)"),
        }
    }
}

/// Secrets for decryption.
#[derive(Clone)]
pub enum DecryptionSecrets<'a> {
    /// Private keys, one of which must match a key packet.
    KeyRing(PgpPrivateKeyRing<'a>),
    SessionKey(&'a PgpSessionKey),
    Password(&'a [u8]),
}

impl<'a> DecryptionSecrets<'a> {
    pub(crate) fn view(&self) -> SecretsView<'_, 'a> {
        match self {
            Self::KeyRing(ring) => SecretsView {
                key_ring: ring.as_key_ring(),
                session_key: None,
                password: &[],
            },
            Self::SessionKey(session_key) => SecretsView {
                key_ring: &EMPTY_RING,
                session_key: Some(session_key),
                password: &[],
            },
            Self::Password(password) => SecretsView {
                key_ring: &EMPTY_RING,
                session_key: None,
                password,
            },
        }
    }
}

impl<'a> From<PgpPrivateKeyRing<'a>> for DecryptionSecrets<'a> {
    fn from(ring: PgpPrivateKeyRing<'a>) -> Self {
        Self::KeyRing(ring)
    }
}

impl<'a> From<&'a PgpPrivateKey> for DecryptionSecrets<'a> {
    fn from(key: &'a PgpPrivateKey) -> Self {
        Self::KeyRing(PgpPrivateKeyRing::from(key))
    }
}

impl<'a> From<&'a PgpSessionKey> for DecryptionSecrets<'a> {
    fn from(session_key: &'a PgpSessionKey) -> Self {
        Self::SessionKey(session_key)
    }
}

impl fmt::Debug for DecryptionSecrets<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyRing(ring) => f.debug_tuple("KeyRing").field(ring).finish(),
            Self::SessionKey(_) => f.write_str("SessionKey(..)"),
            Self::Password(_) => f.write_str("Password(***)"),
        }
    }
}
