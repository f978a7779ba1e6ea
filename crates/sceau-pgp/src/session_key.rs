//! Symmetric session keys and their key packets.

use std::io::Write;

use secrecy::SecretSlice;
use serde::{Deserialize, Serialize};

use sceau_engine::abi::cipher;

use crate::bridge::{collect, write_through};
use crate::environment::{resolve_time, TimeSource};
use crate::error::{check, PgpError};
use crate::estimate;
use crate::handle::{HandleKind, OwnedHandle};
use crate::keyring::{PgpKeyRing, RawHandles};
use crate::params::{Compression, DecryptionCall, EncryptionCall};
use crate::secrets::DecryptionSecrets;

/// Session key cipher. Ids follow the OpenPGP symmetric algorithm registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymmetricCipher {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl SymmetricCipher {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Aes128 => cipher::AES128,
            Self::Aes192 => cipher::AES192,
            Self::Aes256 => cipher::AES256,
        }
    }

    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] for ids outside the supported set.
    pub fn from_id(id: u8) -> Result<Self, PgpError> {
        match id {
            cipher::AES128 => Ok(Self::Aes128),
            cipher::AES192 => Ok(Self::Aes192),
            cipher::AES256 => Ok(Self::Aes256),
            other => Err(PgpError::Pgp(format!("unsupported symmetric cipher {other}"))),
        }
    }

    /// Token length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

/// A symmetric key usable in place of public-key encryption.
#[derive(Debug)]
pub struct PgpSessionKey {
    handle: OwnedHandle,
}

impl PgpSessionKey {
    fn acquire(call: impl FnOnce(*mut sceau_engine::Handle) -> sceau_engine::RawError) -> Result<Self, PgpError> {
        Ok(Self {
            handle: OwnedHandle::acquire(HandleKind::SessionKey, call)?,
        })
    }

    pub(crate) const fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    /// A fresh random key.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the engine rejects the cipher.
    pub fn generate(cipher: SymmetricCipher) -> Result<Self, PgpError> {
        Self::acquire(|out| {
            // SAFETY: `out` is a valid out-pointer.
            unsafe { sceau_engine::pgp_generate_session_key(cipher.id(), out) }
        })
    }

    /// Wrap an existing raw token.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the token length does not match the cipher.
    pub fn import(token: &[u8], cipher: SymmetricCipher) -> Result<Self, PgpError> {
        Self::acquire(|out| {
            // SAFETY: `token` is valid for its length.
            unsafe { sceau_engine::pgp_session_key_new(token.as_ptr(), token.len(), cipher.id(), out) }
        })
    }

    /// The raw token and its cipher.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn export(&self) -> Result<(SecretSlice<u8>, SymmetricCipher), PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut id = 0u8;
        let token = collect(SymmetricCipher::Aes256.key_len(), |w| {
            // SAFETY: live handle, anchored writer, valid out-pointer.
            unsafe { sceau_engine::pgp_session_key_export_token(raw, w, &mut id) }
        })?;
        let cipher = SymmetricCipher::from_id(id)?;
        Ok((SecretSlice::from(token), cipher))
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn cipher(&self) -> Result<SymmetricCipher, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut id = 0u8;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_session_key_get_algorithm(raw, &mut id) })?;
        SymmetricCipher::from_id(id)
    }

    fn encryption_call<'r>(
        recipients: &'r PgpKeyRing<'_>,
        time: Option<&dyn TimeSource>,
    ) -> Result<EncryptionCall<'r>, PgpError> {
        Ok(EncryptionCall {
            recipients: recipients.raw_handles()?,
            signers: RawHandles::none(),
            session_key: None,
            signing_context: None,
            password: &[],
            time: resolve_time(time),
            detached_signature: None,
            utf8: false,
            compression: Compression::None,
        })
    }

    /// Key packets that unlock this session key for each recipient.
    ///
    /// Recipients must be usable at `time`, or at the default time when
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] for an empty ring or a recipient that
    /// cannot encrypt.
    pub fn encrypt_to_key_packets(
        &self,
        recipients: &PgpKeyRing<'_>,
        time: Option<&dyn TimeSource>,
    ) -> Result<Vec<u8>, PgpError> {
        let call = Self::encryption_call(recipients, time)?;
        let raw = self.handle.borrow()?.dangerous_raw();
        let params = call.record();
        tracing::debug!(recipients = recipients.count(), "exporting session key packets");
        collect(estimate::key_packets_len(recipients.count()), |w| {
            // SAFETY: `params` points into `call`, which outlives the call.
            unsafe { sceau_engine::pgp_encrypt_session_key(&params, raw, w) }
        })
    }

    /// As [`Self::encrypt_to_key_packets`], writing into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::encrypt_to_key_packets`].
    pub fn write_key_packets<W: Write>(
        &self,
        recipients: &PgpKeyRing<'_>,
        writer: W,
        time: Option<&dyn TimeSource>,
    ) -> Result<W, PgpError> {
        let call = Self::encryption_call(recipients, time)?;
        let raw = self.handle.borrow()?.dangerous_raw();
        let params = call.record();
        write_through(writer, |w| {
            // SAFETY: `params` points into `call`, which outlives the call.
            unsafe { sceau_engine::pgp_encrypt_session_key(&params, raw, w) }
        })
    }

    /// Recover the session key from key packets.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if no secret matches any packet, and
    /// [`PgpError::InvalidOperation`] when given a session key.
    pub fn decrypt_from_key_packets(
        key_packets: &[u8],
        secrets: &DecryptionSecrets<'_>,
        time: Option<&dyn TimeSource>,
    ) -> Result<Self, PgpError> {
        let view = secrets.view();
        if view.session_key.is_some() {
            return Err(PgpError::invalid_operation("key packets cannot be opened with a session key"));
        }
        let call = DecryptionCall {
            decryption_keys: view.key_ring.raw_handles()?,
            verification_keys: RawHandles::none(),
            session_key: None,
            verification_context: None,
            password: view.password,
            time: resolve_time(time),
            utf8: false,
            detached: None,
        };
        let params = call.record();
        Self::acquire(|out| {
            // SAFETY: `params` and `key_packets` outlive the call.
            unsafe { sceau_engine::pgp_decrypt_session_key(&params, key_packets.as_ptr(), key_packets.len(), out) }
        })
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}
