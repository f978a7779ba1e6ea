//! Public and private OpenPGP keys.
//!
//! Attributes are queried from the engine on demand. Transforms such as
//! [`PgpPrivateKey::lock`] or [`PgpPrivateKey::to_public`] always produce a
//! new key and leave the original untouched.

use std::ffi::c_int;
use std::io::Write;
use std::ops::Deref;

use sceau_engine::abi::{algorithm, key_encoding};
use sceau_engine::{Handle, KeyGenerationParams, RawError};

use crate::bridge::{collect, write_through};
use crate::environment::{resolve_time, time_flag, TimeSource};
use crate::error::{check, PgpError};
use crate::handle::{HandleKind, OwnedHandle};
use crate::params::Encoding;

const FINGERPRINT_CAPACITY: usize = 32;
const EXPORT_CAPACITY: usize = 512;
const SHA256_LEN: usize = 32;

/// How key material passed to an import is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEncoding {
    /// Armored if it starts with an armor header, binary otherwise.
    #[default]
    Auto,
    Bytes,
    Armor,
}

impl KeyEncoding {
    const fn code(self) -> u8 {
        match self {
            Self::Auto => key_encoding::AUTO,
            Self::Bytes => key_encoding::BYTES,
            Self::Armor => key_encoding::ARMOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyGenerationAlgorithm {
    #[default]
    Default,
    Rsa,
    Ecc,
}

impl KeyGenerationAlgorithm {
    const fn code(self) -> u8 {
        match self {
            Self::Default => algorithm::DEFAULT,
            Self::Rsa => algorithm::RSA,
            Self::Ecc => algorithm::ECC,
        }
    }
}

/// Inputs of [`PgpPrivateKey::generate`].
///
/// An empty name and email produce a key without a user id.
#[derive(Default)]
pub struct KeyGenerationRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub algorithm: KeyGenerationAlgorithm,
    /// Creation time; the engine clock when absent.
    pub time: Option<&'a dyn TimeSource>,
}

// ---------------------------------------------------------------------------
// PgpKey
// ---------------------------------------------------------------------------

/// Any OpenPGP key, public or private.
#[derive(Debug)]
pub struct PgpKey {
    handle: OwnedHandle,
}

impl PgpKey {
    pub(crate) fn acquire(call: impl FnOnce(*mut Handle) -> RawError) -> Result<Self, PgpError> {
        Ok(Self {
            handle: OwnedHandle::acquire(HandleKind::Key, call)?,
        })
    }

    pub(crate) const fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    /// Import a public key; private material in `data` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the data is not a valid key.
    pub fn import(data: &[u8], encoding: KeyEncoding) -> Result<Self, PgpError> {
        Self::acquire(|out| {
            // SAFETY: `data` is valid for its length and `out` for one write.
            unsafe { sceau_engine::pgp_public_key_import(data.as_ptr(), data.len(), encoding.code(), out) }
        })
    }

    /// Export the public part.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release, or the engine
    /// failure.
    pub fn export(&self, encoding: Encoding) -> Result<Vec<u8>, PgpError> {
        self.export_with(true, encoding)
    }

    /// Export the public part into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::export`]; a failing writer surfaces as an engine error.
    pub fn export_to<W: Write>(&self, writer: W, encoding: Encoding) -> Result<W, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        write_through(writer, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_key_export(raw, true, encoding.is_armored(), w) }
        })
    }

    fn export_with(&self, force_public: bool, encoding: Encoding) -> Result<Vec<u8>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        collect(EXPORT_CAPACITY, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_key_export(raw, force_public, encoding.is_armored(), w) }
        })
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn version(&self) -> Result<i32, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut version: c_int = 0;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_key_get_version(raw, &mut version) })?;
        Ok(version)
    }

    /// The 64-bit key id.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn id(&self) -> Result<u64, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut id = 0u64;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_key_get_key_id(raw, &mut id) })?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn fingerprint(&self) -> Result<Vec<u8>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        collect(FINGERPRINT_CAPACITY, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_key_get_fingerprint(raw, w) }
        })
    }

    /// SHA-256 fingerprints of the primary key and its subkeys.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn sha256_fingerprints(&self) -> Result<Vec<Vec<u8>>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let all = collect(SHA256_LEN << 1, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_key_get_sha256_fingerprints(raw, w) }
        })?;
        Ok(all.chunks(SHA256_LEN).map(<[u8]>::to_vec).collect())
    }

    fn timed_flag(
        &self,
        time: Option<&dyn TimeSource>,
        call: unsafe extern "C" fn(Handle, bool, i64, *mut bool) -> RawError,
    ) -> Result<bool, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let (has_time, at) = time_flag(resolve_time(time));
        let mut out = false;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { call(raw, has_time, at, &mut out) })?;
        Ok(out)
    }

    fn flag(&self, call: unsafe extern "C" fn(Handle, *mut bool) -> RawError) -> Result<bool, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut out = false;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { call(raw, &mut out) })?;
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn can_encrypt(&self, time: Option<&dyn TimeSource>) -> Result<bool, PgpError> {
        self.timed_flag(time, sceau_engine::pgp_key_can_encrypt)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn can_verify(&self, time: Option<&dyn TimeSource>) -> Result<bool, PgpError> {
        self.timed_flag(time, sceau_engine::pgp_key_can_verify)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn is_expired(&self, time: Option<&dyn TimeSource>) -> Result<bool, PgpError> {
        self.timed_flag(time, sceau_engine::pgp_key_is_expired)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn is_revoked(&self) -> Result<bool, PgpError> {
        self.flag(sceau_engine::pgp_key_is_revoked)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn is_private(&self) -> Result<bool, PgpError> {
        self.flag(sceau_engine::pgp_key_is_private)
    }

    /// Release the engine object now instead of on drop.
    pub fn release(&mut self) {
        self.handle.release();
    }
}

// ---------------------------------------------------------------------------
// PgpPrivateKey
// ---------------------------------------------------------------------------

/// A key with secret material.
#[derive(Debug)]
pub struct PgpPrivateKey {
    key: PgpKey,
}

impl PgpPrivateKey {
    /// Import a private key, unlocking it when `passphrase` is not empty.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] for public-only data or a wrong passphrase.
    pub fn import(data: &[u8], passphrase: &[u8], encoding: KeyEncoding) -> Result<Self, PgpError> {
        let key = PgpKey::acquire(|out| {
            // SAFETY: both slices are valid for their lengths.
            unsafe {
                sceau_engine::pgp_private_key_import(
                    data.as_ptr(),
                    data.len(),
                    passphrase.as_ptr(),
                    passphrase.len(),
                    encoding.code(),
                    out,
                )
            }
        })?;
        Ok(Self { key })
    }

    /// Generate a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] for algorithms the engine cannot generate.
    pub fn generate(request: &KeyGenerationRequest<'_>) -> Result<Self, PgpError> {
        let (has_generation_time, generation_time) = time_flag(resolve_time(request.time));
        let has_user_id = !request.name.is_empty() || !request.email.is_empty();
        let params = KeyGenerationParams {
            has_generation_time,
            has_user_id,
            name: request.name.as_ptr(),
            name_len: request.name.len(),
            email: request.email.as_ptr(),
            email_len: request.email.len(),
            generation_time,
            algorithm: request.algorithm.code(),
        };
        tracing::debug!(algorithm = ?request.algorithm, has_user_id, "generating key");
        let key = PgpKey::acquire(|out| {
            // SAFETY: `params` and the strings it points to outlive the call.
            unsafe { sceau_engine::pgp_generate_key(&params, out) }
        })?;
        Ok(Self { key })
    }

    #[must_use]
    pub const fn as_key(&self) -> &PgpKey {
        &self.key
    }

    /// Export including secret material.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn export(&self, encoding: Encoding) -> Result<Vec<u8>, PgpError> {
        self.key.export_with(false, encoding)
    }

    /// The public half as a new key.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn to_public(&self) -> Result<PgpKey, PgpError> {
        let raw = self.key.handle.borrow()?.dangerous_raw();
        PgpKey::acquire(|out| {
            // SAFETY: live handle, valid out-pointer.
            unsafe { sceau_engine::pgp_private_key_get_public_key(raw, out) }
        })
    }

    /// A copy of this key with its secret material locked by `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the key is already locked.
    pub fn lock(&self, passphrase: &[u8]) -> Result<Self, PgpError> {
        let raw = self.key.handle.borrow()?.dangerous_raw();
        let key = PgpKey::acquire(|out| {
            // SAFETY: live handle, `passphrase` valid for its length.
            unsafe { sceau_engine::pgp_key_lock(raw, passphrase.as_ptr(), passphrase.len(), out) }
        })?;
        Ok(Self { key })
    }

    /// An unlocked copy of this key.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] for a wrong passphrase.
    pub fn unlock(&self, passphrase: &[u8]) -> Result<Self, PgpError> {
        let data = zeroize::Zeroizing::new(self.export(Encoding::Binary)?);
        Self::import(&data, passphrase, KeyEncoding::Bytes)
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn is_locked(&self) -> Result<bool, PgpError> {
        self.key.flag(sceau_engine::pgp_key_is_locked)
    }

    pub fn release(&mut self) {
        self.key.release();
    }
}

impl Deref for PgpPrivateKey {
    type Target = PgpKey;

    fn deref(&self) -> &PgpKey {
        &self.key
    }
}

impl AsRef<PgpKey> for PgpPrivateKey {
    fn as_ref(&self) -> &PgpKey {
        &self.key
    }
}
