//! Parameter builder: one flat engine record per verb.
//!
//! Each `*Call` gathers borrowed handles, raw handle arrays and resolved
//! options for a single engine call. Its `record` method produces the
//! `#[repr(C)]` block, whose pointers stay valid only while the call
//! value is alive.

use serde::{Deserialize, Serialize};

use sceau_engine::abi::{block_type, encoding};
use sceau_engine::{DecryptionParams, EncryptionParams, SigningParams, VerificationParams, INVALID_HANDLE};

use crate::environment::time_flag;
use crate::handle::BorrowedHandle;
use crate::keyring::RawHandles;

/// Output or input encoding of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Encoding {
    #[default]
    Binary,
    AsciiArmor,
}

impl Encoding {
    pub(crate) const fn code(self) -> u8 {
        match self {
            Self::Binary => encoding::BYTES,
            Self::AsciiArmor => encoding::ARMOR,
        }
    }

    #[must_use]
    pub const fn is_armored(self) -> bool {
        matches!(self, Self::AsciiArmor)
    }
}

/// Whether the literal data is compressed before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Compression {
    #[default]
    None,
    Default,
}

/// Whether a detached signature is itself encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionState {
    #[default]
    Plain,
    Encrypted,
}

/// Armor block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmorBlockType {
    #[default]
    Message,
    Signature,
    PrivateKey,
    PublicKey,
}

impl ArmorBlockType {
    pub(crate) const fn code(self) -> u8 {
        match self {
            Self::Message => block_type::MESSAGE,
            Self::Signature => block_type::SIGNATURE,
            Self::PrivateKey => block_type::PRIVATE_KEY,
            Self::PublicKey => block_type::PUBLIC_KEY,
        }
    }

    /// Header label, as in `-----BEGIN PGP <label>-----`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::Signature => "SIGNATURE",
            Self::PrivateKey => "PRIVATE KEY BLOCK",
            Self::PublicKey => "PUBLIC KEY BLOCK",
        }
    }
}

fn raw_or_invalid(handle: Option<BorrowedHandle<'_>>) -> (bool, sceau_engine::Handle) {
    handle.map_or((false, INVALID_HANDLE), |h| (true, h.dangerous_raw()))
}

fn bytes_ptr(bytes: &[u8]) -> *const u8 {
    if bytes.is_empty() {
        std::ptr::null()
    } else {
        bytes.as_ptr()
    }
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

pub(crate) struct EncryptionCall<'r> {
    pub(crate) recipients: RawHandles<'r>,
    pub(crate) signers: RawHandles<'r>,
    pub(crate) session_key: Option<BorrowedHandle<'r>>,
    pub(crate) signing_context: Option<BorrowedHandle<'r>>,
    pub(crate) password: &'r [u8],
    pub(crate) time: Option<i64>,
    pub(crate) detached_signature: Option<EncryptionState>,
    pub(crate) utf8: bool,
    pub(crate) compression: Compression,
}

impl EncryptionCall<'_> {
    pub(crate) fn record(&self) -> EncryptionParams {
        let (has_session_key, session_key) = raw_or_invalid(self.session_key);
        let (has_signing_context, signing_context) = raw_or_invalid(self.signing_context);
        let (has_encryption_time, encryption_time) = time_flag(self.time);
        EncryptionParams {
            encryption_keys_len: self.recipients.len(),
            signing_keys_len: self.signers.len(),
            has_session_key,
            has_signing_context,
            has_encryption_time,
            detached_signature: self.detached_signature.is_some(),
            detached_signature_is_encrypted: self.detached_signature == Some(EncryptionState::Encrypted),
            utf8: self.utf8,
            compress: self.compression == Compression::Default,
            encryption_keys: self.recipients.as_ptr(),
            signing_keys: self.signers.as_ptr(),
            session_key,
            signing_context,
            encryption_time,
            password_len: self.password.len(),
            password: bytes_ptr(self.password),
        }
    }
}

// ---------------------------------------------------------------------------
// Decryption
// ---------------------------------------------------------------------------

/// Detached signature to check while decrypting.
#[derive(Debug, Clone, Copy)]
pub struct DetachedSignature<'r> {
    pub data: &'r [u8],
    pub encoding: Encoding,
    pub state: EncryptionState,
}

impl<'r> DetachedSignature<'r> {
    /// A plain (unencrypted) detached signature.
    #[must_use]
    pub const fn plain(data: &'r [u8], encoding: Encoding) -> Self {
        Self {
            data,
            encoding,
            state: EncryptionState::Plain,
        }
    }

    /// A detached signature that was itself encrypted to the session key.
    #[must_use]
    pub const fn encrypted(data: &'r [u8], encoding: Encoding) -> Self {
        Self {
            data,
            encoding,
            state: EncryptionState::Encrypted,
        }
    }
}

pub(crate) struct DecryptionCall<'r> {
    pub(crate) decryption_keys: RawHandles<'r>,
    pub(crate) verification_keys: RawHandles<'r>,
    pub(crate) session_key: Option<BorrowedHandle<'r>>,
    pub(crate) verification_context: Option<BorrowedHandle<'r>>,
    pub(crate) password: &'r [u8],
    pub(crate) time: Option<i64>,
    pub(crate) utf8: bool,
    pub(crate) detached: Option<DetachedSignature<'r>>,
}

impl DecryptionCall<'_> {
    pub(crate) fn record(&self) -> DecryptionParams {
        let (has_session_key, session_key) = raw_or_invalid(self.session_key);
        let (has_verification_context, verification_context) = raw_or_invalid(self.verification_context);
        let (has_verification_time, verification_time) = time_flag(self.time);
        let detached = self.detached.map_or(&[][..], |d| d.data);
        DecryptionParams {
            decryption_keys_len: self.decryption_keys.len(),
            verification_keys_len: self.verification_keys.len(),
            password_len: self.password.len(),
            detached_signature_len: detached.len(),
            has_session_key,
            has_verification_context,
            has_verification_time,
            utf8: self.utf8,
            detached_signature_is_encrypted: self
                .detached
                .is_some_and(|d| d.state == EncryptionState::Encrypted),
            detached_signature_is_armored: self.detached.is_some_and(|d| d.encoding.is_armored()),
            decryption_keys: self.decryption_keys.as_ptr(),
            verification_keys: self.verification_keys.as_ptr(),
            session_key,
            verification_context,
            verification_time,
            password: bytes_ptr(self.password),
            detached_signature: bytes_ptr(detached),
        }
    }
}

// ---------------------------------------------------------------------------
// Signing and verification
// ---------------------------------------------------------------------------

pub(crate) struct SigningCall<'r> {
    pub(crate) signers: RawHandles<'r>,
    pub(crate) context: Option<BorrowedHandle<'r>>,
    pub(crate) time: Option<i64>,
    pub(crate) utf8: bool,
}

impl SigningCall<'_> {
    pub(crate) fn record(&self) -> SigningParams {
        let (has_signing_context, signing_context) = raw_or_invalid(self.context);
        let (has_signing_time, signing_time) = time_flag(self.time);
        SigningParams {
            signing_keys_len: self.signers.len(),
            has_signing_context,
            has_signing_time,
            utf8: self.utf8,
            signing_keys: self.signers.as_ptr(),
            signing_context,
            signing_time,
        }
    }
}

pub(crate) struct VerificationCall<'r> {
    pub(crate) keys: RawHandles<'r>,
    pub(crate) context: Option<BorrowedHandle<'r>>,
    pub(crate) time: Option<i64>,
    pub(crate) utf8: bool,
}

impl VerificationCall<'_> {
    pub(crate) fn record(&self) -> VerificationParams {
        let (has_verification_context, verification_context) = raw_or_invalid(self.context);
        let (has_verification_time, verification_time) = time_flag(self.time);
        VerificationParams {
            keys_len: self.keys.len(),
            has_verification_time,
            has_verification_context,
            utf8: self.utf8,
            keys: self.keys.as_ptr(),
            verification_context,
            verification_time,
        }
    }
}
