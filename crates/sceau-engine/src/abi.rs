//! Flat records and codes exchanged across the engine boundary.
//!
//! Every record is `#[repr(C)]` and built fresh by the caller for a single
//! call. Pointers inside a record are borrowed for that call only; the
//! engine copies whatever it needs to keep.

use std::ffi::{c_int, c_void};

/// Opaque engine object reference. `0` is never a live handle.
pub type Handle = usize;

/// The value no allocation ever returns.
pub const INVALID_HANDLE: Handle = 0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Result record returned by every fallible entry point.
///
/// A null `message` means success. Otherwise `message` points to
/// `message_len` bytes of UTF-8 owned by the engine, which the caller must
/// release with `pgp_free` once it has copied them.
#[repr(C)]
#[derive(Debug)]
#[must_use = "engine errors carry an owned buffer that must be freed"]
pub struct RawError {
    pub message: *mut u8,
    pub message_len: c_int,
}

impl RawError {
    /// The success value.
    pub const OK: Self = Self {
        message: std::ptr::null_mut(),
        message_len: 0,
    };

    /// Returns `true` when the record carries no message.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.message.is_null()
    }
}

// ---------------------------------------------------------------------------
// Streaming callbacks
// ---------------------------------------------------------------------------

/// Push callback: accept `len` bytes at `data`.
///
/// Returns the number of bytes accepted, or `-1` on failure.
pub type WriteCallback = unsafe extern "C" fn(ctx: *mut c_void, data: *const u8, len: usize) -> i64;

/// Pull callback: fill up to `len` bytes at `buf`.
///
/// Returns the number of bytes produced and stores one of
/// [`READ_MORE`], [`READ_EOF`] or [`READ_ERROR`] into `status`.
pub type ReadCallback =
    unsafe extern "C" fn(ctx: *mut c_void, buf: *mut u8, len: usize, status: *mut c_int) -> i64;

/// More data may follow.
pub const READ_MORE: c_int = 0;
/// The source is exhausted.
pub const READ_EOF: c_int = 1;
/// The source failed; the engine aborts the operation.
pub const READ_ERROR: c_int = -1;

/// Host sink reachable from the engine.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawWriter {
    pub ctx: *mut c_void,
    pub write: WriteCallback,
}

/// Host source reachable from the engine.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawReader {
    pub ctx: *mut c_void,
    pub read: ReadCallback,
}

/// In/out record for one-shot operations that produce plaintext and,
/// possibly, a verification result.
#[repr(C)]
#[derive(Debug)]
pub struct PlaintextResult {
    pub has_verification_result: bool,
    pub verification_result: Handle,
    pub writer: RawWriter,
}

// ---------------------------------------------------------------------------
// Operation parameters
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug)]
pub struct EncryptionParams {
    pub encryption_keys_len: usize,
    pub signing_keys_len: usize,
    pub has_session_key: bool,
    pub has_signing_context: bool,
    pub has_encryption_time: bool,
    pub detached_signature: bool,
    pub detached_signature_is_encrypted: bool,
    pub utf8: bool,
    pub compress: bool,
    pub encryption_keys: *const Handle,
    pub signing_keys: *const Handle,
    pub session_key: Handle,
    pub signing_context: Handle,
    pub encryption_time: i64,
    pub password_len: usize,
    pub password: *const u8,
}

#[repr(C)]
#[derive(Debug)]
pub struct DecryptionParams {
    pub decryption_keys_len: usize,
    pub verification_keys_len: usize,
    pub password_len: usize,
    pub detached_signature_len: usize,
    pub has_session_key: bool,
    pub has_verification_context: bool,
    pub has_verification_time: bool,
    pub utf8: bool,
    pub detached_signature_is_encrypted: bool,
    pub detached_signature_is_armored: bool,
    pub decryption_keys: *const Handle,
    pub verification_keys: *const Handle,
    pub session_key: Handle,
    pub verification_context: Handle,
    pub verification_time: i64,
    pub password: *const u8,
    pub detached_signature: *const u8,
}

#[repr(C)]
#[derive(Debug)]
pub struct SigningParams {
    pub signing_keys_len: usize,
    pub has_signing_context: bool,
    pub has_signing_time: bool,
    pub utf8: bool,
    pub signing_keys: *const Handle,
    pub signing_context: Handle,
    pub signing_time: i64,
}

#[repr(C)]
#[derive(Debug)]
pub struct VerificationParams {
    pub keys_len: usize,
    pub has_verification_time: bool,
    pub has_verification_context: bool,
    pub utf8: bool,
    pub keys: *const Handle,
    pub verification_context: Handle,
    pub verification_time: i64,
}

#[repr(C)]
#[derive(Debug)]
pub struct KeyGenerationParams {
    pub has_generation_time: bool,
    pub has_user_id: bool,
    pub name: *const u8,
    pub name_len: usize,
    pub email: *const u8,
    pub email_len: usize,
    pub generation_time: i64,
    pub algorithm: u8,
}

/// Per-signature entry of a verification result.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureDetailsRecord {
    pub key_id: u64,
    pub creation_time: i64,
    pub status: c_int,
}

// ---------------------------------------------------------------------------
// SRP
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug)]
pub struct SrpAuthParams {
    pub username: *const u8,
    pub username_len: usize,
    pub password: *const u8,
    pub password_len: usize,
    pub salt: *const u8,
    pub salt_len: usize,
    pub signed_modulus: *const u8,
    pub signed_modulus_len: usize,
}

#[repr(C)]
#[derive(Debug)]
pub struct SrpClientHandshakeBuffers {
    pub proof: *mut u8,
    pub proof_len: usize,
    pub ephemeral: *mut u8,
    pub ephemeral_len: usize,
}

#[repr(C)]
#[derive(Debug)]
pub struct SrpServerParams {
    pub modulus: *const u8,
    pub modulus_len: usize,
    pub verifier: *const u8,
    pub verifier_len: usize,
    pub bit_length: c_int,
}

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

/// Output encodings.
pub mod encoding {
    pub const BYTES: u8 = 0;
    pub const ARMOR: u8 = 1;
}

/// Input encodings accepted by key import.
pub mod key_encoding {
    pub const AUTO: u8 = 0;
    pub const BYTES: u8 = 1;
    pub const ARMOR: u8 = 2;
}

/// Armor block types.
pub mod block_type {
    pub const MESSAGE: u8 = 0;
    pub const SIGNATURE: u8 = 1;
    pub const PRIVATE_KEY: u8 = 2;
    pub const PUBLIC_KEY: u8 = 3;
}

/// Verification statuses.
pub mod status {
    use std::ffi::c_int;

    pub const OK: c_int = 0;
    pub const NOT_SIGNED: c_int = 1;
    pub const NO_VERIFIER: c_int = 2;
    pub const FAILED: c_int = 3;
    pub const BAD_CONTEXT: c_int = 4;
}

/// Symmetric cipher identifiers (OpenPGP numbering).
pub mod cipher {
    pub const AES128: u8 = 7;
    pub const AES192: u8 = 8;
    pub const AES256: u8 = 9;
}

/// Key generation algorithm selectors.
pub mod algorithm {
    pub const DEFAULT: u8 = 0;
    pub const RSA: u8 = 1;
    pub const ECC: u8 = 2;
}
