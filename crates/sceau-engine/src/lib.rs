//! `sceau-engine`: OpenPGP engine call contract for SCEAU.
//!
//! The engine performs every cryptographic operation behind a narrow
//! C-style boundary: flat `#[repr(C)]` parameter records, raw byte
//! pointers with lengths, callback records for streaming, and opaque
//! [`Handle`] values for engine-owned objects.
//!
//! ```text
//!   sceau-pgp (host)                     engine
//!   ───────────────                      ──────
//!   params record  ──── pgp_* call ────▶ parse / seal / sign
//!   RawWriter      ◀─── write cb ─────── output bytes
//!   RawReader      ──── read cb  ──────▶ input bytes
//!   OwnedHandle    ◀─── Handle ───────── key, result, stream…
//! ```
//!
//! Two interchangeable backends:
//! - `native` links `libsceau_native` through an `extern "C"` block.
//! - `sim` (default) runs an in-process engine exposing the same entry
//!   points. Its packet layout is private to this crate.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod abi;

#[cfg(feature = "native")]
mod linked;
#[cfg(feature = "native")]
pub use linked::*;

#[cfg(feature = "sim")]
pub mod sim;
#[cfg(all(feature = "sim", not(feature = "native")))]
pub use sim::exports::*;

#[cfg(not(any(feature = "sim", feature = "native")))]
compile_error!("sceau-engine needs either the `sim` or the `native` feature");

pub use abi::{
    DecryptionParams, EncryptionParams, Handle, KeyGenerationParams, PlaintextResult, RawError,
    RawReader, RawWriter, ReadCallback, SignatureDetailsRecord, SigningParams, SrpAuthParams,
    SrpClientHandshakeBuffers, SrpServerParams, VerificationParams, WriteCallback, INVALID_HANDLE,
    READ_EOF, READ_ERROR, READ_MORE,
};
