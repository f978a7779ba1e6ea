//! `sceau-pgp`: OpenPGP binding layer for SCEAU.
//!
//! Every cryptographic operation runs inside the engine behind
//! `sceau-engine`'s call contract. This crate owns the host side of that
//! boundary:
//! - engine handles, released exactly once ([`handle`]),
//! - the callback bridge between caller streams and the engine
//!   ([`bridge`], [`streams`]),
//! - one flat parameter record per call ([`params`], [`secrets`]),
//! - the operation façade: [`PgpEncrypter`], [`PgpDecrypter`],
//!   [`PgpSigner`], [`PgpVerifier`] and the [`armor`] functions, each in a
//!   buffer, a writer and a stream shape.
//!
//! Keys, session keys, message inspection, signature contexts and SRP
//! authentication wrap the remaining engine objects.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod handle;

pub mod bridge;
pub mod environment;
pub mod estimate;
pub mod params;
pub mod streams;

pub mod context;
pub mod key;
pub mod keyring;
pub mod message;
pub mod secrets;
pub mod session_key;

pub mod armor;
pub mod decrypt;
pub mod encrypt;
pub mod sign;
pub mod verify;

pub mod async_io;
pub mod config;
pub mod srp;

pub use async_io::{drain_async, CancelHandle, CancelSignal};
pub use bridge::{SliceWriter, DEFAULT_CHUNK_SIZE};
pub use config::PgpConfig;
pub use context::{ContextRequirement, SigningContext, VerificationContext};
pub use decrypt::PgpDecrypter;
pub use encrypt::PgpEncrypter;
pub use environment::{
    clear_default_time_override, set_default_time_override, FixedTime, OffsetTime, SystemClock, TimeSource,
};
pub use error::PgpError;
pub use handle::HandleKind;
pub use key::{KeyEncoding, KeyGenerationAlgorithm, KeyGenerationRequest, PgpKey, PgpPrivateKey};
pub use keyring::{PgpKeyRing, PgpPrivateKeyRing};
pub use message::PgpMessage;
pub use params::{ArmorBlockType, Compression, DetachedSignature, Encoding, EncryptionState};
pub use secrets::{DecryptionSecrets, EncryptionSecrets};
pub use session_key::{PgpSessionKey, SymmetricCipher};
pub use sign::{PgpSigner, SigningMode};
pub use srp::{SrpClient, SrpClientHandshake, SrpServer};
pub use streams::{EncryptedOutput, EncryptingStream, PullStream, PushStream};
pub use verify::{PgpVerifier, SignatureDetails, VerificationResult, VerificationStatus};
