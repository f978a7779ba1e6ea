//! In-process engine behind the same entry points as the native library.
//!
//! Objects live in a process-wide handle table; every entry point runs
//! inside [`boundary::abi_boundary`] so errors and panics come back as
//! owned error records. The packet layout is private to this module and
//! only needs to round-trip with itself.

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) mod armor;
pub(crate) mod boundary;
pub(crate) mod cleartext;
pub(crate) mod context;
pub(crate) mod crypto;
pub(crate) mod decrypt;
pub(crate) mod encrypt;
pub(crate) mod error;
pub mod exports;
pub(crate) mod handles;
pub(crate) mod io;
pub(crate) mod keys;
pub(crate) mod literal;
pub(crate) mod message;
pub(crate) mod packet;
pub(crate) mod seal;
pub(crate) mod session;
pub(crate) mod signature;
pub(crate) mod srp;
pub(crate) mod streams;
pub(crate) mod verify;

/// Current time in unix seconds, used when a call carries no time.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
