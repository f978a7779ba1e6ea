#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Security validation suite for sceau-pgp.
//!
//! - Released handles are rejected by every operation that could use them
//! - Secrets never appear in `Debug` output or error messages

mod security;
