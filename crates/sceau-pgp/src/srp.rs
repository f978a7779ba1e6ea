//! SRP password authentication.
//!
//! The client proves knowledge of a password to a server that only stores
//! a verifier. Every group value and proof is `bit_length / 8` bytes.

use std::ffi::c_int;
use std::fmt;

use sceau_engine::{SrpAuthParams, SrpClientHandshakeBuffers, SrpServerParams};
use zeroize::Zeroizing;

use crate::error::{check, PgpError};
use crate::handle::{HandleKind, OwnedHandle};
use crate::key::PgpKey;

/// Length of a mailbox password hash.
pub const MAILBOX_PASSWORD_HASH_LEN: usize = 60;

/// Length of a fixed server secret.
pub const SERVER_SECRET_LEN: usize = 32;

fn buffer_len(bit_length: c_int) -> Result<usize, PgpError> {
    usize::try_from(bit_length)
        .ok()
        .filter(|bits| *bits > 0 && bits.trailing_zeros() >= 3)
        .map(|bits| bits >> 3)
        .ok_or_else(|| PgpError::invalid_operation(format!("invalid SRP bit length {bit_length}")))
}

/// The key modulus signatures are checked against.
///
/// # Errors
///
/// Returns [`PgpError::Pgp`] if the engine has no modulus key.
pub fn modulus_verification_key() -> Result<PgpKey, PgpError> {
    PgpKey::acquire(|out| {
        // SAFETY: valid out-pointer.
        unsafe { sceau_engine::srp_get_modulus_verification_key(out) }
    })
}

/// Hash a mailbox password with `salt`.
///
/// # Errors
///
/// Returns [`PgpError::Pgp`] when the salt is too short.
pub fn hash_mailbox_password(
    password: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<[u8; MAILBOX_PASSWORD_HASH_LEN]>, PgpError> {
    let mut digest = Zeroizing::new([0u8; MAILBOX_PASSWORD_HASH_LEN]);
    // SAFETY: every slice is valid for its length; `digest` is writable.
    check(unsafe {
        sceau_engine::srp_hash_password(
            password.as_ptr(),
            password.len(),
            salt.as_ptr(),
            salt.len(),
            digest.as_mut_ptr(),
            digest.len(),
        )
    })?;
    Ok(digest)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client side, bound to one user and one signed modulus.
pub struct SrpClient {
    handle: OwnedHandle,
}

impl SrpClient {
    /// Check `signed_modulus` against `verification_key` and derive the
    /// password secret.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the modulus signature does not verify
    /// or the modulus is malformed.
    pub fn new(
        username: &str,
        password: &[u8],
        salt: &[u8],
        signed_modulus: &[u8],
        verification_key: &PgpKey,
    ) -> Result<Self, PgpError> {
        let key = verification_key.handle().borrow()?;
        let params = SrpAuthParams {
            username: username.as_ptr(),
            username_len: username.len(),
            password: password.as_ptr(),
            password_len: password.len(),
            salt: salt.as_ptr(),
            salt_len: salt.len(),
            signed_modulus: signed_modulus.as_ptr(),
            signed_modulus_len: signed_modulus.len(),
        };
        tracing::debug!(username, "creating SRP client");
        let handle = OwnedHandle::acquire(HandleKind::SrpAuth, |out| {
            // SAFETY: `params` points at slices that outlive the call.
            unsafe { sceau_engine::srp_auth_create(&params, key.dangerous_raw(), out) }
        })?;
        Ok(Self { handle })
    }

    /// The verifier a server stores for this user.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidOperation`] for a bit length that is not a
    /// positive multiple of 8, [`PgpError::Pgp`] if the engine rejects it.
    pub fn derive_verifier(&self, bit_length: c_int) -> Result<Vec<u8>, PgpError> {
        let mut verifier = vec![0u8; buffer_len(bit_length)?];
        let raw = self.handle.borrow()?.dangerous_raw();
        // SAFETY: live handle; `verifier` is writable for its length.
        check(unsafe { sceau_engine::srp_auth_derive_verifier(raw, verifier.as_mut_ptr(), verifier.len(), bit_length) })?;
        Ok(verifier)
    }

    /// Answer the server's ephemeral with a proof and a client ephemeral.
    ///
    /// # Errors
    ///
    /// As [`Self::derive_verifier`]; also fails when `server_ephemeral` is
    /// not `bit_length / 8` bytes.
    pub fn compute_handshake(
        &self,
        server_ephemeral: &[u8],
        bit_length: c_int,
    ) -> Result<SrpClientHandshake, PgpError> {
        let len = buffer_len(bit_length)?;
        let mut proof = vec![0u8; len];
        let mut ephemeral = vec![0u8; len];
        let buffers = SrpClientHandshakeBuffers {
            proof: proof.as_mut_ptr(),
            proof_len: proof.len(),
            ephemeral: ephemeral.as_mut_ptr(),
            ephemeral_len: ephemeral.len(),
        };
        let raw = self.handle.borrow()?.dangerous_raw();
        tracing::debug!(bit_length, "computing SRP client handshake");
        let handle = OwnedHandle::acquire(HandleKind::SrpClientHandshake, |out| {
            // SAFETY: live handle; both output buffers are writable, disjoint
            // and outlive the call.
            unsafe {
                sceau_engine::srp_client_handshake_compute(
                    raw,
                    server_ephemeral.as_ptr(),
                    server_ephemeral.len(),
                    &buffers,
                    bit_length,
                    out,
                )
            }
        })?;
        Ok(SrpClientHandshake {
            proof,
            ephemeral,
            handle,
        })
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}

impl fmt::Debug for SrpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrpClient").finish_non_exhaustive()
    }
}

/// Client answer to a server challenge.
pub struct SrpClientHandshake {
    /// Sent to the server.
    pub proof: Vec<u8>,
    /// Sent to the server.
    pub ephemeral: Vec<u8>,
    handle: OwnedHandle,
}

impl SrpClientHandshake {
    /// Whether the server proved it knows the verifier.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn verify_server_proof(&self, server_proof: &[u8]) -> Result<bool, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut ok = false;
        // SAFETY: live handle; `server_proof` is valid for its length.
        check(unsafe {
            sceau_engine::srp_client_handshake_verify_proof(raw, server_proof.as_ptr(), server_proof.len(), &mut ok)
        })?;
        Ok(ok)
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}

impl fmt::Debug for SrpClientHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrpClientHandshake")
            .field("proof_len", &self.proof.len())
            .field("ephemeral_len", &self.ephemeral.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Server side of one login attempt.
pub struct SrpServer {
    handle: OwnedHandle,
}

impl SrpServer {
    /// Start a login for the user owning `verifier`, returning the server
    /// ephemeral to send to the client.
    ///
    /// `secret` fixes the server ephemeral; `None` draws a random one.
    ///
    /// # Errors
    ///
    /// As [`SrpClient::derive_verifier`]; also fails when `verifier` has the
    /// wrong length.
    pub fn new(
        modulus: &[u8],
        verifier: &[u8],
        bit_length: c_int,
        secret: Option<&[u8; SERVER_SECRET_LEN]>,
    ) -> Result<(Self, Vec<u8>), PgpError> {
        let mut ephemeral = vec![0u8; buffer_len(bit_length)?];
        let params = SrpServerParams {
            modulus: modulus.as_ptr(),
            modulus_len: modulus.len(),
            verifier: verifier.as_ptr(),
            verifier_len: verifier.len(),
            bit_length,
        };
        let (secret_ptr, secret_len) = secret.map_or((std::ptr::null(), 0), |s| (s.as_ptr(), s.len()));
        tracing::debug!(bit_length, fixed_secret = secret.is_some(), "creating SRP server");
        let handle = OwnedHandle::acquire(HandleKind::SrpServer, |out| {
            // SAFETY: every pointer is valid for its length and outlives the
            // call.
            unsafe {
                sceau_engine::srp_server_generate_handshake(
                    &params,
                    secret_ptr,
                    secret_len,
                    ephemeral.as_mut_ptr(),
                    ephemeral.len(),
                    out,
                )
            }
        })?;
        Ok((Self { handle }, ephemeral))
    }

    /// Check the client proof and produce the server proof.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the client proof is wrong.
    pub fn compute_exchange(&self, client_proof: &[u8], client_ephemeral: &[u8]) -> Result<Vec<u8>, PgpError> {
        let mut server_proof = vec![0u8; client_ephemeral.len()];
        let raw = self.handle.borrow()?.dangerous_raw();
        // SAFETY: live handle; every slice is valid for its length.
        check(unsafe {
            sceau_engine::srp_server_compute_exchange(
                raw,
                client_proof.as_ptr(),
                client_proof.len(),
                client_ephemeral.as_ptr(),
                client_ephemeral.len(),
                server_proof.as_mut_ptr(),
                server_proof.len(),
            )
        })?;
        Ok(server_proof)
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}

impl fmt::Debug for SrpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrpServer").finish_non_exhaustive()
    }
}
