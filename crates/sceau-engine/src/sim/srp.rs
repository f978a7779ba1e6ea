//! Password-authenticated key exchange with SRP-shaped buffers.
//!
//! Stand-in for SRP-6a on X25519: the verifier is the public point of the
//! password-derived scalar, ephemerals are X25519 public points, and both
//! proofs derive from `DH(a, B) || DH(x, B)` on the client and the equal
//! `DH(b, A) || DH(b, V)` on the server. Every buffer is zero-padded to
//! `bit_length / 8` bytes.

use std::sync::Arc;

use data_encoding::BASE64;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::cleartext;
use super::crypto;
use super::error::EngineError;
use super::keys::KeyMaterial;
use super::verify::VerifyConfig;
use crate::abi::status;

const POINT_LEN: usize = 32;
const CLIENT_PROOF_INFO: &[u8] = b"sceau srp client proof";
const SERVER_PROOF_INFO: &[u8] = b"sceau srp server proof";
const MODULUS_KEY_SEED: &[u8] = b"sceau srp modulus signing key";
const MODULUS_KEY_USER_ID: &str = "SRP modulus <srp@sceau.invalid>";

/// Size of the digest produced by [`hash_password`].
pub(crate) const PASSWORD_HASH_LEN: usize = 60;

/// Public key every signed modulus is checked against by default.
pub(crate) fn modulus_verification_key() -> Result<KeyMaterial, EngineError> {
    Ok(KeyMaterial::from_seed(0, MODULUS_KEY_SEED, MODULUS_KEY_USER_ID)?.to_public())
}

/// Argon2id mailbox password hash.
pub(crate) fn hash_password(password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<(), EngineError> {
    if out.len() != PASSWORD_HASH_LEN {
        return Err(EngineError::invalid(format!(
            "password hash buffer must be {PASSWORD_HASH_LEN} bytes"
        )));
    }
    if salt.len() < 8 {
        return Err(EngineError::invalid("password salt must be at least 8 bytes"));
    }
    crypto::stretch_password(password, salt, out)
}

fn buffer_len(bit_length: i32) -> Result<usize, EngineError> {
    let bits = usize::try_from(bit_length)
        .ok()
        .filter(|b| b & 7 == 0)
        .ok_or_else(|| EngineError::invalid(format!("invalid SRP bit length {bit_length}")))?;
    let len = bits >> 3;
    if len < POINT_LEN {
        return Err(EngineError::invalid(format!("SRP bit length {bit_length} is too small")));
    }
    Ok(len)
}

fn check_len(buf: &[u8], bit_length: i32, what: &str) -> Result<(), EngineError> {
    let expected = buffer_len(bit_length)?;
    if buf.len() == expected {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "{what} must be {expected} bytes, got {}",
            buf.len()
        )))
    }
}

fn pad_into(point: &[u8; POINT_LEN], out: &mut [u8]) {
    out.fill(0);
    out[..POINT_LEN].copy_from_slice(point);
}

fn point(buf: &[u8]) -> Result<[u8; POINT_LEN], EngineError> {
    if buf.len() < POINT_LEN || buf[POINT_LEN..].iter().any(|b| *b != 0) {
        return Err(EngineError::invalid("SRP value is not a valid group element"));
    }
    let mut out = [0u8; POINT_LEN];
    out.copy_from_slice(&buf[..POINT_LEN]);
    Ok(out)
}

fn dh(secret: &StaticSecret, public: &[u8; POINT_LEN]) -> Zeroizing<[u8; POINT_LEN]> {
    Zeroizing::new(secret.diffie_hellman(&PublicKey::from(*public)).to_bytes())
}

struct Transcript<'a> {
    first: &'a [u8; POINT_LEN],
    second: &'a [u8; POINT_LEN],
    client_ephemeral: &'a [u8; POINT_LEN],
    server_ephemeral: &'a [u8; POINT_LEN],
    modulus: &'a [u8],
}

impl Transcript<'_> {
    fn proofs(&self, len: usize) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>), EngineError> {
        let shared = crypto::sha256(&[
            self.first,
            self.second,
            self.client_ephemeral,
            self.server_ephemeral,
            self.modulus,
        ]);
        let client = crypto::hkdf_expand(&shared, &[], CLIENT_PROOF_INFO, len)?;
        let server = crypto::hkdf_expand(&shared, &client, SERVER_PROOF_INFO, len)?;
        Ok((client, server))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client state: password-derived scalar bound to one modulus.
pub(crate) struct SrpAuth {
    modulus: Vec<u8>,
    scalar: StaticSecret,
}

impl SrpAuth {
    /// Fails unless `signed_modulus` carries a valid signature by
    /// `verification_key`.
    pub(crate) fn new(
        username: &str,
        password: &[u8],
        salt: &[u8],
        signed_modulus: &[u8],
        verification_key: Arc<KeyMaterial>,
    ) -> Result<Self, EngineError> {
        let (text, signatures) = cleartext::parse(signed_modulus)?;
        let config = VerifyConfig {
            keys: vec![verification_key],
            ..VerifyConfig::default()
        };
        let verification = config.evaluate(&crypto::sha256(&[&text]), &signatures);
        if verification.status != status::OK {
            return Err(EngineError::crypto(format!(
                "modulus signature verification failed: {}",
                verification.message.unwrap_or_default()
            )));
        }
        let encoded: Vec<u8> = text.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
        let modulus = BASE64
            .decode(&encoded)
            .map_err(|e| EngineError::malformed(format!("modulus is not base64: {e}")))?;
        if modulus.is_empty() {
            return Err(EngineError::malformed("modulus is empty"));
        }

        let salt_input = crypto::sha256(&[salt, username.as_bytes(), &modulus]);
        let mut x = Zeroizing::new([0u8; POINT_LEN]);
        crypto::stretch_password(password, &salt_input, x.as_mut())?;
        Ok(Self {
            modulus,
            scalar: StaticSecret::from(*x),
        })
    }

    pub(crate) fn derive_verifier(&self, out: &mut [u8], bit_length: i32) -> Result<(), EngineError> {
        check_len(out, bit_length, "verifier buffer")?;
        pad_into(PublicKey::from(&self.scalar).as_bytes(), out);
        Ok(())
    }

    /// Compute the client ephemeral and proof for `server_ephemeral`.
    pub(crate) fn handshake(
        &self,
        server_ephemeral: &[u8],
        proof_out: &mut [u8],
        ephemeral_out: &mut [u8],
        bit_length: i32,
    ) -> Result<SrpClientHandshake, EngineError> {
        check_len(server_ephemeral, bit_length, "server ephemeral")?;
        check_len(proof_out, bit_length, "proof buffer")?;
        check_len(ephemeral_out, bit_length, "ephemeral buffer")?;
        let server_point = point(server_ephemeral)?;

        let ephemeral = StaticSecret::from(crypto::random_array::<POINT_LEN>()?);
        let client_point = PublicKey::from(&ephemeral).to_bytes();
        let first = dh(&ephemeral, &server_point);
        let second = dh(&self.scalar, &server_point);
        let (client_proof, server_proof) = Transcript {
            first: &first,
            second: &second,
            client_ephemeral: &client_point,
            server_ephemeral: &server_point,
            modulus: &self.modulus,
        }
        .proofs(proof_out.len())?;

        proof_out.copy_from_slice(&client_proof);
        pad_into(&client_point, ephemeral_out);
        Ok(SrpClientHandshake {
            expected_server_proof: server_proof,
        })
    }
}

pub(crate) struct SrpClientHandshake {
    expected_server_proof: Zeroizing<Vec<u8>>,
}

impl SrpClientHandshake {
    pub(crate) fn verify_server_proof(&self, proof: &[u8]) -> bool {
        crypto::constant_time_eq(&self.expected_server_proof, proof)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub(crate) struct SrpServer {
    modulus: Vec<u8>,
    verifier: [u8; POINT_LEN],
    ephemeral: StaticSecret,
    ephemeral_point: [u8; POINT_LEN],
    len: usize,
}

impl SrpServer {
    /// `secret` fixes the server ephemeral for reproducible runs.
    pub(crate) fn new(
        modulus: &[u8],
        verifier: &[u8],
        bit_length: i32,
        secret: Option<&[u8]>,
        ephemeral_out: &mut [u8],
    ) -> Result<Self, EngineError> {
        check_len(verifier, bit_length, "verifier")?;
        check_len(ephemeral_out, bit_length, "ephemeral buffer")?;
        if modulus.is_empty() {
            return Err(EngineError::invalid("modulus is empty"));
        }
        let seed: [u8; POINT_LEN] = match secret {
            Some(s) => s
                .try_into()
                .map_err(|_| EngineError::invalid("server secret must be 32 bytes"))?,
            None => crypto::random_array()?,
        };
        let ephemeral = StaticSecret::from(seed);
        let ephemeral_point = PublicKey::from(&ephemeral).to_bytes();
        pad_into(&ephemeral_point, ephemeral_out);
        Ok(Self {
            modulus: modulus.to_vec(),
            verifier: point(verifier)?,
            ephemeral,
            ephemeral_point,
            len: ephemeral_out.len(),
        })
    }

    /// Check the client proof and produce the server proof.
    pub(crate) fn exchange(
        &self,
        client_proof: &[u8],
        client_ephemeral: &[u8],
        server_proof_out: &mut [u8],
    ) -> Result<(), EngineError> {
        if client_ephemeral.len() != self.len || server_proof_out.len() != self.len {
            return Err(EngineError::invalid(format!("SRP buffers must be {} bytes", self.len)));
        }
        let client_point = point(client_ephemeral)?;
        let first = dh(&self.ephemeral, &client_point);
        let second = dh(&self.ephemeral, &self.verifier);
        let (expected_client, server_proof) = Transcript {
            first: &first,
            second: &second,
            client_ephemeral: &client_point,
            server_ephemeral: &self.ephemeral_point,
            modulus: &self.modulus,
        }
        .proofs(self.len)?;
        if !crypto::constant_time_eq(&expected_client, client_proof) {
            return Err(EngineError::crypto("client proof is invalid"));
        }
        server_proof_out.copy_from_slice(&server_proof);
        Ok(())
    }
}
