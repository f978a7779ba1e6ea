//! Primitive helpers shared by the simulated engine.

use rand::rngs::OsRng;
use rand::RngCore;
use ring::{aead, digest, hkdf};
use zeroize::Zeroizing;

use super::error::EngineError;

/// AEAD nonce length for AES-GCM.
pub(crate) const NONCE_LEN: usize = 12;

/// Password-derived keys use Argon2id with these costs.
const PASSWORD_M_COST_KIB: u32 = 4096;
const PASSWORD_T_COST: u32 = 1;

pub(crate) fn random_array<const N: usize>() -> Result<[u8; N], EngineError> {
    let mut out = [0u8; N];
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| EngineError::crypto(format!("CSPRNG fill failed: {e}")))?;
    Ok(out)
}

pub(crate) fn random_vec(len: usize) -> Result<Zeroizing<Vec<u8>>, EngineError> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    OsRng
        .try_fill_bytes(&mut out)
        .map_err(|e| EngineError::crypto(format!("CSPRNG fill failed: {e}")))?;
    Ok(out)
}

/// SHA-256 over the concatenation of `parts`.
pub(crate) fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut ctx = digest::Context::new(&digest::SHA256);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

fn aead_algorithm(key: &[u8]) -> Result<&'static aead::Algorithm, EngineError> {
    match key.len() {
        16 => Ok(&aead::AES_128_GCM),
        32 => Ok(&aead::AES_256_GCM),
        n => Err(EngineError::crypto(format!("unsupported AES key length: {n} bytes"))),
    }
}

/// Build a reusable AES-GCM key.
pub(crate) fn aead_key(key: &[u8]) -> Result<aead::LessSafeKey, EngineError> {
    let unbound = aead::UnboundKey::new(aead_algorithm(key)?, key)
        .map_err(|_| EngineError::crypto("failed to create AES-GCM key"))?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Seal `plaintext`, returning `ciphertext || tag`.
pub(crate) fn seal_with(
    key: &aead::LessSafeKey,
    nonce: [u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, EngineError> {
    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        aead::Nonce::assume_unique_for_key(nonce),
        aead::Aad::from(aad),
        &mut in_out,
    )
    .map_err(|_| EngineError::crypto("AES-GCM seal failed"))?;
    Ok(in_out)
}

/// Open `ciphertext || tag`.
pub(crate) fn open_with(
    key: &aead::LessSafeKey,
    nonce: [u8; NONCE_LEN],
    aad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, EngineError> {
    let mut in_out = sealed.to_vec();
    let plain_len = key
        .open_in_place(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::from(aad),
            &mut in_out,
        )
        .map_err(|_| EngineError::crypto("authentication tag mismatch"))?
        .len();
    in_out.truncate(plain_len);
    Ok(in_out)
}

/// One-shot seal under a key used exactly once (zero nonce).
pub(crate) fn seal_once(key: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, EngineError> {
    seal_with(&aead_key(key)?, [0u8; NONCE_LEN], aad, plaintext)
}

/// Counterpart of [`seal_once`].
pub(crate) fn open_once(key: &[u8], aad: &[u8], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, EngineError> {
    open_with(&aead_key(key)?, [0u8; NONCE_LEN], aad, sealed).map(Zeroizing::new)
}

struct OutputLen(usize);

impl hkdf::KeyType for OutputLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// HKDF-SHA256 extract-and-expand into `len` bytes.
pub(crate) fn hkdf_expand(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, EngineError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(ikm);
    let info_parts = [info];
    let okm = prk
        .expand(&info_parts, OutputLen(len))
        .map_err(|_| EngineError::crypto("HKDF expand failed"))?;
    let mut out = Zeroizing::new(vec![0u8; len]);
    okm.fill(&mut out)
        .map_err(|_| EngineError::crypto("HKDF fill failed"))?;
    Ok(out)
}

/// Argon2id stretch of a password into `out.len()` bytes.
pub(crate) fn stretch_password(password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<(), EngineError> {
    let params = argon2::Params::new(PASSWORD_M_COST_KIB, PASSWORD_T_COST, 1, Some(out.len()))
        .map_err(|e| EngineError::crypto(format!("invalid argon2 params: {e}")))?;
    argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
        .hash_password_into(password, salt, out)
        .map_err(|e| EngineError::crypto(format!("argon2id derivation failed: {e}")))
}

/// 256-bit key derived from a password and salt.
pub(crate) fn password_key(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, EngineError> {
    let mut key = Zeroizing::new([0u8; 32]);
    stretch_password(password, salt, key.as_mut())?;
    Ok(key)
}

/// Byte comparison without early exit on the first difference.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_LEN: usize = 16;

    #[test]
    fn seal_open_round_trip() {
        let key = [7u8; 32];
        let sealed = seal_once(&key, b"aad", b"payload").unwrap();
        assert_eq!(sealed.len(), 7 + TAG_LEN);
        let opened = open_once(&key, b"aad", &sealed).unwrap();
        assert_eq!(opened.as_slice(), b"payload");
    }

    #[test]
    fn open_rejects_wrong_aad() {
        let key = [7u8; 16];
        let sealed = seal_once(&key, b"aad", b"payload").unwrap();
        assert!(matches!(
            open_once(&key, b"other", &sealed),
            Err(EngineError::Crypto(_))
        ));
    }

    #[test]
    fn unsupported_key_length() {
        assert!(aead_key(&[0u8; 24]).is_err());
    }

    #[test]
    fn hkdf_fills_requested_length() {
        let out = hkdf_expand(b"ikm", b"salt", b"info", 256).unwrap();
        assert_eq!(out.len(), 256);
    }

    #[test]
    fn constant_time_eq_behaviour() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
