//! Simulated OpenPGP keys: Ed25519 signing plus X25519 encryption.

use ring::signature::{self, Ed25519KeyPair, KeyPair};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::crypto;
use super::error::EngineError;
use super::packet::{self, push_short_bytes, tag, Fields};
use crate::abi::algorithm;

/// Key format version reported to callers.
pub(crate) const KEY_VERSION: u8 = 4;

/// Fingerprint length in bytes.
pub(crate) const FINGERPRINT_LEN: usize = 20;

const SALT_LEN: usize = 16;
const SECRET_LEN: usize = 64;
const LOCK_AAD: &[u8] = b"sceau key lock";

#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SecretParts {
    signing_seed: [u8; 32],
    encryption_secret: [u8; 32],
}

impl SecretParts {
    fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(SECRET_LEN));
        out.extend_from_slice(&self.signing_seed);
        out.extend_from_slice(&self.encryption_secret);
        out
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        if bytes.len() != SECRET_LEN {
            return Err(EngineError::malformed("secret key material has the wrong length"));
        }
        let mut parts = Self {
            signing_seed: [0u8; 32],
            encryption_secret: [0u8; 32],
        };
        parts.signing_seed.copy_from_slice(&bytes[..32]);
        parts.encryption_secret.copy_from_slice(&bytes[32..]);
        Ok(parts)
    }
}

pub(crate) enum Secret {
    None,
    Unlocked(SecretParts),
    Locked { salt: [u8; SALT_LEN], sealed: Vec<u8> },
}

/// One key as held by the engine. Immutable once registered.
pub(crate) struct KeyMaterial {
    pub(crate) version: u8,
    pub(crate) created: i64,
    pub(crate) expires: Option<i64>,
    pub(crate) revoked: bool,
    pub(crate) algorithm: u8,
    pub(crate) user_id: Option<String>,
    signing_public: [u8; 32],
    encryption_public: [u8; 32],
    secret: Secret,
}

impl KeyMaterial {
    /// Generate a fresh key created at `created`.
    pub(crate) fn generate(
        created: i64,
        algorithm: u8,
        user_id: Option<String>,
    ) -> Result<Self, EngineError> {
        match algorithm {
            algorithm::DEFAULT | algorithm::ECC => {}
            algorithm::RSA => {
                return Err(EngineError::key("RSA key generation is not supported by this engine"))
            }
            other => return Err(EngineError::invalid(format!("unknown key algorithm {other}"))),
        }
        let parts = SecretParts {
            signing_seed: crypto::random_array()?,
            encryption_secret: crypto::random_array()?,
        };
        Self::from_parts(created, algorithm::ECC, user_id, parts)
    }

    /// Deterministic key from a seed, for built-in keys.
    pub(crate) fn from_seed(created: i64, seed: &[u8], user_id: &str) -> Result<Self, EngineError> {
        let parts = SecretParts {
            signing_seed: crypto::sha256(&[b"signing", seed]),
            encryption_secret: crypto::sha256(&[b"encryption", seed]),
        };
        Self::from_parts(created, algorithm::ECC, Some(user_id.to_owned()), parts)
    }

    fn from_parts(
        created: i64,
        algorithm: u8,
        user_id: Option<String>,
        parts: SecretParts,
    ) -> Result<Self, EngineError> {
        let pair = Ed25519KeyPair::from_seed_unchecked(&parts.signing_seed)
            .map_err(|_| EngineError::key("invalid Ed25519 seed"))?;
        let mut signing_public = [0u8; 32];
        signing_public.copy_from_slice(pair.public_key().as_ref());
        let encryption_public =
            PublicKey::from(&StaticSecret::from(parts.encryption_secret)).to_bytes();
        Ok(Self {
            version: KEY_VERSION,
            created,
            expires: None,
            revoked: false,
            algorithm,
            user_id,
            signing_public,
            encryption_public,
            secret: Secret::Unlocked(parts),
        })
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    fn public_body(&self) -> Result<Vec<u8>, EngineError> {
        let mut body = Vec::with_capacity(128);
        body.push(self.version);
        body.extend_from_slice(&self.created.to_be_bytes());
        body.extend_from_slice(&self.expires.unwrap_or(0).to_be_bytes());
        body.push(u8::from(self.revoked));
        body.push(self.algorithm);
        body.extend_from_slice(&self.signing_public);
        body.extend_from_slice(&self.encryption_public);
        push_short_bytes(&mut body, self.user_id.as_deref().unwrap_or("").as_bytes())?;
        Ok(body)
    }

    pub(crate) fn fingerprint(&self) -> [u8; FINGERPRINT_LEN] {
        let digest = crypto::sha256(&[
            b"sceau fingerprint",
            &[self.version],
            &self.created.to_be_bytes(),
            &self.signing_public,
            &self.encryption_public,
        ]);
        let mut out = [0u8; FINGERPRINT_LEN];
        out.copy_from_slice(&digest[..FINGERPRINT_LEN]);
        out
    }

    /// Low 64 bits of the fingerprint.
    pub(crate) fn key_id(&self) -> u64 {
        let fp = self.fingerprint();
        let mut id = [0u8; 8];
        id.copy_from_slice(&fp[FINGERPRINT_LEN.saturating_sub(8)..]);
        u64::from_be_bytes(id)
    }

    /// SHA-256 fingerprints of the primary (signing) and encryption subkey.
    pub(crate) fn sha256_fingerprints(&self) -> [[u8; 32]; 2] {
        [
            crypto::sha256(&[b"primary", &self.signing_public]),
            crypto::sha256(&[b"subkey", &self.encryption_public]),
        ]
    }

    pub(crate) const fn encryption_public(&self) -> &[u8; 32] {
        &self.encryption_public
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub(crate) const fn is_private(&self) -> bool {
        !matches!(self.secret, Secret::None)
    }

    pub(crate) const fn is_locked(&self) -> bool {
        matches!(self.secret, Secret::Locked { .. })
    }

    pub(crate) fn is_expired_at(&self, at: i64) -> bool {
        at < self.created || self.expires.is_some_and(|e| e <= at)
    }

    /// Fails unless the key may be used at `at`.
    pub(crate) fn check_usable_at(&self, at: i64) -> Result<(), EngineError> {
        if self.revoked {
            return Err(EngineError::key(format!("key {:016X} is revoked", self.key_id())));
        }
        if at < self.created {
            return Err(EngineError::key(format!(
                "key {:016X} is not valid before its creation time",
                self.key_id()
            )));
        }
        if self.expires.is_some_and(|e| e <= at) {
            return Err(EngineError::key(format!("key {:016X} has expired", self.key_id())));
        }
        Ok(())
    }

    fn unlocked(&self) -> Result<&SecretParts, EngineError> {
        match &self.secret {
            Secret::Unlocked(parts) => Ok(parts),
            Secret::Locked { .. } => Err(EngineError::key(format!(
                "key {:016X} is locked",
                self.key_id()
            ))),
            Secret::None => Err(EngineError::key(format!(
                "key {:016X} has no secret material",
                self.key_id()
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub(crate) fn sign(&self, message: &[u8]) -> Result<[u8; 64], EngineError> {
        let parts = self.unlocked()?;
        let pair = Ed25519KeyPair::from_seed_unchecked(&parts.signing_seed)
            .map_err(|_| EngineError::key("invalid Ed25519 seed"))?;
        let mut out = [0u8; 64];
        out.copy_from_slice(pair.sign(message).as_ref());
        Ok(out)
    }

    pub(crate) fn verify(&self, message: &[u8], sig: &[u8]) -> bool {
        signature::UnparsedPublicKey::new(&signature::ED25519, &self.signing_public)
            .verify(message, sig)
            .is_ok()
    }

    /// X25519 agreement with a peer public key.
    pub(crate) fn agree(&self, peer_public: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>, EngineError> {
        let parts = self.unlocked()?;
        let secret = StaticSecret::from(parts.encryption_secret);
        Ok(Zeroizing::new(
            secret.diffie_hellman(&PublicKey::from(*peer_public)).to_bytes(),
        ))
    }

    pub(crate) fn to_public(&self) -> Self {
        Self {
            version: self.version,
            created: self.created,
            expires: self.expires,
            revoked: self.revoked,
            algorithm: self.algorithm,
            user_id: self.user_id.clone(),
            signing_public: self.signing_public,
            encryption_public: self.encryption_public,
            secret: Secret::None,
        }
    }

    /// New key whose secret material is sealed under `passphrase`.
    pub(crate) fn lock(&self, passphrase: &[u8]) -> Result<Self, EngineError> {
        if passphrase.is_empty() {
            return Err(EngineError::invalid("passphrase must not be empty"));
        }
        let parts = self.unlocked()?;
        let salt = crypto::random_array::<SALT_LEN>()?;
        let key = crypto::password_key(passphrase, &salt)?;
        let sealed = crypto::seal_once(key.as_ref(), LOCK_AAD, &parts.to_bytes())?;
        let mut locked = self.to_public();
        locked.secret = Secret::Locked { salt, sealed };
        Ok(locked)
    }

    /// New key with secret material usable for signing and decryption.
    pub(crate) fn unlock(&self, passphrase: &[u8]) -> Result<Self, EngineError> {
        let parts = match &self.secret {
            Secret::Unlocked(parts) => SecretParts::from_bytes(&parts.to_bytes())?,
            Secret::Locked { salt, sealed } => {
                let key = crypto::password_key(passphrase, salt)?;
                let plain = crypto::open_once(key.as_ref(), LOCK_AAD, sealed)
                    .map_err(|_| EngineError::key("incorrect passphrase"))?;
                SecretParts::from_bytes(&plain)?
            }
            Secret::None => return Err(EngineError::key("not a private key")),
        };
        let mut unlocked = self.to_public();
        unlocked.secret = Secret::Unlocked(parts);
        Ok(unlocked)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    pub(crate) fn serialize(&self, force_public: bool) -> Result<Vec<u8>, EngineError> {
        let mut body = self.public_body()?;
        if force_public || !self.is_private() {
            return packet::encode_packet(tag::PUBLIC_KEY, &body);
        }
        match &self.secret {
            Secret::Unlocked(parts) => {
                body.push(0);
                body.extend_from_slice(&parts.to_bytes());
            }
            Secret::Locked { salt, sealed } => {
                body.push(1);
                body.extend_from_slice(salt);
                body.extend_from_slice(sealed);
            }
            Secret::None => {}
        }
        let out = packet::encode_packet(tag::SECRET_KEY, &body);
        body.zeroize();
        out
    }

    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, EngineError> {
        let mut input = bytes;
        let (packet_tag, body) = packet::read_packet(&mut input)?
            .ok_or_else(|| EngineError::malformed("empty key data"))?;
        if !input.is_empty() {
            return Err(EngineError::malformed("trailing data after key packet"));
        }
        let body = Zeroizing::new(body);
        let mut f = Fields::new(&body);
        let version = f.u8()?;
        if version != KEY_VERSION {
            return Err(EngineError::malformed(format!("unsupported key version {version}")));
        }
        let created = f.i64()?;
        let expires = Some(f.i64()?).filter(|e| *e != 0);
        let revoked = f.u8()? != 0;
        let algorithm = f.u8()?;
        let signing_public = f.array()?;
        let encryption_public = f.array()?;
        let user_id = std::str::from_utf8(f.short_bytes()?)
            .map_err(|_| EngineError::malformed("user id is not UTF-8"))?;
        let user_id = Some(user_id.to_owned()).filter(|u| !u.is_empty());
        let secret = match packet_tag {
            tag::PUBLIC_KEY => Secret::None,
            tag::SECRET_KEY => match f.u8()? {
                0 => Secret::Unlocked(SecretParts::from_bytes(f.rest())?),
                1 => Secret::Locked {
                    salt: f.array()?,
                    sealed: f.rest().to_vec(),
                },
                other => {
                    return Err(EngineError::malformed(format!("unknown secret key protection {other}")))
                }
            },
            other => return Err(EngineError::malformed(format!("not a key packet (tag {other:#x})"))),
        };
        f.end()?;
        let key = Self {
            version,
            created,
            expires,
            revoked,
            algorithm,
            user_id,
            signing_public,
            encryption_public,
            secret,
        };
        if let Secret::Unlocked(parts) = &key.secret {
            let check = Self::from_parts(created, algorithm, None, SecretParts::from_bytes(&parts.to_bytes())?)?;
            if check.signing_public != key.signing_public || check.encryption_public != key.encryption_public {
                return Err(EngineError::malformed("secret key does not match its public key"));
            }
        }
        Ok(key)
    }
}
