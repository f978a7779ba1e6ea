//! Signature packets and the incremental signer.

use std::sync::Arc;

use ring::digest;

use super::context::SigningContext;
use super::error::EngineError;
use super::keys::KeyMaterial;
use super::packet::{self, push_short_bytes, tag, Fields};

const SIGNATURE_DOMAIN: &[u8] = b"SCEAU-SIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignatureContext {
    pub(crate) value: String,
    pub(crate) critical: bool,
}

/// One parsed or freshly made signature.
#[derive(Debug, Clone)]
pub(crate) struct Signature {
    pub(crate) key_id: u64,
    pub(crate) created: i64,
    pub(crate) text: bool,
    pub(crate) context: Option<SignatureContext>,
    sig: [u8; 64],
}

impl Signature {
    fn metadata(
        key_id: u64,
        created: i64,
        text: bool,
        context: Option<&SignatureContext>,
    ) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::with_capacity(24);
        out.extend_from_slice(&key_id.to_be_bytes());
        out.extend_from_slice(&created.to_be_bytes());
        out.push(u8::from(text));
        match context {
            Some(ctx) => {
                out.push(1);
                out.push(u8::from(ctx.critical));
                push_short_bytes(&mut out, ctx.value.as_bytes())?;
            }
            None => out.extend_from_slice(&[0, 0, 0, 0]),
        }
        Ok(out)
    }

    fn signed_bytes(digest: &[u8; 32], metadata: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNATURE_DOMAIN.len().saturating_add(32).saturating_add(metadata.len()));
        out.extend_from_slice(SIGNATURE_DOMAIN);
        out.extend_from_slice(digest);
        out.extend_from_slice(metadata);
        out
    }

    fn make(
        key: &KeyMaterial,
        digest: &[u8; 32],
        created: i64,
        text: bool,
        context: Option<SignatureContext>,
    ) -> Result<Self, EngineError> {
        let key_id = key.key_id();
        let metadata = Self::metadata(key_id, created, text, context.as_ref())?;
        let sig = key.sign(&Self::signed_bytes(digest, &metadata))?;
        Ok(Self {
            key_id,
            created,
            text,
            context,
            sig,
        })
    }

    /// Check the signature math only; validity rules live in `verify`.
    pub(crate) fn verifies(&self, key: &KeyMaterial, digest: &[u8; 32]) -> bool {
        Self::metadata(self.key_id, self.created, self.text, self.context.as_ref())
            .is_ok_and(|metadata| key.verify(&Self::signed_bytes(digest, &metadata), &self.sig))
    }

    pub(crate) fn to_packet(&self) -> Result<Vec<u8>, EngineError> {
        let mut body = Self::metadata(self.key_id, self.created, self.text, self.context.as_ref())?;
        body.extend_from_slice(&self.sig);
        packet::encode_packet(tag::SIGNATURE, &body)
    }

    pub(crate) fn parse(body: &[u8]) -> Result<Self, EngineError> {
        let mut f = Fields::new(body);
        let key_id = f.u64()?;
        let created = f.i64()?;
        let text = f.u8()? != 0;
        let has_context = f.u8()? != 0;
        let critical = f.u8()? != 0;
        let value = f.short_bytes()?;
        let context = if has_context {
            Some(SignatureContext {
                value: String::from_utf8(value.to_vec())
                    .map_err(|_| EngineError::malformed("signature context is not UTF-8"))?,
                critical,
            })
        } else {
            None
        };
        let sig = f.array()?;
        f.end()?;
        Ok(Self {
            key_id,
            created,
            text,
            context,
            sig,
        })
    }
}

/// Parse a block made only of signature packets.
pub(crate) fn parse_signatures(mut data: &[u8]) -> Result<Vec<Signature>, EngineError> {
    let mut out = Vec::new();
    while let Some((kind, body)) = packet::read_packet(&mut data)? {
        if kind != tag::SIGNATURE {
            return Err(EngineError::malformed(format!(
                "unexpected packet {kind:#x} in signature block"
            )));
        }
        out.push(Signature::parse(&body)?);
    }
    if out.is_empty() {
        return Err(EngineError::malformed("signature block is empty"));
    }
    Ok(out)
}

/// Hashes data and produces one signature per key at the end.
pub(crate) struct Signer {
    keys: Vec<Arc<KeyMaterial>>,
    created: i64,
    text: bool,
    context: Option<SignatureContext>,
    hasher: digest::Context,
}

impl Signer {
    /// Fails if any key cannot sign at `created`.
    pub(crate) fn new(
        keys: Vec<Arc<KeyMaterial>>,
        created: i64,
        text: bool,
        context: Option<&SigningContext>,
    ) -> Result<Self, EngineError> {
        if keys.is_empty() {
            return Err(EngineError::invalid("no signing keys provided"));
        }
        for key in &keys {
            if !key.is_private() || key.is_locked() {
                return Err(EngineError::key(format!(
                    "key {:016X} cannot sign: no unlocked secret material",
                    key.key_id()
                )));
            }
            key.check_usable_at(created)?;
        }
        Ok(Self {
            keys,
            created,
            text,
            context: context.map(|c| SignatureContext {
                value: c.value.clone(),
                critical: c.critical,
            }),
            hasher: digest::Context::new(&digest::SHA256),
        })
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub(crate) fn finish(self) -> Result<Vec<Signature>, EngineError> {
        let digest = finish_digest(self.hasher);
        self.keys
            .iter()
            .map(|key| Signature::make(key, &digest, self.created, self.text, self.context.clone()))
            .collect()
    }

    /// Serialized signature packets, concatenated.
    pub(crate) fn finish_packets(self) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::new();
        for sig in self.finish()? {
            out.extend_from_slice(&sig.to_packet()?);
        }
        Ok(out)
    }
}

pub(crate) fn finish_digest(hasher: digest::Context) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(hasher.finish().as_ref());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::algorithm;
    use crate::sim::crypto::sha256;

    fn key(created: i64) -> Arc<KeyMaterial> {
        Arc::new(KeyMaterial::generate(created, algorithm::DEFAULT, None).unwrap())
    }

    #[test]
    fn signatures_parse_and_verify() {
        let k = key(10);
        let mut signer = Signer::new(vec![Arc::clone(&k)], 20, false, None).unwrap();
        signer.update(b"plain ");
        signer.update(b"text");
        let packets = signer.finish_packets().unwrap();
        let sigs = parse_signatures(&packets).unwrap();
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].key_id, k.key_id());
        assert_eq!(sigs[0].created, 20);
        assert!(sigs[0].verifies(&k, &sha256(&[b"plain text"])));
        assert!(!sigs[0].verifies(&k, &sha256(&[b"other text"])));
    }

    #[test]
    fn context_is_bound_to_signature() {
        let k = key(10);
        let ctx = SigningContext::new("mail".into(), true);
        let mut signer = Signer::new(vec![Arc::clone(&k)], 20, true, Some(&ctx)).unwrap();
        signer.update(b"x");
        let mut sig = signer.finish().unwrap().remove(0);
        assert_eq!(sig.context.as_ref().map(|c| c.value.as_str()), Some("mail"));
        sig.context = None;
        assert!(!sig.verifies(&k, &sha256(&[b"x"])));
    }

    #[test]
    fn signing_before_key_creation_fails() {
        assert!(Signer::new(vec![key(100)], 50, false, None).is_err());
    }

    #[test]
    fn public_key_cannot_sign() {
        let public = Arc::new(key(10).to_public());
        assert!(matches!(Signer::new(vec![public], 20, false, None), Err(EngineError::Key(_))));
    }

    #[test]
    fn empty_signature_block_is_malformed() {
        assert!(parse_signatures(&[]).is_err());
    }
}
