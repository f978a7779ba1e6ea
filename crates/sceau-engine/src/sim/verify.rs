//! Signature evaluation and verification results.

use std::ffi::c_int;
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::VerificationContext;
use super::keys::KeyMaterial;
use super::signature::Signature;
use crate::abi::status;

/// Outcome for one signature of a message.
#[derive(Debug, Clone)]
pub(crate) struct SignatureOutcome {
    pub(crate) key_id: u64,
    pub(crate) created: i64,
    pub(crate) status: c_int,
    pub(crate) message: Option<String>,
}

/// Result exposed through a verification result handle.
#[derive(Debug, Clone)]
pub(crate) struct Verification {
    pub(crate) status: c_int,
    pub(crate) message: Option<String>,
    pub(crate) signatures: Vec<SignatureOutcome>,
}

impl Verification {
    pub(crate) fn not_signed() -> Self {
        Self {
            status: status::NOT_SIGNED,
            message: Some("message is not signed".to_owned()),
            signatures: Vec::new(),
        }
    }
}

/// Filled by a reader once its input is exhausted.
pub(crate) type VerificationSlot = Arc<Mutex<Option<Arc<Verification>>>>;

/// What a verifier trusts and when.
#[derive(Clone, Default)]
pub(crate) struct VerifyConfig {
    pub(crate) keys: Vec<Arc<KeyMaterial>>,
    /// Unix seconds; signatures created later fail.
    pub(crate) time: Option<i64>,
    pub(crate) context: Option<Arc<VerificationContext>>,
}

// Higher wins when no signature verifies.
const fn severity(code: c_int) -> u8 {
    match code {
        status::FAILED => 3,
        status::BAD_CONTEXT => 2,
        status::NO_VERIFIER => 1,
        _ => 0,
    }
}

impl VerifyConfig {
    fn check(&self, sig: &Signature, digest: &[u8; 32]) -> (c_int, Option<String>) {
        let Some(key) = self.keys.iter().find(|k| k.key_id() == sig.key_id) else {
            return (
                status::NO_VERIFIER,
                Some(format!("no verification key for signature by {:016X}", sig.key_id)),
            );
        };
        if !sig.verifies(key, digest) {
            return (status::FAILED, Some("signature does not verify".to_owned()));
        }
        if let Err(e) = key.check_usable_at(sig.created) {
            return (status::FAILED, Some(format!("signing key was not valid at signature time: {e}")));
        }
        if self.time.is_some_and(|t| sig.created > t) {
            return (
                status::FAILED,
                Some("signature was created after the verification time".to_owned()),
            );
        }
        match (&sig.context, &self.context) {
            (Some(found), Some(expected)) if found.value != expected.value => (
                status::BAD_CONTEXT,
                Some(format!(
                    "signature context {:?} does not match expected {:?}",
                    found.value, expected.value
                )),
            ),
            (Some(found), None) if found.critical => (
                status::BAD_CONTEXT,
                Some("signature carries a critical context but none was expected".to_owned()),
            ),
            (None, Some(expected)) if expected.required_at(sig.created) => (
                status::BAD_CONTEXT,
                Some(format!("signature lacks required context {:?}", expected.value)),
            ),
            _ => (status::OK, None),
        }
    }

    /// Evaluate `signatures` over data hashing to `digest`.
    pub(crate) fn evaluate(&self, digest: &[u8; 32], signatures: &[Signature]) -> Verification {
        if signatures.is_empty() {
            return Verification::not_signed();
        }
        let outcomes: Vec<SignatureOutcome> = signatures
            .iter()
            .map(|sig| {
                let (status, message) = self.check(sig, digest);
                SignatureOutcome {
                    key_id: sig.key_id,
                    created: sig.created,
                    status,
                    message,
                }
            })
            .collect();
        let chosen = outcomes
            .iter()
            .find(|o| o.status == status::OK)
            .or_else(|| outcomes.iter().max_by_key(|o| severity(o.status)));
        let (status, message) = chosen.map_or((status::NOT_SIGNED, None), |o| (o.status, o.message.clone()));
        Verification {
            status,
            message,
            signatures: outcomes,
        }
    }
}
