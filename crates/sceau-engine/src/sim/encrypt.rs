//! Encryption pipeline: key packets, sealed data, literal layer.

use std::io::Write;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::boundary::bytes;
use super::context::SigningContext;
use super::error::EngineError;
use super::handles;
use super::io::Sink;
use super::keys::KeyMaterial;
use super::literal::LiteralSink;
use super::seal::SealSink;
use super::session::SessionKey;
use super::signature::Signer;
use crate::abi::{cipher, EncryptionParams};

pub(crate) struct EncryptRequest {
    recipients: Vec<Arc<KeyMaterial>>,
    signers: Vec<Arc<KeyMaterial>>,
    session_key: Option<Arc<SessionKey>>,
    password: Option<Zeroizing<Vec<u8>>>,
    context: Option<Arc<SigningContext>>,
    time: i64,
    detached: bool,
    detached_encrypted: bool,
    text: bool,
    compress: bool,
}

impl EncryptRequest {
    /// # Safety
    ///
    /// Every pointer inside `params` must be valid for its paired length.
    pub(crate) unsafe fn from_params(params: &EncryptionParams) -> Result<Self, EngineError> {
        // SAFETY: forwarded to the caller.
        let recipients = unsafe { handles::keys(params.encryption_keys, params.encryption_keys_len) }?;
        // SAFETY: forwarded to the caller.
        let signers = unsafe { handles::keys(params.signing_keys, params.signing_keys_len) }?;
        // SAFETY: forwarded to the caller.
        let password = unsafe { bytes(params.password, params.password_len) }?;
        Ok(Self {
            recipients,
            signers,
            session_key: params
                .has_session_key
                .then(|| handles::session_key(params.session_key))
                .transpose()?,
            password: (!password.is_empty()).then(|| Zeroizing::new(password.to_vec())),
            context: params
                .has_signing_context
                .then(|| handles::signing_context(params.signing_context))
                .transpose()?,
            time: if params.has_encryption_time {
                params.encryption_time
            } else {
                super::unix_now()
            },
            detached: params.detached_signature,
            detached_encrypted: params.detached_signature_is_encrypted,
            text: params.utf8,
            compress: params.compress,
        })
    }

    pub(crate) fn is_signing(&self) -> bool {
        !self.signers.is_empty()
    }

    pub(crate) const fn detached_encrypted(&self) -> bool {
        self.detached_encrypted
    }

    pub(crate) const fn wants_detached(&self) -> bool {
        self.detached
    }

    fn session(&self) -> Result<Arc<SessionKey>, EngineError> {
        match &self.session_key {
            Some(session) => Ok(Arc::clone(session)),
            None => Ok(Arc::new(SessionKey::generate(cipher::AES256)?)),
        }
    }

    /// Key and password packets carrying `session`.
    pub(crate) fn key_packets(&self, session: &SessionKey) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::new();
        for recipient in &self.recipients {
            out.extend_from_slice(&session.wrap_for(recipient, self.time)?);
        }
        if let Some(password) = &self.password {
            out.extend_from_slice(&session.wrap_with_password(password)?);
        }
        Ok(out)
    }

    /// Build the plaintext sink.
    ///
    /// Key packets go to `key_packets` when given, otherwise in front of the
    /// data. `signatures` receives the detached signature when one was
    /// requested.
    pub(crate) fn open(
        &self,
        mut data: Box<dyn Sink>,
        key_packets: Option<Box<dyn Sink>>,
        signatures: Option<Box<dyn Sink>>,
    ) -> Result<Box<dyn Sink>, EngineError> {
        if self.recipients.is_empty() && self.password.is_none() && self.session_key.is_none() {
            return Err(EngineError::key(
                "no encryption keys, session key, or password provided",
            ));
        }
        let signer = if self.signers.is_empty() {
            None
        } else {
            Some(Signer::new(
                self.signers.clone(),
                self.time,
                self.text,
                self.context.as_deref(),
            )?)
        };
        let detached = self.detached && signer.is_some();
        if detached && signatures.is_none() {
            return Err(EngineError::invalid(
                "detached signature requested without a signature writer",
            ));
        }

        let session = self.session()?;
        let packets = self.key_packets(&session)?;
        match key_packets {
            Some(mut out) => {
                out.write_all(&packets)?;
                out.finish()?;
            }
            None => data.write_all(&packets)?,
        }
        tracing::debug!(
            recipients = self.recipients.len(),
            signers = self.signers.len(),
            password = self.password.is_some(),
            detached,
            "encryption started"
        );

        let sealed: Box<dyn Sink> = Box::new(SealSink::new(data, &session)?);
        let signature_out = match signatures.filter(|_| detached) {
            Some(out) if self.detached_encrypted => Some(Box::new(SealSink::new(out, &session)?) as Box<dyn Sink>),
            other => other,
        };
        Ok(Box::new(LiteralSink::new(
            Some(sealed),
            signer,
            signature_out,
            self.text,
            self.compress,
        )?))
    }
}
