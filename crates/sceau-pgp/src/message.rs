//! Inspection of encrypted messages without decrypting them.

use std::io::Write;

use crate::bridge::{collect, WriteAnchor};
use crate::error::{check, PgpError};
use crate::handle::{HandleKind, OwnedHandle};
use crate::params::Encoding;

const KEY_ID_LEN: usize = 8;

/// A parsed OpenPGP message.
#[derive(Debug)]
pub struct PgpMessage {
    handle: OwnedHandle,
}

impl PgpMessage {
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if `data` is not a message.
    pub fn new(data: &[u8], encoding: Encoding) -> Result<Self, PgpError> {
        let handle = OwnedHandle::acquire(HandleKind::Message, |out| {
            // SAFETY: `data` is valid for its length.
            unsafe { sceau_engine::pgp_message_new(data.as_ptr(), data.len(), encoding.is_armored(), out) }
        })?;
        Ok(Self { handle })
    }

    /// Key ids the session key was encrypted to.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn encryption_key_ids(&self) -> Result<Vec<u64>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let bytes = collect(KEY_ID_LEN, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_message_get_enc_key_ids(raw, w) }
        })?;
        Ok(parse_key_ids(&bytes))
    }

    /// Key ids of the signers visible without decryption.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn signature_key_ids(&self) -> Result<Vec<u64>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let bytes = collect(KEY_ID_LEN, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_message_get_sig_key_ids(raw, w) }
        })?;
        Ok(parse_key_ids(&bytes))
    }

    /// Byte offset where the key packets end and the data packet starts.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn key_packets_length(&self) -> Result<usize, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut len = 0usize;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_message_key_packets_length(raw, &mut len) })?;
        Ok(len)
    }

    /// Binary key packets and data packet as separate buffers.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn split(&self) -> Result<(Vec<u8>, Vec<u8>), PgpError> {
        self.split_into(Vec::new(), Vec::new())
    }

    /// Write key packets and data packet into two sinks.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release, or an engine
    /// error if either sink fails.
    pub fn split_into<K: Write, D: Write>(&self, key_packets: K, data_packet: D) -> Result<(K, D), PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let keys = WriteAnchor::new(key_packets);
        let data = WriteAnchor::new(data_packet);
        // SAFETY: live handle; both anchors outlive the call.
        check(unsafe { sceau_engine::pgp_message_key_packet_split(raw, keys.raw(), data.raw()) })?;
        Ok((keys.into_inner(), data.into_inner()))
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}

fn parse_key_ids(bytes: &[u8]) -> Vec<u64> {
    bytes
        .chunks_exact(KEY_ID_LEN)
        .filter_map(|chunk| chunk.try_into().ok().map(u64::from_be_bytes))
        .collect()
}
