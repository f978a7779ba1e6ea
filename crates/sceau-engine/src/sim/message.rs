//! Inspection of a complete message held in memory.

use super::armor;
use super::error::EngineError;
use super::literal;
use super::packet::{self, tag};
use super::session::key_packet_recipient;

pub(crate) struct MessageInfo {
    pub(crate) data: Vec<u8>,
    pub(crate) key_packets_len: usize,
    pub(crate) encryption_key_ids: Vec<u64>,
    pub(crate) signature_key_ids: Vec<u64>,
}

impl MessageInfo {
    pub(crate) fn parse(raw: &[u8], armored: bool) -> Result<Self, EngineError> {
        let data = if armored { armor::unarmor(raw)? } else { raw.to_vec() };
        let mut input = data.as_slice();
        let mut key_packets_len = 0usize;
        let mut encryption_key_ids = Vec::new();
        let mut first_other = None;
        while let Some((kind, body)) = packet::read_packet(&mut input)? {
            match kind {
                tag::KEY_PACKET => encryption_key_ids.push(key_packet_recipient(&body)?),
                tag::PASSWORD_PACKET => {}
                other => {
                    first_other = Some(other);
                    break;
                }
            }
            key_packets_len = data.len().saturating_sub(input.len());
        }
        let signature_key_ids = match first_other {
            Some(tag::LITERAL_START | tag::SIGNATURE) => literal::signature_key_ids(&data)?,
            _ => Vec::new(),
        };
        Ok(Self {
            data,
            key_packets_len,
            encryption_key_ids,
            signature_key_ids,
        })
    }

    pub(crate) fn key_packets(&self) -> &[u8] {
        &self.data[..self.key_packets_len]
    }

    pub(crate) fn data_packet(&self) -> &[u8] {
        &self.data[self.key_packets_len..]
    }
}

/// Split a key packet block into key packet and password packet bodies.
pub(crate) fn split_key_packets(mut data: &[u8]) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>), EngineError> {
    let mut keys = Vec::new();
    let mut passwords = Vec::new();
    while let Some((kind, body)) = packet::read_packet(&mut data)? {
        match kind {
            tag::KEY_PACKET => keys.push(body),
            tag::PASSWORD_PACKET => passwords.push(body),
            other => {
                return Err(EngineError::malformed(format!(
                    "unexpected packet {other:#x} among key packets"
                )))
            }
        }
    }
    Ok((keys, passwords))
}
