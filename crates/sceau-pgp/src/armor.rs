//! ASCII armor encoding and decoding.
//!
//! Encoding picks the header from an [`ArmorBlockType`]; decoding accepts
//! any block type.

use std::io::{Read, Write};

use crate::bridge::{collect, write_through, SliceWriter};
use crate::error::PgpError;
use crate::estimate;
use crate::params::{ArmorBlockType, Encoding};
use crate::streams::{PullStream, PushStream};

/// Armor `data` as a block of type `block`.
///
/// # Errors
///
/// Returns [`PgpError::Pgp`] if the engine rejects the block type.
pub fn armor(data: &[u8], block: ArmorBlockType) -> Result<Vec<u8>, PgpError> {
    tracing::debug!(len = data.len(), label = block.label(), "armoring buffer");
    collect(estimate::encoded_len(data.len(), Encoding::AsciiArmor), |w| {
        // SAFETY: `data` is valid for its length; `w` is anchored by `collect`.
        unsafe { sceau_engine::pgp_armor_message(data.as_ptr(), data.len(), block.code(), w) }
    })
}

/// Armor into a caller buffer, returning the bytes written.
///
/// # Errors
///
/// As [`armor`]; also fails when `output` is too small.
pub fn armor_into(data: &[u8], output: &mut [u8], block: ArmorBlockType) -> Result<usize, PgpError> {
    let writer = armor_to_writer(data, SliceWriter::new(output), block)?;
    Ok(writer.written())
}

/// Armor into `writer`.
///
/// # Errors
///
/// As [`armor`].
pub fn armor_to_writer<W: Write>(data: &[u8], writer: W, block: ArmorBlockType) -> Result<W, PgpError> {
    write_through(writer, |w| {
        // SAFETY: `data` is valid for its length; `w` is anchored.
        unsafe { sceau_engine::pgp_armor_message(data.as_ptr(), data.len(), block.code(), w) }
    })
}

/// Strip the armor from `armored`.
///
/// # Errors
///
/// Returns [`PgpError::Pgp`] if the input is not an armored block or its
/// checksum does not match.
pub fn unarmor(armored: &[u8]) -> Result<Vec<u8>, PgpError> {
    tracing::debug!(len = armored.len(), "unarmoring buffer");
    collect(estimate::decoded_len(armored.len()), |w| {
        // SAFETY: `armored` is valid for its length; `w` is anchored.
        unsafe { sceau_engine::pgp_unarmor_message(armored.as_ptr(), armored.len(), w) }
    })
}

/// Unarmor into a caller buffer, returning the bytes written.
///
/// # Errors
///
/// As [`unarmor`]; also fails when `output` is too small.
pub fn unarmor_into(armored: &[u8], output: &mut [u8]) -> Result<usize, PgpError> {
    let writer = unarmor_to_writer(armored, SliceWriter::new(output))?;
    Ok(writer.written())
}

/// Unarmor into `writer`.
///
/// # Errors
///
/// As [`unarmor`].
pub fn unarmor_to_writer<W: Write>(armored: &[u8], writer: W) -> Result<W, PgpError> {
    write_through(writer, |w| {
        // SAFETY: `armored` is valid for its length; `w` is anchored.
        unsafe { sceau_engine::pgp_unarmor_message(armored.as_ptr(), armored.len(), w) }
    })
}

/// A stream that armors what is written to it into `writer`.
///
/// # Errors
///
/// Returns [`PgpError::Pgp`] if the stream cannot be created.
pub fn open_armor_stream<W: Write>(writer: W, block: ArmorBlockType) -> Result<PushStream<W>, PgpError> {
    tracing::debug!(label = block.label(), "opening armor stream");
    PushStream::open(writer, |w, out| {
        // SAFETY: the stream keeps `w` anchored while the handle lives.
        unsafe { sceau_engine::pgp_armor_message_stream(w, block.code(), out) }
    })
}

/// A stream yielding the binary content of the armored block read from
/// `reader`.
///
/// # Errors
///
/// Returns [`PgpError::Pgp`] if the stream cannot be created.
pub fn open_unarmor_stream<R: Read>(reader: R) -> Result<PullStream<R>, PgpError> {
    tracing::debug!("opening unarmor stream");
    PullStream::open(reader, false, |r, out| {
        // SAFETY: the stream keeps `r` anchored while the handle lives.
        unsafe { sceau_engine::pgp_unarmor_message_stream(r, out) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_type_selects_header() {
        for block in [
            ArmorBlockType::Message,
            ArmorBlockType::Signature,
            ArmorBlockType::PrivateKey,
            ArmorBlockType::PublicKey,
        ] {
            let armored = armor(b"\x01\x02\x03", block).expect("armoring should succeed");
            let header = format!("-----BEGIN PGP {}-----", block.label());
            assert!(armored.starts_with(header.as_bytes()), "{block:?}");
            assert_eq!(unarmor(&armored).unwrap(), b"\x01\x02\x03");
        }
    }

    #[test]
    fn estimate_covers_armored_size() {
        let data = vec![0xA5u8; 4096];
        let armored = armor(&data, ArmorBlockType::Message).unwrap();
        assert!(armored.len() <= estimate::encoded_len(data.len(), Encoding::AsciiArmor));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(unarmor(b"not armor at all"), Err(PgpError::Pgp(_))));
    }

    #[test]
    fn buffer_too_small_fails() {
        let mut output = [0u8; 16];
        assert!(armor_into(b"data", &mut output, ArmorBlockType::Message).is_err());
    }

    #[test]
    fn streams_match_buffers() {
        let mut stream = open_armor_stream(Vec::new(), ArmorBlockType::Signature).unwrap();
        stream.write_all(b"streamed").unwrap();
        let armored = stream.finish().unwrap();
        assert_eq!(armored, armor(b"streamed", ArmorBlockType::Signature).unwrap());

        let mut plain = Vec::new();
        open_unarmor_stream(armored.as_slice())
            .unwrap()
            .read_to_end(&mut plain)
            .unwrap();
        assert_eq!(plain, b"streamed");
    }
}
