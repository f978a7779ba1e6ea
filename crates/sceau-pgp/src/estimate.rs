//! Output size estimates used to pre-size buffers.
//!
//! Every estimate errs on the generous side. An estimate that turns out
//! too small only costs a reallocation, since the buffers grow on demand.

use crate::params::Encoding;

/// Armor header plus footer for the shortest block type.
pub const MIN_ARMOR_HEADER_PLUS_FOOTER: usize = 54;
/// Armor header plus footer for the longest block type.
pub const MAX_ARMOR_HEADER_PLUS_FOOTER: usize = 74;
/// Room for optional `Version:` and `Comment:` armor headers.
pub const ARMOR_VERSION_AND_COMMENT: usize = 90;
/// Binary bytes per armored line.
pub const ARMOR_BYTES_PER_NEWLINE: usize = 48;
pub const EXPECTED_KEY_PACKET_LEN: usize = 96;
pub const EXPECTED_DATA_PACKET_OVERHEAD: usize = 60;
pub const EXPECTED_SIGNATURE_LEN: usize = 190;

/// Size of a whole encrypted, optionally signed, message.
#[must_use]
pub fn message_len(plaintext_len: usize, encryption_keys: usize, signing_keys: usize, encoding: Encoding) -> usize {
    let binary = key_packets_len(encryption_keys)
        .saturating_add(data_packet_len(plaintext_len))
        .saturating_add(signature_len(signing_keys, Encoding::Binary));
    encoded_len(binary, encoding)
}

/// `keys * EXPECTED_KEY_PACKET_LEN`.
#[must_use]
pub const fn key_packets_len(encryption_keys: usize) -> usize {
    encryption_keys.saturating_mul(EXPECTED_KEY_PACKET_LEN)
}

/// Encrypted data packet: 110 % of the plaintext plus fixed overhead.
#[must_use]
pub const fn data_packet_len(plaintext_len: usize) -> usize {
    plaintext_len
        .saturating_mul(110)
        .saturating_div(100)
        .saturating_add(EXPECTED_DATA_PACKET_OVERHEAD)
}

#[must_use]
pub fn signature_len(signing_keys: usize, encoding: Encoding) -> usize {
    encoded_len(signing_keys.saturating_mul(EXPECTED_SIGNATURE_LEN), encoding)
}

/// Plaintext recovered from a message of `message_len` bytes.
///
/// Compressed messages can exceed this by far.
#[must_use]
pub const fn plaintext_len(message_len: usize, encoding: Encoding) -> usize {
    match encoding {
        Encoding::Binary => message_len,
        Encoding::AsciiArmor => decoded_len(message_len),
    }
}

/// Size of `original_len` bytes after encoding.
#[must_use]
pub const fn encoded_len(original_len: usize, encoding: Encoding) -> usize {
    match encoding {
        Encoding::Binary => original_len,
        Encoding::AsciiArmor => original_len
            .saturating_mul(4)
            .saturating_div(3)
            .saturating_add(MAX_ARMOR_HEADER_PLUS_FOOTER)
            .saturating_add(ARMOR_VERSION_AND_COMMENT)
            .saturating_add(original_len.saturating_div(ARMOR_BYTES_PER_NEWLINE)),
    }
}

/// Binary size of an armored block of `armored_len` bytes.
#[must_use]
pub const fn decoded_len(armored_len: usize) -> usize {
    armored_len
        .saturating_sub(MIN_ARMOR_HEADER_PLUS_FOOTER)
        .saturating_mul(3)
        .saturating_div(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_is_identity() {
        assert_eq!(encoded_len(1234, Encoding::Binary), 1234);
        assert_eq!(plaintext_len(1234, Encoding::Binary), 1234);
    }

    #[test]
    fn armor_overhead() {
        // 96 * 4 / 3 + 74 + 90 + 96 / 48
        assert_eq!(encoded_len(96, Encoding::AsciiArmor), 128 + 74 + 90 + 2);
    }

    #[test]
    fn message_sums_parts() {
        let binary = message_len(100, 2, 1, Encoding::Binary);
        assert_eq!(binary, 2 * 96 + 110 + 60 + 190);
    }

    #[test]
    fn short_armor_decodes_to_zero() {
        assert_eq!(decoded_len(10), 0);
        assert_eq!(plaintext_len(54, Encoding::AsciiArmor), 0);
    }

    #[test]
    fn huge_inputs_saturate() {
        assert_eq!(key_packets_len(usize::MAX), usize::MAX);
        assert!(message_len(usize::MAX, 1, 1, Encoding::AsciiArmor) > 0);
    }
}
