//! Cleartext signed messages.

use super::armor;
use super::error::EngineError;
use super::signature::{parse_signatures, Signature, Signer};
use crate::abi::block_type;

const HEADER: &[u8] = b"-----BEGIN PGP SIGNED MESSAGE-----";
const SIGNATURE_HEADER: &[u8] = b"-----BEGIN PGP SIGNATURE-----";

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Sign `text` and wrap it into a cleartext signed message.
pub(crate) fn sign(mut signer: Signer, text: &[u8]) -> Result<Vec<u8>, EngineError> {
    signer.update(text);
    let signature = armor::armor(&signer.finish_packets()?, block_type::SIGNATURE)?;

    let mut out = Vec::with_capacity(text.len().saturating_add(signature.len()).saturating_add(64));
    out.extend_from_slice(HEADER);
    out.extend_from_slice(b"\nHash: SHA256\n\n");
    for (i, line) in text.split(|b| *b == b'\n').enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        if line.starts_with(b"-") {
            out.extend_from_slice(b"- ");
        }
        out.extend_from_slice(line);
    }
    out.push(b'\n');
    out.extend_from_slice(&signature);
    Ok(out)
}

/// Split a cleartext signed message into its text and signatures.
pub(crate) fn parse(data: &[u8]) -> Result<(Vec<u8>, Vec<Signature>), EngineError> {
    let mut lines = data.split(|b| *b == b'\n').peekable();
    while lines.next_if(|l| trim_cr(l).iter().all(u8::is_ascii_whitespace)).is_some() {}
    if lines.next().map(trim_cr) != Some(HEADER) {
        return Err(EngineError::malformed("missing cleartext signature header"));
    }
    // Hash headers up to the first blank line.
    loop {
        match lines.next() {
            Some(l) if trim_cr(l).is_empty() => break,
            Some(_) => {}
            None => return Err(EngineError::malformed("cleartext message is truncated")),
        }
    }

    let mut text = Vec::new();
    let mut first = true;
    let mut signature_lines: Option<Vec<&[u8]>> = None;
    for line in lines.by_ref() {
        if trim_cr(line) == SIGNATURE_HEADER {
            signature_lines = Some(vec![line]);
            break;
        }
        if !first {
            text.push(b'\n');
        }
        first = false;
        text.extend_from_slice(line.strip_prefix(b"- ").unwrap_or(line));
    }
    let mut signature_lines =
        signature_lines.ok_or_else(|| EngineError::malformed("cleartext message has no signature"))?;
    signature_lines.extend(lines);
    let block = signature_lines.join(&b'\n');
    let signatures = parse_signatures(&armor::unarmor(&block)?)?;
    Ok((text, signatures))
}
