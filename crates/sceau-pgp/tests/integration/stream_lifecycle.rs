//! Push and pull stream lifecycle: close idempotence, write after close,
//! and failing caller I/O.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use sceau_pgp::{armor, ArmorBlockType, Encoding, PgpEncrypter, PgpSigner, PgpVerifier, SigningMode};

use super::common::key_pair;

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"))
    }
}

#[test]
fn double_close_on_signing_stream_is_harmless() {
    let (private, public) = key_pair("alice");
    let mut stream = PgpSigner::new(&private)
        .open_stream(Vec::new(), Encoding::Binary, SigningMode::Inline)
        .unwrap();
    stream.write_all(b"closing twice").unwrap();
    stream.close().expect("first close should succeed");
    stream.close().expect("second close should be a no-op");
    let signed = stream.finish().unwrap();

    let (content, result) = PgpVerifier::new(&public).verify_inline(&signed, Encoding::Binary).unwrap();
    assert_eq!(content, b"closing twice");
    assert!(result.status().unwrap().is_ok());
}

#[test]
fn double_close_on_encrypting_stream_is_harmless() {
    let (_, public) = key_pair("alice");
    let mut stream = PgpEncrypter::new(&public).open_stream(Vec::new(), Encoding::Binary).unwrap();
    stream.write_all(b"x").unwrap();
    stream.close().unwrap();
    stream.close().unwrap();
    assert!(stream.is_closed());
    assert!(stream.write(b"late").is_err());
}

#[test]
fn failing_output_surfaces_as_engine_error() {
    let (private, _) = key_pair("alice");
    let result = PgpSigner::new(&private).sign_to_writer(b"data", FailingWriter, Encoding::Binary, SigningMode::Detached);
    assert!(result.is_err());
}

#[test]
fn failing_input_breaks_the_pull_stream() {
    let mut stream = armor::open_unarmor_stream(FailingReader).unwrap();
    let mut out = Vec::new();
    assert!(stream.read_to_end(&mut out).is_err());
    assert!(!stream.is_eof());
}

#[test]
fn failing_input_fails_the_copy() {
    let (_, public) = key_pair("alice");
    let result = PgpEncrypter::new(&public).encrypt_stream(FailingReader, Vec::new(), Encoding::Binary);
    assert!(result.is_err());
}

/// Shares its bytes and records when it is dropped.
struct TrackedWriter {
    bytes: Arc<Mutex<Vec<u8>>>,
    dropped: Arc<AtomicBool>,
}

impl Write for TrackedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for TrackedWriter {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[test]
fn dropping_an_open_stream_releases_its_writer_without_a_trailer() {
    let bytes = Arc::new(Mutex::new(Vec::new()));
    let dropped = Arc::new(AtomicBool::new(false));
    let writer = TrackedWriter {
        bytes: Arc::clone(&bytes),
        dropped: Arc::clone(&dropped),
    };
    let mut stream = armor::open_armor_stream(writer, ArmorBlockType::Message).unwrap();
    stream.write_all(b"never closed").unwrap();
    assert!(!dropped.load(Ordering::SeqCst));

    drop(stream);
    assert!(dropped.load(Ordering::SeqCst));
    let text = String::from_utf8(bytes.lock().clone()).unwrap();
    assert!(!text.contains("-----END PGP MESSAGE-----"));
}

#[test]
fn pull_stream_hands_back_its_reader() {
    let armored = armor::armor(b"abc", ArmorBlockType::Message).unwrap();
    let mut stream = armor::open_unarmor_stream(io::Cursor::new(armored)).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"abc");
    let reader = stream.into_inner();
    assert!(reader.position() > 0);
}
