//! Async signing and encryption over `tokio::io::AsyncRead`.

use sceau_pgp::{
    CancelSignal, Encoding, PgpDecrypter, PgpEncrypter, PgpError, PgpSigner, PgpVerifier, SigningMode,
};

use super::common::key_pair;

#[tokio::test]
async fn async_sign_then_verify() {
    let (private, public) = key_pair("alice");
    let data = vec![0x42u8; 30_000];
    let signed = PgpSigner::new(&private)
        .sign_async(data.as_slice(), Vec::new(), Encoding::Binary, SigningMode::Inline, &CancelSignal::never())
        .await
        .expect("async signing should succeed");
    let (content, result) = PgpVerifier::new(&public).verify_inline(&signed, Encoding::Binary).unwrap();
    assert_eq!(content, data);
    assert!(result.status().unwrap().is_ok());
}

#[tokio::test]
async fn async_encrypt_then_decrypt() {
    let (private, public) = key_pair("alice");
    let message = PgpEncrypter::new(&public)
        .encrypt_async(&b"async secret"[..], Vec::new(), Encoding::AsciiArmor, &CancelSignal::default())
        .await
        .unwrap();
    let (plain, _) = PgpDecrypter::new(&private).decrypt(&message, Encoding::AsciiArmor).unwrap();
    assert_eq!(plain, b"async secret");
}

#[tokio::test]
async fn cancelled_encryption_returns_an_error() {
    let (_, public) = key_pair("alice");
    let (handle, signal) = CancelSignal::pair();
    handle.cancel();
    let result = PgpEncrypter::new(&public)
        .encrypt_async(&b"never sent"[..], Vec::new(), Encoding::Binary, &signal)
        .await;
    assert!(matches!(result, Err(PgpError::InvalidOperation(_))));
}
