//! Passwords and raw key material stay out of `Debug` output.

use secrecy::ExposeSecret;

use sceau_pgp::{
    DecryptionSecrets, EncryptionSecrets, PgpDecrypter, PgpEncrypter, PgpError, PgpSessionKey, SymmetricCipher,
};

const PASSWORD: &[u8] = b"correct horse battery staple";

#[test]
fn encryption_password_is_masked() {
    let rendered = format!("{:?}", EncryptionSecrets::Password(PASSWORD));
    assert_eq!(rendered, "Password(***)");
}

#[test]
fn builders_do_not_print_passwords() {
    let encrypter = format!("{:?}", PgpEncrypter::new(EncryptionSecrets::Password(PASSWORD)));
    let decrypter = format!("{:?}", PgpDecrypter::new(DecryptionSecrets::Password(PASSWORD)));
    for rendered in [encrypter, decrypter] {
        assert!(!rendered.contains("correct horse"), "{rendered}");
        assert!(rendered.contains("***"), "{rendered}");
    }
}

#[test]
fn exported_token_is_not_printed() {
    let session_key = PgpSessionKey::generate(SymmetricCipher::Aes128).unwrap();
    let (token, _) = session_key.export().unwrap();
    let rendered = format!("{token:?}");
    let hex: String = token.expose_secret().iter().map(|b| format!("{b:02x}")).collect();
    assert!(!rendered.contains(&hex));
    assert_eq!(token.expose_secret().len(), 16);
}

#[test]
fn wrong_password_error_does_not_echo_it() {
    let message = PgpEncrypter::new(EncryptionSecrets::Password(PASSWORD))
        .encrypt(b"payload", sceau_pgp::Encoding::Binary)
        .unwrap();
    let err = PgpDecrypter::new(DecryptionSecrets::Password(b"tr0ub4dor"))
        .decrypt(&message, sceau_pgp::Encoding::Binary)
        .unwrap_err();
    assert!(matches!(err, PgpError::Pgp(_)));
    assert!(!err.to_string().contains("tr0ub4dor"));
}
