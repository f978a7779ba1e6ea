//! Key import, export, locking and attributes.

use sceau_pgp::{
    Encoding, FixedTime, KeyEncoding, PgpError, PgpKey, PgpPrivateKey, PgpSigner, PgpVerifier, VerificationStatus,
};

use super::common::{key_pair, private_key, CREATED};

#[test]
fn public_export_imports_with_autodetection() {
    let (_, public) = key_pair("alice");
    for encoding in [Encoding::Binary, Encoding::AsciiArmor] {
        let exported = public.export(encoding).unwrap();
        let imported = PgpKey::import(&exported, KeyEncoding::Auto).expect("import should succeed");
        assert_eq!(imported.id().unwrap(), public.id().unwrap());
        assert_eq!(imported.fingerprint().unwrap(), public.fingerprint().unwrap());
        assert!(!imported.is_private().unwrap());
    }
}

#[test]
fn armored_public_export_has_public_header() {
    let (_, public) = key_pair("alice");
    let armored = public.export(Encoding::AsciiArmor).unwrap();
    assert!(armored.starts_with(b"-----BEGIN PGP PUBLIC KEY BLOCK-----"));
}

#[test]
fn locked_export_needs_the_passphrase() {
    let key = private_key("alice");
    let locked = key.lock(b"passphrase").unwrap();
    assert!(locked.is_locked().unwrap());
    let exported = locked.export(Encoding::AsciiArmor).unwrap();

    let wrong = PgpPrivateKey::import(&exported, b"nope", KeyEncoding::Armor);
    assert!(matches!(wrong, Err(PgpError::Pgp(_))));

    let unlocked = PgpPrivateKey::import(&exported, b"passphrase", KeyEncoding::Armor).unwrap();
    assert!(!unlocked.is_locked().unwrap());
    assert_eq!(unlocked.id().unwrap(), key.id().unwrap());

    let signature = PgpSigner::new(&unlocked).sign_detached(b"m", Encoding::Binary).unwrap();
    let result = PgpVerifier::new(&*key).verify_detached(b"m", &signature, Encoding::Binary).unwrap();
    assert_eq!(result.status().unwrap(), VerificationStatus::Ok);
}

#[test]
fn capabilities_follow_creation_time() {
    let (_, public) = key_pair("alice");
    let before = FixedTime::from_unix(CREATED - 1);
    let after = FixedTime::from_unix(CREATED + 1);
    assert!(!public.can_encrypt(Some(&before)).unwrap());
    assert!(public.can_encrypt(Some(&after)).unwrap());
    assert!(public.can_verify(Some(&after)).unwrap());
    assert!(!public.is_revoked().unwrap());
}

#[test]
fn fingerprints_have_expected_shape() {
    let (_, public) = key_pair("alice");
    assert_eq!(public.version().unwrap(), 4);
    assert_eq!(public.fingerprint().unwrap().len(), 20);
    let sha256 = public.sha256_fingerprints().unwrap();
    assert!(!sha256.is_empty());
    assert!(sha256.iter().all(|fp| fp.len() == 32));
}

#[test]
fn to_public_leaves_the_private_key_usable() {
    let key = private_key("alice");
    let public = key.to_public().unwrap();
    assert!(key.is_private().unwrap());
    assert!(!public.is_private().unwrap());
    assert!(PgpSigner::new(&key).sign(b"still works", Encoding::Binary).is_ok());
}
