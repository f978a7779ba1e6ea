//! Shared fixtures.

use sceau_pgp::{FixedTime, KeyGenerationRequest, PgpKey, PgpPrivateKey};

/// 2020-09-13, well before any test clock.
pub const CREATED: u64 = 1_600_000_000;

pub fn private_key(name: &str) -> PgpPrivateKey {
    private_key_at(name, CREATED)
}

pub fn private_key_at(name: &str, created: u64) -> PgpPrivateKey {
    let email = format!("{name}@example.org");
    PgpPrivateKey::generate(&KeyGenerationRequest {
        name,
        email: &email,
        time: Some(&FixedTime::from_unix(created)),
        ..KeyGenerationRequest::default()
    })
    .expect("key generation should succeed")
}

pub fn key_pair(name: &str) -> (PgpPrivateKey, PgpKey) {
    let private = private_key(name);
    let public = private.to_public().expect("public key export should succeed");
    (private, public)
}
