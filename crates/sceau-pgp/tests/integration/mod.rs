mod common;

mod async_drivers;
mod contexts;
mod encrypt_roundtrip;
mod key_management;
mod message_inspection;
mod session_key_roundtrip;
mod sign_verify;
mod srp_roundtrip;
mod stream_lifecycle;
