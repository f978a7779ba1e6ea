//! Entry points of the external engine library.
//!
//! Linked against `libsceau_native` when the `native` feature is enabled.
//! The simulated backend in [`crate::sim`] exports the same names with the
//! same signatures, so callers compile against either without change.

use std::ffi::c_int;

use crate::abi::{
    DecryptionParams, EncryptionParams, Handle, KeyGenerationParams, PlaintextResult, RawError,
    RawReader, RawWriter, SignatureDetailsRecord, SigningParams, SrpAuthParams,
    SrpClientHandshakeBuffers, SrpServerParams, VerificationParams,
};

#[link(name = "sceau_native")]
extern "C" {
    pub fn pgp_free(ptr: *mut u8);

    // Keys
    pub fn pgp_public_key_import(data: *const u8, len: usize, encoding: u8, out: *mut Handle) -> RawError;
    pub fn pgp_private_key_import(
        data: *const u8,
        len: usize,
        passphrase: *const u8,
        passphrase_len: usize,
        encoding: u8,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_generate_key(params: *const KeyGenerationParams, out: *mut Handle) -> RawError;
    pub fn pgp_key_export(key: Handle, force_public: bool, armored: bool, writer: RawWriter) -> RawError;
    pub fn pgp_key_lock(key: Handle, passphrase: *const u8, len: usize, out: *mut Handle) -> RawError;
    pub fn pgp_private_key_get_public_key(key: Handle, out: *mut Handle) -> RawError;
    pub fn pgp_key_get_version(key: Handle, out: *mut c_int) -> RawError;
    pub fn pgp_key_get_key_id(key: Handle, out: *mut u64) -> RawError;
    pub fn pgp_key_get_fingerprint(key: Handle, writer: RawWriter) -> RawError;
    pub fn pgp_key_get_sha256_fingerprints(key: Handle, writer: RawWriter) -> RawError;
    pub fn pgp_key_can_encrypt(key: Handle, has_time: bool, time: i64, out: *mut bool) -> RawError;
    pub fn pgp_key_can_verify(key: Handle, has_time: bool, time: i64, out: *mut bool) -> RawError;
    pub fn pgp_key_is_expired(key: Handle, has_time: bool, time: i64, out: *mut bool) -> RawError;
    pub fn pgp_key_is_revoked(key: Handle, out: *mut bool) -> RawError;
    pub fn pgp_key_is_private(key: Handle, out: *mut bool) -> RawError;
    pub fn pgp_key_is_locked(key: Handle, out: *mut bool) -> RawError;
    pub fn pgp_key_destroy(key: Handle);

    // Session keys
    pub fn pgp_generate_session_key(cipher: u8, out: *mut Handle) -> RawError;
    pub fn pgp_session_key_new(token: *const u8, len: usize, cipher: u8, out: *mut Handle) -> RawError;
    pub fn pgp_session_key_export_token(session_key: Handle, writer: RawWriter, out_cipher: *mut u8) -> RawError;
    pub fn pgp_session_key_get_algorithm(session_key: Handle, out: *mut u8) -> RawError;
    pub fn pgp_encrypt_session_key(
        params: *const EncryptionParams,
        session_key: Handle,
        writer: RawWriter,
    ) -> RawError;
    pub fn pgp_decrypt_session_key(
        params: *const DecryptionParams,
        key_packets: *const u8,
        len: usize,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_session_key_destroy(session_key: Handle);

    // Message inspection
    pub fn pgp_message_new(data: *const u8, len: usize, armored: bool, out: *mut Handle) -> RawError;
    pub fn pgp_message_get_enc_key_ids(message: Handle, writer: RawWriter) -> RawError;
    pub fn pgp_message_get_sig_key_ids(message: Handle, writer: RawWriter) -> RawError;
    pub fn pgp_message_key_packets_length(message: Handle, out: *mut usize) -> RawError;
    pub fn pgp_message_key_packet_split(message: Handle, key_packets: RawWriter, data_packet: RawWriter) -> RawError;
    pub fn pgp_message_destroy(message: Handle);

    // Contexts
    pub fn pgp_verification_context_new(
        value: *const u8,
        len: usize,
        is_required: bool,
        required_after_millis: i64,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_verification_context_get_value(context: Handle, writer: RawWriter) -> RawError;
    pub fn pgp_verification_context_is_required(context: Handle, out: *mut bool) -> RawError;
    pub fn pgp_verification_context_is_required_after(context: Handle, out: *mut i64) -> RawError;
    pub fn pgp_verification_context_destroy(context: Handle);
    pub fn pgp_signing_context_new(value: *const u8, len: usize, is_critical: bool, out: *mut Handle) -> RawError;
    pub fn pgp_signing_context_destroy(context: Handle);

    // Encryption
    pub fn pgp_encrypt(
        params: *const EncryptionParams,
        data: *const u8,
        len: usize,
        encoding: u8,
        signature_writer: *const RawWriter,
        writer: RawWriter,
    ) -> RawError;
    pub fn pgp_encrypt_stream(
        params: *const EncryptionParams,
        writer: RawWriter,
        signature_writer: *const RawWriter,
        encoding: u8,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_encrypt_stream_split(
        params: *const EncryptionParams,
        data_writer: RawWriter,
        signature_writer: *const RawWriter,
        key_packet_writer: RawWriter,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_message_write_closer_write(
        write_closer: Handle,
        data: *const u8,
        len: usize,
        out_written: *mut usize,
    ) -> RawError;
    pub fn pgp_message_write_closer_close(write_closer: Handle) -> RawError;
    pub fn pgp_message_write_closer_destroy(write_closer: Handle);

    // Decryption
    pub fn pgp_decrypt(
        params: *const DecryptionParams,
        data: *const u8,
        len: usize,
        encoding: u8,
        result: *mut PlaintextResult,
    ) -> RawError;
    pub fn pgp_decrypt_stream(
        params: *const DecryptionParams,
        reader: RawReader,
        encoding: u8,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_reader_read(reader: Handle, buf: *mut u8, len: usize, out_read: *mut usize) -> RawError;
    pub fn pgp_verification_reader_get_verify_result(reader: Handle, out: *mut Handle) -> RawError;
    pub fn pgp_reader_destroy(reader: Handle);

    // Signing
    pub fn pgp_sign(
        params: *const SigningParams,
        data: *const u8,
        len: usize,
        encoding: u8,
        detached: bool,
        writer: RawWriter,
    ) -> RawError;
    pub fn pgp_sign_stream(
        params: *const SigningParams,
        writer: RawWriter,
        encoding: u8,
        detached: bool,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_sign_cleartext(params: *const SigningParams, data: *const u8, len: usize, writer: RawWriter) -> RawError;

    // Verification
    pub fn pgp_verify_detached(
        params: *const VerificationParams,
        data: *const u8,
        len: usize,
        signature: *const u8,
        signature_len: usize,
        encoding: u8,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_verify_detached_stream(
        params: *const VerificationParams,
        reader: RawReader,
        signature: *const u8,
        signature_len: usize,
        encoding: u8,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_verify_inline(
        params: *const VerificationParams,
        data: *const u8,
        len: usize,
        encoding: u8,
        result: *mut PlaintextResult,
    ) -> RawError;
    pub fn pgp_verify_inline_stream(
        params: *const VerificationParams,
        reader: RawReader,
        encoding: u8,
        out: *mut Handle,
    ) -> RawError;
    pub fn pgp_verify_cleartext(
        params: *const VerificationParams,
        data: *const u8,
        len: usize,
        result: *mut PlaintextResult,
    ) -> RawError;
    pub fn pgp_verification_result_status(result: Handle, out: *mut c_int) -> RawError;
    pub fn pgp_verification_result_error(result: Handle, writer: RawWriter) -> RawError;
    pub fn pgp_verification_result_signature_count(result: Handle, out: *mut usize) -> RawError;
    pub fn pgp_verification_result_signature_details(
        result: Handle,
        index: usize,
        out: *mut SignatureDetailsRecord,
    ) -> RawError;
    pub fn pgp_verification_result_destroy(result: Handle);

    // Armor
    pub fn pgp_armor_message(data: *const u8, len: usize, block_type: u8, writer: RawWriter) -> RawError;
    pub fn pgp_armor_message_stream(writer: RawWriter, block_type: u8, out: *mut Handle) -> RawError;
    pub fn pgp_unarmor_message(data: *const u8, len: usize, writer: RawWriter) -> RawError;
    pub fn pgp_unarmor_message_stream(reader: RawReader, out: *mut Handle) -> RawError;

    // SRP
    pub fn srp_get_modulus_verification_key(out: *mut Handle) -> RawError;
    pub fn srp_hash_password(
        password: *const u8,
        password_len: usize,
        salt: *const u8,
        salt_len: usize,
        digest: *mut u8,
        digest_len: usize,
    ) -> RawError;
    pub fn srp_auth_create(params: *const SrpAuthParams, verification_key: Handle, out: *mut Handle) -> RawError;
    pub fn srp_auth_derive_verifier(auth: Handle, buf: *mut u8, len: usize, bit_length: c_int) -> RawError;
    pub fn srp_client_handshake_compute(
        auth: Handle,
        server_ephemeral: *const u8,
        server_ephemeral_len: usize,
        buffers: *const SrpClientHandshakeBuffers,
        bit_length: c_int,
        out: *mut Handle,
    ) -> RawError;
    pub fn srp_client_handshake_verify_proof(
        handshake: Handle,
        server_proof: *const u8,
        len: usize,
        out: *mut bool,
    ) -> RawError;
    pub fn srp_server_generate_handshake(
        params: *const SrpServerParams,
        secret: *const u8,
        secret_len: usize,
        ephemeral: *mut u8,
        ephemeral_len: usize,
        out: *mut Handle,
    ) -> RawError;
    pub fn srp_server_compute_exchange(
        server: Handle,
        client_proof: *const u8,
        client_proof_len: usize,
        client_ephemeral: *const u8,
        client_ephemeral_len: usize,
        server_proof: *mut u8,
        server_proof_len: usize,
    ) -> RawError;
    pub fn srp_auth_destroy(auth: Handle);
    pub fn srp_client_handshake_destroy(handshake: Handle);
    pub fn srp_server_destroy(server: Handle);
}
