//! Process-wide defaults stored as JSON.
//!
//! A missing file means defaults. Unlike key material, nothing here is
//! sensitive, so the file is plain JSON.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bridge::DEFAULT_CHUNK_SIZE;
use crate::encrypt::PgpEncrypter;
use crate::environment::{clear_default_time_override, set_default_time_override, set_stream_chunk_size, FixedTime};
use crate::error::PgpError;
use crate::params::Compression;
use crate::secrets::EncryptionSecrets;
use crate::session_key::{PgpSessionKey, SymmetricCipher};

/// Binding layer defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PgpConfig {
    /// Unix seconds every call uses unless it brings its own time.
    #[serde(default)]
    pub default_time_override: Option<u64>,

    /// Cipher for generated session keys.
    #[serde(default)]
    pub default_cipher: SymmetricCipher,

    #[serde(default)]
    pub compression: Compression,

    /// Bytes per read when copying caller streams into the engine.
    #[serde(default = "default_stream_chunk_size")]
    pub stream_chunk_size: usize,
}

impl Default for PgpConfig {
    fn default() -> Self {
        Self {
            default_time_override: None,
            default_cipher: SymmetricCipher::default(),
            compression: Compression::default(),
            stream_chunk_size: default_stream_chunk_size(),
        }
    }
}

const fn default_stream_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl PgpConfig {
    /// # Errors
    ///
    /// Returns [`PgpError::Config`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, PgpError> {
        serde_json::from_str(json).map_err(|e| PgpError::Config(e.to_string()))
    }

    /// Read the config at `path`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Io`] if the file exists but cannot be read and
    /// [`PgpError::Config`] if it is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, PgpError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write to `path` through a temporary sibling and a rename.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Io`] if the directory is missing or the write
    /// or rename fails.
    pub fn save(&self, path: &Path) -> Result<(), PgpError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| PgpError::Config(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Install the time override and chunk size process-wide.
    pub fn apply(&self) {
        match self.default_time_override {
            Some(seconds) => set_default_time_override(Arc::new(FixedTime::from_unix(seconds))),
            None => clear_default_time_override(),
        }
        set_stream_chunk_size(self.stream_chunk_size);
        tracing::debug!(
            time_override = self.default_time_override.is_some(),
            chunk = self.stream_chunk_size,
            "config applied"
        );
    }

    /// An encrypter carrying the configured compression.
    #[must_use]
    pub fn encrypter<'a>(&self, secrets: impl Into<EncryptionSecrets<'a>>) -> PgpEncrypter<'a> {
        PgpEncrypter::new(secrets).with_compression(self.compression)
    }

    /// A fresh session key with the configured cipher.
    ///
    /// # Errors
    ///
    /// As [`PgpSessionKey::generate`].
    pub fn generate_session_key(&self) -> Result<PgpSessionKey, PgpError> {
        PgpSessionKey::generate(self.default_cipher)
    }
}
