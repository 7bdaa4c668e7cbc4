// crates/types/src/job_id.rs
//! Opaque job identifiers.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing a job identifier from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobIdError {
    #[error("job id is not valid hex: {0}")]
    InvalidHex(String),

    #[error("job id must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// A 16-byte random job identifier, rendered as lowercase hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId([u8; JobId::LEN]);

impl JobId {
    /// Length of the raw identifier in bytes.
    pub const LEN: usize = 16;

    /// Generate a new identifier from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({self})")
    }
}

impl FromStr for JobId {
    type Err = JobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s).map_err(|e| JobIdError::InvalidHex(e.to_string()))?;
        let bytes: [u8; Self::LEN] =
            decoded
                .as_slice()
                .try_into()
                .map_err(|_| JobIdError::InvalidLength {
                    expected: Self::LEN,
                    actual: decoded.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
