//! Canonical byte form for persisted documents.
//!
//! One module owns how documents become bytes so the round-trip rewrite in
//! the store compares like with like: pretty-printed JSON with a trailing
//! newline, stable across load/save cycles.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::KernelError;

/// Serializer collaborator handed to plugins alongside the kernel context.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCodec;

impl DocumentCodec {
    /// Canonical bytes for a document.
    pub fn to_bytes<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, KernelError> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_bytes<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, KernelError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
