//! Cyclic XOR body transform.
//!
//! `out[i] = data[i] ^ key[i % key.len()]`. Applying it twice with the same
//! key yields the input again. The key offset restarts at zero on every call.

use std::sync::Arc;

use thiserror::Error;

/// Errors building a [`TransformKey`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("transform key must not be empty")]
    Empty,
}

/// Immutable, non-empty XOR key shared by every connection.
#[derive(Clone, PartialEq, Eq)]
pub struct TransformKey(Arc<[u8]>);

impl TransformKey {
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self, KeyError> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(Arc::from(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Keeps key material out of logs.
impl std::fmt::Debug for TransformKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransformKey({} bytes)", self.0.len())
    }
}

/// Transform `data` into a new buffer.
pub fn transform(data: &[u8], key: &TransformKey) -> Vec<u8> {
    let mut out = data.to_vec();
    apply_in_place(&mut out, key);
    out
}

/// Transform `data` in place.
pub fn apply_in_place(data: &mut [u8], key: &TransformKey) {
    for (byte, k) in data.iter_mut().zip(key.as_bytes().iter().cycle()) {
        *byte ^= k;
    }
}
