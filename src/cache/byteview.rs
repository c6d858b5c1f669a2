//! Byte View Module
//!
//! Immutable view over cached bytes.

use std::fmt;

use bytes::Bytes;

use crate::cache::ByteSize;

// == Byte View ==
/// Read-only value handed out by the cache.
///
/// Backed by `Bytes`, so clones share one allocation and nothing can
/// mutate the buffer in place. Extracting an owned `Vec` always copies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    b: Bytes,
}

impl ByteView {
    /// Creates a view by copying the given slice.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            b: Bytes::copy_from_slice(data),
        }
    }

    /// Number of bytes in the view.
    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    /// Returns a defensive copy of the bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.b.to_vec()
    }

    /// Borrows the bytes without copying.
    pub fn as_slice(&self) -> &[u8] {
        &self.b
    }

    /// Cheap, still immutable handle to the underlying buffer.
    pub fn bytes(&self) -> Bytes {
        self.b.clone()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(v: Vec<u8>) -> Self {
        Self { b: Bytes::from(v) }
    }
}

impl From<Bytes> for ByteView {
    fn from(b: Bytes) -> Self {
        Self { b }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::copy_from_slice(s.as_bytes())
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.b))
    }
}

impl ByteSize for ByteView {
    fn byte_size(&self) -> usize {
        self.len()
    }
}
