//! Hash writers that accumulate canonical key fragments.

use std::fmt;

/// Sink for canonical key fragments.
///
/// Fragments are consumed in exactly the order they are written. Writers
/// never reorder or deduplicate; ordering is the caller's responsibility.
pub trait HashWriter {
    fn write_str(&mut self, value: &str);
}

/// Accumulates the canonical text itself. Used to inspect derived keys.
impl HashWriter for String {
    fn write_str(&mut self, value: &str) {
        self.push_str(value);
    }
}

/// A fixed-width digest identifying a dispatch request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchCacheKey([u8; 32]);

impl DispatchCacheKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for DispatchCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DispatchCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DispatchCacheKey({self})")
    }
}

/// Streams fragments into a BLAKE3 hasher.
#[derive(Default)]
pub struct KeyHasher {
    inner: blake3::Hasher,
}

impl KeyHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the hasher and returns the final key.
    pub fn finalize(self) -> DispatchCacheKey {
        DispatchCacheKey(self.inner.finalize().into())
    }
}

impl HashWriter for KeyHasher {
    fn write_str(&mut self, value: &str) {
        self.inner.update(value.as_bytes());
    }
}
