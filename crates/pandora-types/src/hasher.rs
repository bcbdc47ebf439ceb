use std::hash::{Hash, Hasher};

use crate::error::TypeError;

/// Domain-separated BLAKE3 content fingerprinting.
///
/// Each hasher carries a domain tag that is prepended to every computation, so
/// two element types with identical bytes still produce different
/// fingerprints. Unlike `std`'s `DefaultHasher`, the output is stable across
/// processes and toolchain versions.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for collection items.
    pub const ITEM: Self = Self {
        domain: "pandora-item-v1",
    };
    /// Hasher for JSON documents.
    pub const JSON: Self = Self {
        domain: "pandora-json-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Fingerprint raw bytes.
    pub fn hash_bytes(&self, data: &[u8]) -> u64 {
        let mut hasher = self.start();
        hasher.update(data);
        fold(&hasher)
    }

    /// Fingerprint any value implementing [`std::hash::Hash`].
    pub fn hash_value<T: Hash + ?Sized>(&self, value: &T) -> u64 {
        let mut state = Blake3State(self.start());
        value.hash(&mut state);
        state.finish()
    }

    /// Fingerprint a serializable value through its JSON encoding.
    pub fn hash_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<u64, TypeError> {
        let data =
            serde_json::to_vec(value).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(self.hash_bytes(&data))
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

/// Mix `value` into an accumulated fingerprint.
///
/// Use this to build a content hash out of several fields.
pub fn hash_combine<T: Hash + ?Sized>(seed: &mut u64, value: &T) {
    let h = ContentHasher::ITEM.hash_value(value);
    *seed ^= h
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

struct Blake3State(blake3::Hasher);

impl Hasher for Blake3State {
    fn finish(&self) -> u64 {
        fold(&self.0)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }
}

fn fold(hasher: &blake3::Hasher) -> u64 {
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}
