use dcmlens_types::ContentDigest;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"dcmlens-upload-v1"`) that is
/// prepended to every hash computation. No keys or salts are involved, so a
/// digest computed today matches one computed after a restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for uploaded file bytes (the deduplication key).
    pub const UPLOAD: Self = Self {
        domain: "dcmlens-upload-v1",
    };

    /// Digest raw bytes with domain separation.
    pub fn digest(&self, data: &[u8]) -> ContentDigest {
        let mut hasher = self.start();
        hasher.update(data);
        ContentDigest::from_hash(*hasher.finalize().as_bytes())
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}
