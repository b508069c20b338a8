use std::sync::{Mutex, MutexGuard};

use dcmlens_types::ContentDigest;

/// Default number of stripes.
pub const DEFAULT_STRIPES: usize = 64;

/// A fixed array of mutexes keyed by content digest.
///
/// Uploads with the same digest always take the same stripe, so the
/// lookup, write and record steps for identical bytes never interleave.
/// Unrelated digests rarely share a stripe.
#[derive(Debug)]
pub struct StripedLocks {
    stripes: Vec<Mutex<()>>,
}

impl StripedLocks {
    pub fn new(count: usize) -> Self {
        let count = count.max(1);
        Self {
            stripes: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn stripe_for(&self, digest: &ContentDigest) -> usize {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.stripes.len() as u64) as usize
    }

    pub fn lock(&self, digest: &ContentDigest) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned stripe carries no state.
        let stripe = &self.stripes[self.stripe_for(digest)];
        stripe.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
