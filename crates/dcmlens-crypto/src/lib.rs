//! Content hashing for dcmlens.
//!
//! Provides the domain-separated BLAKE3 hasher that turns uploaded bytes into
//! a [`ContentDigest`](dcmlens_types::ContentDigest). All hashing wraps the
//! `blake3` crate; there is no custom cryptography here.

pub mod hasher;

pub use hasher::ContentHasher;
