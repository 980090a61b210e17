//! Backend contracts: the `Storage` and `Hash` traits the controller is
//! injected with, plus a reference in-memory `Storage` and a SHA-256 `Hash`
//! provider for tests and small deployments.
//!
//! Only built under the `std` feature: the async traits, the default hash
//! provider, and the in-memory backend all need an allocator-backed runtime
//! (`tokio::sync::Mutex`, `sha2`) that the `no_std` core does not require.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest as _, Sha256};
use tokio::sync::Mutex;

use crate::error::CasError;
use crate::key::{Digest, Key};

/// A key→bytes store. All three methods may suspend (storage I/O).
/// Implementations must be content-idempotent: putting identical bytes
/// twice under the same key is a no-op, not an error.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn put(&self, key: Key, bytes: Vec<u8>) -> Result<(), CasError>;
    async fn get(&self, key: &Key) -> Result<Option<Vec<u8>>, CasError>;
    async fn has(&self, key: &Key) -> Result<bool, CasError>;
}

/// A bytes→digest provider. Deterministic; same input always yields the
/// same digest.
#[async_trait]
pub trait Hash: Send + Sync {
    async fn sha256(&self, bytes: &[u8]) -> Digest;
}

/// An in-memory `Storage` backed by a mutex-guarded map, for tests and
/// single-process deployments. Defensively copies bytes on both `put` and
/// `get` so callers can never alias the store's internal buffer.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<HashMap<Key, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Number of distinct keys currently stored. Handy in tests.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn put(&self, key: Key, bytes: Vec<u8>) -> Result<(), CasError> {
        let mut guard = self.inner.lock().await;
        guard.entry(key).or_insert(bytes);
        Ok(())
    }

    async fn get(&self, key: &Key) -> Result<Option<Vec<u8>>, CasError> {
        let guard = self.inner.lock().await;
        Ok(guard.get(key).cloned())
    }

    async fn has(&self, key: &Key) -> Result<bool, CasError> {
        let guard = self.inner.lock().await;
        Ok(guard.contains_key(key))
    }
}

/// The default `Hash` provider: plain SHA-256 via `sha2`.
#[derive(Clone, Copy, Default)]
pub struct Sha256Hash;

#[async_trait]
impl Hash for Sha256Hash {
    async fn sha256(&self, bytes: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let out = hasher.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&out);
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> Key {
        Key::from_digest([b; 32])
    }

    #[tokio::test]
    async fn in_memory_storage_round_trip() {
        let storage = InMemoryStorage::new();
        assert!(!storage.has(&key(1)).await.unwrap());
        storage.put(key(1), vec![1, 2, 3]).await.unwrap();
        assert!(storage.has(&key(1)).await.unwrap());
        assert_eq!(storage.get(&key(1)).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(storage.get(&key(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_is_idempotent_first_writer_wins() {
        let storage = InMemoryStorage::new();
        storage.put(key(1), vec![1, 2, 3]).await.unwrap();
        storage.put(key(1), vec![9, 9, 9]).await.unwrap();
        assert_eq!(storage.get(&key(1)).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn sha256_hash_is_deterministic() {
        let hasher = Sha256Hash;
        let a = hasher.sha256(b"hello world").await;
        let b = hasher.sha256(b"hello world").await;
        assert_eq!(a, b);
        let c = hasher.sha256(b"hello worlD").await;
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn empty_input_hashes_to_known_sha256_digest() {
        let hasher = Sha256Hash;
        let got = hasher.sha256(b"").await;
        let expected = crate::bytes::from_hex(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );
        assert_eq!(Some(got.to_vec()), expected);
    }
}
