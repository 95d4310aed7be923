//! The narrow key-value storage contract this crate consumes (§4.4).
//!
//! The real store — a merklized, transactional KV engine — lives outside this
//! crate entirely. These traits are this crate's view of it: raw bytes in,
//! raw bytes out, async so a real embedder can back them with an on-disk read.
//! `InMemoryStore` is the reference implementation used by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

#[async_trait]
pub trait StateRead: Send + Sync {
    async fn get_raw(&self, key: &str) -> Option<Vec<u8>>;
}

#[async_trait]
pub trait StateWrite: StateRead {
    async fn put_raw(&self, key: String, value: Vec<u8>);
    async fn delete_raw(&self, key: &str);
}

/// A process-local, non-persistent store. Every write is immediately visible
/// to the next read — there is no surrounding host transaction to roll back
/// within, so "atomic commit" degenerates to "every write lands".
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateRead for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl StateWrite for InMemoryStore {
    async fn put_raw(&self, key: String, value: Vec<u8>) {
        self.data.write().unwrap().insert(key, value);
    }

    async fn delete_raw(&self, key: &str) {
        self.data.write().unwrap().remove(key);
    }
}
