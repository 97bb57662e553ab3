pub mod ledger;
pub mod local;
pub mod memory;

use crate::error::Result;
use async_trait::async_trait;

pub use ledger::Ledger;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

/// Durable key/value storage for everything the mirror persists.
///
/// Each call is atomic for its own key; there are no multi-key transactions.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Deleting a missing key succeeds
    async fn delete(&self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, in ascending order
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
