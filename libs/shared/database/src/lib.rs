pub mod locks;
pub mod memory;

pub use locks::{KeyedLocks, LockSet};
pub use memory::InMemoryTable;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key {key} in table {table}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("timed out waiting for locks {keys}")]
    LockTimeout { keys: String },
}
