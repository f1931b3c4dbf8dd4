//! Storage adapters behind the domain ports, plus the change feed that couples the stores to
//! the processing stage.

pub mod change_feed;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
