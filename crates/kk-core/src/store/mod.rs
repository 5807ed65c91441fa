//! In-process store implementations.

pub mod memory;

pub use memory::{MemoryCategoryStore, MemorySavedStore};
