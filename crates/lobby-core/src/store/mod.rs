//! Channel store implementations

mod memory;

pub use memory::MemoryStore;
