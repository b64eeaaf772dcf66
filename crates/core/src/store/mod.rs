//! Reference storage implementations.

mod memory;

pub use memory::InMemoryStore;
