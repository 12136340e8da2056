//! Backend implementations that do not need a network

pub mod in_memory;

pub use in_memory::{ApiCall, InMemoryPaymentsApi};
