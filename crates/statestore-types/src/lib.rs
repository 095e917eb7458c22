//! Common types module for the statestore system.
//!
//! This module defines the data types shared by the configuration, storage
//! and service crates: the order record and its stored envelope, the fixed
//! state keys, HTTP error payloads, and the configuration validation
//! framework used by every backend.

/// API types for HTTP endpoints and error responses.
pub mod api;
/// Order record, stored envelope and the order codec.
pub mod order;
/// Registry trait for self-registering backend implementations.
pub mod registry;
/// Storage keys used by the state service.
pub mod storage;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use validation::*;
