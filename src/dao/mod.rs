//! Persistence boundary: entities, the storage trait, and its backends.

/// Question bank abstraction and the JSON-file backed implementation.
pub mod bank;
/// Entities shared between the storage layer and the services.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
/// Game store abstraction and the in-memory implementation.
pub mod store;
