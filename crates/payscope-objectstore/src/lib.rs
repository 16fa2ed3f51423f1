//! Object store gateway (C1): deterministic key layout over raw artifacts
//! and their derived JSON, backed by any `object_store::ObjectStore`
//! implementation (S3-compatible in production, in-memory in tests).

pub mod gateway;
pub mod keys;

pub use gateway::{ObjectHead, ObjectStoreGateway};
