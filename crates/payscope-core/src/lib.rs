//! Canonical types, error taxonomy, and configuration shared by every
//! PayScope crate and binary. No crate in the workspace talks to a store,
//! the network, or the filesystem without going through types defined here.

pub mod canonical_json;
pub mod config;
pub mod error;
pub mod iso4217;
pub mod model;

pub use config::PayScopeConfig;
pub use error::{PayScopeError, Result};
