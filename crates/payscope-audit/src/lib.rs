//! Audit ledger client (C10): canonical JSON hashing, idempotent
//! append-only event writes, and off-chain companion rows for
//! reproducibility auditing.

pub mod client;
pub mod companion;

pub use client::AuditLedgerClient;
pub use companion::record_companion;
