//! The four canonical stores (C2): facts (relational), time-series
//! (append-only), graph (node/edge traversal), and vector (similarity
//! search), plus the durable outbox that fans facts-store writes out to
//! the other three.

pub mod facts;
pub mod graph;
pub mod outbox;
pub mod timeseries;
pub mod validate;
pub mod vector;

pub use facts::FactsStore;
pub use graph::GraphStore;
pub use timeseries::TimeSeriesStore;
pub use vector::{VectorMatch, VectorMetadata, VectorStore};
