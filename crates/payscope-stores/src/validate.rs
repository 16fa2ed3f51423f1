use payscope_core::error::PayScopeError;
use serde::Serialize;
use uuid::Uuid;

use crate::facts::FactsStore;
use crate::graph::GraphStore;
use crate::timeseries::TimeSeriesStore;
use crate::vector::VectorStore;

/// Response shape for `GET /admin/validate-datasets` (spec.md §4.15).
#[derive(Debug, Clone, Serialize)]
pub struct DatasetCounts {
    pub facts_rows: i64,
    pub ts_rows: i64,
    pub graph_nodes: i64,
    pub vector_records: i64,
}

/// Queries all four stores for `bank_id`'s row/node/record counts. Each
/// store is queried independently; a single store being unreachable fails
/// the whole call rather than returning a partially-populated count that
/// could be mistaken for a consistent snapshot.
pub async fn count_rows(
    facts: &FactsStore,
    ts: &TimeSeriesStore,
    graph: &GraphStore,
    vector: &VectorStore,
    bank_id: Uuid,
) -> Result<DatasetCounts, PayScopeError> {
    let facts_rows = facts.transaction_count(bank_id).await?;
    let ts_rows = ts.row_count(bank_id).await?;
    let graph_nodes = graph.node_count(bank_id).await?;
    let vector_records = vector.record_count(bank_id).await?;

    Ok(DatasetCounts {
        facts_rows,
        ts_rows,
        graph_nodes,
        vector_records,
    })
}
