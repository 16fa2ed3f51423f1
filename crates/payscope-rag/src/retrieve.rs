use chrono::{DateTime, Utc};
use payscope_agents::{Evidence, GraphNeighborhood, TimeSeriesPoint, TimeSeriesWindow, VectorHit};
use payscope_core::error::PayScopeError;
use payscope_core::model::LifecycleStage;
use payscope_stores::{GraphStore, TimeSeriesStore, VectorStore};
use tracing::instrument;
use uuid::Uuid;

use crate::embedding::EmbeddingClient;

/// How many recently-touched transaction neighborhoods the graph fetch
/// pulls per query. Kept small: agents reason over a handful of
/// neighborhoods, not the whole tenant graph.
const GRAPH_NEIGHBORHOOD_LIMIT: i64 = 50;
const VECTOR_TOP_K: usize = 20;

/// `retrieve(context) -> Evidence` (spec.md §4.11): runs the vector,
/// graph, and time-series fetches concurrently, all scoped to `bank_id`.
/// A single fetch failing does not fail the whole retrieval — it comes
/// back empty and is reflected in the composed response's confidence,
/// same as the agents' own empty-evidence handling.
#[instrument(skip(vector_store, graph_store, timeseries_store, embedding_client, query))]
pub async fn retrieve(
    bank_id: Uuid,
    query: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    vector_store: &VectorStore,
    graph_store: &GraphStore,
    timeseries_store: &TimeSeriesStore,
    embedding_client: &EmbeddingClient,
) -> Evidence {
    let (vector_hits, graph_neighborhoods, timeseries) = futures::join!(
        fetch_vector_hits(bank_id, query, vector_store, embedding_client),
        fetch_graph_neighborhoods(bank_id, graph_store),
        fetch_timeseries(bank_id, from, to, timeseries_store),
    );

    Evidence {
        bank_id,
        vector_hits,
        graph_neighborhoods,
        timeseries,
    }
}

async fn fetch_vector_hits(bank_id: Uuid, query: &str, vector_store: &VectorStore, embedding_client: &EmbeddingClient) -> Vec<VectorHit> {
    let embedding = match embedding_client.embed(query).await {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "query embedding failed, retrieval proceeds without vector evidence");
            return Vec::new();
        }
    };

    match vector_store.query_similar(bank_id, None, &embedding, VECTOR_TOP_K).await {
        Ok(matches) => matches
            .into_iter()
            .map(|m| VectorHit {
                vector_id: m.vector_id,
                score: m.score,
                transaction_pk: m.metadata.transaction_pk,
                lifecycle_stage: m.metadata.lifecycle_stage,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "vector retrieval failed");
            Vec::new()
        }
    }
}

async fn fetch_graph_neighborhoods(bank_id: Uuid, graph_store: &GraphStore) -> Vec<GraphNeighborhood> {
    match graph_store.recent_neighborhoods(bank_id, GRAPH_NEIGHBORHOOD_LIMIT).await {
        Ok(rows) => rows
            .into_iter()
            .map(|(transaction_pk, merchant_id, lifecycle_path): (Uuid, String, Vec<LifecycleStage>)| GraphNeighborhood {
                transaction_pk,
                merchant_id,
                lifecycle_path,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "graph retrieval failed");
            Vec::new()
        }
    }
}

async fn fetch_timeseries(bank_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>, timeseries_store: &TimeSeriesStore) -> TimeSeriesWindow {
    let (total, buckets) = futures::join!(
        timeseries_store.aggregate_range(bank_id, from, to),
        timeseries_store.bucketed_range(bank_id, from, to),
    );

    let total_amount = total.unwrap_or_else(|e: PayScopeError| {
        tracing::warn!(error = %e, "time-series total aggregation failed");
        rust_decimal::Decimal::ZERO
    });
    let points = buckets
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "time-series bucket fetch failed");
            Vec::new()
        })
        .into_iter()
        .map(|(bucket_time, amount)| TimeSeriesPoint { bucket_time, amount })
        .collect();

    TimeSeriesWindow { bank_id, from, to, total_amount, points }
}
