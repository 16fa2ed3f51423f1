use chrono::{DateTime, Utc};
use payscope_core::model::LifecycleStage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One vector-similarity hit surfaced by the RAG engine's retrieval fetch
/// (spec.md §4.11), trimmed to what an agent needs: which transaction it
/// points at and how strong the match was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub vector_id: String,
    pub score: f64,
    pub transaction_pk: Uuid,
    pub lifecycle_stage: LifecycleStage,
}

/// A transaction's merchant/lifecycle neighborhood from the graph
/// traversal fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNeighborhood {
    pub transaction_pk: Uuid,
    pub merchant_id: String,
    pub lifecycle_path: Vec<LifecycleStage>,
}

/// One point of a time-series window: a bucketed total the forecasting
/// agent treats as one observation of its input series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub bucket_time: DateTime<Utc>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesWindow {
    pub bank_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_amount: Decimal,
    pub points: Vec<TimeSeriesPoint>,
}

impl TimeSeriesWindow {
    pub fn empty(bank_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            bank_id,
            from,
            to,
            total_amount: Decimal::ZERO,
            points: Vec::new(),
        }
    }
}

/// Evidence assembled by the RAG engine's three-way retrieval fetch
/// (spec.md §4.11): vector similarity, graph traversal, and time-series
/// aggregation, all already scoped to one tenant. Agents read this and
/// nothing else — they never hold a store handle of their own (spec.md
/// §4.12 "never read or write outside the bound tenant context").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub bank_id: Uuid,
    pub vector_hits: Vec<VectorHit>,
    pub graph_neighborhoods: Vec<GraphNeighborhood>,
    pub timeseries: TimeSeriesWindow,
}

impl Evidence {
    /// True when all three retrieval fetches came back empty. Per
    /// spec.md §4.11, an empty-evidence query gets an explicit narrative
    /// instead of a hallucinated metric, and callers use this to decide
    /// that.
    pub fn is_empty(&self) -> bool {
        self.vector_hits.is_empty() && self.graph_neighborhoods.is_empty() && self.timeseries.points.is_empty()
    }
}

/// `run(task_id, inputs) -> AgentResult` output (spec.md §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: String,
    pub summary: String,
    pub metrics: serde_json::Value,
    pub confidence: f64,
    pub rationale: String,
}

impl AgentResult {
    pub fn timed_out(agent_name: &str) -> Self {
        Self {
            agent: agent_name.to_string(),
            summary: "agent exceeded its time budget".to_string(),
            metrics: serde_json::json!({}),
            confidence: 0.0,
            rationale: "timeout".to_string(),
        }
    }
}
