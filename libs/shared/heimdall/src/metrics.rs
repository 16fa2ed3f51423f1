//! Prometheus metrics registry shared by every PayScope binary. Counters
//! and histograms match the names in `spec.md`'s glossary so a dashboard
//! built against the spec's terminology lines up with what is actually
//! exported.

use once_cell::sync::Lazy;
use prometheus::{
    HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};

pub struct Metrics {
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub chat_queries_total: IntCounterVec,
    pub chat_query_duration_seconds: HistogramVec,
    pub agent_executions_total: IntCounterVec,
    pub agent_execution_duration_seconds: HistogramVec,
    pub db_queries_total: IntCounterVec,
    pub db_query_duration_seconds: HistogramVec,
    pub vector_searches_total: IntCounterVec,
    pub vector_search_duration_seconds: HistogramVec,
    pub errors_total: IntCounterVec,
    pub active_connections: IntGauge,
    registry: Registry,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            prometheus::Opts::new("http_requests_total", "HTTP requests received, by route and status"),
            &["route", "method", "status"],
        )
        .expect("metric definition is valid");
        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("http_request_duration_seconds", "HTTP request latency"),
            &["route", "method"],
        )
        .expect("metric definition is valid");
        let chat_queries_total = IntCounterVec::new(
            prometheus::Opts::new("chat_queries_total", "Chat queries handled, by intent"),
            &["intent"],
        )
        .expect("metric definition is valid");
        let chat_query_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("chat_query_duration_seconds", "Chat query end-to-end latency"),
            &["intent"],
        )
        .expect("metric definition is valid");
        let agent_executions_total = IntCounterVec::new(
            prometheus::Opts::new("agent_executions_total", "Agent runs, by agent and outcome"),
            &["agent", "outcome"],
        )
        .expect("metric definition is valid");
        let agent_execution_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("agent_execution_duration_seconds", "Agent run latency"),
            &["agent"],
        )
        .expect("metric definition is valid");
        let db_queries_total = IntCounterVec::new(
            prometheus::Opts::new("db_queries_total", "Database queries issued, by store and outcome"),
            &["store", "outcome"],
        )
        .expect("metric definition is valid");
        let db_query_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("db_query_duration_seconds", "Database query latency"),
            &["store"],
        )
        .expect("metric definition is valid");
        let vector_searches_total = IntCounterVec::new(
            prometheus::Opts::new("vector_searches_total", "Vector similarity queries issued, by outcome"),
            &["outcome"],
        )
        .expect("metric definition is valid");
        let vector_search_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("vector_search_duration_seconds", "Vector similarity query latency"),
            &[] as &[&str],
        )
        .expect("metric definition is valid");
        let errors_total = IntCounterVec::new(
            prometheus::Opts::new("errors_total", "Errors raised, by error_class"),
            &["error_class"],
        )
        .expect("metric definition is valid");
        let active_connections = IntGauge::new("active_connections", "Open database pool connections").expect("metric definition is valid");

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(http_request_duration_seconds.clone()),
            Box::new(chat_queries_total.clone()),
            Box::new(chat_query_duration_seconds.clone()),
            Box::new(agent_executions_total.clone()),
            Box::new(agent_execution_duration_seconds.clone()),
            Box::new(db_queries_total.clone()),
            Box::new(db_query_duration_seconds.clone()),
            Box::new(vector_searches_total.clone()),
            Box::new(vector_search_duration_seconds.clone()),
            Box::new(errors_total.clone()),
            Box::new(active_connections.clone()),
        ] {
            registry.register(collector).expect("metric name is unique within the registry");
        }

        Self {
            http_requests_total,
            http_request_duration_seconds,
            chat_queries_total,
            chat_query_duration_seconds,
            agent_executions_total,
            agent_execution_duration_seconds,
            db_queries_total,
            db_query_duration_seconds,
            vector_searches_total,
            vector_search_duration_seconds,
            errors_total,
            active_connections,
            registry,
        }
    }

    /// Renders the registry in Prometheus text exposition format, for the
    /// `/metrics` endpoint (spec.md §6).
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).unwrap_or_default()
    }
}

pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_includes_every_named_series() {
        METRICS.http_requests_total.with_label_values(&["/upload", "POST", "202"]).inc();
        METRICS.chat_queries_total.with_label_values(&["ANOMALY"]).inc();
        METRICS.errors_total.with_label_values(&["dependency_unavailable"]).inc();
        let body = METRICS.encode();
        assert!(body.contains("http_requests_total"));
        assert!(body.contains("chat_queries_total"));
        assert!(body.contains("errors_total"));
    }
}
