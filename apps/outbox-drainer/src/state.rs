use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use payscope_core::config::PayScopeConfig;
use payscope_core::error::PayScopeError;
use payscope_objectstore::ObjectStoreGateway;
use payscope_rag::EmbeddingClient;
use payscope_stores::{GraphStore, TimeSeriesStore, VectorStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Handles shared by the drainer's per-destination claim loops, built once
/// in `main` the same way `apps/pipeline-worker/src/state.rs` does it.
#[derive(Clone)]
pub struct DrainerState {
    pub config: Arc<PayScopeConfig>,
    pub db_pool: PgPool,
    pub objects: Arc<ObjectStoreGateway>,
    pub timeseries: Arc<TimeSeriesStore>,
    pub graph: Arc<GraphStore>,
    pub vector: Arc<VectorStore>,
    pub audit: Arc<payscope_audit::AuditLedgerClient>,
    pub embedding: Arc<EmbeddingClient>,
}

impl DrainerState {
    pub async fn build(config: PayScopeConfig) -> Result<Self, PayScopeError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.worker_pool_size.max(1) as u32 * 2)
            .connect(&config.database_dsn)
            .await
            .map_err(|e| PayScopeError::DependencyUnavailable {
                dependency: "facts_store".to_string(),
                detail: format!("failed to connect: {e}"),
            })?;

        let timeseries_pool = PgPoolOptions::new()
            .max_connections(config.worker_pool_size.max(1) as u32)
            .connect(&config.timeseries_dsn)
            .await
            .map_err(|e| PayScopeError::DependencyUnavailable {
                dependency: "timeseries_store".to_string(),
                detail: format!("failed to connect: {e}"),
            })?;

        let http_client = reqwest::Client::new();

        let s3: Arc<dyn ObjectStore> = Arc::new(
            AmazonS3Builder::new()
                .with_endpoint(&config.object_store_endpoint)
                .with_access_key_id(&config.object_store_access_key)
                .with_secret_access_key(&config.object_store_secret_key)
                .with_bucket_name(&config.object_store_bucket)
                .with_allow_http(config.object_store_endpoint.starts_with("http://"))
                .build()
                .map_err(|e| PayScopeError::Configuration {
                    detail: format!("invalid object store configuration: {e}"),
                })?,
        );
        let objects = ObjectStoreGateway::new(s3, true)?;

        let graph = GraphStore::new(http_client.clone(), config.graph_uri.clone(), config.graph_user.clone(), config.graph_password.clone());
        let vector = VectorStore::new(
            http_client.clone(),
            config.vector_endpoint.clone(),
            config.vector_key.clone(),
            config.vector_index.clone(),
            config.vector_namespace.clone(),
        );
        let audit = payscope_audit::AuditLedgerClient::new(http_client.clone(), config.audit_ledger_endpoint.clone());
        let embedding = EmbeddingClient::new(http_client, config.llm_base_url.clone(), config.llm_api_key.clone(), config.llm_model.clone());

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            objects: Arc::new(objects),
            timeseries: Arc::new(TimeSeriesStore::new(timeseries_pool)),
            graph: Arc::new(graph),
            vector: Arc::new(vector),
            audit: Arc::new(audit),
            embedding: Arc::new(embedding),
        })
    }
}
