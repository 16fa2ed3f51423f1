use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use payscope_core::config::PayScopeConfig;
use payscope_core::error::PayScopeError;
use payscope_objectstore::ObjectStoreGateway;
use payscope_stores::{FactsStore, GraphStore, TimeSeriesStore, VectorStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Handles the CLI needs for any subcommand, built once per invocation the
/// same way `apps/api-gateway`'s and `apps/pipeline-worker`'s state modules
/// do it. A short-lived CLI process has no use for the pool sizing the
/// long-running binaries tune for concurrency, so connections are capped
/// at one per pool.
#[derive(Clone)]
pub struct CliState {
    pub db_pool: PgPool,
    pub facts: Arc<FactsStore>,
    pub timeseries: Arc<TimeSeriesStore>,
    pub graph: Arc<GraphStore>,
    pub vector: Arc<VectorStore>,
    pub objects: Arc<ObjectStoreGateway>,
}

impl CliState {
    pub async fn build(config: &PayScopeConfig) -> Result<Self, PayScopeError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&config.database_dsn)
            .await
            .map_err(|e| PayScopeError::DependencyUnavailable {
                dependency: "facts_store".to_string(),
                detail: format!("failed to connect: {e}"),
            })?;

        let ts_pool = PgPoolOptions::new()
            .max_connections(1)
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

        let facts = FactsStore::new(db_pool.clone());
        let timeseries = TimeSeriesStore::new(ts_pool);
        let graph = GraphStore::new(http_client.clone(), config.graph_uri.clone(), config.graph_user.clone(), config.graph_password.clone());
        let vector = VectorStore::new(
            http_client,
            config.vector_endpoint.clone(),
            config.vector_key.clone(),
            config.vector_index.clone(),
            config.vector_namespace.clone(),
        );

        Ok(Self {
            db_pool,
            facts: Arc::new(facts),
            timeseries: Arc::new(timeseries),
            graph: Arc::new(graph),
            vector: Arc::new(vector),
            objects: Arc::new(objects),
        })
    }
}
