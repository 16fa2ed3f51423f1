use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use payscope_core::config::PayScopeConfig;
use payscope_core::error::PayScopeError;
use payscope_jobs::RetryPolicy;
use payscope_mapper::MapperModelClient;
use payscope_objectstore::ObjectStoreGateway;
use payscope_stores::FactsStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Handles shared by every stage of one worker process's claim loop,
/// mirroring `apps/api-gateway/src/state.rs`'s "build once in `main`,
/// clone the `Arc`s per job" shape (spec.md §5: workers are OS-threaded
/// and CPU-pinned per stage, but share one process's connections).
#[derive(Clone)]
pub struct WorkerState {
    pub config: Arc<PayScopeConfig>,
    pub db_pool: PgPool,
    pub facts: Arc<FactsStore>,
    pub objects: Arc<ObjectStoreGateway>,
    pub audit: Arc<payscope_audit::AuditLedgerClient>,
    pub mapper_model: Arc<MapperModelClient>,
    pub retry_policy: RetryPolicy,
    pub http_client: reqwest::Client,
    pub audit_ledger_endpoint: String,
}

impl WorkerState {
    pub async fn build(config: PayScopeConfig) -> Result<Self, PayScopeError> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.worker_pool_size.max(1) as u32 * 2)
            .connect(&config.database_dsn)
            .await
            .map_err(|e| PayScopeError::DependencyUnavailable {
                dependency: "facts_store".to_string(),
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
        let audit = payscope_audit::AuditLedgerClient::new(http_client.clone(), config.audit_ledger_endpoint.clone());
        let mapper_model = MapperModelClient::new(
            http_client.clone(),
            config.llm_base_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        );
        let retry_policy = RetryPolicy::new(config.max_retries);
        let audit_ledger_endpoint = config.audit_ledger_endpoint.clone();

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            facts: Arc::new(facts),
            objects: Arc::new(objects),
            audit: Arc::new(audit),
            mapper_model: Arc::new(mapper_model),
            retry_policy,
            http_client,
            audit_ledger_endpoint,
        })
    }
}
