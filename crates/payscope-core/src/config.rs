use crate::error::PayScopeError;

/// Process-wide configuration, loaded once from the environment (populated
/// from `.env` via `dotenvy` in each binary's `main`). Fields required for
/// a given binary to run but missing from the environment are a
/// configuration error (process exit code 2).
#[derive(Debug, Clone)]
pub struct PayScopeConfig {
    pub env: String,
    pub log_level: String,

    pub database_dsn: String,
    pub timeseries_dsn: String,
    pub redis_url: String,

    pub object_store_endpoint: String,
    pub object_store_access_key: String,
    pub object_store_secret_key: String,
    pub object_store_bucket: String,

    pub graph_uri: String,
    pub graph_user: String,
    pub graph_password: String,

    pub vector_endpoint: String,
    pub vector_key: String,
    pub vector_index: String,
    pub vector_namespace: String,

    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,

    pub mapping_confidence_threshold: f64,
    pub max_retries: u32,
    pub stage_timeout_seconds: u64,
    pub dlq_enabled: bool,

    pub token_public_key: String,
    pub audit_ledger_endpoint: String,

    pub port: u16,
    pub worker_pool_size: usize,
    pub retention_days_raw: Option<u32>,
    pub retention_days_aggregated: Option<u32>,
}

fn required(name: &str) -> Result<String, PayScopeError> {
    std::env::var(name).map_err(|_| PayScopeError::Configuration {
        detail: format!("missing required environment variable {name}"),
    })
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, PayScopeError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| PayScopeError::Configuration {
            detail: format!("{name} could not be parsed: {raw}"),
        }),
        Err(_) => Ok(default),
    }
}

fn optional_u32(name: &str) -> Result<Option<u32>, PayScopeError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| PayScopeError::Configuration {
                detail: format!("{name} could not be parsed: {raw}"),
            }),
        Err(_) => Ok(None),
    }
}

impl PayScopeConfig {
    /// Loads configuration from the process environment. Call after
    /// `dotenvy::dotenv().ok()` so a local `.env` file is already hydrated.
    pub fn from_env() -> Result<Self, PayScopeError> {
        Ok(Self {
            env: optional("ENV", "development"),
            log_level: optional("LOG_LEVEL", "info"),

            database_dsn: required("DATABASE_DSN")?,
            timeseries_dsn: required("TIMESERIES_DSN")?,
            redis_url: required("REDIS_URL")?,

            object_store_endpoint: required("OBJECT_STORE_ENDPOINT")?,
            object_store_access_key: required("OBJECT_STORE_ACCESS_KEY")?,
            object_store_secret_key: required("OBJECT_STORE_SECRET_KEY")?,
            object_store_bucket: required("OBJECT_STORE_BUCKET")?,

            graph_uri: required("GRAPH_URI")?,
            graph_user: required("GRAPH_USER")?,
            graph_password: required("GRAPH_PASSWORD")?,

            vector_endpoint: required("VECTOR_ENDPOINT")?,
            vector_key: required("VECTOR_KEY")?,
            vector_index: required("VECTOR_INDEX")?,
            vector_namespace: required("VECTOR_NAMESPACE")?,

            llm_base_url: required("LLM_BASE_URL")?,
            llm_api_key: required("LLM_API_KEY")?,
            llm_model: optional("LLM_MODEL", "default"),

            mapping_confidence_threshold: optional_parsed("MAPPING_CONFIDENCE_THRESHOLD", 0.75)?,
            max_retries: optional_parsed("MAX_RETRIES", 5)?,
            stage_timeout_seconds: optional_parsed("STAGE_TIMEOUT_SECONDS", 30)?,
            dlq_enabled: optional_parsed("DLQ_ENABLED", true)?,

            token_public_key: required("TOKEN_PUBLIC_KEY")?,
            audit_ledger_endpoint: required("AUDIT_LEDGER_ENDPOINT")?,

            port: optional_parsed("PORT", 8080)?,
            worker_pool_size: optional_parsed("WORKER_POOL_SIZE", 4)?,
            retention_days_raw: optional_u32("RETENTION_DAYS_RAW")?,
            retention_days_aggregated: optional_u32("RETENTION_DAYS_AGGREGATED")?,
        })
    }

    /// Whether the retention sweep should run at all; disabled unless an
    /// operator has opted in by setting `RETENTION_DAYS_RAW` (spec.md §3.2).
    pub fn retention_enabled(&self) -> bool {
        self.retention_days_raw.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn required_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_DSN", "postgres://localhost/payscope"),
            ("TIMESERIES_DSN", "postgres://localhost/payscope_ts"),
            ("REDIS_URL", "redis://localhost"),
            ("OBJECT_STORE_ENDPOINT", "https://objects.local"),
            ("OBJECT_STORE_ACCESS_KEY", "key"),
            ("OBJECT_STORE_SECRET_KEY", "secret"),
            ("OBJECT_STORE_BUCKET", "payscope"),
            ("GRAPH_URI", "bolt://localhost:7687"),
            ("GRAPH_USER", "neo4j"),
            ("GRAPH_PASSWORD", "pw"),
            ("VECTOR_ENDPOINT", "https://vector.local"),
            ("VECTOR_KEY", "vkey"),
            ("VECTOR_INDEX", "payscope"),
            ("VECTOR_NAMESPACE", "default"),
            ("LLM_BASE_URL", "https://llm.local"),
            ("LLM_API_KEY", "lkey"),
            ("TOKEN_PUBLIC_KEY", "-----BEGIN PUBLIC KEY-----"),
            ("AUDIT_LEDGER_ENDPOINT", "https://audit.local"),
        ]
    }

    #[test]
    fn loads_defaults_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        for (k, v) in required_vars() {
            std::env::set_var(k, v);
        }
        let config = PayScopeConfig::from_env().expect("config should load");
        assert_eq!(config.env, "development");
        assert_eq!(config.port, 8080);
        assert!((config.mapping_confidence_threshold - 0.75).abs() < f64::EPSILON);
        assert!(!config.retention_enabled());
        for (k, _) in required_vars() {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn missing_required_var_is_configuration_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        for (k, _) in required_vars() {
            std::env::remove_var(k);
        }
        let err = PayScopeConfig::from_env().unwrap_err();
        assert_eq!(err.error_class(), "configuration_error");
    }
}
