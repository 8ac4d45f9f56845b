use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dom6api::{ApiConfig, EvalPath, LookupService, MatchMetrics};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Lookup service (shared across requests)
    pub service: Arc<LookupService>,

    /// Prometheus handle, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Load the API configuration, open the data source and register every
    /// configured table.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let api_config = match &config.api_config_path {
            Some(path) => ApiConfig::from_file(path)
                .map_err(|err| ServerError::Config(format!("{path}: {err}")))?,
            None => ApiConfig::default(),
        };

        let mut service = LookupService::from_config(&api_config)?;

        let metrics = if config.metrics_enabled {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|err| ServerError::Config(format!("metrics recorder: {err}")))?;
            service = service.with_metrics(Arc::new(PrometheusMatchMetrics));
            Some(handle)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            service: Arc::new(service),
            metrics,
        })
    }

    /// Wrap an already built service; metrics stay off.
    pub fn with_service(config: ServerConfig, service: LookupService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            metrics: None,
        }
    }
}

/// Forwards matcher observations to the `metrics` facade.
#[derive(Debug, Default)]
pub struct PrometheusMatchMetrics;

impl MatchMetrics for PrometheusMatchMetrics {
    fn record_evaluation(&self, table: &str, path: EvalPath, latency: Duration, hit_count: usize) {
        let labels = [
            ("table", table.to_string()),
            ("path", path.as_str().to_string()),
        ];
        metrics::counter!("dom6api_lookups_total", &labels[..]).increment(1);
        metrics::histogram!("dom6api_lookup_duration_seconds", &labels[..])
            .record(latency.as_secs_f64());
        metrics::histogram!("dom6api_lookup_hits", &labels[..]).record(hit_count as f64);
    }

    fn record_row_skipped(&self, table: &str) {
        metrics::counter!("dom6api_rows_skipped_total", "table" => table.to_string()).increment(1);
    }
}
