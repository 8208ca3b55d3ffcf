use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{BiasProviderKind, Config};
use crate::fairness::bias::{BiasMetricProvider, RateDisparityMetrics, UnavailableBiasMetrics};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Pluggable bias metric backend, chosen once from `BIAS_METRICS_PROVIDER`.
    pub bias_provider: Arc<dyn BiasMetricProvider>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let bias_provider: Arc<dyn BiasMetricProvider> = match config.bias_provider {
            BiasProviderKind::RateDisparity => Arc::new(RateDisparityMetrics),
            BiasProviderKind::Disabled => Arc::new(UnavailableBiasMetrics),
        };
        Self {
            db,
            config,
            bias_provider,
        }
    }
}
