//! Metrics recorder initialization.

use {anyhow::Result, std::net::SocketAddr, tracing::info};

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address the Prometheus scrape endpoint listens on
    pub listen: Option<SocketAddr>,
}

/// Install the global metrics recorder.
///
/// Call once at startup, from inside a tokio runtime. Without the
/// `prometheus` feature, or when disabled, no recorder is installed and the
/// facade macros stay no-ops.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or bound.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        init_prometheus(&config)?;
        info!(listen = ?config.listen, "prometheus metrics exporter initialized");
        Ok(())
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("metrics feature not enabled at compile time");
        Ok(())
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(config: &MetricsRecorderConfig) -> Result<()> {
    use {
        crate::buckets,
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Suffix("_duration_seconds".to_string()),
        buckets::DURATION,
    )?;

    if let Some(addr) = config.listen {
        builder = builder.with_http_listener(addr);
    }

    builder.install()?;
    Ok(())
}
