/*!
Observability for snapwire.

- Structured logging setup (human-readable or JSON lines)
- Prometheus counters for the snapshot store, behind the `metrics` feature
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, SnapwireError};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "snapwire=info,snapwire_core=info";

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<SnapwireMetrics> = OnceLock::new();

/// Metrics collection for store and decoder activity
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct SnapwireMetrics {
    pub snapshots_written_total: Counter,
    pub snapshots_pruned_total: Counter,
    pub prune_failures_total: Counter,
    pub partial_decodes_total: Counter,
    pub snapshot_size_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter> {
    let counter = Counter::new(name, help)
        .map_err(|e| SnapwireError::storage(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| SnapwireError::storage(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl SnapwireMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let snapshots_written_total = counter(
            &registry,
            "snapwire_snapshots_written_total",
            "Snapshots written to disk",
        )?;
        let snapshots_pruned_total = counter(
            &registry,
            "snapwire_snapshots_pruned_total",
            "Snapshots removed by prune",
        )?;
        let prune_failures_total = counter(
            &registry,
            "snapwire_prune_failures_total",
            "Snapshots that could not be removed during prune",
        )?;
        let partial_decodes_total = counter(
            &registry,
            "snapwire_partial_decodes_total",
            "Containers cut short by a malformed entry during decode",
        )?;

        let snapshot_size_bytes = Histogram::with_opts(
            HistogramOpts::new("snapwire_snapshot_size_bytes", "Encoded snapshot size in bytes")
                .buckets(prometheus::exponential_buckets(64.0, 4.0, 10).map_err(|e| {
                    SnapwireError::storage(format!("Failed to build size buckets: {e}"))
                })?),
        )
        .map_err(|e| {
            SnapwireError::storage(format!("Failed to create snapshot_size_bytes metric: {e}"))
        })?;
        registry
            .register(Box::new(snapshot_size_bytes.clone()))
            .map_err(|e| {
                SnapwireError::storage(format!("Failed to register snapshot_size_bytes: {e}"))
            })?;

        Ok(Self {
            snapshots_written_total,
            snapshots_pruned_total,
            prune_failures_total,
            partial_decodes_total,
            snapshot_size_bytes,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static SnapwireMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize snapwire metrics"))
    }

    pub fn record_snapshot_written(&self, size_bytes: usize) {
        self.snapshots_written_total.inc();
        self.snapshot_size_bytes.observe(size_bytes as f64);
    }

    pub fn record_pruned(&self) {
        self.snapshots_pruned_total.inc();
    }

    pub fn record_prune_failure(&self) {
        self.prune_failures_total.inc();
    }

    pub fn record_partial_decode(&self) {
        self.partial_decodes_total.inc();
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| SnapwireError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer).map_err(|e| {
            SnapwireError::storage(format!("Failed to convert metrics to string: {e}"))
        })
    }
}

/// Build the log filter: `RUST_LOG` wins, then `verbose`, then the default.
pub fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("snapwire=debug,snapwire_core=debug")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    })
}

/// Install the global tracing subscriber.
///
/// `json` switches the output to one JSON object per line. Logs go to
/// stderr so command output on stdout stays machine-readable.
pub fn init_observability(json: bool, verbose: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    SnapwireMetrics::global();

    let filter = log_filter(verbose);
    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
            .with_writer(std::io::stderr);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };

    result.map_err(|e| {
        SnapwireError::storage(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("snapwire observability initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init_observability(false, false);
        assert!(init_observability(true, true).is_err());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_recording() {
        let metrics = SnapwireMetrics::global();
        metrics.record_snapshot_written(1024);
        metrics.record_pruned();
        metrics.record_prune_failure();
        metrics.record_partial_decode();

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("snapwire_snapshots_written_total"));
        assert!(text.contains("snapwire_snapshot_size_bytes"));
        assert!(text.contains("snapwire_partial_decodes_total"));
    }
}
