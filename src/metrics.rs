//! Prometheus metrics exposed on `/metrics`.

use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Name of the published master/backup gauge.
pub const IS_MASTER_NAME: &str = "is_master";
const IS_MASTER_HELP: &str = "Is master node(1) or backup node(0)";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Handle to the `is_master` gauge.
///
/// Clones share the same atomic cell, so the updater and the exporter can
/// each hold one.
#[derive(Clone, Debug)]
pub struct MasterGauge {
    gauge: IntGauge,
}

impl MasterGauge {
    /// Create a gauge starting at 0 (backup).
    pub fn new() -> Result<Self, prometheus::Error> {
        let gauge = IntGauge::new(IS_MASTER_NAME, IS_MASTER_HELP)?;
        gauge.set(0);
        Ok(Self { gauge })
    }

    pub fn set_master(&self, master: bool) {
        self.gauge.set(if master { 1 } else { 0 });
    }

    pub fn value(&self) -> i64 {
        self.gauge.get()
    }

    pub fn is_master(&self) -> bool {
        self.value() == 1
    }
}

/// The exporter's metric registry.
pub struct Metrics {
    registry: Registry,
    master: MasterGauge,
}

impl Metrics {
    /// Build the registry with the `is_master` gauge and, on Linux, the
    /// `process_*` collector.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let master = MasterGauge::new()?;
        registry.register(Box::new(master.gauge.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self { registry, master })
    }

    /// A handle to the `is_master` gauge.
    pub fn master(&self) -> MasterGauge {
        self.master.clone()
    }

    /// Render every registered metric in the text exposition format.
    pub fn gather(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
