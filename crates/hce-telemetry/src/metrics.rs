//! Prometheus metrics for the card-emulation routing core.
//!
//! All metrics follow the naming convention: `hce_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SERVICE REGISTRY METRICS (Subsystem 2)
    // =========================================================================

    /// Catalog rebuilds by trigger
    pub static ref CATALOG_REBUILDS: CounterVec = CounterVec::new(
        Opts::new("hce_registry_rebuilds_total", "Catalog rebuilds"),
        &["reason"]  // initialize/user_update/package_removed/storage/registration
    ).expect("metric creation failed");

    /// Services in the published catalog, per user
    pub static ref CATALOG_SERVICES: GaugeVec = GaugeVec::new(
        Opts::new("hce_registry_services", "Services in the published catalog"),
        &["user_id"]
    ).expect("metric creation failed");

    /// Settings persistence failures
    pub static ref PERSISTENCE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("hce_registry_persistence_failures_total", "Settings read/write failures"),
        &["store", "operation"]  // operation: read/write
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCHER METRICS (Subsystem 4)
    // =========================================================================

    /// Polling frames by routing outcome
    pub static ref POLLING_FRAMES: CounterVec = CounterVec::new(
        Opts::new("hce_dispatcher_polling_frames_total", "Polling frames processed"),
        &["outcome"]  // exact/pattern/unmatched/dropped
    ).expect("metric creation failed");

    /// Bind lifecycle
    pub static ref BINDS: CounterVec = CounterVec::new(
        Opts::new("hce_dispatcher_binds_total", "Service bind attempts"),
        &["outcome"]  // requested/connected/failed/timed_out
    ).expect("metric creation failed");

    /// Observe-mode toggles
    pub static ref OBSERVE_MODE_TOGGLES: CounterVec = CounterVec::new(
        Opts::new("hce_dispatcher_observe_mode_toggles_total", "Observe mode changes"),
        &["enabled", "result"]  // result: ok/failed
    ).expect("metric creation failed");

    /// Command APDUs forwarded to a service
    pub static ref APDUS_FORWARDED: Counter = Counter::new(
        "hce_dispatcher_apdus_forwarded_total",
        "Command APDUs forwarded to the selected service"
    ).expect("metric creation failed");

    /// Status words answered by the dispatcher itself
    pub static ref APDUS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("hce_dispatcher_apdus_rejected_total", "APDUs answered without a service"),
        &["status"]  // 6A82/6F00
    ).expect("metric creation failed");

    /// Pending data dropped by the bounded queue
    pub static ref PENDING_DROPPED: Counter = Counter::new(
        "hce_dispatcher_pending_dropped_total",
        "Queued frames or APDUs dropped before a bind completed"
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
#[derive(Debug)]
pub struct MetricsHandle {
    registered: usize,
}

impl MetricsHandle {
    /// Number of collectors registered by this call.
    pub fn registered(&self) -> usize {
        self.registered
    }
}

/// Register all metrics with the global registry.
///
/// Registering twice is harmless; collectors that are already present are
/// skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Registry
        Box::new(CATALOG_REBUILDS.clone()),
        Box::new(CATALOG_SERVICES.clone()),
        Box::new(PERSISTENCE_FAILURES.clone()),
        // Dispatcher
        Box::new(POLLING_FRAMES.clone()),
        Box::new(BINDS.clone()),
        Box::new(OBSERVE_MODE_TOGGLES.clone()),
        Box::new(APDUS_FORWARDED.clone()),
        Box::new(APDUS_REJECTED.clone()),
        Box::new(PENDING_DROPPED.clone()),
    ];

    let mut registered = 0;
    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) => registered += 1,
            Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { registered })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        register_metrics().unwrap();
        let second = register_metrics().unwrap();
        assert_eq!(second.registered(), 0);
    }

    #[test]
    fn test_counter_increment() {
        BINDS.with_label_values(&["requested"]).inc();
        assert!(BINDS.with_label_values(&["requested"]).get() >= 1.0);
    }

    #[test]
    fn test_encode_contains_registered_metric() {
        register_metrics().unwrap();
        APDUS_FORWARDED.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("hce_dispatcher_apdus_forwarded_total"));
    }
}
