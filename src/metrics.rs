//! Prometheus metrics collection for pingwired.
//!
//! - `pingwire_toggles_total{direction}` - Identities added/removed by commands
//! - `pingwire_pings_total` - Notifications sent
//! - `pingwire_ping_targets` - Live targets per notification (histogram)
//! - `pingwire_delivery_failures_total{kind,reason}` - Failed bridge sends
//! - `pingwire_lifecycle_events_total{event}` - Reconciliation events handled
//! - `pingwire_store_keys` - Keys currently in the store (gauge)
//! - `pingwire_store_saves_total{result}` - Save attempts
//! - `pingwire_store_dirty` - 1 while memory is ahead of disk

use crate::error::{DeliveryError, StoreError};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

pub static TOGGLES: OnceLock<IntCounterVec> = OnceLock::new();
pub static PINGS_SENT: OnceLock<IntCounter> = OnceLock::new();
pub static PING_TARGETS: OnceLock<Histogram> = OnceLock::new();
pub static DELIVERY_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();
pub static LIFECYCLE_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();
pub static STORE_KEYS: OnceLock<IntGauge> = OnceLock::new();
pub static STORE_SAVES: OnceLock<IntCounterVec> = OnceLock::new();
pub static STORE_DIRTY: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded; until
/// then every recording helper is a no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(TOGGLES, IntCounterVec::new(Opts::new("pingwire_toggles_total", "Identities toggled by commands"), &["direction"]));
    register!(PINGS_SENT, IntCounter::new("pingwire_pings_total", "Notifications sent"));
    register!(PING_TARGETS, Histogram::with_opts(
        HistogramOpts::new("pingwire_ping_targets", "Live targets per notification")
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0])));
    register!(DELIVERY_FAILURES, IntCounterVec::new(Opts::new("pingwire_delivery_failures_total", "Failed sends by message kind and reason"), &["kind", "reason"]));
    register!(LIFECYCLE_EVENTS, IntCounterVec::new(Opts::new("pingwire_lifecycle_events_total", "Reconciliation events handled"), &["event"]));
    register!(STORE_KEYS, IntGauge::new("pingwire_store_keys", "Keys in the target store"));
    register!(STORE_SAVES, IntCounterVec::new(Opts::new("pingwire_store_saves_total", "Target list save attempts"), &["result"]));
    register!(STORE_DIRTY, IntGauge::new("pingwire_store_dirty", "1 when the last target list save failed"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

#[inline]
pub fn record_toggle(added: usize, removed: usize) {
    if let Some(c) = TOGGLES.get() {
        c.with_label_values(&["added"]).inc_by(added as u64);
        c.with_label_values(&["removed"]).inc_by(removed as u64);
    }
}

#[inline]
pub fn record_ping(targets: usize) {
    if let Some(c) = PINGS_SENT.get() {
        c.inc();
    }
    if let Some(h) = PING_TARGETS.get() {
        h.observe(targets as f64);
    }
}

/// `kind` is the message being sent: "ping" or "ack".
#[inline]
pub fn record_delivery_failure(kind: &str, error: &DeliveryError) {
    if let Some(c) = DELIVERY_FAILURES.get() {
        c.with_label_values(&[kind, error.error_code()]).inc();
    }
}

#[inline]
pub fn record_lifecycle(event: &str) {
    if let Some(c) = LIFECYCLE_EVENTS.get() {
        c.with_label_values(&[event]).inc();
    }
}

#[inline]
pub fn set_store_keys(keys: usize) {
    if let Some(g) = STORE_KEYS.get() {
        g.set(keys as i64);
    }
}

#[inline]
pub fn record_store_save(error: Option<&StoreError>) {
    if let Some(c) = STORE_SAVES.get() {
        let result = error.map_or("ok", StoreError::error_code);
        c.with_label_values(&[result]).inc();
    }
}

#[inline]
pub fn set_store_dirty(dirty: bool) {
    if let Some(g) = STORE_DIRTY.get() {
        g.set(i64::from(dirty));
    }
}
