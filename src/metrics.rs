//! Prometheus metrics collection for fleetwatch.
//!
//! Exposed on the `/metrics` endpoint served by [`crate::http`].
//!
//! - `fleetwatch_login_attempts_total{outcome}` - admission queue results
//! - `fleetwatch_reconnects_scheduled_total` - reconnect timers armed
//! - `fleetwatch_kicks_total{class}` - kicks by classification
//! - `fleetwatch_commands_sent_total` - outbound chat lines
//! - `fleetwatch_lookups_total{source}` - tracker lookups (cache/query/timeout)
//! - `fleetwatch_online_sessions` - joined sessions (gauge)
//! - `fleetwatch_scans_total{result}` / `fleetwatch_scan_duration_seconds`

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

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

pub static LOGIN_ATTEMPTS: OnceLock<IntCounterVec> = OnceLock::new();

pub static RECONNECTS_SCHEDULED: OnceLock<IntCounter> = OnceLock::new();

pub static KICKS: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMANDS_SENT: OnceLock<IntCounter> = OnceLock::new();

pub static LOOKUPS: OnceLock<IntCounterVec> = OnceLock::new();

pub static SCANS: OnceLock<IntCounterVec> = OnceLock::new();

/// Notices the sink failed to deliver.
pub static NOTIFY_FAILURES: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges / Histograms
// ========================================================================

pub static ONLINE_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

pub static SCAN_DURATION: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at startup before any metrics are recorded. Recording before
/// `init` is a no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(LOGIN_ATTEMPTS, IntCounterVec::new(Opts::new("fleetwatch_login_attempts_total", "Login attempts by outcome"), &["outcome"]));
    register!(RECONNECTS_SCHEDULED, IntCounter::new("fleetwatch_reconnects_scheduled_total", "Reconnect timers scheduled"));
    register!(KICKS, IntCounterVec::new(Opts::new("fleetwatch_kicks_total", "Kicks by class"), &["class"]));
    register!(COMMANDS_SENT, IntCounter::new("fleetwatch_commands_sent_total", "Outbound chat lines sent"));
    register!(LOOKUPS, IntCounterVec::new(Opts::new("fleetwatch_lookups_total", "Tracker lookups by source"), &["source"]));
    register!(SCANS, IntCounterVec::new(Opts::new("fleetwatch_scans_total", "Tracker scans by result"), &["result"]));
    register!(NOTIFY_FAILURES, IntCounter::new("fleetwatch_notify_failures_total", "Notices the sink failed to deliver"));
    register!(ONLINE_SESSIONS, IntGauge::new("fleetwatch_online_sessions", "Sessions currently joined"));
    register!(SCAN_DURATION, Histogram::with_opts(
        HistogramOpts::new("fleetwatch_scan_duration_seconds", "Tracker scan duration")
            .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0])));
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
// Helper functions
// ============================================================================

#[inline]
fn inc_vec(metric: &OnceLock<IntCounterVec>, label: &str) {
    if let Some(c) = metric.get() {
        c.with_label_values(&[label]).inc();
    }
}

#[inline]
pub fn record_login(outcome: &str) {
    inc_vec(&LOGIN_ATTEMPTS, outcome);
}

#[inline]
pub fn record_reconnect_scheduled() {
    if let Some(c) = RECONNECTS_SCHEDULED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_kick(class: &str) {
    inc_vec(&KICKS, class);
}

#[inline]
pub fn record_command_sent() {
    if let Some(c) = COMMANDS_SENT.get() {
        c.inc();
    }
}

#[inline]
pub fn record_lookup(source: &str) {
    inc_vec(&LOOKUPS, source);
}

#[inline]
pub fn record_scan(result: &str, duration_secs: f64) {
    inc_vec(&SCANS, result);
    if let Some(h) = SCAN_DURATION.get() {
        h.observe(duration_secs);
    }
}

#[inline]
pub fn record_notify_failure() {
    if let Some(c) = NOTIFY_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn session_joined() {
    if let Some(g) = ONLINE_SESSIONS.get() {
        g.inc();
    }
}

#[inline]
pub fn session_left() {
    if let Some(g) = ONLINE_SESSIONS.get() {
        g.dec();
    }
}
