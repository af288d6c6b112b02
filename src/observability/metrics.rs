//! Navigation metrics.
//!
//! # Metrics
//! - `navigator_navigations_total` (counter): navigations by outcome
//! - `navigator_cache_lookups_total` (counter): lookups by cache and result
//! - `navigator_fallbacks_total` (counter): hard fallbacks
//! - `navigator_prefetch_total` (counter): prefetches by kind and result
//! - `navigator_scripts_activated_total` (counter): script activations
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op, so the library never forces an exporter on hosts
//! - Recording can be disabled globally from configuration

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Enable or disable metric recording.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn record_navigation(outcome: &'static str) {
    if enabled() {
        counter!("navigator_navigations_total", "outcome" => outcome).increment(1);
    }
}

pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    if enabled() {
        let result = if hit { "hit" } else { "miss" };
        counter!("navigator_cache_lookups_total", "cache" => cache, "result" => result)
            .increment(1);
    }
}

pub fn record_fallback() {
    if enabled() {
        counter!("navigator_fallbacks_total").increment(1);
    }
}

pub fn record_prefetch(kind: &'static str, ok: bool) {
    if enabled() {
        let result = if ok { "ok" } else { "error" };
        counter!("navigator_prefetch_total", "kind" => kind, "result" => result).increment(1);
    }
}

pub fn record_script_activation(kind: &'static str) {
    if enabled() {
        counter!("navigator_scripts_activated_total", "kind" => kind).increment(1);
    }
}
