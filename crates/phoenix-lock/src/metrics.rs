// Lock metrics
// Counters and histograms published through the `metrics` facade

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register metric descriptions. Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "phoenix_lock_acquired_total",
        "Total number of lock acquisitions"
    );
    describe_counter!(
        "phoenix_lock_contended_total",
        "Total number of acquisition attempts that found the lock held"
    );
    describe_counter!(
        "phoenix_lock_timeouts_total",
        "Total number of acquisitions that gave up at the deadline"
    );
    describe_counter!(
        "phoenix_lock_degraded_total",
        "Total number of critical sections run without a lock because the store was unavailable"
    );
    describe_counter!(
        "phoenix_lock_release_failures_total",
        "Total number of lock releases that failed and were left to store expiry"
    );
    describe_histogram!(
        "phoenix_lock_wait_seconds",
        "Time spent waiting for a lock in seconds"
    );
}

pub(crate) fn record_acquired(waited: Duration) {
    counter!("phoenix_lock_acquired_total").increment(1);
    histogram!("phoenix_lock_wait_seconds").record(waited.as_secs_f64());
}

pub(crate) fn record_contended() {
    counter!("phoenix_lock_contended_total").increment(1);
}

pub(crate) fn record_timeout(waited: Duration) {
    counter!("phoenix_lock_timeouts_total").increment(1);
    histogram!("phoenix_lock_wait_seconds").record(waited.as_secs_f64());
}

pub(crate) fn record_degraded() {
    counter!("phoenix_lock_degraded_total").increment(1);
}

pub(crate) fn record_release_failure() {
    counter!("phoenix_lock_release_failures_total").increment(1);
}
