use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Per-minute throughput counters with running peaks.
pub struct ThroughputStats {
    funded: AtomicU64,
    requests: AtomicU64,
    peak_funded: AtomicU64,
    peak_requests: AtomicU64,
}

/// One reporting window, after reset.
#[derive(Debug, PartialEq, Eq)]
pub struct StatsWindow {
    pub funded: u64,
    pub requests: u64,
    pub peak_funded: u64,
    pub peak_requests: u64,
}

impl ThroughputStats {
    pub fn new() -> Self {
        Self {
            funded: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            peak_funded: AtomicU64::new(0),
            peak_requests: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_funded(&self) {
        self.funded.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the window's counters, roll them into the peaks, and reset.
    pub fn roll_window(&self) -> StatsWindow {
        let funded = self.funded.swap(0, Ordering::Relaxed);
        let requests = self.requests.swap(0, Ordering::Relaxed);
        self.peak_funded.fetch_max(funded, Ordering::Relaxed);
        self.peak_requests.fetch_max(requests, Ordering::Relaxed);

        StatsWindow {
            funded,
            requests,
            peak_funded: self.peak_funded.load(Ordering::Relaxed),
            peak_requests: self.peak_requests.load(Ordering::Relaxed),
        }
    }

    /// Background reporter logging one line per window.
    pub fn spawn_reporter(self: &Arc<Self>, period: Duration) {
        let stats = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick is immediate
            loop {
                interval.tick().await;
                let window = stats.roll_window();
                let secs = period.as_secs_f64();
                let success_rate = if window.requests > 0 {
                    window.funded as f64 / window.requests as f64 * 100.0
                } else {
                    0.0
                };
                info!(
                    success = window.funded,
                    tps = %format!("{:.1}", window.funded as f64 / secs),
                    peak = window.peak_funded,
                    requests = window.requests,
                    rps = %format!("{:.1}", window.requests as f64 / secs),
                    peak_requests = window.peak_requests,
                    success_rate = %format!("{:.1}%", success_rate),
                    "throughput"
                );
            }
        });
    }
}

impl Default for ThroughputStats {
    fn default() -> Self {
        Self::new()
    }
}
