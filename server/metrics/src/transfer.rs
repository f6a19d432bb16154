use metrics::{counter, histogram};

/// Metric names under: {ns}_transfer_*
pub struct TransferMetrics {
    ns: &'static str,
}

impl TransferMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn session_opened(&self) {
        counter!(format!("{}_transfer_sessions_opened_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn session_completed(&self) {
        counter!(format!("{}_transfer_sessions_completed_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn session_aborted(&self, reason: &'static str) {
        counter!(format!("{}_transfer_sessions_aborted_total", self.ns), "reason" => reason).increment(1);
    }

    #[inline]
    pub fn cwnd_sample(&self, cwnd: u32) {
        histogram!(format!("{}_transfer_cwnd", self.ns)).record(cwnd as f64);
    }
}
