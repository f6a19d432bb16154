use metrics::{counter, histogram};

use crate::labels::LabelPolicy;

/// Metric names under: {ns}_media_*
pub struct MediaMetricsImpl {
    ns: &'static str,
    policy: LabelPolicy,
}

impl MediaMetricsImpl {
    pub fn new(namespace: &'static str, policy: LabelPolicy) -> Self {
        Self { ns: namespace, policy }
    }

    #[inline]
    pub fn rx_packet(&self) {
        counter!(format!("{}_media_rx_datagrams_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn forwarded(&self, fanout: usize) {
        counter!(format!("{}_media_forwarded_total", self.ns)).increment(1);
        histogram!(format!("{}_media_fanout", self.ns)).record(fanout as f64);
    }

    #[inline]
    pub fn drop_reason(&self, reason: &'static str) {
        counter!(
            format!("{}_media_drops_total", self.ns),
            "reason" => LabelPolicy::reason(reason).as_str().to_string()
        )
        .increment(1);
    }

    /// Per-meeting receive counters, bucketed to keep label cardinality
    /// bounded regardless of how many meetings are live.
    #[inline]
    pub fn per_meeting_rx(&self, meeting_code: u32) {
        counter!(
            format!("{}_media_rx_by_meeting_total", self.ns),
            "meeting" => self.policy.meeting_bucket(meeting_code).as_str().to_string()
        )
        .increment(1);
    }
}

/// Adapter implementing `vp_media::relay::MediaMetrics` so the relay stays
/// decoupled from the Prometheus backend.
impl vp_media::MediaMetrics for MediaMetricsImpl {
    fn inc_received(&self) {
        self.rx_packet();
    }

    fn inc_dropped(&self, reason: &'static str) {
        self.drop_reason(reason);
    }

    fn inc_forwarded(&self, fanout: usize) {
        self.forwarded(fanout);
    }
}
