use metrics::counter;

/// Metric names under: {ns}_meetings_*
pub struct MeetingsMetrics {
    ns: &'static str,
}

impl MeetingsMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn created(&self) {
        counter!(format!("{}_meetings_created_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn dissolved(&self) {
        counter!(format!("{}_meetings_dissolved_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn join_allowed(&self) {
        counter!(format!("{}_meetings_join_allowed_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn join_denied(&self) {
        counter!(format!("{}_meetings_join_denied_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn chat_routed(&self) {
        counter!(format!("{}_meetings_chat_routed_total", self.ns)).increment(1);
    }
}
