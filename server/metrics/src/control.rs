use metrics::histogram;
use metrics::counter;

/// Metric names under: {ns}_control_*
pub struct ControlMetrics {
    ns: &'static str,
}

impl ControlMetrics {
    pub fn new(namespace: &'static str) -> Self {
        Self { ns: namespace }
    }

    #[inline]
    pub fn conn_accepted(&self) {
        counter!(format!("{}_control_connections_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn conn_closed(&self) {
        counter!(format!("{}_control_connections_closed_total", self.ns)).increment(1);
    }

    #[inline]
    pub fn msg_rx(&self, kind: &'static str) {
        counter!(format!("{}_control_rx_total", self.ns), "kind" => kind).increment(1);
    }

    #[inline]
    pub fn msg_tx(&self, kind: &'static str) {
        counter!(format!("{}_control_tx_total", self.ns), "kind" => kind).increment(1);
    }

    #[inline]
    pub fn perm_denied(&self, cap: &'static str) {
        counter!(format!("{}_control_perm_denied_total", self.ns), "cap" => cap).increment(1);
    }

    #[inline]
    pub fn dispatch_seconds(&self, kind: &'static str, seconds: f64) {
        histogram!(format!("{}_control_dispatch_seconds", self.ns), "kind" => kind).record(seconds);
    }
}
