use clap::Parser;

/// Server-side configuration, recognizing exactly the options named in the
/// external interfaces plus the two ambient additions (`metrics_listen`,
/// `log_filter`) that add no wire-protocol surface.
#[derive(Parser, Debug, Clone)]
#[command(name = "vp-gateway", about = "Conferencing server core")]
pub struct Config {
    #[arg(long, default_value = "0.0.0.0", env = "VP_HOST")]
    pub host: String,

    #[arg(long, default_value_t = 5000, env = "VP_TCP_PORT")]
    pub tcp_port: u16,

    #[arg(long, default_value_t = 5001, env = "VP_UDP_PORT")]
    pub udp_port: u16,

    #[arg(long, default_value_t = 64 * 1024, env = "VP_MAX_FRAME_BYTES")]
    pub max_frame_bytes: usize,

    #[arg(long, default_value_t = 1_000, env = "VP_MAX_MEETINGS")]
    pub max_meetings: usize,

    #[arg(long, default_value_t = 64 * 1024 * 1024, env = "VP_SESSION_QUEUE_BYTES")]
    pub session_queue_bytes: u64,

    #[arg(long, default_value_t = 8, env = "VP_INITIAL_SSTHRESH")]
    pub initial_ssthresh: u32,

    #[arg(long, default_value_t = 8 * 1024, env = "VP_BASE_CHUNK_BYTES")]
    pub base_chunk_bytes: u32,

    #[arg(long, default_value_t = 2_000, env = "VP_ACK_TIMEOUT_MS")]
    pub ack_timeout_ms: u64,

    #[arg(long, default_value_t = 5, env = "VP_MAX_RETRIES")]
    pub max_retries: u32,

    #[arg(long, default_value_t = 120_000, env = "VP_IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: u64,

    #[arg(long, default_value = "0.0.0.0:9100", env = "VP_METRICS_LISTEN")]
    pub metrics_listen: String,

    #[arg(long, default_value = "info", env = "VP_LOG_FILTER")]
    pub log_filter: String,
}

impl Config {
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    pub fn udp_addr(&self) -> String {
        format!("{}:{}", self.host, self.udp_port)
    }

    pub fn transfer_config(&self) -> vp_transfer::TransferConfig {
        vp_transfer::TransferConfig {
            initial_ssthresh: self.initial_ssthresh,
            base_chunk_bytes: self.base_chunk_bytes,
            ack_timeout: std::time::Duration::from_millis(self.ack_timeout_ms),
            max_retries: self.max_retries,
            session_queue_bytes: self.session_queue_bytes,
        }
    }
}
