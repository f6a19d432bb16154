use std::time::Duration;

/// The five transfer-coordinator tunables spec §4.5 names as recognized
/// configuration options.
#[derive(Clone, Copy, Debug)]
pub struct TransferConfig {
    pub initial_ssthresh: u32,
    pub base_chunk_bytes: u32,
    pub ack_timeout: Duration,
    pub max_retries: u32,
    pub session_queue_bytes: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            initial_ssthresh: 8,
            base_chunk_bytes: 8 * 1024,
            ack_timeout: Duration::from_secs(2),
            max_retries: 5,
            session_queue_bytes: 64 * 1024 * 1024,
        }
    }
}
