use crate::config::TransferConfig;
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;
use vp_control::{ParticipantId, TransferId};

pub(crate) struct ChunkRecord {
    pub data: String,
    pub sent_at: Instant,
    pub retries: u32,
    pub acked: bool,
}

pub(crate) struct QueuedChunk {
    pub seq: u32,
    pub data: String,
}

/// Per-session congestion state and chunk bookkeeping. One session exists
/// per open `FILE_START`..`FILE_END` exchange, identified by the pair
/// `(from, transfer_id)` since transfer ids are unique per sender, not
/// globally.
pub(crate) struct TransferSession {
    pub transfer_id: TransferId,
    pub from: ParticipantId,
    pub receivers: Vec<ParticipantId>,
    pub name: String,
    pub size: u64,

    pub cwnd: u32,
    pub ssthresh: u32,
    pub in_flight: u32,

    /// Next sequence number the sender is allowed to submit — enforces the
    /// strictly-ascending-from-zero ordering rule.
    pub next_expected_seq: u32,
    pub chunks: BTreeMap<u32, ChunkRecord>,
    pub queue: VecDeque<QueuedChunk>,
    pub queued_bytes: u64,

    pub end_requested: bool,
    pub last_progress: Instant,
}

impl TransferSession {
    pub fn new(
        transfer_id: TransferId,
        from: ParticipantId,
        receivers: Vec<ParticipantId>,
        name: String,
        size: u64,
        cfg: &TransferConfig,
    ) -> Self {
        TransferSession {
            transfer_id,
            from,
            receivers,
            name,
            size,
            cwnd: 1,
            ssthresh: cfg.initial_ssthresh,
            in_flight: 0,
            next_expected_seq: 0,
            chunks: BTreeMap::new(),
            queue: VecDeque::new(),
            queued_bytes: 0,
            end_requested: false,
            last_progress: Instant::now(),
        }
    }

    pub fn has_credit(&self) -> bool {
        self.in_flight < self.cwnd
    }

    pub fn is_complete(&self) -> bool {
        self.end_requested && self.chunks.values().all(|c| c.acked) && self.queue.is_empty()
    }

    pub fn oldest_unacked_seq(&self) -> Option<u32> {
        self.chunks
            .iter()
            .find(|(_, rec)| !rec.acked)
            .map(|(seq, _)| *seq)
    }
}
