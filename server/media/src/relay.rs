//! Address registry and fan-out logic for the UDP media listener.
//!
//! The relay treats every datagram as opaque payload once the fixed header
//! is validated — no decoding, no mixing, a single outbound write per
//! target. Parsing is kept separate in [`crate::header`]; this module only
//! tracks "which socket address currently speaks for this participant" and
//! "who else in the same meeting should receive this datagram".

use crate::header::{self, HeaderError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use vp_control::{MeetingRegistry, ParticipantId};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("datagram references an unknown participant")]
    UnknownParticipant,
}

/// Hook for relay-level counters, mirroring the trait-based metrics DI the
/// teacher's voice forwarder uses so the relay stays decoupled from any
/// particular metrics backend.
pub trait MediaMetrics: Send + Sync {
    fn inc_received(&self);
    fn inc_dropped(&self, reason: &'static str);
    fn inc_forwarded(&self, fanout: usize);
}

pub struct NoopMetrics;
impl MediaMetrics for NoopMetrics {
    fn inc_received(&self) {}
    fn inc_dropped(&self, _reason: &'static str) {}
    fn inc_forwarded(&self, _fanout: usize) {}
}

/// Tracks the most recently observed source address per participant and
/// computes fan-out targets from the admitted set of the sender's meeting.
pub struct MediaRelay {
    registry: Arc<MeetingRegistry>,
    addresses: RwLock<HashMap<ParticipantId, SocketAddr>>,
    metrics: Arc<dyn MediaMetrics>,
}

impl MediaRelay {
    pub fn new(registry: Arc<MeetingRegistry>, metrics: Arc<dyn MediaMetrics>) -> Self {
        MediaRelay {
            registry,
            addresses: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Validates and routes one inbound datagram. On success, returns the
    /// sending participant and the set of addresses the caller should
    /// forward the *original, unmodified* datagram bytes to.
    pub fn handle_datagram(
        &self,
        src: SocketAddr,
        datagram: &[u8],
    ) -> Result<(ParticipantId, Vec<SocketAddr>), RelayError> {
        self.metrics.inc_received();

        let (header, _offset) = match header::parse(datagram) {
            Ok(ok) => ok,
            Err(e) => {
                self.metrics.inc_dropped("malformed");
                return Err(e.into());
            }
        };
        let sender = header.participant_id();

        if self.registry.meeting_code_of(sender).is_none() {
            self.metrics.inc_dropped("unknown_participant");
            return Err(RelayError::UnknownParticipant);
        }

        self.addresses.write().insert(sender, src);

        let targets: Vec<SocketAddr> = self
            .registry
            .admitted_peers_of(sender)
            .into_iter()
            .filter_map(|id| self.addresses.read().get(&id).copied())
            .collect();

        self.metrics.inc_forwarded(targets.len());
        Ok((sender, targets))
    }
}
