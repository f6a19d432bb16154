use crate::config::TransferConfig;
use crate::session::{ChunkRecord, QueuedChunk, TransferSession};
use base64::Engine;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;
use vp_control::errors::{ControlError, ControlResult};
use vp_control::events::Outbound;
use vp_control::ids::{ParticipantId, TransferId};
use vp_control::protocol::ServerMessage;

type SessionKey = (ParticipantId, TransferId);

struct Inner {
    sessions: HashMap<SessionKey, TransferSession>,
    /// Resolves an acknowledging receiver's `(receiver, transfer_id)` pair
    /// back to the owning sender, since `FILE_ACK` carries no sender id.
    receiver_index: HashMap<SessionKey, ParticipantId>,
}

/// Runs the Reno-style pacing policy in spec §4.5 across every open
/// transfer session, guarded by one lock the way [`vp_control::MeetingRegistry`]
/// guards its table — a session's congestion state is only ever touched
/// while processing a message from that session's owning connection or
/// during the periodic sweep, so contention is low and the simpler
/// single-lock shape is preferred over a second per-session lock layer.
pub struct TransferCoordinator {
    cfg: TransferConfig,
    inner: Mutex<Inner>,
}

impl TransferCoordinator {
    pub fn new(cfg: TransferConfig) -> Self {
        TransferCoordinator {
            cfg,
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                receiver_index: HashMap::new(),
            }),
        }
    }

    /// Opens a session. `receivers` is resolved by the caller from the
    /// dispatcher's `to`-targeted-or-broadcast rule.
    pub fn on_file_start(
        &self,
        from: ParticipantId,
        transfer_id: TransferId,
        receivers: Vec<ParticipantId>,
        name: String,
        size: u64,
    ) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.lock();
        let key = (from, transfer_id);
        if inner.sessions.contains_key(&key) {
            return Err(ControlError::InvalidArgument("transfer id already in use by this sender"));
        }

        for r in &receivers {
            inner.receiver_index.insert((*r, transfer_id), from);
        }
        let session = TransferSession::new(transfer_id, from, receivers.clone(), name.clone(), size, &self.cfg);
        inner.sessions.insert(key, session);

        Ok(Outbound::fan_out(
            receivers,
            ServerMessage::FileStartForward {
                transfer_id,
                from,
                name,
                size,
            },
        ))
    }

    /// Admits or queues one chunk from the sender, enforcing strict
    /// sequence ordering and the per-session queue bound.
    pub fn on_file_chunk(
        &self,
        from: ParticipantId,
        transfer_id: TransferId,
        seq: u32,
        data: String,
    ) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.lock();
        let key = (from, transfer_id);

        let session = inner
            .sessions
            .get_mut(&key)
            .ok_or(ControlError::NotFound("no such transfer session"))?;

        if seq != session.next_expected_seq {
            let receivers = session.receivers.clone();
            Self::remove_session(&mut inner, key, &receivers);
            return Ok(Self::abort_both(from, receivers, transfer_id, "protocol"));
        }

        let decoded_len = base64::engine::general_purpose::STANDARD.decode(&data).map(|b| b.len());
        let oversized = match decoded_len {
            Ok(len) => len > self.cfg.base_chunk_bytes as usize,
            Err(_) => true,
        };
        if oversized {
            let receivers = session.receivers.clone();
            Self::remove_session(&mut inner, key, &receivers);
            return Ok(Self::abort_both(from, receivers, transfer_id, "chunk_too_large"));
        }

        session.next_expected_seq += 1;
        session.last_progress = Instant::now();

        if session.has_credit() {
            session.in_flight += 1;
            session.chunks.insert(
                seq,
                ChunkRecord {
                    data: data.clone(),
                    sent_at: Instant::now(),
                    retries: 0,
                    acked: false,
                },
            );
            let receivers = session.receivers.clone();
            Ok(Outbound::fan_out(
                receivers,
                ServerMessage::FileChunkForward { transfer_id, seq, data },
            ))
        } else {
            let incoming_bytes = data.len() as u64;
            if session.queued_bytes + incoming_bytes > self.cfg.session_queue_bytes {
                let receivers = session.receivers.clone();
                Self::remove_session(&mut inner, key, &receivers);
                return Ok(Self::abort_both(from, receivers, transfer_id, "queue_overflow"));
            }
            session.queued_bytes += incoming_bytes;
            session.queue.push_back(QueuedChunk { seq, data });
            Ok(Vec::new())
        }
    }

    /// Applies the acknowledgement growth rule and flushes queued chunks
    /// up to the new credit.
    pub fn on_file_ack(&self, acker: ParticipantId, transfer_id: TransferId, seq: u32) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.lock();
        let from = *inner
            .receiver_index
            .get(&(acker, transfer_id))
            .ok_or(ControlError::NotFound("no such transfer session"))?;
        let key = (from, transfer_id);

        let session = inner
            .sessions
            .get_mut(&key)
            .ok_or(ControlError::NotFound("no such transfer session"))?;

        let Some(rec) = session.chunks.get_mut(&seq) else {
            return Ok(Vec::new());
        };
        if rec.acked {
            return Ok(Vec::new());
        }
        rec.acked = true;
        session.in_flight = session.in_flight.saturating_sub(1);
        session.last_progress = Instant::now();

        if session.cwnd < session.ssthresh {
            session.cwnd *= 2;
        } else {
            session.cwnd += 1;
        }

        let mut out = vec![Outbound::new(from, ServerMessage::FileAckForward { transfer_id, seq })];
        out.extend(Self::flush_queue(session, transfer_id));

        if session.is_complete() {
            let receivers = session.receivers.clone();
            out.extend(Outbound::fan_out(receivers.clone(), ServerMessage::FileEndForward { transfer_id }));
            inner.sessions.remove(&key);
            for r in receivers {
                inner.receiver_index.remove(&(r, transfer_id));
            }
        }
        Ok(out)
    }

    /// Marks the session's final chunk boundary. `FILE_END_FORWARD` is
    /// emitted here if every chunk already acked, otherwise deferred until
    /// the last outstanding ack arrives.
    pub fn on_file_end(&self, from: ParticipantId, transfer_id: TransferId) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.lock();
        let key = (from, transfer_id);
        let session = inner
            .sessions
            .get_mut(&key)
            .ok_or(ControlError::NotFound("no such transfer session"))?;
        session.end_requested = true;

        if session.is_complete() {
            let receivers = session.receivers.clone();
            inner.sessions.remove(&key);
            for r in &receivers {
                inner.receiver_index.remove(&(*r, transfer_id));
            }
            return Ok(Outbound::fan_out(receivers, ServerMessage::FileEndForward { transfer_id }));
        }
        Ok(Vec::new())
    }

    /// Scans every open session for chunks outstanding past the ack
    /// timeout, retransmitting or aborting per spec §4.5. Intended to be
    /// called from a periodic sweep task (default every 100 ms).
    pub fn sweep_timeouts(&self) -> Vec<Outbound> {
        let mut inner = self.inner.lock();
        let mut out = Vec::new();
        let keys: Vec<SessionKey> = inner.sessions.keys().copied().collect();

        for key in keys {
            let Some(session) = inner.sessions.get_mut(&key) else { continue };
            let Some(seq) = session.oldest_unacked_seq() else { continue };
            let Some(rec) = session.chunks.get(&seq) else { continue };
            if rec.sent_at.elapsed() < self.cfg.ack_timeout {
                continue;
            }

            if rec.retries >= self.cfg.max_retries {
                let receivers = session.receivers.clone();
                let from = session.from;
                Self::remove_session(&mut inner, key, &receivers);
                out.extend(Self::abort_both(from, receivers, key.1, "timeout"));
                continue;
            }

            session.ssthresh = std::cmp::max(1, session.cwnd / 2);
            session.cwnd = 1;
            let data = rec.data.clone();
            let rec = session.chunks.get_mut(&seq).unwrap();
            rec.retries += 1;
            rec.sent_at = Instant::now();

            out.extend(Outbound::fan_out(
                session.receivers.clone(),
                ServerMessage::FileChunkForward {
                    transfer_id: key.1,
                    seq,
                    data,
                },
            ));
        }
        out
    }

    fn flush_queue(session: &mut TransferSession, transfer_id: TransferId) -> Vec<Outbound> {
        let mut out = Vec::new();
        while session.has_credit() {
            let Some(queued) = session.queue.pop_front() else { break };
            session.queued_bytes = session.queued_bytes.saturating_sub(queued.data.len() as u64);
            session.in_flight += 1;
            session.chunks.insert(
                queued.seq,
                ChunkRecord {
                    data: queued.data.clone(),
                    sent_at: Instant::now(),
                    retries: 0,
                    acked: false,
                },
            );
            out.extend(Outbound::fan_out(
                session.receivers.clone(),
                ServerMessage::FileChunkForward {
                    transfer_id,
                    seq: queued.seq,
                    data: queued.data,
                },
            ));
        }
        out
    }

    fn remove_session(inner: &mut Inner, key: SessionKey, receivers: &[ParticipantId]) {
        inner.sessions.remove(&key);
        for r in receivers {
            inner.receiver_index.remove(&(*r, key.1));
        }
    }

    /// Builds a `FILE_ABORT` to the sender and every receiver, the shape
    /// every abort path in this module sends once a session is torn down.
    fn abort_both(from: ParticipantId, receivers: Vec<ParticipantId>, transfer_id: TransferId, reason: &str) -> Vec<Outbound> {
        let mut out = vec![Outbound::new(
            from,
            ServerMessage::FileAbort {
                transfer_id,
                reason: reason.to_string(),
            },
        )];
        out.extend(Outbound::fan_out(
            receivers,
            ServerMessage::FileAbort {
                transfer_id,
                reason: reason.to_string(),
            },
        ));
        out
    }

    /// Aborts every open session that references `participant`, whether as
    /// sender or as a receiver, and removes them. Meant to be called when a
    /// participant leaves their meeting or their connection drops, so a
    /// departed participant's sessions don't linger.
    pub fn abort_for_participant(&self, participant: ParticipantId) -> Vec<Outbound> {
        let mut inner = self.inner.lock();
        let keys: Vec<SessionKey> = inner
            .sessions
            .iter()
            .filter(|(key, session)| key.0 == participant || session.receivers.contains(&participant))
            .map(|(key, _)| *key)
            .collect();

        let mut out = Vec::new();
        for key in keys {
            let Some(session) = inner.sessions.get(&key) else { continue };
            let receivers = session.receivers.clone();
            let from = session.from;
            Self::remove_session(&mut inner, key, &receivers);

            if from != participant {
                out.push(Outbound::new(
                    from,
                    ServerMessage::FileAbort {
                        transfer_id: key.1,
                        reason: "participant_left".to_string(),
                    },
                ));
            }
            out.extend(Outbound::fan_out(
                receivers.into_iter().filter(|r| *r != participant),
                ServerMessage::FileAbort {
                    transfer_id: key.1,
                    reason: "participant_left".to_string(),
                },
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn coordinator() -> TransferCoordinator {
        TransferCoordinator::new(TransferConfig {
            initial_ssthresh: 8,
            base_chunk_bytes: 8192,
            ack_timeout: Duration::from_millis(50),
            max_retries: 5,
            session_queue_bytes: 64 * 1024 * 1024,
        })
    }

    const SENDER: ParticipantId = ParticipantId(1);
    const RECEIVER: ParticipantId = ParticipantId(2);
    const TID: TransferId = TransferId(7);

    #[test]
    fn single_timeout_scenario_matches_documented_cwnd_evolution() {
        let coord = coordinator();
        coord
            .on_file_start(SENDER, TID, vec![RECEIVER], "x.bin".into(), 24576)
            .unwrap();

        // cwnd starts at 1: seq 0 admitted immediately.
        let out = coord.on_file_chunk(SENDER, TID, 0, "AAAA".into()).unwrap();
        assert_eq!(out.len(), 1);
        // No credit yet for seq 1 (in_flight=1, cwnd=1) — queued.
        let out = coord.on_file_chunk(SENDER, TID, 1, "BBBB".into()).unwrap();
        assert!(out.is_empty());

        // Ack seq 0: cwnd 1 -> 2 (slow start), flush queued seq 1.
        let out = coord.on_file_ack(RECEIVER, TID, 0).unwrap();
        assert!(out.iter().any(|o| matches!(o.message, ServerMessage::FileAckForward { seq: 0, .. })));
        assert!(out
            .iter()
            .any(|o| matches!(o.message, ServerMessage::FileChunkForward { seq: 1, .. })));

        // Now admit seq 2 directly (credit available: in_flight=1, cwnd=2).
        let out = coord.on_file_chunk(SENDER, TID, 2, "CCCC".into()).unwrap();
        assert_eq!(out.len(), 1);

        // Ack seq 1: cwnd 2 -> 4 (still < ssthresh=8).
        coord.on_file_ack(RECEIVER, TID, 1).unwrap();

        // seq 2 times out and is never acked in time.
        std::thread::sleep(Duration::from_millis(60));
        let out = coord.sweep_timeouts();
        assert!(out
            .iter()
            .any(|o| matches!(o.message, ServerMessage::FileChunkForward { seq: 2, .. })));

        // Ack the retransmitted seq 2: cwnd 1 -> 2 (slow start again, ssthresh 2).
        let out = coord.on_file_ack(RECEIVER, TID, 2).unwrap();
        assert!(out.iter().any(|o| matches!(o.message, ServerMessage::FileAckForward { seq: 2, .. })));

        coord.on_file_end(SENDER, TID).unwrap();
    }

    #[test]
    fn out_of_order_chunk_aborts_with_protocol_reason() {
        let coord = coordinator();
        coord
            .on_file_start(SENDER, TID, vec![RECEIVER], "x.bin".into(), 8192)
            .unwrap();
        let out = coord.on_file_chunk(SENDER, TID, 5, "AAAA".into()).unwrap();
        assert!(out.iter().any(|o| matches!(
            &o.message,
            ServerMessage::FileAbort { reason, .. } if reason == "protocol"
        )));
    }

    #[test]
    fn file_end_after_all_acks_emits_forward_and_frees_session() {
        let coord = coordinator();
        coord
            .on_file_start(SENDER, TID, vec![RECEIVER], "x.bin".into(), 8192)
            .unwrap();
        coord.on_file_chunk(SENDER, TID, 0, "AAAA".into()).unwrap();
        coord.on_file_ack(RECEIVER, TID, 0).unwrap();
        let out = coord.on_file_end(SENDER, TID).unwrap();
        assert!(out.iter().any(|o| matches!(o.message, ServerMessage::FileEndForward { .. })));

        // Session is gone: a further ack is a no-op NotFound error.
        let err = coord.on_file_ack(RECEIVER, TID, 0).unwrap_err();
        assert_eq!(err, ControlError::NotFound("no such transfer session"));
    }

    #[test]
    fn oversized_chunk_aborts_with_chunk_too_large_reason() {
        let coord = TransferCoordinator::new(TransferConfig {
            initial_ssthresh: 8,
            base_chunk_bytes: 2,
            ack_timeout: Duration::from_millis(50),
            max_retries: 5,
            session_queue_bytes: 64 * 1024 * 1024,
        });
        coord
            .on_file_start(SENDER, TID, vec![RECEIVER], "x.bin".into(), 8192)
            .unwrap();
        // "AAAA" base64-decodes to 3 raw bytes, over the 2-byte cap.
        let out = coord.on_file_chunk(SENDER, TID, 0, "AAAA".into()).unwrap();
        assert!(out.iter().any(|o| matches!(
            &o.message,
            ServerMessage::FileAbort { reason, .. } if reason == "chunk_too_large"
        )));
    }

    #[test]
    fn abort_for_participant_tears_down_sessions_as_either_sender_or_receiver() {
        let coord = coordinator();
        let other_receiver = ParticipantId(3);
        coord
            .on_file_start(SENDER, TID, vec![RECEIVER], "x.bin".into(), 8192)
            .unwrap();
        coord
            .on_file_start(other_receiver, TransferId(9), vec![SENDER, RECEIVER], "y.bin".into(), 8192)
            .unwrap();

        let out = coord.abort_for_participant(SENDER);
        assert!(out.iter().any(|o| o.to == RECEIVER && matches!(&o.message, ServerMessage::FileAbort { transfer_id, .. } if *transfer_id == TID)));
        assert!(out.iter().any(|o| o.to == other_receiver && matches!(&o.message, ServerMessage::FileAbort { transfer_id, .. } if *transfer_id == TransferId(9))));

        // Both sessions involving SENDER are gone.
        let err = coord.on_file_ack(RECEIVER, TID, 0).unwrap_err();
        assert_eq!(err, ControlError::NotFound("no such transfer session"));
        let err = coord.on_file_ack(RECEIVER, TransferId(9), 0).unwrap_err();
        assert_eq!(err, ControlError::NotFound("no such transfer session"));
    }
}
