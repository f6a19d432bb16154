//! Per-connection message dispatch: the full state machine of spec §4.3,
//! wired to the meeting registry and transfer coordinator. One
//! [`Dispatcher`] is created per accepted control connection and owns that
//! connection's admission/membership context.

use crate::frame::encode_server_message;
use crate::state::AppState;
use base64::Engine;
use std::sync::Arc;
use tracing::{debug, warn};
use vp_control::{ClientMessage, ControlError, Outbound, ParticipantId, ServerMessage};

pub struct Dispatcher {
    state: Arc<AppState>,
    /// Set once this connection creates a meeting or has a join request
    /// registered; `None` until then.
    participant_id: Option<ParticipantId>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>) -> Self {
        Dispatcher {
            state,
            participant_id: None,
        }
    }

    pub fn participant_id(&self) -> Option<ParticipantId> {
        self.participant_id
    }

    /// Handles one inbound message, returning the outbound frames to route
    /// (each already matched to a recipient by the caller via the hub).
    pub fn handle(&mut self, msg: ClientMessage) -> Vec<Outbound> {
        self.state.control_metrics.msg_rx(msg.kind());
        let result = self.dispatch(msg);
        match result {
            Ok(out) => out,
            Err(err) => {
                let Some(id) = self.participant_id else {
                    warn!(?err, "control error before a participant id was assigned");
                    return Vec::new();
                };
                vec![Outbound::new(
                    id,
                    ServerMessage::Error {
                        kind: err.wire_kind(),
                        reason: err.to_string(),
                    },
                )]
            }
        }
    }

    fn dispatch(&mut self, msg: ClientMessage) -> Result<Vec<Outbound>, ControlError> {
        match msg {
            ClientMessage::CreateMeeting { name } => {
                let (id, code) = self.state.registry.create_meeting(name)?;
                self.participant_id = Some(id);
                self.state.meetings_metrics.created();
                Ok(vec![Outbound::new(id, ServerMessage::MeetingCreated { code })])
            }

            ClientMessage::RequestJoin { code, name } => {
                let (id, mut out) = self.state.registry.request_join(code, name)?;
                self.participant_id = Some(id);
                out.push(Outbound::new(id, ServerMessage::JoinPending));
                Ok(out)
            }

            ClientMessage::AllowJoin { participant_id } => {
                let actor = self.require_self()?;
                let out = self.state.registry.admit(actor, participant_id)?;
                self.state.meetings_metrics.join_allowed();
                Ok(out)
            }

            ClientMessage::DenyJoin { participant_id } => {
                let actor = self.require_self()?;
                let out = self.state.registry.deny(actor, participant_id)?;
                self.state.meetings_metrics.join_denied();
                Ok(out)
            }

            ClientMessage::Chat { to, text } => {
                let from = self.require_member()?;
                self.state.meetings_metrics.chat_routed();
                let ts = chrono::Utc::now().timestamp();
                let message = ServerMessage::ChatBroadcast { from, text, ts };
                Ok(self.route_to_or_broadcast(from, to, message))
            }

            ClientMessage::FileStart { transfer_id, to, name, size } => {
                let from = self.require_member()?;
                let receivers = self.resolve_receivers(from, to);
                self.state.transfer_metrics.session_opened();
                Ok(self.state.transfer.on_file_start(from, transfer_id, receivers, name, size)?)
            }

            ClientMessage::FileChunk { transfer_id, seq, data } => {
                let from = self.require_member()?;
                if base64::engine::general_purpose::STANDARD.decode(&data).is_err() {
                    return Err(ControlError::InvalidArgument("FILE_CHUNK.data is not valid base64"));
                }
                Ok(self.state.transfer.on_file_chunk(from, transfer_id, seq, data)?)
            }

            ClientMessage::FileAck { transfer_id, seq } => {
                let from = self.require_member()?;
                Ok(self.state.transfer.on_file_ack(from, transfer_id, seq)?)
            }

            ClientMessage::FileEnd { transfer_id } => {
                let from = self.require_member()?;
                self.state.transfer_metrics.session_completed();
                Ok(self.state.transfer.on_file_end(from, transfer_id)?)
            }

            ClientMessage::VideoStats {
                from_media_sender,
                loss,
                rtt_ms,
                fps,
                bitrate_kbps,
            } => {
                self.require_member()?;
                Ok(vec![Outbound::new(
                    from_media_sender,
                    ServerMessage::VideoStatsUpdate {
                        from_media_sender,
                        loss,
                        rtt_ms,
                        fps,
                        bitrate_kbps,
                    },
                )])
            }

            ClientMessage::Leave => {
                let id = self.require_member()?;
                debug!(participant_id = %id, "participant left");
                let mut out = self.state.registry.leave(id)?;
                out.extend(self.state.transfer.abort_for_participant(id));
                Ok(out)
            }
        }
    }

    /// Resolves the receiver set for a maybe-targeted message: the named
    /// participant if `to` is set, otherwise every other admitted
    /// participant in the sender's meeting.
    fn resolve_receivers(&self, from: ParticipantId, to: Option<ParticipantId>) -> Vec<ParticipantId> {
        match to {
            Some(target) => vec![target],
            None => self.state.registry.admitted_peers_of(from),
        }
    }

    fn route_to_or_broadcast(&self, from: ParticipantId, to: Option<ParticipantId>, message: ServerMessage) -> Vec<Outbound> {
        Outbound::fan_out(self.resolve_receivers(from, to), message)
    }

    fn require_self(&self) -> Result<ParticipantId, ControlError> {
        self.participant_id
            .ok_or(ControlError::FailedPrecondition("connection has not created or joined a meeting yet"))
    }

    /// Like [`Self::require_self`], but additionally requires the
    /// connection to currently be an admitted member of its meeting —
    /// waiting-for-admission and left/denied participants fail this check
    /// even though their id was minted and still resolves.
    fn require_member(&self) -> Result<ParticipantId, ControlError> {
        let id = self.require_self()?;
        if !self.state.registry.is_admitted(id) {
            return Err(ControlError::FailedPrecondition(
                "connection is not an admitted member of a meeting",
            ));
        }
        Ok(id)
    }
}

/// Builds the wire bytes for one [`Outbound`] and counts it for metrics.
pub fn encode_outbound(state: &AppState, outbound: &Outbound) -> anyhow::Result<Vec<u8>> {
    state.control_metrics.msg_tx(outbound.message.kind());
    encode_server_message(&outbound.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use clap::Parser;

    fn test_state() -> Arc<AppState> {
        let config = Config::parse_from(["vp-gateway"]);
        Arc::new(AppState::new(config))
    }

    #[test]
    fn create_then_request_join_then_admit_flow() {
        let state = test_state();
        let mut host = Dispatcher::new(state.clone());
        let out = host.handle(ClientMessage::CreateMeeting { name: "Alice".into() });
        let code = match &out[0].message {
            ServerMessage::MeetingCreated { code } => *code,
            other => panic!("unexpected: {other:?}"),
        };

        let mut guest = Dispatcher::new(state.clone());
        let out = guest.handle(ClientMessage::RequestJoin { code, name: "Bob".into() });
        assert!(out.iter().any(|o| matches!(o.message, ServerMessage::JoinPending)));
        let bob_id = guest.participant_id().unwrap();

        let host_id = host.participant_id().unwrap();
        let out = host.handle(ClientMessage::AllowJoin { participant_id: bob_id });
        assert!(out.iter().any(|o| o.to == bob_id && matches!(o.message, ServerMessage::JoinAccepted { .. })));
        assert!(out.iter().any(|o| o.to == host_id));
    }

    #[test]
    fn messages_before_admission_are_rejected_with_failed_precondition() {
        let state = test_state();
        let mut conn = Dispatcher::new(state);
        let out = conn.handle(ClientMessage::Chat { to: None, text: "hi".into() });
        assert!(out.is_empty(), "no participant id yet, so no recipient to notify");
    }

    #[test]
    fn waiting_participant_cannot_chat_before_admission() {
        let state = test_state();
        let mut host = Dispatcher::new(state.clone());
        let out = host.handle(ClientMessage::CreateMeeting { name: "Alice".into() });
        let code = match &out[0].message {
            ServerMessage::MeetingCreated { code } => *code,
            other => panic!("unexpected: {other:?}"),
        };

        let mut guest = Dispatcher::new(state.clone());
        guest.handle(ClientMessage::RequestJoin { code, name: "Bob".into() });

        let out = guest.handle(ClientMessage::Chat {
            to: None,
            text: "hi before admission".into(),
        });
        let bob_id = guest.participant_id().unwrap();
        assert!(out.iter().any(|o| o.to == bob_id
            && matches!(&o.message, ServerMessage::Error { kind, .. } if *kind == vp_control::errors::ErrorKind::State)));
    }
}
