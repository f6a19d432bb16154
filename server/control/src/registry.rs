use crate::errors::{ControlError, ControlResult};
use crate::events::Outbound;
use crate::ids::{MeetingCode, ParticipantId};
use crate::model::{ConnectionState, Meeting, Participant};
use crate::perms::{self, Capability};
use crate::protocol::ServerMessage;
use parking_lot::RwLock;
use rand::RngExt;

/// Bound on rejection-sampling attempts when minting a fresh [`MeetingCode`],
/// matched against the per-meeting-create retry budget in spec §4.2.
const CODE_SAMPLE_ATTEMPTS: u32 = 64;

/// Upper bound on a display name's length, in UTF-8 bytes.
const MAX_NAME_BYTES: usize = 64;

fn validate_name(name: &str) -> ControlResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_BYTES {
        return Err(ControlError::InvalidArgument(
            "name must be a non-empty string of at most 64 UTF-8 bytes",
        ));
    }
    Ok(())
}

struct Inner {
    meetings: std::collections::HashMap<MeetingCode, Meeting>,
    participant_index: std::collections::HashMap<ParticipantId, MeetingCode>,
    next_participant_id: u32,
    max_meetings: usize,
}

impl Inner {
    fn mint_participant_id(&mut self) -> ParticipantId {
        self.next_participant_id += 1;
        ParticipantId(self.next_participant_id)
    }
}

/// Single shared in-memory meeting directory, guarded by one
/// `parking_lot::RwLock` — the same structure the teacher's
/// `InMemoryStore` uses for channel/membership bookkeeping, generalized
/// here to meeting creation, join admission, and departure.
pub struct MeetingRegistry {
    inner: RwLock<Inner>,
}

impl MeetingRegistry {
    pub fn new(max_meetings: usize) -> Self {
        MeetingRegistry {
            inner: RwLock::new(Inner {
                meetings: std::collections::HashMap::new(),
                participant_index: std::collections::HashMap::new(),
                next_participant_id: 0,
                max_meetings,
            }),
        }
    }

    /// Creates a new meeting with `host_name` as its host, returning the
    /// host's freshly minted id and the generated meeting code.
    pub fn create_meeting(&self, host_name: String) -> ControlResult<(ParticipantId, MeetingCode)> {
        validate_name(&host_name)?;
        let mut inner = self.inner.write();
        if inner.meetings.len() >= inner.max_meetings {
            return Err(ControlError::ResourceExhausted("maximum number of meetings reached"));
        }

        let code = Self::sample_unused_code(&inner)?;
        let host_id = inner.mint_participant_id();
        let host = Participant::new(host_id, host_name, true);
        let meeting = Meeting::new(code, host);

        inner.meetings.insert(code, meeting);
        inner.participant_index.insert(host_id, code);
        Ok((host_id, code))
    }

    fn sample_unused_code(inner: &Inner) -> ControlResult<MeetingCode> {
        let mut rng = rand::rng();
        for _ in 0..CODE_SAMPLE_ATTEMPTS {
            let candidate = MeetingCode(rng.random_range(MeetingCode::MIN..=MeetingCode::MAX));
            if !inner.meetings.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(ControlError::ResourceExhausted("could not allocate a unique meeting code"))
    }

    /// Registers a join request against `code`, returning the requester's
    /// minted id and the `Outbound`s to send (a `JOIN_REQUEST` to the host).
    pub fn request_join(
        &self,
        code: MeetingCode,
        name: String,
    ) -> ControlResult<(ParticipantId, Vec<Outbound>)> {
        validate_name(&name)?;
        let mut inner = self.inner.write();
        let participant_id = inner.mint_participant_id();

        let host = {
            let meeting = inner
                .meetings
                .get_mut(&code)
                .ok_or(ControlError::NotFound("no meeting with that code"))?;

            let participant = Participant::new(participant_id, name.clone(), false);
            meeting.participants.insert(participant_id, participant);
            meeting.host
        };
        inner.participant_index.insert(participant_id, code);

        let outbound = vec![Outbound::new(
            host,
            ServerMessage::JoinRequest {
                participant_id,
                name,
            },
        )];
        Ok((participant_id, outbound))
    }

    /// Admits a waiting participant, broadcasting `MEMBER_JOINED` to the
    /// rest of the admitted set and `JOIN_ACCEPTED` to the new member.
    pub fn admit(&self, actor: ParticipantId, target: ParticipantId) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.write();
        let code = *inner
            .participant_index
            .get(&actor)
            .ok_or(ControlError::NotFound("actor is not in a meeting"))?;
        let meeting = inner
            .meetings
            .get_mut(&code)
            .ok_or(ControlError::NotFound("no meeting with that code"))?;

        perms::check(meeting, actor, Capability::AdmitParticipant)?;

        let participant = meeting
            .participants
            .get_mut(&target)
            .ok_or(ControlError::NotFound("no such waiting participant"))?;
        if participant.state != ConnectionState::Waiting {
            return Err(ControlError::FailedPrecondition("participant is not waiting for admission"));
        }
        participant.state = ConnectionState::Admitted;
        let name = participant.name.clone();

        let mut out = vec![Outbound::new(target, ServerMessage::JoinAccepted { code })];
        out.extend(Outbound::fan_out(
            meeting.admitted_ids_excluding(target),
            ServerMessage::MemberJoined {
                participant_id: target,
                name,
            },
        ));
        Ok(out)
    }

    /// Denies a waiting participant and removes their record.
    pub fn deny(&self, actor: ParticipantId, target: ParticipantId) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.write();
        let code = *inner
            .participant_index
            .get(&actor)
            .ok_or(ControlError::NotFound("actor is not in a meeting"))?;
        let meeting = inner
            .meetings
            .get_mut(&code)
            .ok_or(ControlError::NotFound("no meeting with that code"))?;

        perms::check(meeting, actor, Capability::DenyParticipant)?;

        let participant = meeting
            .participants
            .get(&target)
            .ok_or(ControlError::NotFound("no such waiting participant"))?;
        if participant.state != ConnectionState::Waiting {
            return Err(ControlError::FailedPrecondition("participant is not waiting for admission"));
        }
        meeting.participants.remove(&target);
        inner.participant_index.remove(&target);

        Ok(vec![Outbound::new(target, ServerMessage::JoinRejected)])
    }

    /// Removes a participant from their meeting (explicit `LEAVE` or
    /// connection drop). Dissolves the meeting and notifies the remaining
    /// admitted set if the host left, or if no admitted participants
    /// remain.
    pub fn leave(&self, participant: ParticipantId) -> ControlResult<Vec<Outbound>> {
        let mut inner = self.inner.write();
        let code = match inner.participant_index.remove(&participant) {
            Some(code) => code,
            None => return Ok(Vec::new()),
        };

        let meeting = match inner.meetings.get_mut(&code) {
            Some(m) => m,
            None => return Ok(Vec::new()),
        };

        let was_host = meeting.host == participant;
        meeting.participants.remove(&participant);

        if was_host || meeting.is_empty_of_admitted() {
            let remaining = meeting.admitted_ids();
            for id in &remaining {
                inner.participant_index.remove(id);
            }
            inner.meetings.remove(&code);
            return Ok(Outbound::fan_out(remaining, ServerMessage::MeetingClosed));
        }

        Ok(Outbound::fan_out(
            meeting.admitted_ids(),
            ServerMessage::MemberLeft {
                participant_id: participant,
            },
        ))
    }

    /// Looks up the meeting code a participant currently belongs to.
    pub fn meeting_code_of(&self, participant: ParticipantId) -> Option<MeetingCode> {
        self.inner.read().participant_index.get(&participant).copied()
    }

    /// Admitted ids in `participant`'s meeting, excluding `participant`
    /// itself — the routing target for broadcast-minus-sender messages
    /// (`CHAT`/`FILE_START` with `to` absent).
    pub fn admitted_peers_of(&self, participant: ParticipantId) -> Vec<ParticipantId> {
        let inner = self.inner.read();
        let Some(code) = inner.participant_index.get(&participant) else {
            return Vec::new();
        };
        inner
            .meetings
            .get(code)
            .map(|m| m.admitted_ids_excluding(participant))
            .unwrap_or_default()
    }

    /// True if `participant` is currently in [`ConnectionState::Admitted`].
    pub fn is_admitted(&self, participant: ParticipantId) -> bool {
        let inner = self.inner.read();
        let Some(code) = inner.participant_index.get(&participant) else {
            return false;
        };
        inner
            .meetings
            .get(code)
            .and_then(|m| m.participants.get(&participant))
            .map(|p| p.state == ConnectionState::Admitted)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_meeting_admits_host_and_yields_code() {
        let registry = MeetingRegistry::new(16);
        let (host_id, code) = registry.create_meeting("Alice".into()).unwrap();
        assert_eq!(host_id, ParticipantId(1));
        assert!(code.0 >= MeetingCode::MIN && code.0 <= MeetingCode::MAX);
        assert!(registry.is_admitted(host_id));
    }

    #[test]
    fn create_meeting_rejects_empty_or_oversized_name() {
        let registry = MeetingRegistry::new(16);
        assert_eq!(
            registry.create_meeting(String::new()).unwrap_err(),
            ControlError::InvalidArgument("name must be a non-empty string of at most 64 UTF-8 bytes")
        );
        assert_eq!(
            registry.create_meeting("x".repeat(65)).unwrap_err(),
            ControlError::InvalidArgument("name must be a non-empty string of at most 64 UTF-8 bytes")
        );
        assert!(registry.create_meeting("x".repeat(64)).is_ok());
    }

    #[test]
    fn request_join_rejects_invalid_name() {
        let registry = MeetingRegistry::new(16);
        let (_, code) = registry.create_meeting("Alice".into()).unwrap();
        let err = registry.request_join(code, String::new()).unwrap_err();
        assert_eq!(
            err,
            ControlError::InvalidArgument("name must be a non-empty string of at most 64 UTF-8 bytes")
        );
    }

    #[test]
    fn create_meeting_rejects_once_cap_reached() {
        let registry = MeetingRegistry::new(1);
        registry.create_meeting("Alice".into()).unwrap();
        let err = registry.create_meeting("Bob".into()).unwrap_err();
        assert_eq!(err, ControlError::ResourceExhausted("maximum number of meetings reached"));
    }

    #[test]
    fn request_join_notifies_host_and_admit_notifies_peers() {
        let registry = MeetingRegistry::new(16);
        let (host_id, code) = registry.create_meeting("Alice".into()).unwrap();
        let (bob_id, outbound) = registry.request_join(code, "Bob".into()).unwrap();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].to, host_id);
        assert!(!registry.is_admitted(bob_id));

        let admit_out = registry.admit(host_id, bob_id).unwrap();
        assert!(registry.is_admitted(bob_id));
        assert!(admit_out.iter().any(|o| o.to == bob_id));
        assert!(admit_out.iter().any(|o| o.to == host_id));
    }

    #[test]
    fn non_host_cannot_admit() {
        let registry = MeetingRegistry::new(16);
        let (host_id, code) = registry.create_meeting("Alice".into()).unwrap();
        let (bob_id, _) = registry.request_join(code, "Bob".into()).unwrap();
        let (carol_id, _) = registry.request_join(code, "Carol".into()).unwrap();
        registry.admit(host_id, bob_id).unwrap();

        let err = registry.admit(bob_id, carol_id).unwrap_err();
        assert_eq!(
            err,
            ControlError::PermissionDenied("only the host may decide join requests")
        );
    }

    #[test]
    fn deny_removes_the_waiting_participant() {
        let registry = MeetingRegistry::new(16);
        let (host_id, code) = registry.create_meeting("Alice".into()).unwrap();
        let (bob_id, _) = registry.request_join(code, "Bob".into()).unwrap();

        let out = registry.deny(host_id, bob_id).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, bob_id);
        assert_eq!(registry.meeting_code_of(bob_id), None);
    }

    #[test]
    fn host_leaving_dissolves_the_meeting() {
        let registry = MeetingRegistry::new(16);
        let (host_id, code) = registry.create_meeting("Alice".into()).unwrap();
        let (bob_id, _) = registry.request_join(code, "Bob".into()).unwrap();
        registry.admit(host_id, bob_id).unwrap();

        let out = registry.leave(host_id).unwrap();
        assert!(out.iter().any(|o| o.to == bob_id));
        assert_eq!(registry.meeting_code_of(bob_id), None);
    }

    #[test]
    fn non_host_leaving_notifies_remaining_admitted_peers() {
        let registry = MeetingRegistry::new(16);
        let (host_id, code) = registry.create_meeting("Alice".into()).unwrap();
        let (bob_id, _) = registry.request_join(code, "Bob".into()).unwrap();
        registry.admit(host_id, bob_id).unwrap();

        let out = registry.leave(bob_id).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, host_id);
        assert!(registry.meeting_code_of(host_id).is_some());
    }
}
