use crate::errors::{ControlError, ControlResult};
use crate::ids::ParticipantId;
use crate::model::Meeting;

/// Actions gated to the meeting host, per spec §4.3's admission rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    AdmitParticipant,
    DenyParticipant,
}

/// Checks whether `actor` may exercise `cap` in `meeting`, returning the
/// matching [`ControlError`] if not.
pub fn check(meeting: &Meeting, actor: ParticipantId, cap: Capability) -> ControlResult<()> {
    match cap {
        Capability::AdmitParticipant | Capability::DenyParticipant => {
            if meeting.host == actor {
                Ok(())
            } else {
                Err(ControlError::PermissionDenied("only the host may decide join requests"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MeetingCode;
    use crate::model::Participant;

    fn meeting_with_host() -> Meeting {
        let host = Participant::new(ParticipantId(1), "Alice".into(), true);
        Meeting::new(MeetingCode(100000), host)
    }

    #[test]
    fn host_may_admit() {
        let meeting = meeting_with_host();
        assert!(check(&meeting, ParticipantId(1), Capability::AdmitParticipant).is_ok());
    }

    #[test]
    fn non_host_may_not_admit() {
        let meeting = meeting_with_host();
        let err = check(&meeting, ParticipantId(9), Capability::AdmitParticipant).unwrap_err();
        assert_eq!(
            err,
            ControlError::PermissionDenied("only the host may decide join requests")
        );
    }
}
