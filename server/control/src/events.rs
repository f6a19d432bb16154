use crate::ids::ParticipantId;
use crate::protocol::ServerMessage;

/// A server message addressed to a specific connection. Registry operations
/// return `Vec<Outbound>` instead of mutating any connection directly —
/// the dispatcher is the only thing that owns a write-queue handle, so
/// routing decisions and I/O stay separated the way the teacher's
/// `MembershipService` methods hand back `Vec<ControlEvent>` for the
/// gateway layer to push.
#[derive(Clone, Debug)]
pub struct Outbound {
    pub to: ParticipantId,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn new(to: ParticipantId, message: ServerMessage) -> Self {
        Outbound { to, message }
    }

    /// Build one [`Outbound`] per recipient in `to`, all carrying the same
    /// message — the common case for broadcasts to an admitted set.
    pub fn fan_out(to: impl IntoIterator<Item = ParticipantId>, message: ServerMessage) -> Vec<Outbound> {
        to.into_iter()
            .map(|id| Outbound::new(id, message.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_builds_one_outbound_per_recipient() {
        let out = Outbound::fan_out(
            [ParticipantId(1), ParticipantId(2)],
            ServerMessage::MeetingClosed,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].to, ParticipantId(1));
        assert_eq!(out[1].to, ParticipantId(2));
    }
}
