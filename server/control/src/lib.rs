pub mod errors;
pub mod events;
pub mod ids;
pub mod model;
pub mod perms;
pub mod protocol;
pub mod registry;

pub use errors::{ControlError, ControlResult};
pub use events::Outbound;
pub use ids::{MeetingCode, ParticipantId, TransferId};
pub use model::{ConnectionState, Meeting, Participant};
pub use protocol::{ClientMessage, ServerMessage, CLIENT_MESSAGE_TYPES};
pub use registry::MeetingRegistry;
