use thiserror::Error;

pub type ControlResult<T> = Result<T, ControlError>;

/// Registry-level failures. The dispatcher maps these onto the wire
/// `ERROR{kind,reason}` frame and the error taxonomy of the spec (state
/// errors are non-terminal, resource errors are terminal for the affected
/// session only).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("failed precondition: {0}")]
    FailedPrecondition(&'static str),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}

/// The `ERROR.kind` field the dispatcher puts on the wire, per spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    State,
    Resource,
    Protocol,
}

impl ControlError {
    pub fn wire_kind(&self) -> ErrorKind {
        match self {
            ControlError::ResourceExhausted(_) => ErrorKind::Resource,
            _ => ErrorKind::State,
        }
    }
}
