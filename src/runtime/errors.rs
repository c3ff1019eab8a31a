use crate::store::StoreError;

/// §7 error taxonomy as it surfaces from a command entry point (C8). Action
/// errors (`InvalidAction`) are routed to the acting socket directly by the
/// dispatch loop and never constructed here — see `engine::HandError`.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    ForbiddenPolicy(String),
    #[error("conflict: {0}")]
    ConflictState(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store failure: {0}")]
    StoreFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(id) => CommandError::NotFound(format!("room {id}")),
            StoreError::MemberNotFound(id) => CommandError::NotFound(format!("member {id}")),
            StoreError::RoomAlreadyExists(id) => {
                CommandError::ConflictState(format!("room {id} already exists"))
            }
            StoreError::Unreachable(message) => CommandError::StoreFailure(message),
        }
    }
}

impl From<crate::domain::RoomConfigError> for CommandError {
    fn from(err: crate::domain::RoomConfigError) -> Self {
        CommandError::InvalidInput(err.to_string())
    }
}

impl From<crate::engine::HandError> for CommandError {
    fn from(err: crate::engine::HandError) -> Self {
        CommandError::Internal(err.to_string())
    }
}
