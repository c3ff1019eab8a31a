/// §7 `StoreFailure` / `NotFound` as they surface from the Room Store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("member {0} not found in room")]
    MemberNotFound(String),
    #[error("room {0} already exists")]
    RoomAlreadyExists(String),
    #[error("backing store unreachable: {0}")]
    Unreachable(String),
}
