use serde::{Deserialize, Serialize};

use crate::domain::{AuthenticatedUser, RoomConfig, RoomId, RoomMemberInfo, UserId};

/// Query params for `GET /ws` (§6.1 connect URL). Individually optional so a
/// missing field can be reported as a 1008 close *after* the upgrade, per
/// spec, rather than rejected at the HTTP layer.
#[derive(Debug, Default, Deserialize)]
pub struct WsConnectQuery {
    pub room_id: Option<RoomId>,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
}

/// Stand-in for the out-of-scope auth layer (§1): every REST command is
/// authenticated by some external mechanism that resolves to this identity.
/// Carried here as a header-derived extractor in `routes.rs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub username: String,
    pub email_verified: bool,
}

impl From<CallerIdentity> for AuthenticatedUser {
    fn from(identity: CallerIdentity) -> Self {
        AuthenticatedUser {
            user_id: identity.user_id,
            username: identity.username,
            email_verified: identity.email_verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomCreatedResponse {
    pub config: RoomConfig,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member: RoomMemberInfo,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub join_code: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomPath {
    pub room_id: RoomId,
}
