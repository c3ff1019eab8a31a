use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{BoxError, Json, Router};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::domain::AuthenticatedUser;
use crate::runtime::{
    CreateRoomRequest, KickUserRequest, RoomRuntime, StartGameRequest, ToggleSeatRequest,
    TransferChipsRequest, UpdateMaxPlayersRequest, UpdateRoomFilterRequest,
};
use crate::store::RoomStore;

use super::dto::{
    CallerIdentity, JoinRoomRequest, MemberResponse, RoomCreatedResponse, RoomPath, SuccessResponse,
};
use super::error::ApiError;
use super::logging::log_requests;
use super::ws::ws_handler;

/// Per-command deadline (§5 "long-lived command handlers must respect a
/// deadline"): a REST command that hasn't produced a response by then is
/// refused rather than left to hang the caller indefinitely.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the full router: the `/ws` upgrade plus the Command Surface (C8)
/// exposed as authenticated REST calls. The caller's identity is expected to
/// arrive already resolved (the out-of-scope auth layer, §1); here it rides
/// as a JSON body field on each command for a self-contained example.
///
/// The timeout layer wraps only the REST command routes — `/ws` is a
/// long-lived connection and must not be torn down by a request deadline.
pub fn build_router<S: RoomStore + 'static>(runtime: Arc<RoomRuntime<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let commands = Router::new()
        .route("/rooms/:room_id", post(create_room::<S>))
        .route("/rooms/:room_id/join", post(join_room::<S>))
        .route("/rooms/:room_id/leave", post(leave_room::<S>))
        .route("/rooms/:room_id/close", post(close_room::<S>))
        .route("/rooms/:room_id/start", post(start_game::<S>))
        .route("/rooms/:room_id/seat", post(toggle_play_status::<S>))
        .route("/rooms/:room_id/kick", post(kick_user::<S>))
        .route("/rooms/:room_id/transfer", post(transfer_chips::<S>))
        .route("/rooms/:room_id/max-players", post(update_max_players::<S>))
        .route("/rooms/:room_id/filter", post(update_room_filter::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(COMMAND_TIMEOUT)),
        );

    Router::new()
        .route("/ws", get(ws_handler::<S>))
        .merge(commands)
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(runtime)
}

async fn handle_timeout(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "command deadline exceeded".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

#[derive(Debug, serde::Deserialize)]
struct CreateRoomBody {
    caller: CallerIdentity,
    #[serde(flatten)]
    request: CreateRoomRequest,
}

async fn create_room<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<CreateRoomBody>,
) -> Result<Json<RoomCreatedResponse>, ApiError> {
    let caller: AuthenticatedUser = body.caller.into();
    let config = runtime.create_room(room_id, &caller, body.request).await?;
    Ok(Json(RoomCreatedResponse { config }))
}

#[derive(Debug, serde::Deserialize)]
struct JoinRoomBody {
    caller: CallerIdentity,
    #[serde(flatten)]
    request: JoinRoomRequest,
}

async fn join_room<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<JoinRoomBody>,
) -> Result<Json<MemberResponse>, ApiError> {
    let caller: AuthenticatedUser = body.caller.into();
    let member = runtime.join_room(&room_id, &body.request.join_code, &caller).await?;
    Ok(Json(MemberResponse { member }))
}

#[derive(Debug, serde::Deserialize)]
struct CallerOnly {
    caller: CallerIdentity,
}

async fn leave_room<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<CallerOnly>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime.leave_room(&room_id, &body.caller.user_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn close_room<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<CallerOnly>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime.close_room(&room_id, &body.caller.user_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

async fn start_game<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<CallerOnly>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime
        .start_game(&body.caller.user_id, StartGameRequest { room_id })
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, serde::Deserialize)]
struct ToggleSeatBody {
    caller: CallerIdentity,
    wants_to_play: bool,
}

async fn toggle_play_status<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<ToggleSeatBody>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime
        .toggle_play_status(
            &body.caller.user_id,
            ToggleSeatRequest {
                room_id,
                wants_to_play: body.wants_to_play,
            },
        )
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, serde::Deserialize)]
struct KickUserBody {
    caller: CallerIdentity,
    target_user_id: String,
}

async fn kick_user<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<KickUserBody>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime
        .kick_user(
            &body.caller.user_id,
            KickUserRequest {
                room_id,
                target_user_id: body.target_user_id,
            },
        )
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, serde::Deserialize)]
struct TransferChipsBody {
    caller: CallerIdentity,
    to_user_id: String,
    amount: u64,
}

async fn transfer_chips<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<TransferChipsBody>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime
        .transfer_chips(
            &body.caller.user_id,
            TransferChipsRequest {
                room_id,
                to_user_id: body.to_user_id,
                amount: body.amount,
            },
        )
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, serde::Deserialize)]
struct UpdateMaxPlayersBody {
    caller: CallerIdentity,
    max_players: u8,
}

async fn update_max_players<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<UpdateMaxPlayersBody>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime
        .update_max_players(
            &body.caller.user_id,
            UpdateMaxPlayersRequest {
                room_id,
                max_players: body.max_players,
            },
        )
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[derive(Debug, serde::Deserialize)]
struct UpdateRoomFilterBody {
    caller: CallerIdentity,
    filter_profanity: bool,
}

async fn update_room_filter<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Path(RoomPath { room_id }): Path<RoomPath>,
    Json(body): Json<UpdateRoomFilterBody>,
) -> Result<Json<SuccessResponse>, ApiError> {
    runtime
        .update_room_filter(
            &body.caller.user_id,
            UpdateRoomFilterRequest {
                room_id,
                filter_profanity: body.filter_profanity,
            },
        )
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
