//! Room Runtime (C6): the per-room coordinator that owns the connection
//! set, serializes mutations with a per-room lock, dispatches actions to
//! the hand state machine (C4), and fans results out through the protocol
//! codec (C7) with per-viewer hole-card masking.
//!
//! One long-lived coordinator type wraps the shared services behind `Arc`
//! and keys a per-room registry, since this system runs many independent
//! rooms rather than a single global session.

mod commands;
mod connections;
mod errors;
pub mod protocol;

pub use commands::{
    CreateRoomRequest, KickUserRequest, StartGameRequest, ToggleSeatRequest,
    TransferChipsRequest, UpdateMaxPlayersRequest, UpdateRoomFilterRequest,
};
pub use connections::{ConnectionHandle, RoomConnections, CLOSE_SUPERSEDED};
pub use errors::CommandError;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use crate::domain::{ChatMessage, RoomId, UserId, CHAT_MESSAGE_MAX_LEN};
use crate::engine::{GamePhase, HandEngine, PlayerAction};
use crate::store::RoomStore;

pub const LOG_TARGET: &str = "room::runtime";

/// Default soft per-client chat rate limit (64-char messages, a 2s cooldown),
/// overridable via `RoomRuntime::with_chat_rate_limit_ms`.
pub const DEFAULT_CHAT_RATE_LIMIT_MS: i64 = 2_000;

pub struct RoomRuntime<S: RoomStore> {
    store: Arc<S>,
    rooms: DashMap<RoomId, Arc<TokioMutex<RoomConnections>>>,
    chat_rate_limit_ms: i64,
}

impl<S: RoomStore> RoomRuntime<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            rooms: DashMap::new(),
            chat_rate_limit_ms: DEFAULT_CHAT_RATE_LIMIT_MS,
        }
    }

    /// Overrides the chat cooldown, threaded from `--chat-rate-limit-ms`
    /// (§12 ambient configuration).
    pub fn with_chat_rate_limit_ms(mut self, millis: i64) -> Self {
        self.chat_rate_limit_ms = millis;
        self
    }

    pub fn chat_rate_limit_ms(&self) -> i64 {
        self.chat_rate_limit_ms
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn room_lock(&self, room_id: &RoomId) -> Arc<TokioMutex<RoomConnections>> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(TokioMutex::new(RoomConnections::new())))
            .clone()
    }

    /// Connection lifecycle: open (§4.6.1). Marks the member active, sends
    /// the three initial snapshots (room_state, game_state, history) while
    /// still holding the room lock so the client's baseline is consistent.
    pub async fn connect(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<ConnectionHandle, CommandError> {
        if !self.store.room_exists(room_id).await {
            return Err(CommandError::NotFound(format!("room {room_id}")));
        }
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;

        self.store
            .update_member(room_id, user_id, |m| m.is_active = true)
            .await?;

        let handle = conns.register(user_id.clone());

        let members = self.store.get_members(room_id).await?;
        conns.send_to(user_id, protocol::ServerMessage::RoomState { members });

        if let Some(game) = self.store.get_game(room_id).await? {
            conns.send_to(
                user_id,
                protocol::ServerMessage::GameState {
                    game_state: protocol::masked_snapshot(&game, user_id),
                },
            );
        }

        let history = self.store.get_chat_history(room_id).await?;
        conns.send_to(user_id, protocol::ServerMessage::History { messages: history });

        info!(target: LOG_TARGET, %room_id, %user_id, "connection opened");
        Ok(handle)
    }

    /// Connection lifecycle: close/error (§4.6.1). Marks the member inactive,
    /// drops the handle, broadcasts a fresh room_state, and if the room is
    /// now empty drops the in-memory connection-registry entry.
    pub async fn disconnect(&self, room_id: &RoomId, user_id: &UserId) {
        let lock = self.room_lock(room_id);
        let now_empty = {
            let mut conns = lock.lock().await;
            conns.remove(user_id);
            if let Err(err) = self
                .store
                .update_member(room_id, user_id, |m| m.is_active = false)
                .await
            {
                warn!(target: LOG_TARGET, %room_id, %user_id, %err, "failed to mark member inactive");
            }
            if let Ok(members) = self.store.get_members(room_id).await {
                conns.broadcast(protocol::ServerMessage::RoomState { members });
            }
            conns.is_empty()
        };
        if now_empty {
            self.rooms.remove(room_id);
        }
        info!(target: LOG_TARGET, %room_id, %user_id, "connection closed");
    }

    /// Sends a single `error` frame to one connection without touching
    /// durable state — used for soft limits enforced at the socket (e.g.
    /// the chat rate limit) that never reach the store.
    pub async fn send_error(&self, room_id: &RoomId, user_id: &UserId, message: impl Into<String>) {
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.send_to(user_id, protocol::ServerMessage::Error { message: message.into() });
    }

    /// Handles a `{type:"chat"}` frame: validates, persists, and broadcasts.
    /// Rate limiting is enforced by the caller (the socket task), which
    /// tracks the last-accepted timestamp per connection.
    pub async fn handle_chat(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        username: &str,
        body: &str,
        now: i64,
    ) -> Result<(), CommandError> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            // §6.1: "trimmed; empty dropped" — silently, not an error frame.
            return Ok(());
        }
        crate::domain::ChatMessage::validate_body(trimmed)
            .map_err(|err| CommandError::InvalidInput(err.to_string()))?;

        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            username: username.to_string(),
            message: trimmed.chars().take(CHAT_MESSAGE_MAX_LEN).collect(),
            timestamp: now,
        };

        self.store.push_chat(room_id, message.clone()).await?;

        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.broadcast(protocol::ServerMessage::Chat(message));
        Ok(())
    }

    /// Dispatch (§4.6.2): loads GameState, applies the action via C4,
    /// persists on success, and fans out a filtered patch. Poker rule
    /// violations (`InvalidAction`) are routed only to the acting socket,
    /// never broadcast, per §7's propagation policy.
    pub async fn handle_action(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        action: PlayerAction,
        now: i64,
    ) -> Result<(), CommandError> {
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;

        let Some(mut game) = self.store.get_game(room_id).await? else {
            conns.send_to(
                user_id,
                protocol::ServerMessage::Error {
                    message: "no hand in progress".to_string(),
                },
            );
            return Ok(());
        };
        let before = game.clone();

        if let Err(err) = HandEngine::apply_action(&mut game, user_id, action, now) {
            if err.is_internal() {
                // §7 Internal: the hand is aborted before persistence, so the
                // store still holds `before` and every committed chip is
                // implicitly returned — this in-memory `game` is simply
                // discarded. Logged loudly, never presented as the actor's
                // mistake (§9's "never silently truncate cards").
                tracing::error!(target: LOG_TARGET, %room_id, %user_id, %err, "hand aborted on internal invariant violation");
                conns.broadcast(protocol::ServerMessage::Error {
                    message: "the hand was aborted due to an internal error; chips are unaffected".to_string(),
                });
                return Ok(());
            }
            debug!(target: LOG_TARGET, %room_id, %user_id, %err, "action rejected");
            conns.send_to(
                user_id,
                protocol::ServerMessage::Error {
                    message: err.to_string(),
                },
            );
            return Ok(());
        }

        // §5: compute new state in memory -> single store write -> broadcast,
        // so a StoreFailure here never fans out a state the store didn't keep.
        if let Err(err) = self.store.set_game(room_id, Some(game.clone())).await {
            warn!(target: LOG_TARGET, %room_id, %user_id, %err, "store write failed after action, not broadcasting");
            return Err(err.into());
        }

        conns.broadcast_each(|viewer| protocol::ServerMessage::GameStatePatch {
            patches: protocol::diff_for_viewer(&before, &game, viewer),
        });

        if game.phase == GamePhase::EndHand {
            drop(conns);
            self.settle_end_of_hand(room_id, &game).await?;
        }

        Ok(())
    }

    /// End-of-hand bookkeeping (§4.6.4): writes every participant's final
    /// stack back to their durable `RoomMemberInfo` and re-broadcasts
    /// room_state so clients see the settled chip counts.
    async fn settle_end_of_hand(
        &self,
        room_id: &RoomId,
        game: &crate::engine::GameState,
    ) -> Result<(), CommandError> {
        for player in game.player_states.values() {
            self.store
                .update_member(room_id, &player.user_id, |m| m.current_stack = player.stack)
                .await?;
        }
        let members = self.store.get_members(room_id).await?;
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.broadcast(protocol::ServerMessage::RoomState { members });
        Ok(())
    }
}
