//! The Room Store (C5): a durable, keyed membership + game-state
//! abstraction with TTL (§4.5). `InMemoryRoomStore` is the only backend
//! implemented here; a process-restart-durable backend would satisfy the
//! same `RoomStore` trait behind a pluggable-factory split between an
//! in-memory and a database-backed service.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::InMemoryRoomStore;

use async_trait::async_trait;

use crate::domain::{ChatMessage, RoomConfig, RoomId, RoomMemberInfo, UserId};
use crate::engine::GameState;

pub const LOG_TARGET: &str = "room::store";

/// Chat history hard cap (§4.5 / §6.3).
pub const CHAT_HISTORY_LIMIT: usize = 100;

/// Default TTL for a room record, refreshed on every write (§4.5 / §6.3).
pub const DEFAULT_ROOM_TTL_SECS: u64 = 24 * 60 * 60;

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(&self, config: RoomConfig, owner: RoomMemberInfo) -> Result<(), StoreError>;
    async fn room_exists(&self, room_id: &RoomId) -> bool;
    async fn get_config(&self, room_id: &RoomId) -> Result<RoomConfig, StoreError>;
    async fn update_config<F>(&self, room_id: &RoomId, f: F) -> Result<RoomConfig, StoreError>
    where
        F: FnOnce(&mut RoomConfig) + Send;

    async fn get_members(&self, room_id: &RoomId) -> Result<Vec<RoomMemberInfo>, StoreError>;
    async fn get_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<RoomMemberInfo, StoreError>;
    async fn upsert_member(&self, room_id: &RoomId, member: RoomMemberInfo) -> Result<(), StoreError>;
    /// Removes a member entirely, freeing their seat for reuse (kickUser, §4.8).
    async fn remove_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StoreError>;
    async fn update_member<F>(&self, room_id: &RoomId, user_id: &UserId, f: F) -> Result<RoomMemberInfo, StoreError>
    where
        F: FnOnce(&mut RoomMemberInfo) + Send;

    async fn get_game(&self, room_id: &RoomId) -> Result<Option<GameState>, StoreError>;
    async fn set_game(&self, room_id: &RoomId, game: Option<GameState>) -> Result<(), StoreError>;

    async fn push_chat(&self, room_id: &RoomId, message: ChatMessage) -> Result<(), StoreError>;
    /// Last `CHAT_HISTORY_LIMIT` messages, oldest first (§6.1 `history`).
    async fn get_chat_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, StoreError>;

    /// Explicitly refreshes the room's TTL without otherwise mutating it.
    async fn touch(&self, room_id: &RoomId) -> Result<(), StoreError>;

    /// Deletes members/game/chat keys together (§3 lifecycle: owner closes room).
    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError>;
}
