use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{ChatMessage, RoomConfig, RoomId, RoomMemberInfo, UserId};
use crate::engine::GameState;

use super::error::StoreError;
use super::{RoomStore, CHAT_HISTORY_LIMIT, LOG_TARGET};

struct RoomRecord {
    config: RoomConfig,
    members: std::collections::HashMap<UserId, RoomMemberInfo>,
    game: Option<GameState>,
    /// Newest-first, trimmed to `CHAT_HISTORY_LIMIT` on every push (§4.5).
    chat: VecDeque<ChatMessage>,
    last_write: Instant,
}

impl RoomRecord {
    fn new(config: RoomConfig, owner: RoomMemberInfo) -> Self {
        let mut members = std::collections::HashMap::new();
        members.insert(owner.user_id.clone(), owner);
        Self {
            config,
            members,
            game: None,
            chat: VecDeque::new(),
            last_write: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_write = Instant::now();
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_write.elapsed() > ttl
    }
}

/// In-memory `RoomStore` with TTL-based background eviction, backed by a
/// `DashMap` of per-room locks so a slow room doesn't block reads/writes to
/// unrelated rooms.
pub struct InMemoryRoomStore {
    rooms: Arc<DashMap<RoomId, Mutex<RoomRecord>>>,
    ttl: Duration,
    cleanup_handle: Option<JoinHandle<()>>,
}

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

impl InMemoryRoomStore {
    pub fn new(ttl: Duration) -> Self {
        let rooms: Arc<DashMap<RoomId, Mutex<RoomRecord>>> = Arc::new(DashMap::new());
        let cleanup_handle = Self::start_cleanup_task(Arc::clone(&rooms), ttl);
        info!(target: LOG_TARGET, ttl_secs = ttl.as_secs(), "room store initialized");
        Self {
            rooms,
            ttl,
            cleanup_handle: Some(cleanup_handle),
        }
    }

    fn start_cleanup_task(rooms: Arc<DashMap<RoomId, Mutex<RoomRecord>>>, ttl: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let before = rooms.len();
                rooms.retain(|room_id, record| {
                    let expired = record.lock().is_expired(ttl);
                    if expired {
                        debug!(target: LOG_TARGET, %room_id, "evicting expired room");
                    }
                    !expired
                });
                let evicted = before - rooms.len();
                if evicted > 0 {
                    info!(target: LOG_TARGET, evicted, remaining = rooms.len(), "room store cleanup swept expired rooms");
                }
            }
        })
    }
}

impl Drop for InMemoryRoomStore {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn create_room(&self, config: RoomConfig, owner: RoomMemberInfo) -> Result<(), StoreError> {
        if self.rooms.contains_key(&config.room_id) {
            return Err(StoreError::RoomAlreadyExists(config.room_id.clone()));
        }
        let room_id = config.room_id.clone();
        self.rooms.insert(room_id, Mutex::new(RoomRecord::new(config, owner)));
        Ok(())
    }

    async fn room_exists(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    async fn get_config(&self, room_id: &RoomId) -> Result<RoomConfig, StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        Ok(entry.lock().config.clone())
    }

    async fn update_config<F>(&self, room_id: &RoomId, f: F) -> Result<RoomConfig, StoreError>
    where
        F: FnOnce(&mut RoomConfig) + Send,
    {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let mut record = entry.lock();
        f(&mut record.config);
        record.touch();
        Ok(record.config.clone())
    }

    async fn get_members(&self, room_id: &RoomId) -> Result<Vec<RoomMemberInfo>, StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        Ok(entry.lock().members.values().cloned().collect())
    }

    async fn get_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<RoomMemberInfo, StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        entry
            .lock()
            .members
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::MemberNotFound(user_id.clone()))
    }

    async fn upsert_member(&self, room_id: &RoomId, member: RoomMemberInfo) -> Result<(), StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let mut record = entry.lock();
        record.members.insert(member.user_id.clone(), member);
        record.touch();
        Ok(())
    }

    async fn remove_member(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let mut record = entry.lock();
        record
            .members
            .remove(user_id)
            .ok_or_else(|| StoreError::MemberNotFound(user_id.clone()))?;
        record.touch();
        Ok(())
    }

    async fn update_member<F>(&self, room_id: &RoomId, user_id: &UserId, f: F) -> Result<RoomMemberInfo, StoreError>
    where
        F: FnOnce(&mut RoomMemberInfo) + Send,
    {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let mut record = entry.lock();
        let member = record
            .members
            .get_mut(user_id)
            .ok_or_else(|| StoreError::MemberNotFound(user_id.clone()))?;
        f(member);
        let updated = member.clone();
        record.touch();
        Ok(updated)
    }

    async fn get_game(&self, room_id: &RoomId) -> Result<Option<GameState>, StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        Ok(entry.lock().game.clone())
    }

    async fn set_game(&self, room_id: &RoomId, game: Option<GameState>) -> Result<(), StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let mut record = entry.lock();
        record.game = game;
        record.touch();
        Ok(())
    }

    async fn push_chat(&self, room_id: &RoomId, message: ChatMessage) -> Result<(), StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let mut record = entry.lock();
        record.chat.push_front(message);
        record.chat.truncate(CHAT_HISTORY_LIMIT);
        record.touch();
        Ok(())
    }

    async fn get_chat_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        let record = entry.lock();
        Ok(record.chat.iter().rev().cloned().collect())
    }

    async fn touch(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let entry = self.rooms.get(room_id).ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        entry.lock().touch();
        Ok(())
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        self.rooms
            .remove(room_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(room_id: &str) -> RoomConfig {
        RoomConfig {
            room_id: room_id.to_string(),
            owner_id: "owner".to_string(),
            join_code: RoomConfig::generate_join_code(),
            max_players: 6,
            starting_stack: 1000,
            small_blind: 10,
            big_blind: 20,
            ante: 0,
            hand_delay_seconds: 3,
            filter_profanity: true,
            public: true,
        }
    }

    fn owner() -> RoomMemberInfo {
        RoomMemberInfo::new("owner".to_string(), "alice".to_string(), 1, 1000)
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let store = InMemoryRoomStore::new(Duration::from_secs(60));
        store.create_room(config("r1"), owner()).await.unwrap();
        let members = store.get_members(&"r1".to_string()).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_room_id_is_rejected() {
        let store = InMemoryRoomStore::new(Duration::from_secs(60));
        store.create_room(config("r1"), owner()).await.unwrap();
        let err = store.create_room(config("r1"), owner()).await.unwrap_err();
        assert_eq!(err, StoreError::RoomAlreadyExists("r1".to_string()));
    }

    #[tokio::test]
    async fn chat_history_is_capped_and_oldest_first() {
        let store = InMemoryRoomStore::new(Duration::from_secs(60));
        store.create_room(config("r1"), owner()).await.unwrap();
        for i in 0..150 {
            store
                .push_chat(
                    &"r1".to_string(),
                    ChatMessage {
                        id: i.to_string(),
                        room_id: "r1".to_string(),
                        user_id: "owner".to_string(),
                        username: "alice".to_string(),
                        message: format!("msg {i}"),
                        timestamp: i as i64,
                    },
                )
                .await
                .unwrap();
        }
        let history = store.get_chat_history(&"r1".to_string()).await.unwrap();
        assert_eq!(history.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(history.first().unwrap().message, "msg 50");
        assert_eq!(history.last().unwrap().message, "msg 149");
    }

    #[tokio::test]
    async fn delete_room_removes_it() {
        let store = InMemoryRoomStore::new(Duration::from_secs(60));
        store.create_room(config("r1"), owner()).await.unwrap();
        store.delete_room(&"r1".to_string()).await.unwrap();
        assert!(!store.room_exists(&"r1".to_string()).await);
    }
}
