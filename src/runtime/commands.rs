//! Command Surface (C8): authenticated entry points with the policy checks
//! from §4.8. Each command serializes under the room's lock alongside
//! action dispatch and connection lifecycle, per §5's single-writer rule.

use serde::Deserialize;
use tracing::info;

use crate::domain::{AuthenticatedUser, Chips, RoomConfig, RoomId, RoomMemberInfo, SeatNumber, UserId};
use crate::engine::{GamePhase, HandEngine, HandParticipant, HandStakes};
use crate::store::RoomStore;

use super::protocol::ServerMessage;
use super::{CommandError, RoomRuntime, LOG_TARGET};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub max_players: u8,
    pub starting_stack: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub ante: Chips,
    pub hand_delay_seconds: u32,
    pub filter_profanity: bool,
    pub public: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartGameRequest {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleSeatRequest {
    pub room_id: RoomId,
    pub wants_to_play: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickUserRequest {
    pub room_id: RoomId,
    pub target_user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferChipsRequest {
    pub room_id: RoomId,
    pub to_user_id: UserId,
    pub amount: Chips,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMaxPlayersRequest {
    pub room_id: RoomId,
    pub max_players: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoomFilterRequest {
    pub room_id: RoomId,
    pub filter_profanity: bool,
}

fn no_hand_in_progress(phase: Option<GamePhase>) -> bool {
    matches!(phase, None | Some(GamePhase::Waiting) | Some(GamePhase::EndHand))
}

impl<S: RoomStore> RoomRuntime<S> {
    /// `createRoom(cfg)` (§4.8). Room-catalog concerns ("user has no active
    /// room") belong to the out-of-scope CRUD layer (§1); this validates the
    /// config itself and the caller's identity.
    pub async fn create_room(
        &self,
        room_id: RoomId,
        owner: &AuthenticatedUser,
        request: CreateRoomRequest,
    ) -> Result<RoomConfig, CommandError> {
        if !owner.email_verified {
            return Err(CommandError::ForbiddenPolicy("email not verified".to_string()));
        }
        let config = RoomConfig {
            room_id: room_id.clone(),
            owner_id: owner.user_id.clone(),
            join_code: RoomConfig::generate_join_code(),
            max_players: request.max_players,
            starting_stack: request.starting_stack,
            small_blind: request.small_blind,
            big_blind: request.big_blind,
            ante: request.ante,
            hand_delay_seconds: request.hand_delay_seconds,
            filter_profanity: request.filter_profanity,
            public: request.public,
        };
        config.validate()?;

        let owner_member = RoomMemberInfo::new(owner.user_id.clone(), owner.username.clone(), 1, config.starting_stack);
        self.store.create_room(config.clone(), owner_member).await?;
        info!(target: LOG_TARGET, %room_id, owner = %owner.user_id, "room created");
        Ok(config)
    }

    /// `joinRoom(joinCode)` (§4.8). Assigns the lowest unused seat.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        join_code: &str,
        user: &AuthenticatedUser,
    ) -> Result<RoomMemberInfo, CommandError> {
        if !user.email_verified {
            return Err(CommandError::ForbiddenPolicy("email not verified".to_string()));
        }
        let config = self.store.get_config(room_id).await?;
        if config.join_code != join_code {
            return Err(CommandError::NotFound("room".to_string()));
        }
        let _guard = self.room_lock(room_id).lock().await;

        let members = self.store.get_members(room_id).await?;
        if members.iter().any(|m| m.user_id == user.user_id) {
            return Err(CommandError::ConflictState("already a member".to_string()));
        }
        if members.len() as u8 >= config.max_players {
            return Err(CommandError::ConflictState("room is full".to_string()));
        }

        let taken: std::collections::HashSet<SeatNumber> = members.iter().map(|m| m.seat_number).collect();
        let seat = (1..=config.max_players)
            .find(|s| !taken.contains(s))
            .ok_or_else(|| CommandError::ConflictState("room is full".to_string()))?;

        let member = RoomMemberInfo::new(user.user_id.clone(), user.username.clone(), seat, config.starting_stack);
        self.store.upsert_member(room_id, member.clone()).await?;

        let members = self.store.get_members(room_id).await?;
        drop(_guard);
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.broadcast(ServerMessage::RoomState { members });
        Ok(member)
    }

    /// `leaveRoom(roomId)` (§4.8).
    pub async fn leave_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), CommandError> {
        let _guard = self.room_lock(room_id).lock().await;
        let game = self.store.get_game(room_id).await?;
        if !no_hand_in_progress(game.map(|g| g.phase)) {
            return Err(CommandError::ConflictState("hand in progress".to_string()));
        }
        self.store.remove_member(room_id, user_id).await?;
        let members = self.store.get_members(room_id).await?;
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.remove(user_id);
        conns.broadcast(ServerMessage::RoomState { members });
        Ok(())
    }

    /// `closeRoom(roomId)` (§4.8). Deletes all room keys and terminates
    /// every connected socket (§4.6.5 `broadcastRoomClosed`).
    pub async fn close_room(&self, room_id: &RoomId, caller: &UserId) -> Result<(), CommandError> {
        let config = self.store.get_config(room_id).await?;
        if &config.owner_id != caller {
            return Err(CommandError::ForbiddenPolicy("caller is not the room owner".to_string()));
        }
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        let game = self.store.get_game(room_id).await?;
        if !no_hand_in_progress(game.map(|g| g.phase)) {
            return Err(CommandError::ConflictState("hand in progress".to_string()));
        }
        conns.close_all(ServerMessage::RoomClosed);
        drop(conns);
        self.rooms.remove(room_id);
        self.store.delete_room(room_id).await?;
        info!(target: LOG_TARGET, %room_id, "room closed by owner");
        Ok(())
    }

    /// `startGame(roomId)` (§4.8). Builds participants from members who are
    /// active, opted-in, and can post a big blind, then runs C4's start-hand.
    pub async fn start_game(&self, caller: &UserId, request: StartGameRequest) -> Result<(), CommandError> {
        let room_id = &request.room_id;
        let config = self.store.get_config(room_id).await?;
        if &config.owner_id != caller {
            return Err(CommandError::ForbiddenPolicy("caller is not the room owner".to_string()));
        }
        let _guard = self.room_lock(room_id).lock().await;

        let existing = self.store.get_game(room_id).await?;
        if !no_hand_in_progress(existing.as_ref().map(|g| g.phase)) {
            return Err(CommandError::ConflictState("hand already in progress".to_string()));
        }

        let members = self.store.get_members(room_id).await?;
        let ready: Vec<&RoomMemberInfo> = members
            .iter()
            .filter(|m| m.is_eligible_for_next_hand())
            .collect();
        if ready.len() < 2 {
            return Err(CommandError::ConflictState("need at least 2 ready players".to_string()));
        }

        let participants: Vec<HandParticipant> = ready
            .iter()
            .map(|m| HandParticipant {
                user_id: m.user_id.clone(),
                seat_number: m.seat_number,
                stack: m.current_stack,
                is_sitting_out: false,
            })
            .collect();

        // §3: `wantsToPlayNextHand` is reset at each hand start — a
        // participant must opt back in for the hand after this one.
        for participant in &participants {
            self.store
                .update_member(room_id, &participant.user_id, |m| m.wants_to_play_next_hand = false)
                .await?;
        }

        let stakes = HandStakes {
            small_blind: config.small_blind,
            big_blind: config.big_blind,
            ante: config.ante,
        };
        let previous_dealer_seat = existing.as_ref().map(|g| g.dealer_seat);
        let now = self.clock_now();
        let game = HandEngine::start_hand(participants, stakes, previous_dealer_seat, now)?;

        self.store.set_game(room_id, Some(game.clone())).await?;

        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.broadcast_each(|viewer| ServerMessage::GameState {
            game_state: super::protocol::masked_snapshot(&game, viewer),
        });
        info!(target: LOG_TARGET, %room_id, players = participants_len(&game), "hand started");
        Ok(())
    }

    /// `togglePlayStatus(roomId, want)` (§4.8).
    pub async fn toggle_play_status(&self, user_id: &UserId, request: ToggleSeatRequest) -> Result<(), CommandError> {
        let room_id = &request.room_id;
        let _guard = self.room_lock(room_id).lock().await;
        let game = self.store.get_game(room_id).await?;
        if !no_hand_in_progress(game.map(|g| g.phase)) {
            return Err(CommandError::ConflictState("hand in progress".to_string()));
        }
        let config = self.store.get_config(room_id).await?;
        let member = self.store.get_member(room_id, user_id).await?;
        if !member.is_active {
            return Err(CommandError::ConflictState("member is not active".to_string()));
        }
        if request.wants_to_play && config.ante > 0 && member.current_stack < config.ante {
            return Err(CommandError::InvalidInput("stack is below the ante".to_string()));
        }
        self.store
            .update_member(room_id, user_id, |m| m.wants_to_play_next_hand = request.wants_to_play)
            .await?;
        let members = self.store.get_members(room_id).await?;
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.broadcast(ServerMessage::RoomState { members });
        Ok(())
    }

    /// `kickUser(roomId, target)` (§4.8).
    pub async fn kick_user(&self, caller: &UserId, request: KickUserRequest) -> Result<(), CommandError> {
        let room_id = &request.room_id;
        let config = self.store.get_config(room_id).await?;
        if &config.owner_id != caller {
            return Err(CommandError::ForbiddenPolicy("caller is not the room owner".to_string()));
        }
        if &request.target_user_id == caller {
            return Err(CommandError::ForbiddenPolicy("cannot kick yourself".to_string()));
        }
        let _guard = self.room_lock(room_id).lock().await;
        let game = self.store.get_game(room_id).await?;
        if !no_hand_in_progress(game.map(|g| g.phase)) {
            return Err(CommandError::ConflictState("hand in progress".to_string()));
        }
        self.store.remove_member(room_id, &request.target_user_id).await?;

        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.send_to(
            &request.target_user_id,
            ServerMessage::UserKicked {
                reason: "removed by room owner".to_string(),
            },
        );
        conns.remove(&request.target_user_id);
        let members = self.store.get_members(room_id).await?;
        conns.broadcast(ServerMessage::RoomState { members });
        Ok(())
    }

    /// `transferChips(roomId, to, amt)` (§4.8).
    pub async fn transfer_chips(&self, from: &UserId, request: TransferChipsRequest) -> Result<(), CommandError> {
        let room_id = &request.room_id;
        if &request.to_user_id == from {
            return Err(CommandError::InvalidInput("cannot transfer to yourself".to_string()));
        }
        if request.amount == 0 {
            return Err(CommandError::InvalidInput("amount must be positive".to_string()));
        }
        let _guard = self.room_lock(room_id).lock().await;
        let game = self.store.get_game(room_id).await?;
        if !no_hand_in_progress(game.map(|g| g.phase)) {
            return Err(CommandError::ConflictState("hand in progress".to_string()));
        }
        let sender = self.store.get_member(room_id, from).await?;
        let receiver = self.store.get_member(room_id, &request.to_user_id).await?;
        if !sender.is_active || !receiver.is_active {
            return Err(CommandError::ConflictState("both parties must be active".to_string()));
        }
        if sender.current_stack < request.amount {
            return Err(CommandError::InvalidInput("insufficient stack".to_string()));
        }

        self.store
            .update_member(room_id, from, |m| m.current_stack -= request.amount)
            .await?;
        self.store
            .update_member(room_id, &request.to_user_id, |m| m.current_stack += request.amount)
            .await?;

        let members = self.store.get_members(room_id).await?;
        let lock = self.room_lock(room_id);
        let mut conns = lock.lock().await;
        conns.broadcast(ServerMessage::RoomState { members });
        Ok(())
    }

    /// `updateMaxPlayers(roomId, n)` (§4.8).
    pub async fn update_max_players(&self, caller: &UserId, request: UpdateMaxPlayersRequest) -> Result<(), CommandError> {
        let room_id = &request.room_id;
        let config = self.store.get_config(room_id).await?;
        if &config.owner_id != caller {
            return Err(CommandError::ForbiddenPolicy("caller is not the room owner".to_string()));
        }
        if request.max_players <= config.max_players || request.max_players > 8 {
            return Err(CommandError::InvalidInput("maxPlayers must grow and stay <= 8".to_string()));
        }
        let active_count = self.store.get_members(room_id).await?.iter().filter(|m| m.is_active).count() as u8;
        if request.max_players < active_count {
            return Err(CommandError::InvalidInput("maxPlayers must not shrink below active member count".to_string()));
        }
        self.store
            .update_config(room_id, |c| c.max_players = request.max_players)
            .await?;
        Ok(())
    }

    /// `updateRoomFilter(roomId, bool)` (§4.8).
    pub async fn update_room_filter(&self, caller: &UserId, request: UpdateRoomFilterRequest) -> Result<(), CommandError> {
        let room_id = &request.room_id;
        let config = self.store.get_config(room_id).await?;
        if &config.owner_id != caller {
            return Err(CommandError::ForbiddenPolicy("caller is not the room owner".to_string()));
        }
        self.store
            .update_config(room_id, |c| c.filter_profanity = request.filter_profanity)
            .await?;
        Ok(())
    }

    fn clock_now(&self) -> i64 {
        super::protocol::unix_timestamp_millis()
    }
}

fn participants_len(game: &crate::engine::GameState) -> usize {
    game.player_states.len()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::domain::AuthenticatedUser;
    use crate::store::InMemoryRoomStore;

    use super::*;

    fn runtime() -> RoomRuntime<InMemoryRoomStore> {
        RoomRuntime::new(Arc::new(InMemoryRoomStore::new(Duration::from_secs(60))))
    }

    fn user(id: &str, verified: bool) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: id.to_string(),
            username: id.to_string(),
            email_verified: verified,
        }
    }

    fn create_request() -> CreateRoomRequest {
        CreateRoomRequest {
            max_players: 4,
            starting_stack: 1000,
            small_blind: 10,
            big_blind: 20,
            ante: 0,
            hand_delay_seconds: 3,
            filter_profanity: true,
            public: true,
        }
    }

    #[tokio::test]
    async fn create_room_rejects_unverified_email() {
        let rt = runtime();
        let err = rt
            .create_room("r1".to_string(), &user("owner", false), create_request())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ForbiddenPolicy(_)));
    }

    #[tokio::test]
    async fn create_room_rejects_invalid_config() {
        let rt = runtime();
        let mut request = create_request();
        request.big_blind = request.small_blind;
        let err = rt
            .create_room("r1".to_string(), &user("owner", true), request)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn join_room_assigns_lowest_unused_seat_and_rejects_wrong_code() {
        let rt = runtime();
        let owner = user("owner", true);
        let config = rt.create_room("r1".to_string(), &owner, create_request()).await.unwrap();

        let err = rt
            .join_room(&"r1".to_string(), "wrong-code", &user("bob", true))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotFound(_)));

        let member = rt
            .join_room(&"r1".to_string(), &config.join_code, &user("bob", true))
            .await
            .unwrap();
        assert_eq!(member.seat_number, 2);
    }

    #[tokio::test]
    async fn join_room_rejects_duplicate_member_and_full_room() {
        let rt = runtime();
        let owner = user("owner", true);
        let mut request = create_request();
        request.max_players = 2;
        let config = rt.create_room("r1".to_string(), &owner, request).await.unwrap();

        let err = rt
            .join_room(&"r1".to_string(), &config.join_code, &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ConflictState(_)));

        rt.join_room(&"r1".to_string(), &config.join_code, &user("bob", true))
            .await
            .unwrap();
        let err = rt
            .join_room(&"r1".to_string(), &config.join_code, &user("carol", true))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ConflictState(_)));
    }

    #[tokio::test]
    async fn close_room_requires_owner() {
        let rt = runtime();
        let owner = user("owner", true);
        rt.create_room("r1".to_string(), &owner, create_request()).await.unwrap();
        let err = rt.close_room(&"r1".to_string(), &"bob".to_string()).await.unwrap_err();
        assert!(matches!(err, CommandError::ForbiddenPolicy(_)));
        rt.close_room(&"r1".to_string(), &"owner".to_string()).await.unwrap();
        assert!(!rt.store().room_exists(&"r1".to_string()).await);
    }

    #[tokio::test]
    async fn start_game_requires_two_ready_players() {
        let rt = runtime();
        let owner = user("owner", true);
        let config = rt.create_room("r1".to_string(), &owner, create_request()).await.unwrap();

        let err = rt
            .start_game(&"owner".to_string(), StartGameRequest { room_id: "r1".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ConflictState(_)));

        rt.join_room(&"r1".to_string(), &config.join_code, &user("bob", true))
            .await
            .unwrap();
        rt.start_game(&"owner".to_string(), StartGameRequest { room_id: "r1".to_string() })
            .await
            .unwrap();
        let game = rt.store().get_game(&"r1".to_string()).await.unwrap().unwrap();
        assert_eq!(game.phase, GamePhase::Preflop);
    }

    #[tokio::test]
    async fn toggle_play_status_rejects_stack_below_ante() {
        let rt = runtime();
        let mut request = create_request();
        request.ante = 5;
        let owner = user("owner", true);
        rt.create_room("r1".to_string(), &owner, request).await.unwrap();
        rt.store()
            .update_member(&"r1".to_string(), &"owner".to_string(), |m| m.current_stack = 0)
            .await
            .unwrap();
        let err = rt
            .toggle_play_status(
                &"owner".to_string(),
                ToggleSeatRequest { room_id: "r1".to_string(), wants_to_play: true },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn kick_user_rejects_self_kick_and_removes_target() {
        let rt = runtime();
        let owner = user("owner", true);
        let config = rt.create_room("r1".to_string(), &owner, create_request()).await.unwrap();
        rt.join_room(&"r1".to_string(), &config.join_code, &user("bob", true))
            .await
            .unwrap();

        let err = rt
            .kick_user(
                &"owner".to_string(),
                KickUserRequest { room_id: "r1".to_string(), target_user_id: "owner".to_string() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ForbiddenPolicy(_)));

        rt.kick_user(
            &"owner".to_string(),
            KickUserRequest { room_id: "r1".to_string(), target_user_id: "bob".to_string() },
        )
        .await
        .unwrap();
        let members = rt.store().get_members(&"r1".to_string()).await.unwrap();
        assert!(!members.iter().any(|m| m.user_id == "bob"));
    }

    #[tokio::test]
    async fn transfer_chips_validates_self_amount_and_balance() {
        let rt = runtime();
        let owner = user("owner", true);
        let config = rt.create_room("r1".to_string(), &owner, create_request()).await.unwrap();
        rt.join_room(&"r1".to_string(), &config.join_code, &user("bob", true))
            .await
            .unwrap();

        let err = rt
            .transfer_chips(
                &"owner".to_string(),
                TransferChipsRequest { room_id: "r1".to_string(), to_user_id: "owner".to_string(), amount: 10 },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));

        let err = rt
            .transfer_chips(
                &"owner".to_string(),
                TransferChipsRequest { room_id: "r1".to_string(), to_user_id: "bob".to_string(), amount: 1_000_000 },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));

        rt.transfer_chips(
            &"owner".to_string(),
            TransferChipsRequest { room_id: "r1".to_string(), to_user_id: "bob".to_string(), amount: 100 },
        )
        .await
        .unwrap();
        let bob = rt.store().get_member(&"r1".to_string(), &"bob".to_string()).await.unwrap();
        assert_eq!(bob.current_stack, 1100);
    }

    #[tokio::test]
    async fn update_max_players_rejects_shrink_and_over_cap() {
        let rt = runtime();
        let owner = user("owner", true);
        rt.create_room("r1".to_string(), &owner, create_request()).await.unwrap();

        let err = rt
            .update_max_players(
                &"owner".to_string(),
                UpdateMaxPlayersRequest { room_id: "r1".to_string(), max_players: 3 },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));

        let err = rt
            .update_max_players(
                &"owner".to_string(),
                UpdateMaxPlayersRequest { room_id: "r1".to_string(), max_players: 9 },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));

        rt.update_max_players(
            &"owner".to_string(),
            UpdateMaxPlayersRequest { room_id: "r1".to_string(), max_players: 6 },
        )
        .await
        .unwrap();
        let config = rt.store().get_config(&"r1".to_string()).await.unwrap();
        assert_eq!(config.max_players, 6);
    }
}
