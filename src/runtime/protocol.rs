//! Protocol Codec (C7): JSON message framing for client<->server (§6.1) and
//! RFC 6902 JSON-Patch diffing of game state, filtered so hole cards never
//! leak to a viewer that doesn't own them.

use json_patch::PatchOperation;
use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, RoomMemberInfo, UserId};
use crate::engine::{GameState, PlayerAction};

/// Milliseconds since the Unix epoch, for message timestamps and hand clocks.
pub fn unix_timestamp_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// §6.1 client -> server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Chat {
        message: String,
    },
    Action {
        #[serde(flatten)]
        action: PlayerAction,
    },
}

/// §6.1 server -> client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Chat(ChatMessage),
    History {
        messages: Vec<ChatMessage>,
    },
    RoomState {
        members: Vec<RoomMemberInfo>,
    },
    RoomClosed,
    GameState {
        game_state: serde_json::Value,
    },
    GameStatePatch {
        patches: Vec<PatchOperation>,
    },
    UserKicked {
        reason: String,
    },
    Error {
        message: String,
    },
}

/// Renders the canonical, deck-free projection of `state` as JSON (§4.6/4.7
/// "one canonical clean GameState").
pub fn clean_value(state: &GameState) -> serde_json::Value {
    serde_json::to_value(state.without_deck()).expect("GameStateWithoutDeck always serializes")
}

/// Strips every seated player's hole cards from `value` except `viewer`'s
/// own (§4.6.3 "per-recipient hand-erasure pass"). Operates on the JSON tree
/// produced by `clean_value`, not on `GameState` directly, so the same
/// canonical value can be erased once per recipient without re-serializing.
pub fn mask_hands(value: &mut serde_json::Value, viewer: &UserId) {
    let Some(player_states) = value
        .get_mut("playerStates")
        .and_then(|v| v.as_object_mut())
    else {
        return;
    };
    for (user_id, player) in player_states.iter_mut() {
        if user_id != viewer {
            if let Some(hand) = player.get_mut("hand") {
                *hand = serde_json::Value::Array(Vec::new());
            }
        }
    }
}

/// The masked full snapshot sent on first connect and after any re-baseline
/// (§4.6.2, §6.1 `game_state`).
pub fn masked_snapshot(state: &GameState, viewer: &UserId) -> serde_json::Value {
    let mut value = clean_value(state);
    mask_hands(&mut value, viewer);
    value
}

/// The JSON-Pointer path of a patch operation, regardless of its kind.
fn op_path(op: &PatchOperation) -> &str {
    match op {
        PatchOperation::Add(o) => o.path.as_str(),
        PatchOperation::Remove(o) => o.path.as_str(),
        PatchOperation::Replace(o) => o.path.as_str(),
        PatchOperation::Move(o) => o.path.as_str(),
        PatchOperation::Copy(o) => o.path.as_str(),
        PatchOperation::Test(o) => o.path.as_str(),
    }
}

/// Computes the diff `prev -> next` on the canonical (deck-free) view, then
/// filters it for one recipient: drop any `/deck` operation (belt-and-braces,
/// the canonical view never has one) and drop `/playerStates/{uid}/hand`
/// operations for every `uid` other than `viewer` (§4.7).
pub fn diff_for_viewer(prev: &GameState, next: &GameState, viewer: &UserId) -> Vec<PatchOperation> {
    let prev_value = clean_value(prev);
    let next_value = clean_value(next);
    let patch = json_patch::diff(&prev_value, &next_value);
    patch
        .0
        .into_iter()
        .filter(|op| {
            let path = op_path(op);
            if path.starts_with("/deck") {
                return false;
            }
            if let Some(rest) = path.strip_prefix("/playerStates/") {
                if let Some((uid, field)) = rest.split_once('/') {
                    if field.starts_with("hand") && uid != viewer.as_str() {
                        return false;
                    }
                }
            }
            true
        })
        .collect()
}
