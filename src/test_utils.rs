//! Shared test helpers: serde round-trip assertions for this crate's
//! domain, engine, and protocol types.

pub mod serde {
    use serde::{de::DeserializeOwned, Serialize};
    use std::fmt::Debug;

    /// Serializes `value` to JSON and back, asserting the round trip is
    /// lossless. Used by `GameState`/`RoomConfig`/protocol-message tests
    /// to guard the wire format against accidental field drift.
    pub fn assert_round_trip_json<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value).expect("value should serialize to JSON");
        let restored: T =
            serde_json::from_str(&json).expect("serialized JSON should deserialize back");
        assert_eq!(value, &restored, "round trip through JSON changed the value");
    }
}
