//! Scene snapshots pushed by the periodic broadcaster.

use std::f32::consts::TAU;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Rotation applied to the scene on every tick, in radians.
pub const ROTATION_STEP: f32 = 0.01;

/// Scene rotation around each axis, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub y: f32,
}

/// Payload of a `ReceiveSceneUpdate` event.
///
/// Every field except `timestamp` is optional so that older clients that only
/// understand the rotation form or the tick/message form can both read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEvent {
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// State advanced once per tick.
///
/// Owned by exactly one broadcaster; each event carries a copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneState {
    tick: u64,
    rotation_y: f32,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks taken so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    /// Advance one tick and compose the event for it.
    pub fn advance(&mut self) -> SceneEvent {
        self.tick += 1;
        self.rotation_y += ROTATION_STEP;
        if self.rotation_y > TAU {
            self.rotation_y -= TAU;
        }

        SceneEvent {
            timestamp: Utc::now(),
            tick: Some(self.tick),
            rotation: Some(Rotation { y: self.rotation_y }),
            message: Some(format!("Server tick {}", self.tick)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_increments_tick_and_rotation() {
        let mut state = SceneState::new();

        let first = state.advance();
        let second = state.advance();

        assert_eq!(first.tick, Some(1));
        assert_eq!(second.tick, Some(2));
        assert_eq!(second.message.as_deref(), Some("Server tick 2"));
        assert!((state.rotation_y() - 2.0 * ROTATION_STEP).abs() < 1e-6);
    }

    #[test]
    fn rotation_wraps_at_full_turn() {
        let mut state = SceneState::new();

        for _ in 0..700 {
            state.advance();
        }

        assert_eq!(state.tick(), 700);
        assert!(state.rotation_y() >= 0.0 && state.rotation_y() <= TAU);
        // 700 steps of 0.01 is 7.0 rad, one wrap past 2π.
        assert!((state.rotation_y() - (7.0 - TAU)).abs() < 1e-2);
    }

    #[test]
    fn scene_event_omits_absent_fields() {
        let event = SceneEvent {
            timestamp: Utc::now(),
            tick: Some(3),
            rotation: None,
            message: None,
        };

        let json = serde_json::to_value(&event).expect("serialization should succeed");

        assert!(json["timestamp"].is_string());
        assert_eq!(json["tick"], 3);
        assert!(json.get("rotation").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn scene_event_accepts_rotation_only_shape() {
        let json = serde_json::json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "rotation": { "y": 0.5 }
        });

        let event: SceneEvent = serde_json::from_value(json).expect("should deserialize");

        assert_eq!(event.rotation, Some(Rotation { y: 0.5 }));
        assert_eq!(event.tick, None);
    }
}
