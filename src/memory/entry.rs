use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Stability assigned to semantic rooms
pub const SEMANTIC_STABILITY: f32 = 0.8;
/// Stability assigned to every other kind of room
pub const EPISODIC_STABILITY: f32 = 0.4;

/// Declared kind of a room, which fixes its stability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomKind {
    Semantic,
    Episodic,
    Other(String),
}

impl RoomKind {
    pub fn stability(&self) -> f32 {
        match self {
            RoomKind::Semantic => SEMANTIC_STABILITY,
            RoomKind::Episodic | RoomKind::Other(_) => EPISODIC_STABILITY,
        }
    }
}

impl From<&str> for RoomKind {
    fn from(kind: &str) -> Self {
        match kind {
            "semantic" => RoomKind::Semantic,
            "episodic" => RoomKind::Episodic,
            other => RoomKind::Other(other.to_string()),
        }
    }
}

/// A single stored memory. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    id: u64,
    text: String,
    stability: f32,
    created_at: SystemTime,
}

impl Room {
    /// Creates a room stamped with the current time
    pub fn new(id: u64, text: String, kind: &RoomKind) -> Self {
        Self {
            id,
            text,
            stability: kind.stability(),
            created_at: SystemTime::now(),
        }
    }

    /// Creates a room with a specific creation time
    pub fn with_timestamp(id: u64, text: String, kind: &RoomKind, created_at: SystemTime) -> Self {
        Self {
            id,
            text,
            stability: kind.stability(),
            created_at,
        }
    }

    // Getters
    pub fn id(&self) -> u64 { self.id }
    pub fn text(&self) -> &str { &self.text }
    pub fn stability(&self) -> f32 { self.stability }
    pub fn created_at(&self) -> SystemTime { self.created_at }

    /// First `max_chars` characters of the text
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}
