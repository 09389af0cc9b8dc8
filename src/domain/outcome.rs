//! Step outcome types.
//!
//! The collaborator that writes the story reports back an `Outcome`; the
//! progress tracker turns it into a progress change.

use serde::{Deserialize, Serialize};

/// Which way a thread moved during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The thread moved toward its payoff
    Progress,
    /// The thread lost ground
    Backslide,
    /// The thread was in focus but did not move
    Static,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Progress => "progress",
            Direction::Backslide => "backslide",
            Direction::Static => "static",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured result of one generation step for the chosen thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub direction: Direction,
    /// Requested magnitude; clamped by the tracker
    pub amount: u8,
    pub note: String,
}

impl Outcome {
    pub fn progress(amount: u8, note: impl Into<String>) -> Self {
        Self {
            direction: Direction::Progress,
            amount,
            note: note.into(),
        }
    }

    pub fn backslide(amount: u8, note: impl Into<String>) -> Self {
        Self {
            direction: Direction::Backslide,
            amount,
            note: note.into(),
        }
    }

    pub fn stay(note: impl Into<String>) -> Self {
        Self {
            direction: Direction::Static,
            amount: 0,
            note: note.into(),
        }
    }
}
