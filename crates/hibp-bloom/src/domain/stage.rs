//! Build stage state machine
//!
//! ```text
//! [Idle] ─request─→ [Counting] ─N─→ [Sizing] ─→ [Inserting] ─→ [Persisting] ─→ [Done]
//!                        │                           │
//!                        └────── cancel ─────────────┴──────────→ [Canceled]
//! ```
//!
//! Errors are not a stage: a failed build returns its error from whatever
//! stage it was in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of a single filter build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildStage {
    /// Request accepted, no work started.
    #[default]
    Idle,
    /// First pass over the input, counting records.
    Counting,
    /// Deriving filter size and hash count from the record count.
    Sizing,
    /// Second pass, inserting every record key.
    Inserting,
    /// Writing the filter file.
    Persisting,
    /// Filter file written.
    Done,
    /// Cancellation observed; nothing was written.
    Canceled,
}

impl BuildStage {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: BuildStage) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Counting)
                | (Self::Counting, Self::Sizing)
                | (Self::Counting, Self::Canceled)
                | (Self::Sizing, Self::Inserting)
                | (Self::Inserting, Self::Persisting)
                | (Self::Inserting, Self::Canceled)
                | (Self::Persisting, Self::Done)
        )
    }

    /// Stages during which a cancellation request is honored.
    pub fn is_cancelable(&self) -> bool {
        matches!(self, Self::Counting | Self::Inserting)
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Counting => "counting",
            Self::Sizing => "sizing",
            Self::Inserting => "inserting",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
