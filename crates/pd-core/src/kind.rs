//! Intention kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an intention is for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionKind {
    PickUp,
    Deliver,
    Explore,
}

impl IntentionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentionKind::PickUp => "pickup",
            IntentionKind::Deliver => "deliver",
            IntentionKind::Explore => "explore",
        }
    }
}

impl fmt::Display for IntentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
