//! Publication status values and the transitions allowed between them.

use serde::{Deserialize, Serialize};

/// Lifecycle of one publication row.
///
/// ```text
/// pending ──► published
///    │
///    └──────► failed ──► retrying ──► published
///                ▲           │
///                └───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Pending,
    Published,
    Failed,
    Retrying,
}

impl PublicationStatus {
    pub const ALL: [PublicationStatus; 4] = [
        Self::Pending,
        Self::Published,
        Self::Failed,
        Self::Retrying,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            "retrying" => Some(Self::Retrying),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: PublicationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Published)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Retrying)
                | (Self::Retrying, Self::Published)
                | (Self::Retrying, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl std::fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
