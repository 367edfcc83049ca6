//! Tracked pins.

use std::fmt;

use crate::Timestamp;

/// Whether the pin still exists on Pinterest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PinStatus {
    Active,
    /// Soft-deleted: the row stays in the store.
    Deleted,
}

impl PinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinStatus::Active => "active",
            PinStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for PinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pin tracked by the ingestion pipeline.
///
/// Each successful sync cycle refreshes `last_synced_at` and possibly
/// `current_status`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivePin {
    pub pin_id: String,
    pub title: String,
    pub image_url: String,
    pub current_status: PinStatus,
    pub last_synced_at: Timestamp,
    pub created_at: Timestamp,
}

impl ActivePin {
    /// Last four characters of the pin id, as shown in chart headers.
    pub fn short_id(&self) -> &str {
        let start = self
            .pin_id
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &self.pin_id[start..]
    }
}
