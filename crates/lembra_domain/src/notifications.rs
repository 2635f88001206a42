use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::agenda::Category;

/// A persisted notification log entry. The id doubles as the dedup key: it
/// encodes the source event and its trigger slot, so repeated polls can
/// never create a second entry for the same logical instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppNotification {
    pub id: String,
    /// The master appointment or medicine reminder this fired for.
    pub source_id: String,
    pub title: String,
    pub message: String,
    pub category: Category,
    pub trigger_at: NaiveDateTime,
    /// Flipped by user dismissal, never un-set.
    pub viewed: bool,
}

/// Platform-specific alert adapters (audio playback, host visibility)
/// implement this trait. The core never touches audio directly.
pub trait AlertSink: Send + Sync {
    /// Whether the host environment is currently visible to the user.
    fn foreground(&self) -> bool;
    /// Play the audible alert. Invoked at most once per poll, regardless of
    /// how many notifications that poll produced.
    fn play_alert(&self);
}
