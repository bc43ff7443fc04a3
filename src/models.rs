use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A playable item in a guild's queue.
///
/// Identity is `id`, minted once at creation and never reused; the same
/// source URL enqueued twice yields two distinct tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    /// Extractor kind reported by the resolver ("youtube", "soundcloud", ...).
    pub kind: String,
    pub title: String,
    pub source_url: String,
    pub thumbnail_url: Option<String>,
    pub author_name: Option<String>,
    pub duration_seconds: u64,
    pub added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            title: title.into(),
            source_url: source_url.into(),
            thumbnail_url: None,
            author_name: None,
            duration_seconds: 0,
            added_at: Utc::now(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    pub fn with_author(mut self, author_name: impl Into<String>) -> Self {
        self.author_name = Some(author_name.into());
        self
    }

    pub fn with_duration(mut self, duration_seconds: u64) -> Self {
        self.duration_seconds = duration_seconds;
        self
    }
}

/// A playlist entry whose metadata has not been fetched yet. Each stub is
/// resolved individually before it becomes playable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistStub {
    pub url: String,
}

/// A single hit from a search-style resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub author_name: Option<String>,
    pub duration_seconds: u64,
}

/// Playback modes for a queue (mutually exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueMode {
    NoRepeat,
    RepeatQueue,
    RepeatSingle,
    Shuffle,
}

impl QueueMode {
    /// Slash-command choice value for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueMode::NoRepeat => "no_repeat",
            QueueMode::RepeatQueue => "repeat_queue",
            QueueMode::RepeatSingle => "repeat_single",
            QueueMode::Shuffle => "shuffle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "no_repeat" => Some(QueueMode::NoRepeat),
            "repeat_queue" => Some(QueueMode::RepeatQueue),
            "repeat_single" => Some(QueueMode::RepeatSingle),
            "shuffle" => Some(QueueMode::Shuffle),
            _ => None,
        }
    }

    /// Human-facing label used in command replies.
    pub fn label(&self) -> &'static str {
        match self {
            QueueMode::NoRepeat => "➡️ No Repeat",
            QueueMode::RepeatQueue => "🔁 Repeat Queue",
            QueueMode::RepeatSingle => "🔂 Repeat Single",
            QueueMode::Shuffle => "🔀 Shuffle",
        }
    }
}
