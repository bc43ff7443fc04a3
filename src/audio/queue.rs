use rand::seq::SliceRandom;
use serenity::model::id::GuildId;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{QueueMode, Track};

/// Hard cap on items per guild queue.
pub const MAX_QUEUE_SIZE: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("no queue exists for guild {0}")]
    NotFound(GuildId),
    #[error("item not found: {0}")]
    ItemNotFound(String),
    #[error("cannot navigate an empty queue")]
    Empty,
    #[error("no next item available")]
    NoNext,
    #[error("no previous item available")]
    NoPrevious,
    #[error("queue is at maximum capacity ({MAX_QUEUE_SIZE} items)")]
    Capacity,
    #[error("cannot go back, shuffle order was never initialized")]
    ShuffleNotInitialized,
}

impl QueueError {
    /// True for the errors navigation callers treat as "nothing left to
    /// play" rather than a real failure.
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            QueueError::NotFound(_) | QueueError::Empty | QueueError::NoNext
        )
    }
}

/// Full state of one guild's queue.
///
/// `cursor` indexes `items` directly in every mode except Shuffle, where it
/// indexes `shuffle_order` instead. `-1` means nothing has played yet.
#[derive(Debug)]
struct GuildQueue {
    items: Vec<Track>,
    cursor: isize,
    mode: QueueMode,
    shuffle_order: Vec<usize>,
}

impl GuildQueue {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: -1,
            mode: QueueMode::NoRepeat,
            shuffle_order: Vec::new(),
        }
    }

    fn reshuffle(&mut self) {
        self.shuffle_order = (0..self.items.len()).collect();
        self.shuffle_order.shuffle(&mut rand::thread_rng());
    }
}

/// Per-guild queue storage and the cursor/mode navigation algorithm.
///
/// Purely synchronous, no I/O. The composition root owns a single instance
/// behind `Arc<RwLock<…>>`; every mutating call sequence holds the write lock
/// for its whole duration, so the invariants (cursor bounds, permutation
/// validity of `shuffle_order`) never need finer-grained locking.
#[derive(Debug, Default)]
pub struct QueueManager {
    queues: HashMap<GuildId, GuildQueue>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }

    /// Appends a track, creating the guild's queue on first use.
    pub fn enqueue(&mut self, guild_id: GuildId, track: Track) -> Result<Track, QueueError> {
        let queue = self.queues.entry(guild_id).or_insert_with(GuildQueue::new);

        if queue.items.len() >= MAX_QUEUE_SIZE {
            return Err(QueueError::Capacity);
        }

        queue.items.push(track.clone());

        // A live shuffle cycle plays the new item once, at its end. An empty
        // order is rebuilt lazily on the next advance and needs no append.
        if queue.mode == QueueMode::Shuffle && !queue.shuffle_order.is_empty() {
            queue.shuffle_order.push(queue.items.len() - 1);
        }

        info!("➕ Queued in guild {}: {}", guild_id, track.title);
        Ok(track)
    }

    /// Removes an item by id, keeping the cursor on the same logical track.
    pub fn remove(&mut self, guild_id: GuildId, item_id: &str) -> Result<(), QueueError> {
        let queue = self
            .queues
            .get_mut(&guild_id)
            .ok_or(QueueError::NotFound(guild_id))?;

        let index = queue
            .items
            .iter()
            .position(|t| t.id == item_id)
            .ok_or_else(|| QueueError::ItemNotFound(item_id.to_string()))?;

        queue.items.remove(index);

        if queue.cursor >= index as isize {
            queue.cursor = (queue.cursor - 1).max(-1);
        }

        // Index remap, not a reshuffle: a running shuffle cycle keeps its
        // remaining play order stable.
        if !queue.shuffle_order.is_empty() {
            queue.shuffle_order.retain(|&i| i != index);
            for i in queue.shuffle_order.iter_mut() {
                if *i > index {
                    *i -= 1;
                }
            }
        }

        debug!("❌ Removed item {} from guild {}", item_id, guild_id);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn get(&self, guild_id: GuildId, item_id: &str) -> Result<Track, QueueError> {
        let queue = self
            .queues
            .get(&guild_id)
            .ok_or(QueueError::NotFound(guild_id))?;

        queue
            .items
            .iter()
            .find(|t| t.id == item_id)
            .cloned()
            .ok_or_else(|| QueueError::ItemNotFound(item_id.to_string()))
    }

    /// Case-insensitive substring match over titles. A missing queue yields
    /// an empty result, same as no match.
    pub fn find(&self, guild_id: GuildId, title: &str) -> Vec<Track> {
        let Some(queue) = self.queues.get(&guild_id) else {
            return Vec::new();
        };

        let needle = title.to_lowercase();
        queue
            .items
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Resets the queue to its initial state. Idempotent; a missing queue is
    /// a no-op.
    pub fn clear(&mut self, guild_id: GuildId) {
        if let Some(queue) = self.queues.get_mut(&guild_id) {
            queue.items.clear();
            queue.cursor = -1;
            queue.shuffle_order.clear();
            info!("🗑️ Cleared queue for guild {}", guild_id);
        }
    }

    /// Snapshot of the queue's items, in insertion order.
    pub fn all(&self, guild_id: GuildId) -> Vec<Track> {
        self.queues
            .get(&guild_id)
            .map(|q| q.items.clone())
            .unwrap_or_default()
    }

    /// Moves the cursor forward and returns the item it lands on.
    ///
    /// What "forward" means is decided by the queue's mode in one dispatch:
    /// NoRepeat refuses past the end, RepeatQueue wraps, RepeatSingle stays
    /// put, Shuffle walks its permutation with wraparound. `force` does not
    /// change the per-mode logic; it records that the caller is abandoning
    /// the current track (multi-skip) and will tolerate early exhaustion.
    pub fn advance(&mut self, guild_id: GuildId, force: bool) -> Result<Track, QueueError> {
        let queue = self
            .queues
            .get_mut(&guild_id)
            .ok_or(QueueError::NotFound(guild_id))?;

        if queue.items.is_empty() {
            return Err(QueueError::Empty);
        }

        debug!("⏩ advance guild {} (force: {})", guild_id, force);
        let len = queue.items.len() as isize;

        match queue.mode {
            QueueMode::NoRepeat => {
                if queue.cursor >= len - 1 {
                    return Err(QueueError::NoNext);
                }
                queue.cursor += 1;
                Ok(queue.items[queue.cursor as usize].clone())
            }
            QueueMode::RepeatQueue => {
                queue.cursor += 1;
                if queue.cursor >= len {
                    queue.cursor = 0;
                }
                Ok(queue.items[queue.cursor as usize].clone())
            }
            QueueMode::RepeatSingle => {
                if queue.cursor == -1 {
                    queue.cursor = 0;
                }
                Ok(queue.items[queue.cursor as usize].clone())
            }
            QueueMode::Shuffle => {
                if queue.shuffle_order.is_empty() {
                    queue.reshuffle();
                }
                queue.cursor += 1;
                if queue.cursor >= queue.shuffle_order.len() as isize {
                    queue.cursor = 0;
                }
                let actual = queue.shuffle_order[queue.cursor as usize];
                Ok(queue.items[actual].clone())
            }
        }
    }

    /// Backward counterpart of [`advance`](Self::advance).
    #[allow(dead_code)]
    pub fn retreat(&mut self, guild_id: GuildId) -> Result<Track, QueueError> {
        let queue = self
            .queues
            .get_mut(&guild_id)
            .ok_or(QueueError::NotFound(guild_id))?;

        if queue.items.is_empty() {
            return Err(QueueError::Empty);
        }

        let len = queue.items.len() as isize;

        match queue.mode {
            QueueMode::NoRepeat => {
                if queue.cursor <= 0 {
                    return Err(QueueError::NoPrevious);
                }
                queue.cursor -= 1;
                Ok(queue.items[queue.cursor as usize].clone())
            }
            QueueMode::RepeatQueue => {
                queue.cursor -= 1;
                if queue.cursor < 0 {
                    queue.cursor = len - 1;
                }
                Ok(queue.items[queue.cursor as usize].clone())
            }
            QueueMode::RepeatSingle => {
                if queue.cursor == -1 {
                    queue.cursor = 0;
                }
                Ok(queue.items[queue.cursor as usize].clone())
            }
            QueueMode::Shuffle => {
                if queue.shuffle_order.is_empty() {
                    return Err(QueueError::ShuffleNotInitialized);
                }
                if queue.cursor <= 0 {
                    queue.cursor = queue.shuffle_order.len() as isize - 1;
                } else {
                    queue.cursor -= 1;
                }
                let actual = queue.shuffle_order[queue.cursor as usize];
                Ok(queue.items[actual].clone())
            }
        }
    }

    /// Switches the playback mode. No-op when unchanged.
    ///
    /// Crossing the shuffle boundary in either direction resets the cursor:
    /// inside Shuffle it indexes `shuffle_order`, outside it indexes `items`,
    /// and carrying the value across would silently jump the playback
    /// position. Transitions among the direct-index modes leave it alone.
    pub fn set_mode(&mut self, guild_id: GuildId, mode: QueueMode) -> Result<(), QueueError> {
        let queue = self
            .queues
            .get_mut(&guild_id)
            .ok_or(QueueError::NotFound(guild_id))?;

        if queue.mode == mode {
            return Ok(());
        }

        let leaving_shuffle = queue.mode == QueueMode::Shuffle;
        queue.mode = mode;

        if mode == QueueMode::Shuffle {
            queue.reshuffle();
            queue.cursor = -1;
            info!("🔀 Shuffle enabled for guild {}", guild_id);
        } else {
            queue.shuffle_order.clear();
            if leaving_shuffle {
                queue.cursor = -1;
            }
            info!("🎚️ Mode for guild {} is now {}", guild_id, mode.as_str());
        }

        Ok(())
    }

    /// Current cursor position (`-1` = before start).
    pub fn position(&self, guild_id: GuildId) -> Result<isize, QueueError> {
        self.queues
            .get(&guild_id)
            .map(|q| q.cursor)
            .ok_or(QueueError::NotFound(guild_id))
    }

}
