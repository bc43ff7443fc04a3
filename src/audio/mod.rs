//! Playback core: queue navigation, per-guild players, and the voice
//! transport seam.
//!
//! Three pieces cooperate here:
//!
//! - [`queue`] — the [`QueueManager`](queue::QueueManager), pure per-guild
//!   queue state and the cursor/mode navigation algorithm.
//! - [`player`] — the per-guild [`Player`](player::Player), which bridges
//!   pull-based queue navigation to the transport's completion callbacks,
//!   plus the [`PlaybackDriver`](player::PlaybackDriver) trait the transport
//!   hides behind.
//! - [`driver`] — the songbird-backed driver used in production.
//!
//! [`player_manager`] holds the lazily-created guild → player registry, the
//! only shared mutable map in the core.

pub mod driver;
pub mod player;
pub mod player_manager;
pub mod queue;
