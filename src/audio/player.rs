use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serenity::model::id::GuildId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

use crate::audio::queue::{QueueError, QueueManager};
use crate::models::{QueueMode, Track};

/// Receives the transport's completion notification for a started stream.
///
/// The transport fires this exactly once per registered stream, from its own
/// event context. Implementations must not assume they run on the context
/// that started playback.
#[async_trait]
pub trait TrackEndHook: Send + Sync {
    async fn on_track_end(&self, error: Option<String>);
}

/// The voice transport as the player sees it.
///
/// The production implementation wraps songbird; tests substitute a fake
/// whose `start` stores the hook so the completion callback can be fired by
/// hand.
#[async_trait]
pub trait PlaybackDriver: Send + Sync {
    /// Opens a stream for `track` on the guild's voice connection and
    /// arranges for `on_end` to be invoked once the stream finishes.
    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        on_end: Arc<dyn TrackEndHook>,
    ) -> anyhow::Result<()>;

    /// Stops the active stream. Returns whether anything was actually
    /// playing or paused.
    async fn stop(&self, guild_id: GuildId) -> bool;

    async fn pause(&self, guild_id: GuildId) -> bool;
    async fn resume(&self, guild_id: GuildId) -> bool;
    async fn is_playing(&self, guild_id: GuildId) -> bool;
    async fn is_paused(&self, guild_id: GuildId) -> bool;
    fn is_connected(&self, guild_id: GuildId) -> bool;
}

/// Per-guild playback lifecycle: pull-based queue navigation bridged to the
/// transport's push/callback streaming.
///
/// `play_next` never schedules itself; only the completion callback re-enters
/// the advance-and-play cycle, which makes the lifecycle drivable by hand in
/// tests.
pub struct Player {
    guild_id: GuildId,
    queues: Arc<RwLock<QueueManager>>,
    driver: Arc<dyn PlaybackDriver>,
    current_track: Mutex<Option<Track>>,
    /// One-shot flag: an explicit multi-skip stops the transport, which
    /// fires the completion callback too; this keeps that callback from
    /// advancing a second time.
    autoplay_suppressed: AtomicBool,
    self_ref: Weak<Player>,
}

impl Player {
    pub fn new(
        guild_id: GuildId,
        queues: Arc<RwLock<QueueManager>>,
        driver: Arc<dyn PlaybackDriver>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            guild_id,
            queues,
            driver,
            current_track: Mutex::new(None),
            autoplay_suppressed: AtomicBool::new(false),
            self_ref: weak.clone(),
        })
    }

    /// Adds a track to this guild's queue.
    pub fn add_track(&self, track: Track) -> Result<Track, QueueError> {
        self.queues.write().enqueue(self.guild_id, track)
    }

    /// Advances the queue and starts the resulting track.
    ///
    /// Returns `None` when no voice connection exists (a precondition the
    /// caller must establish), when the queue is exhausted, or when the
    /// stream could not be started. A start failure is logged and surfaced
    /// to the caller; the player does not try the next track on its own.
    pub async fn play_next(&self) -> Option<Track> {
        if !self.driver.is_connected(self.guild_id) {
            warn!("🔌 No voice connection for guild {}", self.guild_id);
            return None;
        }

        let track = self.advance_queue(false);
        *self.current_track.lock() = track.clone();

        let track = track?;
        if self.start_track(&track).await {
            Some(track)
        } else {
            None
        }
    }

    /// Skips up to `count` tracks and starts the one landed on.
    ///
    /// Hitting the end of the queue mid-loop ends the skip early; the count
    /// of successful advances is reported either way and playback goes idle
    /// when the loop ended in exhaustion.
    pub async fn skip_tracks(&self, count: usize) -> (usize, Option<Track>) {
        if count == 0 {
            return (0, None);
        }

        let mut skipped = 0;
        let mut landed = None;
        {
            let mut queues = self.queues.write();
            for _ in 0..count {
                match queues.advance(self.guild_id, true) {
                    Ok(track) => {
                        skipped += 1;
                        landed = Some(track);
                    }
                    Err(err) => {
                        debug!("⏭️ Skip stopped early in guild {}: {}", self.guild_id, err);
                        landed = None;
                        break;
                    }
                }
            }
        }

        *self.current_track.lock() = landed.clone();

        // Raised before the stop so the completion callback the stop triggers
        // cannot double-advance. Rolled back when nothing was playing, since
        // no callback will come to consume it.
        self.autoplay_suppressed.store(true, Ordering::SeqCst);
        let stopped = self.driver.stop(self.guild_id).await;
        if !stopped {
            self.autoplay_suppressed.store(false, Ordering::SeqCst);
        }

        if let Some(track) = &landed {
            self.start_track(track).await;
        }

        (skipped, self.current_track.lock().clone())
    }

    pub async fn pause(&self) -> bool {
        self.driver.pause(self.guild_id).await
    }

    pub async fn resume(&self) -> bool {
        self.driver.resume(self.guild_id).await
    }

    /// Stops the active stream, if any, and clears the current track.
    pub async fn stop(&self) -> bool {
        let stopped = self.driver.stop(self.guild_id).await;
        if stopped {
            *self.current_track.lock() = None;
        }
        stopped
    }

    pub async fn is_playing(&self) -> bool {
        self.driver.is_playing(self.guild_id).await
    }

    pub async fn is_paused(&self) -> bool {
        self.driver.is_paused(self.guild_id).await
    }

    pub fn current_track(&self) -> Option<Track> {
        self.current_track.lock().clone()
    }

    pub fn set_mode(&self, mode: QueueMode) -> Result<(), QueueError> {
        self.queues.write().set_mode(self.guild_id, mode)
    }

    pub fn queue_all(&self) -> Vec<Track> {
        self.queues.read().all(self.guild_id)
    }

    pub fn find(&self, title: &str) -> Vec<Track> {
        self.queues.read().find(self.guild_id, title)
    }

    pub fn remove_item(&self, item_id: &str) -> Result<(), QueueError> {
        self.queues.write().remove(self.guild_id, item_id)
    }

    #[allow(dead_code)]
    pub fn position(&self) -> Result<isize, QueueError> {
        self.queues.read().position(self.guild_id)
    }

    /// Clears the queue and stops whatever is playing.
    pub async fn clear_queue(&self) {
        self.queues.write().clear(self.guild_id);
        self.stop().await;
    }

    fn advance_queue(&self, force: bool) -> Option<Track> {
        match self.queues.write().advance(self.guild_id, force) {
            Ok(track) => Some(track),
            Err(err) => {
                if err.is_exhausted() {
                    debug!("📭 Queue exhausted for guild {}: {}", self.guild_id, err);
                } else {
                    warn!("Queue navigation failed for guild {}: {}", self.guild_id, err);
                }
                None
            }
        }
    }

    async fn start_track(&self, track: &Track) -> bool {
        let Some(hook) = self.self_ref.upgrade() else {
            return false;
        };
        let hook: Arc<dyn TrackEndHook> = hook;

        match self.driver.start(self.guild_id, track, hook).await {
            Ok(()) => {
                info!("🎵 Now playing in guild {}: {}", self.guild_id, track.title);
                true
            }
            Err(err) => {
                error!(
                    "Failed to start track in guild {}: {:#}",
                    self.guild_id, err
                );
                *self.current_track.lock() = None;
                false
            }
        }
    }
}

#[async_trait]
impl TrackEndHook for Player {
    /// Completion callback: either consumes the one-shot suppression flag or
    /// re-enters the advance-and-play cycle. Playback errors are terminal
    /// for that track only.
    async fn on_track_end(&self, error: Option<String>) {
        if let Some(err) = &error {
            error!("🎶 Playback error in guild {}: {}", self.guild_id, err);
        }

        if self.autoplay_suppressed.swap(false, Ordering::SeqCst) {
            debug!(
                "⏭️ Auto-advance suppressed after explicit skip in guild {}",
                self.guild_id
            );
            return;
        }

        if !self.driver.is_connected(self.guild_id) {
            warn!(
                "🔌 Voice connection gone in guild {}, not advancing",
                self.guild_id
            );
            return;
        }

        self.play_next().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUILD: GuildId = GuildId::new(7);

    fn track(title: &str) -> Track {
        Track::new("youtube", title, format!("https://yt.test/{title}"))
    }

    /// Transport stand-in: `start` records the track and stores the end
    /// hook so tests can fire the completion callback themselves.
    #[derive(Default)]
    struct FakeDriver {
        disconnected: AtomicBool,
        fail_start: AtomicBool,
        playing: AtomicBool,
        paused: AtomicBool,
        started: Mutex<Vec<Track>>,
        hook: Mutex<Option<Arc<dyn TrackEndHook>>>,
    }

    impl FakeDriver {
        async fn fire_end(&self, error: Option<String>) {
            self.playing.store(false, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            let hook = self.hook.lock().clone();
            if let Some(hook) = hook {
                hook.on_track_end(error).await;
            }
        }

        fn started_titles(&self) -> Vec<String> {
            self.started.lock().iter().map(|t| t.title.clone()).collect()
        }
    }

    #[async_trait]
    impl PlaybackDriver for FakeDriver {
        async fn start(
            &self,
            _guild_id: GuildId,
            track: &Track,
            on_end: Arc<dyn TrackEndHook>,
        ) -> anyhow::Result<()> {
            if self.fail_start.load(Ordering::SeqCst) {
                anyhow::bail!("stream failed to open");
            }
            self.started.lock().push(track.clone());
            *self.hook.lock() = Some(on_end);
            self.playing.store(true, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self, _guild_id: GuildId) -> bool {
            let was_active = self.playing.swap(false, Ordering::SeqCst)
                | self.paused.swap(false, Ordering::SeqCst);
            was_active
        }

        async fn pause(&self, _guild_id: GuildId) -> bool {
            if self.playing.swap(false, Ordering::SeqCst) {
                self.paused.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        }

        async fn resume(&self, _guild_id: GuildId) -> bool {
            if self.paused.swap(false, Ordering::SeqCst) {
                self.playing.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        }

        async fn is_playing(&self, _guild_id: GuildId) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        async fn is_paused(&self, _guild_id: GuildId) -> bool {
            self.paused.load(Ordering::SeqCst)
        }

        fn is_connected(&self, _guild_id: GuildId) -> bool {
            !self.disconnected.load(Ordering::SeqCst)
        }
    }

    fn player_with(titles: &[&str]) -> (Arc<Player>, Arc<FakeDriver>) {
        let queues = Arc::new(RwLock::new(QueueManager::new()));
        let driver = Arc::new(FakeDriver::default());
        let player = Player::new(GUILD, queues, driver.clone());
        for title in titles {
            player.add_track(track(title)).unwrap();
        }
        (player, driver)
    }

    #[tokio::test]
    async fn play_next_requires_a_connection() {
        let (player, driver) = player_with(&["A"]);
        driver.disconnected.store(true, Ordering::SeqCst);

        assert!(player.play_next().await.is_none());
        assert!(player.current_track().is_none());
        assert!(driver.started_titles().is_empty());
        // The queue was not consumed either.
        assert_eq!(player.position().unwrap(), -1);
    }

    #[tokio::test]
    async fn play_next_starts_the_next_track() {
        let (player, driver) = player_with(&["A", "B"]);

        let started = player.play_next().await.unwrap();
        assert_eq!(started.title, "A");
        assert_eq!(driver.started_titles(), ["A"]);
        assert_eq!(player.current_track().unwrap().title, "A");
        assert!(player.is_playing().await);
    }

    #[tokio::test]
    async fn completion_callback_auto_advances() {
        let (player, driver) = player_with(&["A", "B"]);
        player.play_next().await.unwrap();

        driver.fire_end(None).await;
        assert_eq!(driver.started_titles(), ["A", "B"]);
        assert_eq!(player.current_track().unwrap().title, "B");
        assert_eq!(player.position().unwrap(), 1);
    }

    #[tokio::test]
    async fn exhausted_queue_goes_idle_after_completion() {
        let (player, driver) = player_with(&["A"]);
        player.play_next().await.unwrap();

        driver.fire_end(None).await;
        assert_eq!(driver.started_titles(), ["A"]);
        assert!(player.current_track().is_none());
    }

    #[tokio::test]
    async fn playback_error_is_terminal_for_that_track_only() {
        let (player, driver) = player_with(&["A", "B"]);
        player.play_next().await.unwrap();

        driver.fire_end(Some("decode blew up".into())).await;
        assert_eq!(driver.started_titles(), ["A", "B"]);
        assert_eq!(player.current_track().unwrap().title, "B");
    }

    #[tokio::test]
    async fn skip_suppresses_the_stale_completion_callback() {
        let (player, driver) = player_with(&["A", "B", "C"]);
        player.play_next().await.unwrap();

        let (skipped, next) = player.skip_tracks(1).await;
        assert_eq!(skipped, 1);
        assert_eq!(next.unwrap().title, "B");
        assert_eq!(driver.started_titles(), ["A", "B"]);
        assert_eq!(player.position().unwrap(), 1);

        // The transport's callback for the old (stopped) track arrives late:
        // it must not advance the cursor again.
        driver.fire_end(None).await;
        assert_eq!(player.position().unwrap(), 1);
        assert_eq!(driver.started_titles(), ["A", "B"]);
        assert_eq!(player.current_track().unwrap().title, "B");

        // A genuine completion afterwards advances normally.
        driver.fire_end(None).await;
        assert_eq!(driver.started_titles(), ["A", "B", "C"]);
        assert_eq!(player.position().unwrap(), 2);
    }

    #[tokio::test]
    async fn partial_skip_past_the_end_goes_idle() {
        let (player, driver) = player_with(&["A", "B"]);
        player.play_next().await.unwrap();

        let (skipped, next) = player.skip_tracks(5).await;
        assert_eq!(skipped, 1);
        assert!(next.is_none());
        assert!(player.current_track().is_none());
        // Only A ever reached the transport.
        assert_eq!(driver.started_titles(), ["A"]);
        assert!(!player.is_playing().await);
    }

    #[tokio::test]
    async fn idle_skip_rolls_back_the_suppression_flag() {
        let (player, driver) = player_with(&["A"]);
        player.play_next().await.unwrap();
        driver.fire_end(None).await; // queue exhausted, idle

        let (skipped, next) = player.skip_tracks(1).await;
        assert_eq!((skipped, next.is_none()), (0, true));

        // Had the flag stuck, the next natural completion would be swallowed.
        player.add_track(track("B")).unwrap();
        player.add_track(track("C")).unwrap();
        player.play_next().await.unwrap();
        driver.fire_end(None).await;
        assert_eq!(driver.started_titles(), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn skip_zero_is_a_noop() {
        let (player, driver) = player_with(&["A"]);
        let (skipped, next) = player.skip_tracks(0).await;
        assert_eq!(skipped, 0);
        assert!(next.is_none());
        assert!(driver.started_titles().is_empty());
    }

    #[tokio::test]
    async fn failed_stream_start_does_not_retry_the_next_track() {
        let (player, driver) = player_with(&["A", "B"]);
        driver.fail_start.store(true, Ordering::SeqCst);

        assert!(player.play_next().await.is_none());
        assert!(player.current_track().is_none());
        assert!(driver.started_titles().is_empty());
        // The cursor moved to the broken track and stayed there.
        assert_eq!(player.position().unwrap(), 0);
    }

    #[tokio::test]
    async fn pause_resume_and_stop_reflect_transport_state() {
        let (player, driver) = player_with(&["A"]);

        // Nothing active yet.
        assert!(!player.pause().await);
        assert!(!player.resume().await);
        assert!(!player.stop().await);

        player.play_next().await.unwrap();
        assert!(player.pause().await);
        assert!(player.is_paused().await);
        assert!(!player.pause().await); // already paused

        assert!(player.resume().await);
        assert!(player.is_playing().await);

        assert!(player.stop().await);
        assert!(player.current_track().is_none());
        assert!(!driver.playing.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn clear_queue_stops_and_empties() {
        let (player, _driver) = player_with(&["A", "B"]);
        player.play_next().await.unwrap();

        player.clear_queue().await;
        assert!(player.queue_all().is_empty());
        assert!(player.current_track().is_none());
        assert_eq!(player.position().unwrap(), -1);
    }

    #[tokio::test]
    async fn add_track_propagates_capacity_errors() {
        let (player, _driver) = player_with(&[]);
        for i in 0..crate::audio::queue::MAX_QUEUE_SIZE {
            player.add_track(track(&format!("t{i}"))).unwrap();
        }
        assert_eq!(
            player.add_track(track("overflow")).unwrap_err(),
            QueueError::Capacity
        );
    }
}
