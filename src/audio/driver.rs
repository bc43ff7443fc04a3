use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::GuildId;
use songbird::{
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::audio::player::{PlaybackDriver, TrackEndHook};
use crate::models::Track;
use crate::sources::TrackResolver;

/// Production [`PlaybackDriver`] on top of songbird.
///
/// Keeps the per-guild [`TrackHandle`] so pause/resume/stop and the state
/// queries operate on the live stream; the handle map is the only state of
/// its own.
pub struct SongbirdDriver {
    songbird: Arc<Songbird>,
    resolver: Arc<TrackResolver>,
    default_volume: f32,
    handles: DashMap<GuildId, TrackHandle>,
}

impl SongbirdDriver {
    pub fn new(songbird: Arc<Songbird>, resolver: Arc<TrackResolver>, default_volume: f32) -> Self {
        Self {
            songbird,
            resolver,
            default_volume,
            handles: DashMap::new(),
        }
    }

    async fn play_mode(&self, guild_id: GuildId) -> Option<PlayMode> {
        // Clone the handle out so no map guard is held across the await.
        let handle = self.handles.get(&guild_id).map(|h| h.value().clone())?;
        handle.get_info().await.ok().map(|info| info.playing)
    }
}

#[async_trait]
impl PlaybackDriver for SongbirdDriver {
    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        on_end: Arc<dyn TrackEndHook>,
    ) -> anyhow::Result<()> {
        let call = self
            .songbird
            .get(guild_id)
            .ok_or_else(|| anyhow::anyhow!("no voice connection for guild {guild_id}"))?;

        let input = self.resolver.open_stream(&track.source_url).await?;

        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };
        let _ = handle.set_volume(self.default_volume);

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndForwarder { hook: on_end },
            )
            .map_err(|e| anyhow::anyhow!("failed to register end handler: {e}"))?;

        self.handles.insert(guild_id, handle);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> bool {
        let Some((_, handle)) = self.handles.remove(&guild_id) else {
            return false;
        };

        let was_active = matches!(
            handle.get_info().await.map(|info| info.playing),
            Ok(PlayMode::Play) | Ok(PlayMode::Pause)
        );
        let _ = handle.stop();
        was_active
    }

    async fn pause(&self, guild_id: GuildId) -> bool {
        if matches!(self.play_mode(guild_id).await, Some(PlayMode::Play)) {
            if let Some(handle) = self.handles.get(&guild_id) {
                return handle.pause().is_ok();
            }
        }
        false
    }

    async fn resume(&self, guild_id: GuildId) -> bool {
        if matches!(self.play_mode(guild_id).await, Some(PlayMode::Pause)) {
            if let Some(handle) = self.handles.get(&guild_id) {
                return handle.play().is_ok();
            }
        }
        false
    }

    async fn is_playing(&self, guild_id: GuildId) -> bool {
        matches!(self.play_mode(guild_id).await, Some(PlayMode::Play))
    }

    async fn is_paused(&self, guild_id: GuildId) -> bool {
        matches!(self.play_mode(guild_id).await, Some(PlayMode::Pause))
    }

    fn is_connected(&self, guild_id: GuildId) -> bool {
        self.songbird.get(guild_id).is_some()
    }
}

/// Bridges songbird's track-end event onto the player's completion hook.
///
/// Songbird delivers the event on its own driver task, never on the command
/// path; all player state the hook touches sits behind its own
/// synchronization, so this forwarder stays a pure relay.
struct TrackEndForwarder {
    hook: Arc<dyn TrackEndHook>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndForwarder {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(ended) => ended.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            }),
            _ => None,
        };

        if error.is_none() {
            debug!("🎶 Track ended, notifying player");
        } else {
            error!("🎶 Track ended with error: {:?}", error);
        }

        self.hook.on_track_end(error).await;
        None
    }
}
