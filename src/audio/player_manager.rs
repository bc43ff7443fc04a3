use dashmap::DashMap;
use parking_lot::RwLock;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::debug;

use crate::audio::player::{PlaybackDriver, Player};
use crate::audio::queue::QueueManager;

/// Registry of per-guild [`Player`]s, created lazily.
///
/// Entries are never evicted during a session; an idle player is cheap and a
/// stale mapping is harmless.
pub struct PlayerManager {
    queues: Arc<RwLock<QueueManager>>,
    driver: Arc<dyn PlaybackDriver>,
    players: DashMap<GuildId, Arc<Player>>,
}

impl PlayerManager {
    pub fn new(queues: Arc<RwLock<QueueManager>>, driver: Arc<dyn PlaybackDriver>) -> Self {
        Self {
            queues,
            driver,
            players: DashMap::new(),
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Player> {
        self.players
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("🆕 Creating player for guild {}", guild_id);
                Player::new(guild_id, self.queues.clone(), self.driver.clone())
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Player>> {
        self.players.get(&guild_id).map(|p| p.clone())
    }

    #[allow(dead_code)]
    pub fn remove(&self, guild_id: GuildId) {
        self.players.remove(&guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::player::TrackEndHook;
    use async_trait::async_trait;

    struct NullDriver;

    #[async_trait]
    impl PlaybackDriver for NullDriver {
        async fn start(
            &self,
            _guild_id: GuildId,
            _track: &crate::models::Track,
            _on_end: Arc<dyn TrackEndHook>,
        ) -> anyhow::Result<()> {
            anyhow::bail!("not connected")
        }

        async fn stop(&self, _guild_id: GuildId) -> bool {
            false
        }

        async fn pause(&self, _guild_id: GuildId) -> bool {
            false
        }

        async fn resume(&self, _guild_id: GuildId) -> bool {
            false
        }

        async fn is_playing(&self, _guild_id: GuildId) -> bool {
            false
        }

        async fn is_paused(&self, _guild_id: GuildId) -> bool {
            false
        }

        fn is_connected(&self, _guild_id: GuildId) -> bool {
            false
        }
    }

    fn manager() -> PlayerManager {
        PlayerManager::new(
            Arc::new(RwLock::new(QueueManager::new())),
            Arc::new(NullDriver),
        )
    }

    #[test]
    fn get_or_create_is_idempotent_per_guild() {
        let manager = manager();
        let a = manager.get_or_create(GuildId::new(1));
        let b = manager.get_or_create(GuildId::new(1));
        assert!(Arc::ptr_eq(&a, &b));

        let other = manager.get_or_create(GuildId::new(2));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn get_returns_none_until_created() {
        let manager = manager();
        assert!(manager.get(GuildId::new(1)).is_none());
        manager.get_or_create(GuildId::new(1));
        assert!(manager.get(GuildId::new(1)).is_some());
    }

    #[test]
    fn remove_drops_the_mapping() {
        let manager = manager();
        manager.get_or_create(GuildId::new(1));
        manager.remove(GuildId::new(1));
        assert!(manager.get(GuildId::new(1)).is_none());
    }

    #[test]
    fn players_share_one_queue_manager() {
        let manager = manager();
        let a = manager.get_or_create(GuildId::new(1));
        let b = manager.get_or_create(GuildId::new(2));

        a.add_track(crate::models::Track::new("youtube", "A", "https://yt.test/a"))
            .unwrap();
        assert_eq!(a.queue_all().len(), 1);
        // Guild isolation: guild 2 sees its own (empty) queue.
        assert!(b.queue_all().is_empty());
    }
}
