//! Discord-facing layer: the [`GrooveBot`] event handler, slash command
//! registration, and the per-command handlers.
//!
//! The bot owns no playback state of its own. Commands resolve tracks
//! through [`TrackResolver`], then drive the per-guild
//! [`Player`](crate::audio::player::Player) obtained from the shared
//! [`PlayerManager`]; voice connections live inside songbird.

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{audio::player_manager::PlayerManager, config::Config, sources::TrackResolver};

pub struct GrooveBot {
    pub config: Arc<Config>,
    pub players: Arc<PlayerManager>,
    pub resolver: Arc<TrackResolver>,
    songbird: Arc<Songbird>,
}

impl GrooveBot {
    pub fn new(
        config: Config,
        players: Arc<PlayerManager>,
        resolver: Arc<TrackResolver>,
        songbird: Arc<Songbird>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            players,
            resolver,
            songbird,
        }
    }

    pub fn songbird(&self) -> &Arc<Songbird> {
        &self.songbird
    }

    /// Registers slash commands, per-guild when a development guild is
    /// configured (fast propagation), globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::from(guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Guild commands registered for: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }

    /// Connects (or moves) the bot to a voice channel.
    pub async fn join_voice_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<()> {
        match self.songbird.join(guild_id, channel_id).await {
            Ok(_call) => {
                info!("🔊 Connected to voice channel in guild {}", guild_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to join voice channel: {:?}", e);
                Err(anyhow::anyhow!("Could not join the voice channel."))
            }
        }
    }

    pub async fn leave_voice_channel(&self, guild_id: GuildId) -> Result<()> {
        self.songbird.remove(guild_id).await?;
        info!("👋 Disconnected from voice channel in guild {}", guild_id);
        Ok(())
    }
}

#[async_trait]
impl EventHandler for GrooveBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Failed to register commands: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error handling command: {:?}", e);
            }
        }
    }

    /// Stops the guild's player when the bot itself is disconnected from
    /// voice. The player mapping stays; it is reused on the next join.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let bot_id = ctx.cache.current_user().id;
        if new.user_id != bot_id {
            return;
        }

        if old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                info!("🔌 Bot disconnected from voice in guild {}", guild_id);

                if let Some(player) = self.players.get(guild_id) {
                    if !player.stop().await {
                        warn!("Nothing to stop for guild {}", guild_id);
                    }
                }
            }
        }
    }
}
