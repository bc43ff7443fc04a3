use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    audio::{player::Player, queue::QueueError},
    bot::GrooveBot,
    models::{PlaylistStub, QueueMode, Track},
    sources::{Resolved, ResolveError},
    ui::embeds,
};

/// Dispatches a slash command to its handler.
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &GrooveBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("command used outside a guild"))?;

    info!(
        "📝 Command /{} used by {} in guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, bot).await?,
        "skip" => handle_skip(ctx, command, bot).await?,
        "pause" => handle_pause(ctx, command, bot).await?,
        "resume" => handle_resume(ctx, command, bot).await?,
        "stop" => handle_stop(ctx, command, bot).await?,
        "mode" => handle_mode(ctx, command, bot).await?,
        "current" => handle_current(ctx, command, bot).await?,
        "queue" => handle_queue(ctx, command, bot).await?,
        "remove" => handle_remove(ctx, command, bot).await?,
        "clear" => handle_clear(ctx, command, bot).await?,
        "join" => handle_join(ctx, command, bot).await?,
        "leave" => handle_leave(ctx, command, bot).await?,
        _ => respond(ctx, &command, "❌ Unknown command", true).await?,
    }

    Ok(())
}

async fn handle_play(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let query = str_option(&command, "song")
        .ok_or_else(|| anyhow::anyhow!("song option missing"))?
        .to_string();

    // Resolution can take a while; defer now.
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    if let Err(err) = ensure_voice(ctx, bot, guild_id, command.user.id).await {
        followup(ctx, &command, &format!("❌ {err}")).await?;
        return Ok(());
    }

    let player = bot.players.get_or_create(guild_id);

    match bot.resolver.resolve(&query).await {
        Ok(Resolved::Single(track)) => {
            queue_and_report(ctx, &command, &player, track).await?;
        }
        Ok(Resolved::Search(results)) => {
            let Some(first) = results.into_iter().next() else {
                followup(ctx, &command, "No results found.").await?;
                return Ok(());
            };
            match bot.resolver.resolve_stub(&first.url).await {
                Ok(track) => queue_and_report(ctx, &command, &player, track).await?,
                Err(ResolveError::GeoRestricted) => {
                    followup(ctx, &command, "That track is not available in your region.").await?;
                }
                Err(err) => {
                    warn!("Failed to resolve search hit {}: {}", first.url, err);
                    followup(ctx, &command, "An error occurred while processing the track.")
                        .await?;
                }
            }
        }
        Ok(Resolved::Playlist(stubs)) => {
            ingest_playlist(ctx, &command, bot, &player, &query, stubs).await?;
        }
        Err(ResolveError::GeoRestricted) => {
            followup(ctx, &command, "That track is not available in your region.").await?;
        }
        Err(err) => {
            warn!("Failed to resolve {}: {}", query, err);
            followup(ctx, &command, "An error occurred while processing the track.").await?;
        }
    }

    Ok(())
}

/// Adds every playlist entry, resolving stubs lazily.
///
/// Per-item resolver failures are reported and skipped; only a full queue
/// aborts the rest of the import.
async fn ingest_playlist(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &GrooveBot,
    player: &Arc<Player>,
    query: &str,
    stubs: Vec<PlaylistStub>,
) -> Result<()> {
    let total = stubs.len();
    if total == 0 {
        followup(ctx, command, "No tracks found in the playlist.").await?;
        return Ok(());
    }
    if total > bot.config.max_playlist_size {
        followup(
            ctx,
            command,
            &format!(
                "Playlist is too large (over {} tracks).",
                bot.config.max_playlist_size
            ),
        )
        .await?;
        return Ok(());
    }

    let start = playlist_start_index(query).min(total.saturating_sub(1));
    info!("🎶 Importing playlist of {} tracks, starting at {}", total, start + 1);
    followup(
        ctx,
        command,
        &format!("Adding {} tracks to the queue ({query})", total - start),
    )
    .await?;

    for (i, stub) in stubs.iter().enumerate().skip(start) {
        let position = i + 1;

        let track = match bot.resolver.resolve_stub(&stub.url).await {
            Ok(track) => track,
            Err(ResolveError::GeoRestricted) => {
                followup(
                    ctx,
                    command,
                    &format!("Track {position}/{total} from playlist is not available in your region."),
                )
                .await?;
                continue;
            }
            Err(err) => {
                warn!("Skipping playlist entry {}: {}", stub.url, err);
                continue;
            }
        };

        match player.add_track(track) {
            Ok(queued) => {
                start_if_idle(player).await;
                followup_embed(
                    ctx,
                    command,
                    &format!(
                        "Queueing track {position} out of {total}: {}",
                        embeds::format_track_link(&queued)
                    ),
                    embeds::track_card(&queued, false),
                )
                .await?;
            }
            Err(QueueError::Capacity) => {
                followup(
                    ctx,
                    command,
                    "The queue is full, stopping the playlist import.",
                )
                .await?;
                break;
            }
            Err(err) => {
                warn!("Could not queue playlist entry: {}", err);
                continue;
            }
        }
    }

    Ok(())
}

async fn handle_skip(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let count = int_option(&command, "songs").unwrap_or(1).max(1) as usize;

    let Some(player) = bot.players.get(guild_id) else {
        return respond(ctx, &command, "No player active for this server.", true).await;
    };

    if !player.is_playing().await && !player.is_paused().await {
        return respond(ctx, &command, "Nothing is playing.", true).await;
    }

    let (skipped, next) = player.skip_tracks(count).await;
    if skipped == 0 {
        return respond(ctx, &command, "Could not skip any tracks.", true).await;
    }

    match next {
        Some(track) => {
            respond_embed(
                ctx,
                &command,
                &format!(
                    "⏭️ Skipped {skipped} track(s). Now playing: {}",
                    embeds::format_track_link(&track)
                ),
                embeds::track_card(&track, false),
            )
            .await
        }
        None => {
            respond(
                ctx,
                &command,
                &format!("⏭️ Skipped {skipped} track(s). No more tracks in the queue."),
                false,
            )
            .await
        }
    }
}

async fn handle_pause(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let paused = match bot.players.get(guild_id) {
        Some(player) => player.pause().await,
        None => false,
    };

    if paused {
        respond(ctx, &command, "⏸️ Paused playback.", true).await
    } else {
        respond(ctx, &command, "Nothing is playing.", true).await
    }
}

async fn handle_resume(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let resumed = match bot.players.get(guild_id) {
        Some(player) => player.resume().await,
        None => false,
    };

    if resumed {
        respond(ctx, &command, "▶️ Resumed playback.", true).await
    } else {
        respond(ctx, &command, "Nothing is paused.", true).await
    }
}

async fn handle_stop(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let stopped = match bot.players.get(guild_id) {
        Some(player) => player.stop().await,
        None => false,
    };

    if stopped {
        respond(ctx, &command, "⏹️ Stopped playback.", false).await
    } else {
        respond(ctx, &command, "Nothing was playing.", true).await
    }
}

async fn handle_mode(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let Some(mode) = str_option(&command, "mode").and_then(QueueMode::parse) else {
        return respond(ctx, &command, "❌ Invalid playback mode.", true).await;
    };

    let player = bot.players.get_or_create(guild_id);
    match player.set_mode(mode) {
        Ok(()) => {
            respond(
                ctx,
                &command,
                &format!("Set playback mode to {}.", mode.label()),
                true,
            )
            .await
        }
        Err(QueueError::NotFound(_)) => {
            respond(
                ctx,
                &command,
                "Nothing has been queued in this server yet.",
                true,
            )
            .await
        }
        Err(err) => respond(ctx, &command, &format!("❌ {err}"), true).await,
    }
}

async fn handle_current(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let current = bot.players.get(guild_id).and_then(|p| p.current_track());

    match current {
        Some(track) => {
            respond_embed(ctx, &command, "", embeds::track_card(&track, false)).await
        }
        None => respond(ctx, &command, "No track is currently playing.", true).await,
    }
}

async fn handle_queue(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let page = int_option(&command, "page").unwrap_or(1).max(1) as usize;

    let tracks = bot
        .players
        .get(guild_id)
        .map(|p| p.queue_all())
        .unwrap_or_default();

    respond_embed(ctx, &command, "", embeds::queue_embed(&tracks, page)).await
}

async fn handle_remove(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let Some(title) = str_option(&command, "title") else {
        return respond(ctx, &command, "❌ Title missing.", true).await;
    };

    let Some(player) = bot.players.get(guild_id) else {
        return respond(ctx, &command, "No player active for this server.", true).await;
    };

    let Some(hit) = player.find(title).into_iter().next() else {
        return respond(ctx, &command, "No queued track matches that title.", true).await;
    };

    match player.remove_item(&hit.id) {
        Ok(()) => {
            respond(
                ctx,
                &command,
                &format!("🗑️ Removed from the queue: {}", hit.title),
                false,
            )
            .await
        }
        Err(err) => respond(ctx, &command, &format!("❌ {err}"), true).await,
    }
}

async fn handle_clear(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    if let Some(player) = bot.players.get(guild_id) {
        player.clear_queue().await;
    }
    respond(ctx, &command, "🗑️ Cleared the queue.", true).await
}

async fn handle_join(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    match ensure_voice(ctx, bot, guild_id, command.user.id).await {
        Ok(()) => respond(ctx, &command, "🔊 Joined your voice channel!", true).await,
        Err(err) => respond(ctx, &command, &format!("❌ {err}"), true).await,
    }
}

async fn handle_leave(ctx: &Context, command: CommandInteraction, bot: &GrooveBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    if let Some(player) = bot.players.get(guild_id) {
        player.stop().await;
    }

    match bot.leave_voice_channel(guild_id).await {
        Ok(()) => respond(ctx, &command, "👋 Left the voice channel.", true).await,
        Err(_) => respond(ctx, &command, "Not in a voice channel.", true).await,
    }
}

// Helpers

/// Queues a single track, starts playback when idle, and reports back.
async fn queue_and_report(
    ctx: &Context,
    command: &CommandInteraction,
    player: &Arc<Player>,
    track: Track,
) -> Result<()> {
    match player.add_track(track) {
        Ok(queued) => {
            let started = start_if_idle(player).await;
            if !started {
                followup(ctx, command, "Failed to start playback.").await?;
                return Ok(());
            }
            followup_embed(
                ctx,
                command,
                &format!("Added to queue: {}", embeds::format_track_link(&queued)),
                embeds::track_card(&queued, false),
            )
            .await?;
        }
        Err(QueueError::Capacity) => {
            followup(ctx, command, "❌ The queue is full (256 tracks max).").await?;
        }
        Err(err) => {
            followup(ctx, command, &format!("❌ {err}")).await?;
        }
    }
    Ok(())
}

/// Starts playback when nothing is active. Returns false only when a start
/// was attempted and failed.
async fn start_if_idle(player: &Arc<Player>) -> bool {
    if player.is_playing().await || player.is_paused().await {
        return true;
    }
    player.play_next().await.is_some()
}

/// Connects the bot to the invoker's voice channel, moving when it is
/// already connected elsewhere.
async fn ensure_voice(
    ctx: &Context,
    bot: &GrooveBot,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<()> {
    let user_channel = get_user_voice_channel(ctx, guild_id, user_id)?;

    match bot.songbird().get(guild_id) {
        None => bot.join_voice_channel(guild_id, user_channel).await,
        Some(call) => {
            let current = call.lock().await.current_channel();
            if current != Some(songbird::id::ChannelId::from(user_channel)) {
                bot.join_voice_channel(guild_id, user_channel).await
            } else {
                Ok(())
            }
        }
    }
}

fn get_user_voice_channel(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild not found in cache"))?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or_else(|| anyhow::anyhow!("You are not connected to a voice channel."))
}

fn str_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn int_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

/// Zero-based start offset from a playlist URL's `index` query parameter.
fn playlist_start_index(query: &str) -> usize {
    let Ok(parsed) = url::Url::parse(query) else {
        return 0;
    };

    parsed
        .query_pairs()
        .find(|(key, _)| key == "index")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .map(|index| index.saturating_sub(1))
        .unwrap_or(0)
}

async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_embed(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    embed: CreateEmbed,
) -> Result<()> {
    let mut message = CreateInteractionResponseMessage::new().embed(embed);
    if !content.is_empty() {
        message = message.content(content);
    }

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;
    Ok(())
}

async fn followup(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new().content(content),
        )
        .await?;
    Ok(())
}

async fn followup_embed(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    embed: CreateEmbed,
) -> Result<()> {
    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .embed(embed),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::playlist_start_index;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_index_comes_from_the_url_query() {
        assert_eq!(
            playlist_start_index("https://www.youtube.com/watch?v=a&list=PL123&index=4"),
            3
        );
        assert_eq!(
            playlist_start_index("https://www.youtube.com/playlist?list=PL123"),
            0
        );
        assert_eq!(
            playlist_start_index("https://www.youtube.com/watch?index=bogus"),
            0
        );
        assert_eq!(playlist_start_index("not a url"), 0);
        // 1-based index 1 maps to offset 0.
        assert_eq!(
            playlist_start_index("https://www.youtube.com/watch?index=1"),
            0
        );
    }
}
