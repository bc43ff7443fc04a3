use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

use crate::models::QueueMode;

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        skip_command(),
        pause_command(),
        resume_command(),
        stop_command(),
        mode_command(),
        current_command(),
        queue_command(),
        remove_command(),
        clear_command(),
        join_command(),
        leave_command(),
    ]
}

/// Registers commands globally (~1h propagation).
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }
    Ok(())
}

/// Registers commands for one guild (~1s propagation, used in development).
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(())
}

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Add a track or playlist to the queue and play")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "song",
                "URL or search term of the song to play",
            )
            .required(true),
        )
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip")
        .description("Skip the current track")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "songs",
                "Number of songs to skip (default 1)",
            )
            .min_int_value(1)
            .max_int_value(100),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause the current track")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume paused playback")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop playback")
}

fn mode_command() -> CreateCommand {
    let mut option = CreateCommandOption::new(
        CommandOptionType::String,
        "mode",
        "Playback mode to set",
    )
    .required(true);

    for mode in [
        QueueMode::NoRepeat,
        QueueMode::RepeatQueue,
        QueueMode::RepeatSingle,
        QueueMode::Shuffle,
    ] {
        option = option.add_string_choice(mode.label(), mode.as_str());
    }

    CreateCommand::new("mode")
        .description("Set the playback mode for this server's queue")
        .add_option(option)
}

fn current_command() -> CreateCommand {
    CreateCommand::new("current").description("See the currently playing track")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Show the current queue")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Page number")
                .min_int_value(1),
        )
}

fn remove_command() -> CreateCommand {
    CreateCommand::new("remove")
        .description("Remove the first queued track matching a title")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "title", "Title to search for")
                .required(true),
        )
}

fn clear_command() -> CreateCommand {
    CreateCommand::new("clear").description("Clear the current queue")
}

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Join your voice channel")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Leave the voice channel")
}
