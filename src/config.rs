use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // development guild for fast command propagation

    // Playback
    pub default_volume: f32,
    pub max_playlist_size: usize,

    // Routing API
    pub api_host: String,
    pub api_port: u16,

    // Virtual sink
    pub sink_name: String,
    pub sink_sample_rate: u32,
    pub sink_channels: u8,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Playback
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            // Routing API
            api_host: std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,

            // Virtual sink
            sink_name: std::env::var("SINK_NAME")
                .unwrap_or_else(|_| "discord_capture".to_string()),
            sink_sample_rate: std::env::var("SINK_SAMPLE_RATE")
                .unwrap_or_else(|_| "48000".to_string())
                .parse()?,
            sink_channels: std::env::var("SINK_CHANNELS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that catch the common misconfigurations before the bot
    /// connects anywhere.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token must not be empty");
        }

        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.api_port == 0 {
            anyhow::bail!("API port must be greater than 0");
        }

        if self.sink_name.trim().is_empty() || self.sink_name.contains(char::is_whitespace) {
            anyhow::bail!("Sink name must be a single non-empty word, got: '{}'", self.sink_name);
        }

        if !(8_000..=192_000).contains(&self.sink_sample_rate) {
            anyhow::bail!(
                "Sink sample rate must be between 8kHz and 192kHz, got: {}",
                self.sink_sample_rate
            );
        }

        if !(1..=2).contains(&self.sink_channels) {
            anyhow::bail!("Sink channels must be 1 or 2, got: {}", self.sink_channels);
        }

        Ok(())
    }

    /// Token-free summary for startup logging.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: guild {}\n  \
            Playback: {}% volume, {} max playlist\n  \
            API: {}:{}\n  \
            Sink: '{}' @ {}Hz x{}",
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0) as u32,
            self.max_playlist_size,
            self.api_host,
            self.api_port,
            self.sink_name,
            self.sink_sample_rate,
            self.sink_channels,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            guild_id: None,
            default_volume: 0.5,
            max_playlist_size: 100,
            api_host: "127.0.0.1".into(),
            api_port: 8000,
            sink_name: "discord_capture".into(),
            sink_sample_rate: 48000,
            sink_channels: 2,
        }
    }
}
