use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static MODULE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("hardcoded regex"));

/// Lifecycle owner of a PulseAudio/PipeWire null sink.
///
/// Applications are routed into the sink; recordings read from its monitor
/// source. `destroy` is graceful and safe to call whether or not the sink
/// still exists.
pub struct SinkManager {
    sink_name: String,
    sample_rate: u32,
    channels: u8,
    module_id: Option<u32>,
}

impl SinkManager {
    pub fn new(sink_name: String, sample_rate: u32, channels: u8) -> Self {
        Self {
            sink_name,
            sample_rate,
            channels,
            module_id: None,
        }
    }

    /// Loads the null-sink module and remembers its id for teardown.
    pub async fn create(&mut self) -> Result<()> {
        let output = tokio::process::Command::new("pactl")
            .args(["load-module", "module-null-sink"])
            .arg(format!("sink_name={}", self.sink_name))
            .arg(format!("rate={}", self.sample_rate))
            .arg(format!("channels={}", self.channels))
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!(
                "failed to create sink '{}': {}",
                self.sink_name,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        self.module_id = Some(parse_module_id(&stdout).ok_or_else(|| {
            anyhow::anyhow!("failed to parse module id from pactl output: {stdout}")
        })?);

        info!("🔈 Created null sink '{}' (module {})", self.sink_name, self.module_id.unwrap_or(0));
        Ok(())
    }

    /// Unloads the module if it is still loaded. Never fails: whatever
    /// happens, the sink is considered gone afterwards.
    pub async fn destroy(&mut self) {
        let Some(module_id) = self.module_id else {
            return;
        };

        let module_id_str = module_id.to_string();
        let still_loaded = match tokio::process::Command::new("pactl")
            .args(["list", "short", "modules"])
            .output()
            .await
        {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .any(|line| line.split_whitespace().next() == Some(module_id_str.as_str())),
            _ => false,
        };

        if still_loaded {
            let result = tokio::process::Command::new("pactl")
                .args(["unload-module", module_id_str.as_str()])
                .output()
                .await;

            if let Err(e) = result {
                warn!("Failed to unload module {}: {}", module_id, e);
            }
        }

        self.module_id = None;
        info!("🧹 Null sink '{}' destroyed", self.sink_name);
    }

    /// Moves a sink-input into this sink.
    pub async fn route_sink_input(&self, sink_input_id: u32) -> Result<()> {
        let output = tokio::process::Command::new("pactl")
            .arg("move-sink-input")
            .arg(sink_input_id.to_string())
            .arg(&self.sink_name)
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!(
                "failed to route sink input {} to '{}': {}",
                sink_input_id,
                self.sink_name,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        info!("🔀 Routed sink input {} to '{}'", sink_input_id, self.sink_name);
        Ok(())
    }

    /// Monitor source name recordings should capture from.
    pub fn monitor_source(&self) -> String {
        format!("{}.monitor", self.sink_name)
    }

    #[allow(dead_code)]
    pub fn is_created(&self) -> bool {
        self.module_id.is_some()
    }
}

fn parse_module_id(stdout: &str) -> Option<u32> {
    MODULE_ID_RE
        .find(stdout)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn module_id_parses_from_either_output_shape() {
        assert_eq!(parse_module_id("42\n"), Some(42));
        assert_eq!(parse_module_id("Loaded module with index 42"), Some(42));
        assert_eq!(parse_module_id("no digits here"), None);
    }

    #[test]
    fn monitor_source_is_derived_from_the_sink_name() {
        let sink = SinkManager::new("discord_capture".into(), 48000, 2);
        assert_eq!(sink.monitor_source(), "discord_capture.monitor");
        assert!(!sink.is_created());
    }

    #[tokio::test]
    async fn destroying_a_never_created_sink_is_a_noop() {
        let mut sink = SinkManager::new("ghost".into(), 48000, 2);
        sink.destroy().await;
        assert!(!sink.is_created());
    }
}
