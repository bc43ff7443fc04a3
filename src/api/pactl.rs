use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::api::discovery::SinkInputSource;
use crate::api::models::SinkInput;

static SINK_INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Sink Input #(\d+)").expect("hardcoded regex"));
static PID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"application\.process\.id\s*=\s*"(\d+)""#).expect("hardcoded regex"));
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"application\.name\s*=\s*"([^"]+)""#).expect("hardcoded regex"));

/// Queries active sink-inputs via `pactl list sink-inputs`.
pub struct PactlService {
    timeout: Duration,
}

impl PactlService {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SinkInputSource for PactlService {
    async fn sink_inputs(&self) -> Result<Vec<SinkInput>> {
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new("pactl")
                .args(["list", "sink-inputs"])
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("pactl timed out after {:?}", self.timeout))??;

        if !output.status.success() {
            anyhow::bail!(
                "pactl failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(parse_sink_inputs(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses `pactl list sink-inputs` text output. Blocks missing a PID or an
/// application name are dropped.
pub fn parse_sink_inputs(output: &str) -> Vec<SinkInput> {
    let mut sink_inputs = Vec::new();
    let mut current_id: Option<u32> = None;
    let mut current_pid: Option<i32> = None;
    let mut current_name: Option<String> = None;

    let mut flush = |id: &mut Option<u32>, pid: &mut Option<i32>, name: &mut Option<String>| {
        if let (Some(sink_input_id), Some(pid), Some(application_name)) =
            (id.take(), pid.take(), name.take())
        {
            sink_inputs.push(SinkInput {
                sink_input_id,
                pid,
                application_name,
            });
        }
    };

    for line in output.lines() {
        if let Some(captures) = SINK_INPUT_RE.captures(line) {
            flush(&mut current_id, &mut current_pid, &mut current_name);
            current_id = captures.get(1).and_then(|m| m.as_str().parse().ok());
            continue;
        }

        if current_id.is_none() {
            continue;
        }
        if let Some(captures) = PID_RE.captures(line) {
            current_pid = captures.get(1).and_then(|m| m.as_str().parse().ok());
        } else if let Some(captures) = NAME_RE.captures(line) {
            current_name = captures.get(1).map(|m| m.as_str().to_string());
        }
    }

    flush(&mut current_id, &mut current_pid, &mut current_name);
    sink_inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"Sink Input #42
	Driver: protocol-native.c
	Owner Module: 12
	Properties:
		application.name = "Firefox"
		application.process.id = "1234"
		media.name = "AudioStream"
Sink Input #43
	Driver: protocol-native.c
	Properties:
		application.name = "Spotify"
		application.process.id = "5678"
"#;

    #[test]
    fn parses_complete_sink_input_blocks() {
        let inputs = parse_sink_inputs(SAMPLE);
        assert_eq!(
            inputs,
            vec![
                SinkInput {
                    sink_input_id: 42,
                    pid: 1234,
                    application_name: "Firefox".into(),
                },
                SinkInput {
                    sink_input_id: 43,
                    pid: 5678,
                    application_name: "Spotify".into(),
                },
            ]
        );
    }

    #[test]
    fn drops_blocks_missing_required_properties() {
        let output = r#"Sink Input #7
	Properties:
		application.name = "NoPid"
Sink Input #8
	Properties:
		application.process.id = "999"
		application.name = "Complete"
"#;
        let inputs = parse_sink_inputs(output);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].sink_input_id, 8);
        assert_eq!(inputs[0].application_name, "Complete");
    }

    #[test]
    fn empty_output_parses_to_nothing() {
        assert!(parse_sink_inputs("").is_empty());
        assert!(parse_sink_inputs("0 sink input(s) available.\n").is_empty());
    }
}
