use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::api::discovery::WindowSource;
use crate::api::models::WindowClient;

/// Queries Hyprland window clients via `hyprctl clients -j`.
pub struct HyprctlService {
    timeout: Duration,
}

impl HyprctlService {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl WindowSource for HyprctlService {
    async fn clients(&self) -> Result<Vec<WindowClient>> {
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new("hyprctl")
                .args(["clients", "-j"])
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("hyprctl timed out after {:?}", self.timeout))??;

        if !output.status.success() {
            anyhow::bail!(
                "hyprctl failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_clients(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the JSON client list, keeping only pid and title. Missing fields
/// are an error; the payload shape is owned by Hyprland and a mismatch
/// means we cannot trust any of it.
pub fn parse_clients(payload: &str) -> Result<Vec<WindowClient>> {
    serde_json::from_str(payload).context("failed to parse hyprctl JSON output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_client_list() {
        let payload = r#"[
            {"pid": 1234, "title": "Firefox - YouTube", "class": "firefox", "workspace": {"id": 1}},
            {"pid": 5678, "title": "Spotify Premium", "class": "spotify"}
        ]"#;

        let clients = parse_clients(payload).unwrap();
        assert_eq!(
            clients,
            vec![
                WindowClient {
                    pid: 1234,
                    title: "Firefox - YouTube".into(),
                },
                WindowClient {
                    pid: 5678,
                    title: "Spotify Premium".into(),
                },
            ]
        );
    }

    #[test]
    fn missing_fields_are_an_error() {
        let payload = r#"[{"pid": 1234}]"#;
        assert!(parse_clients(payload).is_err());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_clients("not json").is_err());
    }

    #[test]
    fn empty_list_is_fine() {
        assert!(parse_clients("[]").unwrap().is_empty());
    }
}
