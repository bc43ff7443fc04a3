use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::api::models::{AudioSource, SinkInput, WindowClient};
use crate::api::sink::SinkManager;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SinkInputSource: Send + Sync {
    async fn sink_inputs(&self) -> Result<Vec<SinkInput>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WindowSource: Send + Sync {
    async fn clients(&self) -> Result<Vec<WindowClient>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SinkRouter: Send + Sync {
    async fn route_sink_input(&self, sink_input_id: u32) -> Result<()>;
}

/// Routes through the process-wide sink, which the server also needs
/// mutably for create/destroy.
pub struct SharedSink(pub Arc<Mutex<SinkManager>>);

#[async_trait]
impl SinkRouter for SharedSink {
    async fn route_sink_input(&self, sink_input_id: u32) -> Result<()> {
        self.0.lock().await.route_sink_input(sink_input_id).await
    }
}

/// Joins audio streams with window titles and routes selections into the
/// virtual sink.
pub struct DiscoveryService {
    pactl: Arc<dyn SinkInputSource>,
    hyprctl: Arc<dyn WindowSource>,
    sink: Arc<dyn SinkRouter>,
}

impl DiscoveryService {
    pub fn new(
        pactl: Arc<dyn SinkInputSource>,
        hyprctl: Arc<dyn WindowSource>,
        sink: Arc<dyn SinkRouter>,
    ) -> Self {
        Self {
            pactl,
            hyprctl,
            sink,
        }
    }

    /// Lists audio sources with window titles matched by PID.
    ///
    /// Sink-inputs are essential; their failure is the caller's problem.
    /// Window titles are best-effort: a hyprctl failure degrades every
    /// title to `None`.
    pub async fn discover_sources(&self) -> Result<Vec<AudioSource>> {
        let sink_inputs = self.pactl.sink_inputs().await.map_err(|e| {
            error!("Failed to get sink-inputs from pactl: {e:#}");
            e
        })?;

        let pid_to_title: HashMap<i32, String> = match self.hyprctl.clients().await {
            Ok(clients) => clients.into_iter().map(|c| (c.pid, c.title)).collect(),
            Err(e) => {
                warn!("🪟 Failed to get window titles from hyprctl: {e:#}");
                HashMap::new()
            }
        };

        Ok(sink_inputs
            .into_iter()
            .map(|input| AudioSource {
                sink_input_id: input.sink_input_id,
                pid: input.pid,
                window_title: pid_to_title.get(&input.pid).cloned(),
                application_name: input.application_name,
            })
            .collect())
    }

    /// Routes the selected audio source into the virtual sink.
    pub async fn select_source(&self, sink_input_id: u32) -> Result<()> {
        self.sink.route_sink_input(sink_input_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn service(
        pactl: MockSinkInputSource,
        hyprctl: MockWindowSource,
    ) -> DiscoveryService {
        DiscoveryService::new(Arc::new(pactl), Arc::new(hyprctl), Arc::new(MockSinkRouter::new()))
    }

    fn firefox_input() -> SinkInput {
        SinkInput {
            sink_input_id: 42,
            pid: 1234,
            application_name: "Firefox".into(),
        }
    }

    #[tokio::test]
    async fn matches_sink_inputs_with_window_titles_by_pid() {
        let mut pactl = MockSinkInputSource::new();
        pactl.expect_sink_inputs().times(1).returning(|| {
            Ok(vec![
                firefox_input(),
                SinkInput {
                    sink_input_id: 43,
                    pid: 5678,
                    application_name: "Spotify".into(),
                },
            ])
        });

        let mut hyprctl = MockWindowSource::new();
        hyprctl.expect_clients().times(1).returning(|| {
            Ok(vec![
                WindowClient {
                    pid: 1234,
                    title: "Firefox - YouTube".into(),
                },
                WindowClient {
                    pid: 5678,
                    title: "Spotify Premium".into(),
                },
            ])
        });

        let sources = service(pactl, hyprctl).discover_sources().await.unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].window_title.as_deref(), Some("Firefox - YouTube"));
        assert_eq!(sources[1].window_title.as_deref(), Some("Spotify Premium"));
    }

    #[tokio::test]
    async fn unmatched_pid_has_no_window_title() {
        let mut pactl = MockSinkInputSource::new();
        pactl
            .expect_sink_inputs()
            .returning(|| Ok(vec![firefox_input()]));

        let mut hyprctl = MockWindowSource::new();
        hyprctl.expect_clients().returning(|| {
            Ok(vec![WindowClient {
                pid: 9999,
                title: "Some Other Window".into(),
            }])
        });

        let sources = service(pactl, hyprctl).discover_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].window_title, None);
        assert_eq!(sources[0].application_name, "Firefox");
    }

    #[tokio::test]
    async fn hyprctl_failure_degrades_to_untitled_sources() {
        let mut pactl = MockSinkInputSource::new();
        pactl
            .expect_sink_inputs()
            .returning(|| Ok(vec![firefox_input()]));

        let mut hyprctl = MockWindowSource::new();
        hyprctl
            .expect_clients()
            .returning(|| Err(anyhow::anyhow!("hyprctl failed")));

        let sources = service(pactl, hyprctl).discover_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].window_title, None);
    }

    #[tokio::test]
    async fn pactl_failure_is_an_error() {
        let mut pactl = MockSinkInputSource::new();
        pactl
            .expect_sink_inputs()
            .returning(|| Err(anyhow::anyhow!("pactl failed")));

        let mut hyprctl = MockWindowSource::new();
        hyprctl.expect_clients().never();

        assert!(service(pactl, hyprctl).discover_sources().await.is_err());
    }

    #[tokio::test]
    async fn select_source_routes_through_the_sink() {
        let mut sink = MockSinkRouter::new();
        sink.expect_route_sink_input()
            .withf(|&id| id == 42)
            .times(1)
            .returning(|_| Ok(()));

        let service = DiscoveryService::new(
            Arc::new(MockSinkInputSource::new()),
            Arc::new(MockWindowSource::new()),
            Arc::new(sink),
        );
        service.select_source(42).await.unwrap();
    }
}
