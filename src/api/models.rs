use serde::{Deserialize, Serialize};

/// A PulseAudio/PipeWire sink-input (one application's audio stream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkInput {
    /// Sink-input index used for routing.
    pub sink_input_id: u32,
    pub pid: i32,
    pub application_name: String,
}

/// A Hyprland window client, trimmed to what discovery needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub pid: i32,
    pub title: String,
}

/// A discovered audio source: sink-input data joined with the owning
/// window's title by process id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub sink_input_id: u32,
    pub pid: i32,
    pub application_name: String,
    /// `None` when no window matched the stream's PID.
    pub window_title: Option<String>,
}
