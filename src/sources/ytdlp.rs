use serde_json::Value;
use songbird::input::{Input, YoutubeDl};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{PlaylistStub, SearchResult, Track};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The extractor refused the track for the caller's region. Surfaced to
    /// the user as a skip-this-track notice, never fatal.
    #[error("track is not available in your region")]
    GeoRestricted,
    #[error("download failed: {0}")]
    Download(String),
    #[error("could not parse yt-dlp output: {0}")]
    Parse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What a query resolved to.
#[derive(Debug)]
pub enum Resolved {
    Single(Track),
    /// Lightweight stubs; each must be resolved individually before play.
    Playlist(Vec<PlaylistStub>),
    Search(Vec<SearchResult>),
}

/// yt-dlp subprocess wrapper.
///
/// One metadata extraction call per query; playlists come back flat (stub
/// URLs only) and searches resolve to up to five hits.
pub struct TrackResolver;

impl TrackResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolves a URL or free-text search into playable metadata.
    pub async fn resolve(&self, query: &str) -> Result<Resolved, ResolveError> {
        info!("🔍 Resolving: {}", query);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "-J",
                "--flat-playlist",
                "--default-search",
                "ytsearch5",
                "--no-warnings",
                "--quiet",
                "--socket-timeout",
                "30",
                "--retries",
                "3",
                "--force-ipv4",
            ])
            .arg(query)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp failed for {}: {}", query, stderr.trim());
            return Err(classify_failure(&stderr));
        }

        let data: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolveError::Parse(e.to_string()))?;
        parse_payload(&data)
    }

    /// Resolves a playlist stub into a playable track.
    pub async fn resolve_stub(&self, url: &str) -> Result<Track, ResolveError> {
        match self.resolve(url).await? {
            Resolved::Single(track) => Ok(track),
            _ => Err(ResolveError::Parse(format!(
                "expected a single track for {url}"
            ))),
        }
    }

    /// Opens a streamable audio handle for the track's source URL. The input
    /// is lazy; the decode pipeline spins up when the transport starts it.
    pub async fn open_stream(&self, source_url: &str) -> anyhow::Result<Input> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; Discord Music Bot)")
            .build()?;

        let ytdl = YoutubeDl::new(client, source_url.to_string());
        Ok(Input::from(ytdl))
    }

    /// Probes for the external tools the resolver shells out to.
    pub async fn verify_dependencies() -> anyhow::Result<()> {
        let ytdlp = tokio::process::Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await;

        match ytdlp {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp version: {}", version.trim());
                Ok(())
            }
            _ => {
                error!("❌ yt-dlp not found. Install with: pip install yt-dlp");
                anyhow::bail!("yt-dlp unavailable")
            }
        }
    }
}

impl Default for TrackResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinguishes geo-restriction from generic download failures by probing
/// the extractor's stderr.
fn classify_failure(stderr: &str) -> ResolveError {
    let lower = stderr.to_lowercase();
    let geo = lower.contains("geo restricted")
        || lower.contains("geo-restricted")
        || lower.contains("not available in your country")
        || lower.contains("blocked it in your country")
        || lower.contains("not made this video available in your country");

    if geo {
        ResolveError::GeoRestricted
    } else {
        ResolveError::Download(stderr.trim().to_string())
    }
}

fn parse_payload(data: &Value) -> Result<Resolved, ResolveError> {
    let extractor = data.get("extractor").and_then(Value::as_str).unwrap_or("");

    if extractor == "youtube:search" {
        let entries = data
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| ResolveError::Parse("no entries in search payload".into()))?;

        let results = entries.iter().filter_map(parse_search_entry).collect();
        return Ok(Resolved::Search(results));
    }

    if let Some(entries) = data.get("entries").and_then(Value::as_array) {
        let stubs = entries
            .iter()
            .filter_map(|entry| {
                entry
                    .get("url")
                    .and_then(Value::as_str)
                    .map(|url| PlaylistStub {
                        url: url.to_string(),
                    })
            })
            .collect();
        return Ok(Resolved::Playlist(stubs));
    }

    parse_track(data).map(Resolved::Single)
}

fn parse_search_entry(entry: &Value) -> Option<SearchResult> {
    let url = entry.get("url").and_then(Value::as_str)?;

    Some(SearchResult {
        title: entry
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Title")
            .to_string(),
        url: url.to_string(),
        author_name: entry
            .get("uploader")
            .and_then(Value::as_str)
            .map(str::to_string),
        duration_seconds: entry.get("duration").and_then(Value::as_f64).unwrap_or(0.0) as u64,
    })
}

fn parse_track(data: &Value) -> Result<Track, ResolveError> {
    // The page URL, not a pre-extracted media URL: the stream handle runs
    // its own extraction when started.
    let url = data
        .get("webpage_url")
        .or_else(|| data.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| ResolveError::Parse("no URL in track payload".into()))?;

    let mut track = Track::new(
        data.get("extractor")
            .and_then(Value::as_str)
            .unwrap_or("unknown"),
        data.get("title")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Title"),
        url,
    )
    .with_duration(data.get("duration").and_then(Value::as_f64).unwrap_or(0.0) as u64);

    if let Some(thumbnail) = data.get("thumbnail").and_then(Value::as_str) {
        track = track.with_thumbnail(thumbnail);
    }
    if let Some(uploader) = data.get("uploader").and_then(Value::as_str) {
        track = track.with_author(uploader);
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn single_video_payload_parses_to_a_track() {
        let payload = json!({
            "extractor": "youtube",
            "title": "Test Song",
            "webpage_url": "https://www.youtube.com/watch?v=abc123",
            "url": "https://cdn.example/media.m4a",
            "thumbnail": "https://i.ytimg.com/vi/abc123/hq720.jpg",
            "uploader": "Test Channel",
            "duration": 213.4,
        });

        let Resolved::Single(track) = parse_payload(&payload).unwrap() else {
            panic!("expected a single track");
        };
        assert_eq!(track.title, "Test Song");
        assert_eq!(track.kind, "youtube");
        assert_eq!(track.source_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(track.author_name.as_deref(), Some("Test Channel"));
        assert_eq!(track.duration_seconds, 213);
        assert!(track.thumbnail_url.is_some());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let payload = json!({ "url": "https://example.com/raw" });

        let Resolved::Single(track) = parse_payload(&payload).unwrap() else {
            panic!("expected a single track");
        };
        assert_eq!(track.title, "Unknown Title");
        assert_eq!(track.kind, "unknown");
        assert_eq!(track.duration_seconds, 0);
        assert!(track.author_name.is_none());
    }

    #[test]
    fn payload_without_url_is_an_error() {
        let payload = json!({ "title": "No URL" });
        assert!(matches!(
            parse_payload(&payload),
            Err(ResolveError::Parse(_))
        ));
    }

    #[test]
    fn playlist_payload_parses_to_stubs() {
        let payload = json!({
            "extractor": "youtube:tab",
            "entries": [
                { "url": "https://www.youtube.com/watch?v=a" },
                { "title": "no url, skipped" },
                { "url": "https://www.youtube.com/watch?v=b" },
            ],
        });

        let Resolved::Playlist(stubs) = parse_payload(&payload).unwrap() else {
            panic!("expected a playlist");
        };
        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].url, "https://www.youtube.com/watch?v=a");
    }

    #[test]
    fn search_payload_parses_to_results() {
        let payload = json!({
            "extractor": "youtube:search",
            "entries": [
                { "url": "https://www.youtube.com/watch?v=hit1", "title": "Hit 1", "uploader": "Ch", "duration": 10 },
                { "url": "https://www.youtube.com/watch?v=hit2", "title": "Hit 2" },
            ],
        });

        let Resolved::Search(results) = parse_payload(&payload).unwrap() else {
            panic!("expected search results");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Hit 1");
        assert_eq!(results[0].author_name.as_deref(), Some("Ch"));
        assert_eq!(results[1].duration_seconds, 0);
    }

    #[test]
    fn search_payload_without_entries_is_an_error() {
        let payload = json!({ "extractor": "youtube:search" });
        assert!(matches!(
            parse_payload(&payload),
            Err(ResolveError::Parse(_))
        ));
    }

    #[test]
    fn geo_restriction_is_classified_from_stderr() {
        let stderr = "ERROR: [youtube] abc: The uploader has not made this video available in your country";
        assert!(matches!(classify_failure(stderr), ResolveError::GeoRestricted));

        let stderr = "ERROR: [youtube] abc: Video unavailable";
        assert!(matches!(classify_failure(stderr), ResolveError::Download(_)));
    }
}
