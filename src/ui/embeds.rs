use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::models::Track;

/// Standardized color palette for the bot's embeds.
pub mod colors {
    use serenity::all::Colour;

    pub const YOUTUBE_RED: Colour = Colour::from_rgb(255, 0, 0);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
}

const STANDARD_FOOTER: &str = "🎵 Groove Bot";

pub const TRACKS_PER_PAGE: usize = 10;

/// Card shown when a track is queued or announced as now playing.
pub fn track_card(track: &Track, error: bool) -> CreateEmbed {
    let link = format_track_link(track);
    let mut description = if error {
        format!("**❌ ERROR while playing {link}**")
    } else {
        format!("**{link}**")
    };

    if track.duration_seconds > 0 {
        let (minutes, seconds) = (track.duration_seconds / 60, track.duration_seconds % 60);
        description.push_str(&format!("\n⏱️ `{minutes}:{seconds:02}`"));
    }

    let mut embed = CreateEmbed::default()
        .description(description)
        .color(if error {
            colors::ERROR_RED
        } else {
            colors::YOUTUBE_RED
        })
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER));

    if let Some(thumbnail) = &track.thumbnail_url {
        embed = embed.thumbnail(thumbnail);
    }
    if let Some(author) = &track.author_name {
        embed = embed.author(serenity::builder::CreateEmbedAuthor::new(author));
    }

    embed
}

/// One page of the queue listing.
pub fn queue_embed(tracks: &[Track], page: usize) -> CreateEmbed {
    let pages = tracks_to_pages(tracks, TRACKS_PER_PAGE);
    let total_pages = pages.len().max(1);
    let page = page.clamp(1, total_pages);

    let body = pages
        .get(page - 1)
        .cloned()
        .unwrap_or_else(|| "The queue is empty.".to_string());

    CreateEmbed::default()
        .title(format!("🎶 Current Queue ({} songs)", tracks.len()))
        .description(body)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(format!(
            "Page {page}/{total_pages} · {STANDARD_FOOTER}"
        )))
}

/// Markdown-style link for a track, falling back to the bare title.
pub fn format_track_link(track: &Track) -> String {
    if track.source_url.is_empty() {
        track.title.clone()
    } else {
        format!("[{}]({})", track.title, track.source_url)
    }
}

/// Splits a track listing into numbered text pages.
pub fn tracks_to_pages(tracks: &[Track], per_page: usize) -> Vec<String> {
    let lines: Vec<String> = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| format!("{}: {}", i + 1, track.title))
        .collect();

    lines
        .chunks(per_page.max(1))
        .map(|chunk| chunk.join("\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(title: &str) -> Track {
        Track::new("youtube", title, format!("https://yt.test/{title}"))
    }

    #[test]
    fn pages_split_on_the_configured_size() {
        let tracks: Vec<Track> = (1..=23).map(|i| track(&format!("Song {i}"))).collect();
        let pages = tracks_to_pages(&tracks, 10);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].lines().count(), 10);
        assert_eq!(pages[2].lines().count(), 3);
        assert!(pages[0].starts_with("1: Song 1"));
        assert!(pages[2].ends_with("23: Song 23"));
    }

    #[test]
    fn empty_queue_yields_no_pages() {
        assert!(tracks_to_pages(&[], 10).is_empty());
    }

    #[test]
    fn track_link_falls_back_to_title() {
        let mut t = track("Linked");
        assert_eq!(
            format_track_link(&t),
            "[Linked](https://yt.test/Linked)"
        );
        t.source_url.clear();
        assert_eq!(format_track_link(&t), "Linked");
    }
}
