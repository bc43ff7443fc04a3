//! Track resolution: turning user queries into playable metadata and
//! streamable audio handles.

pub mod ytdlp;

pub use ytdlp::{Resolved, ResolveError, TrackResolver};
