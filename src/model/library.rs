use super::Pid;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Library-level metadata parsed from a catalog envelope or header.
///
/// Binary dialect B emits two of these per file: one from the envelope
/// and a second from the library-master object carrying the music folder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Library {
    /// Format major version.
    pub major_version: Option<u32>,

    /// Format minor version.
    pub minor_version: Option<u32>,

    /// Version string of the application that wrote the catalog.
    pub application_version: Option<String>,

    /// Library persistent id.
    pub persistent_id: Option<Pid>,

    /// Declared number of tracks, when the format carries one.
    pub tracks: Option<u32>,

    /// Declared number of playlists, when the format carries one.
    pub playlists: Option<u32>,

    /// URL of the media folder.
    pub music_folder: Option<String>,

    /// Date the library was written.
    pub date: Option<DateTime<Utc>>,

    /// Feature flags (XML dialect only).
    pub features: Option<u32>,

    /// Whether content ratings are shown (XML dialect only).
    pub show_content_ratings: Option<bool>,
}
