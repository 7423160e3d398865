use super::Pid;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single track record.
///
/// Every field except the persistent id is optional: each dialect fills
/// in whatever its object layout and attribute frames actually carry.
/// The local `track_id` is only meaningful within one file, where it
/// cross-references playlist items.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Track {
    /// Stable identifier for this track.
    pub persistent_id: Pid,

    /// File-local integer id used by playlist items (dialects A and XML).
    pub track_id: Option<u32>,

    // string attributes
    pub name: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub grouping: Option<String>,
    pub kind: Option<String>,
    pub work: Option<String>,
    pub comments: Option<String>,
    pub sort_name: Option<String>,
    pub sort_album: Option<String>,
    pub sort_artist: Option<String>,
    pub sort_album_artist: Option<String>,
    pub sort_composer: Option<String>,
    /// Location URL of the media file.
    pub location: Option<String>,
    /// "File" or "URL", derived from the location scheme.
    pub track_type: Option<String>,

    // scalar attributes
    pub size: Option<u64>,
    /// Duration in milliseconds.
    pub total_time: Option<u32>,
    pub bit_rate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub play_count: Option<u32>,
    pub skip_count: Option<u32>,
    /// Star rating scaled 0-100.
    pub rating: Option<u8>,
    /// Rating inherited from the album record rather than set directly.
    pub album_rating: Option<u8>,
    pub album_rating_computed: Option<bool>,
    pub bpm: Option<u16>,
    pub disc_number: Option<u8>,
    pub disc_count: Option<u8>,
    pub track_number: Option<u8>,
    pub track_count: Option<u8>,
    pub movement_number: Option<u32>,
    pub movement_count: Option<u32>,
    pub year: Option<u32>,
    pub volume_adjustment: Option<i32>,
    pub normalization: Option<u32>,
    /// Playback start offset in milliseconds.
    pub start_time: Option<u32>,
    /// Playback stop offset in milliseconds.
    pub stop_time: Option<u32>,
    pub file_type: Option<u32>,
    pub file_folder_count: Option<i32>,
    pub library_folder_count: Option<i32>,

    // boolean flags
    pub compilation: Option<bool>,
    pub disabled: Option<bool>,
    pub purchased: Option<bool>,
    pub loved: Option<bool>,

    // timestamps
    pub date_added: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub release_date: Option<DateTime<Utc>>,
    pub play_date: Option<DateTime<Utc>>,
    pub skip_date: Option<DateTime<Utc>>,
    pub backup_date: Option<DateTime<Utc>>,
}

impl Track {
    /// Create a track carrying only its persistent id.
    pub fn new(persistent_id: Pid) -> Self {
        Track {
            persistent_id,
            ..Track::default()
        }
    }
}
