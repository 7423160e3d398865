//! Key → field binding for the XML property-list dialect.
//!
//! Keys match after normalization (lowercase, whitespace stripped), so
//! "Sort Album Artist" and "SortAlbumArtist" land on the same field.
//! Each record type owns one setter table; unknown keys are ignored.

use crate::model::{parse_plist_date, Library, Pid, Playlist, Track};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};

/// Normalize a plist key for table lookup.
pub fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn parse_i64(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

fn parse_bool(kind: &[u8]) -> Option<bool> {
    match kind {
        b"true" => Some(true),
        b"false" => Some(false),
        _ => None,
    }
}

fn parse_date(kind: &[u8], text: &str) -> Option<DateTime<Utc>> {
    if kind != b"date" {
        return None;
    }
    parse_plist_date(text.trim())
}

fn parse_pid(text: &str) -> Option<Pid> {
    Pid::from_hex(text.trim()).ok()
}

fn parse_data(text: &str) -> Vec<u8> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|_| text.as_bytes().to_vec())
}

/// Set a library-level field. Returns whether the key was recognized.
pub fn set_library_field(lib: &mut Library, key: &str, kind: &[u8], text: &str) -> bool {
    match normalize(key).as_str() {
        "majorversion" => lib.major_version = parse_i64(text).map(|v| v as u32),
        "minorversion" => lib.minor_version = parse_i64(text).map(|v| v as u32),
        "applicationversion" => lib.application_version = Some(text.to_string()),
        "date" => lib.date = parse_date(kind, text),
        "features" => lib.features = parse_i64(text).map(|v| v as u32),
        "showcontentratings" => lib.show_content_ratings = parse_bool(kind),
        "librarypersistentid" => lib.persistent_id = parse_pid(text),
        "musicfolder" => lib.music_folder = Some(text.to_string()),
        _ => return false,
    }
    true
}

/// Set a track field. Returns whether the key was recognized.
pub fn set_track_field(t: &mut Track, key: &str, kind: &[u8], text: &str) -> bool {
    match normalize(key).as_str() {
        "trackid" => t.track_id = parse_i64(text).map(|v| v as u32),
        "persistentid" => {
            if let Some(pid) = parse_pid(text) {
                t.persistent_id = pid;
            }
        }
        "name" => t.name = Some(text.to_string()),
        "artist" => t.artist = Some(text.to_string()),
        "albumartist" => t.album_artist = Some(text.to_string()),
        "album" => t.album = Some(text.to_string()),
        "composer" => t.composer = Some(text.to_string()),
        "genre" => t.genre = Some(text.to_string()),
        "grouping" => t.grouping = Some(text.to_string()),
        "kind" => t.kind = Some(text.to_string()),
        "work" => t.work = Some(text.to_string()),
        "comments" => t.comments = Some(text.to_string()),
        "sortname" => t.sort_name = Some(text.to_string()),
        "sortalbum" => t.sort_album = Some(text.to_string()),
        "sortartist" => t.sort_artist = Some(text.to_string()),
        "sortalbumartist" => t.sort_album_artist = Some(text.to_string()),
        "sortcomposer" => t.sort_composer = Some(text.to_string()),
        "location" => t.location = Some(text.to_string()),
        "tracktype" => t.track_type = Some(text.to_string()),
        "size" => t.size = parse_i64(text).map(|v| v as u64),
        "totaltime" => t.total_time = parse_i64(text).map(|v| v as u32),
        "bitrate" => t.bit_rate = parse_i64(text).map(|v| v as u32),
        "samplerate" => t.sample_rate = parse_i64(text).map(|v| v as u32),
        "playcount" => t.play_count = parse_i64(text).map(|v| v as u32),
        "skipcount" => t.skip_count = parse_i64(text).map(|v| v as u32),
        "rating" => t.rating = parse_i64(text).map(|v| v as u8),
        "albumrating" => t.album_rating = parse_i64(text).map(|v| v as u8),
        "albumratingcomputed" => t.album_rating_computed = parse_bool(kind),
        "bpm" => t.bpm = parse_i64(text).map(|v| v as u16),
        "discnumber" => t.disc_number = parse_i64(text).map(|v| v as u8),
        "disccount" => t.disc_count = parse_i64(text).map(|v| v as u8),
        "tracknumber" => t.track_number = parse_i64(text).map(|v| v as u8),
        "trackcount" => t.track_count = parse_i64(text).map(|v| v as u8),
        "movementnumber" => t.movement_number = parse_i64(text).map(|v| v as u32),
        "movementcount" => t.movement_count = parse_i64(text).map(|v| v as u32),
        "year" => t.year = parse_i64(text).map(|v| v as u32),
        "volumeadjustment" => t.volume_adjustment = parse_i64(text).map(|v| v as i32),
        "normalization" => t.normalization = parse_i64(text).map(|v| v as u32),
        "starttime" => t.start_time = parse_i64(text).map(|v| v as u32),
        "stoptime" => t.stop_time = parse_i64(text).map(|v| v as u32),
        "filetype" => t.file_type = parse_i64(text).map(|v| v as u32),
        "filefoldercount" => t.file_folder_count = parse_i64(text).map(|v| v as i32),
        "libraryfoldercount" => t.library_folder_count = parse_i64(text).map(|v| v as i32),
        "compilation" => t.compilation = parse_bool(kind),
        "disabled" => t.disabled = parse_bool(kind),
        "purchased" => t.purchased = parse_bool(kind),
        "loved" => t.loved = parse_bool(kind),
        "dateadded" => t.date_added = parse_date(kind, text),
        "datemodified" => t.date_modified = parse_date(kind, text),
        "purchasedate" => t.purchase_date = parse_date(kind, text),
        "releasedate" => t.release_date = parse_date(kind, text),
        "playdateutc" => t.play_date = parse_date(kind, text),
        "skipdate" => t.skip_date = parse_date(kind, text),
        _ => return false,
    }
    true
}

/// Set a playlist field. Returns whether the key was recognized.
pub fn set_playlist_field(p: &mut Playlist, key: &str, kind: &[u8], text: &str) -> bool {
    match normalize(key).as_str() {
        "name" => p.name = Some(text.to_string()),
        "playlistpersistentid" => {
            if let Some(pid) = parse_pid(text) {
                p.persistent_id = pid;
            }
        }
        "parentpersistentid" => p.parent_persistent_id = parse_pid(text),
        "folder" => p.folder = parse_bool(kind),
        "visible" => p.visible = parse_bool(kind),
        "master" => p.master = parse_bool(kind),
        "allitems" => p.all_items = parse_bool(kind),
        "audiobooks" => p.audiobooks = parse_bool(kind),
        "movies" => p.movies = parse_bool(kind),
        "music" => p.music = parse_bool(kind),
        "podcasts" => p.podcasts = parse_bool(kind),
        "purchasedmusic" => p.purchased_music = parse_bool(kind),
        "tvshows" => p.tv_shows = parse_bool(kind),
        "distinguishedkind" => p.distinguished_kind = parse_i64(text).map(|v| v as u32),
        "smartinfo" => p.smart_info = Some(parse_data(text)),
        "smartcriteria" => p.smart_criteria = Some(parse_data(text)),
        _ => return false,
    }
    true
}
