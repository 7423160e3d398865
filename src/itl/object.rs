//! Typed objects of the "itl" dialect.
//!
//! Every frame decodes into one of these variants; field offsets index
//! the full frame buffer, header included. Fields past the end of a
//! truncated frame simply stay at their defaults.

use super::data::DataObject;
use crate::error::{Error, Result};
use crate::frame::{null_terminated, Frame};
use crate::model::MacTime;

/// One decoded object frame.
#[derive(Debug)]
pub enum Object {
    Envelope(Envelope),
    DataSet(DataSet),
    Counter(Counter),
    AlbumList(ListHeader),
    ArtistList(ListHeader),
    TrackList(ListHeader),
    PlaylistList(ListHeader),
    Album(Album),
    Artist(Artist),
    Track(TrackObject),
    Playlist(PlaylistObject),
    PlaylistItem(PlaylistItem),
    DataObject(DataObject),
    QueryList,
    QueryItem,
    /// A tag this reader does not interpret; recorded and skipped.
    Unhandled([u8; 4]),
}

/// Decode a frame into its typed object.
pub fn decode(frame: &Frame) -> Result<Object> {
    let obj = match &frame.tag {
        b"hdfm" => Object::Envelope(Envelope::decode(frame)?),
        b"hdsm" => Object::DataSet(DataSet::decode(frame)),
        b"hghm" => Object::Counter(Counter::decode(frame)),
        b"halm" => Object::AlbumList(ListHeader::decode(frame)),
        b"hilm" => Object::ArtistList(ListHeader::decode(frame)),
        b"htlm" => Object::TrackList(ListHeader::decode(frame)),
        b"hplm" => Object::PlaylistList(ListHeader::decode(frame)),
        b"haim" => Object::Album(Album::decode(frame)),
        b"hiim" => Object::Artist(Artist::decode(frame)),
        b"htim" => Object::Track(TrackObject::decode(frame)?),
        b"hpim" => Object::Playlist(PlaylistObject::decode(frame)?),
        b"hptm" => Object::PlaylistItem(PlaylistItem::decode(frame)),
        b"hohm" => Object::DataObject(DataObject::decode(frame)),
        b"hqlm" => Object::QueryList,
        b"hqim" => Object::QueryItem,
        other => Object::Unhandled(*other),
    };
    Ok(obj)
}

/// Database envelope (`hdfm`).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub application_version: String,
    pub persistent_id: u64,
    pub major_version: u8,
    pub minor_version: u8,
    pub max_crypt_size: u32,
    pub tz_offset: i32,
}

impl Envelope {
    fn decode(frame: &Frame) -> Result<Self> {
        // The envelope must be intact; everything downstream depends on it.
        let persistent_id = frame
            .u64_at(52)
            .ok_or_else(|| Error::format("catalog envelope too short"))?;
        let version = frame
            .bytes_at(17, 31)
            .map(null_terminated)
            .unwrap_or_default();
        Ok(Envelope {
            application_version: version,
            persistent_id,
            major_version: frame.u8_at(65).unwrap_or(0),
            minor_version: frame.u8_at(67).unwrap_or(0),
            max_crypt_size: frame.u32_at(92).unwrap_or(0),
            tz_offset: frame.i32_at(100).unwrap_or(0),
        })
    }
}

/// Data-set boundary (`hdsm`).
#[derive(Debug, Clone)]
pub struct DataSet {
    pub record_bytes: u32,
}

impl DataSet {
    fn decode(frame: &Frame) -> Self {
        DataSet {
            record_bytes: frame.u32_at(8).unwrap_or(0),
        }
    }
}

/// Record counter (`hghm`) carrying the library date.
#[derive(Debug, Clone)]
pub struct Counter {
    pub record_count: u32,
    pub library_date: MacTime,
}

impl Counter {
    fn decode(frame: &Frame) -> Self {
        Counter {
            record_count: frame.u32_at(8).unwrap_or(0),
            library_date: MacTime(frame.u32_at(16).unwrap_or(0)),
        }
    }
}

/// Shared shape of the four list-header objects.
#[derive(Debug, Clone)]
pub struct ListHeader {
    pub record_count: u32,
}

impl ListHeader {
    fn decode(frame: &Frame) -> Self {
        ListHeader {
            record_count: frame.u32_at(8).unwrap_or(0),
        }
    }
}

/// Album entry (`haim`).
#[derive(Debug, Clone)]
pub struct Album {
    pub record_count: u32,
    pub sequence: u32,
    pub album_id: u64,
    pub artist_id: u64,
    pub rating: u8,
}

impl Album {
    fn decode(frame: &Frame) -> Self {
        Album {
            record_count: frame.u32_at(12).unwrap_or(0),
            sequence: frame.u32_at(16).unwrap_or(0),
            album_id: frame.u64_at(20).unwrap_or(0),
            artist_id: frame.u64_at(32).unwrap_or(0),
            rating: frame.u8_at(42).unwrap_or(0),
        }
    }
}

/// Artist entry (`hiim`).
#[derive(Debug, Clone)]
pub struct Artist {
    pub record_count: u32,
    pub sequence: u32,
    pub artist_id: u64,
}

impl Artist {
    fn decode(frame: &Frame) -> Self {
        Artist {
            record_count: frame.u32_at(12).unwrap_or(0),
            sequence: frame.u32_at(16).unwrap_or(0),
            artist_id: frame.u64_at(20).unwrap_or(0),
        }
    }
}

/// Track entry (`htim`).
#[derive(Debug, Clone, Default)]
pub struct TrackObject {
    pub record_count: u32,
    pub track_id: u32,
    pub file_type: [u8; 4],
    pub date_modified: MacTime,
    pub file_size: u32,
    pub total_time: u32,
    pub track_number: u32,
    pub track_count: u32,
    pub year: u16,
    pub bit_rate: u16,
    pub sample_rate: u16,
    pub volume_adjustment: i32,
    pub start_time: u32,
    pub stop_time: u32,
    pub play_count: u32,
    pub compilation: bool,
    pub play_date: MacTime,
    pub disc_number: u16,
    pub disc_count: u16,
    pub rating: u8,
    pub bpm: u8,
    pub date_added: MacTime,
    pub disabled: bool,
    pub persistent_id: u64,
    pub purchase_date: MacTime,
    pub release_date: MacTime,
    pub album_sequence: u32,
    pub backup_date: MacTime,
    pub sample_count: u32,
    pub skip_count: u32,
    pub skip_date: MacTime,
}

impl TrackObject {
    fn decode(frame: &Frame) -> Result<Self> {
        let persistent_id = frame
            .u64_at(128)
            .ok_or_else(|| Error::format(format!("track frame too short: {} bytes", frame.data.len())))?;
        let mut t = TrackObject {
            record_count: frame.u32_at(12).unwrap_or(0),
            track_id: frame.u32_at(16).unwrap_or(0),
            date_modified: MacTime(frame.u32_at(32).unwrap_or(0)),
            file_size: frame.u32_at(36).unwrap_or(0),
            total_time: frame.u32_at(40).unwrap_or(0),
            track_number: frame.u32_at(44).unwrap_or(0),
            track_count: frame.u32_at(48).unwrap_or(0),
            year: frame.u16_at(54).unwrap_or(0),
            bit_rate: frame.u16_at(58).unwrap_or(0),
            sample_rate: frame.u16_at(60).unwrap_or(0),
            volume_adjustment: frame.i32_at(64).unwrap_or(0),
            start_time: frame.u32_at(68).unwrap_or(0),
            stop_time: frame.u32_at(72).unwrap_or(0),
            play_count: frame.u32_at(76).unwrap_or(0),
            compilation: frame.u16_at(82).unwrap_or(0) != 0,
            play_date: MacTime(frame.u32_at(100).unwrap_or(0)),
            disc_number: frame.u16_at(104).unwrap_or(0),
            disc_count: frame.u16_at(106).unwrap_or(0),
            rating: frame.u8_at(108).unwrap_or(0),
            bpm: frame.u8_at(109).unwrap_or(0),
            date_added: MacTime(frame.u32_at(120).unwrap_or(0)),
            disabled: frame.u32_at(124).unwrap_or(0) != 0,
            persistent_id,
            purchase_date: MacTime(frame.u32_at(156).unwrap_or(0)),
            release_date: MacTime(frame.u32_at(160).unwrap_or(0)),
            album_sequence: frame.u32_at(220).unwrap_or(0),
            backup_date: MacTime(frame.u32_at(224).unwrap_or(0)),
            sample_count: frame.u32_at(248).unwrap_or(0),
            ..TrackObject::default()
        };
        if let Some(ft) = frame.bytes_at(28, 4) {
            t.file_type.copy_from_slice(ft);
        }
        // Trailing fields only exist in newer revisions.
        if frame.data.len() >= 288 {
            t.skip_count = frame.u32_at(280).unwrap_or(0);
            t.skip_date = MacTime(frame.u32_at(284).unwrap_or(0));
        }
        Ok(t)
    }
}

/// Playlist entry (`hpim`).
#[derive(Debug, Clone, Default)]
pub struct PlaylistObject {
    pub record_count: u32,
    pub track_count: u32,
    pub sort_field: u16,
    pub date_added: MacTime,
    pub date_modified: MacTime,
    pub persistent_id: u64,
    pub parent_persistent_id: u64,
    pub folder: bool,
    pub distinguished_kind: u8,
}

impl PlaylistObject {
    fn decode(frame: &Frame) -> Result<Self> {
        let persistent_id = frame.u64_at(440).ok_or_else(|| {
            Error::format(format!("playlist frame too short: {} bytes", frame.data.len()))
        })?;
        let mut p = PlaylistObject {
            record_count: frame.u32_at(12).unwrap_or(0),
            track_count: frame.u32_at(16).unwrap_or(0),
            sort_field: frame.u16_at(24).unwrap_or(0),
            date_added: MacTime(frame.u32_at(28).unwrap_or(0)),
            persistent_id,
            parent_persistent_id: frame.u64_at(528).unwrap_or(0),
            folder: frame.u16_at(522).unwrap_or(0) != 0,
            distinguished_kind: frame.u8_at(569).unwrap_or(0),
            ..PlaylistObject::default()
        };
        if frame.data.len() >= 632 {
            p.date_modified = MacTime(frame.u32_at(628).unwrap_or(0));
        }
        Ok(p)
    }
}

/// Playlist member (`hptm`).
#[derive(Debug, Clone)]
pub struct PlaylistItem {
    pub sequence: u32,
    pub track_id: u32,
    pub position: u32,
}

impl PlaylistItem {
    fn decode(frame: &Frame) -> Self {
        PlaylistItem {
            sequence: frame.u32_at(16).unwrap_or(0),
            track_id: frame.u32_at(24).unwrap_or(0),
            position: frame.u32_at(32).unwrap_or(0),
        }
    }
}
