//! Typed objects of the "musicdb" dialect.

use super::boma::DataObject;
use crate::error::{Error, Result};
use crate::frame::{null_terminated, Frame};
use crate::model::MacTime;

/// One decoded object frame.
#[derive(Debug)]
pub enum Object {
    Envelope(Envelope),
    SectionBoundary(SectionBoundary),
    LibraryMaster(LibraryMaster),
    AlbumList(AlbumList),
    Album(Album),
    ArtistList(ArtistList),
    Artist(Artist),
    TrackList(TrackList),
    Track(TrackObject),
    PlaylistList(PlaylistList),
    Playlist(PlaylistObject),
    DataObject(Box<DataObject>),
    Unhandled([u8; 4]),
}

/// Decode a frame into its typed object.
pub fn decode(frame: &Frame) -> Result<Object> {
    let obj = match &frame.tag {
        b"hfma" => Object::Envelope(Envelope::decode(frame)?),
        b"hsma" => Object::SectionBoundary(SectionBoundary::decode(frame)),
        b"plma" => Object::LibraryMaster(LibraryMaster::decode(frame)?),
        b"lama" => Object::AlbumList(AlbumList::decode(frame)),
        b"iama" => Object::Album(Album::decode(frame)?),
        b"lAma" => Object::ArtistList(ArtistList::decode(frame)),
        b"iAma" => Object::Artist(Artist::decode(frame)?),
        b"ltma" => Object::TrackList(TrackList::decode(frame)),
        b"itma" => Object::Track(TrackObject::decode(frame)?),
        b"lPma" => Object::PlaylistList(PlaylistList::decode(frame)),
        b"lpma" => Object::Playlist(PlaylistObject::decode(frame)?),
        b"boma" => Object::DataObject(Box::new(DataObject::decode(frame))),
        other => Object::Unhandled(*other),
    };
    Ok(obj)
}

/// File envelope (`hfma`).
#[derive(Debug, Clone)]
pub struct Envelope {
    pub major_version: u16,
    pub minor_version: u16,
    pub application_version: String,
    pub persistent_id: u64,
    pub item_count: u32,
    pub playlist_count: u32,
    pub max_crypt_size: u32,
    pub library_date: MacTime,
}

impl Envelope {
    fn decode(frame: &Frame) -> Result<Self> {
        let persistent_id = frame
            .u64_at(48)
            .ok_or_else(|| Error::format("library envelope too short"))?;
        Ok(Envelope {
            major_version: frame.u16_at(12).unwrap_or(0),
            minor_version: frame.u16_at(14).unwrap_or(0),
            application_version: frame
                .bytes_at(16, 32)
                .map(null_terminated)
                .unwrap_or_default(),
            persistent_id,
            item_count: frame.u32_at(68).unwrap_or(0),
            playlist_count: frame.u32_at(72).unwrap_or(0),
            max_crypt_size: frame.u32_at(84).unwrap_or(0),
            library_date: MacTime(frame.u32_at(100).unwrap_or(0)),
        })
    }
}

/// Section boundary (`hsma`).
#[derive(Debug, Clone)]
pub struct SectionBoundary {
    pub sections_length: u32,
    pub sub_type: u32,
}

impl SectionBoundary {
    fn decode(frame: &Frame) -> Self {
        SectionBoundary {
            sections_length: frame.u32_at(8).unwrap_or(0),
            sub_type: frame.u32_at(12).unwrap_or(0),
        }
    }
}

/// Library master record (`plma`); its data objects carry the media
/// folder.
#[derive(Debug, Clone)]
pub struct LibraryMaster {
    pub data_object_count: u32,
    pub persistent_id: u64,
}

impl LibraryMaster {
    fn decode(frame: &Frame) -> Result<Self> {
        Ok(LibraryMaster {
            data_object_count: frame.u32_at(8).unwrap_or(0),
            persistent_id: frame
                .u64_at(58)
                .ok_or_else(|| Error::format("library master frame too short"))?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AlbumList {
    pub album_count: u32,
}

impl AlbumList {
    fn decode(frame: &Frame) -> Self {
        AlbumList {
            album_count: frame.u32_at(8).unwrap_or(0),
        }
    }
}

/// Album entry (`iama`), captured for its rating.
#[derive(Debug, Clone)]
pub struct Album {
    pub data_object_count: u32,
    pub persistent_id: u64,
    pub rating: u8,
}

impl Album {
    fn decode(frame: &Frame) -> Result<Self> {
        Ok(Album {
            data_object_count: frame.u32_at(12).unwrap_or(0),
            persistent_id: frame
                .u64_at(16)
                .ok_or_else(|| Error::format("album frame too short"))?,
            rating: frame.u8_at(42).unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArtistList {
    pub artist_count: u32,
}

impl ArtistList {
    fn decode(frame: &Frame) -> Self {
        ArtistList {
            artist_count: frame.u32_at(8).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Artist {
    pub data_object_count: u32,
    pub persistent_id: u64,
}

impl Artist {
    fn decode(frame: &Frame) -> Result<Self> {
        Ok(Artist {
            data_object_count: frame.u32_at(12).unwrap_or(0),
            persistent_id: frame
                .u64_at(16)
                .ok_or_else(|| Error::format("artist frame too short"))?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrackList {
    pub track_count: u32,
}

impl TrackList {
    fn decode(frame: &Frame) -> Self {
        TrackList {
            track_count: frame.u32_at(8).unwrap_or(0),
        }
    }
}

/// Track entry (`itma`); most attributes arrive in its data objects.
#[derive(Debug, Clone, Default)]
pub struct TrackObject {
    pub data_object_count: u32,
    pub persistent_id: u64,
    pub disabled: bool,
    pub love: bool,
    pub stars: u8,
    pub disc_number: u16,
    pub movement_count: u16,
    pub movement_number: u16,
    pub disc_count: u16,
    pub track_count: u16,
    pub track_number: u16,
    pub year: u16,
    pub album_id: u64,
    pub artist_id: u64,
}

impl TrackObject {
    fn decode(frame: &Frame) -> Result<Self> {
        let persistent_id = frame
            .u64_at(16)
            .ok_or_else(|| Error::format(format!("track frame too short: {} bytes", frame.data.len())))?;
        Ok(TrackObject {
            data_object_count: frame.u32_at(12).unwrap_or(0),
            persistent_id,
            disabled: frame.u16_at(42).unwrap_or(0) != 0,
            love: frame.u16_at(62).unwrap_or(0) != 0,
            stars: frame.u8_at(65).unwrap_or(0),
            disc_number: frame.u16_at(84).unwrap_or(0),
            movement_count: frame.u16_at(86).unwrap_or(0),
            movement_number: frame.u16_at(88).unwrap_or(0),
            disc_count: frame.u16_at(90).unwrap_or(0),
            track_count: frame.u16_at(116).unwrap_or(0),
            track_number: frame.u16_at(162).unwrap_or(0),
            year: frame.u16_at(170).unwrap_or(0),
            album_id: frame.u64_at(174).unwrap_or(0),
            artist_id: frame.u64_at(182).unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistList {
    pub playlist_count: u32,
}

impl PlaylistList {
    fn decode(frame: &Frame) -> Self {
        PlaylistList {
            playlist_count: frame.u32_at(8).unwrap_or(0),
        }
    }
}

/// Playlist entry (`lpma`).
#[derive(Debug, Clone, Default)]
pub struct PlaylistObject {
    pub data_object_count: u32,
    pub track_count: u32,
    pub date_added: MacTime,
    pub date_modified: MacTime,
    pub persistent_id: u64,
    pub parent_persistent_id: u64,
    pub folder: bool,
    pub distinguished_kind: u8,
}

impl PlaylistObject {
    fn decode(frame: &Frame) -> Result<Self> {
        let persistent_id = frame.u64_at(30).ok_or_else(|| {
            Error::format(format!("playlist frame too short: {} bytes", frame.data.len()))
        })?;
        Ok(PlaylistObject {
            data_object_count: frame.u32_at(12).unwrap_or(0),
            track_count: frame.u32_at(16).unwrap_or(0),
            date_added: MacTime(frame.u32_at(22).unwrap_or(0)),
            date_modified: MacTime(frame.u32_at(138).unwrap_or(0)),
            persistent_id,
            parent_persistent_id: frame.u64_at(50).unwrap_or(0),
            folder: frame.u8_at(49).unwrap_or(0) != 0,
            distinguished_kind: frame.u8_at(79).unwrap_or(0),
        })
    }
}
