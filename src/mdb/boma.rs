//! Data-object (`boma`) bodies for the "musicdb" dialect.
//!
//! A sub-type code names the attribute and picks one of a handful of
//! body layouts. Unknown codes keep their payload as raw 32-bit words,
//! which is also the shape of the smart-playlist blobs.

use crate::frame::Frame;
use crate::model::MacTime;
use crate::text;

/// Header size of a data object; the body starts right after.
const HEADER_LEN: usize = 16;

/// Attribute named by a sub-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomaAttr {
    Numeric,
    Title,
    Album,
    Artist,
    Genre,
    Kind,
    Comment,
    Location,
    Composer,
    Grouping,
    YearSequence,
    AlbumArtist,
    SortTitle,
    SortAlbum,
    SortArtist,
    SortAlbumArtist,
    SortComposer,
    CopyrightHolder,
    CopyrightInfo,
    Flavor,
    PurchaserEmail,
    PurchaserName,
    Work,
    Movement,
    PlaylistName,
    MediaFolder,
    ApplicationTitle,
    ApplicationArtist,
    AlbumListAlbum,
    AlbumListAlbumArtist,
    AlbumListArtist,
    ArtistListName,
    ArtistListSortName,
    Timestamps,
    GeniusInfo,
    ArtworkUrl,
    PlaylistItem,
    VideoInfo,
    SmartInfo,
    SmartCriteria,
    Book,
    Xml,
    Unknown(u32),
}

impl BomaAttr {
    pub fn from_code(code: u32) -> Self {
        use BomaAttr::*;
        match code {
            0x01 => Numeric,
            0x02 => Title,
            0x03 => Album,
            0x04 => Artist,
            0x05 => Genre,
            0x06 => Kind,
            0x08 => Comment,
            0x0B => Location,
            0x0C => Composer,
            0x0E => Grouping,
            0x12 => YearSequence,
            0x1B => AlbumArtist,
            0x1E => SortTitle,
            0x1F => SortAlbum,
            0x20 => SortArtist,
            0x21 => SortAlbumArtist,
            0x22 => SortComposer,
            0x2B => CopyrightHolder,
            0x2E => CopyrightInfo,
            0x34 => Flavor,
            0x3B => PurchaserEmail,
            0x3C => PurchaserName,
            0x3F => Work,
            0x40 => Movement,
            0xC8 => PlaylistName,
            0x1F8 => MediaFolder,
            0x2BE => ApplicationTitle,
            0x2BF => ApplicationArtist,
            0x12C => AlbumListAlbum,
            0x12D => AlbumListAlbumArtist,
            0x12E => AlbumListArtist,
            0x190 => ArtistListName,
            0x191 => ArtistListSortName,
            0x17 => Timestamps,
            0xCB => GeniusInfo,
            0x192 => ArtworkUrl,
            0xCE => PlaylistItem,
            0x24 => VideoInfo,
            0xC9 => SmartInfo,
            0xCA => SmartCriteria,
            0x42 | 0x1FC | 0x1FD | 0x200 => Book,
            0x36 | 0x38 | 0x1D | 0xCD | 0x2BC | 0x3CC => Xml,
            other => Unknown(other),
        }
    }
}

/// Body layout of a sub-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomaKind {
    Numeric,
    WideString,
    ShortXml,
    LongXml,
    Book,
    PlaylistItem,
    VideoInfo,
    Timestamps,
    GeniusInfo,
    Unknown,
}

pub fn body_kind(code: u32) -> BomaKind {
    match code {
        0x01 => BomaKind::Numeric,
        0x17 => BomaKind::Timestamps,
        0xCB => BomaKind::GeniusInfo,
        0x36 | 0x38 | 0x192 => BomaKind::ShortXml,
        0x1D | 0xCD | 0x2BC | 0x3CC => BomaKind::LongXml,
        0x42 | 0x1FC | 0x1FD | 0x200 => BomaKind::Book,
        0xCE => BomaKind::PlaylistItem,
        0x24 => BomaKind::VideoInfo,
        0x02 | 0x03 | 0x04 | 0x05 | 0x06 | 0x07 | 0x08 | 0x0B | 0x0C | 0x0E | 0x12 | 0x1B
        | 0x1E | 0x1F | 0x20 | 0x21 | 0x22 | 0x2B | 0x2E | 0x34 | 0x3B | 0x3C | 0x3F | 0x40
        | 0xC8 | 0x12C | 0x12D | 0x12E | 0x190 | 0x191 | 0x1F3 | 0x1F8 | 0x2BE | 0x2BF => {
            BomaKind::WideString
        }
        _ => BomaKind::Unknown,
    }
}

fn le_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
}

fn le_i16(data: &[u8], at: usize) -> Option<i16> {
    data.get(at..at + 2)
        .map(|b| i16::from_le_bytes(b.try_into().unwrap()))
}

fn le_u64(data: &[u8], at: usize) -> Option<u64> {
    data.get(at..at + 8)
        .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
}

fn le_f32(data: &[u8], at: usize) -> Option<f32> {
    le_u32(data, at).map(f32::from_bits)
}

fn mac_time(data: &[u8], at: usize) -> MacTime {
    MacTime(le_u32(data, at).unwrap_or(0))
}

/// The ~60-word numeric attribute block of a track.
#[derive(Debug, Clone, Default)]
pub struct NumericData {
    pub sample_rate: u32,
    pub file_type: u32,
    pub file_folder_count: i16,
    pub library_folder_count: i16,
    pub bit_rate: u32,
    pub date_added: MacTime,
    pub date_modified: MacTime,
    pub normalization: u32,
    pub date_purchased: MacTime,
    pub release_date: MacTime,
    pub duration: u32,
    pub file_size: u32,
}

impl NumericData {
    fn decode(body: &[u8]) -> Self {
        NumericData {
            sample_rate: le_f32(body, 64).unwrap_or(0.0) as u32,
            file_type: le_u32(body, 72).unwrap_or(0),
            file_folder_count: le_i16(body, 76).unwrap_or(0),
            library_folder_count: le_i16(body, 78).unwrap_or(0),
            bit_rate: le_u32(body, 92).unwrap_or(0),
            date_added: mac_time(body, 96),
            date_modified: mac_time(body, 132),
            normalization: le_u32(body, 136).unwrap_or(0),
            date_purchased: mac_time(body, 140),
            release_date: mac_time(body, 144),
            duration: le_u32(body, 160).unwrap_or(0),
            file_size: le_u32(body, 300).unwrap_or(0),
        }
    }
}

/// Length-prefixed string body with a character-type discriminator.
#[derive(Debug, Clone, Default)]
pub struct WideString {
    pub char_type: u32,
    pub text: String,
    /// Bytes kept verbatim when the character type is unknown.
    pub raw: Vec<u8>,
}

impl WideString {
    fn decode(body: &[u8]) -> Self {
        let char_type = le_u32(body, 4).unwrap_or(0);
        let len = le_u32(body, 8).unwrap_or(0) as usize;
        let avail = body.len().saturating_sub(20);
        if len > avail {
            log::debug!("wide string short read: {avail} of {len} bytes");
        }
        let bytes = &body[body.len().min(20)..body.len().min(20usize.saturating_add(len))];
        match char_type {
            1 => WideString {
                char_type,
                text: text::utf16_le(bytes),
                raw: Vec::new(),
            },
            2 => WideString {
                char_type,
                text: String::from_utf8_lossy(bytes).into_owned(),
                raw: Vec::new(),
            },
            _ => WideString {
                char_type,
                text: String::new(),
                raw: bytes.to_vec(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimestampsData {
    pub play_date: MacTime,
    pub play_count: u32,
    pub skip_date: MacTime,
    pub skip_count: u32,
}

impl TimestampsData {
    fn decode(body: &[u8]) -> Self {
        TimestampsData {
            play_date: mac_time(body, 12),
            play_count: le_u32(body, 16).unwrap_or(0),
            skip_date: mac_time(body, 32),
            skip_count: le_u32(body, 36).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeniusInfoData {
    pub genius_track_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistItemData {
    pub track_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct VideoInfoData {
    pub height: u32,
    pub width: u32,
    pub frame_rate: u32,
}

/// Bookmark-style body: a signature and length-prefixed padded strings
/// separated by sentinel flag words.
#[derive(Debug, Clone, Default)]
pub struct BookData {
    pub signature: String,
    pub strings: Vec<String>,
}

impl BookData {
    fn decode(body: &[u8]) -> Self {
        let signature = body
            .get(4..8)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        let mut strings = Vec::new();
        let mut at = 56usize;
        let mut size = 0u32;
        while let Some(flag) = le_u32(body, at) {
            at += 4;
            if matches!(flag, 0x101 | 0x201 | 0x901) {
                let len = size as usize;
                let Some(bytes) = body.get(at..at + len) else {
                    break;
                };
                strings.push(String::from_utf8_lossy(bytes).into_owned());
                at += len;
                if len % 4 != 0 {
                    at += 4 - len % 4;
                }
            }
            size = flag;
        }
        BookData { signature, strings }
    }
}

/// Decoded body of a data object.
#[derive(Debug, Clone)]
pub enum BomaBody {
    Numeric(NumericData),
    WideString(WideString),
    ShortXml(String),
    LongXml(String),
    Book(BookData),
    PlaylistItem(PlaylistItemData),
    VideoInfo(VideoInfoData),
    Timestamps(TimestampsData),
    GeniusInfo(GeniusInfoData),
    /// Unknown layout kept as raw 32-bit words.
    Words(Vec<u32>),
}

/// A decoded `boma` frame.
#[derive(Debug, Clone)]
pub struct DataObject {
    pub subtype: u32,
    pub attr: BomaAttr,
    pub body: BomaBody,
    /// Body bytes verbatim (the smart blobs travel here).
    pub raw: Vec<u8>,
}

impl DataObject {
    pub fn decode(frame: &Frame) -> Self {
        let subtype = frame.u32_at(12).unwrap_or(0);
        let attr = BomaAttr::from_code(subtype);
        let body = frame.tail(HEADER_LEN);
        let decoded = match body_kind(subtype) {
            BomaKind::Numeric => BomaBody::Numeric(NumericData::decode(body)),
            BomaKind::WideString => BomaBody::WideString(WideString::decode(body)),
            BomaKind::ShortXml => BomaBody::ShortXml(
                String::from_utf8_lossy(body.get(4..).unwrap_or(&[])).into_owned(),
            ),
            BomaKind::LongXml => BomaBody::LongXml(
                String::from_utf8_lossy(body.get(4..).unwrap_or(&[])).into_owned(),
            ),
            BomaKind::Book => BomaBody::Book(BookData::decode(body)),
            BomaKind::PlaylistItem => BomaBody::PlaylistItem(PlaylistItemData {
                track_id: le_u64(body, 24).unwrap_or(0),
            }),
            BomaKind::VideoInfo => BomaBody::VideoInfo(VideoInfoData {
                height: le_u32(body, 4).unwrap_or(0),
                width: le_u32(body, 8).unwrap_or(0),
                frame_rate: le_u32(body, 52).unwrap_or(0),
            }),
            BomaKind::Timestamps => BomaBody::Timestamps(TimestampsData::decode(body)),
            BomaKind::GeniusInfo => BomaBody::GeniusInfo(GeniusInfoData {
                genius_track_id: le_u64(body, 4).unwrap_or(0),
            }),
            BomaKind::Unknown => BomaBody::Words(
                body.chunks_exact(4)
                    .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
        };
        DataObject {
            subtype,
            attr,
            body: decoded,
            raw: body.to_vec(),
        }
    }

    /// Wide-string text, or the empty string for any other body.
    pub fn wide_text(&self) -> String {
        match &self.body {
            BomaBody::WideString(w) => w.text.clone(),
            _ => String::new(),
        }
    }
}
