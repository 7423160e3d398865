//! Data-object (`hohm`) bodies.
//!
//! A data object attaches one named attribute to the object that
//! precedes it. Its 40-byte header declares a type id, a flag word and a
//! body size; how the body decodes depends on both.

use crate::frame::Frame;
use crate::text;

/// Header size of a data object; the body starts right after.
const HEADER_LEN: usize = 40;

/// Flag bit: the body is UTF-16.
const FLAG_UTF16: u32 = 0x1;
/// Flag bit: the body is ISO-8859-1.
const FLAG_LATIN1: u32 = 0x2;
/// Flag bit: the object carries no decodable body.
const FLAG_NO_DATA: u32 = 0x100;

/// Attribute named by a data object's type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Title,
    Album,
    Artist,
    Genre,
    Kind,
    Comment,
    Location,
    Composer,
    Grouping,
    AlbumArtist,
    SortTitle,
    SortAlbum,
    SortArtist,
    SortAlbumArtist,
    SortComposer,
    CopyrightHolder,
    CopyrightInfo,
    PurchaserEmail,
    PurchaserName,
    Work,
    PlaylistName,
    SmartCriteria,
    SmartInfo,
    Unknown(u32),
}

impl Attr {
    pub fn from_type_id(id: u32) -> Self {
        use Attr::*;
        match id {
            1 => Title,
            2 => Album,
            3 => Artist,
            4 => Genre,
            5 => Kind,
            7 => Comment,
            11 => Location,
            12 => Composer,
            14 => Grouping,
            0x1B => AlbumArtist,
            0x1E => SortTitle,
            0x1F => SortAlbum,
            0x20 => SortArtist,
            0x21 => SortAlbumArtist,
            0x22 => SortComposer,
            0x2B => CopyrightHolder,
            0x2E => CopyrightInfo,
            0x3B => PurchaserEmail,
            0x3C => PurchaserName,
            0x3F => Work,
            100 => PlaylistName,
            101 => SmartCriteria,
            102 => SmartInfo,
            other => Unknown(other),
        }
    }
}

/// A decoded data object.
#[derive(Debug, Clone)]
pub struct DataObject {
    pub type_id: u32,
    pub attr: Attr,
    /// Raw body bytes (empty for metadata-only objects).
    pub raw: Vec<u8>,
    /// Body decoded to text, when the type id or flags name an encoding.
    pub text: Option<String>,
}

impl DataObject {
    /// Decode a `hohm` frame.
    pub fn decode(frame: &Frame) -> Self {
        let type_id = frame.u32_at(12).unwrap_or(0);
        let attr = Attr::from_type_id(type_id);
        let flags = frame.u32_at(24).unwrap_or(0);
        let data_size = frame.u32_at(28).unwrap_or(0);

        // Oversize declarations and flagged metadata objects carry no body.
        if flags & FLAG_NO_DATA != 0 || data_size > frame.size {
            return DataObject {
                type_id,
                attr,
                raw: Vec::new(),
                text: None,
            };
        }

        let want = data_size as usize;
        let body = frame.tail(HEADER_LEN);
        let body = if body.len() < want {
            log::debug!(
                "data object {type_id} short read: {} of {want} bytes",
                body.len()
            );
            body
        } else {
            &body[..want]
        };

        let text = match type_id {
            500 | 504 | 505 | 506 | 508 => Some(text::utf16_be(body)),
            11 => Some(String::from_utf8_lossy(body).into_owned()),
            303 => Some(text::swapped_ascii(body)),
            _ if flags & FLAG_LATIN1 != 0 => Some(text::latin1(body)),
            _ if flags & FLAG_UTF16 != 0 => Some(text::utf16_be(body)),
            _ => None,
        };

        DataObject {
            type_id,
            attr,
            raw: body.to_vec(),
            text,
        }
    }

    /// Body text, or the empty string.
    pub fn text_or_empty(&self) -> String {
        self.text.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ByteOrder;

    pub fn hohm_frame(type_id: u32, flags: u32, body: &[u8]) -> Frame {
        let size = (HEADER_LEN + body.len()) as u32;
        let mut data = Vec::new();
        data.extend_from_slice(b"hohm");
        data.extend_from_slice(&(HEADER_LEN as u32).to_be_bytes()); // preface
        data.extend_from_slice(&size.to_be_bytes());
        data.extend_from_slice(&type_id.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&flags.to_be_bytes());
        data.extend_from_slice(&(body.len() as u32).to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(body);
        Frame {
            tag: *b"hohm",
            order: ByteOrder::Big,
            size,
            offset: 0,
            data,
        }
    }

    #[test]
    fn title_with_utf16_flag_decodes() {
        let dobj = DataObject::decode(&hohm_frame(1, FLAG_UTF16, &[0x00, 0x41, 0x00, 0x42]));
        assert_eq!(dobj.attr, Attr::Title);
        assert_eq!(dobj.text.as_deref(), Some("AB"));
    }

    #[test]
    fn utf16_type_ids_ignore_flags() {
        for id in [500u32, 504, 505, 506, 508] {
            let dobj = DataObject::decode(&hohm_frame(id, 0, &[0x00, 0x58]));
            assert_eq!(dobj.text.as_deref(), Some("X"), "type id {id}");
        }
    }

    #[test]
    fn type_11_is_raw_utf8() {
        let dobj = DataObject::decode(&hohm_frame(11, 0, b"file://x/y.mp3"));
        assert_eq!(dobj.attr, Attr::Location);
        assert_eq!(dobj.text.as_deref(), Some("file://x/y.mp3"));
    }

    #[test]
    fn type_303_swaps_pairs() {
        let dobj = DataObject::decode(&hohm_frame(303, 0, b"bact"));
        assert_eq!(dobj.text.as_deref(), Some("abtc"));
    }

    #[test]
    fn latin1_flag_decodes() {
        let dobj = DataObject::decode(&hohm_frame(7, FLAG_LATIN1, &[0x63, 0x61, 0x66, 0xE9]));
        assert_eq!(dobj.text.as_deref(), Some("caf\u{e9}"));
    }

    #[test]
    fn no_data_flag_skips_body() {
        let dobj = DataObject::decode(&hohm_frame(1, FLAG_NO_DATA | FLAG_UTF16, &[0x00, 0x41]));
        assert!(dobj.text.is_none());
        assert!(dobj.raw.is_empty());
    }

    #[test]
    fn oversize_declaration_skips_body() {
        let mut f = hohm_frame(1, FLAG_UTF16, &[0x00, 0x41]);
        // corrupt the declared body size beyond the frame size
        f.data[28..32].copy_from_slice(&10_000u32.to_be_bytes());
        let dobj = DataObject::decode(&f);
        assert!(dobj.text.is_none());
    }

    #[test]
    fn short_body_truncates_without_error() {
        let mut f = hohm_frame(1, FLAG_UTF16, &[0x00, 0x41, 0x00, 0x42]);
        // stream ended mid-body: two of the declared four bytes arrived
        f.data.truncate(42);
        let dobj = DataObject::decode(&f);
        assert_eq!(dobj.raw.len(), 2);
        assert_eq!(dobj.text.as_deref(), Some("A"));
    }

    #[test]
    fn unknown_ids_map_to_unknown() {
        assert_eq!(Attr::from_type_id(9999), Attr::Unknown(9999));
        assert_eq!(Attr::from_type_id(101), Attr::SmartCriteria);
    }
}
