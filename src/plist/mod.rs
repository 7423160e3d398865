//! Reader for the XML property-list dialect.
//!
//! One streaming pass over the document. Tracks live in a dict keyed by
//! their file-local decimal id under the top-level `Tracks` key;
//! playlists live in an array under `Playlists` and reference tracks by
//! that local id, resolved through the id → persistent-id map built
//! while the tracks section streams by. Every other top-level key sets a
//! library field by normalized name.

mod fields;

use crate::error::{Error, Result};
use crate::model::{Library, Pid, Playlist, Record, Track};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::BufRead;

/// Streaming loader for one XML catalog.
pub struct Loader {
    track_ids: HashMap<i64, Pid>,
}

/// Owned view of the XML events the parser cares about.
enum Node {
    Start(Vec<u8>),
    Empty(Vec<u8>),
    End(Vec<u8>),
    Eof,
}

fn xml_err(e: quick_xml::Error) -> Error {
    Error::format(format!("malformed catalog xml: {e}"))
}

fn next_node<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Node> {
    loop {
        buf.clear();
        let node = match reader.read_event_into(buf).map_err(xml_err)? {
            Event::Start(e) => Node::Start(e.name().as_ref().to_vec()),
            Event::Empty(e) => Node::Empty(e.name().as_ref().to_vec()),
            Event::End(e) => Node::End(e.name().as_ref().to_vec()),
            Event::Eof => Node::Eof,
            _ => continue,
        };
        return Ok(node);
    }
}

/// Collect the text inside the element just opened, consuming its end tag.
fn element_text<R: BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut buf = Vec::new();
    let mut out = String::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Text(t) => out.push_str(&t.unescape().unwrap_or_default()),
            Event::End(_) => return Ok(out),
            Event::Eof => return Err(Error::format("unexpected end of catalog xml")),
            _ => {}
        }
    }
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            track_ids: HashMap::new(),
        }
    }

    /// Parse `source` and push every record into `sink`, in file order.
    pub fn load<R, F>(&mut self, source: R, mut sink: F) -> Result<()>
    where
        R: BufRead,
        F: FnMut(Record) -> Result<()>,
    {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        let mut lib = Library::default();
        let mut lib_emitted = false;
        let mut key = String::new();
        loop {
            match next_node(&mut reader, &mut buf)? {
                Node::Start(tag) if tag == b"key" => key = element_text(&mut reader)?,
                Node::Start(tag) if tag == b"dict" && key == "Tracks" => {
                    if !lib_emitted {
                        sink(lib.clone().into())?;
                        lib_emitted = true;
                    }
                    self.parse_tracks(&mut reader, &mut buf, &mut sink)?;
                    key.clear();
                }
                Node::Start(tag) if tag == b"array" && key == "Playlists" => {
                    if !lib_emitted {
                        sink(lib.clone().into())?;
                        lib_emitted = true;
                    }
                    self.parse_playlists(&mut reader, &mut buf, &mut sink)?;
                    key.clear();
                }
                Node::Start(tag) if is_container(&tag) => {}
                Node::Start(tag) => {
                    let text = element_text(&mut reader)?;
                    fields::set_library_field(&mut lib, &key, &tag, &text);
                }
                Node::Empty(tag) => {
                    fields::set_library_field(&mut lib, &key, &tag, "");
                }
                Node::Eof => break,
                Node::End(_) => {}
            }
        }
        if !lib_emitted {
            sink(lib.into())?;
        }
        Ok(())
    }

    fn parse_tracks<R, F>(
        &mut self,
        reader: &mut Reader<R>,
        buf: &mut Vec<u8>,
        sink: &mut F,
    ) -> Result<()>
    where
        R: BufRead,
        F: FnMut(Record) -> Result<()>,
    {
        let mut local_id: Option<i64> = None;
        loop {
            match next_node(reader, buf)? {
                Node::Start(tag) if tag == b"key" => {
                    local_id = element_text(reader)?.trim().parse().ok();
                }
                Node::Start(tag) if tag == b"dict" => {
                    let mut track = parse_track_dict(reader, buf)?;
                    track.track_id = local_id.map(|v| v as u32);
                    if let Some(id) = local_id {
                        if !track.persistent_id.is_zero() {
                            self.track_ids.insert(id, track.persistent_id);
                        }
                    }
                    sink(track.into())?;
                }
                Node::End(tag) if tag == b"dict" => return Ok(()),
                Node::Eof => return Err(Error::format("unexpected end of tracks section")),
                _ => {}
            }
        }
    }

    fn parse_playlists<R, F>(
        &mut self,
        reader: &mut Reader<R>,
        buf: &mut Vec<u8>,
        sink: &mut F,
    ) -> Result<()>
    where
        R: BufRead,
        F: FnMut(Record) -> Result<()>,
    {
        loop {
            match next_node(reader, buf)? {
                Node::Start(tag) if tag == b"dict" => {
                    let mut pl = self.parse_playlist_dict(reader, buf)?;
                    if pl.is_folder() {
                        pl.smart_info = None;
                        pl.smart_criteria = None;
                        pl.track_ids.clear();
                    }
                    pl.resolve_smart();
                    sink(pl.into())?;
                }
                Node::End(tag) if tag == b"array" => return Ok(()),
                Node::Eof => return Err(Error::format("unexpected end of playlists section")),
                _ => {}
            }
        }
    }

    fn parse_playlist_dict<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        buf: &mut Vec<u8>,
    ) -> Result<Playlist> {
        let mut pl = Playlist::default();
        let mut key = String::new();
        loop {
            match next_node(reader, buf)? {
                Node::Start(tag) if tag == b"key" => key = element_text(reader)?,
                Node::Start(tag) if tag == b"array" && key == "Playlist Items" => {
                    self.parse_playlist_items(reader, buf, &mut pl)?;
                }
                Node::Start(tag) if is_container(&tag) => skip_element(reader, buf, &tag)?,
                Node::Start(tag) => {
                    let text = element_text(reader)?;
                    if key == "Genius Track ID" {
                        if let Ok(id) = text.trim().parse::<i64>() {
                            pl.genius_track_id = self.track_ids.get(&id).copied();
                        }
                    } else {
                        fields::set_playlist_field(&mut pl, &key, &tag, &text);
                    }
                }
                Node::Empty(tag) => {
                    fields::set_playlist_field(&mut pl, &key, &tag, "");
                }
                Node::End(tag) if tag == b"dict" => return Ok(pl),
                Node::Eof => return Err(Error::format("unexpected end of playlist dict")),
                _ => {}
            }
        }
    }

    fn parse_playlist_items<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        buf: &mut Vec<u8>,
        pl: &mut Playlist,
    ) -> Result<()> {
        let mut key = String::new();
        loop {
            match next_node(reader, buf)? {
                Node::Start(tag) if tag == b"key" => key = element_text(reader)?,
                Node::Start(tag) if tag == b"dict" => {}
                Node::Start(_) => {
                    let text = element_text(reader)?;
                    if key == "Track ID" {
                        if let Ok(id) = text.trim().parse::<i64>() {
                            if let Some(&pid) = self.track_ids.get(&id) {
                                pl.track_ids.push(pid);
                            } else {
                                log::debug!("playlist references unknown local track {id}");
                            }
                        }
                    }
                }
                Node::End(tag) if tag == b"array" => return Ok(()),
                Node::Eof => return Err(Error::format("unexpected end of playlist items")),
                _ => {}
            }
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_track_dict<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Track> {
    let mut track = Track::default();
    let mut key = String::new();
    loop {
        match next_node(reader, buf)? {
            Node::Start(tag) if tag == b"key" => key = element_text(reader)?,
            Node::Start(tag) if is_container(&tag) => skip_element(reader, buf, &tag)?,
            Node::Start(tag) => {
                let text = element_text(reader)?;
                fields::set_track_field(&mut track, &key, &tag, &text);
            }
            Node::Empty(tag) => {
                fields::set_track_field(&mut track, &key, &tag, "");
            }
            Node::End(tag) if tag == b"dict" => return Ok(track),
            Node::Eof => return Err(Error::format("unexpected end of track dict")),
            _ => {}
        }
    }
}

fn is_container(tag: &[u8]) -> bool {
    matches!(tag, b"dict" | b"array" | b"plist")
}

/// Consume a subtree whose start tag was already read.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>, tag: &[u8]) -> Result<()> {
    let mut depth = 1usize;
    loop {
        match next_node(reader, buf)? {
            Node::Start(t) if t == tag => depth += 1,
            Node::End(t) if t == tag => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Node::Eof => return Err(Error::format("unexpected end of catalog xml")),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>Major Version</key><integer>1</integer>
    <key>Application Version</key><string>12.9.5.5</string>
    <key>Library Persistent ID</key><string>00000000000000CC</string>
    <key>Music Folder</key><string>file:///Users/x/Music/</string>
    <key>Tracks</key>
    <dict>
        <key>1001</key>
        <dict>
            <key>Track ID</key><integer>1001</integer>
            <key>Name</key><string>First &amp; Last</string>
            <key>Artist</key><string>Band</string>
            <key>Total Time</key><integer>215000</integer>
            <key>Compilation</key><true/>
            <key>Date Added</key><date>2015-03-01T10:00:00Z</date>
            <key>Persistent ID</key><string>00000000000000AA</string>
        </dict>
        <key>1002</key>
        <dict>
            <key>Track ID</key><integer>1002</integer>
            <key>Name</key><string>Second</string>
            <key>Persistent ID</key><string>00000000000000BB</string>
        </dict>
    </dict>
    <key>Playlists</key>
    <array>
        <dict>
            <key>Name</key><string>Mix</string>
            <key>Playlist Persistent ID</key><string>00000000000000F0</string>
            <key>Playlist Items</key>
            <array>
                <dict><key>Track ID</key><integer>1001</integer></dict>
                <dict><key>Track ID</key><integer>9999</integer></dict>
                <dict><key>Track ID</key><integer>1002</integer></dict>
            </array>
        </dict>
    </array>
</dict>
</plist>
"#;

    fn collect(xml: &str) -> Vec<Record> {
        let mut out = Vec::new();
        Loader::new()
            .load(xml.as_bytes(), |r| {
                out.push(r);
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn library_comes_first_with_header_fields() {
        let records = collect(XML);
        let Record::Library(lib) = &records[0] else {
            panic!("expected library first");
        };
        assert_eq!(lib.major_version, Some(1));
        assert_eq!(lib.application_version.as_deref(), Some("12.9.5.5"));
        assert_eq!(lib.persistent_id, Some(Pid(0xCC)));
        assert_eq!(lib.music_folder.as_deref(), Some("file:///Users/x/Music/"));
    }

    #[test]
    fn tracks_project_values_and_entities_unescape() {
        let records = collect(XML);
        let Record::Track(t) = &records[1] else {
            panic!("expected track");
        };
        assert_eq!(t.track_id, Some(1001));
        assert_eq!(t.name.as_deref(), Some("First & Last"));
        assert_eq!(t.total_time, Some(215_000));
        assert_eq!(t.compilation, Some(true));
        assert_eq!(t.persistent_id, Pid(0xAA));
        assert!(t.date_added.is_some());
    }

    #[test]
    fn playlist_items_resolve_through_local_ids() {
        let records = collect(XML);
        let Record::Playlist(p) = records.last().unwrap() else {
            panic!("expected playlist last");
        };
        assert_eq!(p.name.as_deref(), Some("Mix"));
        assert_eq!(p.persistent_id, Pid(0xF0));
        // unknown local id 9999 dropped, order preserved
        assert_eq!(p.track_ids, vec![Pid(0xAA), Pid(0xBB)]);
    }

    #[test]
    fn record_order_is_library_tracks_playlists() {
        let records = collect(XML);
        let kinds: Vec<&str> = records.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec!["library", "track", "track", "playlist"]);
    }

    #[test]
    fn empty_document_still_emits_library() {
        let records = collect(r#"<plist version="1.0"><dict><key>Major Version</key><integer>1</integer></dict></plist>"#);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), "library");
    }
}
