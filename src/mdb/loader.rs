//! Record assembly for the "musicdb" dialect.
//!
//! The envelope is read from the raw stream and names the encrypted
//! prefix size; the inflated payload is then walked object by object.
//! Tracks carry most attributes in their data objects, playlist items
//! reference tracks by persistent id directly, and album entries are
//! captured only to attach their rating to matching tracks.

use super::boma::{BomaAttr, BomaBody, DataObject};
use super::frame::read_frame;
use super::object::{self, Envelope, Object, PlaylistObject, TrackObject};
use crate::error::{Error, Result};
use crate::model::{Library, Pid, Playlist, Record, Track};
use crate::payload::{CryptRegion, PayloadReader};
use std::collections::HashMap;
use std::io::Read;

/// Streaming loader for one catalog file.
pub struct Loader {
    offset: u64,
    album_ratings: HashMap<Pid, u8>,
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            offset: 0,
            album_ratings: HashMap::new(),
        }
    }

    /// Parse `source` and push every record into `sink`, in file order.
    pub fn load<R, F>(&mut self, mut source: R, mut sink: F) -> Result<()>
    where
        R: Read,
        F: FnMut(Record) -> Result<()>,
    {
        let (frame, n) = read_frame(&mut source, 0)?
            .ok_or_else(|| Error::format("catalog has no envelope"))?;
        self.offset += n;
        let env = match object::decode(&frame)? {
            Object::Envelope(env) => env,
            _ => return Err(Error::format("invalid library header")),
        };
        log::debug!(
            "musicdb version {}.{} ({}), crypt prefix {}",
            env.major_version,
            env.minor_version,
            env.application_version,
            env.max_crypt_size
        );
        sink(library_record(&env).into())?;

        let region = CryptRegion::Prefix(env.max_crypt_size as u64);
        let mut payload = PayloadReader::new(source, region)?;
        self.offset = 0;
        loop {
            let Some((frame, n)) = read_frame(&mut payload, self.offset)? else {
                return Ok(());
            };
            self.offset += n;
            match object::decode(&frame)? {
                Object::LibraryMaster(master) => {
                    let Some(lib) = self.assemble_master(master.data_object_count, &mut payload)?
                    else {
                        return Ok(());
                    };
                    sink(lib.into())?;
                }
                Object::Album(album) => {
                    self.album_ratings
                        .insert(Pid(album.persistent_id), album.rating);
                }
                Object::Track(t) => {
                    let Some(track) = self.assemble_track(t, &mut payload)? else {
                        return Ok(());
                    };
                    sink(track.into())?;
                }
                Object::Playlist(p) => {
                    let Some(playlist) = self.assemble_playlist(p, &mut payload)? else {
                        return Ok(());
                    };
                    sink(playlist.into())?;
                }
                Object::Unhandled(tag) => {
                    log::debug!("skipping unhandled {} object", String::from_utf8_lossy(&tag));
                }
                _ => {}
            }
        }
    }

    fn next_data_object(
        &mut self,
        payload: &mut impl Read,
        context: &str,
    ) -> Result<Option<DataObject>> {
        let Some((frame, n)) = read_frame(payload, self.offset)? else {
            log::warn!("stream ended inside {context}");
            return Ok(None);
        };
        self.offset += n;
        match object::decode(&frame)? {
            Object::DataObject(d) => Ok(Some(*d)),
            _ => Err(Error::format(format!(
                "expected a data object in {context}, got a {} frame",
                frame.tag_str()
            ))),
        }
    }

    fn assemble_master(
        &mut self,
        count: u32,
        payload: &mut impl Read,
    ) -> Result<Option<Library>> {
        let mut lib = Library::default();
        for _ in 0..count {
            let Some(dobj) = self.next_data_object(payload, "library master")? else {
                return Ok(None);
            };
            if dobj.attr == BomaAttr::MediaFolder {
                lib.music_folder = Some(dobj.wide_text());
            }
        }
        Ok(Some(lib))
    }

    fn assemble_track(
        &mut self,
        obj: TrackObject,
        payload: &mut impl Read,
    ) -> Result<Option<Track>> {
        let mut track = project_track(&obj);
        for _ in 0..obj.data_object_count {
            let Some(dobj) = self.next_data_object(payload, "track attributes")? else {
                return Ok(None);
            };
            apply_track_attr(&mut track, &dobj);
        }
        if let Some(&rating) = self.album_ratings.get(&Pid(obj.album_id)) {
            if rating != 0 {
                track.album_rating = Some(rating);
                track.album_rating_computed = Some(true);
            }
        }
        Ok(Some(track))
    }

    fn assemble_playlist(
        &mut self,
        obj: PlaylistObject,
        payload: &mut impl Read,
    ) -> Result<Option<Playlist>> {
        let mut pl = project_playlist(&obj);
        for _ in 0..obj.data_object_count {
            let Some(dobj) = self.next_data_object(payload, "playlist attributes")? else {
                return Ok(None);
            };
            match dobj.attr {
                BomaAttr::PlaylistName => pl.name = Some(dobj.wide_text()),
                BomaAttr::SmartCriteria => {
                    pl.smart_criteria = Some(dobj.raw.get(4..).unwrap_or(&[]).to_vec())
                }
                BomaAttr::SmartInfo => {
                    pl.smart_info = Some(dobj.raw.get(4..).unwrap_or(&[]).to_vec())
                }
                BomaAttr::GeniusInfo => {
                    if let BomaBody::GeniusInfo(info) = &dobj.body {
                        pl.genius_track_id = Pid(info.genius_track_id).nonzero();
                    }
                }
                BomaAttr::PlaylistItem => {
                    if let BomaBody::PlaylistItem(item) = &dobj.body {
                        pl.track_ids.push(Pid(item.track_id));
                    }
                }
                _ => {}
            }
        }

        if pl.is_folder() {
            pl.smart_info = None;
            pl.smart_criteria = None;
            pl.track_ids.clear();
        }
        pl.resolve_smart();
        Ok(Some(pl))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn library_record(env: &Envelope) -> Library {
    Library {
        major_version: Some(env.major_version as u32),
        minor_version: Some(env.minor_version as u32),
        application_version: Some(env.application_version.clone()),
        persistent_id: Pid(env.persistent_id).nonzero(),
        tracks: Some(env.item_count),
        playlists: Some(env.playlist_count),
        date: env.library_date.to_datetime(),
        ..Library::default()
    }
}

fn project_track(obj: &TrackObject) -> Track {
    let mut t = Track::new(Pid(obj.persistent_id));
    if obj.stars != 0 {
        t.rating = Some(obj.stars);
    }
    if obj.love {
        t.loved = Some(true);
    }
    if obj.disabled {
        t.disabled = Some(true);
    }
    if obj.movement_count != 0 {
        t.movement_count = Some(obj.movement_count as u32);
    }
    if obj.movement_number != 0 {
        t.movement_number = Some(obj.movement_number as u32);
    }
    if obj.track_count != 0 {
        t.track_count = Some(obj.track_count as u8);
    }
    if obj.track_number != 0 {
        t.track_number = Some(obj.track_number as u8);
    }
    if obj.disc_count != 0 {
        t.disc_count = Some(obj.disc_count as u8);
    }
    if obj.disc_number != 0 {
        t.disc_number = Some(obj.disc_number as u8);
    }
    if obj.year != 0 {
        t.year = Some(obj.year as u32);
    }
    t
}

fn apply_track_attr(track: &mut Track, dobj: &DataObject) {
    let text = || dobj.wide_text();
    match dobj.attr {
        BomaAttr::Title => track.name = Some(text()),
        BomaAttr::Artist => track.artist = Some(text()),
        BomaAttr::AlbumArtist => track.album_artist = Some(text()),
        BomaAttr::Composer => track.composer = Some(text()),
        BomaAttr::Album => track.album = Some(text()),
        BomaAttr::Genre => track.genre = Some(text()),
        BomaAttr::Grouping => track.grouping = Some(text()),
        BomaAttr::Kind => track.kind = Some(text()),
        BomaAttr::Comment => track.comments = Some(text()),
        BomaAttr::SortTitle => track.sort_name = Some(text()),
        BomaAttr::SortAlbum => track.sort_album = Some(text()),
        BomaAttr::SortArtist => track.sort_artist = Some(text()),
        BomaAttr::SortAlbumArtist => track.sort_album_artist = Some(text()),
        BomaAttr::SortComposer => track.sort_composer = Some(text()),
        BomaAttr::Work => track.work = Some(text()),
        BomaAttr::PurchaserEmail => track.purchased = Some(true),
        BomaAttr::Location => {
            let loc = text();
            track.track_type = Some(if loc.starts_with("file://") {
                "File".to_string()
            } else {
                "URL".to_string()
            });
            track.location = Some(loc);
        }
        BomaAttr::Numeric => {
            if let BomaBody::Numeric(v) = &dobj.body {
                track.file_type = Some(v.file_type);
                track.file_folder_count = Some(v.file_folder_count as i32);
                track.library_folder_count = Some(v.library_folder_count as i32);
                track.bit_rate = Some(v.bit_rate);
                track.sample_rate = Some(v.sample_rate);
                track.total_time = Some(v.duration);
                track.size = Some(v.file_size as u64);
                track.date_added = v.date_added.to_datetime();
                track.date_modified = v.date_modified.to_datetime();
                track.purchase_date = v.date_purchased.to_datetime();
                track.release_date = v.release_date.to_datetime();
                if v.normalization != 0 {
                    track.normalization = Some(v.normalization);
                }
            }
        }
        BomaAttr::Timestamps => {
            if let BomaBody::Timestamps(v) = &dobj.body {
                track.play_date = v.play_date.to_datetime();
                track.skip_date = v.skip_date.to_datetime();
                if v.play_count != 0 {
                    track.play_count = Some(v.play_count);
                }
                if v.skip_count != 0 {
                    track.skip_count = Some(v.skip_count);
                }
            }
        }
        BomaAttr::CopyrightHolder | BomaAttr::CopyrightInfo | BomaAttr::PurchaserName => {}
        BomaAttr::Unknown(code) => log::debug!("ignoring track data object type {code:#x}"),
        _ => {}
    }
}

fn project_playlist(obj: &PlaylistObject) -> Playlist {
    let mut pl = Playlist::new(Pid(obj.persistent_id));
    pl.all_items = Some(true);
    pl.visible = Some(true);
    pl.parent_persistent_id = Pid(obj.parent_persistent_id).nonzero();
    pl.date_added = obj.date_added.to_datetime();
    pl.date_modified = obj.date_modified.to_datetime();
    if obj.folder {
        pl.folder = Some(true);
    }
    pl.set_distinguished_kind(obj.distinguished_kind as u32);
    pl
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    // Synthetic catalogs: an envelope with crypt prefix zero followed by
    // a zlib-compressed object stream.

    fn envelope() -> Vec<u8> {
        let mut data = vec![0u8; 120];
        data[..4].copy_from_slice(b"hfma");
        data[4..8].copy_from_slice(&120u32.to_le_bytes());
        data[12..14].copy_from_slice(&1u16.to_le_bytes());
        data[16..21].copy_from_slice(b"1.1.5");
        data[48..56].copy_from_slice(&0x77u64.to_le_bytes());
        data[68..72].copy_from_slice(&2u32.to_le_bytes());
        data[72..76].copy_from_slice(&1u32.to_le_bytes());
        data
    }

    fn track_frame(pid: u64, attr_count: u32) -> Vec<u8> {
        let mut data = vec![0u8; 192];
        data[..4].copy_from_slice(b"itma");
        data[4..8].copy_from_slice(&192u32.to_le_bytes());
        data[12..16].copy_from_slice(&attr_count.to_le_bytes());
        data[16..24].copy_from_slice(&pid.to_le_bytes());
        data[65] = 60;
        data
    }

    fn album_frame(pid: u64, rating: u8) -> Vec<u8> {
        let mut data = vec![0u8; 48];
        data[..4].copy_from_slice(b"iama");
        data[4..8].copy_from_slice(&48u32.to_le_bytes());
        data[16..24].copy_from_slice(&pid.to_le_bytes());
        data[42] = rating;
        data
    }

    fn playlist_frame(pid: u64, attr_count: u32, folder: bool) -> Vec<u8> {
        let mut data = vec![0u8; 142];
        data[..4].copy_from_slice(b"lpma");
        data[4..8].copy_from_slice(&142u32.to_le_bytes());
        data[12..16].copy_from_slice(&attr_count.to_le_bytes());
        data[30..38].copy_from_slice(&pid.to_le_bytes());
        data[49] = folder as u8;
        data
    }

    fn boma_frame(subtype: u32, body: &[u8]) -> Vec<u8> {
        let size = (16 + body.len()) as u32;
        let mut data = Vec::new();
        data.extend_from_slice(b"boma");
        data.extend_from_slice(&20u32.to_le_bytes());
        data.extend_from_slice(&size.to_le_bytes());
        data.extend_from_slice(&subtype.to_le_bytes());
        data.extend_from_slice(body);
        data
    }

    fn wide_boma(subtype: u32, s: &str) -> Vec<u8> {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        body.extend_from_slice(&[0u8; 8]);
        body.extend_from_slice(&bytes);
        boma_frame(subtype, &body)
    }

    fn item_boma(track_pid: u64) -> Vec<u8> {
        let mut body = vec![0u8; 56];
        body[24..32].copy_from_slice(&track_pid.to_le_bytes());
        boma_frame(0xCE, &body)
    }

    fn catalog(frames: &[Vec<u8>]) -> Vec<u8> {
        let mut stream = Vec::new();
        for f in frames {
            stream.extend_from_slice(f);
        }
        let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&stream).unwrap();
        let mut out = envelope();
        out.extend(enc.finish().unwrap());
        out
    }

    fn collect(catalog: &[u8]) -> Vec<Record> {
        let mut out = Vec::new();
        Loader::new()
            .load(catalog, |r| {
                out.push(r);
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn envelope_projects_counts() {
        let records = collect(&catalog(&[]));
        assert_eq!(records.len(), 1);
        let Record::Library(lib) = &records[0] else {
            panic!("expected library");
        };
        assert_eq!(lib.tracks, Some(2));
        assert_eq!(lib.playlists, Some(1));
        assert_eq!(lib.application_version.as_deref(), Some("1.1.5"));
    }

    #[test]
    fn track_attributes_project() {
        let records = collect(&catalog(&[
            track_frame(0xAA, 2),
            wide_boma(0x02, "Song"),
            wide_boma(0x04, "Band"),
        ]));
        let Record::Track(t) = &records[1] else {
            panic!("expected track");
        };
        assert_eq!(t.persistent_id, Pid(0xAA));
        assert_eq!(t.name.as_deref(), Some("Song"));
        assert_eq!(t.artist.as_deref(), Some("Band"));
        assert_eq!(t.rating, Some(60));
    }

    #[test]
    fn album_rating_attaches_as_computed() {
        let mut track = track_frame(0xAA, 0);
        track[174..182].copy_from_slice(&0xA1u64.to_le_bytes());
        let records = collect(&catalog(&[album_frame(0xA1, 80), track]));
        let Record::Track(t) = &records[1] else {
            panic!("expected track");
        };
        assert_eq!(t.album_rating, Some(80));
        assert_eq!(t.album_rating_computed, Some(true));
    }

    #[test]
    fn playlist_items_carry_pids_directly() {
        let records = collect(&catalog(&[
            playlist_frame(0xF1, 3, false),
            wide_boma(0xC8, "Mix"),
            item_boma(0x0A),
            item_boma(0x0B),
        ]));
        let Record::Playlist(p) = &records[1] else {
            panic!("expected playlist");
        };
        assert_eq!(p.name.as_deref(), Some("Mix"));
        assert_eq!(p.track_ids, vec![Pid(0x0A), Pid(0x0B)]);
    }

    #[test]
    fn folders_clear_members_and_smart_blobs() {
        let records = collect(&catalog(&[
            playlist_frame(0xF1, 2, true),
            boma_frame(0xCA, &[0u8; 8]),
            item_boma(0x0A),
        ]));
        let Record::Playlist(p) = &records[1] else {
            panic!("expected playlist");
        };
        assert!(p.is_folder());
        assert!(p.track_ids.is_empty());
        assert!(p.smart_criteria.is_none());
    }

    #[test]
    fn zero_rule_smart_playlist_becomes_genius() {
        // SLst container with zero rules, prefixed by the four bytes the
        // loader strips from the raw blob.
        let mut crit = vec![0u8; 4];
        crit.extend_from_slice(b"SLst");
        crit.extend_from_slice(&0x0001_0001u32.to_be_bytes());
        crit.extend_from_slice(&0u32.to_be_bytes());
        crit.push(0);
        crit.resize(4 + 160, 0);
        let info = vec![0u8; 20];

        let records = collect(&catalog(&[
            playlist_frame(0xF1, 3, false),
            boma_frame(0xC9, &info),
            boma_frame(0xCA, &crit),
            item_boma(0x0A),
        ]));
        let Record::Playlist(p) = &records[1] else {
            panic!("expected playlist");
        };
        assert_eq!(p.genius_track_id, Some(Pid(0x0A)));
        assert!(p.smart.is_none());
        assert!(p.smart_info.is_none());
        assert!(p.smart_criteria.is_none());
    }

    #[test]
    fn media_folder_arrives_on_second_library_record() {
        let mut master = vec![0u8; 96];
        master[..4].copy_from_slice(b"plma");
        master[4..8].copy_from_slice(&96u32.to_le_bytes());
        master[8..12].copy_from_slice(&1u32.to_le_bytes());
        master[58..66].copy_from_slice(&0x77u64.to_le_bytes());
        let records = collect(&catalog(&[master, wide_boma(0x1F8, "file:///Music/")]));
        assert_eq!(records.len(), 2);
        let Record::Library(lib) = &records[1] else {
            panic!("expected library");
        };
        assert_eq!(lib.music_folder.as_deref(), Some("file:///Music/"));
    }
}
