//! Record assembly for the "itl" dialect.
//!
//! The loader reads the envelope from the raw stream, sets up payload
//! decryption from its version, and then walks the plaintext object
//! stream: each track or playlist object is followed by the data-object
//! frames that carry its attributes, and playlists additionally by their
//! member items.

use super::data::{Attr, DataObject};
use super::frame::read_frame;
use super::object::{self, Envelope, Object, PlaylistObject, TrackObject};
use crate::error::{Error, Result};
use crate::model::{Library, Pid, Playlist, Record, Track};
use crate::payload::{CryptRegion, PayloadReader, DEFAULT_CRYPT_SIZE};
use std::collections::HashMap;
use std::io::Read;

/// Streaming loader for one catalog file.
pub struct Loader {
    offset: u64,
    track_ids: HashMap<u32, Pid>,
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            offset: 0,
            track_ids: HashMap::new(),
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
            _ => return Err(Error::format("invalid catalog header")),
        };
        let region = crypt_region(&env)?;
        log::debug!(
            "catalog version {}.{} ({}), crypt region {:?}",
            env.major_version,
            env.minor_version,
            env.application_version,
            region
        );
        sink(library_record(&env).into())?;

        let mut payload = PayloadReader::new(source, region)?;
        self.offset = 0;
        loop {
            let Some((frame, n)) = read_frame(&mut payload, self.offset)? else {
                return Ok(());
            };
            self.offset += n;
            match object::decode(&frame)? {
                Object::Track(t) => {
                    let Some(track) = self.assemble_track(t, &mut payload)? else {
                        return Ok(());
                    };
                    if let Some(id) = track.track_id {
                        self.track_ids.insert(id, track.persistent_id);
                    }
                    sink(track.into())?;
                }
                Object::Playlist(p) => {
                    let Some(playlist) = self.assemble_playlist(p, &mut payload)? else {
                        return Ok(());
                    };
                    sink(playlist.into())?;
                }
                Object::Envelope(env) => sink(library_record(&env).into())?,
                Object::Unhandled(tag) => {
                    log::debug!("skipping unhandled {} object", String::from_utf8_lossy(&tag));
                }
                // Lists, counters, albums, artists and query objects frame
                // the stream but carry nothing the records need.
                _ => {}
            }
        }
    }

    /// Read the `N` attribute frames following a track object.
    ///
    /// `None` means the stream ended mid-record; the partial track is
    /// dropped and the load finishes cleanly.
    fn assemble_track(
        &mut self,
        obj: TrackObject,
        payload: &mut impl Read,
    ) -> Result<Option<Track>> {
        let mut track = project_track(&obj);
        for _ in 0..obj.record_count {
            let Some((frame, n)) = read_frame(payload, self.offset)? else {
                log::warn!("stream ended inside track {} attributes", track.persistent_id);
                return Ok(None);
            };
            self.offset += n;
            let dobj = expect_data_object(&frame)?;
            apply_track_attr(&mut track, &dobj);
        }
        Ok(Some(track))
    }

    fn assemble_playlist(
        &mut self,
        obj: PlaylistObject,
        payload: &mut impl Read,
    ) -> Result<Option<Playlist>> {
        let mut pl = project_playlist(&obj);
        for _ in 0..obj.record_count {
            let Some((frame, n)) = read_frame(payload, self.offset)? else {
                log::warn!("stream ended inside playlist {} attributes", pl.persistent_id);
                return Ok(None);
            };
            self.offset += n;
            let dobj = expect_data_object(&frame)?;
            match dobj.attr {
                Attr::PlaylistName => pl.name = Some(dobj.text_or_empty()),
                Attr::SmartCriteria => pl.smart_criteria = Some(dobj.raw.clone()),
                Attr::SmartInfo => pl.smart_info = Some(dobj.raw.clone()),
                _ => {}
            }
        }

        // Member items follow; anything that is not a playlist item is
        // skipped without counting against the declared total.
        let mut seen = 0u32;
        while seen < obj.track_count {
            let Some((frame, n)) = read_frame(payload, self.offset)? else {
                log::warn!("stream ended inside playlist {} items", pl.persistent_id);
                return Ok(None);
            };
            self.offset += n;
            if let Object::PlaylistItem(item) = object::decode(&frame)? {
                if let Some(pid) = self.track_ids.get(&item.track_id) {
                    pl.track_ids.push(*pid);
                } else {
                    log::debug!(
                        "playlist {} references unknown local track {}",
                        pl.persistent_id,
                        item.track_id
                    );
                }
                seen += 1;
            }
        }
        Ok(Some(pl))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn expect_data_object(frame: &crate::frame::Frame) -> Result<DataObject> {
    match object::decode(frame)? {
        Object::DataObject(d) => Ok(d),
        _ => Err(Error::format(format!(
            "expected a data object, got a {} frame",
            frame.tag_str()
        ))),
    }
}

/// Encryption region for an envelope's format revision.
fn crypt_region(env: &Envelope) -> Result<CryptRegion> {
    let mut region = match (env.major_version, env.minor_version) {
        (1, 0) => CryptRegion::None,
        (1, 1) => CryptRegion::All,
        (2, _) => CryptRegion::Prefix(DEFAULT_CRYPT_SIZE),
        (major, minor) => {
            return Err(Error::format(format!(
                "unknown catalog version {major}.{minor}"
            )))
        }
    };
    if env.max_crypt_size != 0 {
        region = CryptRegion::Prefix(env.max_crypt_size as u64);
    }
    Ok(region)
}

fn library_record(env: &Envelope) -> Library {
    Library {
        major_version: Some(env.major_version as u32),
        minor_version: Some(env.minor_version as u32),
        application_version: Some(env.application_version.clone()),
        persistent_id: Pid(env.persistent_id).nonzero(),
        ..Library::default()
    }
}

fn project_track(obj: &TrackObject) -> Track {
    let mut t = Track::new(Pid(obj.persistent_id));
    t.track_id = Some(obj.track_id);
    t.size = Some(obj.file_size as u64);
    t.total_time = Some(obj.total_time);
    t.bit_rate = Some(obj.bit_rate as u32);
    t.sample_rate = Some(obj.sample_rate as u32);
    t.date_modified = obj.date_modified.to_datetime();
    t.date_added = obj.date_added.to_datetime();
    if obj.track_number != 0 {
        t.track_number = Some(obj.track_number as u8);
    }
    if obj.track_count != 0 {
        t.track_count = Some(obj.track_count as u8);
    }
    if obj.year != 0 {
        t.year = Some(obj.year as u32);
    }
    if obj.volume_adjustment != 0 {
        t.volume_adjustment = Some(obj.volume_adjustment);
    }
    if obj.start_time != 0 {
        t.start_time = Some(obj.start_time);
    }
    if obj.stop_time != 0 {
        t.stop_time = Some(obj.stop_time);
    }
    if obj.play_count != 0 {
        t.play_count = Some(obj.play_count);
    }
    if obj.compilation {
        t.compilation = Some(true);
    }
    if obj.disabled {
        t.disabled = Some(true);
    }
    if obj.disc_number != 0 {
        t.disc_number = Some(obj.disc_number as u8);
    }
    if obj.disc_count != 0 {
        t.disc_count = Some(obj.disc_count as u8);
    }
    if obj.rating != 0 {
        t.rating = Some(obj.rating);
    }
    if obj.bpm != 0 {
        t.bpm = Some(obj.bpm as u16);
    }
    if obj.skip_count != 0 {
        t.skip_count = Some(obj.skip_count);
    }
    t.play_date = obj.play_date.to_datetime();
    t.purchase_date = obj.purchase_date.to_datetime();
    t.release_date = obj.release_date.to_datetime();
    t.skip_date = obj.skip_date.to_datetime();
    t.backup_date = obj.backup_date.to_datetime();
    t
}

fn apply_track_attr(track: &mut Track, dobj: &DataObject) {
    let text = || dobj.text_or_empty();
    match dobj.attr {
        Attr::Title => track.name = Some(text()),
        Attr::Artist => track.artist = Some(text()),
        Attr::AlbumArtist => track.album_artist = Some(text()),
        Attr::Composer => track.composer = Some(text()),
        Attr::Album => track.album = Some(text()),
        Attr::Genre => track.genre = Some(text()),
        Attr::Grouping => track.grouping = Some(text()),
        Attr::Kind => track.kind = Some(text()),
        Attr::Comment => track.comments = Some(text()),
        Attr::SortTitle => track.sort_name = Some(text()),
        Attr::SortAlbum => track.sort_album = Some(text()),
        Attr::SortArtist => track.sort_artist = Some(text()),
        Attr::SortAlbumArtist => track.sort_album_artist = Some(text()),
        Attr::SortComposer => track.sort_composer = Some(text()),
        Attr::Work => track.work = Some(text()),
        Attr::PurchaserEmail => track.purchased = Some(true),
        Attr::Location => track.location = Some(text()),
        Attr::CopyrightHolder | Attr::CopyrightInfo | Attr::PurchaserName => {}
        Attr::Unknown(id) => log::debug!("ignoring track data object type {id}"),
        _ => {}
    }
}

fn project_playlist(obj: &PlaylistObject) -> Playlist {
    let mut pl = Playlist::new(Pid(obj.persistent_id));
    pl.name = Some(String::new());
    pl.all_items = Some(true);
    pl.visible = Some(true);
    pl.parent_persistent_id = Pid(obj.parent_persistent_id).nonzero();
    pl.date_added = obj.date_added.to_datetime();
    pl.date_modified = obj.date_modified.to_datetime();
    if obj.folder {
        pl.folder = Some(true);
    }
    if obj.sort_field != 0 {
        pl.sort_field = Some(obj.sort_field);
    }
    pl.set_distinguished_kind(obj.distinguished_kind as u32);
    pl
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builders for synthetic catalogs. A version 1.0 envelope keeps the
    // payload flat, so frames can be concatenated directly.

    fn envelope(major: u8, minor: u8) -> Vec<u8> {
        let mut data = vec![0u8; 104];
        data[..4].copy_from_slice(b"hdfm");
        data[4..8].copy_from_slice(&104u32.to_be_bytes());
        data[17..21].copy_from_slice(b"11.4");
        data[52..60].copy_from_slice(&0x1122u64.to_be_bytes());
        data[65] = major;
        data[67] = minor;
        data
    }

    fn track_frame(track_id: u32, pid: u64, attr_count: u32) -> Vec<u8> {
        let mut data = vec![0u8; 252];
        data[..4].copy_from_slice(b"htim");
        data[4..8].copy_from_slice(&252u32.to_be_bytes());
        data[12..16].copy_from_slice(&attr_count.to_be_bytes());
        data[16..20].copy_from_slice(&track_id.to_be_bytes());
        data[40..44].copy_from_slice(&180_000u32.to_be_bytes());
        data[128..136].copy_from_slice(&pid.to_be_bytes());
        data
    }

    fn playlist_frame(pid: u64, attr_count: u32, item_count: u32) -> Vec<u8> {
        let mut data = vec![0u8; 632];
        data[..4].copy_from_slice(b"hpim");
        data[4..8].copy_from_slice(&632u32.to_be_bytes());
        data[12..16].copy_from_slice(&attr_count.to_be_bytes());
        data[16..20].copy_from_slice(&item_count.to_be_bytes());
        data[440..448].copy_from_slice(&pid.to_be_bytes());
        data
    }

    fn hohm_frame(type_id: u32, flags: u32, body: &[u8]) -> Vec<u8> {
        let size = (40 + body.len()) as u32;
        let mut data = Vec::new();
        data.extend_from_slice(b"hohm");
        data.extend_from_slice(&40u32.to_be_bytes());
        data.extend_from_slice(&size.to_be_bytes());
        data.extend_from_slice(&type_id.to_be_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&flags.to_be_bytes());
        data.extend_from_slice(&(body.len() as u32).to_be_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(body);
        data
    }

    fn item_frame(track_id: u32) -> Vec<u8> {
        let mut data = vec![0u8; 36];
        data[..4].copy_from_slice(b"hptm");
        data[4..8].copy_from_slice(&36u32.to_be_bytes());
        data[24..28].copy_from_slice(&track_id.to_be_bytes());
        data
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
    fn flat_catalog_emits_in_order() {
        let mut catalog = envelope(1, 0);
        catalog.extend(track_frame(10, 0xAA, 2));
        catalog.extend(hohm_frame(1, 0x1, &[0x00, 0x41, 0x00, 0x42])); // name "AB"
        catalog.extend(hohm_frame(3, 0x1, &[0x00, 0x43])); // artist "C"
        catalog.extend(track_frame(11, 0xBB, 0));
        catalog.extend(playlist_frame(0xF0, 1, 3));
        catalog.extend(hohm_frame(100, 0x1, &[0x00, 0x50])); // playlist name "P"
        catalog.extend(item_frame(10));
        catalog.extend(item_frame(12)); // unknown local id, dropped
        catalog.extend(item_frame(11));

        let records = collect(&catalog);
        assert_eq!(records.len(), 4);
        match &records[0] {
            Record::Library(lib) => {
                assert_eq!(lib.major_version, Some(1));
                assert_eq!(lib.application_version.as_deref(), Some("11.4"));
                assert_eq!(lib.persistent_id, Some(Pid(0x1122)));
            }
            other => panic!("expected library first, got {}", other.kind()),
        }
        match &records[1] {
            Record::Track(t) => {
                assert_eq!(t.persistent_id, Pid(0xAA));
                assert_eq!(t.name.as_deref(), Some("AB"));
                assert_eq!(t.artist.as_deref(), Some("C"));
                assert_eq!(t.total_time, Some(180_000));
            }
            other => panic!("expected track, got {}", other.kind()),
        }
        match &records[3] {
            Record::Playlist(p) => {
                assert_eq!(p.persistent_id, Pid(0xF0));
                assert_eq!(p.name.as_deref(), Some("P"));
                // the unknown local id is silently dropped, order kept
                assert_eq!(p.track_ids, vec![Pid(0xAA), Pid(0xBB)]);
            }
            other => panic!("expected playlist, got {}", other.kind()),
        }
    }

    #[test]
    fn playlist_membership_is_bounded_by_declared_count() {
        let mut catalog = envelope(1, 0);
        catalog.extend(track_frame(1, 0x01, 0));
        catalog.extend(playlist_frame(0xF0, 0, 2));
        catalog.extend(item_frame(1));
        catalog.extend(item_frame(1));
        catalog.extend(item_frame(1)); // beyond the declared count
        let records = collect(&catalog);
        let Record::Playlist(p) = &records[2] else {
            panic!("expected playlist");
        };
        assert_eq!(p.track_ids.len(), 2);
    }

    #[test]
    fn crypt_region_follows_format_version() {
        let env = |major, minor, max_crypt| Envelope {
            application_version: String::new(),
            persistent_id: 1,
            major_version: major,
            minor_version: minor,
            max_crypt_size: max_crypt,
            tz_offset: 0,
        };
        assert_eq!(crypt_region(&env(1, 0, 0)).unwrap(), CryptRegion::None);
        assert_eq!(crypt_region(&env(1, 1, 0)).unwrap(), CryptRegion::All);
        assert_eq!(
            crypt_region(&env(2, 0, 0)).unwrap(),
            CryptRegion::Prefix(DEFAULT_CRYPT_SIZE)
        );
        // an explicit envelope size overrides the version default
        assert_eq!(
            crypt_region(&env(2, 0, 4096)).unwrap(),
            CryptRegion::Prefix(4096)
        );
        assert!(crypt_region(&env(3, 0, 0)).is_err());
    }

    #[test]
    fn unknown_version_is_fatal() {
        let catalog = envelope(9, 9);
        let err = Loader::new()
            .load(&catalog[..], |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn truncated_stream_mid_track_ends_cleanly() {
        let mut catalog = envelope(1, 0);
        catalog.extend(track_frame(10, 0xAA, 2));
        catalog.extend(hohm_frame(1, 0x1, &[0x00, 0x41]));
        // second declared attribute never arrives
        let records = collect(&catalog);
        // envelope only; the partial track is dropped
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn non_data_object_in_attributes_is_fatal() {
        let mut catalog = envelope(1, 0);
        catalog.extend(track_frame(10, 0xAA, 1));
        catalog.extend(item_frame(1));
        let err = Loader::new()
            .load(&catalog[..], |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn smart_blobs_are_captured_raw() {
        let mut catalog = envelope(1, 0);
        catalog.extend(playlist_frame(0xF0, 2, 0));
        catalog.extend(hohm_frame(101, 0, b"CRIT"));
        catalog.extend(hohm_frame(102, 0, b"INFO"));
        let records = collect(&catalog);
        let Record::Playlist(p) = &records[1] else {
            panic!("expected playlist");
        };
        assert_eq!(p.smart_criteria.as_deref(), Some(b"CRIT".as_ref()));
        assert_eq!(p.smart_info.as_deref(), Some(b"INFO".as_ref()));
    }
}
