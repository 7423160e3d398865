use super::Pid;
use crate::smart::SmartPlaylist;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A playlist record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Playlist {
    /// Stable identifier for this playlist.
    pub persistent_id: Pid,

    /// Persistent id of the containing folder playlist, if any.
    pub parent_persistent_id: Option<Pid>,

    /// Display name.
    pub name: Option<String>,

    /// Whether this playlist is a folder containing other playlists.
    pub folder: Option<bool>,

    /// Whether the playlist is shown in the source list.
    pub visible: Option<bool>,

    /// Whether this is the master "all items" playlist.
    pub master: Option<bool>,
    pub all_items: Option<bool>,

    // system-playlist markers derived from the distinguished kind
    pub audiobooks: Option<bool>,
    pub movies: Option<bool>,
    pub music: Option<bool>,
    pub podcasts: Option<bool>,
    pub purchased_music: Option<bool>,
    pub tv_shows: Option<bool>,

    /// Raw distinguished-kind code for system-managed playlists.
    pub distinguished_kind: Option<u32>,

    /// Sort-order field code.
    pub sort_field: Option<u16>,

    /// Raw smart-playlist header blob.
    pub smart_info: Option<Vec<u8>>,

    /// Raw smart-playlist criteria blob.
    pub smart_criteria: Option<Vec<u8>>,

    /// Parsed smart-playlist rule tree, when the blobs decode.
    pub smart: Option<SmartPlaylist>,

    /// Seed track of a genius playlist.
    pub genius_track_id: Option<Pid>,

    pub date_added: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,

    /// Member track persistent ids in on-disk order.
    pub track_ids: Vec<Pid>,
}

impl Playlist {
    /// Create a playlist carrying only its persistent id.
    pub fn new(persistent_id: Pid) -> Self {
        Playlist {
            persistent_id,
            ..Playlist::default()
        }
    }

    /// Whether this playlist is a folder.
    pub fn is_folder(&self) -> bool {
        self.folder.unwrap_or(false)
    }

    /// Whether this is a rule-driven smart playlist.
    ///
    /// Folders and genius playlists are never smart, even when blobs are
    /// present.
    pub fn is_smart(&self) -> bool {
        if self.is_folder() || self.genius_track_id.is_some() {
            return false;
        }
        matches!((&self.smart_info, &self.smart_criteria),
                 (Some(i), Some(c)) if !i.is_empty() && !c.is_empty())
    }

    /// Whether the playlist is visible; defaults to true when unset.
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    /// Parse the smart blobs, when both are present, and reclassify a
    /// zero-rule playlist that still has a member as a genius playlist
    /// seeded by that member.
    pub(crate) fn resolve_smart(&mut self) {
        let (Some(info), Some(criteria)) = (&self.smart_info, &self.smart_criteria) else {
            return;
        };
        match crate::smart::parse(info, criteria) {
            Ok(parsed) => {
                let no_rules = parsed.criteria.rules.is_empty();
                self.smart = Some(parsed);
                if self.genius_track_id.is_none() && no_rules {
                    if let Some(&first) = self.track_ids.first() {
                        self.genius_track_id = Some(first);
                        self.smart = None;
                        self.smart_info = None;
                        self.smart_criteria = None;
                    }
                }
            }
            Err(err) => {
                log::warn!(
                    "playlist {} smart criteria did not parse: {err}",
                    self.name.as_deref().unwrap_or("?")
                );
            }
        }
    }

    /// Apply the system-playlist markers for a distinguished-kind code.
    pub fn set_distinguished_kind(&mut self, kind: u32) {
        if kind == 0 {
            return;
        }
        self.distinguished_kind = Some(kind);
        match DistinguishedKind::from_code(kind) {
            DistinguishedKind::Books => self.audiobooks = Some(true),
            DistinguishedKind::Movies => self.movies = Some(true),
            DistinguishedKind::TvShows => self.tv_shows = Some(true),
            DistinguishedKind::Music => self.music = Some(true),
            DistinguishedKind::Podcasts => self.podcasts = Some(true),
            DistinguishedKind::Purchased => self.purchased_music = Some(true),
            _ => {}
        }
    }
}

/// Labels stamped on system-managed playlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistinguishedKind {
    User,
    Movies,
    TvShows,
    Music,
    Books,
    Tones,
    Rentals,
    Podcasts,
    Purchased,
    PartyShuffle,
    Genius,
    ITunesU,
    GeniusMix,
    GeniusMixes,
    MusicVideos,
    HomeVideos,
    Downloaded,
    Unknown(u32),
}

impl DistinguishedKind {
    /// Decode the raw kind byte.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => DistinguishedKind::User,
            2 => DistinguishedKind::Movies,
            3 => DistinguishedKind::TvShows,
            4 => DistinguishedKind::Music,
            5 => DistinguishedKind::Books,
            6 => DistinguishedKind::Tones,
            7 => DistinguishedKind::Rentals,
            10 => DistinguishedKind::Podcasts,
            19 => DistinguishedKind::Purchased,
            22 => DistinguishedKind::PartyShuffle,
            26 => DistinguishedKind::Genius,
            31 => DistinguishedKind::ITunesU,
            32 => DistinguishedKind::GeniusMix,
            35 => DistinguishedKind::GeniusMixes,
            47 => DistinguishedKind::MusicVideos,
            48 => DistinguishedKind::HomeVideos,
            65 => DistinguishedKind::Downloaded,
            other => DistinguishedKind::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinguished_kind_sets_markers() {
        let mut pl = Playlist::new(Pid(1));
        pl.set_distinguished_kind(10);
        assert_eq!(pl.podcasts, Some(true));
        assert_eq!(pl.distinguished_kind, Some(10));

        let mut pl = Playlist::new(Pid(2));
        pl.set_distinguished_kind(0);
        assert!(pl.distinguished_kind.is_none());
    }

    #[test]
    fn smartness_requires_blobs_and_no_folder() {
        let mut pl = Playlist::new(Pid(1));
        assert!(!pl.is_smart());
        pl.smart_info = Some(vec![1]);
        pl.smart_criteria = Some(vec![2]);
        assert!(pl.is_smart());
        pl.folder = Some(true);
        assert!(!pl.is_smart());
    }
}
