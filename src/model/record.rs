use super::{Library, Playlist, Track};
use serde::Serialize;

/// One record emitted by a catalog loader.
///
/// Records arrive in file order: the library header first, then tracks,
/// then playlists.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Record {
    Library(Library),
    Track(Box<Track>),
    Playlist(Box<Playlist>),
}

impl Record {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Library(_) => "library",
            Record::Track(_) => "track",
            Record::Playlist(_) => "playlist",
        }
    }
}

impl From<Library> for Record {
    fn from(lib: Library) -> Self {
        Record::Library(lib)
    }
}

impl From<Track> for Record {
    fn from(t: Track) -> Self {
        Record::Track(Box::new(t))
    }
}

impl From<Playlist> for Record {
    fn from(p: Playlist) -> Self {
        Record::Playlist(Box::new(p))
    }
}
