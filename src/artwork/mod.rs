//! Cover-art resolution.
//!
//! Two back-ends know how to turn a persistent id into JPEG bytes: the
//! application's sqlite artwork cache, and the older per-track ITC
//! containers. The cache is preferred; the ITC tree is only consulted
//! when the cache cannot be opened at all.

mod db;
mod itc;

pub use db::{ArtworkDb, ArtworkItem};
pub use itc::{largest_jpeg, Item, ItcReader, Section};

use crate::error::{Error, Result};
use crate::model::Pid;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Anything that can resolve a persistent id to JPEG bytes.
pub trait ArtworkSource {
    fn jpeg(&self, id: Pid) -> Result<Vec<u8>>;
}

impl ArtworkSource for ArtworkDb {
    fn jpeg(&self, id: Pid) -> Result<Vec<u8>> {
        ArtworkDb::jpeg(self, id)
    }
}

/// ITC-file back-end under the legacy album-artwork cache directory.
pub struct ItcSource {
    root: PathBuf,
    library_id: Pid,
}

impl ItcSource {
    /// Open the per-library cache directory, failing when it is absent.
    pub fn open(home: &Path, library_id: Pid) -> Result<Self> {
        let root = home
            .join("Music")
            .join("iTunes")
            .join("Album Artwork")
            .join("Cache")
            .join(library_id.hex());
        fs::metadata(&root).map_err(Error::Io)?;
        Ok(ItcSource { root, library_id })
    }

    /// Container path for a persistent id.
    ///
    /// The three directory levels are the decimal values of the last
    /// three characters of the id's hex form, last character first.
    fn container_path(&self, id: Pid) -> PathBuf {
        let hex = id.hex();
        let digits = hex.as_bytes();
        let n = digits.len() - 1;
        self.root
            .join(format!("{:02}", digits[n]))
            .join(format!("{:02}", digits[n - 1]))
            .join(format!("{:02}", digits[n - 2]))
            .join(format!("{}-{}.itc", self.library_id.hex(), hex))
    }
}

impl ArtworkSource for ItcSource {
    fn jpeg(&self, id: Pid) -> Result<Vec<u8>> {
        let path = self.container_path(id);
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(id.hex()),
            _ => Error::Io(e),
        })?;
        largest_jpeg(file)
    }
}

/// Open the preferred artwork back-end for a library.
///
/// Any failure to open the SQL cache falls back to the ITC tree; once a
/// back-end is chosen there is no cross-fallback on lookup errors.
pub fn open_source(home: &Path, library_id: Pid) -> Result<Box<dyn ArtworkSource>> {
    match ArtworkDb::open(home, library_id) {
        Ok(db) => {
            log::debug!("using artwork cache database");
            Ok(Box::new(db))
        }
        Err(err) => {
            log::debug!("no artwork cache database ({err}), trying itc files");
            Ok(Box::new(ItcSource::open(home, library_id)?))
        }
    }
}
