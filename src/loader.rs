//! Catalog dispatch and streaming emission.
//!
//! A loader runs on its own thread, performs blocking reads, and pushes
//! records into one bounded ordered channel. The consumer iterates
//! `Result<Record>` items: a terminal `Err` is the failure signal, a
//! plain close is success. Cancellation is cooperative and checked at
//! every send.

use crate::error::{Error, Result};
use crate::model::Record;
use crate::{itl, mdb, plist};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Records buffered between producer and consumer.
const CHANNEL_CAPACITY: usize = 10;

/// Catalog dialect, chosen by file-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Older binary format (`.itl`), also the default.
    Itl,
    /// Newer binary format (`.musicdb`).
    MusicDb,
    /// XML property list (`.xml`).
    Xml,
}

impl Dialect {
    /// Pick the dialect for a catalog path.
    pub fn for_path(path: &Path) -> Dialect {
        match path.extension().and_then(|e| e.to_str()) {
            Some("xml") => Dialect::Xml,
            Some("musicdb") => Dialect::MusicDb,
            _ => Dialect::Itl,
        }
    }
}

/// Cooperative cancellation flag shared with the loader thread.
#[derive(Debug, Default)]
pub struct CancelToken {
    flag: AtomicBool,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Consumer end of a running catalog load.
///
/// Iterate it to receive records in file order; the last item before the
/// stream closes carries the error, if any. Dropping the stream cancels
/// the loader and joins its thread.
pub struct RecordStream {
    rx: Receiver<Result<Record>>,
    cancel: Arc<CancelToken>,
    handle: Option<JoinHandle<()>>,
}

impl RecordStream {
    /// Ask the loader to stop. Best effort: an in-progress read finishes
    /// before the flag is observed at the next send.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Iterator for RecordStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        // Drain so a producer blocked on a full channel can observe the
        // flag and exit.
        while self.rx.recv().is_ok() {}
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Start loading a catalog file on a background thread.
///
/// All failures, including a missing file, surface on the returned
/// stream.
pub fn load_catalog(path: impl AsRef<Path>) -> RecordStream {
    let path = path.as_ref().to_path_buf();
    let dialect = Dialect::for_path(&path);
    let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
    let cancel = Arc::new(CancelToken::default());
    let thread_cancel = Arc::clone(&cancel);
    let handle = std::thread::spawn(move || run_loader(dialect, path, tx, thread_cancel));
    RecordStream {
        rx,
        cancel,
        handle: Some(handle),
    }
}

fn run_loader(
    dialect: Dialect,
    path: PathBuf,
    tx: SyncSender<Result<Record>>,
    cancel: Arc<CancelToken>,
) {
    let emit = |record: Record| -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tx.send(Ok(record)).map_err(|_| Error::Cancelled)
    };

    let result = File::open(&path)
        .map_err(Error::Io)
        .and_then(|file| match dialect {
            Dialect::Itl => itl::Loader::new().load(file, emit),
            Dialect::MusicDb => mdb::Loader::new().load(file, emit),
            Dialect::Xml => plist::Loader::new().load(BufReader::new(file), emit),
        });

    match result {
        Ok(()) => log::debug!("finished loading {}", path.display()),
        // Nobody is listening for a cancellation result.
        Err(Error::Cancelled) => log::debug!("load of {} cancelled", path.display()),
        Err(err) => {
            log::warn!("load of {} failed: {err}", path.display());
            let _ = tx.send(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn itl_fixture() -> tempfile::NamedTempFile {
        // minimal version-1.0 (flat) catalog: envelope + one track
        let mut env = vec![0u8; 104];
        env[..4].copy_from_slice(b"hdfm");
        env[4..8].copy_from_slice(&104u32.to_be_bytes());
        env[52..60].copy_from_slice(&1u64.to_be_bytes());
        env[65] = 1;
        env[67] = 0;
        let mut track = vec![0u8; 252];
        track[..4].copy_from_slice(b"htim");
        track[4..8].copy_from_slice(&252u32.to_be_bytes());
        track[16..20].copy_from_slice(&7u32.to_be_bytes());
        track[128..136].copy_from_slice(&0xAAu64.to_be_bytes());

        let mut f = tempfile::Builder::new().suffix(".itl").tempfile().unwrap();
        f.write_all(&env).unwrap();
        f.write_all(&track).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn dialect_dispatch_by_suffix() {
        assert_eq!(Dialect::for_path(Path::new("a/Library.xml")), Dialect::Xml);
        assert_eq!(Dialect::for_path(Path::new("Library.musicdb")), Dialect::MusicDb);
        assert_eq!(Dialect::for_path(Path::new("iTunes Library.itl")), Dialect::Itl);
        assert_eq!(Dialect::for_path(Path::new("whatever.bin")), Dialect::Itl);
    }

    #[test]
    fn stream_yields_records_then_closes() {
        let f = itl_fixture();
        let stream = load_catalog(f.path());
        let records: Vec<_> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), "library");
        assert_eq!(records[1].kind(), "track");
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let mut stream = load_catalog("/no/such/catalog.itl");
        let first = stream.next().unwrap();
        assert!(matches!(first, Err(Error::Io(_))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn cancelled_stream_terminates() {
        let f = itl_fixture();
        let stream = load_catalog(f.path());
        stream.cancel();
        // At most the records already buffered arrive; the stream closes
        // without a terminal error.
        for item in stream {
            assert!(item.is_ok());
        }
    }

    #[test]
    fn dropping_the_stream_joins_the_loader() {
        let f = itl_fixture();
        let stream = load_catalog(f.path());
        drop(stream);
    }
}
