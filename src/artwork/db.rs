//! SQL-backed artwork cache.
//!
//! The desktop application keeps a sqlite cache of cover images under
//! its artwork-agent container. The metadata rows resolve to image
//! files named by content hash and kind next to the database.

use crate::error::{Error, Result};
use crate::model::Pid;
use image::codecs::jpeg::JpegEncoder;
use rusqlite::{params, Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};

/// JPEG quality for re-encoded PNG sources.
const JPEG_QUALITY: u8 = 75;

const ITEM_QUERY: &str = "
SELECT db.ZDBID,
       db.ZPERSISTENTID,
       src.ZURL,
       img.ZHASHSTRING,
       img.ZKIND,
       c.ZWIDTH,
       c.ZHEIGHT,
       c.ZFORMAT
  FROM ZDATABASEITEMINFO db
  LEFT JOIN ZSOURCEINFO src ON db.ZSOURCEINFO = src.Z_PK
  LEFT JOIN ZIMAGEINFO img ON src.ZIMAGEINFO = img.Z_PK
  LEFT JOIN ZCACHEITEM c ON src.ZIMAGEINFO = c.ZIMAGEINFO
 WHERE db.ZDBID = ?1
   AND db.ZPERSISTENTID = ?2";

/// One artwork metadata row.
#[derive(Debug, Clone)]
pub struct ArtworkItem {
    pub library_id: Pid,
    pub persistent_id: Pid,
    pub hash: String,
    pub width: f64,
    pub height: f64,
    /// Image format FOURCC (`JPEG`, `PNGf`).
    pub format: u32,
    pub kind: i64,
    pub url: Option<String>,
}

impl ArtworkItem {
    /// Format FOURCC as text.
    pub fn format_str(&self) -> String {
        String::from_utf8_lossy(&self.format.to_be_bytes()).into_owned()
    }
}

/// Reader over the artwork cache database of one library.
pub struct ArtworkDb {
    root: PathBuf,
    conn: Connection,
    library_id: Pid,
}

impl ArtworkDb {
    /// Open the cache under `home`, failing when it does not exist.
    pub fn open(home: &Path, library_id: Pid) -> Result<Self> {
        let root = home
            .join("Library")
            .join("Containers")
            .join("com.apple.AMPArtworkAgent")
            .join("Data")
            .join("Documents");
        let file = root.join("artworkd.sqlite");
        fs::metadata(&file).map_err(Error::Io)?;
        let conn = Connection::open_with_flags(&file, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(ArtworkDb {
            root,
            conn,
            library_id,
        })
    }

    /// Look up the metadata row for a persistent id.
    ///
    /// Both ids bind as signed 64-bit integers.
    pub fn item(&self, id: Pid) -> Result<ArtworkItem> {
        let mut stmt = self.conn.prepare(ITEM_QUERY)?;
        let mut rows = stmt.query(params![self.library_id, id])?;
        let Some(row) = rows.next()? else {
            return Err(Error::NotFound(id.hex()));
        };
        Ok(ArtworkItem {
            library_id: row.get(0)?,
            persistent_id: row.get(1)?,
            url: row.get(2)?,
            hash: row.get(3)?,
            kind: row.get(4)?,
            width: row.get(5)?,
            height: row.get(6)?,
            format: row.get::<_, i64>(7)? as u32,
        })
    }

    /// Filesystem path of the cached image for a persistent id.
    pub fn file_path(&self, id: Pid) -> Result<PathBuf> {
        let item = self.item(id)?;
        let ext = match item.format_str().as_str() {
            "JPEG" => "jpeg",
            "PNGf" => "png",
            other => {
                return Err(Error::format(format!("unknown artwork format {other:?}")))
            }
        };
        let file = self
            .root
            .join("artwork")
            .join(format!("{}_sk_{}_cid_1.{}", item.hash, item.kind, ext));
        fs::metadata(&file).map_err(Error::Io)?;
        Ok(file)
    }

    /// Source URL recorded for a persistent id, when any.
    pub fn url(&self, id: Pid) -> Result<Option<String>> {
        Ok(self.item(id)?.url)
    }

    /// JPEG bytes for a persistent id; PNG sources are re-encoded.
    pub fn jpeg(&self, id: Pid) -> Result<Vec<u8>> {
        let file = self.file_path(id)?;
        let bytes = fs::read(&file).map_err(Error::Io)?;
        if file.extension().is_some_and(|e| e == "jpeg") {
            return Ok(bytes);
        }
        let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .map_err(|e| Error::format(format!("bad cached png: {e}")))?;
        let mut out = Vec::new();
        let enc = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        img.to_rgb8()
            .write_with_encoder(enc)
            .map_err(|e| Error::format(format!("jpeg encode failed: {e}")))?;
        Ok(out)
    }
}
