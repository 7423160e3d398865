//! ITC artwork container parsing.
//!
//! An ITC file is an outer `itch` frame, an `artw` preface and one or
//! more `item` frames, each embedding one rendition of the cover image
//! as PNG, JPEG or raw ARGB pixels. Frames are big-endian with the size
//! word first.

use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};
use std::io::Read;

pub const FORMAT_PNG: [u8; 4] = *b"PNGf";
pub const FORMAT_JPEG: [u8; 4] = *b"JPEG";
pub const FORMAT_ARGB: [u8; 4] = *b"ARGb";

/// Item layout discriminator values.
const OFFSET_ITUNES9: u32 = 208;
const OFFSET_ITUNES_OLD: u32 = 216;

/// JPEG quality for re-encoded renditions.
const JPEG_QUALITY: u8 = 75;

/// One section of an ITC file.
#[derive(Debug)]
pub enum Section {
    /// Outer `itch` container header.
    Container,
    /// `artw` preface block.
    Preface,
    /// An embedded image rendition.
    Item(Item),
}

/// An embedded image rendition.
#[derive(Debug, Clone)]
pub struct Item {
    pub library_id: u64,
    pub track_id: u64,
    /// Acquisition method FOURCC (`locl`, `down`, …).
    pub method: [u8; 4],
    /// Image format FOURCC; zero when the numeric fallback failed too.
    pub format: [u8; 4],
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Sequential reader over the sections of an ITC stream.
pub struct ItcReader<R: Read> {
    inner: R,
}

impl<R: Read> ItcReader<R> {
    pub fn new(inner: R) -> Self {
        ItcReader { inner }
    }

    /// Read the next section, or `None` at end of stream.
    pub fn next_section(&mut self) -> Result<Option<Section>> {
        let mut header = [0u8; 8];
        let mut got = 0;
        while got < 8 {
            let n = self.inner.read(&mut header[got..])?;
            if n == 0 {
                if got == 0 {
                    return Ok(None);
                }
                return Err(Error::format("truncated artwork container header"));
            }
            got += n;
        }
        let size = u32::from_be_bytes(header[..4].try_into().unwrap());
        let kind: [u8; 4] = header[4..8].try_into().unwrap();

        match &kind {
            b"itch" => {
                self.skip(12)?;
                Ok(Some(Section::Container))
            }
            b"artw" => {
                self.skip(256)?;
                Ok(Some(Section::Preface))
            }
            b"item" => Ok(Some(Section::Item(self.read_item(size)?))),
            other => Err(Error::format(format!(
                "unknown artwork section kind {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn read_item(&mut self, frame_size: u32) -> Result<Item> {
        let offset = self.read_u32()?;
        let preamble = match offset {
            OFFSET_ITUNES9 => 16,
            OFFSET_ITUNES_OLD => 20,
            _ => 16,
        };
        self.skip(preamble)?;

        let library_id = self.read_u64()?;
        let track_id = self.read_u64()?;
        let mut method = [0u8; 4];
        self.inner.read_exact(&mut method)?;
        let mut format = [0u8; 4];
        self.inner.read_exact(&mut format)?;
        if format[0] == 0 {
            // Numeric fallback used by some writers.
            format = match format[3] {
                0x0D => FORMAT_JPEG,
                0x0E => FORMAT_PNG,
                _ => [0u8; 4],
            };
        }
        self.skip(4)?;
        let width = self.read_u32()?;
        let height = self.read_u32()?;

        let consumed = 4 + preamble + 8 + 8 + 4 + 4 + 4 + 8;
        let padding = (offset as usize)
            .checked_sub(consumed + 8)
            .ok_or_else(|| Error::format("artwork item offset too small"))?;
        self.skip(padding)?;

        let data_size = (frame_size as usize)
            .checked_sub(offset as usize)
            .ok_or_else(|| Error::format("artwork item larger than its frame"))?;
        let mut data = vec![0u8; data_size];
        self.inner.read_exact(&mut data)?;

        Ok(Item {
            library_id,
            track_id,
            method,
            format,
            width,
            height,
            data,
        })
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.inner.read_exact(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        self.inner.read_exact(&mut b)?;
        Ok(u64::from_be_bytes(b))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let mut remaining = n as u64;
        let copied = std::io::copy(&mut (&mut self.inner).take(remaining), &mut std::io::sink())?;
        remaining -= copied;
        if remaining > 0 {
            return Err(Error::format("truncated artwork container"));
        }
        Ok(())
    }
}

impl Item {
    /// Decode the embedded bytes into pixels.
    pub fn to_image(&self) -> Result<DynamicImage> {
        match self.format {
            FORMAT_PNG => image::load_from_memory_with_format(&self.data, image::ImageFormat::Png)
                .map_err(|e| Error::format(format!("bad embedded png: {e}"))),
            FORMAT_JPEG => {
                image::load_from_memory_with_format(&self.data, image::ImageFormat::Jpeg)
                    .map_err(|e| Error::format(format!("bad embedded jpeg: {e}")))
            }
            FORMAT_ARGB => self.argb_image(),
            other => Err(Error::format(format!(
                "unknown image format {:?}",
                String::from_utf8_lossy(&other)
            ))),
        }
    }

    /// Raw ARGB pixels rearranged into an RGBA image.
    fn argb_image(&self) -> Result<DynamicImage> {
        let expect = self.width as usize * self.height as usize * 4;
        if self.data.len() != expect {
            return Err(Error::format("invalid ARGB image dimensions"));
        }
        let mut rgba = Vec::with_capacity(expect);
        for px in self.data.chunks_exact(4) {
            rgba.extend_from_slice(&[px[1], px[2], px[3], px[0]]);
        }
        let img = RgbaImage::from_raw(self.width, self.height, rgba)
            .ok_or_else(|| Error::format("invalid ARGB image dimensions"))?;
        Ok(DynamicImage::ImageRgba8(img))
    }

    /// JPEG bytes for this rendition, re-encoding when necessary.
    pub fn export_jpeg(&self) -> Result<Vec<u8>> {
        if self.format == FORMAT_JPEG {
            return Ok(self.data.clone());
        }
        let img = self.to_image()?;
        let mut out = Vec::new();
        let enc = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        img.to_rgb8()
            .write_with_encoder(enc)
            .map_err(|e| Error::format(format!("jpeg encode failed: {e}")))?;
        Ok(out)
    }

    /// PNG bytes for this rendition, re-encoding when necessary.
    pub fn export_png(&self) -> Result<Vec<u8>> {
        if self.format == FORMAT_PNG {
            return Ok(self.data.clone());
        }
        let img = self.to_image()?;
        let mut out = Vec::new();
        img.write_with_encoder(PngEncoder::new(&mut out))
            .map_err(|e| Error::format(format!("png encode failed: {e}")))?;
        Ok(out)
    }
}

/// Pick the largest rendition in an ITC stream and export it as JPEG.
pub fn largest_jpeg(reader: impl Read) -> Result<Vec<u8>> {
    let mut itc = ItcReader::new(reader);
    let mut best: Option<Item> = None;
    while let Some(section) = itc.next_section()? {
        if let Section::Item(item) = section {
            let size = item.width as u64 * item.height as u64;
            let best_size = best
                .as_ref()
                .map(|b| b.width as u64 * b.height as u64)
                .unwrap_or(0);
            if best.is_none() || size > best_size {
                best = Some(item);
            }
        }
    }
    match best {
        Some(item) => item.export_jpeg(),
        None => Err(Error::NotFound("artwork container has no items".into())),
    }
}
