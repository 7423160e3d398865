//! Frame layer for the "musicdb" dialect.
//!
//! Unlike the older format, every frame is little-endian and the tag is
//! stored in reading order. Data objects (`boma`) carry a preface word
//! before the real size, and a zero size word ends the stream.

use crate::error::Result;
use crate::frame::{read_signature, read_u32, read_up_to, ByteOrder, Frame};
use std::io::Read;

/// Read the next frame, or `None` at end of stream.
pub fn read_frame(r: &mut impl Read, offset: u64) -> Result<Option<(Frame, u64)>> {
    let sig = match read_signature(r)? {
        None => return Ok(None),
        Some(sig) => sig,
    };

    let mut header = Vec::with_capacity(12);
    header.extend_from_slice(&sig);

    let mut size = read_u32(r, ByteOrder::Little)?;
    header.extend_from_slice(&size.to_le_bytes());
    if &sig == b"boma" {
        size = read_u32(r, ByteOrder::Little)?;
        header.extend_from_slice(&size.to_le_bytes());
    }

    if size == 0 {
        log::warn!("{} frame has size zero", String::from_utf8_lossy(&sig));
        return Ok(None);
    }

    let header_len = header.len();
    let mut data = header;
    let body_len = (size as usize).saturating_sub(header_len);
    data.resize(header_len + body_len, 0);
    let got = read_up_to(r, &mut data[header_len..])?;
    if got < body_len {
        data.truncate(header_len + got);
    }

    let consumed = data.len() as u64;
    Ok(Some((
        Frame {
            tag: sig,
            order: ByteOrder::Little,
            size,
            offset,
            data,
        },
        consumed,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_little_endian() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"itma");
        wire.extend_from_slice(&16u32.to_le_bytes());
        wire.extend_from_slice(&[5; 8]);
        let mut r = &wire[..];
        let (f, n) = read_frame(&mut r, 7).unwrap().unwrap();
        assert_eq!(f.tag, *b"itma");
        assert_eq!(f.order, ByteOrder::Little);
        assert_eq!(f.size, 16);
        assert_eq!(f.offset, 7);
        assert_eq!(n, 16);
    }

    #[test]
    fn boma_reads_second_size_word() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"boma");
        wire.extend_from_slice(&20u32.to_le_bytes()); // preface
        wire.extend_from_slice(&20u32.to_le_bytes());
        wire.extend_from_slice(&[1; 8]);
        let mut r = &wire[..];
        let (f, _) = read_frame(&mut r, 0).unwrap().unwrap();
        assert_eq!(f.size, 20);
        assert_eq!(f.data.len(), 20);
    }

    #[test]
    fn empty_stream_is_end() {
        let mut r: &[u8] = &[];
        assert!(read_frame(&mut r, 0).unwrap().is_none());
    }

    #[test]
    fn zero_size_terminates() {
        let mut wire = Vec::new();
        wire.extend_from_slice(b"hsma");
        wire.extend_from_slice(&0u32.to_le_bytes());
        let mut r = &wire[..];
        assert!(read_frame(&mut r, 0).unwrap().is_none());
    }
}
