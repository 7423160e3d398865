//! Frame layer for the "itl" dialect.
//!
//! Frames carry a 4-byte signature whose placement of the letter `h`
//! declares the byte order: a trailing `h` means the tag is stored
//! reversed and every field is little-endian; a leading `h` means
//! big-endian. Anything else ends the stream, as do the `hlrm` tag and a
//! zero size word. Data objects (`hohm`) carry a preface word before the
//! real size.

use crate::error::Result;
use crate::frame::{read_signature, read_u32, read_up_to, ByteOrder, Frame};
use std::io::Read;

/// Read the next frame, or `None` at end of stream.
///
/// Returns the frame together with the number of stream bytes consumed.
/// A frame cut short by the end of the stream comes back with a truncated
/// buffer rather than an error; trailing objects tolerate that.
pub fn read_frame(r: &mut impl Read, offset: u64) -> Result<Option<(Frame, u64)>> {
    let sig = match read_signature(r)? {
        None => return Ok(None),
        Some(sig) => sig,
    };
    if sig[0] != b'h' && sig[3] != b'h' {
        return Ok(None);
    }

    let (order, tag) = if sig[3] == b'h' {
        (ByteOrder::Little, [sig[3], sig[2], sig[1], sig[0]])
    } else {
        (ByteOrder::Big, sig)
    };
    if &tag == b"hlrm" {
        return Ok(None);
    }

    // Collect the on-wire header bytes so field offsets index from the
    // frame start, exactly as the object layouts are documented.
    let mut header = Vec::with_capacity(12);
    header.extend_from_slice(&sig);

    let mut size = read_u32(r, order)?;
    push_word(&mut header, size, order);
    if &tag == b"hohm" {
        // First word is a preface; the second is the real frame size.
        size = read_u32(r, order)?;
        push_word(&mut header, size, order);
    }

    if size == 0 {
        log::warn!("{} frame has size zero", String::from_utf8_lossy(&tag));
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
            tag,
            order,
            size,
            offset,
            data,
        },
        consumed,
    )))
}

fn push_word(buf: &mut Vec<u8>, v: u32, order: ByteOrder) {
    match order {
        ByteOrder::Big => buf.extend_from_slice(&v.to_be_bytes()),
        ByteOrder::Little => buf.extend_from_slice(&v.to_le_bytes()),
    }
}
