//! Payload decryption and decompression.
//!
//! Both binary dialects protect the object stream that follows the
//! envelope: an initial prefix (or the whole remainder) is AES-128-ECB
//! encrypted with a fixed application key, and the plaintext is a zlib
//! stream. The oldest dialect-A revision (1.0) stores the payload flat,
//! with neither layer.
//!
//! Reads are streaming; nothing here buffers the whole input.

use crate::error::{Error, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::Aes128;
use flate2::read::ZlibDecoder;
use std::io::{self, Read};

/// The application's compiled-in payload key.
const KEY: [u8; 16] = *b"BHUILuilfghuila3";

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// Which part of the payload is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptRegion {
    /// Nothing is encrypted and nothing is compressed (dialect A 1.0).
    None,
    /// The entire remainder is encrypted (dialect A 1.1).
    All,
    /// Only the first `n` bytes are encrypted.
    Prefix(u64),
}

/// Default encrypted-prefix size for dialect A 2.x envelopes that do not
/// override it.
pub const DEFAULT_CRYPT_SIZE: u64 = 102_400;

/// Streaming AES-128-ECB decryptor for the encrypted payload prefix.
///
/// Decryption happens in whole 16-byte blocks: a read that lands inside a
/// block reads ahead to the block boundary (never past the encrypted
/// prefix) and keeps the surplus plaintext for the next call. Bytes past
/// the prefix are forwarded untouched.
pub struct DecryptReader<R: Read> {
    inner: R,
    cipher: Aes128,
    region: CryptRegion,
    raw_pos: u64,
    leftover: Vec<u8>,
}

impl<R: Read> DecryptReader<R> {
    pub fn new(inner: R, region: CryptRegion) -> Result<Self> {
        let cipher = Aes128::new_from_slice(&KEY).map_err(|_| Error::Crypto)?;
        Ok(DecryptReader {
            inner,
            cipher,
            region,
            raw_pos: 0,
            leftover: Vec::new(),
        })
    }

    /// Bytes of encrypted input still ahead of the cursor.
    fn encrypted_remaining(&self) -> u64 {
        match self.region {
            CryptRegion::None => 0,
            CryptRegion::All => u64::MAX,
            CryptRegion::Prefix(n) => n.saturating_sub(self.raw_pos),
        }
    }

    fn decrypt_blocks(&self, buf: &mut [u8]) {
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        }
    }

    /// Release the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }

        // Serve buffered plaintext first.
        if !self.leftover.is_empty() {
            let n = self.leftover.len().min(dst.len());
            dst[..n].copy_from_slice(&self.leftover[..n]);
            self.leftover.drain(..n);
            return Ok(n);
        }

        let encrypted_left = self.encrypted_remaining();
        if encrypted_left == 0 {
            // Past the prefix: plain passthrough.
            let n = self.inner.read(dst)?;
            self.raw_pos += n as u64;
            return Ok(n);
        }

        // Round the request up to a block boundary, clamped to the prefix.
        let mut want = dst.len();
        let tail = want % BLOCK_SIZE;
        if tail > 0 {
            want += BLOCK_SIZE - tail;
        }
        if (want as u64) > encrypted_left {
            want = encrypted_left as usize;
        }

        let mut buf = vec![0u8; want];
        let mut got = 0;
        while got < want {
            let n = self.inner.read(&mut buf[got..])?;
            if n == 0 {
                break;
            }
            got += n;
        }
        self.raw_pos += got as u64;
        buf.truncate(got);
        if got == 0 {
            return Ok(0);
        }

        // A ragged tail can only appear on malformed input; whole blocks
        // decrypt, the remainder passes through.
        let aligned = got - got % BLOCK_SIZE;
        self.decrypt_blocks(&mut buf[..aligned]);

        let n = buf.len().min(dst.len());
        dst[..n].copy_from_slice(&buf[..n]);
        if n < buf.len() {
            self.leftover = buf.split_off(n);
        }
        Ok(n)
    }
}

enum PayloadInner<R: Read> {
    /// Dialect A 1.0: neither encryption nor compression.
    Flat(R),
    Inflate(ZlibDecoder<DecryptReader<R>>),
}

/// The plaintext object stream behind a catalog envelope.
pub struct PayloadReader<R: Read> {
    inner: PayloadInner<R>,
}

impl<R: Read> PayloadReader<R> {
    pub fn new(source: R, region: CryptRegion) -> Result<Self> {
        let inner = match region {
            CryptRegion::None => PayloadInner::Flat(source),
            _ => PayloadInner::Inflate(ZlibDecoder::new(DecryptReader::new(source, region)?)),
        };
        Ok(PayloadReader { inner })
    }
}

impl<R: Read> Read for PayloadReader<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            PayloadInner::Flat(r) => r.read(dst),
            PayloadInner::Inflate(r) => r.read(dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncrypt;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn encrypt(data: &[u8], limit: Option<usize>) -> Vec<u8> {
        let cipher = Aes128::new_from_slice(&KEY).unwrap();
        let mut out = data.to_vec();
        let end = limit.unwrap_or(out.len()).min(out.len());
        for chunk in out[..end].chunks_exact_mut(BLOCK_SIZE) {
            cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        }
        out
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn read_all(mut r: impl Read) -> Vec<u8> {
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn flat_region_passes_through() {
        let data = b"no framing at all".to_vec();
        let r = PayloadReader::new(&data[..], CryptRegion::None).unwrap();
        assert_eq!(read_all(r), data);
    }

    #[test]
    fn fully_encrypted_payload_round_trips() {
        let plain: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        let mut compressed = deflate(&plain);
        // Writers pad the encrypted image to a block boundary; the
        // inflater stops at the stream end and never sees the filler.
        while compressed.len() % BLOCK_SIZE != 0 {
            compressed.push(0);
        }
        let wire = encrypt(&compressed, None);
        let r = PayloadReader::new(&wire[..], CryptRegion::All).unwrap();
        assert_eq!(read_all(r), plain);
    }

    #[test]
    fn prefix_encryption_stops_at_boundary() {
        let plain: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();
        let compressed = deflate(&plain);
        let prefix = 64usize;
        assert!(compressed.len() > prefix);
        let wire = encrypt(&compressed, Some(prefix));
        let r = PayloadReader::new(&wire[..], CryptRegion::Prefix(prefix as u64)).unwrap();
        assert_eq!(read_all(r), plain);
    }

    #[test]
    fn small_reads_preserve_leftover_plaintext() {
        let plain: Vec<u8> = (1u8..=128).collect();
        let wire = encrypt(&plain, Some(plain.len()));
        let mut r = DecryptReader::new(&wire[..], CryptRegion::Prefix(128)).unwrap();
        let mut out = Vec::new();
        let mut byte = [0u8; 3];
        loop {
            let n = r.read(&mut byte).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&byte[..n]);
        }
        assert_eq!(out, plain);
    }

    #[test]
    fn corrupt_zlib_classifies_as_compression_error() {
        let wire = encrypt(b"definitely not zlib!!!!!!!!!!!!!", None);
        let mut r = PayloadReader::new(&wire[..], CryptRegion::All).unwrap();
        let mut out = Vec::new();
        let err = r.read_to_end(&mut out).unwrap_err();
        let kind_err: crate::error::Error = err.into();
        assert!(matches!(kind_err, crate::error::Error::Compression(_)));
    }
}
