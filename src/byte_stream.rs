//! Bounded little-endian stream over any seekable reader or writer.
//!
//! [`ByteStream`] tracks its own cursor and the total length of the
//! underlying stream, so every read is checked against the end of data
//! *before* any bytes are consumed.  Reading past the end fails with
//! [`StreamError::EndOfData`]; partial or zero-filled reads are never
//! returned.
//!
//! Positioned out-of-band reads (checksum verification, viewing a packed
//! file) go through [`ByteStream::at_position`], which restores the cursor
//! on every exit path, including failure of the inner operation.
//!
//! # Endianness
//! Every multi-byte primitive is little-endian.  There is no big-endian
//! variant of the container or variant formats.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};
use thiserror::Error;

/// Chunk size used for streamed copies and digests.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("end of data at offset {at}: need {need} bytes, {remaining} remaining")]
    EndOfData { at: u64, need: u64, remaining: u64 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type StreamResult<T> = Result<T, StreamError>;

// ── ByteStream ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ByteStream<S> {
    inner: S,
    pos:   u64,
    len:   u64,
}

impl<S: Seek> ByteStream<S> {
    /// Wrap `inner`, measuring its length and rewinding to offset 0.
    pub fn new(mut inner: S) -> StreamResult<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Move the cursor.  Positions past the end are allowed; the next read
    /// fails, the next write extends the stream.
    pub fn set_position(&mut self, pos: u64) -> StreamResult<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Run `f` with the cursor at `pos`, then put the cursor back where it
    /// was.  The restore happens whether or not `f` succeeds; an error from
    /// `f` takes precedence over an error from the restore.
    pub fn at_position<T, E>(
        &mut self,
        pos: u64,
        f:   impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StreamError>,
    {
        let saved = self.pos;
        self.set_position(pos)?;
        let out = f(self);
        let restored = self.set_position(saved);
        let value = out?;
        restored?;
        Ok(value)
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn ensure(&self, need: u64) -> StreamResult<()> {
        let remaining = self.remaining();
        if need > remaining {
            return Err(StreamError::EndOfData { at: self.pos, need, remaining });
        }
        Ok(())
    }
}

// ── Reads ────────────────────────────────────────────────────────────────────

impl<S: Read + Seek> ByteStream<S> {
    pub fn read_i8(&mut self) -> StreamResult<i8> {
        self.ensure(1)?;
        let v = self.inner.read_i8()?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> StreamResult<i16> {
        self.ensure(2)?;
        let v = self.inner.read_i16::<LittleEndian>()?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> StreamResult<i32> {
        self.ensure(4)?;
        let v = self.inner.read_i32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> StreamResult<u32> {
        self.ensure(4)?;
        let v = self.inner.read_u32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i64(&mut self) -> StreamResult<i64> {
        self.ensure(8)?;
        let v = self.inner.read_i64::<LittleEndian>()?;
        self.pos += 8;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> StreamResult<f32> {
        self.ensure(4)?;
        let v = self.inner.read_f32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_f64(&mut self) -> StreamResult<f64> {
        self.ensure(8)?;
        let v = self.inner.read_f64::<LittleEndian>()?;
        self.pos += 8;
        Ok(v)
    }

    /// Read exactly `len` bytes.  The bound is checked before allocating,
    /// so a corrupt length cannot trigger a huge allocation.
    pub fn read_bytes(&mut self, len: u64) -> StreamResult<Vec<u8>> {
        self.ensure(len)?;
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf)?;
        self.pos += len;
        Ok(buf)
    }

    pub fn read_array<const N: usize>(&mut self) -> StreamResult<[u8; N]> {
        self.ensure(N as u64)?;
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.pos += N as u64;
        Ok(buf)
    }

    /// Stream `len` bytes into `sink` in [`COPY_CHUNK_SIZE`] pieces.
    pub fn copy_to<W: Write>(&mut self, len: u64, sink: &mut W) -> StreamResult<u64> {
        self.for_each_chunk(len, |chunk| sink.write_all(chunk))?;
        Ok(len)
    }

    /// MD5 of the next `len` bytes, computed without buffering the range.
    pub fn digest(&mut self, len: u64) -> StreamResult<[u8; 16]> {
        let mut ctx = md5::Context::new();
        self.for_each_chunk(len, |chunk| {
            ctx.consume(chunk);
            Ok(())
        })?;
        Ok(ctx.compute().0)
    }

    fn for_each_chunk(
        &mut self,
        len: u64,
        mut f: impl FnMut(&[u8]) -> io::Result<()>,
    ) -> StreamResult<()> {
        self.ensure(len)?;
        let mut buf = vec![0u8; COPY_CHUNK_SIZE.min(len as usize)];
        let mut left = len;
        while left > 0 {
            let n = (left as usize).min(buf.len());
            self.inner.read_exact(&mut buf[..n])?;
            self.pos += n as u64;
            left -= n as u64;
            f(&buf[..n])?;
        }
        Ok(())
    }
}

// ── Writes ───────────────────────────────────────────────────────────────────

impl<S: Write + Seek> ByteStream<S> {
    pub fn write_i32(&mut self, v: i32) -> StreamResult<()> {
        self.inner.write_i32::<LittleEndian>(v)?;
        self.advance(4);
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> StreamResult<()> {
        self.inner.write_u32::<LittleEndian>(v)?;
        self.advance(4);
        Ok(())
    }

    pub fn write_i64(&mut self, v: i64) -> StreamResult<()> {
        self.inner.write_i64::<LittleEndian>(v)?;
        self.advance(8);
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> StreamResult<()> {
        self.inner.write_all(bytes)?;
        self.advance(bytes.len() as u64);
        Ok(())
    }

    pub fn write_zeros(&mut self, count: u64) -> StreamResult<()> {
        const ZEROS: [u8; 16] = [0u8; 16];
        let mut left = count;
        while left > 0 {
            let n = left.min(ZEROS.len() as u64);
            self.write_bytes(&ZEROS[..n as usize])?;
            left -= n;
        }
        Ok(())
    }

    /// Copy everything `source` yields into the stream.
    pub fn write_from<R: Read>(&mut self, source: &mut R) -> StreamResult<u64> {
        let n = io::copy(source, &mut self.inner)?;
        self.advance(n);
        Ok(n)
    }

    pub fn flush(&mut self) -> StreamResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    fn advance(&mut self, n: u64) {
        self.pos += n;
        self.len = self.len.max(self.pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(bytes: &[u8]) -> ByteStream<Cursor<Vec<u8>>> {
        ByteStream::new(Cursor::new(bytes.to_vec())).unwrap()
    }

    #[test]
    fn reads_little_endian_primitives() {
        let mut s = stream(&[0x47, 0x44, 0x50, 0x43, 0xff, 0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(s.read_u32().unwrap(), 0x4350_4447);
        assert_eq!(s.read_i8().unwrap(), -1);
        assert_eq!(s.position(), 5);
        assert_eq!(s.remaining(), 4);
        assert_eq!(s.read_f32().unwrap(), 1.0);
    }

    #[test]
    fn read_past_end_is_end_of_data_and_consumes_nothing() {
        let mut s = stream(&[1, 2, 3]);
        match s.read_i32() {
            Err(StreamError::EndOfData { at: 0, need: 4, remaining: 3 }) => {}
            other => panic!("expected EndOfData, got {other:?}"),
        }
        assert_eq!(s.position(), 0);
        assert_eq!(s.read_bytes(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn huge_length_fails_before_allocating() {
        let mut s = stream(&[0u8; 8]);
        assert!(matches!(s.read_bytes(u64::MAX), Err(StreamError::EndOfData { .. })));
    }

    #[test]
    fn at_position_restores_on_success_and_failure() {
        let mut s = stream(&[10, 20, 30, 40]);
        s.read_i8().unwrap();

        let v: i8 = s.at_position(3, |s| s.read_i8()).unwrap();
        assert_eq!(v, 40);
        assert_eq!(s.position(), 1);

        let err: StreamResult<i32> = s.at_position(2, |s| s.read_i32());
        assert!(err.is_err());
        assert_eq!(s.position(), 1);
        assert_eq!(s.read_i8().unwrap(), 20);
    }

    #[test]
    fn digest_matches_one_shot_md5() {
        let data: Vec<u8> = (0u8..=255).cycle().take(COPY_CHUNK_SIZE * 2 + 17).collect();
        let mut s = stream(&data);
        assert_eq!(s.digest(data.len() as u64).unwrap(), md5::compute(&data).0);
        assert_eq!(s.remaining(), 0);
    }

    #[test]
    fn writes_extend_length_and_allow_gaps() {
        let mut s = ByteStream::new(Cursor::new(Vec::new())).unwrap();
        s.write_i32(-2).unwrap();
        s.set_position(8).unwrap();
        s.write_bytes(b"ab").unwrap();
        s.write_zeros(3).unwrap();
        assert_eq!(s.len(), 13);
        let bytes = s.into_inner().into_inner();
        assert_eq!(&bytes[..4], &(-2i32).to_le_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[8..], b"ab\0\0\0");
    }
}
