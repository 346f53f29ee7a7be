//! Container engine over generic streams: reader and writer.
//!
//! # Reader
//! [`PckReader`] reads the header, then the whole index.  Every entry's
//! data range is hashed as soon as its row is read, with the cursor put
//! back afterwards, so `broken` is known before any extraction happens.
//! A range that runs past the end of the container fails the parse.
//!
//! # Writer
//! [`PckWriter`] consumes a [`PackLayout`] computed up front.  The index
//! pass hashes each source and writes its row; the data pass seeks to each
//! planned offset and copies the bytes, followed by alignment padding.
//! Neither pass computes an offset of its own.

use std::io::{self, Read, Seek, Write};
use tracing::{debug, warn};

use crate::byte_stream::ByteStream;
use crate::error::{PckError, Result};
use crate::header::PckHeader;
use crate::index::{FileEntry, LayoutRow, PackLayout, INDEX_START};

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct PckReader<R: Read + Seek> {
    stream:      ByteStream<R>,
    pub header:  PckHeader,
    pub entries: Vec<FileEntry>,
}

impl<R: Read + Seek> PckReader<R> {
    /// Parse the header and index of a container and verify every entry.
    pub fn new(reader: R) -> Result<Self> {
        let mut stream = ByteStream::new(reader)?;
        let header = PckHeader::read(&mut stream)?;

        let count = stream.read_i32()?;
        let count = usize::try_from(count).map_err(|_| PckError::NegativeField {
            index: 0,
            field: "file count",
            value: i64::from(count),
        })?;

        // Each row takes at least 36 bytes; a corrupt count must not size the Vec.
        let mut entries = Vec::with_capacity(count.min((stream.remaining() / 36) as usize));
        for index in 0..count {
            let mut entry = FileEntry::read(&mut stream, index)?;
            let digest = stream.at_position(entry.offset, |s| s.digest(entry.size))?;
            entry.broken = digest != entry.checksum;
            if entry.broken {
                warn!(path = %entry.path, "checksum mismatch");
            }
            entries.push(entry);
        }
        debug!(
            files = entries.len(),
            broken = entries.iter().filter(|e| e.broken).count(),
            "index read",
        );

        Ok(Self { stream, header, entries })
    }

    /// Raw bytes of `entry`, read without moving the index cursor.
    pub fn read_entry(&mut self, entry: &FileEntry) -> Result<Vec<u8>> {
        Ok(self.stream.at_position(entry.offset, |s| s.read_bytes(entry.size))?)
    }

    /// Stream the bytes of `entry` into `sink`.
    pub fn copy_entry<W: Write>(&mut self, entry: &FileEntry, sink: &mut W) -> Result<u64> {
        Ok(self.stream.at_position(entry.offset, |s| s.copy_to(entry.size, sink))?)
    }

    /// Total container length in bytes.
    pub fn len(&self) -> u64 {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct PckWriter<W: Write + Seek> {
    stream:     ByteStream<W>,
    pub header: PckHeader,
}

impl<W: Write + Seek> PckWriter<W> {
    pub fn new(writer: W, header: PckHeader) -> Result<Self> {
        Ok(Self { stream: ByteStream::new(writer)?, header })
    }

    /// Write a complete container for `plan`.
    ///
    /// `open` is called twice per row, once for each pass, and must yield
    /// the same bytes both times.  A source that yields fewer bytes than
    /// planned fails with [`PckError::SourceChanged`].
    pub fn write_pack<S, F>(&mut self, plan: &PackLayout, mut open: F) -> Result<()>
    where
        S: Read,
        F: FnMut(usize, &LayoutRow) -> io::Result<S>,
    {
        let count = i32::try_from(plan.rows.len())
            .map_err(|_| PckError::TooManyFiles(plan.rows.len()))?;

        // Pass 1: header and index.
        self.stream.set_position(0)?;
        self.header.write(&mut self.stream)?;
        self.stream.write_i32(count)?;
        debug_assert_eq!(self.stream.position(), INDEX_START);
        for (i, row) in plan.rows.iter().enumerate() {
            let checksum = digest_source(open(i, row)?, row)?;
            row.write(&mut self.stream, &checksum)?;
        }
        if !plan.rows.is_empty() {
            self.stream.write_zeros(plan.data_start - plan.index_end)?;
        }

        // Pass 2: data blocks at their planned offsets.
        for (i, row) in plan.rows.iter().enumerate() {
            self.stream.set_position(row.offset)?;
            let mut source = open(i, row)?.take(row.size);
            let written = self.stream.write_from(&mut source)?;
            if written != row.size {
                return Err(PckError::SourceChanged(row.path.clone()));
            }
            let block_end = plan.rows.get(i + 1).map_or(plan.end, |next| next.offset);
            self.stream.write_zeros(block_end - (row.offset + row.size))?;
        }

        self.stream.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.stream.into_inner()
    }
}

fn digest_source<S: Read>(source: S, row: &LayoutRow) -> Result<[u8; 16]> {
    let mut ctx = md5::Context::new();
    let hashed = io::copy(&mut source.take(row.size), &mut ctx)?;
    if hashed != row.size {
        return Err(PckError::SourceChanged(row.path.clone()));
    }
    Ok(ctx.compute().0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Version;
    use crate::index::layout;
    use std::io::Cursor;

    fn packed(files: &[(&str, &[u8])], align: bool) -> Vec<u8> {
        let plan = layout(files.iter().map(|(p, d)| (*p, d.len() as u64)), align);
        let mut w = PckWriter::new(Cursor::new(Vec::new()), PckHeader::new(Version::new(3, 2, 2))).unwrap();
        w.write_pack(&plan, |i, _| Ok(files[i].1)).unwrap();
        let bytes = w.into_inner().into_inner();
        assert_eq!(bytes.len() as u64, plan.end);
        bytes
    }

    #[test]
    fn write_then_read() {
        let files: &[(&str, &[u8])] = &[("res://a.txt", b"hello"), ("res://sub/b.bin", b"\x01")];
        for align in [true, false] {
            let mut r = PckReader::new(Cursor::new(packed(files, align))).unwrap();
            assert_eq!(r.header.engine_version, Version::new(3, 2, 2));
            assert_eq!(r.entries.len(), 2);
            let entries = r.entries.clone();
            for (entry, (path, data)) in entries.iter().zip(files) {
                assert_eq!(entry.path, *path);
                assert!(!entry.broken);
                assert_eq!(entry.checksum, md5::compute(data).0);
                assert_eq!(r.read_entry(entry).unwrap(), *data);
            }
        }
    }

    #[test]
    fn aligned_blocks_start_on_sixteen() {
        let bytes = packed(&[("res://x", b"123"), ("res://y", b"45678")], true);
        let r = PckReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.entries.iter().all(|e| e.offset % 16 == 0));
    }

    #[test]
    fn corrupt_byte_marks_only_that_entry() {
        let files: &[(&str, &[u8])] = &[("res://a", b"aaaa"), ("res://b", b"bbbb")];
        let mut bytes = packed(files, true);
        let offset = PckReader::new(Cursor::new(bytes.clone())).unwrap().entries[1].offset;
        bytes[offset as usize] ^= 0xff;

        let r = PckReader::new(Cursor::new(bytes)).unwrap();
        assert!(!r.entries[0].broken);
        assert!(r.entries[1].broken);
    }

    #[test]
    fn range_past_end_fails_parse() {
        let mut bytes = packed(&[("res://a", b"0123456789")], false);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            PckReader::new(Cursor::new(bytes)),
            Err(PckError::Stream(crate::byte_stream::StreamError::EndOfData { .. })),
        ));
    }

    #[test]
    fn empty_container() {
        let bytes = packed(&[], true);
        assert_eq!(bytes.len() as u64, INDEX_START);
        let r = PckReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.entries.is_empty());
    }

    #[test]
    fn short_source_is_reported() {
        let plan = layout([("res://a", 10)], true);
        let mut w = PckWriter::new(Cursor::new(Vec::new()), PckHeader::default()).unwrap();
        let err = w.write_pack(&plan, |_, _| Ok(&b"short"[..])).unwrap_err();
        assert!(matches!(err, PckError::SourceChanged(p) if p == "res://a"));
    }
}
