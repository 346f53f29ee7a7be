//! File index: one row per packed file, directly after the header.
//!
//! ```text
//! i32          file_count
//! repeat file_count:
//!   i32        path_len        (includes NUL padding when aligned)
//!   u8[len]    path            ("res://…", NUL-padded to 4 bytes when aligned)
//!   i64        data_offset     (absolute)
//!   i64        data_size
//!   u8[16]     md5             (of the data range)
//! ```
//!
//! Packing computes every row up front with [`layout`], so the index pass
//! and the data pass consume the same immutable offsets.

use serde::{Serialize, Serializer};
use std::io::{Read, Seek, Write};

use crate::byte_stream::ByteStream;
use crate::error::{PckError, Result};
use crate::header::HEADER_SIZE;

/// Prefix of every engine resource path.
pub const RES_PREFIX: &str = "res://";
/// Offset of the first index row: header plus the file count.
pub const INDEX_START: u64 = HEADER_SIZE + 4;
/// Path fields are padded to this multiple when aligning.
pub const PATH_ALIGN: u64 = 4;
/// The data section and each data block start on this multiple when aligning.
pub const DATA_ALIGN: u64 = 16;
/// Offset, size and checksum fields of a row.
const ROW_TAIL_SIZE: u64 = 8 + 8 + 16;

// ── FileEntry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Engine path, normally `res://`-prefixed, with NUL padding removed.
    pub path:     String,
    pub offset:   u64,
    pub size:     u64,
    #[serde(serialize_with = "as_hex")]
    pub checksum: [u8; 16],
    /// Set when the MD5 of the data range differs from `checksum`.
    pub broken:   bool,
}

impl FileEntry {
    /// Read one index row.  `broken` starts out false; the reader sets it
    /// after verifying the data range.
    pub fn read<S: Read + Seek>(stream: &mut ByteStream<S>, index: usize) -> Result<Self> {
        let path_len = non_negative(index, "path length", i64::from(stream.read_i32()?))?;
        let mut raw = stream.read_bytes(path_len)?;
        raw.retain(|&b| b != 0);
        let path = String::from_utf8_lossy(&raw).into_owned();

        let offset   = non_negative(index, "data offset", stream.read_i64()?)?;
        let size     = non_negative(index, "data size", stream.read_i64()?)?;
        let checksum = stream.read_array::<16>()?;

        Ok(Self { path, offset, size, checksum, broken: false })
    }

    /// Path with the `res://` prefix removed.
    pub fn relative_path(&self) -> &str {
        self.path.strip_prefix(RES_PREFIX).unwrap_or(&self.path)
    }

    pub fn checksum_hex(&self) -> String {
        hex::encode(self.checksum)
    }

    /// Exact path, or path without its `res://` prefix.
    pub fn matches(&self, name: &str) -> bool {
        self.path == name || self.relative_path() == name
    }
}

fn non_negative(index: usize, field: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| PckError::NegativeField { index, field, value })
}

fn as_hex<S: Serializer>(bytes: &[u8; 16], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Round `value` up to the next multiple of `align`.
pub fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

/// One planned index row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRow {
    pub path:     String,
    /// Length written to the path field, padding included.
    pub path_len: u64,
    pub offset:   u64,
    pub size:     u64,
}

impl LayoutRow {
    pub fn padding(&self) -> u64 {
        self.path_len - self.path.len() as u64
    }

    pub fn write<S: Write + Seek>(&self, stream: &mut ByteStream<S>, checksum: &[u8; 16]) -> Result<()> {
        let path_len = i32::try_from(self.path_len)
            .map_err(|_| PckError::PathTooLong(self.path.clone()))?;
        stream.write_i32(path_len)?;
        stream.write_bytes(self.path.as_bytes())?;
        stream.write_zeros(self.padding())?;
        stream.write_i64(self.offset as i64)?;
        stream.write_i64(self.size as i64)?;
        stream.write_bytes(checksum)?;
        Ok(())
    }
}

/// Complete placement of a container's index and data blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackLayout {
    pub rows:       Vec<LayoutRow>,
    /// First byte after the index, before data alignment.
    pub index_end:  u64,
    /// Offset of the first data block.
    pub data_start: u64,
    /// Total container size once every block (and its padding) is written.
    pub end:        u64,
}

/// Plan the index rows and data offsets for `files` (engine path, size) in
/// the given order.
///
/// With `align`, paths are NUL-padded to [`PATH_ALIGN`], and the data
/// section plus every data block start on a [`DATA_ALIGN`] boundary.
/// Without it everything is packed back to back.
pub fn layout<'a, I>(files: I, align: bool) -> PackLayout
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut rows: Vec<LayoutRow> = files
        .into_iter()
        .map(|(path, size)| {
            let raw = path.len() as u64;
            LayoutRow {
                path:     path.to_owned(),
                path_len: if align { align_up(raw, PATH_ALIGN) } else { raw },
                offset:   0,
                size,
            }
        })
        .collect();

    let index_end = rows
        .iter()
        .fold(INDEX_START, |at, row| at + 4 + row.path_len + ROW_TAIL_SIZE);
    let data_start = if align { align_up(index_end, DATA_ALIGN) } else { index_end };

    let mut cursor = data_start;
    for row in rows.iter_mut() {
        row.offset = cursor;
        cursor += row.size;
        if align {
            cursor = align_up(cursor, DATA_ALIGN);
        }
    }

    let end = if rows.is_empty() { index_end } else { cursor };
    PackLayout { rows, index_end, data_start, end }
}
