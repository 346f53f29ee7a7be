use serde::Serialize;
use std::fmt;
use std::io::{Read, Seek, Write};
use std::str::FromStr;
use thiserror::Error;

use crate::byte_stream::{ByteStream, StreamError};

/// `"GDPC"` read as a little-endian `u32`.
pub const MAGIC: u32 = 0x4350_4447;
/// Highest container format version this crate reads and the one it writes.
pub const FORMAT_VERSION: i32 = 1;
/// Reserved `i32` slots after the engine version.
pub const RESERVED_WORDS: usize = 16;
/// Magic + format version + engine version + reserved block.
pub const HEADER_SIZE: u64 = 4 + 4 + 3 * 4 + RESERVED_WORDS as u64 * 4;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Invalid magic 0x{found:08x}: not a .pck file (embedded packs are not supported)")]
    InvalidMagic { found: u32 },
    #[error("Unsupported pack format version: {0}")]
    UnsupportedFormatVersion(i32),
    #[error("Invalid version string {0:?}: expected major.minor.patch")]
    InvalidVersionString(String),
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

// ── Version ──────────────────────────────────────────────────────────────────

/// Engine version stamped into a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn read<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<Self, StreamError> {
        Ok(Self {
            major: stream.read_u32()?,
            minor: stream.read_u32()?,
            patch: stream.read_u32()?,
        })
    }

    pub fn write<S: Write + Seek>(&self, stream: &mut ByteStream<S>) -> Result<(), StreamError> {
        stream.write_u32(self.major)?;
        stream.write_u32(self.minor)?;
        stream.write_u32(self.patch)?;
        Ok(())
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(3, 2, 2)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = HeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HeaderError::InvalidVersionString(s.to_owned());
        let parts: Vec<u32> = s
            .split('.')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;
        match parts[..] {
            [major, minor, patch] => Ok(Self::new(major, minor, patch)),
            _                     => Err(invalid()),
        }
    }
}

// ── PckHeader ────────────────────────────────────────────────────────────────

/// Fixed-size container header.  The file count that follows belongs to the
/// index (see [`crate::index`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PckHeader {
    /// Signed on disk; anything up to [`FORMAT_VERSION`] is accepted.
    pub format_version: i32,
    pub engine_version: Version,
}

impl PckHeader {
    pub fn new(engine_version: Version) -> Self {
        Self { format_version: FORMAT_VERSION, engine_version }
    }

    pub fn read<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<Self, HeaderError> {
        let found = stream.read_u32()?;
        if found != MAGIC {
            return Err(HeaderError::InvalidMagic { found });
        }
        let format_version = stream.read_i32()?;
        if format_version > FORMAT_VERSION {
            return Err(HeaderError::UnsupportedFormatVersion(format_version));
        }
        let engine_version = Version::read(stream)?;
        // Reserved slots are not interpreted.
        stream.read_array::<{ RESERVED_WORDS * 4 }>()?;
        Ok(Self { format_version, engine_version })
    }

    pub fn write<S: Write + Seek>(&self, stream: &mut ByteStream<S>) -> Result<(), StreamError> {
        stream.write_u32(MAGIC)?;
        stream.write_i32(self.format_version)?;
        self.engine_version.write(stream)?;
        stream.write_zeros(RESERVED_WORDS as u64 * 4)?;
        Ok(())
    }
}

impl Default for PckHeader {
    fn default() -> Self {
        Self::new(Version::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn written(header: &PckHeader) -> Vec<u8> {
        let mut s = ByteStream::new(Cursor::new(Vec::new())).unwrap();
        header.write(&mut s).unwrap();
        s.into_inner().into_inner()
    }

    #[test]
    fn header_roundtrip() {
        let header = PckHeader::new(Version::new(3, 5, 1));
        let bytes = written(&header);
        assert_eq!(bytes.len() as u64, HEADER_SIZE);
        assert_eq!(&bytes[..4], b"GDPC");

        let mut s = ByteStream::new(Cursor::new(bytes)).unwrap();
        assert_eq!(PckHeader::read(&mut s).unwrap(), header);
        assert_eq!(s.position(), HEADER_SIZE);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = written(&PckHeader::default());
        bytes[0] = b'X';
        let mut s = ByteStream::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(PckHeader::read(&mut s), Err(HeaderError::InvalidMagic { .. })));
    }

    #[test]
    fn rejects_newer_format() {
        let header = PckHeader { format_version: 2, ..PckHeader::default() };
        let mut s = ByteStream::new(Cursor::new(written(&header))).unwrap();
        assert!(matches!(PckHeader::read(&mut s), Err(HeaderError::UnsupportedFormatVersion(2))));
    }

    #[test]
    fn negative_format_version_is_accepted() {
        let mut bytes = written(&PckHeader::default());
        bytes[4..8].copy_from_slice(&(-1i32).to_le_bytes());
        let mut s = ByteStream::new(Cursor::new(bytes)).unwrap();
        let header = PckHeader::read(&mut s).unwrap();
        assert_eq!(header.format_version, -1);
        assert_eq!(s.position(), HEADER_SIZE);
    }

    #[test]
    fn version_parse() {
        assert_eq!("3.2.2".parse::<Version>().unwrap(), Version::new(3, 2, 2));
        assert_eq!(Version::new(4, 0, 1).to_string(), "4.0.1");
        for bad in ["3.2", "3.2.2.1", "a.b.c", ""] {
            assert!(matches!(bad.parse::<Version>(), Err(HeaderError::InvalidVersionString(_))), "{bad}");
        }
    }
}
