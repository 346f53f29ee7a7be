use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::byte_stream::StreamError;
use crate::header::HeaderError;
use crate::project_settings::SettingsError;

pub type Result<T> = std::result::Result<T, PckError>;

/// Errors from parsing, packing and extracting containers.
///
/// A checksum mismatch is not an error: it is reported per entry through
/// [`crate::index::FileEntry::broken`].
#[derive(Error, Debug)]
pub enum PckError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Negative {field} {value} in index entry {index}")]
    NegativeField { index: usize, field: &'static str, value: i64 },
    #[error("Container holds too many files to index: {0}")]
    TooManyFiles(usize),
    #[error("Path {0:?} is too long for an index entry")]
    PathTooLong(String),
    #[error("Source for {0:?} changed size while packing")]
    SourceChanged(String),
    #[error("File \"{}\" already exists", .0.display())]
    DestinationExists(PathBuf),
    #[error("No entry matches {0:?}")]
    EntryNotFound(String),
    #[error("Entry path {0:?} escapes the destination directory")]
    UnsafeEntryPath(String),
    #[error("Path {} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
}
