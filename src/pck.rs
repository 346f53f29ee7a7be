//! High-level [`Pck`] API over container files on disk.
//!
//! ```no_run
//! use pcktool::pck::{Pck, PckOptions};
//!
//! // Pack a directory, then read a file back
//! let mut pck = Pck::pack("game/", "game.pck", PckOptions::default())?;
//! let icon = pck.view_file("res://icon.png")?;
//!
//! // Extract everything that passed checksum verification
//! let mut pck = Pck::open("game.pck", PckOptions::default())?;
//! pck.extract_all("out/")?;
//! # Ok::<(), pcktool::error::PckError>(())
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::byte_stream::ByteStream;
use crate::error::{PckError, Result};
use crate::header::{PckHeader, Version, FORMAT_VERSION};
use crate::index::{layout, FileEntry, RES_PREFIX};
use crate::io_stream::{PckReader, PckWriter};
use crate::project_settings::{ProjectSettings, BINARY_FILE_NAME, TEXT_FILE_NAME};
use crate::variant::DEFAULT_MAX_DEPTH;

// ── PckOptions ────────────────────────────────────────────────────────────────

/// Configuration for opening, packing and extracting containers.
#[derive(Debug, Clone)]
pub struct PckOptions {
    /// Overwrite existing files on extraction.
    pub force:                   bool,
    /// Leave entries with a checksum mismatch out of extraction.
    pub skip_broken:             bool,
    /// Pad paths to 4 bytes and data blocks to 16 bytes when packing.
    pub align:                   bool,
    /// Write `project.godot` next to every extracted `project.binary`.
    pub decode_project_settings: bool,
    pub engine_version:          Version,
    pub format_version:          i32,
    pub max_decode_depth:        usize,
}

impl Default for PckOptions {
    fn default() -> Self {
        Self {
            force:                   false,
            skip_broken:             true,
            align:                   true,
            decode_project_settings: true,
            engine_version:          Version::default(),
            format_version:          FORMAT_VERSION,
            max_decode_depth:        DEFAULT_MAX_DEPTH,
        }
    }
}

// ── Pck ───────────────────────────────────────────────────────────────────────

pub struct Pck {
    path:    PathBuf,
    reader:  PckReader<BufReader<File>>,
    options: PckOptions,
}

/// A regular file found under the source directory.
struct Source {
    fs_path:  PathBuf,
    res_path: String,
    size:     u64,
}

impl Pck {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Parse a container.  Every entry is checksummed before this returns.
    pub fn open<P: AsRef<Path>>(path: P, options: PckOptions) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let reader = PckReader::new(BufReader::new(File::open(&path)?))?;
        debug!(path = %path.display(), files = reader.entries.len(), "opened container");
        Ok(Self { path, reader, options })
    }

    /// Pack every regular file under `source_dir` into a new container at
    /// `pck_path`, then open the result.
    ///
    /// Files are taken in walk order, sorted by name within each directory.
    /// A top-level `project.godot` is left out.
    pub fn pack<P, Q>(source_dir: P, pck_path: Q, options: PckOptions) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let output = fs::canonicalize(pck_path.as_ref()).ok();
        let sources = collect_sources(source_dir.as_ref(), output.as_deref())?;
        let plan = layout(sources.iter().map(|s| (s.res_path.as_str(), s.size)), options.align);

        let header = PckHeader {
            format_version: options.format_version,
            engine_version: options.engine_version,
        };
        let file = BufWriter::new(File::create(pck_path.as_ref())?);
        let mut writer = PckWriter::new(file, header)?;
        writer.write_pack(&plan, |i, _| File::open(&sources[i].fs_path).map(BufReader::new))?;
        writer.into_inner().flush()?;

        info!(
            "Packed {} file(s) into {} ({})",
            plan.rows.len(),
            pck_path.as_ref().display(),
            format_size(plan.end),
        );
        Self::open(pck_path, options)
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PckHeader {
        &self.reader.header
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.reader.entries
    }

    pub fn options(&self) -> &PckOptions {
        &self.options
    }

    /// Resolve an entry by index (when `identifier` is a number) or by path,
    /// with or without the `res://` prefix.
    pub fn find(&self, identifier: &str) -> Option<&FileEntry> {
        match identifier.parse::<usize>() {
            Ok(i)  => self.entries().get(i),
            Err(_) => self.entries().iter().find(|e| e.matches(identifier)),
        }
    }

    // ── Read ──────────────────────────────────────────────────────────────────

    /// Raw bytes of the entry `identifier` resolves to (see [`Pck::find`]).
    pub fn view_file(&mut self, identifier: &str) -> Result<Vec<u8>> {
        let entry = self
            .find(identifier)
            .cloned()
            .ok_or_else(|| PckError::EntryNotFound(identifier.to_owned()))?;
        self.reader.read_entry(&entry)
    }

    /// Extract all entries into `dest`, creating it if necessary.
    ///
    /// Broken entries are skipped unless `skip_broken` is off.  An existing
    /// destination file fails with [`PckError::DestinationExists`] unless
    /// `force` is set.
    pub fn extract_all<P: AsRef<Path>>(&mut self, dest: P) -> Result<()> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;

        let entries = self.reader.entries.clone();
        for entry in &entries {
            if entry.broken {
                if self.options.skip_broken {
                    info!("Skipping: {:?}", entry.path);
                    continue;
                }
                warn!(path = %entry.path, "extracting entry with checksum mismatch");
            }

            let target = dest.join(safe_relative_path(entry)?);
            info!("Extract: {:?}", entry.path);
            if target.exists() && !self.options.force {
                return Err(PckError::DestinationExists(target));
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut out = BufWriter::new(File::create(&target)?);
            self.reader.copy_entry(entry, &mut out)?;
            out.flush()?;

            if self.options.decode_project_settings
                && target.file_name().is_some_and(|n| n == BINARY_FILE_NAME)
            {
                if let Err(e) = self.write_project_text(&target) {
                    warn!(path = %target.display(), error = %e, "project settings not decoded");
                }
            }
        }
        Ok(())
    }

    fn write_project_text(&self, binary: &Path) -> Result<()> {
        let text_path = binary.with_file_name(TEXT_FILE_NAME);
        info!("Decode: {} -> {}", binary.display(), text_path.display());
        if text_path.exists() && !self.options.force {
            return Err(PckError::DestinationExists(text_path));
        }

        let mut stream = ByteStream::new(BufReader::new(File::open(binary)?))?;
        let settings = ProjectSettings::decode(&mut stream, self.options.max_decode_depth)?;
        fs::write(&text_path, settings.to_godot_text())?;
        Ok(())
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Regular files under `root`, minus the top-level `project.godot` and the
/// container being written when it already exists inside `root`.  Symlinks
/// are followed and packed under the link's own path.
fn collect_sources(root: &Path, output: Option<&Path>) -> Result<Vec<Source>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if relative == Path::new(TEXT_FILE_NAME) {
            debug!("not packing top-level {TEXT_FILE_NAME}");
            continue;
        }
        if output.is_some() && fs::canonicalize(entry.path()).ok().as_deref() == output {
            continue;
        }

        let segments = relative
            .components()
            .map(|c| c.as_os_str().to_str().ok_or_else(|| PckError::NonUtf8Path(entry.path().to_owned())))
            .collect::<Result<Vec<_>>>()?;
        let res_path = format!("{RES_PREFIX}{}", segments.join("/"));
        let size = entry.metadata()?.len();

        info!("Pack: {} -> {} ({})", entry.path().display(), res_path, format_size(size));
        sources.push(Source { fs_path: entry.into_path(), res_path, size });
    }
    Ok(sources)
}

/// Entry path relative to an extraction root.  Rejects anything that would
/// land outside it.
fn safe_relative_path(entry: &FileEntry) -> Result<&Path> {
    let relative = Path::new(entry.relative_path());
    let normal = relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !normal || relative.file_name().is_none() {
        return Err(PckError::UnsafeEntryPath(entry.path.clone()));
    }
    Ok(relative)
}

/// Human-readable size: `1 byte`, `512 bytes`, `3 KB`, `12 MB`…
///
/// Sizes above 1 KiB are divided down with integer division, so `2047`
/// bytes reads as `1 KB`.
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    match size {
        0..=1    => format!("{size} byte"),
        2..=1024 => format!("{size} bytes"),
        _ => {
            let mut scaled = size;
            let mut unit = 0;
            while scaled > 1024 && unit < UNITS.len() {
                scaled /= 1024;
                unit += 1;
            }
            format!("{scaled} {}", UNITS[unit - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> FileEntry {
        FileEntry { path: path.into(), offset: 0, size: 0, checksum: [0; 16], broken: false }
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), "0 byte");
        assert_eq!(format_size(1), "1 byte");
        assert_eq!(format_size(5), "5 bytes");
        assert_eq!(format_size(1024), "1024 bytes");
        assert_eq!(format_size(1025), "1 KB");
        assert_eq!(format_size(2047), "1 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_size(3 << 40), "3 TB");
        assert_eq!(format_size(2048 << 40), "2048 TB");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(safe_relative_path(&entry("res://a/b.txt")).unwrap(), Path::new("a/b.txt"));
        assert_eq!(safe_relative_path(&entry("plain.txt")).unwrap(), Path::new("plain.txt"));
        for bad in ["res://../escape", "res:///etc/passwd", "res://a/../../b", "res://"] {
            assert!(
                matches!(safe_relative_path(&entry(bad)), Err(PckError::UnsafeEntryPath(_))),
                "{bad}",
            );
        }
    }
}
