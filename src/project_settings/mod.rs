//! Packaged project settings (`project.binary`) and their text form
//! (`project.godot`).
//!
//! ```text
//! u32    magic = "ECFG"
//! i32    count
//! repeat count:
//!   i32       key_len
//!   u8[len]   key              (UTF-8, "section/name/…")
//!   i32       value_len
//!   u8[len]   encoded variant
//! ```
//!
//! Each value is decoded from its own bounded slice, so a malformed value
//! can only fail its own record and never shifts the records after it.

use std::fmt::{self, Display, Formatter};
use std::io::{Cursor, Read, Seek};
use thiserror::Error;

use crate::byte_stream::{ByteStream, StreamError};
use crate::variant::{decode_value_with, DecodeOptions, Value, VariantError};

/// `"ECFG"` read as a little-endian `u32`.
pub const MAGIC: u32 = 0x4746_4345;
pub const BINARY_FILE_NAME: &str = "project.binary";
pub const TEXT_FILE_NAME: &str = "project.godot";

const CONFIG_VERSION_KEY: &str = "config_version";
const CONFIG_VERSION: i32 = 4;

const TEXT_HEADER: &str = "\
; Engine configuration file.
; It's best edited using the editor UI and not directly,
; since the parameters that go here are not all obvious.
;
; Format:
;   [section] ; section goes between []
;   param=value ; assign values to parameters
";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Invalid project settings magic 0x{found:08x}")]
    InvalidMagic { found: u32 },
    #[error("Negative {what} length {len}")]
    NegativeLength { what: &'static str, len: i32 },
    #[error("Setting value: {0}")]
    Variant(#[from] VariantError),
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

/// Decoded settings, in stored order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectSettings {
    entries: Vec<(String, Value)>,
}

impl ProjectSettings {
    /// Decode a settings file.  Values are engine-encoded, so strings carry
    /// 4-byte padding; `max_depth` bounds container nesting.
    pub fn decode<S: Read + Seek>(stream: &mut ByteStream<S>, max_depth: usize) -> Result<Self, SettingsError> {
        let found = stream.read_u32()?;
        if found != MAGIC {
            return Err(SettingsError::InvalidMagic { found });
        }

        let opts = DecodeOptions { max_depth, padded_strings: true };
        let count = length(stream, "setting count")?;
        let mut entries = Vec::with_capacity(count.min((stream.remaining() / 8) as usize));
        for _ in 0..count {
            let key_len = length(stream, "key")?;
            let key = String::from_utf8_lossy(&stream.read_bytes(key_len as u64)?).into_owned();

            let value_len = length(stream, "value")?;
            let mut slice = ByteStream::new(Cursor::new(stream.read_bytes(value_len as u64)?))?;
            let value = decode_value_with(&mut slice, &opts)?;

            entries.push((key, value));
        }
        Ok(Self { entries })
    }

    pub fn from_bytes(bytes: &[u8], max_depth: usize) -> Result<Self, SettingsError> {
        Self::decode(&mut ByteStream::new(Cursor::new(bytes))?, max_depth)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Render as `project.godot` text.
    pub fn to_godot_text(&self) -> String {
        self.to_string()
    }
}

fn length<S: Read + Seek>(stream: &mut ByteStream<S>, what: &'static str) -> Result<usize, SettingsError> {
    let len = stream.read_i32()?;
    usize::try_from(len).map_err(|_| SettingsError::NegativeLength { what, len })
}

impl Display for ProjectSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut top: Vec<(&str, &Value)> = Vec::new();
        let mut sections: Vec<(&str, Vec<(&str, &Value)>)> = Vec::new();
        for (key, value) in &self.entries {
            match key.split_once('/') {
                None => top.push((key, value)),
                Some((section, name)) => match sections.iter_mut().find(|(s, _)| *s == section) {
                    Some((_, keys)) => keys.push((name, value)),
                    None => sections.push((section, vec![(name, value)])),
                },
            }
        }

        writeln!(f, "{TEXT_HEADER}")?;
        if self.get(CONFIG_VERSION_KEY).is_none() {
            writeln!(f, "{CONFIG_VERSION_KEY}={CONFIG_VERSION}")?;
        }
        for (key, value) in &top {
            writeln!(f, "{key}={value}")?;
        }
        for (section, keys) in &sections {
            write!(f, "\n[{section}]\n\n")?;
            for (key, value) in keys {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{TYPE_BOOL, TYPE_INT, TYPE_STRING};

    fn record(out: &mut Vec<u8>, key: &str, value: &[u8]) {
        out.extend((key.len() as i32).to_le_bytes());
        out.extend(key.as_bytes());
        out.extend((value.len() as i32).to_le_bytes());
        out.extend(value);
    }

    fn int(v: i32) -> Vec<u8> {
        [TYPE_INT.to_le_bytes(), v.to_le_bytes()].concat()
    }

    fn string(s: &str) -> Vec<u8> {
        let mut out = [TYPE_STRING.to_le_bytes(), (s.len() as i32).to_le_bytes()].concat();
        out.extend(s.as_bytes());
        out.resize(out.len().next_multiple_of(4), 0);
        out
    }

    fn settings_bytes() -> Vec<u8> {
        let mut out = MAGIC.to_le_bytes().to_vec();
        out.extend(4i32.to_le_bytes());
        record(&mut out, "application/config/name", &string("Demo"));
        record(&mut out, "display/window/size/width", &int(1024));
        record(&mut out, "application/run/main_scene", &string("res://main.tscn"));
        record(&mut out, "editor_hint", &[TYPE_BOOL.to_le_bytes(), 1i32.to_le_bytes()].concat());
        out
    }

    #[test]
    fn decodes_records_in_order() {
        let settings = ProjectSettings::from_bytes(&settings_bytes(), 16).unwrap();
        assert_eq!(settings.len(), 4);
        assert_eq!(settings.entries()[0].0, "application/config/name");
        assert_eq!(settings.get("display/window/size/width"), Some(&Value::Int(1024)));
        assert_eq!(settings.get("editor_hint"), Some(&Value::Bool(true)));
    }

    #[test]
    fn renders_sections_in_first_seen_order() {
        let text = ProjectSettings::from_bytes(&settings_bytes(), 16).unwrap().to_godot_text();
        let body = text.strip_prefix(TEXT_HEADER).unwrap();
        assert_eq!(
            body,
            "\nconfig_version=4\neditor_hint=true\n\
             \n[application]\n\nconfig/name=\"Demo\"\nrun/main_scene=\"res://main.tscn\"\n\
             \n[display]\n\nwindow/size/width=1024\n",
        );
    }

    #[test]
    fn stored_config_version_is_not_duplicated() {
        let mut bytes = MAGIC.to_le_bytes().to_vec();
        bytes.extend(1i32.to_le_bytes());
        record(&mut bytes, "config_version", &int(3));
        let text = ProjectSettings::from_bytes(&bytes, 16).unwrap().to_godot_text();
        assert_eq!(text.matches("config_version=").count(), 1);
        assert!(text.contains("config_version=3\n"));
    }

    #[test]
    fn wrong_magic() {
        let err = ProjectSettings::from_bytes(b"GDPC\0\0\0\0", 16).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidMagic { found: 0x4350_4447 }));
    }

    #[test]
    fn bad_value_is_contained_in_its_slice() {
        let mut bytes = MAGIC.to_le_bytes().to_vec();
        bytes.extend(1i32.to_le_bytes());
        record(&mut bytes, "x", &[0xff, 0, 0, 0]);
        assert!(matches!(
            ProjectSettings::from_bytes(&bytes, 16),
            Err(SettingsError::Variant(VariantError::UnknownVariantType(..))),
        ));
    }

    #[test]
    fn negative_key_length() {
        let mut bytes = MAGIC.to_le_bytes().to_vec();
        bytes.extend(1i32.to_le_bytes());
        bytes.extend((-5i32).to_le_bytes());
        assert!(matches!(
            ProjectSettings::from_bytes(&bytes, 16),
            Err(SettingsError::NegativeLength { what: "key", len: -5 }),
        ));
    }
}
