pub mod byte_stream;
pub mod error;
pub mod header;
pub mod index;
pub mod io_stream;
pub mod pck;
pub mod project_settings;
pub mod variant;

pub use byte_stream::{ByteStream, StreamError};
pub use error::{PckError, Result};
pub use header::{PckHeader, Version};
pub use index::{layout, FileEntry, PackLayout};
pub use io_stream::{PckReader, PckWriter};
pub use pck::{format_size, Pck, PckOptions};
pub use project_settings::ProjectSettings;
pub use variant::{decode_value, decode_value_with, DecodeOptions, Value, VariantError};
