//! Audio format and MIME lookup tables
//!
//! Pure tables: no decoding and no file I/O happen here.

mod format;
mod mime;

pub use format::AudioFormat;
pub use mime::{mime_for_path, mime_type};
