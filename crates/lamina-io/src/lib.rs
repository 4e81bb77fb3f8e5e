//! # Lamina I/O
//!
//! Readers and writers for the Lamina binary document format (the
//! lump-based `.lam` file carrying the action log and texture assets) and
//! the human-readable JSON project metadata kept alongside it.

pub mod format;
pub mod project;

pub use format::{
    decode_document, encode_document, read_document, write_document, FormatError,
};
pub use project::ProjectMeta;
