//! Utility modules.

pub mod file;
pub mod text;

pub use file::{calculate_checksum, display_name, extension_of, is_text_extension};
pub use text::{normalize_extracted_text, preview};
