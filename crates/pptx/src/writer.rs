//! Finished-deck serialization.

use deck_core::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// MIME type of the produced artifact.
pub const PPTX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// The assembled output document, ready for serialization.
///
/// Owned by the assembler during construction; after handoff the only
/// remaining operation is [`RenderedDeck::into_bytes`]. No partial output
/// is ever produced: serialization either completes or fails.
#[derive(Debug)]
pub struct RenderedDeck {
    /// Part path -> raw bytes, in deterministic order.
    pub(crate) parts: BTreeMap<String, Vec<u8>>,
    /// Number of slides in the deck.
    pub(crate) slide_count: usize,
}

impl RenderedDeck {
    /// Number of slides in the deck.
    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    /// Whether the deck contains a part with the given path.
    pub fn has_part(&self, path: &str) -> bool {
        self.parts.contains_key(path)
    }

    /// Serialize the deck into an in-memory `.pptx` ZIP buffer.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, bytes) in &self.parts {
            writer
                .start_file(path.as_str(), options)
                .map_err(|e| Error::SerializationError(format!("Failed to add '{}': {}", path, e)))?;
            writer
                .write_all(bytes)
                .map_err(|e| Error::SerializationError(format!("Failed to write '{}': {}", path, e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::SerializationError(format!("Failed to finish package: {}", e)))?;

        Ok(cursor.into_inner())
    }
}
