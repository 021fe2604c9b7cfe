//! Error types for slide deck compilation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling markdown into a slide deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The markdown input is empty or cannot be parsed into slides.
    #[error("Malformed markdown input: {0}")]
    MalformedInput(String),

    /// ZIP archive error (template read or package write).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or rewriting error.
    #[error("XML error: {0}")]
    XmlError(String),

    /// The template package is missing required parts or structure.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Failed to serialize the finished deck.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
