//! Error types for expdf.

use std::io;
use thiserror::Error;

/// Result type alias for expdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// Every error is fatal to the extraction pass it occurs in; the kind only
/// tells the host why the input was routed to failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not a readable PDF document.
    Decode,
    /// A page, resource table, image or text layout could not be processed.
    Extraction,
    /// The extraction configuration is missing or invalid.
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Decode => write!(f, "decode"),
            ErrorKind::Extraction => write!(f, "extraction"),
            ErrorKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// Error types that can occur during extraction.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the input or writing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input does not start with a PDF header.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF structure could not be decoded.
    #[error("PDF decoding error: {0}")]
    Decode(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// A page's resource dictionary is malformed.
    #[error("Page {page}: invalid resource table: {message}")]
    ResourceTable { page: u32, message: String },

    /// An embedded image could not be decoded into pixels.
    #[error("Page {page}, image {image}: {message}")]
    ImageDecode {
        page: u32,
        image: u32,
        message: String,
    },

    /// A page's content stream could not be interpreted.
    #[error("Page {page}: invalid content stream: {message}")]
    PageContent { page: u32, message: String },

    /// Decoded pixels could not be encoded in the configured format.
    #[error("Image encoding error: {0}")]
    Encode(String),

    /// A required configuration property is not set.
    #[error("Missing required property: {0}")]
    MissingProperty(&'static str),

    /// A configuration property has a value outside its allowed set.
    #[error("Invalid value {value:?} for property {name}: {reason}")]
    InvalidProperty {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::UnknownFormat | Error::Decode(_) | Error::Encrypted => {
                ErrorKind::Decode
            }
            Error::ResourceTable { .. }
            | Error::ImageDecode { .. }
            | Error::PageContent { .. }
            | Error::Encode(_)
            | Error::Other(_) => ErrorKind::Extraction,
            Error::MissingProperty(_)
            | Error::InvalidProperty { .. }
            | Error::InvalidPageRange(_) => ErrorKind::Configuration,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Decode(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Encode(err.to_string())
    }
}
