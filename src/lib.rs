//! # expdf
//!
//! Atomic per-page extraction of embedded images and region text from PDF
//! documents.
//!
//! One operation takes one PDF input and produces either every output unit
//! of the pass or none of them: images are decoded from each page's XObject
//! resource table and re-encoded as TIFF or PNG, text is captured from a
//! fixed region of each page. The input itself is always handed back, routed
//! to `original` on success or to `failure` on error.
//!
//! ## Quick Start
//!
//! ```no_run
//! use expdf::{process_file, ExtractConfig, Outcome};
//!
//! fn main() -> expdf::Result<()> {
//!     let config = ExtractConfig::images().with_image_size(true);
//!
//!     match process_file("document.pdf", &config)? {
//!         Outcome::Committed { units, .. } => {
//!             for unit in &units {
//!                 println!("{} ({} bytes)", unit.suggested_filename("document"), unit.size());
//!             }
//!         }
//!         Outcome::Failed { message, .. } => eprintln!("failed: {}", message),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Image extraction**: raw, Flate, LZW, RunLength, ASCII and DCT streams;
//!   gray, RGB, CMYK, indexed and ICC color spaces
//! - **Region text**: glyphs inside a capture region, laid out line by line
//! - **Page selection**: `1,3,5-7` style page ranges
//! - **All-or-nothing output**: nothing is released unless every page succeeds

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;

pub use config::{CaptureRegion, ContentKind, ExtractConfig, ImageEncoding, PageSelection};
pub use error::{Error, ErrorKind, Result};
pub use extract::{
    process, process_into, Destination, DirectoryDestination, MemoryDestination, Outcome,
    OutputAssembler, PageWalker, Transaction, TransactionState,
};
pub use model::{
    ExtractedItem, ImageItem, OutputUnit, PixelBuffer, PixelFormat, Placement, SourceInput,
    TextItem,
};
pub use parser::PdfDocument;

use std::path::Path;

/// Run one operation on an in-memory PDF.
///
/// # Example
///
/// ```no_run
/// use expdf::{process_bytes, ExtractConfig};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let outcome = process_bytes("document.pdf", data, &ExtractConfig::text());
/// assert!(outcome.is_committed());
/// ```
pub fn process_bytes(name: &str, data: Vec<u8>, config: &ExtractConfig) -> Outcome {
    process(SourceInput::new(name, data), config)
}

/// Run one operation on a PDF file.
///
/// Failing to read the file is an error; everything after that ends up in
/// the returned [`Outcome`].
pub fn process_file<P: AsRef<Path>>(path: P, config: &ExtractConfig) -> Result<Outcome> {
    let input = SourceInput::from_path(path)?;
    Ok(process(input, config))
}

/// Extract items without assembling output units.
///
/// # Example
///
/// ```no_run
/// use expdf::{extract_bytes, ExtractConfig, ExtractedItem};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// for item in extract_bytes(&data, &ExtractConfig::images()).unwrap() {
///     if let ExtractedItem::Image(image) = item {
///         println!("page {} image {}: {}x{}", image.page, image.image,
///             image.pixels.width(), image.pixels.height());
///     }
/// }
/// ```
pub fn extract_bytes(data: &[u8], config: &ExtractConfig) -> Result<Vec<ExtractedItem>> {
    let doc = PdfDocument::load(data)?;
    extract::walk(&doc, config)
}

/// Text of the default capture region on every page, pages separated by a
/// blank line.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let data = std::fs::read(path)?;
    let items = extract_bytes(&data, &ExtractConfig::text())?;
    let pages: Vec<String> = items
        .into_iter()
        .filter_map(|item| match item {
            ExtractedItem::Text(text) => Some(text.text),
            ExtractedItem::Image(_) => None,
        })
        .collect();
    Ok(pages.join("\n"))
}

/// Run one operation on a PDF file without blocking the async runtime.
#[cfg(feature = "async")]
pub async fn process_file_async<P: AsRef<Path>>(path: P, config: ExtractConfig) -> Result<Outcome> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let input = SourceInput::new(name, data);

    tokio::task::spawn_blocking(move || process(input, &config))
        .await
        .map_err(|e| Error::Other(format!("extraction task failed: {}", e)))
}
