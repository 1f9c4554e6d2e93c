//! Data model for extracted content and output units.
//!
//! Items are what the extractors produce; units are what leaves the crate.
//! Neither holds any reference into the parsed document.

mod item;
mod output;

pub use item::{ExtractedItem, ImageItem, PixelBuffer, PixelFormat, Placement, TextItem};
pub use output::{attributes, OutputUnit, SourceInput};
