//! PDF parsing module.

mod content;
mod filters;
mod loader;
mod raster;
mod resources;

pub use content::{scan_page, Glyph, PageScan};
pub use filters::{decode_data, decode_image_data, Decoded};
pub use loader::{PdfDocument, PdfPage, Rect};
pub use raster::decode_image;
pub use resources::{resolve, sub_dictionary, xobject_table, XObject, XObjectEntry};
