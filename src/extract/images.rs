//! Image region collector.
//!
//! Enumerates a page's XObject resource table in dictionary order and decodes
//! every raster entry. The image ordinal advances for every entry, raster or
//! not, so non-image XObjects leave gaps in the numbering.

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::model::ImageItem;
use crate::parser::{decode_image, scan_page, PdfPage, XObject};

/// Decode the raster images of one page.
pub fn collect(
    page: &PdfPage<'_>,
    ordinal: u32,
    config: &ExtractConfig,
) -> Result<Vec<ImageItem>> {
    let entries = page.xobjects().map_err(|e| Error::ResourceTable {
        page: ordinal,
        message: detail(e),
    })?;

    let scan = if config.record_image_location && entries.iter().any(|e| e.object.is_image()) {
        Some(scan_page(page).map_err(|e| Error::PageContent {
            page: ordinal,
            message: detail(e),
        })?)
    } else {
        None
    };

    let mut items = Vec::new();
    let mut image = 0u32;

    for entry in entries {
        image += 1;
        log::debug!(
            "Page {}: XObject /{} ({}) is entry {}",
            ordinal,
            String::from_utf8_lossy(entry.name),
            entry.object.label(),
            image
        );

        let XObject::Image(stream) = entry.object else {
            continue;
        };

        let pixels = decode_image(page.doc, stream).map_err(|e| Error::ImageDecode {
            page: ordinal,
            image,
            message: detail(e),
        })?;

        let placement = scan.as_ref().and_then(|s| s.placement(entry.name));
        if config.record_image_location && placement.is_none() {
            log::debug!(
                "Page {}: image {} is never painted by the page content",
                ordinal,
                image
            );
        }

        items.push(ImageItem {
            page: ordinal,
            image,
            pixels,
            placement,
        });
    }

    Ok(items)
}

/// Message of a low-level error, without its category prefix.
pub(crate) fn detail(err: Error) -> String {
    match err {
        Error::Other(message) | Error::Decode(message) => message,
        other => other.to_string(),
    }
}
