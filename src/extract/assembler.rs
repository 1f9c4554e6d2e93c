//! Output assembler: turns extracted items into output units.

use std::collections::BTreeMap;
use std::io::Cursor;

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::model::{attributes, ExtractedItem, ImageItem, OutputUnit, SourceInput, TextItem};

/// MIME type of text units.
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// Builds output units that inherit the attributes of one source input.
#[derive(Debug, Clone, Copy)]
pub struct OutputAssembler<'a> {
    config: &'a ExtractConfig,
    inherited: &'a BTreeMap<String, String>,
}

impl<'a> OutputAssembler<'a> {
    pub fn new(config: &'a ExtractConfig, source: &'a SourceInput) -> Self {
        Self {
            config,
            inherited: &source.attributes,
        }
    }

    /// Encode one item as an output unit.
    pub fn assemble(&self, item: ExtractedItem) -> Result<OutputUnit> {
        match item {
            ExtractedItem::Image(image) => self.image_unit(image),
            ExtractedItem::Text(text) => Ok(self.text_unit(text)),
        }
    }

    fn image_unit(&self, item: ImageItem) -> Result<OutputUnit> {
        let mut attrs = self.provenance(item.page);
        attrs.insert(attributes::IMAGE.to_string(), item.image.to_string());

        if self.config.record_image_size {
            attrs.insert(
                attributes::IMAGE_WIDTH.to_string(),
                item.pixels.width().to_string(),
            );
            attrs.insert(
                attributes::IMAGE_HEIGHT.to_string(),
                item.pixels.height().to_string(),
            );
        }

        if self.config.record_image_location {
            if let Some(placement) = item.placement {
                for (key, value) in [
                    (attributes::IMAGE_X, placement.x),
                    (attributes::IMAGE_Y, placement.y),
                    (attributes::IMAGE_DISPLAY_WIDTH, placement.width),
                    (attributes::IMAGE_DISPLAY_HEIGHT, placement.height),
                ] {
                    attrs.insert(key.to_string(), format!("{:.2}", value));
                }
            }
        }

        let encoding = self.config.image_encoding;
        let image = item.pixels.into_dynamic_image().ok_or_else(|| {
            Error::Encode(format!(
                "page {}, image {}: pixel buffer does not match its dimensions",
                item.page, item.image
            ))
        })?;

        let mut payload = Vec::new();
        image.write_to(&mut Cursor::new(&mut payload), encoding.image_format())?;

        Ok(OutputUnit::new(payload, encoding.mime_type(), attrs))
    }

    fn text_unit(&self, item: TextItem) -> OutputUnit {
        OutputUnit::new(
            item.text.into_bytes(),
            TEXT_MIME_TYPE,
            self.provenance(item.page),
        )
    }

    fn provenance(&self, page: u32) -> BTreeMap<String, String> {
        let mut attrs = self.inherited.clone();
        attrs.insert(attributes::PAGE.to_string(), page.to_string());
        attrs
    }
}
