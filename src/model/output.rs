//! Inputs and output units exchanged with the host.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Attribute names written on output units.
pub mod attributes {
    /// Page ordinal (1-indexed)
    pub const PAGE: &str = "page";
    /// Image ordinal within the page's resource table (1-indexed)
    pub const IMAGE: &str = "image";
    /// Decoded width in pixels
    pub const IMAGE_WIDTH: &str = "image.width";
    /// Decoded height in pixels
    pub const IMAGE_HEIGHT: &str = "image.height";
    /// Left edge of the first placement, in points from the page's left edge
    pub const IMAGE_X: &str = "image.x";
    /// Top edge of the first placement, in points from the page's top edge
    pub const IMAGE_Y: &str = "image.y";
    /// Painted width in points
    pub const IMAGE_DISPLAY_WIDTH: &str = "image.display.width";
    /// Painted height in points
    pub const IMAGE_DISPLAY_HEIGHT: &str = "image.display.height";
    /// Host attribute naming the input, inherited by every unit
    pub const FILENAME: &str = "filename";
}

/// The original input of an operation. Never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInput {
    /// Display name (usually the file name)
    pub name: String,
    /// Serialized document
    pub data: Vec<u8>,
    /// Host attributes, inherited by every output unit
    pub attributes: BTreeMap<String, String>,
}

impl SourceInput {
    /// Create an input from bytes. The name is also recorded as the
    /// `filename` attribute.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mut attributes = BTreeMap::new();
        attributes.insert(attributes::FILENAME.to_string(), name.clone());
        Self {
            name,
            data,
            attributes,
        }
    }

    /// Read an input from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, data))
    }

    /// Set a host attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Name without its extension, used to derive output file names.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// One independent artifact produced by an extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputUnit {
    /// Encoded image or UTF-8 text
    #[serde(skip_serializing, default)]
    pub payload: Vec<u8>,

    /// MIME type of the payload
    pub mime_type: String,

    /// Inherited host attributes plus provenance
    pub attributes: BTreeMap<String, String>,
}

impl OutputUnit {
    /// Create a unit with the given payload and attributes.
    pub fn new(
        payload: Vec<u8>,
        mime_type: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            payload,
            mime_type: mime_type.into(),
            attributes,
        }
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Page ordinal, if present.
    pub fn page(&self) -> Option<u32> {
        self.attribute(attributes::PAGE)?.parse().ok()
    }

    /// Image ordinal, if present.
    pub fn image(&self) -> Option<u32> {
        self.attribute(attributes::IMAGE)?.parse().ok()
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// File extension based on the MIME type.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/tiff" => "tiff",
            "image/png" => "png",
            "text/plain" => "txt",
            _ => "bin",
        }
    }

    /// A file name unique within one operation.
    pub fn suggested_filename(&self, stem: &str) -> String {
        match (self.page(), self.image()) {
            (Some(page), Some(image)) => {
                format!("{}_page{}_image{}.{}", stem, page, image, self.extension())
            }
            (Some(page), None) => format!("{}_page{}.{}", stem, page, self.extension()),
            _ => format!("{}.{}", stem, self.extension()),
        }
    }
}
