//! Extracted items: decoded pixel buffers and region text.

use image::{DynamicImage, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Sample layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// One 8-bit gray sample per pixel
    Gray8,
    /// Three 8-bit samples (R, G, B) per pixel
    Rgb8,
}

impl PixelFormat {
    /// Number of bytes per pixel.
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A decoded image held in memory, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw samples. Returns `None` when `data` does not hold exactly
    /// `width * height` pixels.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(format.channels())?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw samples.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Convert into an `image` crate buffer for encoding.
    pub fn into_dynamic_image(self) -> Option<DynamicImage> {
        match self.format {
            PixelFormat::Gray8 => {
                GrayImage::from_raw(self.width, self.height, self.data).map(DynamicImage::ImageLuma8)
            }
            PixelFormat::Rgb8 => {
                RgbImage::from_raw(self.width, self.height, self.data).map(DynamicImage::ImageRgb8)
            }
        }
    }
}

/// Where an image is painted on its page, in display space (origin at the
/// top-left of the page box, y down), in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A raster image taken from a page's resource table.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    /// Page ordinal (1-indexed)
    pub page: u32,
    /// Resource-table position on the page (1-indexed, may have gaps)
    pub image: u32,
    /// Decoded pixels
    pub pixels: PixelBuffer,
    /// First placement on the page, when requested and found
    pub placement: Option<Placement>,
}

/// Text captured from one page's region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    /// Page ordinal (1-indexed)
    pub page: u32,
    /// Region text, possibly empty
    pub text: String,
}

/// One unit of extracted content.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedItem {
    Image(ImageItem),
    Text(TextItem),
}

impl ExtractedItem {
    /// Page ordinal the item came from.
    pub fn page(&self) -> u32 {
        match self {
            ExtractedItem::Image(item) => item.page,
            ExtractedItem::Text(item) => item.page,
        }
    }

    /// Image ordinal, for image items.
    pub fn image(&self) -> Option<u32> {
        match self {
            ExtractedItem::Image(item) => Some(item.image),
            ExtractedItem::Text(_) => None,
        }
    }
}
