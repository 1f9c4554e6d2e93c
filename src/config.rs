//! Extraction configuration.
//!
//! An [`ExtractConfig`] is built once per operation, either through the
//! builder methods or from the host's property map, and is then only read.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::error::{Error, Result};

/// Host property names understood by [`ExtractConfig::from_properties`].
pub mod properties {
    /// `IMAGE` or `TEXT`. Required.
    pub const CONTENT_TO_EXTRACT: &str = "CONTENT_TO_EXTRACT";
    /// `ALL` or a page list such as `1-3,7`. Defaults to `ALL`.
    pub const PAGES_TO_EXTRACT: &str = "PAGES_TO_EXTRACT";
    /// `true` or `false`. Defaults to `false`.
    pub const IMAGE_LOCATION: &str = "IMAGE_LOCATION";
    /// `true` or `false`. Defaults to `false`.
    pub const IMAGE_SIZE: &str = "IMAGE_SIZE";
    /// `tiff` or `png`. Defaults to `tiff`.
    pub const IMAGE_TYPE: &str = "IMAGE_TYPE";
}

/// Options for one extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// What to extract from each page
    pub content: ContentKind,

    /// Which pages are dispatched to the extractor
    pub pages: PageSelection,

    /// Add `image.x`/`image.y` placement attributes to image units
    pub record_image_location: bool,

    /// Add `image.width`/`image.height` attributes to image units
    pub record_image_size: bool,

    /// Encoding for extracted images
    pub image_encoding: ImageEncoding,

    /// Region evaluated by text extraction
    pub capture_region: CaptureRegion,
}

impl ExtractConfig {
    /// Create a configuration for the given content kind with defaults.
    pub fn new(content: ContentKind) -> Self {
        Self {
            content,
            pages: PageSelection::All,
            record_image_location: false,
            record_image_size: false,
            image_encoding: ImageEncoding::Tiff,
            capture_region: CaptureRegion::default(),
        }
    }

    /// Extract embedded images.
    pub fn images() -> Self {
        Self::new(ContentKind::Image)
    }

    /// Extract region text.
    pub fn text() -> Self {
        Self::new(ContentKind::Text)
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Enable or disable placement attributes.
    pub fn with_image_location(mut self, record: bool) -> Self {
        self.record_image_location = record;
        self
    }

    /// Enable or disable pixel size attributes.
    pub fn with_image_size(mut self, record: bool) -> Self {
        self.record_image_size = record;
        self
    }

    /// Set the image output encoding.
    pub fn with_image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.image_encoding = encoding;
        self
    }

    /// Set the text capture region.
    pub fn with_capture_region(mut self, region: CaptureRegion) -> Self {
        self.capture_region = region;
        self
    }

    /// Build a configuration from host properties.
    ///
    /// Unknown property names are ignored.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        use properties::*;

        let content = props
            .get(CONTENT_TO_EXTRACT)
            .ok_or(Error::MissingProperty(CONTENT_TO_EXTRACT))?;
        let mut config = Self::new(ContentKind::parse(content)?);

        if let Some(pages) = props.get(PAGES_TO_EXTRACT) {
            config.pages = PageSelection::parse(pages)?;
        }
        if let Some(value) = props.get(IMAGE_LOCATION) {
            config.record_image_location = parse_flag(IMAGE_LOCATION, value)?;
        }
        if let Some(value) = props.get(IMAGE_SIZE) {
            config.record_image_size = parse_flag(IMAGE_SIZE, value)?;
        }
        if let Some(value) = props.get(IMAGE_TYPE) {
            config.image_encoding = ImageEncoding::parse(value)?;
        }

        Ok(config)
    }

    /// Build a configuration from a JSON object of host properties.
    ///
    /// ```
    /// use expdf::{ContentKind, ExtractConfig, ImageEncoding};
    ///
    /// let config = ExtractConfig::from_json(
    ///     r#"{ "CONTENT_TO_EXTRACT": "IMAGE", "IMAGE_TYPE": "png" }"#,
    /// ).unwrap();
    /// assert_eq!(config.content, ContentKind::Image);
    /// assert_eq!(config.image_encoding, ImageEncoding::Png);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let props: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| Error::Other(format!("Invalid property file: {}", e)))?;
        Self::from_properties(&props)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidProperty {
            name,
            value: value.to_string(),
            reason: "allowed values are true, false".to_string(),
        }),
    }
}

/// What each page contributes to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Raster images referenced by the page's resource table
    Image,
    /// Text inside the capture region
    Text,
}

impl ContentKind {
    /// Parse the host value (`IMAGE` or `TEXT`).
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "IMAGE" => Ok(ContentKind::Image),
            "TEXT" => Ok(ContentKind::Text),
            _ => Err(Error::InvalidProperty {
                name: properties::CONTENT_TO_EXTRACT,
                value: value.to_string(),
                reason: "allowed values are IMAGE, TEXT".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Image => write!(f, "IMAGE"),
            ContentKind::Text => write!(f, "TEXT"),
        }
    }
}

/// Raster format for extracted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    #[default]
    Tiff,
    Png,
}

impl ImageEncoding {
    /// Parse the host value (`tiff` or `png`).
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "tiff" => Ok(ImageEncoding::Tiff),
            "png" => Ok(ImageEncoding::Png),
            _ => Err(Error::InvalidProperty {
                name: properties::IMAGE_TYPE,
                value: value.to_string(),
                reason: "allowed values are tiff, png".to_string(),
            }),
        }
    }

    /// MIME type of encoded output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Tiff => "image/tiff",
            ImageEncoding::Png => "image/png",
        }
    }

    /// File extension of encoded output.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Tiff => "tiff",
            ImageEncoding::Png => "png",
        }
    }

    pub(crate) fn image_format(&self) -> image::ImageFormat {
        match self {
            ImageEncoding::Tiff => image::ImageFormat::Tiff,
            ImageEncoding::Png => image::ImageFormat::Png,
        }
    }
}

/// Page selection for extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// Every page
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed, sorted, unique)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page ordinal is selected.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Parse a page selection string (`ALL`, `1-10`, `1,3,5-7`).
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let (start, end) = parse_bounds(s, start, end)?;
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = parse_bounds(s, start, end)?;
                pages.extend(start..=end);
            } else {
                pages.push(parse_page(s, part)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

fn parse_page(spec: &str, part: &str) -> Result<u32> {
    match part.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::InvalidPageRange(spec.to_string())),
        Ok(p) => Ok(p),
    }
}

fn parse_bounds(spec: &str, start: &str, end: &str) -> Result<(u32, u32)> {
    let start = parse_page(spec, start)?;
    let end = parse_page(spec, end)?;
    if start > end {
        return Err(Error::InvalidPageRange(spec.to_string()));
    }
    Ok((start, end))
}

/// Axis-aligned rectangle in display space (origin at the top-left corner
/// of the page box, y growing downwards), in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CaptureRegion {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the left and top edges are inside, the right
    /// and bottom edges are not.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

impl Default for CaptureRegion {
    /// The fixed 800x600 region anchored at the page origin.
    fn default() -> Self {
        Self::new(0.0, 0.0, 800.0, 600.0)
    }
}
