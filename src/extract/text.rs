//! Text region extractor.
//!
//! Keeps the glyphs whose origin falls inside a capture region and lays them
//! out as lines: top to bottom, then left to right within a line.

use unicode_bidi::BidiInfo;
use unicode_normalization::UnicodeNormalization;

use crate::config::CaptureRegion;
use crate::error::{Error, Result};
use crate::model::TextItem;
use crate::parser::{scan_page, Glyph, PdfPage};

use super::images::detail;

/// Glyphs whose baselines differ by at most this fraction of the font size
/// share a line.
const LINE_TOLERANCE: f32 = 0.3;

/// A horizontal gap wider than this fraction of the font size is a word break.
const WORD_GAP: f32 = 0.15;

/// Text inside `region` on one page. Each line ends with `\n`; an empty
/// region gives an empty string.
pub fn extract_region(page: &PdfPage<'_>, region: &CaptureRegion) -> Result<String> {
    let scan = scan_page(page)?;
    Ok(layout_region(scan.glyphs, region))
}

/// [`extract_region`] for the page at `ordinal`, as an extracted item.
pub fn extract_page(
    page: &PdfPage<'_>,
    ordinal: u32,
    region: &CaptureRegion,
) -> Result<TextItem> {
    let text = extract_region(page, region).map_err(|e| match e {
        Error::ResourceTable { .. } => e,
        other => Error::PageContent {
            page: ordinal,
            message: detail(other),
        },
    })?;
    log::debug!("Page {}: {} bytes of region text", ordinal, text.len());
    Ok(TextItem {
        page: ordinal,
        text,
    })
}

/// Lay out the glyphs that fall inside `region`.
pub fn layout_region(glyphs: Vec<Glyph>, region: &CaptureRegion) -> String {
    let mut glyphs: Vec<Glyph> = glyphs
        .into_iter()
        .filter(|g| !g.text.trim().is_empty())
        .filter(|g| region.contains(g.x, g.y))
        .collect();

    // Top to bottom, then left to right
    glyphs.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut out = String::new();
    for line in group_into_lines(glyphs) {
        out.push_str(&line_text(line));
        out.push('\n');
    }
    out
}

fn group_into_lines(glyphs: Vec<Glyph>) -> Vec<Vec<Glyph>> {
    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    let mut current: Vec<Glyph> = Vec::new();
    let mut line_y = 0.0f32;
    let mut line_size = 0.0f32;

    for glyph in glyphs {
        if !current.is_empty() {
            let tolerance = line_size.max(glyph.font_size) * LINE_TOLERANCE;
            if (glyph.y - line_y).abs() > tolerance {
                lines.push(std::mem::take(&mut current));
            }
        }
        if current.is_empty() {
            line_y = glyph.y;
            line_size = glyph.font_size;
        }
        current.push(glyph);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    lines
}

fn line_text(line: Vec<Glyph>) -> String {
    let mut text = String::new();
    let mut prev_end: Option<f32> = None;

    for glyph in line {
        if let Some(end) = prev_end {
            if glyph.x - end > glyph.font_size * WORD_GAP && !text.ends_with(' ') {
                text.push(' ');
            }
        }
        prev_end = Some(glyph.x + glyph.width);
        text.push_str(&glyph.text);
    }

    let text: String = text.nfkc().collect();
    logical_order(&text)
}

/// Glyphs are laid out in visual order; reorder right-to-left runs.
fn logical_order(line: &str) -> String {
    let info = BidiInfo::new(line, None);
    if !info.has_rtl() {
        return line.to_string();
    }
    info.paragraphs
        .iter()
        .map(|para| info.reorder_line(para, para.range.clone()))
        .collect()
}
