//! Content stream interpretation.
//!
//! Walks a page's content stream (and the form XObjects it paints) tracking
//! the graphics and text state, and records where each glyph and each image
//! lands on the page. Positions are reported in display space: origin at the
//! top-left corner of the page box, y growing downwards, in points.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::Placement;

use super::filters::decode_data;
use super::loader::{PdfPage, Rect};
use super::resources::{resolve, sub_dictionary, XObject};

/// Maximum nesting of form XObjects.
const MAX_FORM_DEPTH: usize = 12;

/// Width used for glyphs without metrics, in thousandths of an em.
const FALLBACK_GLYPH_WIDTH: f32 = 500.0;

/// A positioned glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Unicode text of the glyph (may hold several chars for ligatures)
    pub text: String,
    /// Origin x in display space
    pub x: f32,
    /// Baseline y in display space
    pub y: f32,
    /// Effective font size in points
    pub font_size: f32,
    /// Horizontal advance in points
    pub width: f32,
}

/// Everything recorded while interpreting one page.
#[derive(Debug, Clone, Default)]
pub struct PageScan {
    /// Glyphs in content-stream order
    pub glyphs: Vec<Glyph>,
    /// Images painted by the page's own content, by resource name
    pub placements: Vec<(Vec<u8>, Placement)>,
}

impl PageScan {
    /// First placement of the named image resource.
    pub fn placement(&self, name: &[u8]) -> Option<Placement> {
        self.placements
            .iter()
            .find(|(n, _)| n.as_slice() == name)
            .map(|(_, p)| *p)
    }
}

/// Interpret a page's content stream.
pub fn scan_page(page: &PdfPage<'_>) -> Result<PageScan> {
    let content = page.content()?;
    let resources = page.resources()?;

    let mut interpreter = Interpreter::new(page.doc, page.page_box());
    interpreter.run(&content, resources, 0)?;
    Ok(interpreter.scan)
}

/// Affine transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        Some(Self {
            a: get_number(&operands[0])?,
            b: get_number(&operands[1])?,
            c: get_number(&operands[2])?,
            d: get_number(&operands[3])?,
            e: get_number(&operands[4])?,
            f: get_number(&operands[5])?,
        })
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Metrics and encoding source for one font resource.
#[derive(Debug)]
struct FontInfo<'a> {
    dict: Option<&'a Dictionary>,
    /// Type0 fonts use two-byte codes
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
    /// Glyph-space to text-space factor times 1000 (only differs for Type3)
    scale: f32,
}

impl<'a> FontInfo<'a> {
    fn fallback() -> Self {
        Self {
            dict: None,
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: FALLBACK_GLYPH_WIDTH,
            scale: 1.0,
        }
    }

    fn new(doc: &'a LopdfDocument, dict: &'a Dictionary) -> Self {
        let mut info = Self {
            dict: Some(dict),
            ..Self::fallback()
        };

        let subtype = dict.get(b"Subtype").and_then(Object::as_name).unwrap_or_default();
        if subtype == b"Type0" {
            info.two_byte = true;
            let descendant = dict
                .get(b"DescendantFonts")
                .ok()
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok());
            if let Some(cid_font) = descendant {
                info.default_width = cid_font
                    .get(b"DW")
                    .ok()
                    .and_then(get_number)
                    .unwrap_or(1000.0);
                if let Some(w) = cid_font.get(b"W").ok().and_then(|o| resolve(doc, o)) {
                    info.cid_widths = parse_cid_widths(doc, w);
                }
            }
            return info;
        }

        info.first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        let widths = dict.get(b"Widths").ok().and_then(|o| resolve(doc, o));
        if let Some(Object::Array(widths)) = widths {
            info.widths = widths
                .iter()
                .map(|w| resolve(doc, w).and_then(get_number).unwrap_or(0.0))
                .collect();
        }
        let missing = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|fd| fd.get(b"MissingWidth").ok())
            .and_then(get_number)
            .filter(|w| *w > 0.0);
        if let Some(missing) = missing {
            info.default_width = missing;
        }
        if subtype == b"Type3" {
            info.scale = dict
                .get(b"FontMatrix")
                .ok()
                .and_then(|o| o.as_array().ok())
                .and_then(|m| m.first())
                .and_then(get_number)
                .map(|s| s * 1000.0)
                .unwrap_or(1.0);
        }
        info
    }

    /// Advance of a character code in thousandths of text space.
    fn width(&self, code: u32) -> f32 {
        let width = if self.two_byte {
            self.cid_widths.get(&code).copied()
        } else {
            code.checked_sub(self.first_char)
                .and_then(|i| self.widths.get(i as usize).copied())
        };
        width.unwrap_or(self.default_width) * self.scale
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` or `c_first c_last w`.
fn parse_cid_widths(doc: &LopdfDocument, w: &Object) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let Ok(items) = w.as_array() else {
        return widths;
    };

    let mut i = 0;
    while i < items.len() {
        let Some(first) = items[i].as_i64().ok().and_then(|c| u32::try_from(c).ok()) else {
            break;
        };
        match items.get(i + 1).and_then(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    let code = u32::try_from(offset)
                        .ok()
                        .and_then(|offset| first.checked_add(offset));
                    if let (Some(code), Some(w)) = (code, get_number(w)) {
                        widths.insert(code, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (
                    last.as_i64().ok(),
                    items.get(i + 2).and_then(get_number),
                ) else {
                    break;
                };
                // Ranges are capped at 64K codes.
                let last = last.min(i64::from(first.saturating_add(0xFFFF)));
                let Ok(last) = u32::try_from(last) else {
                    i += 3;
                    continue;
                };
                for code in first..=last {
                    widths.insert(code, w);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState<'a> {
    ctm: Matrix,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
    font: Option<Rc<FontInfo<'a>>>,
    font_size: f32,
}

impl Default for GraphicsState<'_> {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 12.0,
        }
    }
}

struct Interpreter<'a> {
    doc: &'a LopdfDocument,
    page_box: Rect,
    state: GraphicsState<'a>,
    stack: Vec<GraphicsState<'a>>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text_block: bool,
    fonts: HashMap<ObjectId, Rc<FontInfo<'a>>>,
    /// Forms currently being painted, outermost first
    active_forms: Vec<&'a Stream>,
    scan: PageScan,
}

impl<'a> Interpreter<'a> {
    fn new(doc: &'a LopdfDocument, page_box: Rect) -> Self {
        Self {
            doc,
            page_box,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            in_text_block: false,
            fonts: HashMap::new(),
            active_forms: Vec::new(),
            scan: PageScan::default(),
        }
    }

    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        depth: usize,
    ) -> Result<()> {
        let content = lopdf::content::Content::decode(content)
            .map_err(|e| Error::Other(format!("malformed content stream: {}", e)))?;

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(state) = self.stack.pop() {
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.state.ctm = m.then(&self.state.ctm);
                    }
                }
                "BT" => {
                    self.in_text_block = true;
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                }
                "ET" => self.in_text_block = false,
                "Tf" => {
                    if let [Object::Name(name), size, ..] = operands {
                        self.state.font = Some(self.font(resources, name));
                        self.state.font_size = get_number(size).unwrap_or(12.0);
                    }
                }
                "Tc" => set_number(&mut self.state.char_spacing, operands.first()),
                "Tw" => set_number(&mut self.state.word_spacing, operands.first()),
                "TL" => set_number(&mut self.state.leading, operands.first()),
                "Ts" => set_number(&mut self.state.rise, operands.first()),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(get_number) {
                        self.state.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty, ..] = operands {
                        let tx = get_number(tx).unwrap_or(0.0);
                        let ty = get_number(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            self.state.leading = -ty;
                        }
                        self.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show_text(bytes),
                                other => {
                                    if let Some(adjustment) = get_number(other) {
                                        self.adjust(adjustment);
                                    }
                                }
                            }
                        }
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(bytes);
                    }
                }
                "\"" => {
                    if let [aw, ac, Object::String(bytes, _), ..] = operands {
                        set_number(&mut self.state.word_spacing, Some(aw));
                        set_number(&mut self.state.char_spacing, Some(ac));
                        self.next_line();
                        self.show_text(bytes);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.paint_xobject(resources, name, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Resolve a font resource, caching metrics of indirect fonts.
    fn font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Rc<FontInfo<'a>> {
        let entry = resources
            .and_then(|res| match sub_dictionary(self.doc, res, b"Font") {
                Ok(fonts) => fonts,
                Err(e) => {
                    log::warn!("Ignoring font table: {}", e);
                    None
                }
            })
            .and_then(|fonts| fonts.get(name).ok());

        let Some(entry) = entry else {
            log::debug!("Font /{} not found", String::from_utf8_lossy(name));
            return Rc::new(FontInfo::fallback());
        };

        if let Ok(id) = entry.as_reference() {
            if let Some(cached) = self.fonts.get(&id) {
                return Rc::clone(cached);
            }
        }

        let info = match resolve(self.doc, entry).and_then(|o| o.as_dict().ok()) {
            Some(dict) => Rc::new(FontInfo::new(self.doc, dict)),
            None => Rc::new(FontInfo::fallback()),
        };
        if let Ok(id) = entry.as_reference() {
            self.fonts.insert(id, Rc::clone(&info));
        }
        info
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.leading);
    }

    /// Apply a `TJ` position adjustment (thousandths of text space).
    fn adjust(&mut self, adjustment: f32) {
        let tx = -(adjustment / 1000.0) * self.state.font_size * self.state.horizontal_scale;
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }

    fn show_text(&mut self, bytes: &[u8]) {
        let font = self
            .state
            .font
            .clone()
            .unwrap_or_else(|| Rc::new(FontInfo::fallback()));
        let encoding = font.dict.and_then(|f| f.get_font_encoding(self.doc).ok());
        let code_len = if font.two_byte { 2 } else { 1 };

        let font_size = self.state.font_size;
        let h_scale = self.state.horizontal_scale;

        for code in bytes.chunks(code_len) {
            let code_value = code.iter().fold(0u32, |acc, &b| acc << 8 | b as u32);

            let text = match encoding {
                Some(ref enc) => LopdfDocument::decode_text(enc, code).unwrap_or_default(),
                None => decode_code_simple(code),
            };

            let render = Matrix {
                a: font_size * h_scale,
                b: 0.0,
                c: 0.0,
                d: font_size,
                e: 0.0,
                f: self.state.rise,
            }
            .then(&self.text_matrix)
            .then(&self.state.ctm);

            let w0 = font.width(code_value) / 1000.0;

            if self.in_text_block && !text.is_empty() {
                self.scan.glyphs.push(Glyph {
                    text,
                    x: render.e - self.page_box.x0,
                    y: self.page_box.y1 - render.f,
                    font_size: render.c.hypot(render.d),
                    width: w0 * render.a.hypot(render.b),
                });
            }

            let word_spacing = if code_len == 1 && code_value == 32 {
                self.state.word_spacing
            } else {
                0.0
            };
            let tx = (w0 * font_size + self.state.char_spacing + word_spacing) * h_scale;
            self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
        }
    }

    fn paint_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        depth: usize,
    ) -> Result<()> {
        let Some(table) = resources
            .map(|res| sub_dictionary(self.doc, res, b"XObject"))
            .transpose()?
            .flatten()
        else {
            return Ok(());
        };
        let Ok(entry) = table.get(name) else {
            log::debug!("XObject /{} not found", String::from_utf8_lossy(name));
            return Ok(());
        };

        match XObject::classify(self.doc, entry) {
            XObject::Image(_) => {
                if depth == 0 {
                    let placement = self.unit_square_placement();
                    self.scan.placements.push((name.to_vec(), placement));
                }
            }
            XObject::Form(stream) => {
                if self.active_forms.iter().any(|f| std::ptr::eq(*f, stream)) {
                    log::warn!(
                        "Form XObject /{} paints itself, skipping",
                        String::from_utf8_lossy(name)
                    );
                    return Ok(());
                }
                if depth >= MAX_FORM_DEPTH {
                    log::warn!("Form XObject nesting deeper than {}, skipping", MAX_FORM_DEPTH);
                    return Ok(());
                }
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| m.as_array().ok())
                    .and_then(|m| Matrix::from_operands(m))
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve(self.doc, o))
                    .and_then(|o| o.as_dict().ok())
                    .or(resources);
                let content = decode_data(self.doc, stream)?;

                let saved_stack = self.stack.len();
                let saved_state = self.state.clone();
                let saved_text = (self.text_matrix, self.line_matrix, self.in_text_block);

                self.state.ctm = form_matrix.then(&self.state.ctm);
                self.active_forms.push(stream);
                let result = self.run(&content, form_resources, depth + 1);
                self.active_forms.pop();

                self.stack.truncate(saved_stack);
                self.state = saved_state;
                (self.text_matrix, self.line_matrix, self.in_text_block) = saved_text;
                result?;
            }
            XObject::Other => {}
        }
        Ok(())
    }

    /// Bounding box of the unit square under the current CTM.
    fn unit_square_placement(&self) -> Placement {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .map(|(x, y)| self.state.ctm.apply(x, y));
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

        Placement {
            x: min_x - self.page_box.x0,
            y: self.page_box.y1 - max_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn set_number(slot: &mut f32, operand: Option<&Object>) {
    if let Some(value) = operand.and_then(get_number) {
        *slot = value;
    }
}

/// Decode a character code when the font offers no encoding.
fn decode_code_simple(code: &[u8]) -> String {
    match code {
        [b] => (*b as char).to_string(),
        [hi, lo] => char::from_u32(u32::from(u16::from_be_bytes([*hi, *lo])))
            .map(String::from)
            .unwrap_or_default(),
        _ => String::new(),
    }
}
