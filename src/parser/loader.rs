//! PDF document loading using lopdf.

use std::io::Read;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};

use super::filters::decode_data;
use super::resources::resolve;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Leading garbage tolerated before the header.
const HEADER_SEARCH_LEN: usize = 1024;

/// Maximum depth followed when looking up inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 32;

/// US Letter, used when a page declares no box at all.
const DEFAULT_PAGE_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// A decoded PDF document, owned by one extraction pass.
pub struct PdfDocument {
    doc: LopdfDocument,
}

impl PdfDocument {
    /// Decode a document from bytes.
    pub fn load(data: &[u8]) -> Result<Self> {
        let offset = header_offset(data).ok_or(Error::UnknownFormat)?;
        if offset > 0 {
            log::debug!("Skipping {} bytes before the PDF header", offset);
        }

        // Cross-reference offsets are taken relative to the header.
        let doc = LopdfDocument::load_mem(&data[offset..])?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        log::debug!(
            "Loaded PDF {} with {} pages",
            doc.version,
            doc.get_pages().len()
        );
        Ok(Self { doc })
    }

    /// Decode a document from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load(&data)
    }

    /// Open and decode a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::load(&data)
    }

    /// Number of pages in the page tree.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Pages in document order.
    pub fn pages(&self) -> impl Iterator<Item = PdfPage<'_>> + '_ {
        self.doc
            .get_pages()
            .into_values()
            .map(move |id| PdfPage { doc: &self.doc, id })
    }

    /// PDF version from the header.
    pub fn version(&self) -> &str {
        &self.doc.version
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.doc.version)
            .field("pages", &self.page_count())
            .finish()
    }
}

fn header_offset(data: &[u8]) -> Option<usize> {
    let head = &data[..data.len().min(HEADER_SEARCH_LEN)];
    head.windows(PDF_MAGIC.len()).position(|w| w == PDF_MAGIC)
}

/// An axis-aligned rectangle in PDF user space (y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Build a normalized rectangle from a PDF array `[llx lly urx ury]`.
    fn from_array(array: &[Object]) -> Option<Self> {
        if array.len() < 4 {
            return None;
        }
        let mut values = [0.0f32; 4];
        for (slot, obj) in values.iter_mut().zip(array) {
            *slot = obj.as_float().ok()?;
        }
        Some(Self {
            x0: values[0].min(values[2]),
            y0: values[1].min(values[3]),
            x1: values[0].max(values[2]),
            y1: values[1].max(values[3]),
        })
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A borrowed view of one page of a [`PdfDocument`].
#[derive(Clone, Copy)]
pub struct PdfPage<'a> {
    pub(crate) doc: &'a LopdfDocument,
    id: ObjectId,
}

impl<'a> PdfPage<'a> {
    /// Object id of the page dictionary.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The page dictionary.
    pub fn dictionary(&self) -> Result<&'a Dictionary> {
        Ok(self.doc.get_dictionary(self.id)?)
    }

    /// Look up a page attribute, following `/Parent` for inheritable keys.
    pub(crate) fn inherited(&self, key: &[u8]) -> Option<&'a Object> {
        let mut dict = self.dictionary().ok()?;
        for _ in 0..MAX_INHERIT_DEPTH {
            if let Ok(value) = dict.get(key) {
                return resolve(self.doc, value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Visible page area: CropBox, falling back to MediaBox.
    pub fn page_box(&self) -> Rect {
        [b"CropBox".as_slice(), b"MediaBox".as_slice()]
            .iter()
            .filter_map(|key| self.inherited(key))
            .filter_map(|obj| obj.as_array().ok())
            .find_map(|array| Rect::from_array(array))
            .unwrap_or(DEFAULT_PAGE_BOX)
    }

    /// Decoded content stream. Multiple streams are joined with whitespace.
    pub fn content(&self) -> Result<Vec<u8>> {
        let page_dict = self.dictionary()?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        match resolve(self.doc, contents) {
            Some(Object::Stream(s)) => decode_data(self.doc, s),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    match resolve(self.doc, obj) {
                        Some(Object::Stream(s)) => {
                            content.extend_from_slice(&decode_data(self.doc, s)?);
                            content.push(b'\n');
                        }
                        Some(Object::Null) | None => {}
                        Some(_) => {
                            return Err(Error::Other("Invalid content stream".to_string()));
                        }
                    }
                }
                Ok(content)
            }
            Some(Object::Null) | None => Ok(Vec::new()),
            Some(_) => Err(Error::Other("Invalid content stream".to_string())),
        }
    }
}

impl std::fmt::Debug for PdfPage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfPage").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn build(page_box: Option<Object>, contents: Option<&[u8]>) -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
        };
        if let Some(content) = contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
            page.set("Contents", Object::Reference(content_id));
        }
        let page_id = doc.add_object(page);

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        };
        if let Some(page_box) = page_box {
            pages.set("MediaBox", page_box);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_rejects_non_pdf() {
        let err = PdfDocument::load(b"PK\x03\x04 not a pdf").unwrap_err();
        assert!(matches!(err, Error::UnknownFormat));
    }

    #[test]
    fn test_truncated_pdf_is_decode_error() {
        let err = PdfDocument::load(b"%PDF-1.7\n1 0 obj\n<<").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Decode);
    }

    #[test]
    fn test_header_after_leading_bytes() {
        let mut data = b"\x00\x00junk\n".to_vec();
        data.extend(build(None, None));
        let doc = PdfDocument::load(&data).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_header_beyond_search_window() {
        let mut data = vec![b' '; HEADER_SEARCH_LEN];
        data.extend(build(None, None));
        assert!(matches!(PdfDocument::load(&data), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_inherited_media_box() {
        let data = build(
            Some(Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(300),
                Object::Integer(400),
            ])),
            None,
        );
        let doc = PdfDocument::load(&data).unwrap();
        let page = doc.pages().next().unwrap();
        let page_box = page.page_box();
        assert_eq!(page_box.width(), 300.0);
        assert_eq!(page_box.height(), 400.0);
    }

    #[test]
    fn test_default_page_box_and_empty_content() {
        let data = build(None, None);
        let doc = PdfDocument::load(&data).unwrap();
        let page = doc.pages().next().unwrap();
        assert_eq!(page.page_box(), DEFAULT_PAGE_BOX);
        assert!(page.content().unwrap().is_empty());
    }

    #[test]
    fn test_content_stream() {
        let data = build(None, Some(b"BT /F1 12 Tf (Hi) Tj ET"));
        let doc = PdfDocument::from_reader(std::io::Cursor::new(data)).unwrap();
        let page = doc.pages().next().unwrap();
        assert_eq!(page.content().unwrap(), b"BT /F1 12 Tf (Hi) Tj ET");
    }
}
