//! Builders for the small PDF documents used by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Assembles a PDF page by page.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
        }
    }

    /// Uncompressed 8-bit DeviceRGB image.
    pub fn rgb_image(&mut self, width: i64, height: i64, pixels: Vec<u8>) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(width),
                "Height" => Object::Integer(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
            },
            pixels,
        ))
    }

    /// Flate-compressed 8-bit DeviceGray image.
    pub fn flate_gray_image(&mut self, width: i64, height: i64, pixels: &[u8]) -> ObjectId {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(pixels).unwrap();
        let compressed = encoder.finish().unwrap();

        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(width),
                "Height" => Object::Integer(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "FlateDecode",
            },
            compressed,
        ))
    }

    /// DCT-encoded RGB image filled with one color.
    pub fn jpeg_image(&mut self, width: u32, height: u32) -> ObjectId {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(width as i64),
                "Height" => Object::Integer(height as i64),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "DCTDecode",
            },
            jpeg,
        ))
    }

    /// Image whose data uses a filter the extractor cannot decode.
    pub fn jbig2_image(&mut self) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(4),
                "Height" => Object::Integer(4),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(1),
                "Filter" => "JBIG2Decode",
            },
            vec![0u8; 8],
        ))
    }

    /// Form XObject with its own content stream and resources.
    pub fn form(&mut self, content: &str, xobjects: &[(&str, ObjectId)]) -> ObjectId {
        let resources = self.resources(xobjects);
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => letter(),
                "Resources" => resources,
            },
            content.as_bytes().to_vec(),
        ))
    }

    /// Form XObject that lists itself as `/Fm0` in its own resources.
    pub fn self_painting_form(&mut self, content: &str) -> ObjectId {
        let id = self.doc.new_object_id();
        let resources = self.resources(&[("Fm0", id)]);
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => letter(),
                "Resources" => resources,
            },
            content.as_bytes().to_vec(),
        );
        self.doc.objects.insert(id, Object::Stream(form));
        id
    }

    /// Append a US Letter page. XObjects keep the given order in the
    /// page's resource table.
    pub fn page(&mut self, content: &str, xobjects: &[(&str, ObjectId)]) -> &mut Self {
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let resources = self.resources(xobjects);
        self.add_page(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => letter(),
            "Resources" => resources,
            "Contents" => Object::Reference(content_id),
        })
    }

    /// Append a page whose `/XObject` entry is not a dictionary.
    pub fn broken_resources_page(&mut self) -> &mut Self {
        self.add_page(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => letter(),
            "Resources" => dictionary! {
                "XObject" => Object::Integer(7),
            },
        })
    }

    pub fn build(&mut self) -> Vec<u8> {
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => Object::Integer(self.kids.len() as i64),
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf).unwrap();
        buf
    }

    fn add_page(&mut self, page: Dictionary) -> &mut Self {
        let page_id = self.doc.add_object(page);
        self.kids.push(Object::Reference(page_id));
        self
    }

    fn resources(&self, xobjects: &[(&str, ObjectId)]) -> Dictionary {
        let mut table = Dictionary::new();
        for (name, id) in xobjects {
            table.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        dictionary! {
            "Font" => dictionary! {
                "F1" => Object::Reference(self.font_id),
            },
            "XObject" => table,
        }
    }
}

fn letter() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ])
}

/// Content that paints `name` into a `width` x `height` box whose
/// lower-left corner is at (`x`, `y`) in PDF user space.
pub fn paint(name: &str, x: f32, y: f32, width: f32, height: f32) -> String {
    format!("q {} 0 0 {} {} {} cm /{} Do Q\n", width, height, x, y, name)
}

/// Content that shows `text` at (`x`, `y`) in 12pt Helvetica.
pub fn show(text: &str, x: f32, y: f32) -> String {
    format!("BT /F1 12 Tf {} {} Td ({}) Tj ET\n", x, y, text)
}

/// Solid RGB pixels.
pub fn solid_rgb(width: usize, height: usize, color: [u8; 3]) -> Vec<u8> {
    color.repeat(width * height)
}
