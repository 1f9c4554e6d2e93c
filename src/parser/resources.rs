//! Page resources and XObject classification.

use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};

use super::loader::PdfPage;

/// Maximum length of a reference chain followed by [`resolve`].
const MAX_REFERENCE_CHAIN: usize = 32;

/// Follow indirect references until a direct object is reached.
///
/// Returns `None` for dangling references and overly long chains.
pub fn resolve<'a>(doc: &'a LopdfDocument, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_CHAIN {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

fn type_label(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) | Object::Real(_) => "number",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

/// Classification of one resource-table entry.
#[derive(Debug, Clone, Copy)]
pub enum XObject<'a> {
    /// `/Subtype /Image` stream
    Image(&'a Stream),
    /// `/Subtype /Form` stream
    Form(&'a Stream),
    /// Anything else, including dangling references
    Other,
}

impl<'a> XObject<'a> {
    /// Classify a (possibly indirect) resource-table value.
    pub fn classify(doc: &'a LopdfDocument, obj: &'a Object) -> Self {
        let Some(Object::Stream(stream)) = resolve(doc, obj) else {
            return XObject::Other;
        };
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => XObject::Image(stream),
            Ok(b"Form") => XObject::Form(stream),
            _ => XObject::Other,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, XObject::Image(_))
    }

    /// Short label for logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            XObject::Image(_) => "image",
            XObject::Form(_) => "form",
            XObject::Other => "other",
        }
    }
}

/// A named entry of an `/XObject` resource table.
#[derive(Debug, Clone, Copy)]
pub struct XObjectEntry<'a> {
    /// Resource name, as used by the `Do` operator
    pub name: &'a [u8],
    pub object: XObject<'a>,
}

/// Resolve a resource sub-dictionary such as `/XObject` or `/Font`.
///
/// Missing or null entries give `None`; anything other than a dictionary is
/// an error.
pub fn sub_dictionary<'a>(
    doc: &'a LopdfDocument,
    resources: &'a Dictionary,
    key: &[u8],
) -> Result<Option<&'a Dictionary>> {
    let Ok(value) = resources.get(key) else {
        return Ok(None);
    };
    match resolve(doc, value) {
        Some(Object::Dictionary(dict)) => Ok(Some(dict)),
        Some(Object::Null) | None => Ok(None),
        Some(other) => Err(Error::Other(format!(
            "/{} is a {}, not a dictionary",
            String::from_utf8_lossy(key),
            type_label(other)
        ))),
    }
}

/// Entries of an `/XObject` table, in dictionary order.
pub fn xobject_table<'a>(
    doc: &'a LopdfDocument,
    resources: &'a Dictionary,
) -> Result<Vec<XObjectEntry<'a>>> {
    let Some(table) = sub_dictionary(doc, resources, b"XObject")? else {
        return Ok(Vec::new());
    };
    Ok(table
        .iter()
        .map(|(name, obj)| XObjectEntry {
            name: name.as_slice(),
            object: XObject::classify(doc, obj),
        })
        .collect())
}

impl<'a> PdfPage<'a> {
    /// The page's `/Resources`, inherited from the page tree when absent.
    pub fn resources(&self) -> Result<Option<&'a Dictionary>> {
        match self.inherited(b"Resources") {
            Some(Object::Dictionary(dict)) => Ok(Some(dict)),
            Some(Object::Null) | None => Ok(None),
            Some(other) => Err(Error::Other(format!(
                "/Resources is a {}, not a dictionary",
                type_label(other)
            ))),
        }
    }

    /// The page's XObject resource table, in dictionary order.
    pub fn xobjects(&self) -> Result<Vec<XObjectEntry<'a>>> {
        match self.resources()? {
            Some(resources) => xobject_table(self.doc, resources),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_classify() {
        let mut doc = LopdfDocument::with_version("1.5");
        let image_id = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image" },
            vec![],
        ));
        let form_id = doc.add_object(Stream::new(dictionary! { "Subtype" => "Form" }, vec![]));

        let image = Object::Reference(image_id);
        let form = Object::Reference(form_id);
        let dangling = Object::Reference((99, 0));
        let direct = Object::Integer(3);

        assert!(XObject::classify(&doc, &image).is_image());
        assert!(matches!(XObject::classify(&doc, &form), XObject::Form(_)));
        assert!(matches!(XObject::classify(&doc, &dangling), XObject::Other));
        assert!(matches!(XObject::classify(&doc, &direct), XObject::Other));
    }

    #[test]
    fn test_xobject_table_order_and_errors() {
        let mut doc = LopdfDocument::with_version("1.5");
        let image_id = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image" },
            vec![],
        ));
        let resources = dictionary! {
            "XObject" => dictionary! {
                "Zeta" => Object::Reference(image_id),
                "Alpha" => Object::Reference((42, 0)),
            },
        };

        let entries = xobject_table(&doc, &resources).unwrap();
        let names: Vec<&[u8]> = entries.iter().map(|e| e.name).collect();
        assert_eq!(names, vec![b"Zeta".as_slice(), b"Alpha".as_slice()]);
        assert!(entries[0].object.is_image());
        assert_eq!(entries[1].object.label(), "other");

        let bad = dictionary! { "XObject" => Object::Integer(7) };
        assert!(xobject_table(&doc, &bad).is_err());

        let empty = dictionary! {};
        assert!(xobject_table(&doc, &empty).unwrap().is_empty());
    }
}
