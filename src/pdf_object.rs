//! Small helpers over `lopdf` objects: reference chasing, inherited page
//! attributes and page resource dictionaries.

use crate::error::Error;
use crate::geometry::Size;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Follow indirect references until a direct object is reached.
pub trait PdfObjectDeref {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error>;
}

impl PdfObjectDeref for Object {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error> {
        let mut object = self;
        // bounded so a reference cycle cannot spin forever
        for _ in 0..32 {
            match object {
                Object::Reference(id) => object = doc.get_object(*id)?,
                _ => return Ok(object),
            }
        }
        Err(Error::Other("reference chain too deep".to_owned()))
    }
}

pub fn obj_to_f64(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

/// Look up `key` on the page, then on each `Parent` node.
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return value.deref(doc).ok();
        }
        node = node.get(b"Parent").ok()?.deref(doc).ok()?.as_dict().ok()?;
    }
    None
}

/// Width and height of the page's MediaBox, if it has a usable one.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Option<Size> {
    let values = inherited_attribute(doc, page_id, b"MediaBox")?.as_array().ok()?;
    if values.len() < 4 {
        return None;
    }
    let mut coords = [0.0; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = obj_to_f64(value.deref(doc).ok()?)?;
    }
    let size = Size::new((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs());
    (!size.is_empty()).then_some(size)
}

/// Give the page its own copy of an inherited Resources dictionary.
///
/// Without this, creating resources on the page would shadow everything the
/// existing content stream refers to.
pub fn materialize_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), Error> {
    if doc.get_object(page_id)?.as_dict()?.has(b"Resources") {
        return Ok(());
    }
    let Some(inherited) = inherited_attribute(doc, page_id, b"Resources").cloned() else {
        return Ok(());
    };
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Resources", inherited);
    Ok(())
}

/// Whether the page's (possibly inherited) resources define `/<category>/<name>`.
pub fn has_page_resource(doc: &Document, page_id: ObjectId, category: &str, name: &str) -> bool {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|resources| resources.as_dict().ok())
        .and_then(|resources| resources.get(category.as_bytes()).ok())
        .and_then(|entries| entries.deref(doc).ok())
        .and_then(|entries| entries.as_dict().ok())
        .map_or(false, |entries| entries.has(name.as_bytes()))
}

/// `preferred`, or `preferred_<n>` for the first `n` the page does not use yet.
pub fn unused_resource_name(
    doc: &Document,
    page_id: ObjectId,
    category: &str,
    preferred: &str,
) -> String {
    let mut name = preferred.to_owned();
    let mut suffix = 0;
    while has_page_resource(doc, page_id, category, &name) {
        suffix += 1;
        name = format!("{preferred}_{suffix}");
    }
    name
}

/// Set `/Resources/<category>/<name>` on a page, creating the category if needed.
pub fn set_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    name: &str,
    value: Object,
) -> Result<(), Error> {
    materialize_resources(doc, page_id)?;
    let category_ref = {
        let resources = doc.get_or_create_resources(page_id)?.as_dict_mut()?;
        match resources.get(category.as_bytes()) {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Dictionary(_)) => None,
            _ => {
                resources.set(category, Dictionary::new());
                None
            }
        }
    };
    let entries = match category_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc
            .get_or_create_resources(page_id)?
            .as_dict_mut()?
            .get_mut(category.as_bytes())?
            .as_dict_mut()?,
    };
    entries.set(name, value);
    Ok(())
}
