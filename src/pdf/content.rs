//! Page dictionary helpers shared by the normalizer, merger and stamper
//!
//! These operate on the page object graph only. Existing content streams are
//! never decoded or rewritten; new streams are added around them.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::layout::PageSize;

/// Page attributes that may be inherited from ancestor `Pages` nodes
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Read a numeric PDF object
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Look up `key` on the page, walking up the `Parent` chain if needed
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Bounded walk guards against cyclic Parent links in broken files
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id).ok()?.as_dict().ok()?;
            }
            _ => return None,
        }
    }
    None
}

/// MediaBox as `(llx, lly, urx, ury)`, following references and inheritance
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f64; 4]> {
    let raw = inherited_attribute(doc, page_id, b"MediaBox")?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(id).ok()?.clone(),
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0; 4];
    for (slot, obj) in values.iter_mut().zip(arr) {
        *slot = number(obj)?;
    }
    Some(values)
}

/// Rendered size of a page, from its (possibly inherited) MediaBox
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<PageSize> {
    let [llx, lly, urx, ury] = media_box(doc, page_id)
        .ok_or_else(|| Error::General(format!("Page {:?} has no MediaBox", page_id)))?;
    Ok(PageSize::new((urx - llx).abs(), (ury - lly).abs()))
}

/// Current `Contents` of a page as a flat list of stream references
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;
    let refs = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };
    Ok(refs)
}

/// Surround the existing page content with new streams.
///
/// `before` is drawn first, then the original content, then `after`. Either
/// may be empty, in which case no stream is added on that side.
pub(crate) fn wrap_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    before: &[u8],
    after: &[u8],
) -> Result<()> {
    let before_id = (!before.is_empty())
        .then(|| doc.add_object(Stream::new(Dictionary::new(), before.to_vec())));
    let after_id = (!after.is_empty())
        .then(|| doc.add_object(Stream::new(Dictionary::new(), after.to_vec())));

    let mut contents = Vec::new();
    if let Some(id) = before_id {
        contents.push(Object::Reference(id));
    }
    contents.extend(content_refs(doc, page_id)?);
    if let Some(id) = after_id {
        contents.push(Object::Reference(id));
    }

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Contents", Object::Array(contents));

    Ok(())
}

/// Resolve the page's Resources dictionary into an owned copy
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    match inherited_attribute(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(res_id)) => match doc.get_object(res_id) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    }
}

/// Register an XObject under `name` in the page's Resources
///
/// The page gets its own direct Resources dictionary so that shared resource
/// objects of other pages are left untouched.
pub(crate) fn add_xobject_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    xobject_id: ObjectId,
) -> Result<()> {
    let mut resources = page_resources(doc, page_id);

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(xo)) => xo.clone(),
        Ok(Object::Reference(xo_id)) => match doc.get_object(*xo_id) {
            Ok(Object::Dictionary(xo)) => xo.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    };
    xobjects.set(name, Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{build_pdf, content_of};

    #[test]
    fn test_page_size_reads_media_box() {
        let mut doc = lopdf::Document::load_mem(&build_pdf(&[(300.0, 400.0, "X")])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let size = page_size(&doc, page_id).unwrap();
        assert_eq!(size, PageSize::new(300.0, 400.0));

        // Remove from page and set on the parent: inheritance must still find it
        let parent = {
            let page = doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
            page.remove(b"MediaBox");
            page.get(b"Parent").unwrap().as_reference().unwrap()
        };
        doc.get_object_mut(parent)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "MediaBox",
                vec![Object::Integer(0), Object::Integer(0), Object::Integer(200), Object::Integer(100)],
            );
        assert_eq!(page_size(&doc, page_id).unwrap(), PageSize::new(200.0, 100.0));
    }

    #[test]
    fn test_wrap_keeps_original_between() {
        let mut doc = lopdf::Document::load_mem(&build_pdf(&[(100.0, 100.0, "MID")])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        wrap_page_content(&mut doc, page_id, b"q\n", b"Q\n").unwrap();

        let content = content_of(&doc, page_id);
        let q = content.find("q\n").unwrap();
        let mid = content.find("MID").unwrap();
        let end = content.rfind("Q\n").unwrap();
        assert!(q < mid && mid < end);
    }

    #[test]
    fn test_add_xobject_preserves_existing_fonts() {
        let mut doc = lopdf::Document::load_mem(&build_pdf(&[(100.0, 100.0, "A")])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let form_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        add_xobject_to_page(&mut doc, page_id, "Extra", form_id).unwrap();

        let resources = page_resources(&doc, page_id);
        assert!(resources.get(b"Font").is_ok());
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobjects.get(b"Extra").unwrap().as_reference().unwrap(), form_id);
    }
}
