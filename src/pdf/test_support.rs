//! In-memory PDF builders for unit tests

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Build a PDF with one page per `(width, height, marker)` entry.
///
/// Each page shows its marker text so page order can be checked after
/// merging. Fonts live on the `Pages` node and are inherited by every page.
pub(crate) fn build_pdf(pages: &[(f64, f64, &str)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for (width, height, marker) in pages {
        let content = format!("BT /F1 12 Tf 10 10 Td ({}) Tj ET\n", marker);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(*width as f32),
                Object::Real(*height as f32),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize test PDF");
    bytes
}

/// Concatenated, decompressed content of a page as text
pub(crate) fn content_of(doc: &Document, page_id: ObjectId) -> String {
    let bytes = doc.get_page_content(page_id).expect("page content");
    String::from_utf8_lossy(&bytes).into_owned()
}
