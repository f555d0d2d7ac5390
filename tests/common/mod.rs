//! Shared helpers for integration tests

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

pub const A4: (f64, f64) = (595.28, 841.89);
pub const LETTER: (f64, f64) = (612.0, 792.0);

/// Build a PDF with one page per `(width, height, marker)` entry
pub fn pdf_bytes(pages: &[(f64, f64, &str)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for (width, height, marker) in pages {
        let content = format!("BT /F1 12 Tf 20 20 Td ({}) Tj ET\n", marker);
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
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
    bytes
}

/// Like [`pdf_bytes`], but the pages carry no MediaBox at all
pub fn pdf_bytes_without_media_box(pages: &[&str]) -> Vec<u8> {
    let sized: Vec<(f64, f64, &str)> = pages.iter().map(|m| (A4.0, A4.1, *m)).collect();
    let mut doc = Document::load_mem(&pdf_bytes(&sized)).expect("Failed to reload test PDF");
    let page_ids: Vec<_> = doc.get_pages().into_values().collect();
    for id in page_ids {
        doc.get_object_mut(id)
            .and_then(|o| o.as_dict_mut())
            .expect("page dictionary")
            .remove(b"MediaBox");
    }
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
    bytes
}

/// Write a generated PDF into `dir` and return its path
pub fn write_pdf(dir: &Path, name: &str, pages: &[(f64, f64, &str)]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(pages)).expect("Failed to write test PDF");
    path
}

/// Page sizes of a saved PDF, in page order
pub fn page_sizes(path: &Path) -> Vec<(f64, f64)> {
    let doc = Document::load(path).expect("Failed to load output PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let size = pdf_compose::pdf::page_size(&doc, id).expect("page size");
            (size.width, size.height)
        })
        .collect()
}

/// Concatenated content of every page, in page order
pub fn page_texts(path: &Path) -> Vec<String> {
    let doc = Document::load(path).expect("Failed to load output PDF");
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).expect("content")).into_owned())
        .collect()
}
