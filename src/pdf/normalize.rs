//! Page geometry normalization
//!
//! Foreign-sized pages are resized to the reference geometry. Oversized
//! content is shrunk uniformly and centered; undersized content is never
//! enlarged and stays where it was drawn.

use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::Result;
use crate::layout::{Fit, PageSize};
use super::content::{media_box, page_size, wrap_page_content};

/// Boxes that would otherwise clip or override the new MediaBox
const SECONDARY_BOXES: [&[u8]; 4] = [b"CropBox", b"BleedBox", b"TrimBox", b"ArtBox"];

/// What normalization did to a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Page already matched the reference; nothing changed
    Conforming,
    /// Page was smaller than the reference; only the page box changed
    Resized,
    /// Content was shrunk and centered
    Scaled(Fit),
}

/// Normalize a single page of `doc` in place
pub fn normalize_page(doc: &mut Document, page_id: ObjectId, reference: &PageSize) -> Result<Normalization> {
    let size = page_size(doc, page_id)?;
    if size.conforms_to(reference) {
        return Ok(Normalization::Conforming);
    }

    let fit = Fit::for_page(&size, reference);
    let outcome = if fit.is_identity() {
        Normalization::Resized
    } else {
        // Content drawn relative to a non-zero MediaBox origin must be
        // shifted back to the origin before it lands on the new page.
        let [llx, lly, _, _] = media_box(doc, page_id).unwrap_or([0.0; 4]);
        let tx = fit.translate_x - fit.scale * llx;
        let ty = fit.translate_y - fit.scale * lly;
        let prefix = format!("q\n{:.6} 0 0 {:.6} {:.4} {:.4} cm\n", fit.scale, fit.scale, tx, ty);
        wrap_page_content(doc, page_id, prefix.as_bytes(), b"Q\n")?;
        Normalization::Scaled(fit)
    };

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for key in SECONDARY_BOXES {
        page_dict.remove(key);
    }
    page_dict.set(
        "MediaBox",
        vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(reference.width as f32),
            Object::Real(reference.height as f32),
        ],
    );

    debug!(
        "Normalized page {:?} from {:.2}x{:.2}: {:?}",
        page_id, size.width, size.height, outcome
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::{build_pdf, content_of};

    fn single_page(width: f64, height: f64) -> (Document, ObjectId) {
        let doc = Document::load_mem(&build_pdf(&[(width, height, "BODY")])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        (doc, page_id)
    }

    #[test]
    fn test_conforming_page_is_untouched() {
        let (mut doc, page_id) = single_page(595.28, 841.89);
        let before_dict = format!("{:?}", doc.get_object(page_id).unwrap());
        let before_content = content_of(&doc, page_id);

        let outcome = normalize_page(&mut doc, page_id, &PageSize::A4).unwrap();

        assert_eq!(outcome, Normalization::Conforming);
        assert_eq!(format!("{:?}", doc.get_object(page_id).unwrap()), before_dict);
        assert_eq!(content_of(&doc, page_id), before_content);
    }

    #[test]
    fn test_small_page_resized_without_moving_content() {
        let (mut doc, page_id) = single_page(300.0, 400.0);
        let before_content = content_of(&doc, page_id);

        let outcome = normalize_page(&mut doc, page_id, &PageSize::A4).unwrap();

        assert_eq!(outcome, Normalization::Resized);
        assert!(page_size(&doc, page_id).unwrap().conforms_to(&PageSize::A4));
        assert_eq!(content_of(&doc, page_id), before_content);
        assert!(!content_of(&doc, page_id).contains(" cm"));
    }

    #[test]
    fn test_large_page_scaled_and_centered() {
        let (mut doc, page_id) = single_page(842.0, 1190.0);

        let outcome = normalize_page(&mut doc, page_id, &PageSize::A4).unwrap();

        let fit = match outcome {
            Normalization::Scaled(fit) => fit,
            other => panic!("expected scaling, got {:?}", other),
        };
        assert!(fit.scale < 1.0);
        assert!(page_size(&doc, page_id).unwrap().conforms_to(&PageSize::A4));

        let content = content_of(&doc, page_id);
        assert!(content.starts_with("q\n"));
        assert!(content.contains(" cm\n"));
        assert!(content.contains("BODY"));
        assert!(content.trim_end().ends_with('Q'));
    }

    #[test]
    fn test_secondary_boxes_removed() {
        let (mut doc, page_id) = single_page(1000.0, 1000.0);
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("CropBox", vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)]);

        normalize_page(&mut doc, page_id, &PageSize::A4).unwrap();

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        assert!(page.get(b"CropBox").is_err());
    }
}
