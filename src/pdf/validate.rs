//! Source validation and metadata extraction

use lopdf::{Document, Object};
use tracing::debug;
use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        Ok(_) => return Err(Error::General("Pages is not a reference".to_string())),
        Err(_) => return Err(Error::General("No Pages in catalog".to_string())),
    };

    let pages_dict = doc.get_object(pages_id)?.as_dict()?;

    match pages_dict.get(b"Count") {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        Ok(_) => Err(Error::General("Count is not a non-negative integer".to_string())),
        Err(_) => Err(Error::General("No Count in Pages".to_string())),
    }
}

/// Check whether `bytes` parse as a PDF with at least one page
///
/// Never fails: any parse problem yields `false`.
pub fn validate(bytes: &[u8]) -> bool {
    match Document::load_mem(bytes) {
        Ok(doc) => {
            let pages = doc.get_pages().len();
            if pages == 0 {
                debug!("Rejected PDF: parsed but has no pages");
            }
            pages > 0
        }
        Err(e) => {
            debug!("Rejected PDF: {}", e);
            false
        }
    }
}

/// Number of pages declared by the document's page tree
///
/// Unlike [`validate`], parse failures are reported as errors.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(bytes)?;
    let count = count_pages_from_catalog(&doc)?;

    if count == 0 {
        return Err(Error::EmptyPdf("page tree is empty".to_string()));
    }

    Ok(count)
}

/// Basic document information
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// PDF header version, e.g. "1.7"
    pub version: String,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_object(info_id).ok()?.as_dict().ok()?;
    let bytes = info.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract document information from PDF bytes
pub fn document_info(bytes: &[u8]) -> Result<DocumentInfo> {
    let doc = Document::load_mem(bytes)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf("page tree is empty".to_string()));
    }

    Ok(DocumentInfo {
        page_count,
        version: doc.version.clone(),
        title: info_string(&doc, b"Title"),
        author: info_string(&doc, b"Author"),
    })
}
