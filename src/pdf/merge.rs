//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use lopdf::{Document, Object, ObjectId, Dictionary};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layout::PageSize;
use super::content::{inherited_attribute, INHERITABLE_KEYS};
use super::normalize::{normalize_page, Normalization};

/// Role a source plays in a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    /// Primary document produced upstream
    Content,
    /// Caller-supplied document appended after the content
    Attachment,
    /// Fixed boilerplate document appended last
    Insert,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceRole::Content => "content",
            SourceRole::Attachment => "attachment",
            SourceRole::Insert => "insert",
        };
        f.write_str(name)
    }
}

/// One input document, as raw bytes
#[derive(Debug, Clone)]
pub struct PageSource {
    pub role: SourceRole,
    pub bytes: Vec<u8>,
}

impl PageSource {
    pub fn new(role: SourceRole, bytes: Vec<u8>) -> Self {
        Self { role, bytes }
    }
}

/// Result of a merge: the new document plus page accounting
#[derive(Debug)]
pub struct MergeOutput {
    pub document: Document,
    /// Pages contributed by each source, in source order
    pub page_counts: Vec<(SourceRole, usize)>,
    /// Number of pages that had to be resized or scaled
    pub normalized: usize,
}

impl MergeOutput {
    pub fn total(&self) -> usize {
        self.page_counts.iter().map(|(_, n)| n).sum()
    }

    /// Pages contributed by `role`, summed if the role appears more than once
    pub fn pages_from(&self, role: SourceRole) -> usize {
        self.page_counts
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, n)| n)
            .sum()
    }
}

/// Parse a source, mapping failures to a role-tagged error
fn load_source(source: &PageSource) -> Result<Document> {
    let doc = Document::load_mem(&source.bytes).map_err(|e| Error::MalformedSource {
        role: source.role,
        reason: e.to_string(),
    })?;

    if doc.get_pages().is_empty() {
        return Err(Error::MalformedSource {
            role: source.role,
            reason: "document has no pages".to_string(),
        });
    }

    Ok(doc)
}

/// Copy inherited attributes onto the page itself so they survive
/// reparenting under the new page tree.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    for key in INHERITABLE_KEYS {
        let has_own = doc.get_object(page_id)?.as_dict()?.has(key);
        if !has_own {
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                inherited.push((key, value));
            }
        }
    }

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in inherited {
        page_dict.set(key, value);
    }
    Ok(())
}

/// Attribute a page-level failure to the source the page came from
fn malformed(role: SourceRole, error: Error) -> Error {
    match error {
        Error::MalformedSource { .. } => error,
        other => Error::MalformedSource { role, reason: other.to_string() },
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(|t| t.as_name()),
            Ok(b"Catalog") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Merge sources into one new document, normalizing foreign pages
///
/// Pages appear in source order, then natural page order within each
/// source. Any source that fails to parse aborts the whole merge.
pub fn merge_sources(sources: &[PageSource], reference: &PageSize) -> Result<MergeOutput> {
    if sources.is_empty() {
        return Err(Error::General("No input sources provided".to_string()));
    }

    // Load everything first so a bad source fails before any work is done
    let documents = sources
        .iter()
        .map(|source| load_source(source).map(|doc| (source.role, doc)))
        .collect::<Result<Vec<_>>>()?;

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<(SourceRole, ObjectId)> = Vec::new();
    let mut page_counts = Vec::with_capacity(documents.len());
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (role, mut doc) in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // get_pages() is ordered by page number
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &pages {
            materialize_inherited(&mut doc, page_id).map_err(|e| malformed(role, e))?;
        }

        debug!("Source {} contributes {} pages", role, pages.len());
        page_counts.push((role, pages.len()));
        page_ids.extend(pages.into_iter().map(|id| (role, id)));

        // The old page trees are replaced by a single new one
        objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_page_tree_node(object)),
        );
    }

    let mut merged_doc = Document::with_version("1.5");
    merged_doc.objects.extend(objects);

    // new_object_id() must hand out IDs above everything just copied in
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&(_, id)| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged_doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut normalized = 0;
    for &(role, page_id) in &page_ids {
        merged_doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Parent", Object::Reference(pages_id));

        let outcome = normalize_page(&mut merged_doc, page_id, reference).map_err(|e| malformed(role, e))?;
        if outcome != Normalization::Conforming {
            normalized += 1;
        }
    }

    info!(
        "Merged {} sources into {} pages ({} normalized)",
        page_counts.len(),
        page_ids.len(),
        normalized
    );

    Ok(MergeOutput {
        document: merged_doc,
        page_counts,
        normalized,
    })
}

/// Options for merging PDF files from disk
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
    /// Page size every output page is normalized to
    pub reference: PageSize,
}

/// Merge PDF files into a single normalized PDF file
///
/// The first file is treated as the content source, later files as
/// attachments. Returns the total number of pages written.
pub fn merge_files(options: &MergeOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::General("No input files provided".to_string()));
    }

    let mut sources = Vec::with_capacity(options.input_paths.len());
    for (i, path) in options.input_paths.iter().enumerate() {
        let role = if i == 0 { SourceRole::Content } else { SourceRole::Attachment };
        sources.push(PageSource::new(role, read_existing(path)?));
    }

    let mut output = merge_sources(&sources, &options.reference)?;
    output.document.compress();
    output.document.save(&options.output_path)?;

    Ok(output.total())
}

/// Read a file, reporting a missing file distinctly from other IO errors
pub(crate) fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::content::page_size;
    use crate::pdf::test_support::{build_pdf, content_of};

    const A4: (f64, f64) = (595.28, 841.89);

    fn source(role: SourceRole, pages: &[(f64, f64, &str)]) -> PageSource {
        PageSource::new(role, build_pdf(pages))
    }

    #[test]
    fn test_merge_preserves_order() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1"), (A4.0, A4.1, "A2")]),
            source(SourceRole::Attachment, &[(A4.0, A4.1, "B1")]),
            source(SourceRole::Insert, &[(A4.0, A4.1, "C1"), (A4.0, A4.1, "C2"), (A4.0, A4.1, "C3")]),
        ];

        let output = merge_sources(&sources, &PageSize::A4).unwrap();
        let pages = output.document.get_pages();
        assert_eq!(pages.len(), 6);

        let markers: Vec<String> = pages
            .values()
            .map(|&id| content_of(&output.document, id))
            .collect();
        for (content, expected) in markers.iter().zip(["A1", "A2", "B1", "C1", "C2", "C3"]) {
            assert!(content.contains(&format!("({})", expected)), "{} missing in {}", expected, content);
        }
    }

    #[test]
    fn test_page_count_accounting() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1"), (A4.0, A4.1, "A2")]),
            source(SourceRole::Attachment, &[(612.0, 792.0, "B1")]),
        ];

        let output = merge_sources(&sources, &PageSize::A4).unwrap();
        assert_eq!(output.pages_from(SourceRole::Content), 2);
        assert_eq!(output.pages_from(SourceRole::Attachment), 1);
        assert_eq!(output.pages_from(SourceRole::Insert), 0);
        assert_eq!(output.total(), 3);
        assert_eq!(output.normalized, 1);
    }

    #[test]
    fn test_foreign_pages_normalized() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1")]),
            source(SourceRole::Attachment, &[(1190.0, 1684.0, "BIG"), (200.0, 300.0, "SMALL")]),
        ];

        let output = merge_sources(&sources, &PageSize::A4).unwrap();
        for &page_id in output.document.get_pages().values() {
            let size = page_size(&output.document, page_id).unwrap();
            assert!(size.conforms_to(&PageSize::A4), "page not normalized: {:?}", size);
        }
        assert_eq!(output.normalized, 2);
    }

    #[test]
    fn test_inherited_resources_survive() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1")]),
            source(SourceRole::Attachment, &[(A4.0, A4.1, "B1")]),
        ];

        let output = merge_sources(&sources, &PageSize::A4).unwrap();
        for &page_id in output.document.get_pages().values() {
            let page = output.document.get_object(page_id).unwrap().as_dict().unwrap();
            assert!(page.get(b"Resources").is_ok());
            assert!(page.get(b"MediaBox").is_ok());
        }
    }

    #[test]
    fn test_merged_output_round_trips() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1")]),
            source(SourceRole::Insert, &[(A4.0, A4.1, "C1")]),
        ];

        let mut output = merge_sources(&sources, &PageSize::A4).unwrap();
        let mut bytes = Vec::new();
        output.document.save_to(&mut bytes).unwrap();

        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[test]
    fn test_malformed_source_is_reported_with_role() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1")]),
            PageSource::new(SourceRole::Attachment, b"this is not a pdf at all".to_vec()),
        ];

        match merge_sources(&sources, &PageSize::A4) {
            Err(Error::MalformedSource { role, .. }) => assert_eq!(role, SourceRole::Attachment),
            other => panic!("expected malformed attachment, got {:?}", other.map(|o| o.total())),
        }
    }

    /// A one-page PDF whose page carries no MediaBox anywhere in its tree
    fn without_media_box(marker: &str) -> Vec<u8> {
        let mut doc = Document::load_mem(&build_pdf(&[(A4.0, A4.1, marker)])).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap().remove(b"MediaBox");
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_unmeasurable_page_blames_its_source() {
        let sources = vec![
            source(SourceRole::Content, &[(A4.0, A4.1, "A1")]),
            PageSource::new(SourceRole::Attachment, without_media_box("B1")),
        ];

        match merge_sources(&sources, &PageSize::A4) {
            Err(Error::MalformedSource { role, .. }) => assert_eq!(role, SourceRole::Attachment),
            other => panic!("expected malformed attachment, got {:?}", other.map(|o| o.total())),
        }
    }

    #[test]
    fn test_merge_empty_source_list() {
        let result = merge_sources(&[], &PageSize::A4);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_files_nonexistent() {
        let options = MergeOptions {
            input_paths: vec![PathBuf::from("nonexistent.pdf")],
            output_path: PathBuf::from("merged.pdf"),
            reference: PageSize::A4,
        };
        assert!(matches!(merge_files(&options), Err(Error::FileNotFound(_))));
    }
}
