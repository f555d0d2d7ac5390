//! Composition orchestration
//!
//! A [`Composer`] turns one upstream-rendered content PDF, plus an optional
//! attachment and the configured insert, into a single stamped document in
//! the output directory.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use lopdf::Document;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::date::{format_date, now_stamp};
use crate::direction::Direction;
use crate::error::{Error, Result};
use crate::layout::PageSize;
use crate::pdf::{
    merge::read_existing, merge_sources, page_size, stamp_all, validate, LogoImage, MergeOutput, PageSource, SourceRole,
    StampContext, StampFont, StampReport,
};

/// Every composed page is normalized to this size
pub const REFERENCE: PageSize = PageSize::A4;

/// Caller-supplied document appended after the content
#[derive(Debug, Clone)]
pub enum Attachment {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// One composition job
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    /// Content PDF produced upstream; always required
    pub content: PathBuf,
    pub attachment: Option<Attachment>,
    /// Append the configured insert when it exists on disk
    pub include_insert: bool,
    pub direction: Direction,
    pub document_code: String,
    pub issue_date: NaiveDate,
    /// Base name for the output file, without extension
    pub output_name: Option<String>,
}

impl CompositionRequest {
    pub fn new(content: impl Into<PathBuf>, issue_date: NaiveDate) -> Self {
        Self {
            content: content.into(),
            attachment: None,
            include_insert: true,
            direction: Direction::Forward,
            document_code: String::new(),
            issue_date,
            output_name: None,
        }
    }
}

/// Pages contributed by each source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCountBreakdown {
    pub content: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert: Option<usize>,
    pub total: usize,
}

impl PageCountBreakdown {
    fn from_counts(counts: &[(SourceRole, usize)]) -> Self {
        let pages = |role: SourceRole| -> Option<usize> {
            counts
                .iter()
                .filter(|(r, _)| *r == role)
                .map(|(_, n)| *n)
                .reduce(|a, b| a + b)
        };
        Self {
            content: pages(SourceRole::Content).unwrap_or(0),
            attachment: pages(SourceRole::Attachment),
            insert: pages(SourceRole::Insert),
            total: counts.iter().map(|(_, n)| n).sum(),
        }
    }
}

/// What a composition produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResult {
    pub filename: String,
    pub filepath: PathBuf,
    /// True when more than one source was merged
    pub merged: bool,
    pub page_count: PageCountBreakdown,
    /// Why optional sources were left out, if they were
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_error: Option<String>,
}

/// Composition engine; holds only immutable, preloaded assets
#[derive(Debug)]
pub struct Composer {
    config: EngineConfig,
    font: StampFont,
    logo: Option<LogoImage>,
}

impl Composer {
    /// Create a composer, loading the font and logo named by `config`
    ///
    /// A configured font that cannot be loaded is an error. A logo that
    /// cannot be loaded is logged and left out.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.template.check()?;

        let font = match &config.font_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound(path.clone()));
                }
                StampFont::from_truetype(std::fs::read(path)?)?
            }
            None => StampFont::helvetica(),
        };

        let logo = config.logo_path.as_deref().and_then(|path| match LogoImage::from_path(path) {
            Ok(logo) => Some(logo),
            Err(e) => {
                warn!("Logo {} not used: {}", path.display(), e);
                None
            }
        });

        debug!("Composer ready (font: {}, logo: {})", font.base_font(), logo.is_some());

        Ok(Self { config, font, logo })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one composition end to end
    pub fn compose(&self, request: &CompositionRequest) -> Result<CompositionResult> {
        let content_bytes = read_existing(&request.content)?;
        if !validate(&content_bytes) {
            return Err(Error::MalformedContent(request.content.display().to_string()));
        }

        let mut optional = Vec::new();
        let mut merge_error = None;

        if let Some(attachment) = &request.attachment {
            match load_attachment(attachment) {
                Ok(bytes) => optional.push(PageSource::new(SourceRole::Attachment, bytes)),
                Err(e) => {
                    warn!("Attachment skipped: {}", e);
                    merge_error = Some(e.to_string());
                }
            }
        }

        // An insert is only added when no optional source has failed yet
        if request.include_insert && merge_error.is_none() {
            match self.load_insert() {
                Ok(Some(bytes)) => optional.push(PageSource::new(SourceRole::Insert, bytes)),
                Ok(None) => {}
                Err(e) => {
                    warn!("Insert skipped: {}", e);
                    merge_error = Some(e.to_string());
                }
            }
        }

        if merge_error.is_some() {
            optional.clear();
        }

        let had_optional = !optional.is_empty();
        let (mut document, page_counts) = match self.assemble(&content_bytes, optional) {
            Ok(assembled) => assembled,
            Err(Error::MalformedSource { role: SourceRole::Content, reason }) => {
                return Err(Error::MalformedContent(reason))
            }
            Err(e) if had_optional => {
                warn!("Merge failed, continuing with content only: {}", e);
                merge_error = Some(e.to_string());
                self.assemble(&content_bytes, Vec::new()).map_err(content_failure)?
            }
            Err(e) => return Err(content_failure(e)),
        };
        let merged = page_counts.len() > 1;

        let report = self.stamp(&mut document, request.direction, &request.document_code, &request.issue_date)?;
        if !report.skipped.is_empty() {
            warn!("{} page(s) left unstamped: {:?}", report.skipped.len(), report.skipped);
        }

        let filename = output_filename(request.output_name.as_deref());
        let filepath = self.config.output_dir.join(&filename);
        write_document(&mut document, &self.config.output_dir, &filepath)?;

        if merged {
            remove_superseded(&request.content, &filepath);
        }

        let page_count = PageCountBreakdown::from_counts(&page_counts);
        info!(
            "Composed {} ({} pages, merged: {})",
            filepath.display(),
            page_count.total,
            merged
        );

        Ok(CompositionResult {
            filename,
            filepath,
            merged,
            page_count,
            merge_error,
        })
    }

    /// Stamp an assembled document with this composer's template and assets
    pub fn stamp(
        &self,
        document: &mut Document,
        direction: Direction,
        document_code: &str,
        issue_date: &NaiveDate,
    ) -> Result<StampReport> {
        let issue_date = format_date(issue_date, &self.config.template.date_format)?;
        let ctx = StampContext {
            reference: REFERENCE,
            template: &self.config.template,
            font: &self.font,
            logo: self.logo.as_ref(),
            issue_date,
            document_code: document_code.to_string(),
        };
        stamp_all(document, direction, &ctx)
    }

    /// Validated insert bytes, or `None` when no insert is configured or
    /// the configured file does not exist
    fn load_insert(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = &self.config.insert_path else {
            return Ok(None);
        };
        if !path.exists() {
            debug!("Insert {} not found, skipping", path.display());
            return Ok(None);
        }

        let bytes = std::fs::read(path)?;
        if !validate(&bytes) {
            return Err(Error::MalformedSource {
                role: SourceRole::Insert,
                reason: "failed to parse".to_string(),
            });
        }
        Ok(Some(bytes))
    }

    /// Build the document to stamp and its per-source page counts
    ///
    /// A lone conforming content document is used as-is; anything else goes
    /// through the merger so every page is normalized.
    fn assemble(&self, content: &[u8], optional: Vec<PageSource>) -> Result<(Document, Vec<(SourceRole, usize)>)> {
        if optional.is_empty() {
            let doc = Document::load_mem(content).map_err(|e| Error::MalformedContent(e.to_string()))?;
            if all_pages_conform(&doc).map_err(|e| Error::MalformedContent(e.to_string()))? {
                let pages = doc.get_pages().len();
                debug!("Content already conforms, merge skipped");
                return Ok((doc, vec![(SourceRole::Content, pages)]));
            }
        }

        let mut sources = Vec::with_capacity(optional.len() + 1);
        sources.push(PageSource::new(SourceRole::Content, content.to_vec()));
        sources.extend(optional);

        let MergeOutput { document, page_counts, normalized } = merge_sources(&sources, &REFERENCE)?;
        debug!("Merged {} source(s), {} page(s) normalized", page_counts.len(), normalized);
        Ok((document, page_counts))
    }
}

/// Content problems surface as `MalformedContent`
fn content_failure(error: Error) -> Error {
    match error {
        Error::MalformedSource { reason, .. } => Error::MalformedContent(reason),
        other => other,
    }
}

/// Read and validate an attachment
fn load_attachment(attachment: &Attachment) -> Result<Vec<u8>> {
    let bytes = match attachment {
        Attachment::Bytes(bytes) => bytes.clone(),
        Attachment::Path(path) => read_existing(path)?,
    };

    if !validate(&bytes) {
        return Err(Error::MalformedSource {
            role: SourceRole::Attachment,
            reason: "failed to parse".to_string(),
        });
    }
    Ok(bytes)
}

fn all_pages_conform(doc: &Document) -> Result<bool> {
    for page_id in doc.get_pages().into_values() {
        if !page_size(doc, page_id)?.conforms_to(&REFERENCE) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Keep only characters that are safe in a file name
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .trim_end_matches(".pdf")
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Output file name for a request
pub fn output_filename(base: Option<&str>) -> String {
    match base.map(sanitize_name).filter(|name| !name.is_empty()) {
        Some(name) => format!("{}.pdf", name),
        None => format!("document_{}.pdf", now_stamp()),
    }
}

/// Write to a temporary file next to `path`, then rename it into place
fn write_document(doc: &mut Document, dir: &Path, path: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{}.tmp", file_name));
    std::fs::write(&temp_path, &bytes)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Delete the single-source content file a merge replaced
fn remove_superseded(content: &Path, output: &Path) {
    let same_file = match (content.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => content == output,
    };
    if same_file {
        return;
    }

    match std::fs::remove_file(content) {
        Ok(()) => debug!("Removed superseded {}", content.display()),
        Err(e) => warn!("Could not remove {}: {}", content.display(), e),
    }
}
