//! PDF Composition Library
//!
//! Builds print-ready documents from an upstream-rendered content PDF.
//! This library provides functionality to:
//! - Merge a content PDF with an optional attachment and a fixed insert
//! - Normalize every page to A4, shrinking oversized content and centering it
//! - Stamp a logo, issue date, document code and page numbers on every page
//! - Validate PDF byte streams and count their pages
//! - Mirror the overlay layout for right-to-left documents
//!
//! # Example
//!
//! ```no_run
//! use pdf_compose::{Composer, CompositionRequest, Direction, EngineConfig};
//! use pdf_compose::compose::Attachment;
//! use std::path::PathBuf;
//!
//! let composer = Composer::new(EngineConfig::load()).expect("Failed to load assets");
//!
//! let mut request = CompositionRequest::new(
//!     "rendered/receipt.pdf",
//!     chrono::Local::now().date_naive(),
//! );
//! request.attachment = Some(Attachment::Path(PathBuf::from("invoice.pdf")));
//! request.direction = Direction::Mirrored;
//! request.document_code = "RCPT-0042".to_string();
//!
//! let result = composer.compose(&request).expect("Failed to compose");
//! println!("{} pages written to {}", result.page_count.total, result.filepath.display());
//! ```

pub mod compose;
pub mod config;
pub mod date;
pub mod direction;
pub mod error;
pub mod layout;
pub mod pdf;

// Re-export commonly used items
pub use compose::{Composer, CompositionRequest, CompositionResult, PageCountBreakdown};
pub use config::{EngineConfig, TemplateConfig};
pub use direction::{Direction, DirectionClassifier};
pub use error::{Error, Result};
pub use layout::PageSize;
