//! Error types for the PDF composition library

use std::path::PathBuf;
use thiserror::Error;

use crate::pdf::SourceRole;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF composition library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required input file is missing
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The always-required content source could not be parsed
    #[error("Content document is not a valid PDF: {0}")]
    MalformedContent(String),

    /// A merge source could not be parsed
    #[error("{role} source is not a valid PDF: {reason}")]
    MalformedSource { role: SourceRole, reason: String },

    /// Document parsed but has no pages
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// Font loading or embedding error
    #[error("Font error: {0}")]
    Font(String),

    /// Logo image decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Date parsing error
    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    /// General error
    #[error("{0}")]
    General(String),
}
