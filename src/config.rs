//! Engine configuration: output location, overlay assets and templates
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::date::format_date;
use crate::direction::Direction;
use crate::error::{Error, Result};

/// RGB color with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn light_gray() -> Self {
        Self::new(0.8, 0.8, 0.8)
    }

    /// PDF fill color operator
    pub fn fill_op(&self) -> String {
        format!("{} {} {} rg", self.r, self.g, self.b)
    }

    /// PDF stroke color operator
    pub fn stroke_op(&self) -> String {
        format!("{} {} {} RG", self.r, self.g, self.b)
    }
}

/// Where the issue date sits relative to the logo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSide {
    WithLogo,
    OppositeLogo,
}

/// Label strings for one writing direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    /// Prefix for the issue date, e.g. "Issue Date"
    pub issue_date: String,
    /// Page label pattern with `{page}` and `{total}` placeholders
    pub page: String,
}

impl Labels {
    pub fn page_label(&self, page: usize, total: usize) -> String {
        self.page
            .replace("{page}", &page.to_string())
            .replace("{total}", &total.to_string())
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            issue_date: "Issue Date".to_string(),
            page: "Page {page} of {total}".to_string(),
        }
    }
}

/// Overlay template: labels, colors and field visibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub forward_labels: Labels,

    #[serde(default)]
    pub mirrored_labels: Labels,

    /// Header rule color
    #[serde(default = "default_primary_color")]
    pub primary_color: Color,

    /// Footer rule color
    #[serde(default = "Color::light_gray")]
    pub neutral_color: Color,

    #[serde(default = "Color::black")]
    pub text_color: Color,

    #[serde(default = "default_date_side")]
    pub issue_date_side: DateSide,

    /// chrono format string for the issue date
    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default = "default_true")]
    pub show_issue_date: bool,

    #[serde(default = "default_true")]
    pub show_document_code: bool,

    #[serde(default = "default_true")]
    pub show_page_numbers: bool,
}

const fn default_primary_color() -> Color {
    Color::new(0.11, 0.30, 0.55)
}

const fn default_date_side() -> DateSide {
    DateSide::OppositeLogo
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::receipt()
    }
}

impl TemplateConfig {
    /// Receipt layout: date opposite the logo
    pub fn receipt() -> Self {
        Self {
            forward_labels: Labels::default(),
            mirrored_labels: Labels::default(),
            primary_color: default_primary_color(),
            neutral_color: Color::light_gray(),
            text_color: Color::black(),
            issue_date_side: DateSide::OppositeLogo,
            date_format: default_date_format(),
            show_issue_date: true,
            show_document_code: true,
            show_page_numbers: true,
        }
    }

    /// Request-for-quotation layout: date under the logo, green rules
    pub fn rfq() -> Self {
        Self {
            forward_labels: Labels {
                issue_date: "RFQ Date".to_string(),
                page: "Page {page} of {total}".to_string(),
            },
            mirrored_labels: Labels {
                issue_date: "RFQ Date".to_string(),
                page: "{page} / {total}".to_string(),
            },
            primary_color: Color::new(0.05, 0.45, 0.30),
            issue_date_side: DateSide::WithLogo,
            ..Self::receipt()
        }
    }

    /// Look up a built-in template by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "receipt" => Some(Self::receipt()),
            "rfq" | "quotation" => Some(Self::rfq()),
            _ => None,
        }
    }

    /// Reject a date format that cannot be applied to a calendar date
    pub fn check(&self) -> Result<()> {
        format_date(&chrono::NaiveDate::MIN, &self.date_format).map(|_| ())
    }

    pub fn labels(&self, direction: Direction) -> &Labels {
        match direction {
            Direction::Forward => &self.forward_labels,
            Direction::Mirrored => &self.mirrored_labels,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory receiving composed documents
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Boilerplate document appended after the attachment, if it exists
    #[serde(default)]
    pub insert_path: Option<PathBuf>,

    /// Logo image (PNG or JPEG) drawn in the header
    #[serde(default)]
    pub logo_path: Option<PathBuf>,

    /// TrueType font to embed; the standard Helvetica font is used otherwise
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    #[serde(default)]
    pub template: TemplateConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            insert_path: None,
            logo_path: None,
            font_path: None,
            template: TemplateConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.template.check()?;
        Ok(config)
    }

    /// Load from ./pdf-compose.toml, or defaults when it is absent or broken
    pub fn load() -> Self {
        let local_config = PathBuf::from("pdf-compose.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from {}", local_config.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", local_config.display(), e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_label_placeholders() {
        let labels = Labels::default();
        assert_eq!(labels.page_label(2, 7), "Page 2 of 7");
    }

    #[test]
    fn test_presets() {
        assert_eq!(TemplateConfig::preset("receipt"), Some(TemplateConfig::receipt()));
        let rfq = TemplateConfig::preset("RFQ").unwrap();
        assert_eq!(rfq.issue_date_side, DateSide::WithLogo);
        assert_eq!(rfq.labels(Direction::Mirrored).page_label(1, 3), "1 / 3");
        assert!(TemplateConfig::preset("invoice").is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            output_dir = "/tmp/composed"
            insert_path = "assets/terms.pdf"

            [template]
            issue_date_side = "with_logo"
            show_page_numbers = false
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/composed"));
        assert_eq!(config.insert_path, Some(PathBuf::from("assets/terms.pdf")));
        assert!(config.logo_path.is_none());
        assert_eq!(config.template.issue_date_side, DateSide::WithLogo);
        assert!(!config.template.show_page_numbers);
        assert!(config.template.show_document_code);
        assert_eq!(config.template.forward_labels, Labels::default());
    }

    #[test]
    fn test_date_format_checked() {
        let mut template = TemplateConfig::receipt();
        assert!(template.check().is_ok());

        template.date_format = "%Y-%m-%d %H:%M".to_string();
        assert!(matches!(template.check(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file_rejects_time_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pdf-compose.toml");
        std::fs::write(&path, "[template]\ndate_format = \"%Y-%m-%d %H:%M\"\n").unwrap();

        assert!(matches!(EngineConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = EngineConfig::from_file("does-not-exist.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_color_ops() {
        let c = Color::new(1.0, 0.5, 0.0);
        assert_eq!(c.fill_op(), "1 0.5 0 rg");
        assert_eq!(c.stroke_op(), "1 0.5 0 RG");
    }
}
