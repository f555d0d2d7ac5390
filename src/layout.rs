//! Page geometry calculations
//!
//! All values are PDF points (1/72 inch) with the origin at the bottom-left
//! corner of the page.

use serde::{Deserialize, Serialize};

/// Pages whose dimensions differ from the reference by less than this many
/// points on both axes are considered conforming.
pub const SIZE_TOLERANCE: f64 = 1.0;

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// A4 size (210mm × 297mm)
    pub const A4: Self = Self { width: 595.28, height: 841.89 };

    /// US Letter size (8.5" × 11")
    pub const LETTER: Self = Self { width: 612.0, height: 792.0 };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether this size matches `reference` within [`SIZE_TOLERANCE`]
    pub fn conforms_to(&self, reference: &PageSize) -> bool {
        (self.width - reference.width).abs() < SIZE_TOLERANCE
            && (self.height - reference.height).abs() < SIZE_TOLERANCE
    }
}

/// Axis-aligned rectangle, `(x, y)` is the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// Uniform scale plus translation that places a foreign page's content on
/// the reference page.
///
/// Applied as the PDF matrix `scale 0 0 scale translate_x translate_y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Fit {
    /// Compute the shrink-to-fit transform for a page of `size`.
    ///
    /// The scale never exceeds 1. When no shrinking is needed the content
    /// keeps its original position and the translation is zero.
    pub fn for_page(size: &PageSize, reference: &PageSize) -> Self {
        let scale = (reference.width / size.width)
            .min(reference.height / size.height)
            .min(1.0);

        if scale < 1.0 {
            Self {
                scale,
                translate_x: (reference.width - size.width * scale) / 2.0,
                translate_y: (reference.height - size.height * scale) / 2.0,
            }
        } else {
            Self { scale: 1.0, translate_x: 0.0, translate_y: 0.0 }
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scale >= 1.0 && self.translate_x == 0.0 && self.translate_y == 0.0
    }
}

/// Margins for overlay placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    /// Create margins with same value on all sides
    pub const fn uniform(margin: f64) -> Self {
        Self { top: margin, bottom: margin, left: margin, right: margin }
    }

    /// Width available between the left and right margins
    pub fn content_width(&self, page: &PageSize) -> f64 {
        page.width - self.left - self.right
    }
}
