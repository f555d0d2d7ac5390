//! Layout direction for stamped overlays
//!
//! The composition engine only consumes a [`Direction`]. How that value is
//! chosen is caller policy; the classifiers here are ready-made policies
//! that look at sample text from the source record.

use serde::{Deserialize, Serialize};

/// Which horizontal side receives the logo and the document code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Left-to-right documents: logo and document code on the left
    #[default]
    Forward,
    /// Right-to-left documents: everything mirrored to the right
    Mirrored,
}

impl Direction {
    pub fn is_mirrored(self) -> bool {
        matches!(self, Direction::Mirrored)
    }
}

/// Policy that picks a direction from sample text fields
pub trait DirectionClassifier {
    fn classify(&self, fields: &[&str]) -> Direction;
}

/// Mirrored when right-to-left letters outnumber all other letters across
/// every field combined.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptMajority;

impl DirectionClassifier for ScriptMajority {
    fn classify(&self, fields: &[&str]) -> Direction {
        let (rtl, other) = fields
            .iter()
            .map(|field| count_letters(field))
            .fold((0, 0), |(r, o), (fr, fo)| (r + fr, o + fo));

        if rtl > other {
            Direction::Mirrored
        } else {
            Direction::Forward
        }
    }
}

/// The first field containing any letter decides; fields are given in
/// priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstNonEmptyField;

impl DirectionClassifier for FirstNonEmptyField {
    fn classify(&self, fields: &[&str]) -> Direction {
        for field in fields {
            let (rtl, other) = count_letters(field);
            if rtl + other > 0 {
                return if rtl > other { Direction::Mirrored } else { Direction::Forward };
            }
        }
        Direction::Forward
    }
}

/// Count (right-to-left, other) alphabetic characters
fn count_letters(text: &str) -> (usize, usize) {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .fold((0, 0), |(rtl, other), c| {
            if is_rtl_letter(c) {
                (rtl + 1, other)
            } else {
                (rtl, other + 1)
            }
        })
}

fn is_rtl_letter(c: char) -> bool {
    matches!(c as u32,
        0x0590..=0x05FF     // Hebrew
        | 0x0600..=0x06FF   // Arabic
        | 0x0700..=0x074F   // Syriac
        | 0x0750..=0x077F   // Arabic Supplement
        | 0x0780..=0x07BF   // Thaana
        | 0x08A0..=0x08FF   // Arabic Extended-A
        | 0xFB1D..=0xFB4F   // Hebrew presentation forms
        | 0xFB50..=0xFDFF   // Arabic presentation forms A
        | 0xFE70..=0xFEFF)  // Arabic presentation forms B
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_latin_is_forward() {
        assert_eq!(ScriptMajority.classify(&["Invoice for ACME", "مرحبا"]), Direction::Forward);
    }

    #[test]
    fn test_majority_arabic_is_mirrored() {
        assert_eq!(ScriptMajority.classify(&["عرض سعر", "شركة النور", "PO"]), Direction::Mirrored);
    }

    #[test]
    fn test_empty_fields_default_forward() {
        assert_eq!(ScriptMajority.classify(&[]), Direction::Forward);
        assert_eq!(FirstNonEmptyField.classify(&["", "123"]), Direction::Forward);
    }

    #[test]
    fn test_first_field_takes_precedence() {
        let fields = ["  42 ", "שלום", "Hello world and more"];
        assert_eq!(FirstNonEmptyField.classify(&fields), Direction::Mirrored);
        assert_eq!(ScriptMajority.classify(&fields), Direction::Forward);
    }

    #[test]
    fn test_direction_serde_names() {
        let parsed: Direction = serde_json::from_str("\"mirrored\"").unwrap();
        assert!(parsed.is_mirrored());
        assert!(!Direction::default().is_mirrored());
    }
}
