//! Overlay font: the standard Helvetica font or an embedded TrueType file
//!
//! Text is written with WinAnsiEncoding, so every character is a single byte
//! and widths come from a 32..=255 table.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use ttf_parser::Face;

use crate::error::{Error, Result};

const FIRST_CHAR: u8 = 32;

/// WinAnsi codes 128..=159 that differ from Latin-1
const WIN_ANSI_HIGH: [(u8, char); 27] = [
    (128, '\u{20AC}'), (130, '\u{201A}'), (131, '\u{0192}'), (132, '\u{201E}'),
    (133, '\u{2026}'), (134, '\u{2020}'), (135, '\u{2021}'), (136, '\u{02C6}'),
    (137, '\u{2030}'), (138, '\u{0160}'), (139, '\u{2039}'), (140, '\u{0152}'),
    (142, '\u{017D}'), (145, '\u{2018}'), (146, '\u{2019}'), (147, '\u{201C}'),
    (148, '\u{201D}'), (149, '\u{2022}'), (150, '\u{2013}'), (151, '\u{2014}'),
    (152, '\u{02DC}'), (153, '\u{2122}'), (154, '\u{0161}'), (155, '\u{203A}'),
    (156, '\u{0153}'), (158, '\u{017E}'), (159, '\u{0178}'),
];

/// Helvetica advance widths for 32..=126, in 1/1000 em
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Encode one character as a WinAnsi byte
fn encode_char(c: char) -> Option<u8> {
    let code = c as u32;
    if (32..=126).contains(&code) || (160..=255).contains(&code) {
        return Some(code as u8);
    }
    WIN_ANSI_HIGH
        .iter()
        .find(|(_, mapped)| *mapped == c)
        .map(|(byte, _)| *byte)
}

/// Decode a WinAnsi byte back to the character it draws
fn decode_byte(byte: u8) -> Option<char> {
    match byte {
        32..=126 | 160..=255 => Some(char::from(byte)),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(code, _)| *code == byte)
            .map(|(_, c)| *c),
    }
}

/// Encode text for a WinAnsi font; characters outside the encoding become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| encode_char(c).unwrap_or(b'?')).collect()
}

#[derive(Debug, Clone)]
enum FontProgram {
    Standard(&'static str),
    TrueType { data: Vec<u8>, name: String, descriptor: Descriptor },
}

#[derive(Debug, Clone)]
struct Descriptor {
    bbox: [i64; 4],
    ascent: i64,
    descent: i64,
    cap_height: i64,
}

/// Font used for overlay text
#[derive(Debug, Clone)]
pub struct StampFont {
    program: FontProgram,
    /// Advance widths for codes 32..=255, in 1/1000 em
    widths: Vec<u16>,
}

impl StampFont {
    /// Standard Helvetica; no font file needed
    pub fn helvetica() -> Self {
        let widths = (FIRST_CHAR..=255)
            .map(|code| match code {
                32..=126 => HELVETICA_ASCII[(code - FIRST_CHAR) as usize],
                _ => 556,
            })
            .collect();
        Self { program: FontProgram::Standard("Helvetica"), widths }
    }

    /// Parse a TrueType file for embedding
    pub fn from_truetype(data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|e| Error::Font(format!("Failed to parse font: {e}")))?;

        let upem = i64::from(face.units_per_em());
        if upem == 0 {
            return Err(Error::Font("Font has zero units per em".to_string()));
        }
        let scale = |v: i64| v * 1000 / upem;

        let widths = (FIRST_CHAR..=255)
            .map(|code| {
                decode_byte(code)
                    .and_then(|c| face.glyph_index(c))
                    .and_then(|g| face.glyph_hor_advance(g))
                    .map_or(0, |adv| scale(i64::from(adv)) as u16)
            })
            .collect();

        let bbox = face.global_bounding_box();
        let descriptor = Descriptor {
            bbox: [
                scale(i64::from(bbox.x_min)),
                scale(i64::from(bbox.y_min)),
                scale(i64::from(bbox.x_max)),
                scale(i64::from(bbox.y_max)),
            ],
            ascent: scale(i64::from(face.ascender())),
            descent: scale(i64::from(face.descender())),
            cap_height: scale(i64::from(face.capital_height().unwrap_or(face.ascender()))),
        };

        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .map(|n| n.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect::<String>())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "StampFont".to_string());

        Ok(Self {
            program: FontProgram::TrueType { data, name, descriptor },
            widths,
        })
    }

    /// PostScript name written as BaseFont
    pub fn base_font(&self) -> &str {
        match &self.program {
            FontProgram::Standard(name) => name,
            FontProgram::TrueType { name, .. } => name,
        }
    }

    /// Width of already-encoded text in points
    pub fn text_width(&self, encoded: &[u8], font_size: f64) -> f64 {
        let units: u64 = encoded
            .iter()
            .map(|&b| {
                if b >= FIRST_CHAR {
                    u64::from(self.widths[(b - FIRST_CHAR) as usize])
                } else {
                    0
                }
            })
            .sum();
        units as f64 * font_size / 1000.0
    }

    /// Add the font objects to `doc`, returning the font dictionary ID
    pub fn install(&self, doc: &mut Document) -> ObjectId {
        match &self.program {
            FontProgram::Standard(name) => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => *name,
                "Encoding" => "WinAnsiEncoding",
            }),
            FontProgram::TrueType { data, name, descriptor } => {
                let font_stream_id = doc.add_object(Stream::new(
                    dictionary! { "Length1" => data.len() as i64 },
                    data.clone(),
                ));

                let [x0, y0, x1, y1] = descriptor.bbox;
                let descriptor_id = doc.add_object(dictionary! {
                    "Type" => "FontDescriptor",
                    "FontName" => name.as_str(),
                    "Flags" => 32, // Nonsymbolic
                    "FontBBox" => vec![Object::Integer(x0), Object::Integer(y0), Object::Integer(x1), Object::Integer(y1)],
                    "ItalicAngle" => 0,
                    "Ascent" => descriptor.ascent,
                    "Descent" => descriptor.descent,
                    "CapHeight" => descriptor.cap_height,
                    "StemV" => 80,
                    "FontFile2" => font_stream_id,
                });

                let widths: Vec<Object> = self
                    .widths
                    .iter()
                    .map(|&w| Object::Integer(i64::from(w)))
                    .collect();

                doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "TrueType",
                    "BaseFont" => name.as_str(),
                    "Encoding" => "WinAnsiEncoding",
                    "FirstChar" => i64::from(FIRST_CHAR),
                    "LastChar" => 255,
                    "Widths" => widths,
                    "FontDescriptor" => descriptor_id,
                })
            }
        }
    }
}
