//! Branding overlays stamped directly onto finished pages
//!
//! Every page gets its own Form XObject holding the header and footer
//! elements for that page. The page's original content is wrapped in `q`/`Q`
//! first, so whatever graphics state it leaves behind cannot shift or
//! recolor the overlay.
//!
//! Layout, top to bottom:
//! - header band clear (every page except the first)
//! - logo on the direction's leading side
//! - primary-colored rule under the header
//! - issue date under the rule
//! - neutral rule near the bottom
//! - document code (logo side) and page label (other side) under it

use std::fmt::Write as _;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::config::{Color, DateSide, TemplateConfig};
use crate::direction::Direction;
use crate::error::Result;
use crate::layout::{Margins, PageSize, Rect};
use super::content::{add_xobject_to_page, media_box, page_size, wrap_page_content};
use super::font::{encode_win_ansi, StampFont};
use super::logo::LogoImage;

/// Resource name of the per-page overlay XObject
pub const STAMP_XOBJECT: &str = "PdcStamp";

const FONT_RESOURCE: &str = "F1";
const LOGO_RESOURCE: &str = "Logo";

const MARGINS: Margins = Margins::uniform(40.0);
const HEADER_BAND_HEIGHT: f64 = 110.0;
const LOGO_BOX_WIDTH: f64 = 120.0;
const LOGO_BOX_HEIGHT: f64 = 50.0;
const LOGO_TOP_OFFSET: f64 = 20.0;
const HEADER_RULE_OFFSET: f64 = 80.0;
const ISSUE_DATE_OFFSET: f64 = 98.0;
const FOOTER_RULE_Y: f64 = 55.0;
const FOOTER_TEXT_Y: f64 = 38.0;
const TEXT_SIZE: f64 = 9.0;
const HEADER_RULE_WIDTH: f64 = 1.5;
const FOOTER_RULE_WIDTH: f64 = 0.75;

/// Everything the stamper needs besides the document itself
#[derive(Debug, Clone)]
pub struct StampContext<'a> {
    pub reference: PageSize,
    pub template: &'a TemplateConfig,
    pub font: &'a StampFont,
    pub logo: Option<&'a LogoImage>,
    /// Already formatted issue date
    pub issue_date: String,
    pub document_code: String,
}

/// Outcome of stamping a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StampReport {
    pub stamped: usize,
    /// 1-based numbers of pages left unstamped because of their size
    pub skipped: Vec<u32>,
}

/// Horizontal side of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Side that leads for a writing direction
    pub fn leading(direction: Direction) -> Self {
        if direction.is_mirrored() {
            Side::Right
        } else {
            Side::Left
        }
    }
}

/// A single line of overlay text pinned to one margin
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub side: Side,
    /// Left edge of the text
    pub x: f64,
    /// Baseline
    pub y: f64,
    pub width: f64,
}

/// A horizontal line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
    pub line_width: f64,
    pub color: Color,
}

/// Resolved positions of every overlay element on one page
#[derive(Debug, Clone, PartialEq)]
pub struct StampLayout {
    pub clear_band: Option<Rect>,
    pub logo: Option<Rect>,
    pub header_rule: Rule,
    pub issue_date: Option<TextPlacement>,
    pub footer_rule: Rule,
    pub document_code: Option<TextPlacement>,
    pub page_label: Option<TextPlacement>,
}

impl StampLayout {
    /// Lay out page `index` (0-based) of a `total`-page document
    pub fn for_page(index: usize, total: usize, direction: Direction, ctx: &StampContext<'_>) -> Self {
        let page = ctx.reference;
        let template = ctx.template;
        let labels = template.labels(direction);
        let leading = Side::leading(direction);

        // The first page's top margin is left alone
        let clear_band = (index > 0).then(|| {
            Rect::new(0.0, page.height - HEADER_BAND_HEIGHT, page.width, HEADER_BAND_HEIGHT)
        });

        let logo = ctx.logo.map(|logo| {
            let aspect = logo.aspect_ratio();
            let width = LOGO_BOX_WIDTH.min(LOGO_BOX_HEIGHT / aspect);
            let height = width * aspect;
            let x = match leading {
                Side::Left => MARGINS.left,
                Side::Right => page.width - MARGINS.right - width,
            };
            Rect::new(x, page.height - LOGO_TOP_OFFSET - height, width, height)
        });

        let full_width_rule = |y: f64, line_width: f64, color: Color| Rule {
            x1: MARGINS.left,
            x2: MARGINS.left + MARGINS.content_width(&page),
            y,
            line_width,
            color,
        };

        let header_rule = full_width_rule(
            page.height - HEADER_RULE_OFFSET,
            HEADER_RULE_WIDTH,
            template.primary_color,
        );
        let footer_rule = full_width_rule(FOOTER_RULE_Y, FOOTER_RULE_WIDTH, template.neutral_color);

        let date_side = match template.issue_date_side {
            DateSide::WithLogo => leading,
            DateSide::OppositeLogo => leading.opposite(),
        };
        let issue_date = (template.show_issue_date && !ctx.issue_date.is_empty()).then(|| {
            let text = format!("{}: {}", labels.issue_date, ctx.issue_date);
            place_text(text, date_side, page.height - ISSUE_DATE_OFFSET, &page, ctx.font)
        });

        let document_code = (template.show_document_code && !ctx.document_code.is_empty())
            .then(|| place_text(ctx.document_code.clone(), leading, FOOTER_TEXT_Y, &page, ctx.font));

        let page_label = template.show_page_numbers.then(|| {
            let text = labels.page_label(index + 1, total);
            place_text(text, leading.opposite(), FOOTER_TEXT_Y, &page, ctx.font)
        });

        Self {
            clear_band,
            logo,
            header_rule,
            issue_date,
            footer_rule,
            document_code,
            page_label,
        }
    }

    /// Content stream operators for this layout
    pub fn render(&self, template: &TemplateConfig) -> Vec<u8> {
        let mut content = String::from("q\n");

        if let Some(band) = &self.clear_band {
            let _ = write!(
                content,
                "1 1 1 rg\n{:.2} {:.2} {:.2} {:.2} re\nf\n",
                band.x, band.y, band.width, band.height
            );
        }

        if let Some(logo) = &self.logo {
            let _ = write!(
                content,
                "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ\n",
                logo.width, logo.height, logo.x, logo.y, LOGO_RESOURCE
            );
        }

        render_rule(&mut content, &self.header_rule);

        content.push_str(&template.text_color.fill_op());
        content.push('\n');
        if let Some(text) = &self.issue_date {
            render_text(&mut content, text);
        }

        render_rule(&mut content, &self.footer_rule);

        content.push_str(&template.text_color.fill_op());
        content.push('\n');
        for text in [&self.document_code, &self.page_label].into_iter().flatten() {
            render_text(&mut content, text);
        }

        content.push_str("Q\n");
        content.into_bytes()
    }
}

fn place_text(text: String, side: Side, y: f64, page: &PageSize, font: &StampFont) -> TextPlacement {
    let width = font.text_width(&encode_win_ansi(&text), TEXT_SIZE);
    let x = match side {
        Side::Left => MARGINS.left,
        Side::Right => page.width - MARGINS.right - width,
    };
    TextPlacement { text, side, x, y, width }
}

fn render_rule(content: &mut String, rule: &Rule) {
    let _ = write!(
        content,
        "{}\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
        rule.color.stroke_op(),
        rule.line_width,
        rule.x1,
        rule.y,
        rule.x2,
        rule.y
    );
}

fn render_text(content: &mut String, text: &TextPlacement) {
    let hex: String = encode_win_ansi(&text.text)
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect();
    let _ = write!(
        content,
        "BT\n/{} {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n<{}> Tj\nET\n",
        FONT_RESOURCE, TEXT_SIZE, text.x, text.y, hex
    );
}

/// Create the overlay Form XObject for one page
///
/// The layout is drawn from `(0, 0)`; `origin` is the lower-left corner of
/// the page's MediaBox, so the form lands on the visible page.
fn create_stamp_xobject(
    doc: &mut Document,
    content: Vec<u8>,
    font_id: ObjectId,
    logo_id: Option<ObjectId>,
    reference: &PageSize,
    origin: (f64, f64),
) -> ObjectId {
    let mut resources = dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    };
    if let Some(logo_id) = logo_id {
        resources.set("XObject", dictionary! { LOGO_RESOURCE => logo_id });
    }

    let xobject_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "FormType" => 1,
        "BBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(reference.width as f32),
            Object::Real(reference.height as f32),
        ],
        "Matrix" => vec![
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
            Object::Real(origin.0 as f32),
            Object::Real(origin.1 as f32),
        ],
        "Resources" => resources,
    };

    doc.add_object(Stream::new(xobject_dict, content))
}

/// Stamp every conforming page of `doc`
///
/// Pages whose size does not match the reference are skipped and reported.
/// Calling this twice on the same document stamps every page twice.
pub fn stamp_all(doc: &mut Document, direction: Direction, ctx: &StampContext<'_>) -> Result<StampReport> {
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    let total = pages.len();

    let font_id = ctx.font.install(doc);
    let logo_id = ctx.logo.map(|logo| logo.install(doc));

    let mut report = StampReport::default();
    for (index, (number, page_id)) in pages.into_iter().enumerate() {
        match page_size(doc, page_id) {
            Ok(size) if size.conforms_to(&ctx.reference) => {}
            Ok(size) => {
                warn!(
                    "Skipping stamp on page {}: {:.2}x{:.2} does not match reference",
                    number, size.width, size.height
                );
                report.skipped.push(number);
                continue;
            }
            Err(e) => {
                warn!("Skipping stamp on page {}: {}", number, e);
                report.skipped.push(number);
                continue;
            }
        }

        let layout = StampLayout::for_page(index, total, direction, ctx);
        let origin = media_box(doc, page_id)
            .map_or((0.0, 0.0), |[x0, y0, x1, y1]| (x0.min(x1), y0.min(y1)));
        let xobject_id = create_stamp_xobject(
            doc,
            layout.render(ctx.template),
            font_id,
            logo_id,
            &ctx.reference,
            origin,
        );
        add_xobject_to_page(doc, page_id, STAMP_XOBJECT, xobject_id)?;

        let invoke = format!("Q\nq\n/{} Do\nQ\n", STAMP_XOBJECT);
        wrap_page_content(doc, page_id, b"q\n", invoke.as_bytes())?;

        report.stamped += 1;
    }

    debug!(
        "Stamped {} of {} pages ({:?} direction)",
        report.stamped, total, direction
    );

    Ok(report)
}
