//! A4 PDF output for salary slips using the built-in Helvetica fonts.

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};

use super::layout::{slip_layout, Block};
use super::{DocumentRenderer, SlipContext};
use crate::errors::{AppError, AppResult};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const RIGHT_COLUMN: f32 = 105.0;
const TOTAL_LABEL_COLUMN: f32 = 110.0;
const LAYER_NAME: &str = "Layer 1";
/// Points to millimetres
const PT: f32 = 0.352_778;

/// Renders salary slips with printpdf.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render_slip(&self, context: &SlipContext) -> AppResult<Vec<u8>> {
        let title = format!(
            "Salary Slip {} {}",
            context.employee.code_or_placeholder(),
            context.slip.period()
        );
        let blocks = slip_layout(context);

        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        let mut cursor = Cursor {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT - MARGIN,
            regular,
            bold,
        };
        for block in &blocks {
            cursor.draw(block);
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::internal(format!("PDF rendering failed: {}", e))
}

/// Write position on the current page.
struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    /// Baseline of the next line, millimetres from the bottom edge
    y: f32,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Cursor<'_> {
    /// Start a new page when `height` no longer fits.
    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn right_aligned(&self, text: &str, size: f32, bold: bool) {
        let x = PAGE_WIDTH - MARGIN - text_width(text, size);
        self.text(text, size, x, bold);
    }

    fn centered(&self, text: &str, size: f32, bold: bool) {
        let x = ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(MARGIN);
        self.text(text, size, x, bold);
    }

    fn rule(&self, thickness: f32) {
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn draw(&mut self, block: &Block) {
        match block {
            Block::Title(text) => {
                self.reserve(10.0);
                self.y -= 6.0;
                self.centered(text, 18.0, true);
                self.y -= 6.0;
            }
            Block::Subtitle(text) => {
                self.reserve(8.0);
                self.centered(text, 11.0, false);
                self.y -= 6.0;
            }
            Block::Rule(thickness) => {
                self.reserve(4.0);
                self.rule(*thickness);
                self.y -= 6.0;
            }
            Block::Heading(text) => {
                self.reserve(9.0);
                self.y -= 2.0;
                self.text(text, 12.0, MARGIN, true);
                self.y -= 6.5;
            }
            Block::Pair(left, right) => {
                self.reserve(6.0);
                self.text(left, 10.0, MARGIN, false);
                self.text(right, 10.0, RIGHT_COLUMN, false);
                self.y -= 5.5;
            }
            Block::Field(text) => {
                self.reserve(6.0);
                self.text(text, 10.0, MARGIN, false);
                self.y -= 5.5;
            }
            Block::ColumnHeader { left, right } => {
                self.reserve(6.0);
                self.text(left, 10.0, MARGIN, true);
                self.right_aligned(right, 10.0, true);
                self.y -= 3.0;
            }
            Block::Item { label, amount } => {
                self.reserve(6.0);
                self.text(label, 10.0, MARGIN, false);
                self.right_aligned(amount, 10.0, false);
                self.y -= 5.5;
            }
            Block::Total {
                label,
                amount,
                emphasis,
            } => {
                let size = if *emphasis { 12.0 } else { 10.0 };
                self.reserve(7.0);
                self.y -= 1.0;
                self.text(label, size, TOTAL_LABEL_COLUMN, true);
                self.right_aligned(amount, size, true);
                self.y -= if *emphasis { 7.0 } else { 5.5 };
            }
            Block::Paragraph(text) => {
                let width = PAGE_WIDTH - 2.0 * MARGIN;
                for line in wrap(text, 10.0, width) {
                    self.reserve(6.0);
                    self.text(&line, 10.0, MARGIN, false);
                    self.y -= 5.0;
                }
            }
            Block::Footer(text) => {
                self.reserve(5.0);
                self.text(text, 8.0, MARGIN, false);
                self.y -= 5.0;
            }
            Block::CenteredFooter(text) => {
                self.reserve(5.0);
                self.centered(text, 8.0, false);
                self.y -= 5.0;
            }
            Block::Gap(mm) => {
                self.y -= mm;
            }
        }
    }
}

/// Helvetica advance width in thousandths of an em, close enough for layout.
fn glyph_width(c: char) -> f32 {
    match c {
        '0'..='9' => 556.0,
        ' ' | ',' | '.' | ':' | '/' | '\'' => 278.0,
        '-' | '(' | ')' => 333.0,
        'i' | 'j' | 'l' => 222.0,
        'f' | 't' | 'I' => 278.0,
        'm' | 'w' => 833.0,
        'M' | 'W' => 889.0,
        'a'..='z' => 520.0,
        'A'..='Z' => 680.0,
        _ => 600.0,
    }
}

/// Width of `text` in millimetres at `size` points.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() / 1000.0 * size * PT
}

/// Greedy word wrap to `width` millimetres.
fn wrap(text: &str, size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if text_width(&candidate, size) > width && !current.is_empty() {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}
