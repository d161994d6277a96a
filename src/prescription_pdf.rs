//! A4 prescription rendering via `printpdf`.
//!
//! Layout, top to bottom: a tinted header band with the clinic name, the
//! appointment details, the medicines table and an optional advice block.
//! Every page ends with a footer rule and the footer note. Coordinates are
//! millimetres from the bottom-left corner, as `printpdf` expects.

use std::io::BufWriter;

use chrono::{DateTime, Utc};
use printpdf::path::PaintMode;
use printpdf::*;
use thiserror::Error;

use crate::config::{Config, DEFAULT_CLINIC_NAME, DEFAULT_PDF_FOOTER};
use crate::models::Prescription;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN;

const HEADER_BAND_H: f32 = 24.0;
/// Rows may not extend below this line; the footer lives underneath.
const BOTTOM_RESERVE: f32 = 42.0;
const FOOTER_RULE_Y: f32 = 17.0;
const FOOTER_TEXT_Y: f32 = 11.0;

const H1: f32 = 18.0;
const H2: f32 = 14.0;
const BODY: f32 = 12.0;
const TABLE: f32 = 11.0;
const SMALL: f32 = 11.0;
const FOOTER: f32 = 10.0;

const LINE_GAP: f32 = 6.0;
const ROW_MIN_H: f32 = 8.5;
const ROW_LINE_H: f32 = 4.8;
const CELL_PAD_X: f32 = 2.8;
const COLUMN_SHARES: [f32; 3] = [0.55, 0.20, 0.25];
const TABLE_HEADINGS: [&str; 3] = ["Medicine", "Dose (M/N/N)", "Timing"];

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF write error: {0}")]
    Write(String),
}

/// Text and colours that vary per deployment.
#[derive(Debug, Clone)]
pub struct PdfTheme {
    pub clinic_name: String,
    pub subtitle: String,
    pub footer: String,
    pub text: (u8, u8, u8),
    pub sub: (u8, u8, u8),
    pub border: (u8, u8, u8),
    pub primary: (u8, u8, u8),
    pub soft: (u8, u8, u8),
    pub table_header: (u8, u8, u8),
}

impl Default for PdfTheme {
    fn default() -> Self {
        Self {
            clinic_name: DEFAULT_CLINIC_NAME.into(),
            subtitle: "Prescription".into(),
            footer: DEFAULT_PDF_FOOTER.into(),
            text: (0x0f, 0x17, 0x2a),
            sub: (0x47, 0x55, 0x69),
            border: (0xe5, 0xe7, 0xeb),
            primary: (0x25, 0x63, 0xeb),
            soft: (0xf8, 0xfa, 0xfc),
            table_header: (0xee, 0xf2, 0xff),
        }
    }
}

impl PdfTheme {
    pub fn from_config(config: &Config) -> Self {
        Self {
            clinic_name: config.clinic_name.clone(),
            footer: config.pdf_footer.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

/// How many characters of `size`-pt text roughly fit in `width_mm`.
fn chars_that_fit(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * PT_TO_MM * AVG_GLYPH_EM)) as usize).max(1)
}

fn estimated_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVG_GLYPH_EM
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let current_len = current.chars().count();
        if current_len + word.chars().count() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

struct Canvas<'a> {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    theme: &'a PdfTheme,
    pages: usize,
    y: f32,
}

impl<'a> Canvas<'a> {
    fn new(title: &str, theme: &'a PdfTheme) -> Result<Self, PdfError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Font(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Font(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            theme,
            pages: 1,
            y: PAGE_H - MARGIN,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = PAGE_H - MARGIN;
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, color: (u8, u8, u8)) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(rgb(color));
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn rule(&self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32) {
        self.layer.set_outline_color(rgb(self.theme.border));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y1)), false),
                (Point::new(Mm(x2), Mm(y2)), false),
            ],
            is_closed: false,
        });
    }

    fn fill(&self, x: f32, y_bottom: f32, w: f32, h: f32, color: (u8, u8, u8)) {
        self.layer.set_fill_color(rgb(color));
        self.layer.add_rect(
            Rect::new(Mm(x), Mm(y_bottom), Mm(x + w), Mm(y_bottom + h)).with_mode(PaintMode::Fill),
        );
    }

    fn header(&mut self) {
        let theme = self.theme;
        self.fill(0.0, PAGE_H - HEADER_BAND_H, PAGE_W, HEADER_BAND_H, theme.soft);
        self.text(&theme.clinic_name, H1, MARGIN, PAGE_H - 12.0, true, theme.primary);
        self.text(&theme.subtitle, SMALL, MARGIN, PAGE_H - 19.0, false, theme.sub);
        self.rule(MARGIN, PAGE_H - HEADER_BAND_H, PAGE_W - MARGIN, PAGE_H - HEADER_BAND_H, 0.75);
        self.y = PAGE_H - HEADER_BAND_H - 10.0;
    }

    fn footer(&self) {
        let theme = self.theme;
        self.rule(MARGIN, FOOTER_RULE_Y, PAGE_W - MARGIN, FOOTER_RULE_Y, 0.75);
        for (i, line) in wrap_text(&theme.footer, chars_that_fit(CONTENT_W, FOOTER))
            .iter()
            .enumerate()
        {
            let x = MARGIN + ((CONTENT_W - estimated_width(line, FOOTER)) / 2.0).max(0.0);
            let y = FOOTER_TEXT_Y - i as f32 * 4.0;
            self.text(line, FOOTER, x, y, false, theme.sub);
        }
    }

    fn heading(&mut self, title: &str) {
        self.text(title, H2, MARGIN, self.y, true, self.theme.text);
        self.y -= LINE_GAP + 1.5;
    }

    fn labelled_line(&mut self, label: &str, value: &str) {
        let max = chars_that_fit(CONTENT_W, BODY);
        for (i, line) in wrap_text(&format!("{label}: {value}"), max).iter().enumerate() {
            if i > 0 {
                self.y -= LINE_GAP - 1.0;
            }
            self.text(line, BODY, MARGIN, self.y, false, self.theme.sub);
        }
        self.y -= LINE_GAP;
    }

    fn break_page(&mut self) {
        self.footer();
        self.new_page();
    }

    /// Break to a new page if `needed` mm would cross into the footer area.
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM_RESERVE {
            self.break_page();
        }
    }

    fn save(self) -> Result<RenderedPdf, PdfError> {
        let pages = self.pages;
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| PdfError::Write(e.to_string()))?;
        let bytes = buf.into_inner().map_err(|e| PdfError::Write(e.to_string()))?;
        Ok(RenderedPdf { bytes, pages })
    }
}

/// Column x offsets and widths across the content area.
fn columns() -> [(f32, f32); 3] {
    let mut x = MARGIN;
    COLUMN_SHARES.map(|share| {
        let w = CONTENT_W * share;
        let col = (x, w);
        x += w;
        col
    })
}

struct TableWriter {
    segment_top: f32,
    row_index: usize,
}

impl TableWriter {
    fn begin(canvas: &mut Canvas<'_>) -> Self {
        let mut table = Self {
            segment_top: canvas.y,
            row_index: 0,
        };
        table.header_row(canvas);
        table
    }

    fn header_row(&mut self, canvas: &mut Canvas<'_>) {
        self.segment_top = canvas.y;
        let cells = TABLE_HEADINGS.map(|h| vec![h.to_string()]);
        let shade = canvas.theme.table_header;
        self.draw_row(canvas, &cells, Some(shade), true);
    }

    fn draw_row(
        &mut self,
        canvas: &mut Canvas<'_>,
        cells: &[Vec<String>; 3],
        shade: Option<(u8, u8, u8)>,
        bold: bool,
    ) {
        let height = row_height(cells);
        let top = canvas.y;
        let bottom = top - height;
        if let Some(color) = shade {
            canvas.fill(MARGIN, bottom, CONTENT_W, height, color);
        }
        for ((x, _), lines) in columns().iter().zip(cells) {
            for (i, line) in lines.iter().enumerate() {
                let baseline = top - 5.8 - i as f32 * ROW_LINE_H;
                canvas.text(line, TABLE, x + CELL_PAD_X, baseline, bold, canvas.theme.text);
            }
        }
        canvas.rule(MARGIN, bottom, MARGIN + CONTENT_W, bottom, 0.5);
        canvas.y = bottom;
    }

    fn body_row(&mut self, canvas: &mut Canvas<'_>, values: [&str; 3]) {
        let cells = wrap_cells(values);
        if canvas.y - row_height(&cells) < BOTTOM_RESERVE {
            self.close(canvas);
            canvas.break_page();
            self.header_row(canvas);
        }
        let shade = (self.row_index % 2 == 0).then_some(canvas.theme.soft);
        self.draw_row(canvas, &cells, shade, false);
        self.row_index += 1;
    }

    /// Outer border and column dividers for the segment on this page.
    fn close(&self, canvas: &Canvas<'_>) {
        let top = self.segment_top;
        let bottom = canvas.y;
        let right = MARGIN + CONTENT_W;
        canvas.rule(MARGIN, top, right, top, 0.75);
        canvas.rule(MARGIN, bottom, right, bottom, 0.75);
        canvas.rule(MARGIN, top, MARGIN, bottom, 0.75);
        canvas.rule(right, top, right, bottom, 0.75);
        for (x, _) in columns().iter().skip(1) {
            canvas.rule(*x, top, *x, bottom, 0.5);
        }
    }
}

fn wrap_cells(values: [&str; 3]) -> [Vec<String>; 3] {
    let cols = columns();
    [0, 1, 2].map(|i| {
        let (_, w) = cols[i];
        wrap_text(values[i], chars_that_fit(w - 2.0 * CELL_PAD_X, TABLE))
    })
}

fn row_height(cells: &[Vec<String>; 3]) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    ROW_MIN_H + (lines - 1) as f32 * ROW_LINE_H
}

/// Render one prescription to PDF bytes.
pub fn render_prescription(
    presc: &Prescription,
    appointment_at: &DateTime<Utc>,
    theme: &PdfTheme,
) -> Result<RenderedPdf, PdfError> {
    let mut canvas = Canvas::new("Prescription", theme)?;
    canvas.header();

    canvas.heading("Appointment Information");
    canvas.labelled_line("Doctor", &presc.doctor_name);
    canvas.labelled_line("Patient", &presc.patient_name);
    canvas.labelled_line("Patient Email", &presc.patient_email);
    canvas.labelled_line(
        "Date of Appointment",
        &appointment_at.format("%d %b %Y, %H:%M UTC").to_string(),
    );

    canvas.y -= 4.0;
    canvas.ensure_room(LINE_GAP + 2.0 * ROW_MIN_H);
    canvas.heading("Prescribed Medicines");
    let mut table = TableWriter::begin(&mut canvas);
    for item in &presc.items {
        table.body_row(&mut canvas, [&item.name, &item.dose, item.timing.label()]);
    }
    table.close(&canvas);

    if let Some(advice) = presc.advice.as_deref().filter(|a| !a.trim().is_empty()) {
        canvas.y -= 10.0;
        canvas.ensure_room(LINE_GAP + 2.0 * LINE_GAP);
        canvas.heading("Advice / Suggestion");
        for line in wrap_text(advice, chars_that_fit(CONTENT_W, BODY)) {
            canvas.ensure_room(LINE_GAP);
            canvas.text(&line, BODY, MARGIN, canvas.y, false, theme.text);
            canvas.y -= LINE_GAP - 0.5;
        }
    }

    canvas.footer();
    canvas.save()
}
