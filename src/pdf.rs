// Itinerary download: server-made PDFs, client-side PDFs from markdown and
// the plain-text fallback when neither works.
//
// Layout works in millimetres on an A4 page, the cursor moving down from the
// top; rendering converts to PDF points measured from the bottom.

use crate::error::ExportError;
use crate::markdown::preprocess_itinerary_content;
use crate::state::AppState;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{Datelike, NaiveDate};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

static BASE64_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=]+$").expect("valid base64 alphabet pattern"));

static ORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s").expect("valid ordered item pattern"));

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*]\s+|\d+\.\s+)").expect("valid list marker pattern"));

// Accepts payloads with or without trailing '=' padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub const MIN_BASE64_LEN: usize = 1000;
const PDF_SIGNATURE: &[u8] = b"%PDF";

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";

// Page geometry, millimetres
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const FIRST_PAGE_TOP: f32 = 60.0;
const NEXT_PAGE_TOP: f32 = 20.0;
const PAGE_BOTTOM: f32 = 270.0;
const MARGIN: f32 = 20.0;
const MAX_WIDTH: f32 = 170.0;
const LINE_HEIGHT: f32 = 5.0;
// Average Helvetica advance at 10pt
const CHAR_WIDTH_MM: f32 = 2.0;

const PT_PER_MM: f32 = 72.0 / 25.4;

/// The document the backend attached to a trip response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfDocument {
    pub data: String,
    pub document_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PdfPayload {
    /// Decoded PDF bytes, ready to save.
    Binary(Bytes),
    /// Markdown to lay out on the client.
    Markdown(String),
    /// Marked as a PDF but not decodable as one.
    Undecodable(String),
}

fn normalize_base64(data: &str) -> String {
    data.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}

/// Whether `data` is worth handing to the base64 decoder at all.
pub fn looks_like_base64(data: &str) -> bool {
    let normalized = normalize_base64(data);
    normalized.len() >= MIN_BASE64_LEN && BASE64_CHARS.is_match(&normalized)
}

impl PdfPayload {
    pub fn classify(data: &str, document_type: &str) -> Self {
        if document_type != "pdf" {
            return PdfPayload::Markdown(data.to_string());
        }

        let normalized = normalize_base64(data);
        if normalized.len() < MIN_BASE64_LEN || !BASE64_CHARS.is_match(&normalized) {
            warn!(
                "PDF payload is not base64 ({} characters after normalisation)",
                normalized.len()
            );
            return PdfPayload::Undecodable(data.to_string());
        }

        match LENIENT_BASE64.decode(normalized.as_bytes()) {
            Ok(bytes) if bytes.starts_with(PDF_SIGNATURE) => {
                debug!("Decoded {} PDF bytes", bytes.len());
                PdfPayload::Binary(Bytes::from(bytes))
            }
            Ok(_) => {
                warn!("Decoded payload lacks a PDF signature");
                PdfPayload::Undecodable(data.to_string())
            }
            Err(err) => {
                warn!("PDF payload failed to decode: {}", err);
                PdfPayload::Undecodable(data.to_string())
            }
        }
    }
}

/// A file ready to hand to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

impl DownloadArtifact {
    fn pdf(bytes: impl Into<Bytes>, today: NaiveDate) -> Self {
        Self {
            file_name: download_name(today, "pdf"),
            mime_type: PDF_MIME,
            bytes: bytes.into(),
        }
    }

    fn text(text: &str, today: NaiveDate) -> Self {
        Self {
            file_name: download_name(today, "txt"),
            mime_type: TEXT_MIME,
            bytes: Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }
}

pub fn download_name(today: NaiveDate, extension: &str) -> String {
    format!("Journezy-Itinerary-{}.{}", today.format("%Y-%m-%d"), extension)
}

// Client-side PDF from markdown, plain text if rendering fails
fn markdown_download(markdown: &str, today: NaiveDate) -> DownloadArtifact {
    let sections = parse_markdown_sections(&preprocess_itinerary_content(markdown));
    let layout = layout_sections(&sections);
    match render_pdf(&layout, &PdfMeta::for_date(today)) {
        Ok(bytes) => {
            info!("Built client-side PDF: {} pages, {} bytes", layout.pages.len(), bytes.len());
            DownloadArtifact::pdf(bytes, today)
        }
        Err(err) => {
            warn!("Client-side PDF failed ({}), offering plain text", err);
            DownloadArtifact::text(markdown, today)
        }
    }
}

/// Picks the file to download for the current itinerary.
pub fn prepare_download(state: &AppState, today: NaiveDate) -> Result<DownloadArtifact, ExportError> {
    let document = state.pdf_document();
    let markdown = state.itinerary_markdown();

    match (document, markdown) {
        (None, None) => Err(ExportError::NoDocument),
        (None, Some(markdown)) => Ok(markdown_download(&markdown, today)),
        (Some(doc), markdown) => match PdfPayload::classify(&doc.data, &doc.document_type) {
            PdfPayload::Binary(bytes) => Ok(DownloadArtifact::pdf(bytes, today)),
            PdfPayload::Undecodable(raw) => Ok(DownloadArtifact::text(&raw, today)),
            PdfPayload::Markdown(text) => {
                let source = markdown.unwrap_or(text);
                Ok(markdown_download(&source, today))
            }
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    H1(String),
    H2(String),
    H3(String),
    List(Vec<String>),
    Paragraph(String),
    Highlight(String),
}

fn strip_emphasis(text: &str) -> String {
    text.replace(['*', '_'], "")
}

fn is_highlight(line: &str) -> bool {
    line.starts_with("**") || ["💡", "⚠️", "✨", "🌟"].iter().any(|m| line.contains(m))
}

/// Splits itinerary markdown into the blocks the PDF lays out. Images and
/// HTML wrappers are skipped; consecutive list items form one list.
pub fn parse_markdown_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut list: Option<Vec<String>> = None;

    for line in markdown.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with("<img")
            || trimmed.starts_with("Image:")
            || trimmed.starts_with("<div")
            || trimmed.starts_with("</div>")
        {
            continue;
        }

        let is_item = trimmed.starts_with("- ") || trimmed.starts_with("* ") || ORDERED_ITEM.is_match(trimmed);
        if is_item {
            let item = strip_emphasis(&LIST_MARKER.replace(trimmed, ""));
            list.get_or_insert_with(Vec::new).push(item);
            continue;
        }

        if let Some(items) = list.take() {
            sections.push(Section::List(items));
        }

        let section = if let Some(rest) = trimmed.strip_prefix("# ") {
            Section::H1(strip_emphasis(rest.trim()))
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            Section::H2(strip_emphasis(rest.trim()))
        } else if let Some(rest) = trimmed.strip_prefix("### ") {
            Section::H3(strip_emphasis(rest.trim()))
        } else if is_highlight(trimmed) {
            Section::Highlight(strip_emphasis(trimmed))
        } else {
            Section::Paragraph(strip_emphasis(trimmed))
        };
        sections.push(section);
    }

    if let Some(items) = list {
        sections.push(Section::List(items));
    }
    sections
}

/// Greedy word wrap to `width_mm`; words longer than a line are split.
pub fn wrap_text(text: &str, width_mm: f32) -> Vec<String> {
    let max_chars = ((width_mm / CHAR_WIDTH_MM).floor() as usize).max(1);
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
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
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
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    H1,
    H2,
    H3,
    Bullet,
    ListBody,
    Body,
    Highlight,
}

impl LineStyle {
    fn font_size(self) -> i64 {
        match self {
            LineStyle::H1 => 16,
            LineStyle::H2 => 14,
            LineStyle::H3 => 12,
            _ => 10,
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, LineStyle::H1 | LineStyle::H2 | LineStyle::H3 | LineStyle::Highlight)
    }
}

/// One line of text placed on a page, in millimetres from the top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub style: LineStyle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfLayout {
    pub pages: Vec<Vec<PlacedLine>>,
}

struct Cursor {
    pages: Vec<Vec<PlacedLine>>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: FIRST_PAGE_TOP,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = NEXT_PAGE_TOP;
    }

    fn break_if_full(&mut self) {
        if self.y > PAGE_BOTTOM {
            self.new_page();
        }
    }

    fn place(&mut self, x: f32, text: impl Into<String>, style: LineStyle) {
        let line = PlacedLine {
            x,
            y: self.y,
            text: text.into(),
            style,
        };
        if let Some(page) = self.pages.last_mut() {
            page.push(line);
        }
    }
}

/// Paginates sections top-down with the spacing of the on-screen itinerary.
pub fn layout_sections(sections: &[Section]) -> PdfLayout {
    let mut cursor = Cursor::new();

    for section in sections {
        cursor.break_if_full();

        match section {
            Section::H1(text) => {
                if cursor.y > FIRST_PAGE_TOP {
                    cursor.y += 8.0;
                }
                cursor.place(MARGIN, text.as_str(), LineStyle::H1);
                cursor.y += 14.0;
            }
            Section::H2(text) => {
                if cursor.y > FIRST_PAGE_TOP {
                    cursor.y += 6.0;
                }
                cursor.place(MARGIN, text.as_str(), LineStyle::H2);
                cursor.y += 12.0;
            }
            Section::H3(text) => {
                cursor.y += 4.0;
                cursor.place(MARGIN, text.as_str(), LineStyle::H3);
                cursor.y += 8.0;
            }
            Section::List(items) => {
                for item in items {
                    cursor.break_if_full();
                    for (i, line) in wrap_text(item, MAX_WIDTH - 10.0).into_iter().enumerate() {
                        cursor.break_if_full();
                        if i == 0 {
                            cursor.place(MARGIN + 1.0, "-", LineStyle::Bullet);
                        }
                        cursor.place(MARGIN + 6.0, line, LineStyle::ListBody);
                        cursor.y += LINE_HEIGHT;
                    }
                }
                cursor.y += 3.0;
            }
            Section::Paragraph(text) => {
                for line in wrap_text(text, MAX_WIDTH) {
                    cursor.break_if_full();
                    cursor.place(MARGIN, line, LineStyle::Body);
                    cursor.y += LINE_HEIGHT;
                }
                cursor.y += 4.0;
            }
            Section::Highlight(text) => {
                let lines = wrap_text(text, MAX_WIDTH - 8.0);
                let box_height = lines.len() as f32 * LINE_HEIGHT + 4.0;
                if cursor.y + box_height > PAGE_BOTTOM {
                    cursor.new_page();
                }
                for line in lines {
                    cursor.place(MARGIN + 2.0, line, LineStyle::Highlight);
                    cursor.y += LINE_HEIGHT;
                }
                cursor.y += 6.0;
            }
        }
    }

    debug!("Laid out {} sections on {} pages", sections.len(), cursor.pages.len());
    PdfLayout { pages: cursor.pages }
}

/// Header and footer text.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfMeta {
    pub title: String,
    pub generated_on: String,
    pub year: i32,
}

impl PdfMeta {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            title: "Your Travel Itinerary".to_string(),
            generated_on: date.format("%A, %B %-d, %Y").to_string(),
            year: date.year(),
        }
    }
}

// WinAnsi bytes for the standard fonts; characters outside Latin-1 are dropped
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => Some(c as u32 as u8),
            _ => None,
        })
        .collect()
}

fn to_pt(mm: f32) -> i64 {
    (mm * PT_PER_MM).round() as i64
}

// Baseline y in points for a cursor position in millimetres from the top
fn baseline(y_mm: f32) -> i64 {
    to_pt(PAGE_HEIGHT_MM - y_mm)
}

fn approx_width_mm(text: &str, size: i64) -> f32 {
    text.chars().count() as f32 * CHAR_WIDTH_MM * size as f32 / 10.0
}

fn text_ops(ops: &mut Vec<Operation>, x_mm: f32, y_mm: f32, size: i64, bold: bool, text: &str) {
    let font = if bold { "F2" } else { "F1" };
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![to_pt(x_mm).into(), baseline(y_mm).into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]));
    ops.push(Operation::new("ET", vec![]));
}

fn rule_ops(ops: &mut Vec<Operation>, y_mm: f32, width: Object) {
    ops.push(Operation::new("w", vec![width]));
    ops.push(Operation::new("m", vec![to_pt(MARGIN).into(), baseline(y_mm).into()]));
    ops.push(Operation::new("l", vec![to_pt(PAGE_WIDTH_MM - MARGIN).into(), baseline(y_mm).into()]));
    ops.push(Operation::new("S", vec![]));
}

fn header_ops(ops: &mut Vec<Operation>, meta: &PdfMeta) {
    let center = PAGE_WIDTH_MM / 2.0;
    let title_x = center - approx_width_mm(&meta.title, 28) / 2.0;
    text_ops(ops, title_x, 20.0, 28, true, &meta.title);

    let generated = format!("Generated on {}", meta.generated_on);
    text_ops(ops, center - approx_width_mm(&generated, 11) / 2.0, 30.0, 11, false, &generated);
    let powered = "Powered by Journezy Trip Planner";
    text_ops(ops, center - approx_width_mm(powered, 11) / 2.0, 37.0, 11, false, powered);

    rule_ops(ops, 50.0, Object::Integer(1));
}

fn footer_ops(ops: &mut Vec<Operation>, page: usize, count: usize, meta: &PdfMeta) {
    rule_ops(ops, 285.0, Object::Real(0.3));

    text_ops(ops, MARGIN, 290.0, 8, false, &format!("Page {} of {}", page, count));
    let brand = "© Journezy Trip Planner - Your Perfect Journey";
    text_ops(ops, PAGE_WIDTH_MM / 2.0 - approx_width_mm(brand, 8) / 2.0, 290.0, 8, false, brand);
    let year = meta.year.to_string();
    text_ops(ops, PAGE_WIDTH_MM - MARGIN - approx_width_mm(&year, 8), 290.0, 8, false, &year);
}

/// Renders a laid-out itinerary to A4 PDF bytes.
pub fn render_pdf(layout: &PdfLayout, meta: &PdfMeta) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let empty = [Vec::new()];
    let pages: &[Vec<PlacedLine>] = if layout.pages.is_empty() { &empty } else { &layout.pages };
    let count = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(count);

    for (index, lines) in pages.iter().enumerate() {
        let mut ops = Vec::new();
        if index == 0 {
            header_ops(&mut ops, meta);
        }
        for line in lines {
            text_ops(
                &mut ops,
                line.x,
                line.y,
                line.style.font_size(),
                line.style.is_bold(),
                &line.text,
            );
        }
        footer_ops(&mut ops, index + 1, count, meta);

        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
