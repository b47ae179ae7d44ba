//! PDF rendering: materialise a batch of units into one paginated document,
//! render the structure-only document, and open existing documents to serve
//! the page-range splitter.

use std::path::Path;

use async_trait::async_trait;
use chrono::Local;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfParseOptions, PdfSaveOptions, Point, Pt,
    TextItem,
};
use tracing::{debug, info};

use crate::contract::{PageRangeSource, RenderBatch, RenderError, RenderFormat, Renderer};

// Letter page geometry, in millimetres.
const PAGE_W_MM: f32 = 215.9;
const PAGE_H_MM: f32 = 279.4;
const MARGIN_MM: f32 = 12.7;
const MM_TO_PT: f32 = 2.834_646;

// Courier advance width is 0.6 em.
const MONO_ADVANCE: f32 = 0.6;

#[derive(Debug, Clone, Copy)]
struct TextMetrics {
    title_pt: f32,
    heading_pt: f32,
    normal_pt: f32,
    code_pt: f32,
}

impl TextMetrics {
    fn for_format(format: RenderFormat) -> Self {
        match format {
            RenderFormat::Human => Self {
                title_pt: 16.0,
                heading_pt: 10.0,
                normal_pt: 10.0,
                code_pt: 8.0,
            },
            RenderFormat::Machine => Self {
                title_pt: 6.0,
                heading_pt: 4.0,
                normal_pt: 4.0,
                code_pt: 3.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    font: BuiltinFont,
    size_pt: f32,
}

impl Line {
    fn leading(&self) -> f32 {
        self.size_pt + 2.0
    }
}

fn usable_width_pt() -> f32 {
    (PAGE_W_MM - 2.0 * MARGIN_MM) * MM_TO_PT
}

fn usable_height_pt() -> f32 {
    (PAGE_H_MM - 2.0 * MARGIN_MM) * MM_TO_PT
}

/// Wrap to a character count derived from the monospace advance width.
fn wrap_chars(size_pt: f32) -> usize {
    ((usable_width_pt() / (MONO_ADVANCE * size_pt)) as usize).max(16)
}

fn sanitise(raw: &str) -> String {
    raw.replace('\r', "").replace('\t', "    ")
}

fn push_wrapped(lines: &mut Vec<Line>, text: &str, font: BuiltinFont, size_pt: f32) {
    let width = wrap_chars(size_pt);
    for source_line in sanitise(text).split('\n') {
        if source_line.is_empty() {
            lines.push(Line {
                text: String::new(),
                font,
                size_pt,
            });
            continue;
        }
        let chars: Vec<char> = source_line.chars().collect();
        for chunk in chars.chunks(width) {
            lines.push(Line {
                text: chunk.iter().collect(),
                font,
                size_pt,
            });
        }
    }
}

/// Paginate the accumulated lines into PDF pages and serialise the document.
fn build_document(doc_title: &str, lines: Vec<Line>) -> Vec<u8> {
    let margin_pt = MARGIN_MM * MM_TO_PT;
    let top_y = MARGIN_MM * MM_TO_PT + usable_height_pt();

    let mut pages: Vec<PdfPage> = Vec::new();
    let mut ops: Vec<Op> = vec![Op::StartTextSection];
    let mut y = top_y;

    for line in &lines {
        let leading = line.leading();
        if y - leading < margin_pt {
            ops.push(Op::EndTextSection);
            pages.push(PdfPage::new(Mm(PAGE_W_MM), Mm(PAGE_H_MM), ops));
            ops = vec![Op::StartTextSection];
            y = top_y;
        }
        y -= leading;
        if !line.text.is_empty() {
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(margin_pt),
                    y: Pt(y),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(line.size_pt),
                font: line.font,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.text.clone())],
                font: line.font,
            });
        }
    }
    ops.push(Op::EndTextSection);
    pages.push(PdfPage::new(Mm(PAGE_W_MM), Mm(PAGE_H_MM), ops));

    let mut warnings = Vec::new();
    let bytes = PdfDocument::new(doc_title)
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "Writer warnings while saving document");
    }
    bytes
}

fn header_lines(title: &str, format: RenderFormat, metrics: &TextMetrics) -> Vec<Line> {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut lines = Vec::new();
    push_wrapped(&mut lines, title, BuiltinFont::HelveticaBold, metrics.title_pt);
    push_wrapped(&mut lines, format.label(), BuiltinFont::Helvetica, metrics.normal_pt);
    push_wrapped(
        &mut lines,
        &format!("Generated on: {timestamp}"),
        BuiltinFont::Helvetica,
        metrics.normal_pt,
    );
    lines
}

/// The default [`Renderer`]: one paginated PDF per batch, with the fixed
/// preamble (title, format indicator, timestamp, category banner and part
/// number) followed by each unit's path heading and monospace content.
pub struct PdfRenderer;

#[async_trait]
impl Renderer for PdfRenderer {
    async fn render(&self, batch: RenderBatch, dest: &Path) -> Result<u64, RenderError> {
        if batch.units.is_empty() {
            return Err(RenderError::EmptyBatch);
        }
        let metrics = TextMetrics::for_format(batch.format);
        let mut lines = header_lines(&batch.title, batch.format, &metrics);
        push_wrapped(
            &mut lines,
            &format!("{} Files - Part {}", batch.category.label(), batch.part),
            BuiltinFont::HelveticaBold,
            metrics.heading_pt,
        );

        for unit in &batch.units {
            lines.push(Line {
                text: String::new(),
                font: BuiltinFont::Helvetica,
                size_pt: metrics.normal_pt,
            });
            push_wrapped(&mut lines, &unit.rel_path, BuiltinFont::HelveticaBold, metrics.heading_pt);
            push_wrapped(&mut lines, &unit.content, BuiltinFont::Courier, metrics.code_pt);
        }

        let bytes = build_document(&batch.title, lines);
        std::fs::write(dest, &bytes)?;
        info!(
            path = %dest.display(),
            units = batch.units.len(),
            bytes = bytes.len(),
            "Rendered batch to document"
        );
        Ok(bytes.len() as u64)
    }
}

/// Render the structure-only document: the folder tree, preformatted.
pub fn render_structure(
    title: &str,
    tree: &str,
    format: RenderFormat,
    dest: &Path,
) -> Result<u64, RenderError> {
    let metrics = TextMetrics::for_format(format);
    let mut lines = header_lines(title, format, &metrics);
    push_wrapped(
        &mut lines,
        "Project Structure:",
        BuiltinFont::HelveticaBold,
        metrics.heading_pt,
    );
    push_wrapped(
        &mut lines,
        "Key: '+--' indicates a branch, '|' indicates continuation",
        BuiltinFont::Helvetica,
        metrics.normal_pt,
    );
    push_wrapped(&mut lines, tree, BuiltinFont::Courier, metrics.code_pt);

    let bytes = build_document(title, lines);
    std::fs::write(dest, &bytes)?;
    info!(path = %dest.display(), bytes = bytes.len(), "Rendered structure document");
    Ok(bytes.len() as u64)
}

/// An existing PDF opened for page-range access, serving the splitter.
pub struct PdfFile {
    doc: PdfDocument,
}

impl PdfFile {
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)?;
        let mut warnings = Vec::new();
        let doc = PdfDocument::parse(&bytes, &PdfParseOptions::default(), &mut warnings)
            .map_err(|e| RenderError::Document(format!("{e:?}")))?;
        if !warnings.is_empty() {
            debug!(
                count = warnings.len(),
                path = %path.display(),
                "Parser warnings while opening document"
            );
        }
        info!(path = %path.display(), pages = doc.pages.len(), "Opened document");
        Ok(Self { doc })
    }
}

impl PageRangeSource for PdfFile {
    fn page_count(&self) -> usize {
        self.doc.pages.len()
    }

    fn render_range(&self, start: usize, end: usize, dest: &Path) -> Result<u64, RenderError> {
        if start >= end || end > self.doc.pages.len() {
            return Err(RenderError::Document(format!(
                "invalid page range {start}..{end} of {}",
                self.doc.pages.len()
            )));
        }
        let mut part = self.doc.clone();
        part.pages = self.doc.pages[start..end].to_vec();
        let bytes = part.save(&PdfSaveOptions::default(), &mut Vec::new());
        std::fs::write(dest, &bytes)?;
        debug!(start, end, bytes = bytes.len(), "Rendered page range");
        Ok(bytes.len() as u64)
    }
}
