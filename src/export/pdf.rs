use std::io::{BufWriter, Cursor};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;
use time::OffsetDateTime;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const BOTTOM_MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.352_778;
// Rough average glyph advance for Helvetica, good enough for wrapping.
const GLYPH_WIDTH_EM: f32 = 0.5;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("rendered template contains no text")]
    EmptyInput,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("pdf backend error: {0}")]
    Backend(String),
}

/// A run of styled text within a block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    bold: bool,
    italic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Heading(u8, Vec<Span>),
    Paragraph(Vec<Span>),
    Bullet(Vec<Span>),
}

impl Block {
    fn spans(&self) -> &[Span] {
        match self {
            Block::Heading(_, s) | Block::Paragraph(s) | Block::Bullet(s) => s,
        }
    }
}

/// Convert rendered template HTML into a PDF.
///
/// Supports the subset the markdown conversion emits: headings, paragraphs,
/// list items, `<strong>`/`<b>`, `<em>`/`<i>` and `<br>`. Unknown tags are
/// dropped, their text kept.
pub fn html_to_pdf(html: &str, title: &str) -> Result<Vec<u8>, PdfError> {
    let blocks = parse_blocks(html);
    if blocks.is_empty() {
        return Err(PdfError::EmptyInput);
    }

    let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    // The backend stamps documents with the wall clock. Pin all three dates so
    // the same input always produces the same bytes, like the docx path does
    // with its zip entry timestamps.
    let doc = doc
        .with_creation_date(OffsetDateTime::UNIX_EPOCH)
        .with_mod_date(OffsetDateTime::UNIX_EPOCH)
        .with_metadata_date(OffsetDateTime::UNIX_EPOCH);
    let fonts = Fonts::load(&doc)?;

    let mut layer_ref = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;

    for block in &blocks {
        let (size, base_bold, prefix) = match block {
            Block::Heading(1, _) => (17.0, true, ""),
            Block::Heading(2, _) => (14.0, true, ""),
            Block::Heading(_, _) => (12.5, true, ""),
            Block::Paragraph(_) => (11.0, false, ""),
            Block::Bullet(_) => (11.0, false, "- "),
        };
        let line_height = size * PT_TO_MM * 1.5;
        let lines = wrap_spans(block.spans(), size, prefix, PAGE_WIDTH - 2.0 * MARGIN);
        for line in lines {
            if y < BOTTOM_MARGIN {
                let (new_page, new_layer) =
                    doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                layer_ref = doc.get_page(new_page).get_layer(new_layer);
                y = PAGE_HEIGHT - MARGIN;
            }
            draw_line(&layer_ref, &line, size, base_bold, y, &fonts);
            y -= line_height;
        }
        // Gap between blocks.
        y -= line_height * 0.4;
    }

    let mut buffer = BufWriter::new(Cursor::new(Vec::new()));
    doc.save(&mut buffer)
        .map_err(|e| PdfError::Backend(e.to_string()))?;
    Ok(buffer
        .into_inner()
        .map_err(|e| PdfError::Io(e.into_error()))?
        .into_inner())
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &printpdf::PdfDocumentReference) -> Result<Self, PdfError> {
        let builtin = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| PdfError::Backend(e.to_string()))
        };
        Ok(Fonts {
            regular: builtin(BuiltinFont::Helvetica)?,
            bold: builtin(BuiltinFont::HelveticaBold)?,
            italic: builtin(BuiltinFont::HelveticaOblique)?,
            bold_italic: builtin(BuiltinFont::HelveticaBoldOblique)?,
        })
    }

    fn pick(&self, bold: bool, italic: bool) -> &IndirectFontRef {
        match (bold, italic) {
            (true, true) => &self.bold_italic,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (false, false) => &self.regular,
        }
    }
}

/// A word with its style, positioned during wrapping.
#[derive(Debug, Clone)]
struct Word {
    text: String,
    bold: bool,
    italic: bool,
}

fn estimated_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH_EM * PT_TO_MM
}

fn wrap_spans(spans: &[Span], size: f32, prefix: &str, max_width: f32) -> Vec<Vec<Word>> {
    let mut words: Vec<Word> = Vec::new();
    if !prefix.is_empty() {
        words.push(Word {
            text: prefix.trim_end().to_string(),
            bold: false,
            italic: false,
        });
    }
    for span in spans {
        for token in span.text.split_whitespace() {
            words.push(Word {
                text: token.to_string(),
                bold: span.bold,
                italic: span.italic,
            });
        }
    }

    let space = estimated_width(" ", size);
    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut line: Vec<Word> = Vec::new();
    let mut width = 0.0;
    for word in words {
        let word_width = estimated_width(&word.text, size);
        if !line.is_empty() && width + space + word_width > max_width {
            lines.push(std::mem::take(&mut line));
            width = 0.0;
        }
        if !line.is_empty() {
            width += space;
        }
        width += word_width;
        line.push(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn draw_line(
    layer: &PdfLayerReference,
    line: &[Word],
    size: f32,
    base_bold: bool,
    y: f32,
    fonts: &Fonts,
) {
    let mut x = MARGIN;
    for word in line {
        let font = fonts.pick(word.bold || base_bold, word.italic);
        layer.use_text(word.text.clone(), size, Mm(x), Mm(y), font);
        x += estimated_width(&word.text, size) + estimated_width(" ", size);
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn parse_blocks(html: &str) -> Vec<Block> {
    enum Kind {
        Paragraph,
        Heading(u8),
        Bullet,
    }

    let mut blocks: Vec<Block> = Vec::new();
    let mut spans: Vec<Span> = Vec::new();
    let mut buf = String::new();
    let mut kind = Kind::Paragraph;
    let mut bold = 0u32;
    let mut italic = 0u32;

    fn flush_buf(buf: &mut String, spans: &mut Vec<Span>, bold: u32, italic: u32) {
        if buf.is_empty() {
            return;
        }
        let text = decode_entities(buf);
        buf.clear();
        if text.trim().is_empty() {
            // Keep a single separating space between adjacent styled runs.
            if let Some(last) = spans.last_mut() {
                if !last.text.ends_with(' ') {
                    last.text.push(' ');
                }
            }
            return;
        }
        spans.push(Span {
            text,
            bold: bold > 0,
            italic: italic > 0,
        });
    }

    let mut flush_block = |spans: &mut Vec<Span>, kind: &Kind| {
        let mut taken = std::mem::take(spans);
        if let Some(first) = taken.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = taken.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        taken.retain(|s| !s.text.is_empty());
        if taken.is_empty() {
            return;
        }
        blocks.push(match kind {
            Kind::Paragraph => Block::Paragraph(taken),
            Kind::Heading(level) => Block::Heading(*level, taken),
            Kind::Bullet => Block::Bullet(taken),
        });
    };

    let mut chars = html.chars();
    while let Some(c) = chars.next() {
        if c != '<' {
            buf.push(if c.is_whitespace() { ' ' } else { c });
            continue;
        }
        // Collect the tag body up to '>'.
        let mut tag = String::new();
        for t in chars.by_ref() {
            if t == '>' {
                break;
            }
            tag.push(t);
        }
        let tag = tag.trim().to_ascii_lowercase();
        let closing = tag.starts_with('/');
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric())
            .collect();

        match name.as_str() {
            "strong" | "b" => {
                flush_buf(&mut buf, &mut spans, bold, italic);
                if closing {
                    bold = bold.saturating_sub(1);
                } else {
                    bold += 1;
                }
            }
            "em" | "i" => {
                flush_buf(&mut buf, &mut spans, bold, italic);
                if closing {
                    italic = italic.saturating_sub(1);
                } else {
                    italic += 1;
                }
            }
            "p" | "div" | "ul" | "ol" => {
                flush_buf(&mut buf, &mut spans, bold, italic);
                flush_block(&mut spans, &kind);
                kind = Kind::Paragraph;
            }
            "li" => {
                flush_buf(&mut buf, &mut spans, bold, italic);
                flush_block(&mut spans, &kind);
                kind = if closing { Kind::Paragraph } else { Kind::Bullet };
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                flush_buf(&mut buf, &mut spans, bold, italic);
                flush_block(&mut spans, &kind);
                kind = if closing {
                    Kind::Paragraph
                } else {
                    let level = name[1..].parse::<u8>().unwrap_or(1);
                    Kind::Heading(level)
                };
            }
            "br" => {
                flush_buf(&mut buf, &mut spans, bold, italic);
                flush_block(&mut spans, &kind);
            }
            // Inline tags we do not style (code, a, span, ...): keep the text.
            _ => {
                flush_buf(&mut buf, &mut spans, bold, italic);
            }
        }
    }
    flush_buf(&mut buf, &mut spans, bold, italic);
    flush_block(&mut spans, &kind);

    blocks
}
