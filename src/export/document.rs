use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::render::{self, CardContext};

const DOCUMENT_ENTRY: &str = "word/document.xml";

/// Render a card into a copy of a `.docx` template.
///
/// The template's `word/document.xml` runs through the template engine; every
/// other zip entry is copied as-is. Entry timestamps are pinned so rendering
/// the same card twice produces identical bytes. Placeholders must sit inside
/// a single XML run.
pub fn render_docx(template_path: &Path, ctx: &CardContext) -> Result<Vec<u8>> {
    let file = std::fs::File::open(template_path)
        .with_context(|| format!("Cannot open template {}", template_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid .docx file", template_path.display()))?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut saw_document = false;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        writer.start_file(name.clone(), options)?;
        if name == DOCUMENT_ENTRY {
            saw_document = true;
            let mut xml = String::new();
            entry
                .read_to_string(&mut xml)
                .context("Template document.xml is not valid UTF-8")?;
            let rendered = render::render_template(DOCUMENT_ENTRY, &xml, ctx)
                .context("Template substitution failed")?;
            writer.write_all(rendered.as_bytes())?;
        } else {
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            writer.write_all(&buf)?;
        }
    }
    if !saw_document {
        bail!(
            "{} has no {DOCUMENT_ENTRY} entry",
            template_path.display()
        );
    }

    Ok(writer.finish()?.into_inner())
}
