pub mod attachments;
pub mod document;
pub mod pdf;
pub mod spreadsheet;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::config::{AppConfig, OutputMode};
use crate::model::{Board, Card, List};
use crate::render::{self, CardContext};
use crate::trello::TrelloClient;
use crate::util::filename::sanitize_filename;

/// What one run produced, and what it could not.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub cards_exported: usize,
    pub attachments_downloaded: usize,
    pub failures: Vec<String>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turns one fetched board graph into files on disk. A single linear pass:
/// spreadsheet, then card by card, then that card's attachments.
pub struct Exporter<'a> {
    config: &'a AppConfig,
    client: &'a TrelloClient,
    tz: Tz,
}

impl<'a> Exporter<'a> {
    pub fn new(config: &'a AppConfig, client: &'a TrelloClient) -> Self {
        Exporter {
            config,
            client,
            tz: config.time_zone(),
        }
    }

    pub async fn export_board(&self, board: &Board) -> Result<ExportReport> {
        let board_slug = sanitize_filename(&board.name, &board.id);
        let board_dir = self.config.output.directory.join(&board_slug);
        std::fs::create_dir_all(&board_dir)
            .with_context(|| format!("Cannot create {}", board_dir.display()))?;

        // Board summary first; a spreadsheet write failure aborts the run.
        let rows = spreadsheet::summary_rows(
            board,
            &self.config.labels,
            self.tz,
            &self.config.dates.date_format,
        );
        spreadsheet::write_summary(&board_dir.join(format!("{board_slug}.xlsx")), &rows)?;

        let total: usize = board.lists.iter().map(|l| l.cards.len()).sum();
        let mut report = ExportReport::default();
        let mut index = 0;
        for list in &board.lists {
            for card in &list.cards {
                index += 1;
                println!("[{index}/{total}] Card #{} '{}'", card.id_short, card.name);
                match self.export_card(board, list, card, &board_dir).await {
                    Ok(outcome) => {
                        report.cards_exported += 1;
                        report.attachments_downloaded += outcome.saved.len();
                        for failure in outcome.failures {
                            eprintln!("  {failure}");
                            report.failures.push(failure);
                        }
                    }
                    Err(e) => {
                        eprintln!("  Card '{}' failed: {e:#}", card.name);
                        report.failures.push(format!("card '{}': {e:#}", card.name));
                    }
                }
            }
        }
        Ok(report)
    }

    /// Render one card and download its attachments. Archived cards land in
    /// `archived/` instead of their list folder.
    async fn export_card(
        &self,
        board: &Board,
        list: &List,
        card: &Card,
        board_dir: &Path,
    ) -> Result<attachments::DownloadOutcome> {
        let details = self.client.fetch_card_details(&card.id).await?;

        let parent: PathBuf = if card.closed {
            board_dir.join("archived")
        } else {
            board_dir.join(sanitize_filename(&list.name, &list.id))
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;

        let ctx = CardContext::build(board, &list.name, card, &details, self.config, self.tz);
        let bytes = match self.config.template.output_mode {
            OutputMode::Docx => document::render_docx(&self.config.template.template_path, &ctx)?,
            OutputMode::Pdf => {
                let template_path = &self.config.template.template_path;
                let source = std::fs::read_to_string(template_path).with_context(|| {
                    format!("Cannot read template {}", template_path.display())
                })?;
                let html = render::render_template("card.html", &source, &ctx)
                    .context("Template substitution failed")?;
                pdf::html_to_pdf(&html, &card.name)?
            }
        };

        let card_slug = sanitize_filename(&card.name, &card.id);
        let document_path = parent.join(format!(
            "{card_slug}.{}",
            self.config.template.output_mode.extension()
        ));
        std::fs::write(&document_path, bytes)
            .with_context(|| format!("Cannot write {}", document_path.display()))?;

        Ok(attachments::download_all(self.client, &details.attachments, &parent.join(&card_slug))
            .await)
    }
}
