use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::model::Attachment;
use crate::trello::TrelloClient;
use crate::util::filename::sanitize_filename;

/// Seam for fetching attachment bodies, so the download loop can be tested
/// without the network.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl AttachmentFetcher for TrelloClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.download_attachment(url).await
    }
}

#[derive(Debug, Default)]
pub struct DownloadOutcome {
    pub saved: Vec<String>,
    pub failures: Vec<String>,
}

/// Download every attachment of one card into `dir`, one request at a time.
///
/// Attachments are independent: a failed download is recorded and the loop
/// moves on. A card with no attachments creates nothing, not even the folder.
pub async fn download_all(
    fetcher: &dyn AttachmentFetcher,
    attachments: &[Attachment],
    dir: &Path,
) -> DownloadOutcome {
    let mut outcome = DownloadOutcome::default();
    if attachments.is_empty() {
        return outcome;
    }
    if let Err(e) = std::fs::create_dir_all(dir) {
        outcome
            .failures
            .push(format!("cannot create {}: {e}", dir.display()));
        return outcome;
    }
    let mut used: HashSet<String> = HashSet::new();
    for attachment in attachments {
        let mut filename = sanitize_filename(&attachment.name, &attachment.id);
        // Distinct names can sanitize to the same string. Prefix the id so no
        // download overwrites an earlier one.
        if used.contains(&filename) {
            filename = sanitize_filename(
                &format!("{}-{}", attachment.id, attachment.name),
                &attachment.id,
            );
        }
        used.insert(filename.clone());
        println!("  Downloading '{filename}'");
        let result = fetcher
            .fetch(&attachment.url)
            .await
            .and_then(|bytes| {
                std::fs::write(dir.join(&filename), bytes)
                    .with_context(|| format!("cannot write {filename}"))
            });
        match result {
            Ok(()) => outcome.saved.push(filename),
            Err(e) => outcome.failures.push(format!("{filename}: {e:#}")),
        }
    }
    outcome
}
