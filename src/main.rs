mod cli;
mod config;
mod export;
mod model;
mod render;
mod trello;
mod util;

use anyhow::{bail, Result};

use export::Exporter;
use trello::TrelloClient;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        cli::print_help();
        return Ok(());
    }
    if !args.is_empty() {
        cli::print_help();
        bail!("Unexpected argument '{}'", args[0]);
    }

    // Configuration problems are fatal before any API call.
    let config = config::load_config()?;
    let client = TrelloClient::new(&config)?;

    let boards = client.list_boards().await?;
    if boards.is_empty() {
        bail!("No boards found for this account");
    }
    let choice = cli::select_board(&boards)?;
    let board = client.fetch_board(&boards[choice]).await?;

    let total: usize = board.lists.iter().map(|l| l.cards.len()).sum();
    if total == 0 {
        println!("No cards on this board.");
        return Ok(());
    }

    println!("Exporting board '{}'...", board.name);
    let exporter = Exporter::new(&config, &client);
    let report = exporter.export_board(&board).await?;

    println!(
        "Done. {} cards exported, {} attachments downloaded.",
        report.cards_exported, report.attachments_downloaded
    );
    if !report.is_success() {
        eprintln!("{} failure(s):", report.failures.len());
        for failure in &report.failures {
            eprintln!("  {failure}");
        }
        std::process::exit(1);
    }
    Ok(())
}
