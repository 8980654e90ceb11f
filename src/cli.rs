use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use crate::model::BoardSummary;

/// Print the board menu and read a selection from stdin.
///
/// With a single board there is nothing to ask; otherwise re-prompt until the
/// input is a valid index.
pub fn select_board(boards: &[BoardSummary]) -> Result<usize> {
    if boards.len() == 1 {
        println!("Board: {}", boards[0].name);
        return Ok(0);
    }
    println!("------------------------------");
    for (i, board) in boards.iter().enumerate() {
        println!("{i:4}: {}", board.name);
    }
    println!("------------------------------");
    prompt_selection(&mut std::io::stdin().lock(), boards.len())
}

/// Re-prompt until the input parses. Exhausted input is fatal, not a retry,
/// so a non-interactive run cannot spin on the prompt.
fn prompt_selection(input: &mut impl BufRead, count: usize) -> Result<usize> {
    loop {
        print!("Select a board: ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read selection")?;
        if read == 0 {
            bail!("stdin closed before a board was selected");
        }
        match parse_selection(&line, count) {
            Some(index) => return Ok(index),
            None => println!("This is not a valid board number."),
        }
    }
}

/// Parse a menu selection: a base-10 index smaller than `count`.
pub fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let index = input.trim().parse::<usize>().ok()?;
    if index < count {
        Some(index)
    } else {
        None
    }
}

pub fn print_help() {
    println!("trello-export — export a Trello board to office documents\n");
    println!("USAGE:");
    println!("  trello-export          List your boards, pick one, export it");
    println!("  trello-export --help   Show this help");
    println!();
    println!("Configuration is read from ./trello-export.toml (or the user");
    println!("config directory): Trello credentials, time zone and date format,");
    println!("label title overrides, template path and output mode (docx|pdf).");
    println!();
    println!("Output goes to the configured directory, one folder per board:");
    println!("  exports/<board>/<board>.xlsx          board summary");
    println!("  exports/<board>/<list>/<card>.docx    one document per card");
    println!("  exports/<board>/<list>/<card>/...     downloaded attachments");
}
