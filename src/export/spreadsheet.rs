use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};

use crate::model::Board;
use crate::util::dates::format_opt;

const HEADERS: [&str; 9] = [
    "List",
    "Title",
    "Description",
    "Start",
    "Due",
    "Last activity",
    "Labels",
    "#",
    "URL",
];

const COLUMN_WIDTHS: [f64; 9] = [20.0, 45.0, 50.0, 16.0, 16.0, 16.0, 20.0, 10.0, 30.0];

/// One spreadsheet row, projected from a card. Pure data so the projection is
/// testable without touching disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub list: String,
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub due_date: String,
    pub last_activity_date: String,
    pub labels: String,
    pub num: i64,
    pub short_url: String,
    pub archived: bool,
}

/// Project a board graph into summary rows, one per card across all lists.
pub fn summary_rows(
    board: &Board,
    overrides: &HashMap<String, String>,
    tz: Tz,
    date_format: &str,
) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for list in &board.lists {
        for card in &list.cards {
            rows.push(SummaryRow {
                list: list.name.clone(),
                title: card.name.clone(),
                description: card.desc.clone(),
                start_date: format_opt(card.start, tz, date_format),
                due_date: format_opt(card.due, tz, date_format),
                last_activity_date: format_opt(card.date_last_activity, tz, date_format),
                labels: board.label_titles(card, overrides).join(", "),
                num: card.id_short,
                short_url: card.short_url.clone().unwrap_or_default(),
                archived: card.closed,
            });
        }
    }
    rows
}

/// Write the board workbook: open cards on one worksheet, archived on another.
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::Top);
    let text_format = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::Top);
    let center_format = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::Top);

    let open: Vec<&SummaryRow> = rows.iter().filter(|r| !r.archived).collect();
    let archived: Vec<&SummaryRow> = rows.iter().filter(|r| r.archived).collect();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Cards")?;
    write_sheet(sheet, &open, &header_format, &text_format, &center_format)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Archived")?;
    write_sheet(sheet, &archived, &header_format, &text_format, &center_format)?;

    workbook
        .save(path)
        .with_context(|| format!("Cannot write spreadsheet to {}", path.display()))?;
    Ok(())
}

fn write_sheet(
    sheet: &mut Worksheet,
    rows: &[&SummaryRow],
    header_format: &Format,
    text_format: &Format,
    center_format: &Format,
) -> Result<(), XlsxError> {
    sheet.set_portrait();
    sheet.set_default_row_height(15);
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, header_format)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string_with_format(r, 0, &row.list, text_format)?;
        sheet.write_string_with_format(r, 1, &row.title, text_format)?;
        sheet.write_string_with_format(r, 2, &row.description, text_format)?;
        sheet.write_string_with_format(r, 3, &row.start_date, center_format)?;
        sheet.write_string_with_format(r, 4, &row.due_date, center_format)?;
        sheet.write_string_with_format(r, 5, &row.last_activity_date, center_format)?;
        sheet.write_string_with_format(r, 6, &row.labels, text_format)?;
        sheet.write_number_with_format(r, 7, row.num as f64, center_format)?;
        sheet.write_string_with_format(r, 8, &row.short_url, text_format)?;
    }
    sheet.autofilter(0, 0, rows.len() as u32, 7)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, Label, List};
    use crate::util::dates::parse_time_zone;
    use chrono::{DateTime, Utc};

    fn card(name: &str, id_short: i64, list_id: &str, closed: bool) -> Card {
        Card {
            id: format!("card-{id_short}"),
            id_short,
            name: name.into(),
            desc: String::new(),
            closed,
            pos: id_short as f64,
            due: None,
            start: None,
            date_last_activity: None,
            label_ids: vec![],
            id_list: list_id.into(),
            short_url: None,
        }
    }

    fn demo_board() -> Board {
        let mut write_spec = card("Write spec", 1, "l1", false);
        write_spec.due = Some("2024-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
        write_spec.label_ids = vec!["lab1".into()];
        Board {
            id: "b1".into(),
            name: "Demo".into(),
            lists: vec![
                List {
                    id: "l1".into(),
                    name: "To Do".into(),
                    pos: 1.0,
                    cards: vec![write_spec, card("Second", 2, "l1", false)],
                },
                List {
                    id: "l2".into(),
                    name: "Done".into(),
                    pos: 2.0,
                    cards: vec![card("Old one", 3, "l2", true)],
                },
            ],
            labels: vec![Label {
                id: "lab1".into(),
                name: "Blocked".into(),
                color: Some("red".into()),
            }],
        }
    }

    #[test]
    fn one_row_per_card_across_all_lists() {
        let board = demo_board();
        let tz = parse_time_zone("UTC").unwrap();
        let rows = summary_rows(&board, &HashMap::new(), tz, "%Y-%m-%d");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.archived).count(), 1);
    }

    #[test]
    fn label_column_uses_configured_override() {
        let board = demo_board();
        let tz = parse_time_zone("UTC").unwrap();
        let overrides = HashMap::from([("Blocked".to_string(), "Urgent".to_string())]);
        let rows = summary_rows(&board, &overrides, tz, "%Y-%m-%d");
        let row = rows.iter().find(|r| r.title == "Write spec").unwrap();
        assert_eq!(row.labels, "Urgent");
        assert_eq!(row.due_date, "2024-01-15");
        assert_eq!(row.list, "To Do");
    }

    #[test]
    fn label_column_falls_back_to_default_title() {
        let board = demo_board();
        let tz = parse_time_zone("UTC").unwrap();
        let rows = summary_rows(&board, &HashMap::new(), tz, "%Y-%m-%d");
        let row = rows.iter().find(|r| r.title == "Write spec").unwrap();
        assert_eq!(row.labels, "Blocked");
    }

    #[test]
    fn writes_workbook_to_disk() {
        let board = demo_board();
        let tz = parse_time_zone("UTC").unwrap();
        let rows = summary_rows(&board, &HashMap::new(), tz, "%Y-%m-%d");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.xlsx");
        write_summary(&path, &rows).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let rows = vec![];
        let result = write_summary(Path::new("/no/such/dir/demo.xlsx"), &rows);
        assert!(result.is_err());
    }
}
