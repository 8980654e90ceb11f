use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A card as returned by the board-wide `cards/all` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub id_short: i64,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub pos: f64,
    pub due: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
    pub date_last_activity: Option<DateTime<Utc>>,
    #[serde(default, rename = "idLabels")]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub id_list: String,
    pub short_url: Option<String>,
}

/// Per-card data fetched just before rendering: attachments, checklists and
/// comments. Assembled from the single-card endpoint.
#[derive(Debug, Clone, Default)]
pub struct CardDetails {
    pub attachments: Vec<Attachment>,
    pub checklists: Vec<Checklist>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Checklist {
    pub name: String,
    pub pos: f64,
    pub items: Vec<CheckItem>,
}

#[derive(Debug, Clone)]
pub struct CheckItem {
    pub name: String,
    pub pos: f64,
    pub state: String,
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub date: DateTime<Utc>,
    pub author: String,
    pub text: String,
}

impl Checklist {
    /// Completion as "NN%", or empty when the checklist has no items.
    pub fn percent_complete(&self) -> String {
        if self.items.is_empty() {
            return String::new();
        }
        let complete = self.items.iter().filter(|i| i.state == "complete").count();
        let pcent = (complete as f64 / self.items.len() as f64 * 100.0).round() as u32;
        format!("{pcent}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(state: &str) -> CheckItem {
        CheckItem {
            name: "item".into(),
            pos: 1.0,
            state: state.into(),
            completed_date: None,
        }
    }

    #[test]
    fn percent_complete_rounds() {
        let checklist = Checklist {
            name: "cl".into(),
            pos: 1.0,
            items: vec![item("complete"), item("incomplete"), item("incomplete")],
        };
        assert_eq!(checklist.percent_complete(), "33%");
    }

    #[test]
    fn empty_checklist_has_no_percentage() {
        let checklist = Checklist {
            name: "cl".into(),
            pos: 1.0,
            items: vec![],
        };
        assert_eq!(checklist.percent_complete(), "");
    }

    #[test]
    fn all_complete_is_hundred() {
        let checklist = Checklist {
            name: "cl".into(),
            pos: 1.0,
            items: vec![item("complete"), item("complete")],
        };
        assert_eq!(checklist.percent_complete(), "100%");
    }

    #[test]
    fn card_deserializes_from_trello_json() {
        let json = r#"{
            "id": "5f2a",
            "idShort": 12,
            "name": "Write spec",
            "desc": "**bold**",
            "closed": false,
            "pos": 65535.0,
            "due": "2024-01-15T10:00:00.000Z",
            "start": null,
            "dateLastActivity": "2024-01-10T08:30:00.000Z",
            "idLabels": ["lab1"],
            "idList": "l1",
            "shortUrl": "https://trello.com/c/abc"
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.id_short, 12);
        assert_eq!(card.label_ids, vec!["lab1"]);
        assert!(card.due.is_some());
        assert!(card.start.is_none());
    }
}
