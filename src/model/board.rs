use std::collections::HashMap;

use serde::Deserialize;

use super::card::Card;

/// One entry in the board selection menu, before the full graph is fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

/// The full board graph for one export run. Immutable once fetched.
#[derive(Debug, Clone)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub lists: Vec<List>,
    pub labels: Vec<Label>,
}

/// An ordered column of cards. Cards are sorted by their Trello position.
#[derive(Debug, Clone)]
pub struct List {
    pub id: String,
    pub name: String,
    pub pos: f64,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Board {
    /// Resolve a card's label references into display titles.
    ///
    /// Each title is the configured override for the Trello default title when
    /// one exists, the default title otherwise, and the raw label id when the
    /// label has no title at all (deleted/renamed label edge case).
    pub fn label_titles(&self, card: &Card, overrides: &HashMap<String, String>) -> Vec<String> {
        card.label_ids
            .iter()
            .map(|id| match self.labels.iter().find(|l| &l.id == id) {
                Some(label) if !label.name.is_empty() => overrides
                    .get(&label.name)
                    .cloned()
                    .unwrap_or_else(|| label.name.clone()),
                Some(label) => label.id.clone(),
                None => id.clone(),
            })
            .collect()
    }
}
