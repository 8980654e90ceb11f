use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::model::{Attachment, Board, BoardSummary, Card, CardDetails, CheckItem, Checklist, Comment, Label, List};

/// Read-only Trello REST client. One request at a time, no retries.
pub struct TrelloClient {
    api_key: String,
    token: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ListInfo {
    id: String,
    name: String,
    #[serde(default)]
    pos: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardResponse {
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    checklists: Vec<ChecklistRaw>,
    #[serde(default)]
    actions: Vec<ActionRaw>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChecklistRaw {
    #[serde(default)]
    name: String,
    #[serde(default)]
    pos: f64,
    #[serde(default)]
    check_items: Vec<CheckItemRaw>,
}

#[derive(Deserialize)]
struct CheckItemRaw {
    id: String,
    name: String,
    #[serde(default)]
    pos: f64,
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionRaw {
    #[serde(rename = "type")]
    kind: String,
    date: DateTime<Utc>,
    #[serde(default)]
    data: ActionData,
    member_creator: Option<MemberRaw>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ActionData {
    text: Option<String>,
    check_item: Option<CheckItemRef>,
}

#[derive(Deserialize)]
struct CheckItemRef {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberRaw {
    full_name: Option<String>,
    username: Option<String>,
}

fn by_pos(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl TrelloClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy_cfg) = &config.proxy {
            let mut proxy = reqwest::Proxy::all(format!(
                "http://{}:{}",
                proxy_cfg.proxy_host, proxy_cfg.proxy_port
            ))
            .context("Invalid proxy configuration")?;
            if let Some(creds) = &proxy_cfg.proxy_credentials {
                let (user, pass) = creds
                    .split_once(':')
                    .context("proxy_credentials must be 'user:password'")?;
                proxy = proxy.basic_auth(user, pass);
            }
            builder = builder.proxy(proxy);
        }
        Ok(TrelloClient {
            api_key: config.trello.api_key.clone(),
            token: config.trello.token.clone(),
            base_url: config.trello.api_base_url.trim_end_matches('/').to_string(),
            client: builder.build().context("Failed to build HTTP client")?,
        })
    }

    fn auth_params(&self) -> [(&str, &str); 2] {
        [("key", &self.api_key), ("token", &self.token)]
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// The user's open boards, sorted by name for the selection menu.
    pub async fn list_boards(&self) -> Result<Vec<BoardSummary>> {
        let mut boards: Vec<BoardSummary> = self
            .client
            .get(self.url("members/me/boards"))
            .query(&self.auth_params())
            .query(&[("fields", "id,name,desc"), ("filter", "open")])
            .send()
            .await
            .context("Trello members/me/boards failed")?
            .error_for_status()
            .context("Cannot retrieve the boards you are a member of")?
            .json()
            .await
            .context("Unexpected boards response")?;
        boards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(boards)
    }

    /// Fetch the full graph for one board: lists, labels and all cards
    /// (archived included), grouped into their lists.
    pub async fn fetch_board(&self, summary: &BoardSummary) -> Result<Board> {
        let lists_raw: Vec<ListInfo> = self
            .client
            .get(self.url(&format!("boards/{}/lists", summary.id)))
            .query(&self.auth_params())
            .query(&[("fields", "id,name,pos")])
            .send()
            .await
            .with_context(|| format!("Cannot retrieve lists of '{}'", summary.name))?
            .error_for_status()
            .with_context(|| format!("Cannot retrieve lists of '{}'", summary.name))?
            .json()
            .await
            .context("Unexpected lists response")?;

        let labels: Vec<Label> = self
            .client
            .get(self.url(&format!("boards/{}/labels", summary.id)))
            .query(&self.auth_params())
            .query(&[("fields", "id,name,color")])
            .send()
            .await
            .with_context(|| format!("Cannot retrieve labels of '{}'", summary.name))?
            .error_for_status()
            .with_context(|| format!("Cannot retrieve labels of '{}'", summary.name))?
            .json()
            .await
            .context("Unexpected labels response")?;

        let mut cards: Vec<Card> = self
            .client
            .get(self.url(&format!("boards/{}/cards/all", summary.id)))
            .query(&self.auth_params())
            .query(&[(
                "fields",
                "id,name,desc,idList,idLabels,pos,closed,idShort,shortUrl,due,start,dateLastActivity",
            )])
            .send()
            .await
            .with_context(|| format!("Cannot retrieve cards of '{}'", summary.name))?
            .error_for_status()
            .with_context(|| format!("Cannot retrieve cards of '{}'", summary.name))?
            .json()
            .await
            .context("Unexpected cards response")?;
        cards.sort_by(|a, b| by_pos(a.pos, b.pos));

        let mut lists: Vec<List> = lists_raw
            .into_iter()
            .map(|l| List {
                id: l.id,
                name: l.name,
                pos: l.pos,
                cards: Vec::new(),
            })
            .collect();
        lists.sort_by(|a, b| by_pos(a.pos, b.pos));

        // Archived cards may reference a list that no longer exists; those go
        // into a synthetic trailing bucket.
        let mut orphans: Vec<Card> = Vec::new();
        for card in cards {
            match lists.iter_mut().find(|l| l.id == card.id_list) {
                Some(list) => list.cards.push(card),
                None => orphans.push(card),
            }
        }
        if !orphans.is_empty() {
            lists.push(List {
                id: String::new(),
                name: "archived".to_string(),
                pos: f64::MAX,
                cards: orphans,
            });
        }

        Ok(Board {
            id: summary.id.clone(),
            name: summary.name.clone(),
            lists,
            labels,
        })
    }

    /// Attachments, checklists and comments for one card.
    pub async fn fetch_card_details(&self, card_id: &str) -> Result<CardDetails> {
        let response: CardResponse = self
            .client
            .get(self.url(&format!("cards/{card_id}")))
            .query(&self.auth_params())
            .query(&[
                ("fields", "id,name"),
                ("attachments", "true"),
                ("checklists", "all"),
                ("actions", "commentCard,updateCheckItemStateOnCard"),
            ])
            .send()
            .await
            .with_context(|| format!("Cannot retrieve card {card_id}"))?
            .error_for_status()
            .with_context(|| format!("Cannot retrieve card {card_id}"))?
            .json()
            .await
            .context("Unexpected card response")?;

        Ok(assemble_details(response))
    }

    /// Download one attachment body. Attachment URLs require OAuth-style
    /// header auth instead of the query-parameter auth of the JSON endpoints.
    pub async fn download_attachment(&self, url: &str) -> Result<Vec<u8>> {
        let auth = format!(
            "OAuth oauth_consumer_key=\"{}\", oauth_token=\"{}\"",
            self.api_key, self.token
        );
        let response = self
            .client
            .get(url)
            .header("Authorization", auth)
            .send()
            .await
            .with_context(|| format!("Download failed for {url}"))?;
        if !response.status().is_success() {
            bail!("HTTP {} downloading {url}", response.status());
        }
        Ok(response
            .bytes()
            .await
            .with_context(|| format!("Download interrupted for {url}"))?
            .to_vec())
    }
}

fn assemble_details(response: CardResponse) -> CardDetails {
    // Completion dates come from updateCheckItemStateOnCard actions, matched
    // by check item id. Actions arrive newest first; keep the newest.
    let mut completed_at: HashMap<String, DateTime<Utc>> = HashMap::new();
    for action in &response.actions {
        if action.kind == "updateCheckItemStateOnCard" {
            if let Some(item) = &action.data.check_item {
                completed_at.entry(item.id.clone()).or_insert(action.date);
            }
        }
    }

    let mut checklists: Vec<Checklist> = response
        .checklists
        .into_iter()
        .filter(|cl| !cl.name.is_empty())
        .map(|cl| {
            let mut items: Vec<CheckItem> = cl
                .check_items
                .into_iter()
                .map(|item| CheckItem {
                    completed_date: completed_at.get(&item.id).copied(),
                    name: item.name,
                    pos: item.pos,
                    state: item.state,
                })
                .collect();
            items.sort_by(|a, b| by_pos(a.pos, b.pos));
            Checklist {
                name: cl.name,
                pos: cl.pos,
                items,
            }
        })
        .collect();
    checklists.sort_by(|a, b| by_pos(a.pos, b.pos));

    let comments: Vec<Comment> = response
        .actions
        .into_iter()
        .filter(|a| a.kind == "commentCard")
        .map(|a| Comment {
            date: a.date,
            author: a
                .member_creator
                .and_then(|m| m.full_name.or(m.username))
                .unwrap_or_default(),
            text: a.data.text.unwrap_or_default(),
        })
        .collect();

    CardDetails {
        attachments: response.attachments,
        checklists,
        comments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_orders_checklists_and_items_by_pos() {
        let response: CardResponse = serde_json::from_str(
            r#"{
                "attachments": [],
                "checklists": [
                    {"name": "Second", "pos": 2.0, "checkItems": [
                        {"id": "i2", "name": "b", "pos": 2.0, "state": "incomplete"},
                        {"id": "i1", "name": "a", "pos": 1.0, "state": "complete"}
                    ]},
                    {"name": "First", "pos": 1.0, "checkItems": []}
                ],
                "actions": []
            }"#,
        )
        .unwrap();
        let details = assemble_details(response);
        assert_eq!(details.checklists[0].name, "First");
        assert_eq!(details.checklists[1].items[0].name, "a");
        assert_eq!(details.checklists[1].items[1].name, "b");
    }

    #[test]
    fn assemble_matches_completion_dates_to_items() {
        let response: CardResponse = serde_json::from_str(
            r#"{
                "checklists": [
                    {"name": "Tasks", "pos": 1.0, "checkItems": [
                        {"id": "i1", "name": "done item", "pos": 1.0, "state": "complete"},
                        {"id": "i2", "name": "open item", "pos": 2.0, "state": "incomplete"}
                    ]}
                ],
                "actions": [
                    {"type": "updateCheckItemStateOnCard",
                     "date": "2024-01-10T12:00:00.000Z",
                     "data": {"checkItem": {"id": "i1"}}}
                ]
            }"#,
        )
        .unwrap();
        let details = assemble_details(response);
        let items = &details.checklists[0].items;
        assert!(items[0].completed_date.is_some());
        assert!(items[1].completed_date.is_none());
    }

    #[test]
    fn assemble_extracts_comments() {
        let response: CardResponse = serde_json::from_str(
            r#"{
                "actions": [
                    {"type": "commentCard",
                     "date": "2024-01-12T09:00:00.000Z",
                     "data": {"text": "looks good"},
                     "memberCreator": {"fullName": "Ada Lovelace", "username": "ada"}},
                    {"type": "updateCheckItemStateOnCard",
                     "date": "2024-01-10T12:00:00.000Z",
                     "data": {"checkItem": {"id": "i1"}}}
                ]
            }"#,
        )
        .unwrap();
        let details = assemble_details(response);
        assert_eq!(details.comments.len(), 1);
        assert_eq!(details.comments[0].author, "Ada Lovelace");
        assert_eq!(details.comments[0].text, "looks good");
    }

    #[test]
    fn assemble_skips_unnamed_checklists() {
        let response: CardResponse = serde_json::from_str(
            r#"{"checklists": [{"name": "", "pos": 1.0, "checkItems": []}]}"#,
        )
        .unwrap();
        assert!(assemble_details(response).checklists.is_empty());
    }
}
