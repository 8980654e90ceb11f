use chrono_tz::Tz;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use crate::config::{AppConfig, OutputMode};
use crate::model::{Board, Card, CardDetails};
use crate::util::dates::format_opt;

/// The fixed set of placeholders a card template may reference.
///
/// All text fields are markup-escaped when the context is built, so templates
/// receive them verbatim; `description` is pre-converted markdown HTML in the
/// PDF path.
#[derive(Debug, Clone, Serialize)]
pub struct CardContext {
    pub title: String,
    pub list: String,
    pub labels: String,
    pub start_date: String,
    pub due_date: String,
    pub last_activity_date: String,
    pub description: String,
    pub num: i64,
    pub short_url: String,
    pub checklists: Vec<ChecklistContext>,
    pub comments: Vec<CommentContext>,
    pub attachments: Vec<AttachmentContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistContext {
    pub name: String,
    pub percent_complete: String,
    pub items: Vec<CheckItemContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItemContext {
    pub name: String,
    pub state: String,
    pub completed_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentContext {
    pub date: String,
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentContext {
    pub filename: String,
    pub date: String,
}

/// Escape the characters that would break DOCX XML or the HTML template.
pub fn escape_markup(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert a card's markdown description to HTML for the PDF path.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new_ext(markdown, pulldown_cmark::Options::empty());
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

impl CardContext {
    pub fn build(
        board: &Board,
        list_name: &str,
        card: &Card,
        details: &CardDetails,
        config: &AppConfig,
        tz: Tz,
    ) -> Self {
        let format = &config.dates.date_format;
        let labels = board
            .label_titles(card, &config.labels)
            .iter()
            .map(|t| escape_markup(t))
            .collect::<Vec<_>>()
            .join(", ");
        let description = match config.template.output_mode {
            OutputMode::Docx => escape_markup(&card.desc),
            OutputMode::Pdf => markdown_to_html(&card.desc),
        };

        CardContext {
            title: escape_markup(&card.name),
            list: escape_markup(list_name),
            labels,
            start_date: format_opt(card.start, tz, format),
            due_date: format_opt(card.due, tz, format),
            last_activity_date: format_opt(card.date_last_activity, tz, format),
            description,
            num: card.id_short,
            short_url: card.short_url.clone().unwrap_or_default(),
            checklists: details
                .checklists
                .iter()
                .map(|cl| ChecklistContext {
                    name: escape_markup(&cl.name),
                    percent_complete: cl.percent_complete(),
                    items: cl
                        .items
                        .iter()
                        .map(|item| CheckItemContext {
                            name: escape_markup(&item.name),
                            state: item.state.clone(),
                            completed_date: format_opt(item.completed_date, tz, format),
                        })
                        .collect(),
                })
                .collect(),
            comments: details
                .comments
                .iter()
                .map(|c| CommentContext {
                    date: format_opt(Some(c.date), tz, format),
                    author: escape_markup(&c.author),
                    text: escape_markup(&c.text),
                })
                .collect(),
            attachments: details
                .attachments
                .iter()
                .map(|a| AttachmentContext {
                    filename: escape_markup(&a.name),
                    date: format_opt(a.date, tz, format),
                })
                .collect(),
        }
    }
}

/// Render a template source against a card context.
///
/// Undefined placeholders are hard errors so template/data mismatches surface
/// instead of producing blank text. Fields are pre-escaped, so the engine's
/// auto-escaping stays off.
pub fn render_template(
    name: &str,
    source: &str,
    ctx: &CardContext,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_template(name, source)?;
    env.get_template(name)?.render(ctx)
}
