pub mod board;
pub mod card;

pub use board::{Board, BoardSummary, Label, List};
pub use card::{Attachment, Card, CardDetails, CheckItem, Checklist, Comment};
