use crate::editor::document::RichDocument;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

pub mod chat;
pub mod debounce;
pub mod home;
pub mod note_view;
pub mod sidebar;

const EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Editor,
}

/// "May 10"
pub fn short_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%b %-d").to_string()
}

/// "May 10, 2025"
pub fn long_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%b %-d, %Y").to_string()
}

/// Plain-text preview of stored markup.
pub fn excerpt(content: &str) -> String {
    let plain = RichDocument::from_html(content).plain_text();
    let plain = plain.trim();
    if plain.chars().count() > EXCERPT_CHARS {
        let cut: String = plain.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        plain.to_string()
    }
}

pub fn message_count_label(count: usize) -> String {
    match count {
        0 => "No messages".to_string(),
        1 => "1 message".to_string(),
        n => format!("{n} messages"),
    }
}
