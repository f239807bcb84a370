use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod state;
pub mod store;

pub const DEFAULT_TITLE: &str = "Untitled Note";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

impl Note {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            content: String::new(),
            created_at: now,
            updated_at: now,
            chat_history: Vec::new(),
        }
    }

    /// Refreshes `updated_at` without letting it run backwards if the
    /// wall clock steps back.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }
}

/// Everything that is written to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersistedState {
    pub notes: Vec<Note>,
    pub current_note_id: Option<String>,
}

impl PersistedState {
    /// The notes a first start begins with.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let welcome_at = now - Duration::days(1);
        let meeting_at = now - Duration::days(2);
        let notes = vec![
            Note {
                id: Uuid::new_v4().to_string(),
                title: "Welcome Note".to_string(),
                content: concat!(
                    "<h1>Welcome to Scribby!</h1>",
                    "<p>This is a sample note to get you started.</p>",
                    "<ul><li>Click on the assistant button in the bottom right to start chatting</li>",
                    "<li>Create new notes using the + button in the sidebar</li>",
                    "<li>Edit this note to try out the rich text editor</li></ul>"
                )
                .to_string(),
                created_at: welcome_at,
                updated_at: welcome_at,
                chat_history: Vec::new(),
            },
            Note {
                id: Uuid::new_v4().to_string(),
                title: "Meeting Notes".to_string(),
                content: concat!(
                    "<h2>Team Meeting - May 10, 2025</h2>",
                    "<p>Attendees: John, Sarah, Mike, Lisa</p>",
                    "<h3>Agenda</h3>",
                    "<ol><li>Project updates</li><li>Roadmap review</li><li>Q&amp;A session</li></ol>"
                )
                .to_string(),
                created_at: meeting_at,
                updated_at: meeting_at,
                chat_history: Vec::new(),
            },
        ];
        let current_note_id = notes.first().map(|note| note.id.clone());
        Self {
            notes,
            current_note_id,
        }
    }
}
