/// Messages posted from background tasks into the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    AssistantReplied { note_id: String, content: String },
}
