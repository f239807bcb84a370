use crate::assistant::Assistant;
use crate::event::AppEvent;
use std::sync::mpsc;
use tokio::runtime::Handle;

/// Runs assistant requests on the background runtime and posts the reply
/// back to the UI loop.
#[derive(Clone)]
pub struct AssistantClient {
    assistant: Assistant,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
}

impl AssistantClient {
    pub fn new(assistant: Assistant, tx: mpsc::Sender<AppEvent>, runtime_handle: Handle) -> Self {
        Self {
            assistant,
            tx,
            runtime_handle,
        }
    }

    pub fn send(&self, note_id: String, prompt: String) {
        let assistant = self.assistant.clone();
        let tx = self.tx.clone();
        self.runtime_handle.spawn(async move {
            let content = assistant.reply_or_apology(&prompt).await;
            if tx
                .send(AppEvent::AssistantReplied { note_id, content })
                .is_err()
            {
                tracing::debug!("ui closed before assistant reply arrived");
            }
        });
    }
}
