use crate::assistant::client::AssistantClient;
use crate::notes::state::NotesStore;
use crate::notes::{ChatMessage, Sender};
use crate::theme::Theme;
use eframe::egui::{self, Align, Align2, Key, Layout, Modifiers, RichText, ScrollArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerKey {
    Submit,
    LineBreak,
}

/// Enter sends; Shift+Enter keeps a line break in the draft.
pub fn classify_enter(modifiers: Modifiers) -> ComposerKey {
    if modifiers.shift {
        ComposerKey::LineBreak
    } else {
        ComposerKey::Submit
    }
}

/// Removes Enter presses that submit, leaving Shift+Enter for the text
/// field. Returns whether any were removed.
pub fn take_submit_keys(events: &mut Vec<egui::Event>) -> bool {
    let before = events.len();
    events.retain(|event| {
        !matches!(
            event,
            egui::Event::Key { key: Key::Enter, pressed: true, modifiers, .. }
                if classify_enter(*modifiers) == ComposerKey::Submit
        )
    });
    events.len() != before
}

/// Conversation panel for one note at a time. Visibility, draft and the
/// in-flight flag are session-only.
#[derive(Debug, Default)]
pub struct ChatPanel {
    pub open: bool,
    input: String,
    in_flight: bool,
    scrolled_to: Option<(String, usize)>,
}

impl ChatPanel {
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    #[cfg(test)]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[cfg(test)]
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Records the draft as a user message on `note_id` and returns the
    /// prompt to hand to the assistant. Blank drafts and drafts sent while
    /// a reply is pending are ignored.
    pub fn submit(&mut self, store: &mut NotesStore, note_id: &str) -> Option<String> {
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() || self.in_flight {
            return None;
        }
        if let Err(err) = store.add_chat_message(note_id, &prompt, Sender::User) {
            tracing::warn!(note_id = %note_id, error = %err, "chat message dropped");
            return None;
        }
        self.input.clear();
        self.in_flight = true;
        Some(prompt)
    }

    pub fn receive_reply(&mut self, store: &mut NotesStore, note_id: &str, content: &str) {
        if let Err(err) = store.add_chat_message(note_id, content, Sender::Assistant) {
            tracing::warn!(note_id = %note_id, error = %err, "assistant reply dropped");
        }
        self.in_flight = false;
    }

    /// True once per change of the displayed thread.
    fn needs_scroll(&mut self, note_id: &str, len: usize) -> bool {
        let key = (note_id.to_string(), len);
        if self.scrolled_to.as_ref() == Some(&key) {
            return false;
        }
        self.scrolled_to = Some(key);
        true
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        store: &mut NotesStore,
        note_id: &str,
        client: &AssistantClient,
        theme: &Theme,
    ) {
        let mut open = self.open;
        egui::Window::new("AI Assistant")
            .open(&mut open)
            .anchor(Align2::RIGHT_BOTTOM, [-theme.spacing_24, -theme.spacing_24])
            .default_width(360.0)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                let history = store
                    .note(note_id)
                    .map(|note| note.chat_history.clone())
                    .unwrap_or_default();
                self.render_history(ui, note_id, &history, theme);
                ui.separator();
                if let Some(prompt) = self.render_composer(ui, store, note_id) {
                    client.send(note_id.to_string(), prompt);
                }
            });
        self.open = open;
    }

    fn render_history(
        &mut self,
        ui: &mut egui::Ui,
        note_id: &str,
        history: &[ChatMessage],
        theme: &Theme,
    ) {
        let scroll = self.needs_scroll(note_id, history.len());
        ScrollArea::vertical()
            .id_salt("chat_history")
            .max_height(280.0)
            .min_scrolled_height(280.0)
            .show(ui, |ui| {
                if history.is_empty() {
                    ui.vertical_centered(|ui| {
                        ui.add_space(theme.spacing_24);
                        ui.label(RichText::new("Ask me anything about your note!").color(theme.text_muted));
                        ui.label(
                            RichText::new("I can help you organize, brainstorm, or summarize.")
                                .small()
                                .color(theme.text_muted),
                        );
                    });
                }

                for message in history {
                    let (layout, fill, color) = match message.sender {
                        Sender::User => (
                            Layout::right_to_left(Align::TOP),
                            theme.accent_primary,
                            theme.text_on_accent,
                        ),
                        Sender::Assistant => (
                            Layout::left_to_right(Align::TOP),
                            theme.surface_3,
                            theme.text_primary,
                        ),
                    };
                    ui.with_layout(layout, |ui| {
                        theme.bubble_frame(fill).show(ui, |ui| {
                            ui.set_max_width(ui.available_width() * 0.85);
                            ui.label(RichText::new(&message.content).color(color));
                        });
                    });
                }

                if self.in_flight {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("Thinking...").color(theme.text_muted));
                    });
                }

                if scroll {
                    ui.scroll_to_cursor(Some(Align::BOTTOM));
                }
            });
    }

    fn render_composer(
        &mut self,
        ui: &mut egui::Ui,
        store: &mut NotesStore,
        note_id: &str,
    ) -> Option<String> {
        let input_id = ui.make_persistent_id("chat_input");
        let mut send_now = false;
        if !self.in_flight && ui.memory(|memory| memory.has_focus(input_id)) {
            send_now = ui.input_mut(|input| take_submit_keys(&mut input.events));
        }

        ui.horizontal(|ui| {
            ui.add_enabled(
                !self.in_flight,
                egui::TextEdit::multiline(&mut self.input)
                    .id(input_id)
                    .desired_rows(2)
                    .desired_width(ui.available_width() - 64.0)
                    .hint_text("Ask a question..."),
            );
            let can_send = !self.in_flight && !self.input.trim().is_empty();
            if ui.add_enabled(can_send, egui::Button::new("Send")).clicked() {
                send_now = true;
            }
        });

        if send_now {
            self.submit(store, note_id)
        } else {
            None
        }
    }
}
