use crate::assistant::client::AssistantClient;
use crate::editor::{widget, EditorSurface};
use crate::notes::state::NotesStore;
use crate::notes::DEFAULT_TITLE;
use crate::theme::Theme;
use crate::ui::chat::ChatPanel;
use crate::ui::debounce::Debouncer;
use crate::ui::Route;
use eframe::egui::{self, RichText};
use std::time::{Duration, Instant};

/// Title and content editing for the selected note.
pub struct NoteView {
    note_id: Option<String>,
    title: String,
    title_commit: Debouncer<(String, String)>,
    editor: EditorSurface,
    pub chat: ChatPanel,
}

impl NoteView {
    pub fn new(title_debounce: Duration) -> Self {
        Self {
            note_id: None,
            title: String::new(),
            title_commit: Debouncer::new(title_debounce),
            editor: EditorSurface::new(""),
            chat: ChatPanel::default(),
        }
    }

    /// Follows the store's selection. A pending title for a previously
    /// shown note is written before switching.
    fn bind(&mut self, store: &mut NotesStore) {
        let Some(note) = store.current_note() else {
            self.flush_title(store);
            self.note_id = None;
            return;
        };

        if self.note_id.as_deref() != Some(note.id.as_str()) {
            let (id, title, content) = (note.id.clone(), note.title.clone(), note.content.clone());
            self.flush_title(store);
            self.note_id = Some(id);
            self.title = title;
            self.editor = EditorSurface::new(&content);
            return;
        }

        if self.title_commit.pending().is_none() && self.title != note.title {
            self.title = note.title.clone();
        }
        self.editor.sync_external(&note.content);
    }

    fn edit_title(&mut self, now: Instant) {
        if let Some(note_id) = &self.note_id {
            self.title_commit
                .push((note_id.clone(), self.title.clone()), now);
        }
    }

    fn commit_due_title(&mut self, store: &mut NotesStore, now: Instant) -> Option<Duration> {
        if let Some((note_id, title)) = self.title_commit.poll(now) {
            Self::write_title(store, &note_id, &title);
        }
        self.title_commit.remaining(now)
    }

    pub fn flush_title(&mut self, store: &mut NotesStore) {
        if let Some((note_id, title)) = self.title_commit.flush() {
            Self::write_title(store, &note_id, &title);
        }
    }

    fn write_title(store: &mut NotesStore, note_id: &str, title: &str) {
        if store.note(note_id).is_some_and(|note| note.title == title) {
            return;
        }
        if let Err(err) = store.update_note_title(note_id, title) {
            tracing::debug!(note_id = %note_id, error = %err, "title commit skipped");
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        store: &mut NotesStore,
        client: &AssistantClient,
        theme: &Theme,
    ) -> Option<Route> {
        let now = Instant::now();
        self.bind(store);

        let Some(note_id) = self.note_id.clone() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No note selected").color(theme.text_muted));
            });
            return None;
        };

        let mut route = None;
        ui.horizontal(|ui| {
            if ui.button("Back to Home").clicked() {
                route = Some(Route::Home);
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = if self.chat.is_in_flight() {
                    "Assistant (thinking...)"
                } else {
                    "Assistant"
                };
                if ui.selectable_label(self.chat.open, label).clicked() {
                    self.chat.toggle();
                }
            });
        });
        ui.add_space(theme.spacing_8);

        let title = ui.add(
            egui::TextEdit::singleline(&mut self.title)
                .font(egui::FontId::proportional(24.0))
                .frame(false)
                .desired_width(f32::INFINITY)
                .hint_text(DEFAULT_TITLE),
        );
        if title.changed() {
            self.edit_title(now);
        }
        if let Some(remaining) = self.commit_due_title(store, now) {
            ui.ctx().request_repaint_after(remaining);
        }
        ui.add_space(theme.spacing_12);

        egui::ScrollArea::vertical()
            .id_salt("note_body")
            .show(ui, |ui| {
                if let Some(markup) = widget::show(ui, &mut self.editor, theme) {
                    if let Err(err) = store.update_note_content(&note_id, &markup) {
                        tracing::debug!(note_id = %note_id, error = %err, "content edit dropped");
                    }
                }
            });

        if self.chat.open {
            self.chat.show(ui.ctx(), store, &note_id, client, theme);
        }

        if route.is_some() {
            self.flush_title(store);
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::NoteView;
    use crate::notes::state::NotesStore;
    use crate::notes::store::MemoryStorage;
    use std::time::{Duration, Instant};

    const WINDOW: Duration = Duration::from_millis(500);

    fn fixture() -> (NoteView, NotesStore) {
        let mut store = NotesStore::open(Box::new(MemoryStorage::default()));
        let mut view = NoteView::new(WINDOW);
        view.bind(&mut store);
        (view, store)
    }

    #[test]
    fn bind_loads_selected_note() {
        let (view, store) = fixture();
        let note = store.current_note().expect("seeded selection");
        assert_eq!(view.note_id.as_deref(), Some(note.id.as_str()));
        assert_eq!(view.title, note.title);
        assert_eq!(view.editor.document().to_html(), note.content);
    }

    #[test]
    fn title_is_committed_after_quiet_window() {
        let (mut view, mut store) = fixture();
        let start = Instant::now();
        view.title = "Draft".to_string();
        view.edit_title(start);
        view.title = "Draft two".to_string();
        view.edit_title(start + Duration::from_millis(300));

        view.commit_due_title(&mut store, start + Duration::from_millis(600));
        assert_eq!(store.current_note().expect("selected").title, "Welcome Note");

        let remaining = view.commit_due_title(&mut store, start + Duration::from_millis(800));
        assert_eq!(remaining, None);
        assert_eq!(store.current_note().expect("selected").title, "Draft two");
    }

    #[test]
    fn pending_title_is_flushed_when_selection_moves() {
        let (mut view, mut store) = fixture();
        let first = store.notes()[0].id.clone();
        let second = store.notes()[1].id.clone();

        view.title = "Renamed".to_string();
        view.edit_title(Instant::now());
        store.set_current_note(&second).expect("note exists");
        view.bind(&mut store);

        assert_eq!(store.note(&first).expect("note exists").title, "Renamed");
        assert_eq!(view.note_id.as_deref(), Some(second.as_str()));
        assert_eq!(view.title, "Meeting Notes");
    }

    #[test]
    fn external_content_change_reloads_editor() {
        let (mut view, mut store) = fixture();
        let id = store.notes()[0].id.clone();
        store
            .update_note_content(&id, "<p>replaced</p>")
            .expect("note exists");
        view.bind(&mut store);
        assert_eq!(view.editor.document().to_html(), "<p>replaced</p>");
    }

    #[test]
    fn deleting_last_note_unbinds_view() {
        let (mut view, mut store) = fixture();
        let ids: Vec<String> = store.notes().iter().map(|n| n.id.clone()).collect();
        for id in ids {
            store.delete_note(&id).expect("note exists");
        }
        view.bind(&mut store);
        assert!(view.note_id.is_none());
    }
}
