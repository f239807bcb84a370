use crate::error::{AppError, AppResult};
use crate::notes::store::NotesPersistence;
use crate::notes::{ChatMessage, Note, PersistedState, Sender};
use std::sync::mpsc;

/// Change notifications delivered to subscribers after each command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    NoteCreated { note_id: String },
    NoteUpdated { note_id: String },
    NoteDeleted { note_id: String },
    SelectionChanged { note_id: Option<String> },
    ChatMessageAppended { note_id: String, message_id: String },
    PersistenceFailed { message: String },
}

/// Sole owner of the notes collection and the selection. Every mutation
/// goes through one of the commands below, is written to durable storage
/// and then announced to subscribers.
pub struct NotesStore {
    state: PersistedState,
    persistence: Box<dyn NotesPersistence>,
    persistence_enabled: bool,
    warning: Option<String>,
    subscribers: Vec<mpsc::Sender<StoreEvent>>,
}

impl NotesStore {
    pub fn open(persistence: Box<dyn NotesPersistence>) -> Self {
        let (state, warning, persistence_enabled, needs_save) = match persistence.load() {
            Ok(Some(state)) => (state, None, true, false),
            Ok(None) => (PersistedState::seeded(), None, true, true),
            Err(err) => {
                tracing::warn!(error = %err, "stored notes unreadable; running in memory only");
                (
                    PersistedState::seeded(),
                    Some(format!("stored notes unreadable, changes will not be saved: {err}")),
                    false,
                    false,
                )
            }
        };

        let mut store = Self {
            state,
            persistence,
            persistence_enabled,
            warning,
            subscribers: Vec::new(),
        };
        let repaired = store.repair_selection();
        if needs_save || repaired {
            store.persist();
        }
        store
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn notes(&self) -> &[Note] {
        &self.state.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.state.notes.iter().find(|note| note.id == id)
    }

    pub fn current_note_id(&self) -> Option<&str> {
        self.state.current_note_id.as_deref()
    }

    pub fn current_note(&self) -> Option<&Note> {
        self.current_note_id().and_then(|id| self.note(id))
    }

    /// Latest persistence problem, if any. Never fatal.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &PersistedState {
        &self.state
    }

    pub fn add_note(&mut self) -> String {
        let note = Note::new();
        let note_id = note.id.clone();
        self.state.notes.insert(0, note);
        self.state.current_note_id = Some(note_id.clone());
        tracing::debug!(note_id = %note_id, "note created");

        self.persist();
        self.emit(StoreEvent::NoteCreated {
            note_id: note_id.clone(),
        });
        self.emit(StoreEvent::SelectionChanged {
            note_id: Some(note_id.clone()),
        });
        note_id
    }

    pub fn update_note_title(&mut self, id: &str, title: &str) -> AppResult<()> {
        self.update_note(id, |note| note.title = title.to_string())
    }

    pub fn update_note_content(&mut self, id: &str, content: &str) -> AppResult<()> {
        self.update_note(id, |note| note.content = content.to_string())
    }

    pub fn delete_note(&mut self, id: &str) -> AppResult<()> {
        let position = self.position(id)?;
        self.state.notes.remove(position);

        let selection_changed = self.state.current_note_id.as_deref() == Some(id);
        if selection_changed {
            self.state.current_note_id = self.state.notes.first().map(|note| note.id.clone());
        }
        tracing::debug!(note_id = %id, "note deleted");

        self.persist();
        self.emit(StoreEvent::NoteDeleted {
            note_id: id.to_string(),
        });
        if selection_changed {
            self.emit(StoreEvent::SelectionChanged {
                note_id: self.state.current_note_id.clone(),
            });
        }
        Ok(())
    }

    /// Selects an existing note. Unknown identifiers are rejected and the
    /// selection stays where it was.
    pub fn set_current_note(&mut self, id: &str) -> AppResult<()> {
        self.position(id)?;
        if self.state.current_note_id.as_deref() == Some(id) {
            return Ok(());
        }
        self.state.current_note_id = Some(id.to_string());

        self.persist();
        self.emit(StoreEvent::SelectionChanged {
            note_id: Some(id.to_string()),
        });
        Ok(())
    }

    pub fn add_chat_message(
        &mut self,
        note_id: &str,
        content: &str,
        sender: Sender,
    ) -> AppResult<ChatMessage> {
        let position = self.position(note_id)?;
        let message = ChatMessage::new(content, sender);
        self.state.notes[position]
            .chat_history
            .push(message.clone());

        self.persist();
        self.emit(StoreEvent::ChatMessageAppended {
            note_id: note_id.to_string(),
            message_id: message.id.clone(),
        });
        Ok(message)
    }

    fn update_note(&mut self, id: &str, apply: impl FnOnce(&mut Note)) -> AppResult<()> {
        let position = self.position(id)?;
        let note = &mut self.state.notes[position];
        apply(note);
        note.touch();

        self.persist();
        self.emit(StoreEvent::NoteUpdated {
            note_id: id.to_string(),
        });
        Ok(())
    }

    fn position(&self, id: &str) -> AppResult<usize> {
        self.state
            .notes
            .iter()
            .position(|note| note.id == id)
            .ok_or_else(|| AppError::NotFound(format!("note {id}")))
    }

    /// Restores "exactly one note selected whenever any exist" on records
    /// that were written by something else.
    fn repair_selection(&mut self) -> bool {
        let valid = match self.state.current_note_id.as_deref() {
            Some(id) => self.state.notes.iter().any(|note| note.id == id),
            None => self.state.notes.is_empty(),
        };
        if valid {
            return false;
        }
        self.state.current_note_id = self.state.notes.first().map(|note| note.id.clone());
        true
    }

    fn persist(&mut self) {
        if !self.persistence_enabled {
            return;
        }
        match self.persistence.save(&self.state) {
            Ok(()) => self.warning = None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist notes");
                let message = format!("failed to save notes: {err}");
                self.warning = Some(message.clone());
                self.emit(StoreEvent::PersistenceFailed { message });
            }
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::{NotesStore, StoreEvent};
    use crate::error::AppError;
    use crate::notes::store::MemoryStorage;
    use crate::notes::{PersistedState, Sender, DEFAULT_TITLE};

    fn open_seeded() -> (NotesStore, MemoryStorage) {
        let storage = MemoryStorage::default();
        let store = NotesStore::open(Box::new(storage.clone()));
        (store, storage)
    }

    #[test]
    fn first_open_seeds_and_persists_two_notes() {
        let (store, storage) = open_seeded();
        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.current_note_id(), Some(store.notes()[0].id.as_str()));
        assert_eq!(storage.stored().as_ref(), Some(store.snapshot()));
    }

    #[test]
    fn reopen_restores_previous_session() {
        let (mut store, storage) = open_seeded();
        let id = store.add_note();
        store.update_note_title(&id, "Groceries").expect("note exists");
        store
            .add_chat_message(&id, "what to buy?", Sender::User)
            .expect("note exists");
        let before = store.snapshot().clone();
        drop(store);

        let reopened = NotesStore::open(Box::new(storage));
        assert_eq!(reopened.snapshot(), &before);
        assert_eq!(reopened.current_note_id(), Some(id.as_str()));
    }

    #[test]
    fn add_note_prepends_and_selects_with_defaults() {
        let (mut store, _) = open_seeded();
        let id = store.add_note();
        let note = &store.notes()[0];
        assert_eq!(note.id, id);
        assert_eq!(note.title, DEFAULT_TITLE);
        assert!(!note.title.is_empty());
        assert!(note.content.is_empty());
        assert!(note.chat_history.is_empty());
        assert_eq!(store.current_note_id(), Some(id.as_str()));
    }

    #[test]
    fn updates_refresh_timestamp_monotonically() {
        let (mut store, _) = open_seeded();
        let id = store.add_note();
        let mut last = store.note(&id).expect("note exists").updated_at;
        for step in 0..20 {
            if step % 2 == 0 {
                store
                    .update_note_title(&id, &format!("title {step}"))
                    .expect("note exists");
            } else {
                store
                    .update_note_content(&id, &format!("<p>{step}</p>"))
                    .expect("note exists");
            }
            let note = store.note(&id).expect("note exists");
            assert!(note.updated_at >= last);
            assert!(note.updated_at >= note.created_at);
            last = note.updated_at;
        }
        let note = store.note(&id).expect("note exists");
        assert_eq!(note.title, "title 18");
        assert_eq!(note.content, "<p>19</p>");
    }

    #[test]
    fn updating_unknown_note_is_not_found_and_changes_nothing() {
        let (mut store, _) = open_seeded();
        let before = store.snapshot().clone();
        let error = store
            .update_note_title("missing", "x")
            .expect_err("unknown id should fail");
        assert!(matches!(error, AppError::NotFound(_)));
        assert!(store.update_note_content("missing", "x").is_err());
        assert!(store
            .add_chat_message("missing", "x", Sender::User)
            .is_err());
        assert_eq!(store.snapshot(), &before);
    }

    #[test]
    fn deleting_selected_note_moves_selection_to_first_remaining() {
        let (mut store, _) = open_seeded();
        let second = store.notes()[1].id.clone();
        let first = store.notes()[0].id.clone();
        store.set_current_note(&second).expect("note exists");

        store.delete_note(&second).expect("note exists");
        assert_eq!(store.current_note_id(), Some(first.as_str()));
    }

    #[test]
    fn deleting_unselected_note_keeps_selection() {
        let (mut store, _) = open_seeded();
        let first = store.notes()[0].id.clone();
        let second = store.notes()[1].id.clone();

        store.delete_note(&second).expect("note exists");
        assert_eq!(store.current_note_id(), Some(first.as_str()));
        assert_eq!(store.notes().len(), 1);
    }

    #[test]
    fn deleting_last_note_clears_selection() {
        let (mut store, storage) = open_seeded();
        let ids: Vec<String> = store.notes().iter().map(|note| note.id.clone()).collect();
        for id in &ids {
            store.delete_note(id).expect("note exists");
        }
        assert!(store.notes().is_empty());
        assert!(store.current_note_id().is_none());
        assert!(store.current_note().is_none());
        assert_eq!(storage.stored(), Some(PersistedState::default()));
    }

    #[test]
    fn set_current_note_rejects_unknown_id() {
        let (mut store, _) = open_seeded();
        let before = store.current_note_id().map(str::to_string);
        let error = store
            .set_current_note("nope")
            .expect_err("unknown id should be rejected");
        assert!(matches!(error, AppError::NotFound(_)));
        assert_eq!(store.current_note_id().map(str::to_string), before);
    }

    #[test]
    fn chat_messages_keep_insertion_order() {
        let (mut store, _) = open_seeded();
        let id = store.notes()[0].id.clone();
        let mut sent = Vec::new();
        for index in 0..12 {
            let sender = if index % 2 == 0 {
                Sender::User
            } else {
                Sender::Assistant
            };
            let message = store
                .add_chat_message(&id, &format!("message {index}"), sender)
                .expect("note exists");
            sent.push(message);
        }
        let history = &store.note(&id).expect("note exists").chat_history;
        assert_eq!(history.len(), 12);
        assert_eq!(history, &sent);
    }

    #[test]
    fn add_then_delete_then_chat_scenario() {
        let (mut store, _) = open_seeded();
        let first = store.notes()[0].id.clone();

        let new_id = store.add_note();
        assert_eq!(store.notes().len(), 3);
        assert_eq!(store.current_note_id(), Some(new_id.as_str()));
        assert_eq!(store.notes()[0].id, new_id);

        store.delete_note(&new_id).expect("note exists");
        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.current_note_id(), Some(first.as_str()));

        store
            .add_chat_message(&first, "hello", Sender::User)
            .expect("note exists");
        store
            .add_chat_message(&first, "Sorry, I encountered an error. Please try again.", Sender::Assistant)
            .expect("note exists");
        let history = &store.note(&first).expect("note exists").chat_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].sender, Sender::Assistant);
    }

    #[test]
    fn subscribers_receive_command_events() {
        let (mut store, _) = open_seeded();
        let rx = store.subscribe();
        let id = store.add_note();
        store.update_note_title(&id, "t").expect("note exists");
        let message = store
            .add_chat_message(&id, "hi", Sender::User)
            .expect("note exists");
        store.delete_note(&id).expect("note exists");

        let events: Vec<StoreEvent> = rx.try_iter().collect();
        let first = store.notes()[0].id.clone();
        assert_eq!(
            events,
            vec![
                StoreEvent::NoteCreated { note_id: id.clone() },
                StoreEvent::SelectionChanged { note_id: Some(id.clone()) },
                StoreEvent::NoteUpdated { note_id: id.clone() },
                StoreEvent::ChatMessageAppended {
                    note_id: id.clone(),
                    message_id: message.id,
                },
                StoreEvent::NoteDeleted { note_id: id },
                StoreEvent::SelectionChanged { note_id: Some(first) },
            ]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (mut store, _) = open_seeded();
        let rx = store.subscribe();
        drop(rx);
        store.add_note();
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn write_failure_is_a_warning_and_memory_stays_authoritative() {
        let (mut store, storage) = open_seeded();
        let rx = store.subscribe();
        storage.set_fail_writes(true);

        let id = store.add_note();
        assert_eq!(store.notes()[0].id, id);
        assert!(store.warning().is_some());
        assert!(rx
            .try_iter()
            .any(|event| matches!(event, StoreEvent::PersistenceFailed { .. })));
        assert_eq!(storage.stored().map(|state| state.notes.len()), Some(2));
    }

    #[test]
    fn warning_clears_after_a_successful_save() {
        let (mut store, storage) = open_seeded();
        storage.set_fail_writes(true);
        store.add_note();
        assert!(store.warning().is_some());

        storage.set_fail_writes(false);
        store.add_note();
        assert!(store.warning().is_none());
        assert_eq!(storage.stored().map(|state| state.notes.len()), Some(4));
    }

    #[test]
    fn unreadable_record_runs_in_memory_without_overwriting() {
        let storage = MemoryStorage::default();
        storage.put_raw(b"{ not a record");
        let mut store = NotesStore::open(Box::new(storage.clone()));

        assert_eq!(store.notes().len(), 2);
        assert!(store.warning().is_some());
        store.add_note();
        assert_eq!(store.notes().len(), 3);
        assert_eq!(storage.raw().as_deref(), Some(&b"{ not a record"[..]));
    }

    #[test]
    fn dangling_selection_is_repaired_on_open() {
        let storage = MemoryStorage::default();
        let mut state = PersistedState::seeded();
        state.current_note_id = Some("gone".to_string());
        crate::notes::store::NotesPersistence::save(&storage, &state).expect("save should succeed");

        let store = NotesStore::open(Box::new(storage));
        assert_eq!(store.current_note_id(), Some(state.notes[0].id.as_str()));
    }
}
