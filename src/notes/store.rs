use crate::error::{AppError, AppResult};
use crate::notes::PersistedState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORAGE_VERSION: u32 = 1;
pub const STORAGE_FILE: &str = "notes-storage.json";

/// Durable home of the notes collection and the selection.
pub trait NotesPersistence: Send {
    /// `Ok(None)` means nothing has been stored yet.
    fn load(&self) -> AppResult<Option<PersistedState>>;
    fn save(&self, state: &PersistedState) -> AppResult<()>;
}

#[derive(Serialize)]
struct RecordRef<'a> {
    version: u32,
    state: &'a PersistedState,
}

#[derive(Deserialize)]
struct Record {
    version: u32,
    state: PersistedState,
}

pub fn encode(state: &PersistedState) -> AppResult<Vec<u8>> {
    let record = RecordRef {
        version: STORAGE_VERSION,
        state,
    };
    Ok(serde_json::to_vec_pretty(&record)?)
}

pub fn decode(data: &[u8]) -> AppResult<PersistedState> {
    let record: Record = serde_json::from_slice(data)?;
    if record.version != STORAGE_VERSION {
        return Err(AppError::Storage(format!(
            "unknown storage version: {}",
            record.version
        )));
    }
    Ok(record.state)
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotesPersistence for FileStorage {
    fn load(&self) -> AppResult<Option<PersistedState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path).map_err(|err| {
            AppError::Io(format!("failed to read {}: {err}", self.path.display()))
        })?;
        decode(&data).map(Some).map_err(|err| match err {
            AppError::Storage(message) => {
                AppError::Storage(format!("{}: {message}", self.path.display()))
            }
            other => other,
        })
    }

    fn save(&self, state: &PersistedState) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let bytes = encode(state)?;
        let tmp_path = self.path.with_extension("json.tmp");

        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if self.path.exists() {
                    fs::remove_file(&self.path)?;
                    fs::rename(&tmp_path, &self.path)?;
                    Ok(())
                } else {
                    Err(rename_err.into())
                }
            }
        }
    }
}

/// In-memory backend; clones share the same slot.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: std::sync::Arc<std::sync::Mutex<Option<Vec<u8>>>>,
    fail_writes: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn put_raw(&self, data: &[u8]) {
        *self.slot.lock().expect("memory slot lock") = Some(data.to_vec());
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.slot.lock().expect("memory slot lock").clone()
    }

    pub fn stored(&self) -> Option<PersistedState> {
        let slot = self.slot.lock().expect("memory slot lock");
        slot.as_deref().map(|data| decode(data).expect("stored record decodes"))
    }
}

#[cfg(test)]
impl NotesPersistence for MemoryStorage {
    fn load(&self) -> AppResult<Option<PersistedState>> {
        let slot = self.slot.lock().expect("memory slot lock");
        slot.as_deref().map(decode).transpose()
    }

    fn save(&self, state: &PersistedState) -> AppResult<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::Io("simulated write failure".to_string()));
        }
        let bytes = encode(state)?;
        *self.slot.lock().expect("memory slot lock") = Some(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStorage, NotesPersistence};
    use crate::notes::{ChatMessage, PersistedState, Sender};
    use std::fs;

    #[test]
    fn load_returns_none_when_nothing_stored() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let storage = FileStorage::in_dir(dir.path());
        assert!(storage.load().expect("missing file is not an error").is_none());
    }

    #[test]
    fn save_then_load_reproduces_state() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let storage = FileStorage::in_dir(dir.path());

        let mut state = PersistedState::seeded();
        state.notes[1]
            .chat_history
            .push(ChatMessage::new("first", Sender::User));
        state.notes[1]
            .chat_history
            .push(ChatMessage::new("second", Sender::Assistant));
        state.current_note_id = Some(state.notes[1].id.clone());

        storage.save(&state).expect("save should succeed");
        let loaded = storage
            .load()
            .expect("load should succeed")
            .expect("state should be present");
        assert_eq!(loaded, state);
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let storage = FileStorage::in_dir(dir.path());

        storage
            .save(&PersistedState::seeded())
            .expect("first save should succeed");
        storage
            .save(&PersistedState::default())
            .expect("second save should succeed");

        let loaded = storage.load().expect("load should succeed");
        assert_eq!(loaded, Some(PersistedState::default()));
    }

    #[test]
    fn load_reads_legacy_sender_tags() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let storage = FileStorage::in_dir(dir.path());
        let data = r#"{
  "version": 1,
  "state": {
    "notes": [
      {
        "id": "n1",
        "title": "Legacy",
        "content": "<p>hi</p>",
        "created_at": "2025-05-10T10:00:00Z",
        "updated_at": "2025-05-10T11:00:00Z",
        "chat_history": [
          {"id": "m1", "content": "hello", "sender": "user", "timestamp": "2025-05-10T10:30:00Z"},
          {"id": "m2", "content": "hi there", "sender": "ai", "timestamp": "2025-05-10T10:30:01Z"}
        ]
      }
    ],
    "current_note_id": "n1"
  }
}"#;
        fs::write(storage.path(), data).expect("legacy fixture should write");

        let state = storage
            .load()
            .expect("legacy record should load")
            .expect("state should be present");
        assert_eq!(state.current_note_id.as_deref(), Some("n1"));
        assert_eq!(state.notes[0].chat_history[1].sender, Sender::Assistant);
    }

    #[test]
    fn load_rejects_unknown_version() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let storage = FileStorage::in_dir(dir.path());
        fs::write(
            storage.path(),
            r#"{"version": 99, "state": {"notes": [], "current_note_id": null}}"#,
        )
        .expect("fixture should write");

        let error = storage.load().expect_err("unknown version should fail");
        assert!(error.to_string().contains("unknown storage version"));
    }

    #[test]
    fn load_reports_malformed_record() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let storage = FileStorage::in_dir(dir.path());
        fs::write(storage.path(), "{ truncated").expect("fixture should write");

        let error = storage.load().expect_err("malformed record should fail");
        assert!(error.to_string().starts_with("STORAGE_INVALID"));
    }
}
