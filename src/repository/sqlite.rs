use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::NoteRepository;
use crate::entity::Note;
use crate::error::{JotterError, Result};

pub const NOTES_DB: &str = "notes.db";

/// SQLite-backed notes table.
///
/// rusqlite is blocking, so every call runs on tokio's blocking pool with
/// the connection behind a mutex.
pub struct SqliteNoteRepository {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteNoteRepository {
    /// Open or create the notes database inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(NOTES_DB);
        let conn = Connection::open(&path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| JotterError::Storage(format!("blocking task failed: {}", e)))?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created_at)",
        [],
    )?;
    Ok(())
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| JotterError::Storage(format!("invalid timestamp '{}': {}", raw, e)))
}

struct NoteRow {
    id: String,
    title: String,
    content: String,
    created_at: String,
    updated_at: String,
}

impl NoteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_note(self) -> Result<Note> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| JotterError::Storage(format!("invalid note id '{}': {}", self.id, e)))?;
        Ok(Note {
            id,
            title: self.title,
            content: self.content,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    async fn list_all(&self) -> Result<Vec<Note>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, created_at, updated_at
                 FROM notes ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([], NoteRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(NoteRow::into_note).collect()
        })
        .await
    }

    async fn insert(&self, title: &str, content: &str) -> Result<Note> {
        // Stored timestamps keep microseconds; match them in the returned note.
        let mut note = Note::new(title, content);
        note.created_at = note.created_at.trunc_subsecs(6);
        note.updated_at = note.created_at;
        let row = note.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO notes (id, title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id.to_string(),
                    row.title,
                    row.content,
                    timestamp(&row.created_at),
                    timestamp(&row.updated_at),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(note)
    }

    async fn update_by_id(&self, id: Uuid, content: &str, title: &str) -> Result<()> {
        let content = content.to_string();
        let title = title.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![title, content, timestamp(&Utc::now()), id.to_string()],
            )?;
            if changed == 0 {
                return Err(JotterError::NoteNotFound(id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        self.run(move |conn| {
            let changed = conn.execute("DELETE FROM notes WHERE id = ?1", [id.to_string()])?;
            if changed == 0 {
                return Err(JotterError::NoteNotFound(id.to_string()));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let tmp = TempDir::new().unwrap();
        let repo = SqliteNoteRepository::open(tmp.path()).unwrap();

        assert_eq!(repo.path(), Some(tmp.path().join(NOTES_DB).as_path()));
        assert!(tmp.path().join(NOTES_DB).exists());
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let first = repo.insert("First", "a").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.insert("Second", "b").await.unwrap();

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, second.id);
        assert_eq!(notes[1].id, first.id);
        assert_eq!(notes[1].title, "First");
        assert_eq!(notes[1].content, "a");
    }

    #[tokio::test]
    async fn test_update_changes_fields_and_stamps() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let note = repo.insert("Old", "old body").await.unwrap();

        repo.update_by_id(note.id, "new body", "New").await.unwrap();

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes[0].title, "New");
        assert_eq!(notes[0].content, "new body");
        assert_eq!(notes[0].created_at, note.created_at);
        assert!(notes[0].updated_at >= notes[0].created_at);
    }

    #[tokio::test]
    async fn test_update_missing_note_fails() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let result = repo.update_by_id(Uuid::new_v4(), "c", "t").await;
        assert!(matches!(result, Err(JotterError::NoteNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let repo = SqliteNoteRepository::open_in_memory().unwrap();
        let note = repo.insert("Gone", "").await.unwrap();

        repo.delete_by_id(note.id).await.unwrap();
        assert!(repo.list_all().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_by_id(note.id).await,
            Err(JotterError::NoteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_notes_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let id = {
            let repo = SqliteNoteRepository::open(tmp.path()).unwrap();
            repo.insert("Kept", "body").await.unwrap().id
        };

        let repo = SqliteNoteRepository::open(tmp.path()).unwrap();
        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, id);
    }
}
