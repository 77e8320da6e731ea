use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::config::{config_path, workspace_dir, JotterConfig, Surface, JOTTER_DIR};
use crate::entity::Note;
use crate::error::{JotterError, Result};
use crate::repository::SqliteNoteRepository;
use crate::session::Session;
use crate::workspace::SaveOutcome;

use super::shell::run_shell;

/// Find the workspace root by looking for .jotter/ in the current directory
/// and its parents.
fn find_project_root() -> Result<PathBuf> {
    let cwd = env::current_dir()?;

    let mut current = cwd.as_path();
    loop {
        if current.join(JOTTER_DIR).is_dir() {
            return Ok(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Err(JotterError::NotInitialized),
        }
    }
}

/// Open the workspace's SQLite notes and load them into a fresh session.
async fn open_session() -> Result<Session<SqliteNoteRepository>> {
    let root = find_project_root()?;
    let config = JotterConfig::load(&root);
    let repo = SqliteNoteRepository::open(&workspace_dir(&root))?;
    let session = Session::new(Arc::new(repo), &config);
    session.load_all().await?;
    Ok(session)
}

/// Resolve a full UUID or a unique UUID prefix to a note id.
pub(crate) fn resolve_note_id(notes: &[Note], id: &str) -> Result<Uuid> {
    let needle = id.trim().to_lowercase();
    if needle.is_empty() {
        return Err(JotterError::NoteNotFound(id.to_string()));
    }
    if let Ok(uuid) = Uuid::parse_str(&needle) {
        return notes
            .iter()
            .find(|n| n.id == uuid)
            .map(|n| n.id)
            .ok_or_else(|| JotterError::NoteNotFound(id.to_string()));
    }

    let matches: Vec<&Note> = notes
        .iter()
        .filter(|n| n.id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [] => Err(JotterError::NoteNotFound(id.to_string())),
        [note] => Ok(note.id),
        _ => Err(JotterError::AmbiguousId(id.to_string())),
    }
}

async fn read_stdin() -> Result<String> {
    let mut content = String::new();
    tokio::io::stdin().read_to_string(&mut content).await?;
    Ok(content)
}

#[derive(Serialize)]
struct NoteJson<'a> {
    #[serde(flatten)]
    note: &'a Note,
    words: usize,
    characters: usize,
}

impl<'a> From<&'a Note> for NoteJson<'a> {
    fn from(note: &'a Note) -> Self {
        let stats = note.stats();
        Self {
            note,
            words: stats.words,
            characters: stats.characters,
        }
    }
}

pub fn handle_init(surface: Surface) -> Result<()> {
    let root = env::current_dir()?;
    let dir = workspace_dir(&root);
    if dir.exists() {
        return Err(JotterError::AlreadyInitialized);
    }

    std::fs::create_dir_all(&dir)?;
    SqliteNoteRepository::open(&dir)?;
    let config = JotterConfig::for_surface(surface);
    config.save_to(&config_path(&root))?;

    println!("Initialized jotter workspace in {}", root.display());
    println!(
        "  surface: {} (saves after {}ms idle)",
        surface,
        config.debounce().window.as_millis()
    );

    Ok(())
}

pub async fn handle_list(json: bool) -> Result<()> {
    let session = open_session().await?;
    let notes = session.notes();

    if json {
        let json_notes: Vec<NoteJson> = notes.iter().map(NoteJson::from).collect();
        println!("{}", serde_json::to_string_pretty(&json_notes)?);
    } else if notes.is_empty() {
        println!("No notes found.");
    } else {
        println!("Notes:\n");
        for n in &notes {
            println!(
                "  ({}) {}  [{} words]",
                n.short_id(),
                n.display_title(),
                n.stats().words
            );
        }
    }

    Ok(())
}

pub async fn handle_add(title: Option<String>, stdin: bool, json: bool) -> Result<()> {
    let session = open_session().await?;
    let note = session.add_note().await?;

    let content = if stdin { Some(read_stdin().await?) } else { None };
    if title.is_some() || content.is_some() {
        session.edit(
            note.id,
            title.unwrap_or_else(|| note.title.clone()),
            content.unwrap_or_else(|| note.content.clone()),
        );
        session.flush(note.id).await?;
    }

    let note = session.note(note.id).unwrap_or(note);
    if json {
        println!("{}", serde_json::to_string_pretty(&NoteJson::from(&note))?);
    } else {
        println!("Created note ({}) - {}", note.short_id(), note.display_title());
    }

    Ok(())
}

pub async fn handle_show(id: String, json: bool) -> Result<()> {
    let session = open_session().await?;
    let note_id = resolve_note_id(&session.notes(), &id)?;
    let note = session
        .note(note_id)
        .ok_or_else(|| JotterError::NoteNotFound(id.clone()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&NoteJson::from(&note))?);
        return Ok(());
    }

    let stats = note.stats();
    println!("{}", note.display_title());
    println!("  id:      {}", note.id);
    println!("  created: {}", note.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  updated: {}", note.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  {} words, {} characters", stats.words, stats.characters);
    if !note.content.is_empty() {
        println!();
        println!("{}", note.content);
    }

    Ok(())
}

pub async fn handle_edit(
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let session = open_session().await?;
    let note_id = resolve_note_id(&session.notes(), &id)?;

    let content = match (content, stdin) {
        (Some(content), _) => Some(content),
        (None, true) => Some(read_stdin().await?),
        (None, false) => None,
    };
    if title.is_none() && content.is_none() {
        eprintln!("Nothing to change. Pass --title, --content or --stdin.");
        return Ok(());
    }

    let draft = session
        .select_note(note_id)
        .ok_or_else(|| JotterError::NoteNotFound(id.clone()))?;
    session.edit(
        note_id,
        title.unwrap_or(draft.title),
        content.unwrap_or(draft.content),
    );
    let outcome = session.flush(note_id).await?;

    let note = session
        .note(note_id)
        .ok_or_else(|| JotterError::NoteNotFound(id.clone()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&NoteJson::from(&note))?);
    } else if matches!(outcome, Some(SaveOutcome::Unchanged)) {
        println!("No changes to note ({}) - {}", note.short_id(), note.display_title());
    } else {
        println!("Updated note ({}) - {}", note.short_id(), note.display_title());
    }

    Ok(())
}

pub async fn handle_delete(id: String, force: bool) -> Result<()> {
    let session = open_session().await?;
    let note_id = resolve_note_id(&session.notes(), &id)?;
    let note = session
        .note(note_id)
        .ok_or_else(|| JotterError::NoteNotFound(id.clone()))?;

    // Confirm deletion unless --force is used
    if !force {
        eprintln!("Delete note ({}) - {}? [y/N] ", note.short_id(), note.display_title());

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(JotterError::Storage(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    session.delete_note(note_id).await?;
    println!("Deleted note ({}) - {}", note.short_id(), note.display_title());

    Ok(())
}

pub async fn handle_search(query: String, json: bool) -> Result<()> {
    let session = open_session().await?;
    let results = session.search(&query);

    if json {
        let json_results: Vec<NoteJson> = results.iter().map(NoteJson::from).collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    } else if results.is_empty() {
        println!("No results found for '{}'.", query);
    } else {
        println!("Search results for '{}':\n", query);
        for n in &results {
            println!("  ({}) {}", n.short_id(), n.display_title());
        }
    }

    Ok(())
}

pub async fn handle_shell() -> Result<()> {
    let session = open_session().await?;
    run_shell(&session).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_full_uuid_and_prefix() {
        let notes = vec![Note::new("a", ""), Note::new("b", "")];
        let id = notes[1].id;

        assert_eq!(resolve_note_id(&notes, &id.to_string()).unwrap(), id);
        assert_eq!(resolve_note_id(&notes, &id.to_string()[..12]).unwrap(), id);
        assert_eq!(
            resolve_note_id(&notes, &id.to_string().to_uppercase()).unwrap(),
            id
        );
    }

    #[test]
    fn test_resolve_unknown_and_empty() {
        let notes = vec![Note::new("a", "")];
        assert!(matches!(
            resolve_note_id(&notes, &Uuid::new_v4().to_string()),
            Err(JotterError::NoteNotFound(_))
        ));
        assert!(matches!(
            resolve_note_id(&notes, "  "),
            Err(JotterError::NoteNotFound(_))
        ));
        assert!(matches!(
            resolve_note_id(&notes, "zzz"),
            Err(JotterError::NoteNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let mut a = Note::new("a", "");
        let mut b = Note::new("b", "");
        a.id = Uuid::parse_str("abcd0000-0000-4000-8000-000000000001").unwrap();
        b.id = Uuid::parse_str("abcd0000-0000-4000-8000-000000000002").unwrap();

        assert!(matches!(
            resolve_note_id(&[a, b], "abcd"),
            Err(JotterError::AmbiguousId(_))
        ));
    }

    #[test]
    fn test_note_json_includes_stats() {
        let note = Note::new("t", "two words");
        let json = serde_json::to_value(NoteJson::from(&note)).unwrap();
        assert_eq!(json["title"], "t");
        assert_eq!(json["words"], 2);
        assert_eq!(json["characters"], 9);
    }
}
