use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jotter::repository::Operation;
use jotter::{
    DebounceConfig, FailureKind, JotterConfig, MemoryNoteRepository, Note, SaveOutcome,
    SaveState, Session, WorkspaceEvent,
};
use tokio::time::sleep;
use uuid::Uuid;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn aged(title: &str, minutes_ago: i64) -> Note {
    let mut note = Note::new(title, format!("{} body", title));
    note.created_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
    note.updated_at = note.created_at;
    note
}

type Repo = Arc<MemoryNoteRepository>;

async fn loaded(notes: Vec<Note>) -> (Session<MemoryNoteRepository>, Repo) {
    let repo = Arc::new(MemoryNoteRepository::with_notes(notes));
    let session = Session::new(repo.clone(), &JotterConfig::default());
    session.load_all().await.unwrap();
    (session, repo)
}

/// Three notes A, B, C opened in that order.
async fn three_tabs() -> (Session<MemoryNoteRepository>, Repo, [Uuid; 3]) {
    let notes = [aged("A", 3), aged("B", 2), aged("C", 1)];
    let ids = [notes[0].id, notes[1].id, notes[2].id];
    let (session, repo) = loaded(notes.to_vec()).await;
    for id in ids {
        assert!(session.open_note(id));
    }
    (session, repo, ids)
}

#[tokio::test]
async fn test_open_sequence_focuses_last_without_duplicates() {
    let (session, _repo, [a, b, c]) = three_tabs().await;

    for id in [b, a, c, a, a, b] {
        session.open_note(id);
    }

    assert_eq!(session.active_note_id(), Some(b));
    assert_eq!(session.open_note_ids(), vec![a, b, c]);
}

#[tokio::test]
async fn test_close_only_tab_clears_workspace() {
    let note = aged("only", 1);
    let (session, _repo) = loaded(vec![note.clone()]).await;
    session.open_note(note.id);

    assert!(session.close_note(note.id));

    assert!(session.open_note_ids().is_empty());
    assert_eq!(session.active_note_id(), None);
    // The note itself is untouched.
    assert!(session.note(note.id).is_some());
}

#[tokio::test]
async fn test_close_active_middle_tab_focuses_left() {
    let (session, _repo, [a, b, c]) = three_tabs().await;
    session.set_active_note_id(Some(b));

    session.close_note(b);

    assert_eq!(session.open_note_ids(), vec![a, c]);
    assert_eq!(session.active_note_id(), Some(a));
}

#[tokio::test]
async fn test_close_active_leftmost_tab_focuses_new_leftmost() {
    let (session, _repo, [a, b, c]) = three_tabs().await;
    session.set_active_note_id(Some(a));

    session.close_note(a);

    assert_eq!(session.open_note_ids(), vec![b, c]);
    assert_eq!(session.active_note_id(), Some(b));
}

#[tokio::test]
async fn test_invalid_tab_operations_are_noops() {
    let (session, _repo, [a, _b, c]) = three_tabs().await;
    let stranger = Uuid::new_v4();

    assert!(!session.open_note(stranger));
    assert!(!session.close_note(stranger));
    assert!(!session.set_active_note_id(Some(stranger)));

    session.close_note(a);
    assert!(!session.set_active_note_id(Some(a)));
    assert_eq!(session.active_note_id(), Some(c));
}

#[tokio::test(start_paused = true)]
async fn test_delete_removes_note_and_cancels_pending_write() {
    let (session, repo, [a, b, c]) = three_tabs().await;
    session.set_active_note_id(Some(b));

    session.edit(b, "B", "typed just before delete");
    sleep(ms(200)).await;
    assert!(session.delete_note(b).await.unwrap());

    assert!(session.note(b).is_none());
    assert_eq!(session.open_note_ids(), vec![a, c]);
    assert_eq!(session.active_note_id(), Some(a));

    sleep(ms(5000)).await;
    assert_eq!(repo.calls(Operation::Update), 0);
    assert!(repo.stored_note(b).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_delete_failure_keeps_local_removal() {
    let (session, repo, [_a, b, _c]) = three_tabs().await;
    repo.fail(Operation::Delete, "network down");

    assert!(session.delete_note(b).await.is_err());

    assert!(session.note(b).is_none());
    assert!(!session.open_note_ids().contains(&b));
    let failure = session.last_error().unwrap();
    assert_eq!(failure.kind, FailureKind::Delete);
    assert_eq!(failure.note_id, Some(b));

    // A later reload must not bring it back while the row still exists.
    repo.clear_failure(Operation::Delete);
    session.load_all().await.unwrap();
    assert!(session.note(b).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_delete_while_write_in_flight_reports_no_failure() {
    let (session, repo, [a, b, _c]) = three_tabs().await;
    repo.set_latency(Operation::Update, ms(300));
    let mut rx = session.subscribe();

    session.edit(b, "B", "edited");
    sleep(ms(600)).await;
    assert_eq!(session.save_state(b), SaveState::Saving);

    assert!(session.delete_note(b).await.unwrap());
    sleep(ms(1000)).await;

    assert!(session.note(b).is_none());
    assert!(repo.stored_note(b).is_none());
    assert!(repo.writes().is_empty());
    assert!(session.last_error().is_none());
    assert_eq!(session.save_state(b), SaveState::Idle);
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, WorkspaceEvent::Failure(_)), "{event:?}");
    }

    // The workspace keeps saving other notes.
    session.edit(a, "A", "still saved");
    sleep(ms(1000)).await;
    assert_eq!(repo.stored_note(a).unwrap().content, "still saved");
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_commit_once_with_last_values() {
    let note = aged("draft", 1);
    let (session, repo) = loaded(vec![note.clone()]).await;
    session.open_note(note.id);

    let mut content = String::new();
    for word in ["the", "quick", "brown", "fox"] {
        content.push_str(word);
        content.push(' ');
        session.edit_active("Fox", content.clone());
        sleep(ms(120)).await;
    }
    sleep(ms(1000)).await;

    let writes = repo.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].title, "Fox");
    assert_eq!(writes[0].content, "the quick brown fox ");
    assert_eq!(session.save_state(note.id), SaveState::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_switching_tabs_does_not_cancel_pending_write() {
    let (session, repo, [a, b, _c]) = three_tabs().await;
    session.set_active_note_id(Some(a));

    session.edit_active("A", "edited in A");
    let draft = session.select_note(b).unwrap();
    assert_eq!(draft.note_id, b);
    assert_eq!(draft.content, "B body");

    sleep(ms(600)).await;
    let writes = repo.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].id, a);
    assert_eq!(repo.stored_note(a).unwrap().content, "edited in A");

    // Switching back shows the committed values.
    assert_eq!(session.select_note(a).unwrap().content, "edited in A");
}

#[tokio::test(start_paused = true)]
async fn test_saving_committed_values_makes_no_write() {
    let note = aged("same", 1);
    let (session, repo) = loaded(vec![note.clone()]).await;

    let outcome = session
        .update_note_content(note.id, &note.content, &note.title)
        .await
        .unwrap();
    assert_eq!(outcome, SaveOutcome::Unchanged);

    let outcome = session
        .update_note_content(note.id, "changed", &note.title)
        .await
        .unwrap();
    assert!(matches!(outcome, SaveOutcome::Committed { .. }));

    let outcome = session
        .update_note_content(note.id, "changed", &note.title)
        .await
        .unwrap();
    assert_eq!(outcome, SaveOutcome::Unchanged);

    assert_eq!(repo.calls(Operation::Update), 1);
}

#[tokio::test]
async fn test_load_failure_leaves_workspace_intact() {
    let (session, repo, [a, b, c]) = three_tabs().await;
    session.set_active_note_id(Some(b));
    let notes_before = session.notes();

    repo.put(aged("D", 0));
    repo.fail(Operation::ListAll, "timeout");
    let mut events = session.subscribe();

    assert!(session.load_all().await.is_err());

    assert_eq!(session.notes(), notes_before);
    assert_eq!(session.open_note_ids(), vec![a, b, c]);
    assert_eq!(session.active_note_id(), Some(b));
    assert_eq!(session.last_error().unwrap().kind, FailureKind::Fetch);
    assert!(matches!(
        events.try_recv(),
        Ok(WorkspaceEvent::Failure(ref f)) if f.kind == FailureKind::Fetch
    ));
}

#[tokio::test]
async fn test_add_note_opens_and_focuses_it() {
    let (session, repo, [a, b, c]) = three_tabs().await;

    let note = session.add_note().await.unwrap();

    assert_eq!(note.title, "New Note");
    assert_eq!(note.content, "# ");
    assert_eq!(session.notes()[0].id, note.id);
    assert_eq!(session.open_note_ids(), vec![a, b, c, note.id]);
    assert_eq!(session.active_note_id(), Some(note.id));
    assert!(repo.stored_note(note.id).is_some());
}

#[tokio::test]
async fn test_add_note_failure_changes_nothing() {
    let (session, repo, ids) = three_tabs().await;
    repo.fail(Operation::Insert, "quota exceeded");

    assert!(session.add_note().await.is_err());

    assert_eq!(session.notes().len(), 3);
    assert_eq!(session.open_note_ids(), ids.to_vec());
    assert_eq!(session.last_error().unwrap().kind, FailureKind::Insert);
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_is_retried_by_flush() {
    let note = aged("t", 1);
    let (session, repo) = loaded(vec![note.clone()]).await;
    repo.fail(Operation::Update, "offline");

    session.edit(note.id, "t", "keep me");
    sleep(ms(600)).await;

    assert!(matches!(session.save_state(note.id), SaveState::Error(_)));
    assert_eq!(session.draft_for(note.id).unwrap().content, "keep me");
    assert!(session.flush(note.id).await.is_err());

    repo.clear_failure(Operation::Update);
    session.flush_all().await.unwrap();

    assert_eq!(repo.stored_note(note.id).unwrap().content, "keep me");
    assert_eq!(session.save_state(note.id), SaveState::Saved);
}

#[tokio::test(start_paused = true)]
async fn test_mobile_surface_waits_longer() {
    let note = aged("t", 1);
    let repo = Arc::new(MemoryNoteRepository::with_notes(vec![note.clone()]));
    let session = Session::new(repo.clone(), &JotterConfig::for_surface(jotter::Surface::Mobile));
    session.load_all().await.unwrap();

    session.edit(note.id, "t", "slow typing");
    sleep(ms(700)).await;
    assert!(repo.writes().is_empty());
    sleep(ms(400)).await;
    assert_eq!(repo.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reload_keeps_unsaved_edits_and_sees_remote_changes() {
    let note = aged("mine", 5);
    let repo = Arc::new(MemoryNoteRepository::with_notes(vec![note.clone()]));
    let session = Session::with_debounce(repo.clone(), DebounceConfig::with_millis(300), 64);
    session.load_all().await.unwrap();
    repo.set_latency(Operation::Update, ms(500));

    session.edit(note.id, "mine", "local edit");
    sleep(ms(350)).await;
    // Write is in flight; another client adds a note meanwhile.
    let other = aged("theirs", 0);
    repo.put(other.clone());
    session.load_all().await.unwrap();

    assert_eq!(session.note(note.id).unwrap().content, "local edit");
    assert!(session.note(other.id).is_some());
    assert_eq!(session.notes()[0].id, other.id);

    sleep(ms(600)).await;
    assert_eq!(repo.stored_note(note.id).unwrap().content, "local edit");
    assert_eq!(session.save_state(note.id), SaveState::Saved);
}
