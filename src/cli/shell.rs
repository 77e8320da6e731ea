//! Interactive tabbed session.
//!
//! Edits typed here go through the debounced save path exactly as an editor
//! would; anything still buffered is flushed on `quit`, end of input or
//! Ctrl-C.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use super::handlers::resolve_note_id;
use crate::error::Result;
use crate::events::WorkspaceEvent;
use crate::repository::NoteRepository;
use crate::session::Session;

const HELP: &str = "\
Commands:
  ls                 list all notes
  tabs               list open tabs
  new                create a note and focus it
  open <id>          open a note in a tab and focus it
  close [id]         close a tab (default: focused)
  focus <id|none>    focus an open tab
  title <text>       retitle the focused note
  write <text>       replace the focused note's content
  append <text>      add a line to the focused note
  show               print the focused note
  rm [id]            delete a note (default: focused)
  find <query>       search titles
  save               save everything now
  reload             reload notes from storage
  help               show this help
  quit               save and exit";

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub async fn run_shell<R: NoteRepository>(session: &Session<R>) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let printer = spawn_failure_printer(session.subscribe());

    if interactive {
        println!(
            "{} notes loaded. Type 'help' for commands.",
            session.notes().len()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("jotter> ");
            std::io::stdout().flush()?;
        }

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match execute(session, line.trim()).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    let result = session.flush_all().await;
    printer.abort();
    result
}

/// Print repository failures as they happen.
fn spawn_failure_printer(mut rx: broadcast::Receiver<WorkspaceEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(WorkspaceEvent::Failure(failure)) => eprintln!("! {}", failure),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn target_or_active<R: NoteRepository>(session: &Session<R>, arg: &str) -> Result<Option<Uuid>> {
    if arg.is_empty() {
        return Ok(session.active_note_id());
    }
    resolve_note_id(&session.notes(), arg).map(Some)
}

async fn execute<R: NoteRepository>(session: &Session<R>, line: &str) -> Result<Flow> {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "ls" => {
            let notes = session.notes();
            if notes.is_empty() {
                println!("No notes found.");
            }
            let open = session.open_note_ids();
            let active = session.active_note_id();
            for n in &notes {
                let marker = if Some(n.id) == active {
                    '>'
                } else if open.contains(&n.id) {
                    '*'
                } else {
                    ' '
                };
                println!("{} ({}) {}", marker, n.short_id(), n.display_title());
            }
        }
        "tabs" => {
            let active = session.active_note_id();
            let tabs = session.open_notes();
            if tabs.is_empty() {
                println!("No open tabs.");
            }
            for (i, n) in tabs.iter().enumerate() {
                let marker = if Some(n.id) == active { '>' } else { ' ' };
                println!(
                    "{} {}. ({}) {}  [{}]",
                    marker,
                    i + 1,
                    n.short_id(),
                    n.display_title(),
                    session.save_state(n.id)
                );
            }
        }
        "new" => {
            let note = session.add_note().await?;
            println!("Created note ({}) - {}", note.short_id(), note.display_title());
        }
        "open" => {
            let id = resolve_note_id(&session.notes(), arg)?;
            if let Some(draft) = session.select_note(id) {
                println!("Opened {}", draft_title(&draft.title));
            }
        }
        "close" => match target_or_active(session, arg)? {
            Some(id) if session.close_note(id) => println!("Closed tab."),
            _ => println!("No such tab."),
        },
        "focus" => {
            let target = if arg == "none" {
                None
            } else {
                Some(resolve_note_id(&session.notes(), arg)?)
            };
            if !session.set_active_note_id(target) {
                println!("That note isn't open. Use 'open' first.");
            }
        }
        "title" | "write" | "append" => {
            let Some(draft) = session.active_draft() else {
                println!("No note is focused. Use 'open <id>' or 'new'.");
                return Ok(Flow::Continue);
            };
            let (title, content) = match command {
                "title" => (arg.to_string(), draft.content),
                "write" => (draft.title, arg.to_string()),
                _ if draft.content.is_empty() => (draft.title, arg.to_string()),
                _ => (draft.title, format!("{}\n{}", draft.content, arg)),
            };
            session.edit(draft.note_id, title, content);
        }
        "show" => match session.active_draft() {
            Some(draft) => {
                println!(
                    "{}  [{}]",
                    draft_title(&draft.title),
                    session.save_state(draft.note_id)
                );
                println!("{}", draft.content);
            }
            None => println!("No note is focused."),
        },
        "rm" => match target_or_active(session, arg)? {
            Some(id) => {
                session.delete_note(id).await?;
                println!("Deleted note.");
            }
            None => println!("No note is focused."),
        },
        "find" => {
            for n in session.search(arg) {
                println!("  ({}) {}", n.short_id(), n.display_title());
            }
        }
        "save" => {
            session.flush_all().await?;
            println!("Saved.");
        }
        "reload" => {
            let count = session.load_all().await?;
            println!("Loaded {} notes.", count);
        }
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => println!("Unknown command '{}'. Type 'help' for commands.", other),
    }

    Ok(Flow::Continue)
}

fn draft_title(title: &str) -> &str {
    if title.is_empty() {
        crate::entity::UNTITLED
    } else {
        title
    }
}
