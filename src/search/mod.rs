//! Command palette filtering.

use crate::entity::Note;

/// Split a raw palette query into lowercase terms.
pub fn parse_query(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_lowercase).collect()
}

/// Filter notes by display title.
///
/// Every term must appear in the title (case-insensitive). Titles that
/// start with the first term rank ahead of the rest; otherwise the input
/// order is kept. An empty query returns every note.
///
/// # Examples
///
/// ```ignore
/// let hits = filter_notes(&notes, "meet 2024");
/// assert!(hits.iter().all(|n| n.display_title().to_lowercase().contains("meet")));
/// ```
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let terms = parse_query(query);
    if terms.is_empty() {
        return notes.iter().collect();
    }

    let mut prefix_hits = Vec::new();
    let mut other_hits = Vec::new();
    for note in notes {
        let title = note.display_title().to_lowercase();
        if !terms.iter().all(|term| title.contains(term.as_str())) {
            continue;
        }
        if title.starts_with(terms[0].as_str()) {
            prefix_hits.push(note);
        } else {
            other_hits.push(note);
        }
    }
    prefix_hits.extend(other_hits);
    prefix_hits
}
