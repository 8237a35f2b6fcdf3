//! Derived, read-only views over a note collection.

use crate::models::Note;
use crate::taxonomy::RECENT_CATEGORY_ID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// What a list screen is currently showing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteQuery {
    /// `None` shows every category; `"recent"` selects by recency.
    pub category_id: Option<String>,
    /// Empty means no text search. Whitespace is matched literally.
    pub search_text: String,
}

impl NoteQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.category_id.is_none() && self.search_text.is_empty()
    }

    pub fn matches(&self, note: &Note, now: DateTime<Utc>) -> bool {
        let in_category = self
            .category_id
            .as_deref()
            .map(|id| in_category(note, id, now))
            .unwrap_or(true);

        in_category && (self.search_text.is_empty() || matches_text(note, &self.search_text))
    }
}

fn in_category(note: &Note, category_id: &str, now: DateTime<Utc>) -> bool {
    if category_id == RECENT_CATEGORY_ID {
        note.is_recent(now)
    } else {
        note.category_id == category_id
    }
}

fn matches_text(note: &Note, text: &str) -> bool {
    let needle = text.to_lowercase();
    note.title.to_lowercase().contains(&needle) || note.content.to_lowercase().contains(&needle)
}

/// Newest `createdAt` first. Timestamps that do not parse sort after all
/// valid ones, ordered by their raw text.
pub fn compare_newest_first(a: &Note, b: &Note) -> Ordering {
    match (a.created_at_utc(), b.created_at_utc()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    }
}

pub fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(compare_newest_first);
}

/// The notes a screen should render for `query`, newest first.
pub fn filter_notes(notes: &[Note], query: &NoteQuery, now: DateTime<Utc>) -> Vec<Note> {
    let mut out: Vec<Note> = if query.is_unfiltered() {
        notes.to_vec()
    } else {
        notes
            .iter()
            .filter(|n| query.matches(n, now))
            .cloned()
            .collect()
    };
    sort_newest_first(&mut out);
    out
}

/// Badge count for a navigation entry; `"recent"` counts recent notes.
pub fn count_for_category(notes: &[Note], category_id: &str, now: DateTime<Utc>) -> usize {
    notes
        .iter()
        .filter(|n| in_category(n, category_id, now))
        .count()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivitySummary {
    pub total: usize,
    pub recent: usize,
    /// Distinct `categoryId`s in use.
    pub categories_used: usize,
}

impl ActivitySummary {
    pub fn of(notes: &[Note], now: DateTime<Utc>) -> Self {
        let categories: HashSet<&str> = notes.iter().map(|n| n.category_id.as_str()).collect();
        Self {
            total: notes.len(),
            recent: notes.iter().filter(|n| n.is_recent(now)).count(),
            categories_used: categories.len(),
        }
    }
}
