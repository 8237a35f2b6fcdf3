use crate::error::{ClientError, ClientResult};
use crate::taxonomy::{self, Category, ColorOption, DEFAULT_CATEGORY_ID, DEFAULT_COLOR_ID};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PREVIEW_MAX_CHARS: usize = 120;
pub const WORDS_PER_MINUTE: usize = 200;
pub const RECENT_WINDOW_HOURS: i64 = 24;

fn default_category_id() -> String {
    DEFAULT_CATEGORY_ID.to_string()
}

/// A note as stored by the backend.
///
/// `note_id`, `created_at` and `updated_at` are server-generated; the client
/// never fabricates them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Opaque identity of the owning caller.
    #[serde(rename = "userId", alias = "ownerId", default)]
    pub owner_id: String,
    pub note_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    /// `None` means the default color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    /// ISO-8601.
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Note {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }

    pub fn category(&self) -> &'static Category {
        taxonomy::category(&self.category_id)
    }

    pub fn color(&self) -> &'static ColorOption {
        taxonomy::color(self.color_id.as_deref())
    }

    /// Content cut to [`PREVIEW_MAX_CHARS`] characters, with `...` appended
    /// when something was cut.
    pub fn preview(&self) -> String {
        match self.content.char_indices().nth(PREVIEW_MAX_CHARS) {
            None => self.content.clone(),
            Some((cut, _)) => format!("{}...", &self.content[..cut]),
        }
    }

    /// Created within the last 24 hours as seen from `now`.
    ///
    /// Unparsable timestamps are never recent.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        self.created_at_utc()
            .map(|created| created > now - Duration::hours(RECENT_WINDOW_HOURS))
            .unwrap_or(false)
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Estimated reading time in whole minutes, never less than one.
    pub fn reading_time_minutes(&self) -> usize {
        (self.word_count() / WORDS_PER_MINUTE).max(1)
    }

    pub fn reading_time_label(&self) -> String {
        format!("{} min read", self.reading_time_minutes())
    }

    /// Human label for `created_at`, computed in `now`'s time zone.
    pub fn relative_date<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let Some(created) = self.created_at_utc() else {
            return self.created_at.clone();
        };
        let created = created.with_timezone(&now.timezone());

        let today = now.date_naive();
        let day = created.date_naive();

        if day == today {
            format!("Today at {}", created.format("%H:%M"))
        } else if today.pred_opt() == Some(day) {
            format!("Yesterday at {}", created.format("%H:%M"))
        } else if day.iso_week() == today.iso_week() {
            created.format("%A").to_string()
        } else {
            created.format("%b %-d, %Y").to_string()
        }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Fields a user edits before a create or update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub color_id: Option<String>,
}

impl NoteInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category_id: default_category_id(),
            color_id: None,
        }
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = category_id.into();
        self
    }

    pub fn color(mut self, color_id: Option<impl Into<String>>) -> Self {
        self.color_id = color_id.map(Into::into);
        self
    }

    /// Editor-side save guard: something, title or body, was typed.
    ///
    /// Independent from [`NoteInput::normalized`], which only requires a
    /// title.
    pub fn has_title_or_content(&self) -> bool {
        !self.title.trim().is_empty() || !self.content.trim().is_empty()
    }

    /// The form sent over the wire: trimmed text, `"default"` color dropped.
    ///
    /// Fails when the title is blank after trimming.
    pub fn normalized(&self) -> ClientResult<NoteInput> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("title must not be empty"));
        }

        Ok(NoteInput {
            title: title.to_string(),
            content: self.content.trim().to_string(),
            category_id: self.category_id.clone(),
            color_id: normalize_color_id(self.color_id.as_deref()),
        })
    }
}

/// `"default"` (and blank) collapse to "no custom color".
pub fn normalize_color_id(color_id: Option<&str>) -> Option<String> {
    match color_id.map(str::trim) {
        None | Some("") | Some(DEFAULT_COLOR_ID) => None,
        Some(id) => Some(id.to_string()),
    }
}
