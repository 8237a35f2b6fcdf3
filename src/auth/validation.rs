//! Credential format checks used by sign-up and sign-in forms.
//!
//! The identity provider stays the authority; these only catch obvious typos
//! before a round trip.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_CHARS: usize = 8;

pub const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

pub fn is_valid_password(s: &str) -> bool {
    s.chars().count() >= MIN_PASSWORD_CHARS
}

/// Exactly six ASCII digits.
pub fn is_valid_confirmation_code(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}
