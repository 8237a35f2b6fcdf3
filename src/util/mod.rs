pub const FALLBACK_DISPLAY_NAME: &str = "User";

/// Uppercase the first letter of every whitespace-separated word, lowercase
/// the rest.
pub(crate) fn capitalize_words(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Display name derived from an identity such as `jane.doe@example.com`.
pub(crate) fn display_name_from_identity(identity: &str) -> String {
    let local = identity.split('@').next().unwrap_or("").trim();
    if local.is_empty() {
        return FALLBACK_DISPLAY_NAME.to_string();
    }
    capitalize_words(local)
}

/// Up to two uppercase initials, e.g. `"Ada Lovelace"` -> `"AL"`.
pub(crate) fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}
