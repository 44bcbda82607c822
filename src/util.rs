/// UTF-8 safe string truncation by character count.
/// If the string exceeds `max_chars`, truncates and appends "...".
/// When `max_chars` is 3 or less, returns exactly `max_chars` characters
/// without ellipsis (no room for the "..." suffix).
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let end = s
            .char_indices()
            .nth(max_chars.saturating_sub(3))
            .map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// Display form of a patient's language tag: empty for French (the default),
/// " (XX) " otherwise.
pub fn language_tag(language_code: &str) -> String {
    if language_code == "fr" {
        String::new()
    } else {
        format!(" ({}) ", language_code.to_uppercase())
    }
}

/// Extract the key part of a binding like "Alt+S", lowercased.
/// Returns None for bindings without a key after the modifier.
pub fn shortcut_key(binding: &str) -> Option<String> {
    binding.rsplit('+')
        .next()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_str_short_string_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_str_at_exact_limit() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn truncate_str_long_string_truncated() {
        let result = truncate_str("hello world this is long", 10);
        assert!(result.ends_with("..."));
        assert!(result.chars().count() <= 10);
    }

    #[test]
    fn truncate_str_multibyte_utf8_no_panic() {
        let result = truncate_str("numéro écran préféré", 8);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn truncate_str_tiny_limit_no_ellipsis() {
        assert_eq!(truncate_str("hello", 2), "he");
    }

    #[test]
    fn language_tag_french_is_empty() {
        assert_eq!(language_tag("fr"), "");
    }

    #[test]
    fn language_tag_other_uppercased() {
        assert_eq!(language_tag("en"), " (EN) ");
    }

    #[test]
    fn shortcut_key_takes_last_segment() {
        assert_eq!(shortcut_key("Alt+S").as_deref(), Some("s"));
        assert_eq!(shortcut_key("Ctrl+Alt+V").as_deref(), Some("v"));
        assert_eq!(shortcut_key("Alt+").as_deref(), None);
    }
}
