//! Text shaping shared by the merge layer. Descriptive columns have hard
//! length caps, and hosts parsed out of configuration files are not always
//! hosts.

use std::collections::HashSet;

/// Longest address the graph accepts as a host; anything beyond this is a
/// config blob that leaked into a host slot.
pub const MAX_HOST_CHARS: usize = 100;

/// Clamps a string to at most `max_chars` characters, multibyte-safe.
pub fn clamp(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_owned(),
        None => value.to_owned(),
    }
}

/// Comma-joins values keeping only the first occurrence of each, then clamps
/// the joined result.
pub fn distinct_join<I, S>(values: I, max_chars: usize) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut parts: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.to_owned()) {
            parts.push(value.to_owned());
        }
    }
    clamp(&parts.join(","), max_chars)
}

/// Rejects hosts that cannot be real addresses. The rejection is logged so
/// an operator can find the offending configuration.
pub fn is_garbage_host(host: &str) -> bool {
    if host.chars().count() > MAX_HOST_CHARS {
        tracing::warn!(length = host.chars().count(), "Detected host's address is too large.");
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_is_multibyte_safe() {
        assert_eq!(clamp("héllo", 3), "hél");
        assert_eq!(clamp("short", 100), "short");
    }

    #[test]
    fn distinct_join_keeps_first_occurrence_order() {
        let joined = distinct_join(["b", "a", "b", "", " a "], 512);
        assert_eq!(joined, "b,a");
    }

    #[test]
    fn join_result_is_clamped() {
        let joined = distinct_join(["aaaa", "bbbb"], 6);
        assert_eq!(joined, "aaaa,b");
    }

    #[test]
    fn oversized_host_is_rejected() {
        assert!(!is_garbage_host("db01.internal.example.com"));
        assert!(is_garbage_host(&"x".repeat(101)));
    }
}
