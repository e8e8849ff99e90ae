//! Wildcard pattern matching (`*` and `?`)

/// Match `text` against a pattern where `*` matches any run of characters
/// and `?` matches exactly one
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str, ignore_case: bool) -> bool {
    let fold = |c: char| {
        if ignore_case {
            c.to_lowercase().next().unwrap_or(c)
        } else {
            c
        }
    };
    let pattern: Vec<char> = pattern.chars().map(fold).collect();
    let text: Vec<char> = text.chars().map(fold).collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, tried)) = backtrack {
            p = star + 1;
            t = tried + 1;
            backtrack = Some((star, t));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(wildcard_match("application/json", "application/json", false));
        assert!(!wildcard_match("application/json", "application/xml", false));
        assert!(!wildcard_match("abc", "ab", false));
        assert!(!wildcard_match("ab", "abc", false));
        assert!(wildcard_match("", "", false));
    }

    #[test]
    fn test_ignore_case() {
        assert!(wildcard_match("Application/JSON", "application/json", true));
        assert!(!wildcard_match("Application/JSON", "application/json", false));
    }

    #[test]
    fn test_star_and_question_mark() {
        assert!(wildcard_match("*", "", false));
        assert!(wildcard_match("*", "anything", false));
        assert!(wildcard_match("text=*", "text=hello there", false));
        assert!(wildcard_match("a*b*c", "aXXbYYc", false));
        assert!(!wildcard_match("a*b*c", "aXXbYY", false));
        assert!(wildcard_match("v?", "v1", false));
        assert!(!wildcard_match("v?", "v", false));
        assert!(wildcard_match("*.json", "post_yoda.json", false));
    }

    #[test]
    fn test_captured_text_matches_itself() {
        let body = r#"{"text":"Master Obiwan has lost a planet."}"#;
        assert!(wildcard_match(body, body, true));
    }
}
