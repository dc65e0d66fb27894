//! Shell wildcard matching (`*`, `?`, `[...]`) against a directory listing.
//! A leading `.` in a name only matches a pattern that itself starts with
//! `.`, mirroring the usual shell hidden-file convention.

pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

pub fn expand(pattern: &str, entries: &[String]) -> Vec<String> {
    let mut matches: Vec<String> = entries.iter().filter(|name| matches(pattern, name)).cloned().collect();
    matches.sort();
    matches
}

pub fn matches(pattern: &str, name: &str) -> bool {
    if name.starts_with('.') && !pattern.starts_with('.') {
        return false;
    }
    match_rec(pattern.as_bytes(), name.as_bytes())
}

fn match_rec(pattern: &[u8], name: &[u8]) -> bool {
    match (pattern.first(), name.first()) {
        (None, None) => true,
        (Some(b'*'), _) => match_rec(&pattern[1..], name) || (!name.is_empty() && match_rec(pattern, &name[1..])),
        (Some(b'?'), Some(_)) => match_rec(&pattern[1..], &name[1..]),
        (Some(b'['), _) => match_class(pattern, name),
        (Some(pc), Some(nc)) if pc == nc => match_rec(&pattern[1..], &name[1..]),
        _ => false,
    }
}

fn match_class(pattern: &[u8], name: &[u8]) -> bool {
    let Some(close) = pattern.iter().position(|&b| b == b']') else { return false };
    if name.is_empty() {
        return false;
    }
    let (negate, class_start) = if pattern.get(1) == Some(&b'!') { (true, 2) } else { (false, 1) };
    let class = &pattern[class_start..close];
    let hit = class.contains(&name[0]);
    if hit != negate {
        match_rec(&pattern[close + 1..], &name[1..])
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        assert!(matches("*.txt", "a.txt"));
        assert!(!matches("*.txt", "a.rs"));
        assert!(matches("f?.txt", "f1.txt"));
    }

    #[test]
    fn hidden_files_need_explicit_dot_prefix() {
        assert!(!matches("*", ".hidden"));
        assert!(matches(".*", ".hidden"));
    }

    #[test]
    fn character_class() {
        assert!(matches("[abc].txt", "a.txt"));
        assert!(!matches("[!abc].txt", "a.txt"));
    }
}
