//! Command history: a bounded ring buffer with adjacent-duplicate suppression.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(50)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if self.entries.back().map(|last| last == line).unwrap_or(false) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_adjacent_duplicates_and_caps_length() {
        let mut h = History::with_capacity(2);
        h.push("ls");
        h.push("ls");
        h.push("pwd");
        h.push("whoami");
        let entries: Vec<&str> = h.entries().collect();
        assert_eq!(entries, vec!["pwd", "whoami"]);
    }
}
