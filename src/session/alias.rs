//! Command aliases. Expansion is a single, non-recursive substitution of the
//! first token: an alias whose body references another alias is left as
//! literal text, so cycles can't form.

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn with_defaults() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert("ll".to_string(), "ls -la".to_string());
        aliases.insert("la".to_string(), "ls -a".to_string());
        aliases.insert("..".to_string(), "cd ..".to_string());
        Self { aliases }
    }

    pub fn set(&mut self, name: &str, expansion: &str) {
        self.aliases.insert(name.to_string(), expansion.to_string());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.aliases.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expands only the leading word of `line`, once.
    pub fn expand_leading(&self, line: &str) -> String {
        let mut parts = line.splitn(2, ' ');
        let first = parts.next().unwrap_or("");
        let rest = parts.next();
        match self.get(first) {
            Some(expansion) => match rest {
                Some(rest) => format!("{} {}", expansion, rest),
                None => expansion.to_string(),
            },
            None => line.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_leading_word_only_once() {
        let mut table = AliasTable::default();
        table.set("ll", "ls -la");
        table.set("ls", "ll --color");
        assert_eq!(table.expand_leading("ll /tmp"), "ls -la /tmp");
    }
}
