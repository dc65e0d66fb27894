//! Shell environment variables (`set`/`unset`, `$VAR` expansion source).

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct EnvStack {
    vars: BTreeMap<String, String>,
}

impl EnvStack {
    pub fn new() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("PS1".to_string(), "$".to_string());
        vars.insert("HOME".to_string(), "/home/guest".to_string());
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn unset(&mut self, key: &str) {
        self.vars.remove(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
