//! Line preprocessing that happens before tokenization proper: brace
//! expansion, alias resolution, and `$VAR`/`${VAR}` environment expansion.
//! Command substitution (`$(...)`) is handled by the executor itself since
//! it requires a recursive call back into execution.

use crate::session::{AliasTable, EnvStack};

/// Expands `{a,b,c}` lists and `{1..3}` / `{a..c}` ranges, non-recursively
/// per brace group (nested braces are not supported).
pub fn expand_braces(word: &str) -> Vec<String> {
    if let Some(start) = word.find('{') {
        if let Some(end) = word[start..].find('}').map(|i| i + start) {
            let prefix = &word[..start];
            let suffix = &word[end + 1..];
            let inner = &word[start + 1..end];
            let items = brace_items(inner);
            if items.len() > 1 || inner.contains(',') || inner.contains("..") {
                let mut results = Vec::new();
                for item in items {
                    for tail in expand_braces(suffix) {
                        results.push(format!("{}{}{}", prefix, item, tail));
                    }
                }
                return results;
            }
        }
    }
    vec![word.to_string()]
}

fn brace_items(inner: &str) -> Vec<String> {
    if let Some((lo, hi)) = inner.split_once("..") {
        if let (Ok(lo), Ok(hi)) = (lo.parse::<i64>(), hi.parse::<i64>()) {
            return if lo <= hi { (lo..=hi).map(|n| n.to_string()).collect() } else { (hi..=lo).rev().map(|n| n.to_string()).collect() };
        }
        if lo.len() == 1 && hi.len() == 1 {
            let (lo, hi) = (lo.chars().next().unwrap(), hi.chars().next().unwrap());
            return if lo <= hi { (lo..=hi).map(|c| c.to_string()).collect() } else { (hi..=lo).rev().map(|c| c.to_string()).collect() };
        }
    }
    inner.split(',').map(str::to_string).collect()
}

/// Resolves the leading word against the alias table, non-recursively.
pub fn expand_alias(line: &str, aliases: &AliasTable) -> String {
    aliases.expand_leading(line)
}

/// Expands `$VAR` and `${VAR}` references outside of single-quoted regions.
/// Double-quoted regions still expand (bash semantics); single-quoted ones
/// are left untouched by the caller before this runs (tokenizer already
/// stripped single-quote markers, so this operates only on already-quoted
/// word content passed in by the caller with quoting context preserved).
pub fn expand_env(word: &str, env: &EnvStack) -> String {
    let mut out = String::new();
    let chars: Vec<char> = word.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() {
            if chars[i + 1] == '{' {
                if let Some(end) = chars[i + 2..].iter().position(|&c| c == '}') {
                    let name: String = chars[i + 2..i + 2 + end].iter().collect();
                    out.push_str(env.get(&name).unwrap_or(""));
                    i += 2 + end + 1;
                    continue;
                }
            } else if chars[i + 1].is_ascii_alphabetic() || chars[i + 1] == '_' {
                let mut j = i + 1;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                let name: String = chars[i + 1..j].iter().collect();
                out.push_str(env.get(&name).unwrap_or(""));
                i = j;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Normalizes a command-substitution result: CRLF -> LF, then folds
/// newlines into spaces the way word-splitting a subshell's output would.
pub fn normalize_substitution_output(raw: &str) -> String {
    raw.replace("\r\n", "\n").trim_end_matches('\n').replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_comma_list_and_numeric_range() {
        assert_eq!(expand_braces("{a,b,c}.txt"), vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(expand_braces("f{1..3}"), vec!["f1", "f2", "f3"]);
    }

    #[test]
    fn expands_env_vars_with_and_without_braces() {
        let mut env = EnvStack::new();
        env.set("NAME", "sam");
        assert_eq!(expand_env("hello $NAME!", &env), "hello sam!");
        assert_eq!(expand_env("hello ${NAME}!", &env), "hello sam!");
    }

    #[test]
    fn normalizes_substitution_newlines() {
        assert_eq!(normalize_substitution_output("a\r\nb\nc\n"), "a b c");
    }
}
