//! Declarative flag schema shared by every builtin command, replacing the
//! original's per-file dynamic argument handling with one parser every
//! `CommandEntry` configures via a `&'static [FlagSpec]`.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub short: Option<char>,
    pub long: Option<&'static str>,
    pub takes_value: bool,
}

#[derive(Debug, Default)]
pub struct ParsedFlags {
    pub values: BTreeMap<&'static str, String>,
    pub present: BTreeMap<&'static str, bool>,
    pub positionals: Vec<String>,
}

impl ParsedFlags {
    pub fn is_set(&self, name: &str) -> bool {
        self.present.get(name).copied().unwrap_or(false)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
pub enum FlagError {
    Unknown(String),
    MissingValue(String),
}

/// Parses `argv` (excluding the command name itself) against `specs`.
/// Supports `-x`, `--long`, `--long=value`, `-xVALUE`, and combined short
/// boolean flags (`-abc`).
pub fn parse(argv: &[String], specs: &[FlagSpec]) -> Result<ParsedFlags, FlagError> {
    let mut out = ParsedFlags::default();
    let mut i = 0;
    let mut past_flags = false;
    while i < argv.len() {
        let arg = &argv[i];
        if !past_flags && arg == "--" {
            past_flags = true;
            i += 1;
            continue;
        }
        if !past_flags && arg.starts_with("--") {
            let body = &arg[2..];
            if let Some((name, value)) = body.split_once('=') {
                let spec = find_long(specs, name).ok_or_else(|| FlagError::Unknown(arg.clone()))?;
                out.present.insert(spec_key(spec), true);
                out.values.insert(spec_key(spec), value.to_string());
            } else {
                let spec = find_long(specs, body).ok_or_else(|| FlagError::Unknown(arg.clone()))?;
                out.present.insert(spec_key(spec), true);
                if spec.takes_value {
                    i += 1;
                    let value = argv.get(i).ok_or_else(|| FlagError::MissingValue(arg.clone()))?;
                    out.values.insert(spec_key(spec), value.clone());
                }
            }
            i += 1;
            continue;
        }
        if !past_flags && arg.starts_with('-') && arg.len() > 1 {
            let chars: Vec<char> = arg[1..].chars().collect();
            let mut j = 0;
            while j < chars.len() {
                let spec = find_short(specs, chars[j]).ok_or_else(|| FlagError::Unknown(arg.clone()))?;
                out.present.insert(spec_key(spec), true);
                if spec.takes_value {
                    let rest: String = chars[j + 1..].iter().collect();
                    if !rest.is_empty() {
                        out.values.insert(spec_key(spec), rest);
                    } else {
                        i += 1;
                        let value = argv.get(i).ok_or_else(|| FlagError::MissingValue(arg.clone()))?;
                        out.values.insert(spec_key(spec), value.clone());
                    }
                    break;
                }
                j += 1;
            }
            i += 1;
            continue;
        }
        out.positionals.push(arg.clone());
        i += 1;
    }
    Ok(out)
}

fn find_long<'a>(specs: &'a [FlagSpec], name: &str) -> Option<&'a FlagSpec> {
    specs.iter().find(|s| s.long == Some(name))
}

fn find_short(specs: &[FlagSpec], ch: char) -> Option<&FlagSpec> {
    specs.iter().find(|s| s.short == Some(ch))
}

fn spec_key(spec: &FlagSpec) -> &'static str {
    spec.long.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[FlagSpec] = &[
        FlagSpec { short: Some('l'), long: Some("long"), takes_value: false },
        FlagSpec { short: Some('a'), long: Some("all"), takes_value: false },
        FlagSpec { short: Some('n'), long: Some("lines"), takes_value: true },
    ];

    #[test]
    fn parses_combined_short_flags_and_valued_long_flag() {
        let argv: Vec<String> = vec!["-la".into(), "--lines=5".into(), "file.txt".into()];
        let parsed = parse(&argv, SPECS).unwrap();
        assert!(parsed.is_set("long"));
        assert!(parsed.is_set("all"));
        assert_eq!(parsed.value("lines"), Some("5"));
        assert_eq!(parsed.positionals, vec!["file.txt".to_string()]);
    }

    #[test]
    fn double_dash_stops_flag_parsing() {
        let argv: Vec<String> = vec!["--".into(), "-l".into()];
        let parsed = parse(&argv, SPECS).unwrap();
        assert!(!parsed.is_set("long"));
        assert_eq!(parsed.positionals, vec!["-l".to_string()]);
    }
}
