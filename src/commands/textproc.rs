//! Text processing commands: `cat head tail sort uniq wc grep echo` plus the
//! field/stream editors `cut tr nl comm diff csplit printf awk sed`.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::effect::{CommandOutcome, ExecResult};
use crate::error::{CommandError, ErrorKind};
use crate::executor::flags::FlagSpec;

use super::context::{parse_flags, CommandCtx};

fn bad(message: impl Into<String>) -> CommandError {
    CommandError::new(ErrorKind::InvalidArgument, message.into())
}

fn require_two<'a>(positionals: &'a [String], usage: &str) -> Result<(&'a str, &'a str), CommandError> {
    match (positionals.first(), positionals.get(1)) {
        (Some(a), Some(b)) => Ok((a.as_str(), b.as_str())),
        _ => Err(bad(usage.to_string())),
    }
}

/// Reads either the named file arguments or, absent any, stdin --- the
/// convention every text-processing builtin shares.
fn input_lines(ctx: &mut CommandCtx, files: &[String]) -> Result<String, CommandError> {
    if files.is_empty() {
        return Ok(ctx.stdin.clone());
    }
    let mut combined = String::new();
    for file in files {
        let path = ctx.resolve_path(file);
        let node = ctx.vfs.get_node(&path, true)?;
        combined.push_str(node.content().unwrap_or_default());
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
    }
    Ok(combined)
}

pub fn cat(ctx: &mut CommandCtx) -> ExecResult {
    let files = ctx.argv[1..].to_vec();
    let text = input_lines(ctx, &files)?;
    Ok(CommandOutcome::ok(text.trim_end_matches('\n').to_string()))
}

pub fn echo(ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::ok(ctx.argv[1..].join(" ")))
}

pub const HEAD_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('n'), long: Some("lines"), takes_value: true }];

pub fn head(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], HEAD_FLAGS)?;
    let n: usize = ctx.flags.value("lines").and_then(|v| v.parse().ok()).unwrap_or(10);
    let files = ctx.flags.positionals.clone();
    let text = input_lines(ctx, &files)?;
    let out: Vec<&str> = text.lines().take(n).collect();
    Ok(CommandOutcome::ok(out.join("\n")))
}

pub fn tail(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], HEAD_FLAGS)?;
    let n: usize = ctx.flags.value("lines").and_then(|v| v.parse().ok()).unwrap_or(10);
    let files = ctx.flags.positionals.clone();
    let text = input_lines(ctx, &files)?;
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(CommandOutcome::ok(lines[start..].join("\n")))
}

pub const SORT_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('r'), long: Some("reverse"), takes_value: false }];

pub fn sort(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], SORT_FLAGS)?;
    let files = ctx.flags.positionals.clone();
    let text = input_lines(ctx, &files)?;
    let mut lines: Vec<&str> = text.lines().collect();
    lines.sort_unstable();
    if ctx.flags.is_set("reverse") {
        lines.reverse();
    }
    Ok(CommandOutcome::ok(lines.join("\n")))
}

pub const UNIQ_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('c'), long: Some("count"), takes_value: false }];

pub fn uniq(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], UNIQ_FLAGS)?;
    let files = ctx.flags.positionals.clone();
    let text = input_lines(ctx, &files)?;
    let count = ctx.flags.is_set("count");
    let mut out = Vec::new();
    let mut last: Option<&str> = None;
    let mut run = 0usize;
    for line in text.lines() {
        if Some(line) == last {
            run += 1;
        } else {
            if let Some(prev) = last {
                out.push(if count { format!("{:>7} {}", run, prev) } else { prev.to_string() });
            }
            last = Some(line);
            run = 1;
        }
    }
    if let Some(prev) = last {
        out.push(if count { format!("{:>7} {}", run, prev) } else { prev.to_string() });
    }
    Ok(CommandOutcome::ok(out.join("\n")))
}

pub const WC_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('l'), long: Some("lines"), takes_value: false }];

pub fn wc(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], WC_FLAGS)?;
    let files = ctx.flags.positionals.clone();
    let text = input_lines(ctx, &files)?;
    let lines = text.lines().count();
    if ctx.flags.is_set("lines") {
        return Ok(CommandOutcome::ok(lines.to_string()));
    }
    let words = text.split_whitespace().count();
    let bytes = text.len();
    Ok(CommandOutcome::ok(format!("{} {} {}", lines, words, bytes)))
}

pub const GREP_FLAGS: &[FlagSpec] = &[
    FlagSpec { short: Some('i'), long: Some("ignore-case"), takes_value: false },
    FlagSpec { short: Some('v'), long: Some("invert-match"), takes_value: false },
    FlagSpec { short: Some('c'), long: Some("count"), takes_value: false },
];

pub fn grep(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], GREP_FLAGS)?;
    let mut positionals = ctx.flags.positionals.clone().into_iter();
    let pattern = positionals.next().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "grep: missing pattern"))?;
    let files: Vec<String> = positionals.collect();
    let text = input_lines(ctx, &files)?;
    let regex_src = if ctx.flags.is_set("ignore-case") { format!("(?i){}", pattern) } else { pattern };
    let re = Regex::new(&regex_src).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "grep: invalid pattern"))?;
    let invert = ctx.flags.is_set("invert-match");
    let matches: Vec<&str> = text.lines().filter(|line| re.is_match(line) != invert).collect();
    if ctx.flags.is_set("count") {
        return Ok(CommandOutcome::ok(matches.len().to_string()));
    }
    Ok(CommandOutcome::ok(matches.join("\n")))
}

pub const CUT_FLAGS: &[FlagSpec] = &[
    FlagSpec { short: Some('c'), long: Some("characters"), takes_value: true },
    FlagSpec { short: Some('f'), long: Some("fields"), takes_value: true },
    FlagSpec { short: Some('d'), long: Some("delimiter"), takes_value: true },
];

/// Expands a comma-separated 1-based range spec (`"1,3-5"`) into sorted,
/// zero-based, deduplicated indices.
fn parse_ranges(spec: &str) -> Result<Vec<usize>, CommandError> {
    let mut out = Vec::new();
    for part in spec.split(',') {
        if let Some((lo, hi)) = part.split_once('-') {
            let lo: usize = lo.trim().parse().map_err(|_| bad("cut: invalid range"))?;
            let hi: usize = hi.trim().parse().map_err(|_| bad("cut: invalid range"))?;
            if lo == 0 || hi < lo {
                return Err(bad("cut: invalid range"));
            }
            out.extend((lo - 1)..hi);
        } else {
            let n: usize = part.trim().parse().map_err(|_| bad("cut: invalid range"))?;
            if n == 0 {
                return Err(bad("cut: fields are 1-indexed"));
            }
            out.push(n - 1);
        }
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

/// `cut -c LIST | -f LIST [-d DELIM]`: exactly one of `-c`/`-f` selects
/// character columns or delimiter-separated fields, 1-indexed, ranges allowed.
pub fn cut(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], CUT_FLAGS)?;
    let chars_spec = ctx.flags.value("characters").map(str::to_string);
    let fields_spec = ctx.flags.value("fields").map(str::to_string);
    let delim = ctx.flags.value("delimiter").map(str::to_string).unwrap_or_else(|| "\t".to_string());
    let files = ctx.flags.positionals.clone();
    let text = input_lines(ctx, &files)?;

    match (chars_spec, fields_spec) {
        (Some(spec), None) => {
            let indices = parse_ranges(&spec)?;
            let out: Vec<String> = text
                .lines()
                .map(|line| {
                    let chars: Vec<char> = line.chars().collect();
                    indices.iter().filter_map(|&i| chars.get(i)).collect()
                })
                .collect();
            Ok(CommandOutcome::ok(out.join("\n")))
        }
        (None, Some(spec)) => {
            let indices = parse_ranges(&spec)?;
            let out: Vec<String> = text
                .lines()
                .map(|line| {
                    let parts: Vec<&str> = line.split(delim.as_str()).collect();
                    indices.iter().filter_map(|&i| parts.get(i).copied()).collect::<Vec<_>>().join(&delim)
                })
                .collect();
            Ok(CommandOutcome::ok(out.join("\n")))
        }
        (Some(_), Some(_)) => Err(bad("cut: only one of -c or -f may be used")),
        (None, None) => Err(bad("cut: you must specify a list of characters (-c) or fields (-f)")),
    }
}

pub const TR_FLAGS: &[FlagSpec] = &[
    FlagSpec { short: Some('c'), long: Some("complement"), takes_value: false },
    FlagSpec { short: Some('d'), long: Some("delete"), takes_value: false },
    FlagSpec { short: Some('s'), long: Some("squeeze-repeats"), takes_value: false },
];

fn posix_class(name: &str) -> Vec<char> {
    match name {
        "alpha" => ('a'..='z').chain('A'..='Z').collect(),
        "digit" => ('0'..='9').collect(),
        "upper" => ('A'..='Z').collect(),
        "lower" => ('a'..='z').collect(),
        "alnum" => ('a'..='z').chain('A'..='Z').chain('0'..='9').collect(),
        "space" => vec![' ', '\t', '\n', '\r', '\x0b', '\x0c'],
        "punct" => "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".chars().collect(),
        _ => Vec::new(),
    }
}

/// Expands `tr` set syntax: `a-z` ranges and `[:class:]` POSIX classes.
fn expand_set(spec: &str) -> Vec<char> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '[' && chars.get(i + 1) == Some(&':') {
            if let Some(end_rel) = chars[i + 2..].iter().position(|&c| c == ':') {
                let end = i + 2 + end_rel;
                if chars.get(end + 1) == Some(&']') {
                    let class: String = chars[i + 2..end].iter().collect();
                    out.extend(posix_class(&class));
                    i = end + 2;
                    continue;
                }
            }
        }
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let start = chars[i] as u32;
            let end = chars[i + 2] as u32;
            if end >= start {
                for c in start..=end {
                    if let Some(ch) = char::from_u32(c) {
                        out.push(ch);
                    }
                }
                i += 3;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn squeeze_repeats(content: &str, set: &HashSet<char>) -> String {
    let mut out = String::new();
    let mut last: Option<char> = None;
    for c in content.chars() {
        if Some(c) == last && set.contains(&c) {
            continue;
        }
        out.push(c);
        last = Some(c);
    }
    out
}

/// `tr [-cds] SET1 [SET2]`: translates, squeezes, or deletes characters from
/// stdin --- never reads named files, matching the coreutils original.
pub fn tr(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], TR_FLAGS)?;
    let positionals = ctx.flags.positionals.clone();
    let set1_spec = positionals.first().cloned().ok_or_else(|| bad("tr: missing SET1"))?;
    let set2_spec = positionals.get(1).cloned();
    let complement = ctx.flags.is_set("complement");
    let delete = ctx.flags.is_set("delete");
    let squeeze = ctx.flags.is_set("squeeze-repeats");
    let content = ctx.stdin.clone();

    let mut set1 = expand_set(&set1_spec);
    if complement {
        let present: HashSet<char> = set1.into_iter().collect();
        set1 = content.chars().collect::<HashSet<char>>().into_iter().filter(|c| !present.contains(c)).collect();
    }

    let result = if delete {
        let set1_chars: HashSet<char> = set1.iter().copied().collect();
        let deleted: String = content.chars().filter(|c| !set1_chars.contains(c)).collect();
        if squeeze {
            let squeeze_set: HashSet<char> = set2_spec.map(|s| expand_set(&s)).unwrap_or_default().into_iter().collect();
            squeeze_repeats(&deleted, &squeeze_set)
        } else {
            deleted
        }
    } else if let Some(set2_spec) = set2_spec {
        let mut set2 = expand_set(&set2_spec);
        if set2.is_empty() {
            return Err(bad("tr: SET2 must not be empty"));
        }
        if let Some(&last) = set2.last() {
            while set2.len() < set1.len() {
                set2.push(last);
            }
        }
        let map: HashMap<char, char> = set1.iter().copied().zip(set2.iter().copied()).collect();
        let translated: String = content.chars().map(|c| *map.get(&c).unwrap_or(&c)).collect();
        if squeeze {
            let squeeze_set: HashSet<char> = set2.into_iter().collect();
            squeeze_repeats(&translated, &squeeze_set)
        } else {
            translated
        }
    } else if squeeze {
        let squeeze_set: HashSet<char> = set1.into_iter().collect();
        squeeze_repeats(&content, &squeeze_set)
    } else {
        return Err(bad("tr: missing SET2"));
    };
    Ok(CommandOutcome::ok(result))
}

/// `nl [file...]`: numbers non-blank lines, right-justified in a 6-wide
/// field followed by a tab, blank lines pass through unnumbered.
pub fn nl(ctx: &mut CommandCtx) -> ExecResult {
    let files = ctx.argv[1..].to_vec();
    let text = input_lines(ctx, &files)?;
    let mut out = Vec::new();
    let mut n = 0u32;
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push(String::new());
        } else {
            n += 1;
            out.push(format!("{:>6}\t{}", n, line));
        }
    }
    Ok(CommandOutcome::ok(out.join("\n")))
}

pub const COMM_FLAGS: &[FlagSpec] = &[
    FlagSpec { short: Some('1'), long: Some("suppress-col1"), takes_value: false },
    FlagSpec { short: Some('2'), long: Some("suppress-col2"), takes_value: false },
    FlagSpec { short: Some('3'), long: Some("suppress-col3"), takes_value: false },
];

/// `comm [-123] FILE1 FILE2`: three-column merge of two sorted files ---
/// lines only in FILE1, only in FILE2, and common to both.
pub fn comm(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], COMM_FLAGS)?;
    let (file1, file2) = require_two(&ctx.flags.positionals, "comm: missing operand")?;
    let (path1, path2) = (ctx.resolve_path(file1), ctx.resolve_path(file2));
    let lines1: Vec<String> = ctx.vfs.get_node(&path1, true)?.content().unwrap_or_default().lines().map(str::to_string).collect();
    let lines2: Vec<String> = ctx.vfs.get_node(&path2, true)?.content().unwrap_or_default().lines().map(str::to_string).collect();
    let suppress1 = ctx.flags.is_set("suppress-col1");
    let suppress2 = ctx.flags.is_set("suppress-col2");
    let suppress3 = ctx.flags.is_set("suppress-col3");

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < lines1.len() && j < lines2.len() {
        match lines1[i].cmp(&lines2[j]) {
            std::cmp::Ordering::Less => {
                if !suppress1 {
                    out.push(lines1[i].clone());
                }
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                if !suppress2 {
                    out.push(format!("{}{}", if suppress1 { "" } else { "\t" }, lines2[j]));
                }
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                if !suppress3 {
                    let prefix = match (suppress1, suppress2) {
                        (true, true) => "",
                        (false, false) => "\t\t",
                        _ => "\t",
                    };
                    out.push(format!("{}{}", prefix, lines1[i]));
                }
                i += 1;
                j += 1;
            }
        }
    }
    while i < lines1.len() {
        if !suppress1 {
            out.push(lines1[i].clone());
        }
        i += 1;
    }
    while j < lines2.len() {
        if !suppress2 {
            out.push(format!("{}{}", if suppress1 { "" } else { "\t" }, lines2[j]));
        }
        j += 1;
    }
    Ok(CommandOutcome::ok(out.join("\n")))
}

/// Longest-common-subsequence line diff, enough to drive a unified-style
/// `diff` without pulling in a dedicated diffing crate.
fn lcs_diff(a: &[&str], b: &[&str]) -> Vec<String> {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if a[i] == b[j] { dp[i + 1][j + 1] + 1 } else { dp[i + 1][j].max(dp[i][j + 1]) };
        }
    }
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            out.push(format!("< {}", a[i]));
            i += 1;
        } else {
            out.push(format!("> {}", b[j]));
            j += 1;
        }
    }
    while i < n {
        out.push(format!("< {}", a[i]));
        i += 1;
    }
    while j < m {
        out.push(format!("> {}", b[j]));
        j += 1;
    }
    out
}

/// `diff FILE1 FILE2`: line-level `<`/`>` diff against an LCS alignment.
pub fn diff(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv[1..].to_vec();
    let (file1, file2) = require_two(&argv, "diff: missing operand")?;
    let (path1, path2) = (ctx.resolve_path(file1), ctx.resolve_path(file2));
    let content1 = ctx.vfs.get_node(&path1, true)?.content().unwrap_or_default().to_string();
    let content2 = ctx.vfs.get_node(&path2, true)?.content().unwrap_or_default().to_string();
    let lines1: Vec<&str> = content1.lines().collect();
    let lines2: Vec<&str> = content2.lines().collect();
    Ok(CommandOutcome::ok(lcs_diff(&lines1, &lines2).join("\n")))
}

pub const CSPLIT_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('f'), long: Some("prefix"), takes_value: true }];

/// `csplit [-f PREFIX] FILE /regex/...`: splits FILE at each line matching a
/// `/regex/` pattern, writing `PREFIXNN` chunks (default prefix `xx`).
pub fn csplit(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], CSPLIT_FLAGS)?;
    let prefix = ctx.flags.value("prefix").map(str::to_string).unwrap_or_else(|| "xx".to_string());
    let mut positionals = ctx.flags.positionals.clone().into_iter();
    let file = positionals.next().ok_or_else(|| bad("csplit: missing file operand"))?;
    let patterns: Vec<Regex> = positionals
        .map(|p| {
            let inner = p.trim_start_matches('/').trim_end_matches('/');
            Regex::new(inner).map_err(|_| bad("csplit: invalid pattern"))
        })
        .collect::<Result<_, _>>()?;
    if patterns.is_empty() {
        return Err(bad("csplit: missing split pattern"));
    }

    let path = ctx.resolve_path(&file);
    let content = ctx.vfs.get_node(&path, true)?.content().unwrap_or_default().to_string();
    let lines: Vec<&str> = content.lines().collect();

    let mut boundaries = vec![0usize];
    for re in &patterns {
        if let Some(pos) = lines.iter().position(|line| re.is_match(line)) {
            if pos > *boundaries.last().unwrap() {
                boundaries.push(pos);
            }
        }
    }
    boundaries.push(lines.len());
    boundaries.dedup();

    let (name, groups) = ctx.actor_parts();
    let actor = super::context::actor_ref(&name, &groups);
    let mut written = Vec::new();
    for (idx, pair) in boundaries.windows(2).enumerate() {
        let (start, end) = (pair[0], pair[1]);
        let chunk = lines[start..end].join("\n");
        let out_name = format!("{}{:02}", prefix, idx);
        let out_path = ctx.resolve_path(&out_name);
        ctx.vfs.write_file(&out_path, &chunk, &actor)?;
        written.push(format!("{}", chunk.len()));
    }
    Ok(CommandOutcome::ok(written.join("\n")))
}

/// `printf FORMAT [args...]`: expands `%s %d %%` and `\n \t` escapes against
/// positional args, cycling the format if more args remain than specifiers.
pub fn printf(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv[1..].to_vec();
    let format = argv.first().cloned().ok_or_else(|| bad("printf: missing format string"))?;
    let args = &argv[1..];

    let render = |fmt: &str, args: &[String]| -> Result<(String, usize), CommandError> {
        let mut out = String::new();
        let mut arg_i = 0;
        let chars: Vec<char> = fmt.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '\\' if i + 1 < chars.len() => {
                    match chars[i + 1] {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        '\\' => out.push('\\'),
                        other => out.push(other),
                    }
                    i += 2;
                }
                '%' if i + 1 < chars.len() => match chars[i + 1] {
                    '%' => {
                        out.push('%');
                        i += 2;
                    }
                    's' => {
                        out.push_str(args.get(arg_i).map(String::as_str).unwrap_or(""));
                        arg_i += 1;
                        i += 2;
                    }
                    'd' => {
                        let value = args.get(arg_i).and_then(|a| a.parse::<i64>().ok()).unwrap_or(0);
                        out.push_str(&value.to_string());
                        arg_i += 1;
                        i += 2;
                    }
                    other => {
                        out.push('%');
                        out.push(other);
                        i += 2;
                    }
                },
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        Ok((out, arg_i))
    };

    if args.is_empty() {
        let (out, _) = render(&format, args)?;
        return Ok(CommandOutcome::ok(out));
    }
    let mut result = String::new();
    let mut offset = 0;
    loop {
        let (chunk, consumed) = render(&format, &args[offset..])?;
        result.push_str(&chunk);
        offset += consumed.max(1);
        if offset >= args.len() || consumed == 0 {
            break;
        }
    }
    Ok(CommandOutcome::ok(result))
}

pub const AWK_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('F'), long: Some("field-separator"), takes_value: true }];

fn substitute_fields(line: &str, token: &str, nr: usize, delim: Option<&str>) -> String {
    if token == "NR" {
        return nr.to_string();
    }
    if token == "$0" {
        return line.to_string();
    }
    if let Some(rest) = token.strip_prefix('$') {
        if let Ok(n) = rest.parse::<usize>() {
            if n == 0 {
                return line.to_string();
            }
            let parts: Vec<&str> = match delim {
                Some(d) => line.split(d).collect(),
                None => line.split_whitespace().collect(),
            };
            return parts.get(n - 1).copied().unwrap_or("").to_string();
        }
    }
    token.to_string()
}

fn render_action(action: &str, line: &str, nr: usize, delim: Option<&str>) -> String {
    let action = action.trim();
    let action = action.strip_prefix("print").map(str::trim).unwrap_or(action);
    if action.is_empty() {
        return substitute_fields(line, "$0", nr, delim);
    }
    action
        .split(',')
        .map(str::trim)
        .map(|field| {
            if field.starts_with('"') && field.ends_with('"') && field.len() >= 2 {
                field[1..field.len() - 1].to_string()
            } else {
                substitute_fields(line, field, nr, delim)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_main_rule(remainder: &str) -> Result<(Option<Regex>, String), CommandError> {
    if remainder.is_empty() {
        return Ok((None, "print $0".to_string()));
    }
    if let Some(rest) = remainder.strip_prefix('/') {
        let end = rest.find('/').ok_or_else(|| bad("awk: unterminated pattern"))?;
        let re = Regex::new(&rest[..end]).map_err(|_| bad("awk: invalid pattern"))?;
        let after = rest[end + 1..].trim();
        let action = after
            .strip_prefix('{')
            .and_then(|a| a.strip_suffix('}'))
            .map(|a| a.trim().to_string())
            .unwrap_or_else(|| "print $0".to_string());
        return Ok((Some(re), action));
    }
    if let Some(action) = remainder.strip_prefix('{').and_then(|a| a.strip_suffix('}')) {
        return Ok((None, action.trim().to_string()));
    }
    Err(bad("awk: unsupported program syntax"))
}

/// `awk [-F SEP] PROGRAM [file...]`: a pared-down awk supporting one
/// `BEGIN{}`/`END{}` pair plus a single `/regex/{action}` or `{action}` main
/// rule, with `$0 $N NR` field references in `print` actions.
pub fn awk(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], AWK_FLAGS)?;
    let delim = ctx.flags.value("field-separator").map(str::to_string);
    let mut positionals = ctx.flags.positionals.clone().into_iter();
    let program_raw = positionals.next().ok_or_else(|| bad("awk: missing program"))?;
    let files: Vec<String> = positionals.collect();
    let program = program_raw.trim_matches(|c| c == '\'' || c == '"').to_string();
    let text = input_lines(ctx, &files)?;

    let begin_re = Regex::new(r"(?s)BEGIN\s*\{(.*?)\}").unwrap();
    let end_re = Regex::new(r"(?s)END\s*\{(.*?)\}").unwrap();
    let begin_action = begin_re.captures(&program).map(|c| c[1].to_string());
    let without_begin = begin_re.replace(&program, "").to_string();
    let end_action = end_re.captures(&without_begin).map(|c| c[1].to_string());
    let main_rule = end_re.replace(&without_begin, "").trim().to_string();

    let (pattern, action) = parse_main_rule(&main_rule)?;

    let mut out = Vec::new();
    if let Some(b) = &begin_action {
        out.push(render_action(b, "", 0, delim.as_deref()));
    }
    for (i, line) in text.lines().enumerate() {
        let nr = i + 1;
        let matched = pattern.as_ref().map(|re| re.is_match(line)).unwrap_or(true);
        if matched {
            out.push(render_action(&action, line, nr, delim.as_deref()));
        }
    }
    if let Some(e) = &end_action {
        out.push(render_action(e, "", text.lines().count(), delim.as_deref()));
    }
    Ok(CommandOutcome::ok(out.join("\n")))
}

fn convert_backrefs(repl: &str) -> String {
    let mut out = String::new();
    let mut chars = repl.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(d) = chars.peek() {
                if d.is_ascii_digit() {
                    out.push('$');
                    out.push(*d);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// `sed 's/PATTERN/REPLACEMENT/[g]' [file...]`: the one substitution form the
/// spec's scripts actually use, `\N` backreferences translated to Rust's `$N`.
pub fn sed(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv[1..].to_vec();
    let mut positionals = argv.into_iter();
    let expr = positionals.next().ok_or_else(|| bad("sed: missing expression"))?;
    let files: Vec<String> = positionals.collect();

    let form = Regex::new(r"^s(.)(.*)$").unwrap();
    let caps = form.captures(&expr).ok_or_else(|| bad("sed: unsupported expression, expected s/pattern/replacement/[g]"))?;
    let sep = caps[1].chars().next().unwrap();
    let rest = &caps[2];
    let parts: Vec<&str> = rest.split(sep).collect();
    if parts.len() < 3 {
        return Err(bad("sed: unterminated s command"));
    }
    let (pattern, replacement, trailing_flags) = (parts[0], parts[1], parts[2]);
    let global = trailing_flags.contains('g');
    let line_re = Regex::new(pattern).map_err(|_| bad("sed: invalid pattern"))?;
    let replacement = convert_backrefs(replacement);

    let text = input_lines(ctx, &files)?;
    let limit = if global { 0 } else { 1 };
    let out: Vec<String> = text.lines().map(|line| line_re.replacen(line, limit, replacement.as_str()).to_string()).collect();
    Ok(CommandOutcome::ok(out.join("\n")))
}
