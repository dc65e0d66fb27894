//! File manipulation commands: `ls cp mv rm mkdir rmdir touch ln chmod
//! chown chgrp`.

use crate::effect::{CommandOutcome, Effect, ExecResult};
use crate::error::{CommandError, ErrorKind};
use crate::executor::flags::FlagSpec;
use crate::vfs::Node;

use super::context::{actor_ref, parse_flags, CommandCtx};

pub const LS_FLAGS: &[FlagSpec] =
    &[FlagSpec { short: Some('l'), long: Some("long"), takes_value: false }, FlagSpec { short: Some('a'), long: Some("all"), takes_value: false }];

pub fn ls(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], LS_FLAGS)?;
    let target = ctx.flags.positionals.first().cloned().unwrap_or_else(|| ".".to_string());
    let path = ctx.resolve_path(&target);
    let node = ctx.vfs.get_node(&path, true)?;
    let long = ctx.flags.is_set("long");
    let all = ctx.flags.is_set("all");
    let names: Vec<String> = match node {
        Node::Directory { children, .. } => {
            children.keys().filter(|n| all || !n.starts_with('.')).cloned().collect()
        }
        _ => vec![target.clone()],
    };
    let mut lines = Vec::new();
    for name in &names {
        if long {
            let child_path = format!("{}/{}", path.trim_end_matches('/'), name);
            if let Ok(child) = ctx.vfs.get_node(&child_path, false) {
                let attrs = child.attrs();
                let kind = match child {
                    Node::Directory { .. } => 'd',
                    Node::Symlink { .. } => 'l',
                    Node::File { .. } => '-',
                };
                lines.push(format!("{}{:o} {} {} {}", kind, attrs.mode, attrs.owner, attrs.group, name));
            }
        } else {
            lines.push(name.clone());
        }
    }
    Ok(CommandOutcome::ok(lines.join("\n")))
}

pub fn cp(ctx: &mut CommandCtx) -> ExecResult {
    let [src, dst] = require_two(ctx)?;
    let src_path = ctx.resolve_path(&src);
    let dst_path = ctx.resolve_path(&dst);
    let content = ctx.vfs.get_node(&src_path, true)?.content().unwrap_or_default().to_string();
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.write_file(&dst_path, &content, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

pub fn mv(ctx: &mut CommandCtx) -> ExecResult {
    let [src, dst] = require_two(ctx)?;
    let src_path = ctx.resolve_path(&src);
    let dst_path = ctx.resolve_path(&dst);
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.rename_node(&src_path, &dst_path, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

pub const RM_FLAGS: &[FlagSpec] = &[
    FlagSpec { short: Some('r'), long: Some("recursive"), takes_value: false },
    FlagSpec { short: Some('i'), long: Some("interactive"), takes_value: false },
    FlagSpec { short: Some('f'), long: Some("force"), takes_value: false },
    FlagSpec { short: None, long: Some("confirmed"), takes_value: false },
];

/// `rm -rifR`: with `-i`, an existing target triggers a `confirm` effect
/// instead of removal --- unless `-f`, `--confirmed`, or a prior `YES` on
/// stdin already cleared it.
pub fn rm(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], RM_FLAGS)?;
    let recursive = ctx.flags.is_set("recursive");
    let interactive = ctx.flags.is_set("interactive");
    let force = ctx.flags.is_set("force");
    let confirmed = ctx.flags.is_set("confirmed") || ctx.stdin.trim() == "YES";
    let targets = ctx.flags.positionals.clone();
    if interactive && !force && !confirmed {
        let existing: Vec<String> =
            targets.iter().filter(|t| ctx.vfs.get_node(&ctx.resolve_path(t), true).is_ok()).cloned().collect();
        if !existing.is_empty() {
            let message = existing.iter().map(|t| format!("remove '{}'?", t)).collect();
            let on_confirm_command = format!("rm {} --confirmed", argv[1..].join(" "));
            return Ok(CommandOutcome::empty_ok().with_effect(Effect::Confirm {
                message,
                on_confirm_command: Some(on_confirm_command),
                on_confirm_effect: None,
            }));
        }
    }
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    for target in targets {
        let path = ctx.resolve_path(&target);
        ctx.vfs.remove(&path, recursive, &actor)?;
    }
    Ok(CommandOutcome::empty_ok())
}

pub const MKDIR_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('p'), long: Some("parents"), takes_value: false }];

pub fn mkdir(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], MKDIR_FLAGS)?;
    let parents = ctx.flags.is_set("parents");
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    for target in ctx.flags.positionals.clone() {
        let path = ctx.resolve_path(&target);
        ctx.vfs.create_directory(&path, &actor, parents)?;
    }
    Ok(CommandOutcome::empty_ok())
}

pub fn rmdir(ctx: &mut CommandCtx) -> ExecResult {
    let target = ctx.argv.get(1).cloned().ok_or_else(|| missing_operand("rmdir"))?;
    let path = ctx.resolve_path(&target);
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.remove(&path, false, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

pub fn touch(ctx: &mut CommandCtx) -> ExecResult {
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    for target in ctx.argv[1..].to_vec() {
        let path = ctx.resolve_path(&target);
        let existing = ctx.vfs.get_node(&path, false).ok().and_then(|n| n.content()).unwrap_or_default().to_string();
        ctx.vfs.write_file(&path, &existing, &actor)?;
    }
    Ok(CommandOutcome::empty_ok())
}

pub const LN_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('s'), long: Some("symbolic"), takes_value: false }];

pub fn ln(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], LN_FLAGS)?;
    let [target, link_name] = require_two_from(&ctx.flags.positionals)?;
    let link_path = ctx.resolve_path(&link_name);
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.ln(&target, &link_path, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

pub fn chmod(ctx: &mut CommandCtx) -> ExecResult {
    let [mode_str, target] = require_two(ctx)?;
    let mode = u16::from_str_radix(&mode_str, 8).map_err(|_| CommandError::new(ErrorKind::InvalidArgument, "invalid mode"))?;
    let path = ctx.resolve_path(&target);
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.chmod(&path, mode, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

pub const CHOWN_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('R'), long: Some("recursive"), takes_value: false }];

pub fn chown(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], CHOWN_FLAGS)?;
    let [owner, target] = require_two_from(&ctx.flags.positionals)?;
    let path = ctx.resolve_path(&target);
    let recursive = ctx.flags.is_set("recursive");
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.chown(&path, &owner, recursive, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

pub fn chgrp(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], CHOWN_FLAGS)?;
    let [group, target] = require_two_from(&ctx.flags.positionals)?;
    let path = ctx.resolve_path(&target);
    let recursive = ctx.flags.is_set("recursive");
    let (name, groups) = ctx.actor_parts();
    let actor = actor_ref(&name, &groups);
    ctx.vfs.chgrp(&path, &group, recursive, &actor)?;
    Ok(CommandOutcome::empty_ok())
}

#[derive(Clone)]
enum FindPredicate {
    Name(String),
    Type(char),
    Perm(u16),
}

#[derive(Clone)]
enum FindAction {
    Print,
    Delete,
    Exec(Vec<String>),
}

fn find_bad(message: impl Into<String>) -> CommandError {
    CommandError::new(ErrorKind::InvalidArgument, message.into())
}

fn parse_find_expression(args: &[String]) -> Result<(Vec<Vec<FindPredicate>>, Vec<FindAction>), CommandError> {
    let mut groups: Vec<Vec<FindPredicate>> = vec![Vec::new()];
    let mut actions = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-name" => {
                let pattern = args.get(i + 1).ok_or_else(|| find_bad("-name: missing argument"))?;
                groups.last_mut().unwrap().push(FindPredicate::Name(pattern.clone()));
                i += 2;
            }
            "-type" => {
                let kind = args.get(i + 1).ok_or_else(|| find_bad("-type: missing argument"))?;
                let c = kind.chars().next().ok_or_else(|| find_bad("-type: expected 'f' or 'd'"))?;
                groups.last_mut().unwrap().push(FindPredicate::Type(c));
                i += 2;
            }
            "-perm" => {
                let raw = args.get(i + 1).ok_or_else(|| find_bad("-perm: missing argument"))?;
                let mode = u16::from_str_radix(raw.trim_start_matches('-'), 8).map_err(|_| find_bad("-perm: invalid mode"))?;
                groups.last_mut().unwrap().push(FindPredicate::Perm(mode));
                i += 2;
            }
            "-o" => {
                groups.push(Vec::new());
                i += 1;
            }
            "-delete" => {
                actions.push(FindAction::Delete);
                i += 1;
            }
            "-exec" => {
                let mut cmd = Vec::new();
                i += 1;
                while i < args.len() && args[i] != ";" {
                    cmd.push(args[i].clone());
                    i += 1;
                }
                if i >= args.len() {
                    return Err(find_bad("-exec: missing terminating ';'"));
                }
                i += 1;
                actions.push(FindAction::Exec(cmd));
            }
            other => return Err(find_bad(format!("unknown predicate '{}'", other))),
        }
    }
    if actions.is_empty() {
        actions.push(FindAction::Print);
    }
    Ok((groups, actions))
}

fn find_node_matches(node: &Node, basename: &str, groups: &[Vec<FindPredicate>]) -> bool {
    groups.iter().any(|group| {
        group.iter().all(|predicate| match predicate {
            FindPredicate::Name(pattern) => crate::executor::glob::matches(pattern, basename),
            FindPredicate::Type(kind) => matches!((kind, node), ('f', Node::File { .. }) | ('d', Node::Directory { .. })),
            FindPredicate::Perm(mode) => node.attrs().mode == *mode,
        })
    })
}

fn find_walk(
    node: &Node,
    display_path: &str,
    groups: &[Vec<FindPredicate>],
    actions: &[FindAction],
    output: &mut Vec<String>,
    to_delete: &mut Vec<String>,
    commands_to_exec: &mut Vec<String>,
) {
    let basename = display_path.rsplit('/').next().unwrap_or(display_path);
    if find_node_matches(node, basename, groups) {
        for action in actions {
            match action {
                FindAction::Print => output.push(display_path.to_string()),
                FindAction::Delete => to_delete.push(display_path.to_string()),
                FindAction::Exec(cmd) => {
                    let rendered: Vec<String> = cmd.iter().map(|part| part.replace("{}", display_path)).collect();
                    commands_to_exec.push(rendered.join(" "));
                }
            }
        }
    }
    if let Some(children) = node.children() {
        for (name, child) in children {
            let child_path = format!("{}/{}", display_path.trim_end_matches('/'), name);
            find_walk(child, &child_path, groups, actions, output, to_delete, commands_to_exec);
        }
    }
}

/// `find [path...] [expression]`: `-name -type f|d -perm MODE` predicates
/// ANDed within an `-o`-separated group, ORed across groups; `-delete` and
/// `-exec ... ;` actions (default action is `-print` if none given).
pub fn find(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv[1..].to_vec();
    if argv.is_empty() {
        return Err(find_bad("find: missing path"));
    }
    let mut split = 0;
    while split < argv.len() && !argv[split].starts_with('-') {
        split += 1;
    }
    let mut paths: Vec<String> = argv[..split].to_vec();
    if paths.is_empty() {
        paths.push(".".to_string());
    }
    let (groups, actions) = parse_find_expression(&argv[split..])?;

    let mut output = Vec::new();
    let mut to_delete = Vec::new();
    let mut commands_to_exec = Vec::new();
    for root in &paths {
        let root_path = ctx.resolve_path(root);
        let snapshot = ctx.vfs.get_node(&root_path, true)?.clone();
        find_walk(&snapshot, root, &groups, &actions, &mut output, &mut to_delete, &mut commands_to_exec);
    }

    if !to_delete.is_empty() {
        let (name, groups) = ctx.actor_parts();
        let actor = actor_ref(&name, &groups);
        for target in &to_delete {
            let path = ctx.resolve_path(target);
            ctx.vfs.remove(&path, true, &actor).ok();
        }
    }

    if !commands_to_exec.is_empty() {
        let joined = output.join("\n");
        return Ok(CommandOutcome::ok(joined.clone())
            .with_effect(crate::effect::Effect::ExecuteCommands { commands: commands_to_exec, output: Some(joined) }));
    }
    Ok(CommandOutcome::ok(output.join("\n")))
}

fn require_two(ctx: &CommandCtx) -> Result<[String; 2], CommandError> {
    require_two_from(&ctx.argv[1..])
}

fn require_two_from(args: &[String]) -> Result<[String; 2], CommandError> {
    match args {
        [a, b, ..] => Ok([a.clone(), b.clone()]),
        _ => Err(CommandError::new(ErrorKind::InvalidArgument, "missing operand")),
    }
}

fn missing_operand(cmd: &str) -> CommandError {
    CommandError::new(ErrorKind::InvalidArgument, format!("{}: missing operand", cmd))
}
