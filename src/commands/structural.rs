//! Structural/meta commands: `reset backup restore fsck help sync reboot man
//! printscreen run more less`.

use crate::effect::{CommandOutcome, Effect, ExecResult, PageMode, ScriptLine};
use crate::error::{CommandError, ErrorKind};
use crate::executor::flags::FlagSpec;

use super::context::{parse_flags, CommandCtx};

pub const RESET_FLAGS: &[FlagSpec] = &[FlagSpec { short: None, long: Some("confirmed"), takes_value: false }];

/// `reset [--confirmed]`: destructive --- wipes the VFS back to its seeded
/// default tree. Confirm-gated like `rm -i`, unconditionally this time.
pub fn reset(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], RESET_FLAGS)?;
    if !ctx.flags.is_set("confirmed") {
        return Ok(CommandOutcome::empty_ok().with_effect(Effect::Confirm {
            message: vec!["This will erase the entire filesystem and restore factory defaults.".to_string(), "Continue?".to_string()],
            on_confirm_command: Some("reset --confirmed".to_string()),
            on_confirm_effect: None,
        }));
    }
    ctx.vfs.reset();
    Ok(CommandOutcome::empty_ok().with_effect(Effect::Reboot))
}

pub fn backup(ctx: &mut CommandCtx) -> ExecResult {
    let payload = crate::backup::create_backup(ctx.vfs);
    Ok(CommandOutcome::ok(payload))
}

pub fn restore(ctx: &mut CommandCtx) -> ExecResult {
    let payload = ctx.argv.get(1).cloned().unwrap_or_else(|| ctx.stdin.clone());
    crate::backup::restore_backup(ctx.vfs, &payload)?;
    Ok(CommandOutcome::empty_ok().with_effect(Effect::Reboot))
}

pub const FSCK_FLAGS: &[FlagSpec] = &[FlagSpec { short: Some('r'), long: Some("repair"), takes_value: false }];

pub fn fsck(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], FSCK_FLAGS)?;
    let repair = ctx.flags.is_set("repair");
    let known_users = ctx.users.usernames();
    let known_groups = ctx.groups.names();
    let report = ctx.vfs.fsck(&known_users, &known_groups, repair);
    let body = if report.issues.is_empty() { "filesystem clean".to_string() } else { report.issues.join("\n") };
    Ok(CommandOutcome::ok(body))
}

pub fn help(_ctx: &mut CommandCtx) -> ExecResult {
    let names: Vec<&str> = super::registry().keys().copied().collect();
    let mut names = names;
    names.sort();
    Ok(CommandOutcome::ok(names.join(" ")))
}

/// `story save [message]` / `story log` / `story rewind <id>` --- snapshot
/// version control over the live VFS tree.
pub fn story(ctx: &mut CommandCtx) -> ExecResult {
    use crate::error::{CommandError, ErrorKind};

    let sub = ctx.argv.get(1).map(String::as_str).unwrap_or("log");
    let mut story = ctx.story.lock().unwrap();
    match sub {
        "save" => {
            let message = if ctx.argv.len() > 2 { ctx.argv[2..].join(" ") } else { "checkpoint".to_string() };
            let now_nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            let id = story.save(ctx.vfs, &message, now_nanos);
            Ok(CommandOutcome::ok(format!("snapshot {} saved", id)))
        }
        "log" => {
            let lines: Vec<String> = story.log().iter().map(|e| format!("{} {} {}", e.id, e.timestamp.to_rfc3339(), e.message)).collect();
            Ok(CommandOutcome::ok(lines.join("\n")))
        }
        "rewind" => {
            let id = ctx.argv.get(2).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "story: rewind requires a snapshot id"))?;
            let confirmed = ctx.argv.iter().any(|a| a == "--confirmed");
            if !confirmed {
                return Ok(CommandOutcome::empty_ok().with_effect(Effect::Confirm {
                    message: vec![format!("Rewind the filesystem to snapshot {}?", id)],
                    on_confirm_command: Some(format!("story rewind {} --confirmed", id)),
                    on_confirm_effect: None,
                }));
            }
            story.rewind(ctx.vfs, &id).map_err(|_| CommandError::new(ErrorKind::NotFound, format!("story: no such snapshot '{}'", id)))?;
            Ok(CommandOutcome::empty_ok().with_effect(Effect::Reboot))
        }
        other => Err(CommandError::new(ErrorKind::InvalidArgument, format!("story: unknown subcommand '{}'", other))),
    }
}

/// `sync`: forces an immediate persistence flush.
pub fn sync(ctx: &mut CommandCtx) -> ExecResult {
    ctx.vfs.sync();
    Ok(CommandOutcome::empty_ok())
}

/// `reboot`: equivalent to `reset --confirmed` without touching the tree ---
/// just the host-side reload.
pub fn reboot(_ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::empty_ok().with_effect(Effect::Reboot))
}

/// `printscreen`: captures the terminal's current contents as a PNG, handed
/// off to the host for actual rasterization.
pub fn printscreen(ctx: &mut CommandCtx) -> ExecResult {
    let filename = ctx.argv.get(1).cloned().unwrap_or_else(|| "screenshot.png".to_string());
    Ok(CommandOutcome::empty_ok().with_effect(Effect::CaptureScreenshotPng { filename }))
}

const MAN_PAGES: &[(&str, &str)] = &[
    ("ls", "ls - list directory contents\n\nUsage: ls [-l] [-a] [path]\n\nLists files and directories."),
    ("rm", "rm - remove files or directories\n\nUsage: rm [-r] [-i] [-f] target...\n\n-i prompts for confirmation before removing."),
    ("grep", "grep - print lines matching a pattern\n\nUsage: grep [-i] [-v] [-c] PATTERN [file...]"),
    ("sudo", "sudo - execute a command as another user\n\nUsage: sudo command [args...]\n\nConsults /etc/sudoers."),
];

/// `man TOPIC`: looks up a built-in page, falling back to a generic
/// not-found message; presentation is always deferred to the host via
/// `DisplayProse` rather than printed straight to stdout.
pub fn man(ctx: &mut CommandCtx) -> ExecResult {
    let topic = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "man: missing topic"))?;
    let content = MAN_PAGES
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| format!("No manual entry for {}", topic));
    Ok(CommandOutcome::empty_ok().with_effect(Effect::DisplayProse { header: format!("Manual page for {}", topic), content }))
}

pub const PAGER_FLAGS: &[FlagSpec] = &[];

/// `more [file]`: pages stdin or a named file a screenful at a time, via the
/// host's `PageOutput` surface.
pub fn more(ctx: &mut CommandCtx) -> ExecResult {
    page(ctx, PageMode::More)
}

/// `less [file]`: same paging contract as `more`, with the host's richer
/// (scroll-back capable) pager surface.
pub fn less(ctx: &mut CommandCtx) -> ExecResult {
    page(ctx, PageMode::Less)
}

fn page(ctx: &mut CommandCtx, mode: PageMode) -> ExecResult {
    let content = if let Some(file) = ctx.argv.get(1) {
        let path = ctx.resolve_path(file);
        ctx.vfs.get_node(&path, true)?.content().unwrap_or_default().to_string()
    } else {
        ctx.stdin.clone()
    };
    Ok(CommandOutcome::empty_ok().with_effect(Effect::PageOutput { content, mode }))
}

fn password_lines_needed(command: &str) -> usize {
    let parts: Vec<&str> = command.split_whitespace().collect();
    match parts.first().copied() {
        Some("useradd") if parts.len() == 2 => 2,
        Some("sudo") => 1,
        Some("su") | Some("login") if parts.len() < 3 => 1,
        _ => 0,
    }
}

/// `run SCRIPT [args...]`: reads a script file line by line, consuming any
/// password-pipe lines an interactive command (`useradd`, `sudo`, `su`,
/// `login`) would otherwise prompt for, and hands the parsed script to the
/// host for execution --- this command never executes anything itself.
pub fn run(ctx: &mut CommandCtx) -> ExecResult {
    let script_path = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "run: missing script path"))?;
    let args: Vec<String> = ctx.argv[2..].to_vec();
    let path = ctx.resolve_path(&script_path);
    let (name, groups) = ctx.actor_parts();
    let actor = super::context::actor_ref(&name, &groups);
    let node = ctx.vfs.get_node(&path, true)?;
    if node.is_directory() {
        return Err(CommandError::new(ErrorKind::IsADirectory, format!("run: {}: is a directory", script_path)));
    }
    if !crate::vfs::perm::check(&actor, node.attrs(), crate::vfs::Mask::READ) {
        return Err(CommandError::new(ErrorKind::PermissionDenied, format!("run: {}: permission denied", script_path)));
    }
    let content = node.content().unwrap_or_default().to_string();

    let raw_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#')).collect();
    let mut lines = Vec::new();
    let mut i = 0;
    while i < raw_lines.len() {
        let command = raw_lines[i].trim().to_string();
        let need = password_lines_needed(&command);
        let pipe = if need > 0 {
            let collected: Vec<String> = raw_lines[i + 1..(i + 1 + need).min(raw_lines.len())].iter().map(|s| s.trim().to_string()).collect();
            i += collected.len();
            if collected.is_empty() { None } else { Some(collected) }
        } else {
            None
        };
        lines.push(ScriptLine { command, password_pipe: pipe });
        i += 1;
    }

    Ok(CommandOutcome::empty_ok().with_effect(Effect::ExecuteScript { lines, args }))
}
