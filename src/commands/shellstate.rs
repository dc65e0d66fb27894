//! Shell state commands: `pwd cd whoami clear date alias unalias set unset
//! history jobs fg bg kill ps`.

use chrono::Utc;

use crate::effect::{CommandOutcome, Effect, ExecResult};
use crate::error::{CommandError, ErrorKind};
use crate::session::jobs::JobStatus;

use super::context::CommandCtx;

pub fn pwd(ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::ok(ctx.session.cwd().to_string()))
}

pub fn cd(ctx: &mut CommandCtx) -> ExecResult {
    let target = ctx.argv.get(1).cloned().unwrap_or_else(|| format!("/home/{}", ctx.session.current_user()));
    let path = ctx.resolve_path(&target);
    let node = ctx.vfs.get_node(&path, true)?;
    if !node.is_directory() {
        return Err(CommandError::new(ErrorKind::NotADirectory, "Not a directory"));
    }
    ctx.session.set_cwd(path.clone());
    Ok(CommandOutcome::empty_ok().with_effect(Effect::ChangeDirectory { path }))
}

pub fn whoami(ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::ok(ctx.session.current_user().to_string()))
}

pub fn clear(_ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::empty_ok().with_effect(Effect::ClearScreen))
}

pub fn date(_ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::ok(Utc::now().to_rfc2822()))
}

pub fn alias(ctx: &mut CommandCtx) -> ExecResult {
    if ctx.argv.len() == 1 {
        let lines: Vec<String> = ctx.session.aliases.iter().map(|(k, v)| format!("{}='{}'", k, v)).collect();
        return Ok(CommandOutcome::ok(lines.join("\n")));
    }
    for assignment in &ctx.argv[1..] {
        if let Some((name, expansion)) = assignment.split_once('=') {
            ctx.session.aliases.set(name, expansion.trim_matches('\''));
        }
    }
    Ok(CommandOutcome::empty_ok())
}

pub fn unalias(ctx: &mut CommandCtx) -> ExecResult {
    for name in &ctx.argv[1..] {
        ctx.session.aliases.remove(name);
    }
    Ok(CommandOutcome::empty_ok())
}

pub fn set(ctx: &mut CommandCtx) -> ExecResult {
    if ctx.argv.len() == 1 {
        let lines: Vec<String> = ctx.session.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        return Ok(CommandOutcome::ok(lines.join("\n")));
    }
    if let Some((name, value)) = ctx.argv[1].split_once('=') {
        ctx.session.env.set(name, value);
    }
    Ok(CommandOutcome::empty_ok())
}

pub fn unset(ctx: &mut CommandCtx) -> ExecResult {
    for name in &ctx.argv[1..] {
        ctx.session.env.unset(name);
    }
    Ok(CommandOutcome::empty_ok())
}

pub fn history(ctx: &mut CommandCtx) -> ExecResult {
    let lines: Vec<String> =
        ctx.session.history.entries().enumerate().map(|(i, line)| format!("{:>5}  {}", i + 1, line)).collect();
    Ok(CommandOutcome::ok(lines.join("\n")))
}

pub fn jobs(ctx: &mut CommandCtx) -> ExecResult {
    let lines: Vec<String> = ctx
        .session
        .jobs
        .list()
        .map(|job| format!("[{}] {:?} {}", job.pid, job.status, job.command))
        .collect();
    Ok(CommandOutcome::ok(lines.join("\n")))
}

fn parse_pid(ctx: &CommandCtx, index: usize) -> Result<u32, CommandError> {
    ctx.argv
        .get(index)
        .and_then(|s| s.trim_start_matches('%').parse::<u32>().ok())
        .ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "expected a job id"))
}

pub fn fg(ctx: &mut CommandCtx) -> ExecResult {
    let pid = parse_pid(ctx, 1)?;
    ctx.session.jobs.set_status(pid, JobStatus::Running)?;
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::SignalJob { job_id: pid, signal: "CONT".to_string() })
        .with_effect(Effect::JobUpdate { pid, status: "running".to_string() }))
}

pub fn bg(ctx: &mut CommandCtx) -> ExecResult {
    let pid = parse_pid(ctx, 1)?;
    ctx.session.jobs.set_status(pid, JobStatus::Running)?;
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::SignalJob { job_id: pid, signal: "CONT".to_string() })
        .with_effect(Effect::JobUpdate { pid, status: "running-background".to_string() }))
}

pub fn kill(ctx: &mut CommandCtx) -> ExecResult {
    let (signal, pid_index) = if ctx.argv.get(1).map(|s| s.starts_with('-')).unwrap_or(false) {
        (ctx.argv[1].trim_start_matches('-').to_string(), 2)
    } else {
        ("TERM".to_string(), 1)
    };
    let pid = parse_pid(ctx, pid_index)?;
    match signal.as_str() {
        "STOP" => ctx.session.jobs.set_status(pid, JobStatus::Stopped)?,
        "CONT" => ctx.session.jobs.set_status(pid, JobStatus::Running)?,
        _ => ctx.session.jobs.set_status(pid, JobStatus::Done)?,
    }
    ctx.session.jobs.send_message(pid, &signal)?;
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::SignalJob { job_id: pid, signal: signal.clone() })
        .with_effect(Effect::JobUpdate { pid, status: signal }))
}

pub fn ps(ctx: &mut CommandCtx) -> ExecResult {
    let lines: Vec<String> =
        ctx.session.jobs.list().map(|job| format!("{:>6} {:<8} {:?}", job.pid, job.user, job.status)).collect();
    Ok(CommandOutcome::ok(lines.join("\n")))
}

/// `who`: every identity currently pushed on the session's login stack.
pub fn who(ctx: &mut CommandCtx) -> ExecResult {
    let lines: Vec<String> = ctx.session.stack_users().into_iter().map(|user| format!("{:<8} tty0", user)).collect();
    Ok(CommandOutcome::ok(lines.join("\n")))
}

/// `uptime`: wall-clock time elapsed since the session was created.
pub fn uptime(ctx: &mut CommandCtx) -> ExecResult {
    let elapsed = Utc::now().signed_duration_since(ctx.session.started_at);
    let total_secs = elapsed.num_seconds().max(0);
    let (hours, mins, secs) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
    Ok(CommandOutcome::ok(format!("up {:02}:{:02}:{:02}, 1 user", hours, mins, secs)))
}
