//! The command-line pipeline: tokenize -> preprocess -> parse -> dispatch.
//! Async only at the two genuine suspension points: command substitution's
//! recursive call back into `execute`, and AI-backed commands' network
//! timeout (handled inside `commands::ai`).

pub mod flags;
pub mod glob;
pub mod parse;
pub mod preprocess;
pub mod tokenize;

use crate::commands::{self, CommandCtx};
use crate::effect::{CommandOutcome, Effect, ExecResult};
use crate::error::{CommandError, ErrorKind};
use crate::identity::{GroupManager, SudoManager, UserManager};
use crate::session::Session;
use crate::vfs::Vfs;

use parse::{Connector, RedirectKind, Segment, Statement};

/// Everything `execute` needs mutable access to, bundled so the recursive
/// command-substitution call can thread it straight through.
pub struct ExecutionContext<'a> {
    pub vfs: &'a mut Vfs,
    pub users: &'a mut UserManager,
    pub groups: &'a mut GroupManager,
    pub sudo: &'a SudoManager,
    pub config: &'a crate::config::CoreConfig,
    pub session: &'a mut Session,
    pub story: &'a std::sync::Mutex<crate::story::Story>,
}

/// Runs one full command line (which may contain `;`, `&&`, `||`, pipes,
/// and redirections) to completion, returning the last statement's outcome.
pub async fn execute(line: &str, ctx: &mut ExecutionContext<'_>, stdin: &str) -> ExecResult {
    ctx.session.history.push(line);
    let expanded = expand_line(line, ctx).await?;
    let tokens = tokenize::tokenize(&expanded);
    let statements = parse::parse(&tokens);

    let mut last = CommandOutcome::ok(stdin.to_string());
    // A failing segment doesn't abort the whole line --- it only flips
    // `exit_ok` so `&&`/`||` can react to it; the last statement's error (if
    // any) is what this function ultimately surfaces.
    let mut last_err: Option<CommandError> = None;
    let mut previous_connector: Option<Connector> = None;
    for Statement { pipeline, connector } in statements {
        let should_run = match previous_connector {
            Some(Connector::And) => last.exit_ok,
            Some(Connector::Or) => !last.exit_ok,
            _ => true,
        };
        if should_run {
            match run_pipeline(&pipeline.segments, ctx, &last.stdout).await {
                Ok(outcome) => {
                    last = outcome;
                    last_err = None;
                }
                Err(e) => {
                    last = CommandOutcome { effects: Vec::new(), stdout: String::new(), exit_ok: false };
                    last_err = Some(e);
                }
            }
        }
        previous_connector = connector;
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(last),
    }
}

/// Expands `$(...)` command substitutions by recursively calling `execute`,
/// then applies brace expansion, alias resolution, and `$VAR` expansion to
/// the leading word (full-line environment expansion happens per-argument
/// during segment parsing in a real shell; here it is folded into the single
/// pre-tokenize pass for simplicity).
async fn expand_line(line: &str, ctx: &mut ExecutionContext<'_>) -> Result<String, CommandError> {
    let mut result = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && chars.get(i + 1) == Some(&'(') {
            let mut depth = 1;
            let mut j = i + 2;
            while j < chars.len() && depth > 0 {
                match chars[j] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    j += 1;
                }
            }
            let inner: String = chars[i + 2..j].iter().collect();
            let outcome = Box::pin(execute(&inner, ctx, "")).await?;
            result.push_str(&preprocess::normalize_substitution_output(&outcome.stdout));
            i = j + 1;
            continue;
        }
        result.push(chars[i]);
        i += 1;
    }
    let aliased = preprocess::expand_alias(&result, &ctx.session.aliases);
    let env_expanded = preprocess::expand_env(&aliased, &ctx.session.env);
    Ok(brace_expand_line(&env_expanded))
}

fn brace_expand_line(line: &str) -> String {
    line.split(' ').map(preprocess::expand_braces).map(|v| v.join(" ")).collect::<Vec<_>>().join(" ")
}

/// `check_fail [-z] "<cmd>"`: inverts a command's outcome for test scripts.
/// Without `-z`, succeeds iff the tested command errors. With `-z`, succeeds
/// iff the tested command's output is empty/whitespace-only.
async fn check_fail(args: &[String], ctx: &mut ExecutionContext<'_>) -> ExecResult {
    let mut check_empty = false;
    let mut words = Vec::new();
    for arg in args {
        if arg == "-z" || arg == "--check-empty" {
            check_empty = true;
        } else {
            words.push(arg.clone());
        }
    }
    if words.is_empty() {
        return Err(CommandError::new(ErrorKind::InvalidArgument, "check_fail: missing command"));
    }
    let tested = words.join(" ");
    match Box::pin(execute(&tested, ctx, "")).await {
        Ok(outcome) if check_empty && outcome.stdout.trim().is_empty() => Ok(CommandOutcome::ok(format!(
            "CHECK_FAIL: SUCCESS - command produced no output as expected: {}",
            tested
        ))),
        Ok(_) if check_empty => {
            Err(CommandError::new(ErrorKind::InvalidArgument, format!("CHECK_FAIL: FAILED - command unexpectedly produced output: {}", tested)))
        }
        Ok(_) => {
            Err(CommandError::new(ErrorKind::InvalidArgument, format!("CHECK_FAIL: FAILED - command unexpectedly succeeded: {}", tested)))
        }
        Err(_) if check_empty => Err(CommandError::new(
            ErrorKind::InvalidArgument,
            format!("CHECK_FAIL: FAILED - command errored instead of producing empty output: {}", tested),
        )),
        Err(e) => Ok(CommandOutcome::ok(format!("CHECK_FAIL: SUCCESS - command failed as expected ({}): {}", e.message, tested))),
    }
}

async fn run_pipeline(segments: &[Segment], ctx: &mut ExecutionContext<'_>, initial_stdin: &str) -> ExecResult {
    let mut stdin = initial_stdin.to_string();
    let mut outcome = CommandOutcome::ok(String::new());
    for segment in segments {
        outcome = run_segment(segment, ctx, &stdin).await?;
        stdin = outcome.stdout.clone();
    }
    Ok(outcome)
}

async fn run_segment(segment: &Segment, ctx: &mut ExecutionContext<'_>, stdin: &str) -> ExecResult {
    if segment.argv.is_empty() {
        return Ok(CommandOutcome::ok(stdin.to_string()));
    }
    let argv = glob_expand(segment, &*ctx);
    let name = argv[0].clone();

    let input = if let Some(redirect) = segment.redirects.iter().find(|r| r.kind == RedirectKind::Input) {
        let path = crate::vfs::path::resolve(ctx.session.cwd(), &redirect.target);
        ctx.vfs.get_node(&path, true)?.content().unwrap_or_default().to_string()
    } else {
        stdin.to_string()
    };

    let mut outcome = if name == "ask" {
        // The only command dispatched outside the sync registry, since it
        // needs the async AI-manager suspension point.
        let null = crate::commands::ai::NullAiManager;
        crate::commands::ai::ask(&null, &ctx.config.ai.default_persona, &argv[1..].join(" "), ctx.config.ai.request_timeout_secs).await?
    } else if name == "check_fail" {
        // Also dispatched outside the sync registry: it needs to recursively
        // re-enter `execute` on the command under test, an async suspension
        // point the declarative `CommandFn` signature has no room for.
        check_fail(&argv[1..], ctx).await?
    } else {
        let entry = commands::lookup(&name)
            .ok_or_else(|| CommandError::new(ErrorKind::NotFound, format!("{}: command not found", name)))?;
        if entry.root_required && ctx.session.current_user() != "root" {
            return Err(CommandError::new(ErrorKind::PermissionDenied, format!("{}: requires root", name)));
        }
        let mut cmd_ctx = CommandCtx {
            vfs: &mut *ctx.vfs,
            users: &mut *ctx.users,
            groups: &mut *ctx.groups,
            sudo: ctx.sudo,
            config: ctx.config,
            session: &mut *ctx.session,
            story: ctx.story,
            argv: argv.clone(),
            flags: Default::default(),
            stdin: input,
            effective_user: None,
        };
        (entry.run)(&mut cmd_ctx)?
    };

    for redirect in &segment.redirects {
        match redirect.kind {
            RedirectKind::Truncate => write_redirect(ctx, &redirect.target, &outcome.stdout, false)?,
            RedirectKind::Append => write_redirect(ctx, &redirect.target, &outcome.stdout, true)?,
            RedirectKind::Input => {}
        }
    }
    if segment.redirects.iter().any(|r| r.kind != RedirectKind::Input) {
        outcome.stdout.clear();
    }
    for effect in &outcome.effects {
        if let Effect::Audit { actor, action, details } = effect {
            crate::audit::record(ctx.vfs, actor, action, details);
        }
    }
    Ok(outcome)
}

/// Splits a glob token into its resolved parent directory and the bare
/// pattern, so `/etc/*.json` is matched against `/etc`'s listing rather than
/// always the cwd's.
fn glob_expand(segment: &Segment, ctx: &ExecutionContext) -> Vec<String> {
    let mut out = Vec::new();
    for (word, quoted) in segment.argv.iter().zip(segment.quoted.iter()) {
        if !*quoted && glob::is_glob(word) {
            let resolved = crate::vfs::path::resolve(ctx.session.cwd(), word);
            let (dir_path, pattern) = crate::vfs::path::split(&resolved).unwrap_or(("/".to_string(), resolved.clone()));
            let entries: Vec<String> = ctx
                .vfs
                .get_node(&dir_path, true)
                .ok()
                .and_then(|n| n.children())
                .map(|c| c.keys().cloned().collect())
                .unwrap_or_default();
            let matches = glob::expand(&pattern, &entries);
            if matches.is_empty() {
                out.push(word.clone());
            } else if word.contains('/') {
                let prefix = if dir_path == "/" { String::new() } else { dir_path.clone() };
                out.extend(matches.into_iter().map(|m| format!("{}/{}", prefix, m)));
            } else {
                out.extend(matches);
            }
        } else {
            out.push(word.clone());
        }
    }
    out
}

fn write_redirect(ctx: &mut ExecutionContext, target: &str, content: &str, append: bool) -> Result<(), CommandError> {
    let path = crate::vfs::path::resolve(ctx.session.cwd(), target);
    let user = ctx.session.current_user().to_string();
    let groups = ctx.groups.groups_for_user(&user);
    let actor = crate::vfs::Actor { name: &user, effective_groups: &groups };
    let final_content = if append {
        let existing = ctx.vfs.get_node(&path, true).ok().and_then(|n| n.content()).unwrap_or_default().to_string();
        format!("{}{}", existing, content)
    } else {
        content.to_string()
    };
    ctx.vfs.write_file(&path, &final_content, &actor)?;
    Ok(())
}
