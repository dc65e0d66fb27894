//! Identity commands: `useradd removeuser groupadd groupdel groups passwd
//! listusers su logout sudo usermod login visudo`.

use crate::effect::{CommandOutcome, Effect, ExecResult};
use crate::error::{CommandError, ErrorKind};
use crate::executor::flags::FlagSpec;

use super::context::{parse_flags, CommandCtx};

pub fn useradd(ctx: &mut CommandCtx) -> ExecResult {
    let username = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "useradd: missing username"))?;
    let password = ctx.argv.get(2).map(String::as_str);
    ctx.users.register(&username, password, ctx.config.pbkdf2_iterations)?;
    ctx.groups.create(&username).ok();
    ctx.groups.add_member(&username, &username).ok();
    let actor = crate::vfs::Actor { name: "root", effective_groups: &[] };
    ctx.vfs.create_directory(&format!("/home/{}", username), &actor, true)?;
    ctx.vfs.chown(&format!("/home/{}", username), &username, true, &actor)?;
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::UserAdd { username: username.clone() })
        .with_effect(Effect::Audit { actor: ctx.session.current_user().to_string(), action: "useradd".to_string(), details: username }))
}

pub fn removeuser(ctx: &mut CommandCtx) -> ExecResult {
    let username = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "removeuser: missing username"))?;
    ctx.users.remove(&username)?;
    ctx.groups.remove_user_from_all_groups(&username);
    Ok(CommandOutcome::empty_ok().with_effect(Effect::RemoveUser { username }))
}

pub const USERMOD_FLAGS: &[FlagSpec] = &[
    FlagSpec { short: Some('g'), long: Some("primary-group"), takes_value: true },
    FlagSpec { short: Some('G'), long: Some("append-groups"), takes_value: true },
];

/// `usermod -g GROUP | -G GROUP[,GROUP...] USERNAME`: repoints a user's
/// primary group, or adds them to additional supplementary groups.
pub fn usermod(ctx: &mut CommandCtx) -> ExecResult {
    let argv = ctx.argv.clone();
    ctx.flags = parse_flags(&argv[1..], USERMOD_FLAGS)?;
    let username = ctx.flags.positionals.first().cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "usermod: missing username"))?;
    if !ctx.users.exists(&username) {
        return Err(CommandError::from(crate::identity::Error::UserNotFound));
    }
    let mut changed = false;
    if let Some(group) = ctx.flags.value("primary-group").map(str::to_string) {
        if !ctx.groups.exists(&group) {
            return Err(CommandError::from(crate::identity::Error::GroupNotFound));
        }
        ctx.users.set_primary_group(&username, &group)?;
        changed = true;
    }
    if let Some(list) = ctx.flags.value("append-groups").map(str::to_string) {
        for group in list.split(',').map(str::trim).filter(|g| !g.is_empty()) {
            if !ctx.groups.exists(group) {
                return Err(CommandError::from(crate::identity::Error::GroupNotFound));
            }
            ctx.groups.add_member(group, &username).ok();
        }
        changed = true;
    }
    if !changed {
        return Err(CommandError::new(ErrorKind::InvalidArgument, "usermod: specify -g or -G"));
    }
    Ok(CommandOutcome::empty_ok().with_effect(Effect::Audit {
        actor: ctx.session.current_user().to_string(),
        action: "usermod".to_string(),
        details: username,
    }))
}

pub fn groupadd(ctx: &mut CommandCtx) -> ExecResult {
    let name = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "groupadd: missing name"))?;
    ctx.groups.create(&name)?;
    Ok(CommandOutcome::empty_ok().with_effect(Effect::Audit {
        actor: ctx.session.current_user().to_string(),
        action: "groupadd".to_string(),
        details: name,
    }))
}

pub fn groupdel(ctx: &mut CommandCtx) -> ExecResult {
    let name = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "groupdel: missing name"))?;
    ctx.groups.delete(&name)?;
    Ok(CommandOutcome::empty_ok())
}

pub fn groups(ctx: &mut CommandCtx) -> ExecResult {
    let user = ctx.argv.get(1).cloned().unwrap_or_else(|| ctx.session.current_user().to_string());
    Ok(CommandOutcome::ok(ctx.groups.groups_for_user(&user).join(" ")))
}

pub fn listusers(ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::ok(ctx.users.usernames().join("\n")))
}

pub fn passwd(ctx: &mut CommandCtx) -> ExecResult {
    let user = ctx.session.current_user().to_string();
    let new_password = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "passwd: missing new password"))?;
    ctx.users.set_password(&user, &new_password, ctx.config.pbkdf2_iterations)?;
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::Passwd { username: user.clone() })
        .with_effect(Effect::Audit { actor: user, action: "passwd".to_string(), details: "password changed".to_string() }))
}

pub fn su(ctx: &mut CommandCtx) -> ExecResult {
    let target = ctx.argv.get(1).cloned().unwrap_or_else(|| "root".to_string());
    if !ctx.users.exists(&target) {
        return Err(CommandError::from(crate::identity::Error::UserNotFound));
    }
    let password = ctx.argv.get(2).cloned();
    if let Some(password) = &password {
        ctx.users.verify_password(&target, password, ctx.config.pbkdf2_iterations)?;
    } else if ctx.users.has_password(&target) {
        return Err(CommandError::new(ErrorKind::AuthenticationFailed, "su: a password is required"));
    }
    ctx.session.push_login(&target);
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::Su { username: target, password })
        .with_effect(Effect::RefreshPrompt))
}

pub fn logout(ctx: &mut CommandCtx) -> ExecResult {
    ctx.session.pop_login()?;
    Ok(CommandOutcome::empty_ok().with_effect(Effect::Logout).with_effect(Effect::RefreshPrompt))
}

/// `login USERNAME [PASSWORD]`: replaces the whole login stack with a fresh
/// identity, the way a terminal login prompt starts a session over.
pub fn login(ctx: &mut CommandCtx) -> ExecResult {
    let username = ctx.argv.get(1).cloned().ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument, "login: missing username"))?;
    if !ctx.users.exists(&username) {
        return Err(CommandError::from(crate::identity::Error::UserNotFound));
    }
    let password = ctx.argv.get(2).cloned();
    if let Some(password) = &password {
        ctx.users.verify_password(&username, password, ctx.config.pbkdf2_iterations)?;
    } else if ctx.users.has_password(&username) {
        return Err(CommandError::new(ErrorKind::AuthenticationFailed, "login: a password is required"));
    }
    ctx.session.reset_to(&username);
    Ok(CommandOutcome::empty_ok()
        .with_effect(Effect::Login { username, password })
        .with_effect(Effect::RefreshPrompt))
}

/// `visudo`: opens `/etc/sudoers` in the editor surface. No in-process
/// parsing of its own --- `sudo` re-reads the file fresh on every check, so
/// editing it through the normal editor app is sufficient.
pub fn visudo(_ctx: &mut CommandCtx) -> ExecResult {
    Ok(CommandOutcome::empty_ok().with_effect(Effect::LaunchApp {
        name: "editor".to_string(),
        payload: serde_json::json!({ "path": "/etc/sudoers" }),
    }))
}

/// Re-invokes the remaining argv as root, after checking `/etc/sudoers`.
pub fn sudo(ctx: &mut CommandCtx) -> ExecResult {
    let command_argv = ctx.argv[1..].to_vec();
    if command_argv.is_empty() {
        return Err(CommandError::new(ErrorKind::InvalidArgument, "sudo: missing command"));
    }
    let user = ctx.session.current_user().to_string();
    let user_groups = ctx.groups.groups_for_user(&user);
    if !ctx.sudo.can_user_run_command(&*ctx.vfs, &user, &user_groups, &command_argv[0]) {
        return Err(CommandError::new(ErrorKind::PermissionDenied, format!("{} is not in the sudoers file", user))
            .with_suggestion("this incident will be reported"));
    }
    let entry = super::lookup(&command_argv[0])
        .ok_or_else(|| CommandError::new(ErrorKind::NotFound, format!("sudo: {}: command not found", command_argv[0])))?;
    let previous_effective = ctx.effective_user.take();
    ctx.effective_user = Some("root".to_string());
    ctx.argv = command_argv;
    ctx.flags = Default::default();
    let result = (entry.run)(ctx);
    ctx.effective_user = previous_effective;
    let outcome = result?;
    let command_string = ctx.argv.join(" ");
    Ok(outcome
        .with_effect(Effect::SudoExec { command: command_string.clone(), password: None })
        .with_effect(Effect::Audit { actor: user, action: "sudo".to_string(), details: command_string }))
}
