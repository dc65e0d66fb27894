//! The fixed bundle every builtin command function receives: identity,
//! filesystem, session, and config, borrowed for the duration of one call.

use std::sync::Mutex;

use crate::config::CoreConfig;
use crate::effect::ExecResult;
use crate::executor::flags::{FlagSpec, ParsedFlags};
use crate::identity::{GroupManager, SudoManager, UserManager};
use crate::session::Session;
use crate::story::Story;
use crate::vfs::{Actor, Vfs};

pub struct CommandCtx<'a> {
    pub vfs: &'a mut Vfs,
    pub users: &'a mut UserManager,
    pub groups: &'a mut GroupManager,
    pub sudo: &'a SudoManager,
    pub config: &'a CoreConfig,
    pub session: &'a mut Session,
    pub story: &'a Mutex<Story>,
    pub argv: Vec<String>,
    pub flags: ParsedFlags,
    pub stdin: String,
    /// Set by `sudo` when re-invoking a command as root for this one call.
    pub effective_user: Option<String>,
}

impl<'a> CommandCtx<'a> {
    /// The acting user's name, owned rather than borrowed: every caller
    /// needs to go on to mutably borrow `self.vfs` to actually use an
    /// `Actor`, so the name can't be borrowed from `self` itself without
    /// pinning that borrow across the whole call.
    pub fn actor_name(&self) -> String {
        self.effective_user.clone().unwrap_or_else(|| self.session.current_user().to_string())
    }

    /// The acting user's current group memberships, owned for the same
    /// reason as [`Self::actor_name`].
    pub fn actor_groups(&self) -> Vec<String> {
        self.groups.groups_for_user(&self.actor_name())
    }

    /// Convenience bundling of [`Self::actor_name`] and [`Self::actor_groups`]
    /// for the common case of needing both.
    pub fn actor_parts(&self) -> (String, Vec<String>) {
        let name = self.actor_name();
        let groups = self.groups.groups_for_user(&name);
        (name, groups)
    }

    pub fn resolve_path(&self, path: &str) -> String {
        crate::vfs::path::resolve(self.session.cwd(), path)
    }
}

/// Builds an [`Actor`] borrowing from locals obtained via
/// [`CommandCtx::actor_name`]/[`CommandCtx::actor_groups`], e.g.:
/// `let (name, groups) = ctx.actor_parts(); let actor = actor_ref(&name, &groups);`
pub fn actor_ref<'b>(name: &'b str, groups: &'b [String]) -> Actor<'b> {
    Actor { name, effective_groups: groups }
}

pub fn parse_flags(argv: &[String], specs: &[FlagSpec]) -> Result<ParsedFlags, crate::error::CommandError> {
    crate::executor::flags::parse(argv, specs).map_err(|e| {
        use crate::error::{CommandError, ErrorKind};
        match e {
            crate::executor::flags::FlagError::Unknown(flag) => {
                CommandError::new(ErrorKind::InvalidArgument, format!("unrecognized option '{}'", flag))
            }
            crate::executor::flags::FlagError::MissingValue(flag) => {
                CommandError::new(ErrorKind::InvalidArgument, format!("option '{}' requires a value", flag))
            }
        }
    })
}

pub type CommandFn = fn(&mut CommandCtx) -> ExecResult;
