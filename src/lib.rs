//! SamwiseOS shell core: an in-memory, Unix-like virtual file system, an
//! identity/sudo model, a pipeline executor over a built-in command catalog,
//! and the snapshot/audit layers that sit around them.

pub mod audit;
pub mod backup;
pub mod commands;
pub mod config;
pub mod effect;
pub mod error;
pub mod executor;
pub mod identity;
pub mod session;
pub mod story;
pub mod syscall;
pub mod vfs;

pub use effect::{CommandOutcome, Effect};
pub use error::{CommandError, ErrorKind};
pub use executor::execute;
pub use vfs::Vfs;

use std::sync::{Arc, Mutex};

use identity::{GroupManager, SudoManager, UserManager};
use session::Session;

/// Everything shared across one in-process SamwiseOS instance: the VFS,
/// the identity tables, and the config the commands read from.
///
/// Sessions are cheap, per-terminal state (`Session`); `SystemContext` is the
/// shared substrate underneath all of them, analogous to the Python
/// original's module-level singletons.
pub struct SystemContext {
    pub vfs: Arc<Mutex<Vfs>>,
    pub users: Arc<Mutex<UserManager>>,
    pub groups: Arc<Mutex<GroupManager>>,
    pub sudo: SudoManager,
    pub config: config::CoreConfig,
    pub story: Mutex<story::Story>,
}

impl SystemContext {
    pub fn new() -> Self {
        let vfs = Vfs::new();
        let groups = GroupManager::new();
        let users = UserManager::new();
        Self {
            vfs: Arc::new(Mutex::new(vfs)),
            users: Arc::new(Mutex::new(users)),
            groups: Arc::new(Mutex::new(groups)),
            sudo: SudoManager::new(),
            config: config::CoreConfig::default(),
            story: Mutex::new(story::Story::new()),
        }
    }

    pub fn new_session(&self, user: &str) -> Session {
        Session::new(user)
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}
