//! Effects are the values commands return instead of performing host-bridge
//! side effects directly --- the effect protocol the host-facing surface
//! speaks. The executor folds these along a pipeline and a host applies them.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// One line of a `run <script>` script, paired with whatever password-pipe
/// lines the originating command consumed to satisfy an interactive prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptLine {
    pub command: String,
    pub password_pipe: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    More,
    Less,
}

#[derive(Debug, Clone)]
pub enum Effect {
    /// Host updates `session.currentPath` (`cd`).
    ChangeDirectory { path: String },
    /// Replace the in-browser terminal contents (`clear`, `printscreen`).
    ClearScreen,
    /// Trivial host action with no payload.
    Beep,
    /// Ask the host to reboot/reset the whole environment.
    Reboot,
    /// Request the host re-render the prompt (cwd/user changed).
    RefreshPrompt,

    /// Host runs the interactive login flow, then may re-enter the executor.
    Login { username: String, password: Option<String> },
    Logout,
    Su { username: String, password: Option<String> },
    /// Host collects a new password interactively.
    Passwd { username: String },
    UserAdd { username: String },
    RemoveUser { username: String },

    /// Host re-enters the executor with elevated identity for one command.
    SudoExec { command: String, password: Option<String> },
    /// Host prompts Y/N; on yes, re-enters the executor with either the
    /// given command (usually carrying `--confirmed`) or the nested effect.
    Confirm { message: Vec<String>, on_confirm_command: Option<String>, on_confirm_effect: Option<Box<Effect>> },
    /// Host enqueues commands in order, using the current identity (`find -exec`).
    ExecuteCommands { commands: Vec<String>, output: Option<String> },
    /// Host runs a script with positional `$1...` set from `args` (`run`).
    ExecuteScript { lines: Vec<ScriptLine>, args: Vec<String> },

    /// Host spawns a job (new PID, running) and returns control immediately.
    BackgroundJob { command_string: String },
    /// Host flips a job's state or kills it.
    SignalJob { job_id: u32, signal: String },
    PostMessage { job_id: u32, message: String },
    ReadMessages { job_id: u32 },
    /// A background job changed state; host-side job tables may listen.
    JobUpdate { pid: u32, status: String },

    /// Ask the host to open an application surface (`editor`, `paint`, ...).
    LaunchApp { name: String, payload: serde_json::Value },
    /// Host pages long output a screenful at a time (`more`/`less`).
    PageOutput { content: String, mode: PageMode },
    /// Host renders markdown prose (`man`'s fallback surface).
    DisplayProse { header: String, content: String },

    ExportFile { filename: String, content: String },
    BackupData { payload: String },
    CaptureScreenshotPng { filename: String },
    DumpScreenText { path: String },

    ApplyTheme { theme: String },
    ToggleCinematicMode,
    PlaySound { sound: String },
    Delay { ms: u64 },

    /// Host refreshes its session/group/user caches from core tables.
    SyncSessionState,
    SyncGroupState { groups: Vec<String> },
    SyncUserAndGroupState,

    /// Emitted once per audit-worthy action; the host may additionally log it.
    Audit { actor: String, action: String, details: String },
}

/// What running one command produced: any effects, plus what becomes stdin
/// for the next pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    pub effects: Vec<Effect>,
    pub stdout: String,
    pub exit_ok: bool,
}

impl CommandOutcome {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { effects: Vec::new(), stdout: stdout.into(), exit_ok: true }
    }

    pub fn empty_ok() -> Self {
        Self { effects: Vec::new(), stdout: String::new(), exit_ok: true }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// The result type every builtin command function returns: errors are
/// values, never exceptions, across the syscall boundary.
pub type ExecResult = Result<CommandOutcome, CommandError>;
