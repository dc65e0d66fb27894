//! Per-terminal session state: the login stack, working directory,
//! environment, aliases, history, and background jobs.

pub mod alias;
pub mod env;
pub mod history;
pub mod jobs;

pub use alias::AliasTable;
pub use env::EnvStack;
pub use history::History;
pub use jobs::JobTable;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    NoSuchJob,
    NotLoggedIn,
    StackEmpty,
}

/// One logged-in identity on the session stack, pushed by `su`/`login` and
/// popped by `logout`/`exit`.
#[derive(Debug, Clone)]
pub struct LoginFrame {
    pub user: String,
    pub cwd: String,
}

#[derive(Debug)]
pub struct Session {
    stack: Vec<LoginFrame>,
    pub env: EnvStack,
    pub aliases: AliasTable,
    pub history: History,
    pub jobs: JobTable,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    pub fn new(user: &str) -> Self {
        Self {
            stack: vec![LoginFrame { user: user.to_string(), cwd: format!("/home/{}", user) }],
            env: EnvStack::new(),
            aliases: AliasTable::with_defaults(),
            history: History::new(),
            jobs: JobTable::new(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn current_user(&self) -> &str {
        self.stack.last().map(|f| f.user.as_str()).unwrap_or("root")
    }

    pub fn cwd(&self) -> &str {
        self.stack.last().map(|f| f.cwd.as_str()).unwrap_or("/")
    }

    pub fn set_cwd(&mut self, path: impl Into<String>) {
        if let Some(frame) = self.stack.last_mut() {
            frame.cwd = path.into();
        }
    }

    /// `su <user>`: pushes a new login frame, starting in that user's home.
    pub fn push_login(&mut self, user: &str) {
        self.stack.push(LoginFrame { user: user.to_string(), cwd: format!("/home/{}", user) });
    }

    /// `login <user>`: replaces the entire login stack with a fresh frame,
    /// as if the terminal had been handed to a new session.
    pub fn reset_to(&mut self, user: &str) {
        self.stack = vec![LoginFrame { user: user.to_string(), cwd: format!("/home/{}", user) }];
    }

    /// `logout`/`exit`: pops back to the previous identity. The bottommost
    /// frame (the original login) can never be popped.
    pub fn pop_login(&mut self) -> Result<LoginFrame> {
        if self.stack.len() <= 1 {
            return Err(Error::StackEmpty);
        }
        Ok(self.stack.pop().unwrap())
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// `who`: every identity currently on the login stack, oldest first.
    pub fn stack_users(&self) -> Vec<&str> {
        self.stack.iter().map(|f| f.user.as_str()).collect()
    }
}
