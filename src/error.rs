//! User-visible error type for commands, layered above the small `Copy`
//! enums each subsystem (`vfs::Error`, `identity::Error`, `session::Error`)
//! defines for its own internal control flow.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    PermissionDenied,
    Warded,
    InvalidArgument,
    AuthenticationFailed,
    NotLoggedIn,
    Timeout,
    Internal,
}

/// The structured error every command surfaces to the terminal.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl From<crate::vfs::Error> for CommandError {
    fn from(err: crate::vfs::Error) -> Self {
        use crate::vfs::Error::*;
        match err {
            FileNotFound => CommandError::new(ErrorKind::NotFound, "No such file or directory"),
            FileExists => CommandError::new(ErrorKind::AlreadyExists, "File exists"),
            NotADirectory => CommandError::new(ErrorKind::NotADirectory, "Not a directory"),
            IsADirectory => CommandError::new(ErrorKind::IsADirectory, "Is a directory"),
            PermissionDenied => CommandError::new(ErrorKind::PermissionDenied, "Permission denied"),
            Warded => CommandError::new(ErrorKind::Warded, "Permission denied")
                .with_suggestion("this path is protected by a scheduled job; check the agenda before retrying"),
            InvalidMode => CommandError::new(ErrorKind::InvalidArgument, "Invalid mode"),
            CycleDetected => CommandError::new(ErrorKind::NotFound, "Too many levels of symbolic links"),
            InvalidArgument => CommandError::new(ErrorKind::InvalidArgument, "Invalid argument"),
        }
    }
}

impl From<crate::identity::Error> for CommandError {
    fn from(err: crate::identity::Error) -> Self {
        use crate::identity::Error::*;
        match err {
            UserNotFound => CommandError::new(ErrorKind::NotFound, "No such user"),
            UserExists => CommandError::new(ErrorKind::AlreadyExists, "User already exists"),
            GroupNotFound => CommandError::new(ErrorKind::NotFound, "No such group"),
            GroupExists => CommandError::new(ErrorKind::AlreadyExists, "Group already exists"),
            InvalidUsername => CommandError::new(ErrorKind::InvalidArgument, "Invalid username")
                .with_suggestion("usernames are lowercase, start with a letter, and may contain digits, '_' or '-'"),
            ReservedUsername => CommandError::new(ErrorKind::InvalidArgument, "That name is reserved"),
            AuthenticationFailed => CommandError::new(ErrorKind::AuthenticationFailed, "Incorrect password"),
            RootPasswordRequired => CommandError::new(ErrorKind::InvalidArgument, "root must have a password set"),
            NotPermitted => CommandError::new(ErrorKind::PermissionDenied, "Operation not permitted"),
        }
    }
}

impl From<crate::session::Error> for CommandError {
    fn from(err: crate::session::Error) -> Self {
        use crate::session::Error::*;
        match err {
            NoSuchJob => CommandError::new(ErrorKind::NotFound, "No such job"),
            NotLoggedIn => CommandError::new(ErrorKind::NotLoggedIn, "Not logged in"),
            StackEmpty => CommandError::new(ErrorKind::Internal, "Session stack is empty"),
        }
    }
}
