//! The `{module, function, args, kwargs}` -> `{success, data|error}` bridge
//! used by a host embedding this crate (e.g. a browser-side UI) to invoke
//! functionality without linking against Rust types directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct SyscallRequest {
    pub module: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "success")]
pub enum SyscallResponse {
    #[serde(rename = "true")]
    Ok { data: Value },
    #[serde(rename = "false")]
    Err { error: String, traceback: Option<String> },
}

/// Recognised module namespaces a `SyscallRequest` may target. Only the
/// subset backed by this crate's modules is enumerated; a host forwards
/// everything else (`editor`, `paint`, `adventure`, `top`, `log`, `basic`)
/// to its own UI-layer handlers.
pub const MODULES: &[&str] =
    &["executor", "filesystem", "session", "env", "history", "alias", "groups", "users", "sudo", "ai", "story", "audit"];

pub fn ok(data: Value) -> SyscallResponse {
    SyscallResponse::Ok { data }
}

pub fn err(message: impl Into<String>) -> SyscallResponse {
    SyscallResponse::Err { error: message.into(), traceback: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_request_with_missing_optional_fields() {
        let raw = r#"{"module":"filesystem","function":"ls"}"#;
        let request: SyscallRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.module, "filesystem");
        assert!(request.args.is_empty());
    }
}
