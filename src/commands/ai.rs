//! AI-backed commands. `AiManager` is the seam a host implementation plugs
//! a real provider into; `NullAiManager` keeps the crate runnable without
//! one. Providing an actual LLM-backed persona is out of scope here.

use async_trait::async_trait;
use tokio::time::{timeout, Duration};

use crate::effect::{CommandOutcome, ExecResult};
use crate::error::{CommandError, ErrorKind};

#[async_trait]
pub trait AiManager: Send + Sync {
    async fn ask(&self, persona: &str, prompt: &str) -> Result<String, String>;
}

/// Default, inert implementation: always reports the same "no provider
/// configured" answer rather than erroring, so `ask` stays usable for
/// scripting/tests without a host-supplied manager.
#[derive(Debug, Default)]
pub struct NullAiManager;

#[async_trait]
impl AiManager for NullAiManager {
    async fn ask(&self, _persona: &str, _prompt: &str) -> Result<String, String> {
        Ok("no AI provider configured".to_string())
    }
}

/// Runs `manager.ask` under a hard 20-second cap. This is one of
/// the two genuine async suspension points in the whole executor (the other
/// being command substitution), so it is invoked from the async executor
/// path rather than through the synchronous `CommandFn` registry.
pub async fn ask(manager: &dyn AiManager, persona: &str, prompt: &str, timeout_secs: u64) -> ExecResult {
    match timeout(Duration::from_secs(timeout_secs), manager.ask(persona, prompt)).await {
        Ok(Ok(reply)) => Ok(CommandOutcome::ok(reply)),
        Ok(Err(message)) => Err(CommandError::new(ErrorKind::Internal, message)),
        Err(_) => Err(CommandError::new(ErrorKind::Timeout, "ask: request timed out")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_manager_answers_without_a_provider() {
        let outcome = ask(&NullAiManager, "sam", "hello", 20).await.unwrap();
        assert!(outcome.stdout.contains("no AI provider"));
    }
}
