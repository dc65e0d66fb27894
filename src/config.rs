//! Runtime configuration, analogous to the original's `config.py` constants
//! module. Kept as a plain struct with `serde` support so a host embedding
//! this crate can load overrides from JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub max_history: usize,
    pub pbkdf2_iterations: u32,
    /// Ceiling on total VFS content size in bytes, reported against by `df`.
    pub max_vfs_size: u64,
    pub ai: AiConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self { max_history: 50, pbkdf2_iterations: 100_000, max_vfs_size: 10 * 1024 * 1024, ai: AiConfig::default() }
    }
}

/// Settings for AI-backed commands (`ask`). The provider itself is out of
/// scope; this only carries the timeout contract and a default persona name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub request_timeout_secs: u64,
    pub default_persona: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self { request_timeout_secs: 20, default_persona: "sam".to_string() }
    }
}
