//! Configuration loading and resolution.

use std::time::Duration;

/// Browser-like user agent; some login pages serve a stripped page otherwise.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

const USER_AGENT_ENV: &str = "REFORMER_USER_AGENT";
const TIMEOUT_ENV: &str = "REFORMER_TIMEOUT_MS";

/// Settings for an HTTP session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Resolve session settings: explicit flag, then environment, then default.
pub fn resolve_session_config(user_agent: Option<&str>, timeout_ms: Option<u64>) -> SessionConfig {
    resolve_with(user_agent, timeout_ms, |key| std::env::var(key).ok())
}

fn resolve_with(
    user_agent: Option<&str>,
    timeout_ms: Option<u64>,
    env: impl Fn(&str) -> Option<String>,
) -> SessionConfig {
    let user_agent = user_agent
        .map(str::to_string)
        .or_else(|| env(USER_AGENT_ENV).filter(|ua| !ua.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let timeout_ms = timeout_ms
        .or_else(|| {
            env(TIMEOUT_ENV).and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!("ignoring invalid {TIMEOUT_ENV}={raw:?}");
                    None
                }
            })
        })
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    SessionConfig {
        user_agent,
        timeout: Duration::from_millis(timeout_ms),
        max_redirects: DEFAULT_MAX_REDIRECTS,
    }
}
