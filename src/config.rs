//! Environment configuration.
//!
//! Credentials are read once at startup. The outcome is a plain value that
//! gets handed to the rest of the app; nothing re-reads the environment later.

use crate::error::ConfigError;

pub const KEY_VAR: &str = "VISION_KEY";
pub const ENDPOINT_VAR: &str = "VISION_ENDPOINT";
pub const ADDR_VAR: &str = "VISION_APP_ADDR";

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Sample `.env` contents shown when credentials are missing.
pub const ENV_TEMPLATE: &str = "VISION_KEY=your_azure_vision_api_key\n\
VISION_ENDPOINT=https://your-vision-endpoint.cognitiveservices.azure.com/";

/// API key + endpoint pair for the remote vision service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub endpoint: String,
}

// Keep the key out of logs and panics.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Result of the startup credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOutcome {
    Valid(Credentials),
    Missing(ConfigError),
}

impl ConfigOutcome {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup.
    ///
    /// Blank values (after trimming) count as absent. Either name missing
    /// makes the whole outcome `Missing`; there is no partial mode.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match (read(KEY_VAR), read(ENDPOINT_VAR)) {
            (Some(key), Some(endpoint)) => Self::Valid(Credentials { key, endpoint }),
            (key, endpoint) => {
                let mut names = Vec::new();
                if key.is_none() {
                    names.push(KEY_VAR);
                }
                if endpoint.is_none() {
                    names.push(ENDPOINT_VAR);
                }
                Self::Missing(ConfigError::Missing { names })
            }
        }
    }
}

/// Bind address for the web server.
pub fn listen_addr() -> String {
    std::env::var(ADDR_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
}
