//! API key lookup.
//!
//! Keys are resolved from the environment (`.env` included), then a
//! `secrets.toml` file, then the OS keyring.

use crate::error::{ExplorerError, Result};
use crate::llm::LlmProvider;
use keyring::Entry;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SERVICE_NAME: &str = "sql-explorer";

/// File name searched for in each secrets directory.
pub const SECRETS_FILE_NAME: &str = "secrets.toml";

/// Where an API key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    Environment(&'static str),
    SecretsFile(PathBuf),
    Keyring,
}

impl fmt::Display for ApiKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment(var) => write!(f, "environment variable {var}"),
            Self::SecretsFile(path) => write!(f, "{}", path.display()),
            Self::Keyring => write!(f, "OS keyring"),
        }
    }
}

/// A resolved API key.
#[derive(Clone)]
pub struct ApiKey {
    pub value: String,
    pub source: ApiKeySource,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &mask_secret(&self.value))
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves provider API keys.
#[derive(Debug, Clone)]
pub struct SecretStore {
    search_dirs: Vec<PathBuf>,
    use_keyring: bool,
}

impl SecretStore {
    /// Creates a store that searches `secrets.toml` in each directory, in order.
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            use_keyring: true,
        }
    }

    /// Disables the keyring lookup.
    pub fn without_keyring(mut self) -> Self {
        self.use_keyring = false;
        self
    }

    /// Looks up the API key for `provider`.
    ///
    /// Returns `Ok(None)` when the provider needs no key or none was found.
    pub fn resolve(&self, provider: LlmProvider) -> Result<Option<ApiKey>> {
        let Some(var) = provider.api_key_env() else {
            return Ok(None);
        };

        if let Some(value) = std::env::var(var).ok().filter(|v| !v.trim().is_empty()) {
            return Ok(Some(ApiKey {
                value,
                source: ApiKeySource::Environment(var),
            }));
        }

        for dir in &self.search_dirs {
            let path = dir.join(SECRETS_FILE_NAME);
            if let Some(value) = read_secrets_file(&path, var)? {
                return Ok(Some(ApiKey {
                    value,
                    source: ApiKeySource::SecretsFile(path),
                }));
            }
        }

        if self.use_keyring {
            if let Some(value) = read_keyring(provider) {
                return Ok(Some(ApiKey {
                    value,
                    source: ApiKeySource::Keyring,
                }));
            }
        }

        debug!(%provider, "No API key found");
        Ok(None)
    }
}

/// Reads `key` from a flat TOML secrets file. A missing file is not an error.
fn read_secrets_file(path: &Path, key: &str) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ExplorerError::config(format!("Failed to read {}: {e}", path.display())))?;
    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| ExplorerError::config(format!("Invalid {}: {e}", path.display())))?;

    Ok(table
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty()))
}

fn keyring_user(provider: LlmProvider) -> String {
    format!("llm:{}", provider)
}

fn read_keyring(provider: LlmProvider) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, &keyring_user(provider)) {
        Ok(entry) => entry,
        Err(e) => {
            debug!("Keyring unavailable: {e}");
            return None;
        }
    };

    match entry.get_password() {
        Ok(secret) => Some(secret),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!("Failed to read API key from keyring: {e}");
            None
        }
    }
}

/// Masks a secret for display, showing only the last 4 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        "*".repeat(chars.len())
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****...{tail}")
    }
}
