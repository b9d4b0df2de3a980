use std::{path::PathBuf, str::FromStr};

use anyhow::{Context as _, Result};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An api key, read from the environment, a file or the configuration itself
///
/// Parsed from strings with a prefix:
///
/// * `env:OPENAI_API_KEY` reads the key from an environment variable
/// * `file:/path/to/key` reads the key from a file
/// * `text:sk-...` uses the key as-is
///
/// Never serialized in plain text.
#[derive(Debug, Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }

    /// Reads the key from an environment variable, if it is set and not empty
    #[must_use]
    pub fn from_env(name: &str) -> Option<Self> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Self::new)
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl FromStr for ApiKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((source, value)) = s.split_once(':') else {
            anyhow::bail!("Invalid api key, expected one of `env:`, `file:` or `text:` as prefix");
        };

        let secret = match source {
            "env" => std::env::var(value)
                .with_context(|| format!("Environment variable {value} for api key not set"))?,
            "file" => std::fs::read_to_string(PathBuf::from(value))
                .with_context(|| format!("Failed to read api key from {value}"))?
                .trim()
                .to_string(),
            "text" => value.to_string(),
            _ => anyhow::bail!(
                "Invalid api key source `{source}`, expected one of `env`, `file` or `text`"
            ),
        };

        Ok(Self::new(secret))
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for ApiKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("text:**********")
    }
}
