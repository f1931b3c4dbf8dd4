//! Secret lookup and the resolved runtime configuration.
//!
//! Secrets are addressed by logical parameter name. A missing or blank value is fatal: the
//! service never starts half-configured.

use crate::domain::ports::SecretSource;
use crate::error::{Result, RoundUpError};
use async_trait::async_trait;
use std::collections::HashMap;

pub const WEBHOOK_SECRET: &str = "starling-webhook-secret";
pub const ACCESS_TOKEN: &str = "starling-personal-token";
pub const SAVINGS_GOAL: &str = "starling-savings-goal";

/// Reads secrets from the process environment: `starling-webhook-secret` is looked up as
/// `STARLING_WEBHOOK_SECRET`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn variable_name(name: &str) -> String {
        name.replace('-', "_").to_uppercase()
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, name: &str) -> Result<Option<String>> {
        match std::env::var(Self::variable_name(name)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(RoundUpError::Config(format!("{name}: {err}"))),
        }
    }
}

/// Fixed, map-backed secrets.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretSource {
    values: HashMap<String, String>,
}

impl StaticSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch(&self, name: &str) -> Result<Option<String>> {
        Ok(self.values.get(name).cloned())
    }
}

async fn require(source: &dyn SecretSource, name: &str) -> Result<String> {
    match source.fetch(name).await? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RoundUpError::Config(format!("missing secret {name}"))),
    }
}

/// Only the webhook secret, for tooling that signs payloads.
pub async fn load_webhook_secret(source: &dyn SecretSource) -> Result<String> {
    require(source, WEBHOOK_SECRET).await
}

/// Everything both pipeline stages need from the secret store.
#[derive(Clone)]
pub struct RoundUpConfig {
    pub webhook_secret: String,
    pub access_token: String,
    pub savings_goal: String,
}

impl RoundUpConfig {
    pub async fn load(source: &dyn SecretSource) -> Result<Self> {
        Ok(Self {
            webhook_secret: require(source, WEBHOOK_SECRET).await?,
            access_token: require(source, ACCESS_TOKEN).await?,
            savings_goal: require(source, SAVINGS_GOAL).await?,
        })
    }
}

impl std::fmt::Debug for RoundUpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundUpConfig")
            .field("webhook_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("savings_goal", &self.savings_goal)
            .finish()
    }
}
