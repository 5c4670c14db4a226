//! Stack configuration.
//!
//! One definition covers every revision of the stack; the values that used to be
//! hard-coded (secrets, schedule interval, table capacities) come from a JSON file
//! and from the process environment at provisioning time.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::errors::Error;
use crate::common::utils::parse_override;
use crate::common::{ARTIFACT_PATH_DEFAULT, TABLE_NAME_DEFAULT};
use crate::function_env::{DISCORD_WEBHOOK_URL, KOOK_TOKEN, STRATZ_JWT};
use crate::placeholder::is_placeholder;

pub const SCHEDULE_INTERVAL_MINUTES: &str = "SCHEDULE_INTERVAL_MINUTES";
pub const READ_CAPACITY: &str = "READ_CAPACITY";
pub const WRITE_CAPACITY: &str = "WRITE_CAPACITY";

const SCHEDULE_INTERVAL_MINUTES_DEFAULT: u32 = 5;
const READ_CAPACITY_DEFAULT: u32 = 5;
const WRITE_CAPACITY_DEFAULT: u32 = 10;
const TIMEOUT_SECONDS_DEFAULT: u32 = 30;
const LOG_RETENTION_DAYS_DEFAULT: u32 = 1;

/// A secret string whose `Debug` output never shows the value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        is_placeholder(&self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_placeholder() {
            write!(f, "Secret({:?})", self.0)
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct StackConfig {
    /// Bearer token for the match data GraphQL API.
    pub jwt_token: Secret,
    /// Chat webhook the poller posts match summaries to.
    pub webhook_url: Secret,
    /// Bot token for the additional messaging platform, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging_token: Option<Secret>,
    pub schedule_interval_minutes: u32,
    pub read_capacity: u32,
    pub write_capacity: u32,
    pub timeout_seconds: u32,
    pub log_retention_days: u32,
    pub table_name: String,
    pub artifact_path: PathBuf,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            jwt_token: Secret::default(),
            webhook_url: Secret::default(),
            messaging_token: None,
            schedule_interval_minutes: SCHEDULE_INTERVAL_MINUTES_DEFAULT,
            read_capacity: READ_CAPACITY_DEFAULT,
            write_capacity: WRITE_CAPACITY_DEFAULT,
            timeout_seconds: TIMEOUT_SECONDS_DEFAULT,
            log_retention_days: LOG_RETENTION_DAYS_DEFAULT,
            table_name: TABLE_NAME_DEFAULT.into(),
            artifact_path: PathBuf::from(ARTIFACT_PATH_DEFAULT),
        }
    }
}

impl StackConfig {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            Error::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// File (or defaults) first, then the process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(path) => {
                info!("Loading stack configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                info!("No configuration file given, starting from defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(STRATZ_JWT) {
            self.jwt_token = Secret::new(value);
        }
        if let Some(value) = lookup(DISCORD_WEBHOOK_URL) {
            self.webhook_url = Secret::new(value);
        }
        if let Some(value) = lookup(KOOK_TOKEN) {
            self.messaging_token = Some(Secret::new(value));
        }
        if let Some(value) = parse_override(&lookup, SCHEDULE_INTERVAL_MINUTES)? {
            self.schedule_interval_minutes = value;
        }
        if let Some(value) = parse_override(&lookup, READ_CAPACITY)? {
            self.read_capacity = value;
        }
        if let Some(value) = parse_override(&lookup, WRITE_CAPACITY)? {
            self.write_capacity = value;
        }

        Ok(())
    }

    /// Option names whose secret values still need substituting.
    pub fn unsubstituted_placeholders(&self) -> Vec<&'static str> {
        let mut pending = Vec::new();
        if self.jwt_token.is_placeholder() {
            pending.push("jwtToken");
        }
        if self.webhook_url.is_placeholder() {
            pending.push("webhookUrl");
        }
        if let Some(token) = &self.messaging_token {
            if token.is_placeholder() {
                pending.push("messagingToken");
            }
        }
        pending
    }
}
