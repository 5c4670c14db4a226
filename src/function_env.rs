//! Environment contract between the stack and the poller it deploys.
//!
//! The stack writes these keys into the function configuration and the poller reads
//! them back from its process environment at invocation time. `GUILD_TABLE_NAME`
//! carries the configured table so a renamed table still reaches the poller.

use crate::common::errors::Error;
use crate::common::TABLE_NAME_DEFAULT;

pub const RUST_BACKTRACE: &str = "RUST_BACKTRACE";
pub const STRATZ_JWT: &str = "STRATZ_JWT";
pub const DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
pub const KOOK_TOKEN: &str = "KOOK_TOKEN";
pub const GUILD_TABLE_NAME: &str = "GUILD_TABLE_NAME";

#[derive(Clone, PartialEq, Eq)]
pub struct FunctionEnv {
    pub stratz_jwt: String,
    pub discord_webhook_url: String,
    pub kook_token: Option<String>,
    /// Falls back to the default table when the variable is unset.
    pub table_name: String,
}

impl FunctionEnv {
    /// Keys the poller refuses to start without.
    pub fn required_keys(with_messaging: bool) -> Vec<&'static str> {
        let mut keys = vec![STRATZ_JWT, DISCORD_WEBHOOK_URL];
        if with_messaging {
            keys.push(KOOK_TOKEN);
        }
        keys
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &'static str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            stratz_jwt: present(STRATZ_JWT).ok_or(Error::MissingVariable(STRATZ_JWT))?,
            discord_webhook_url: present(DISCORD_WEBHOOK_URL)
                .ok_or(Error::MissingVariable(DISCORD_WEBHOOK_URL))?,
            kook_token: present(KOOK_TOKEN),
            table_name: present(GUILD_TABLE_NAME)
                .unwrap_or_else(|| TABLE_NAME_DEFAULT.to_string()),
        })
    }
}

impl std::fmt::Debug for FunctionEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionEnv")
            .field("stratz_jwt", &"<redacted>")
            .field("discord_webhook_url", &"<redacted>")
            .field("kook_token", &self.kook_token.as_ref().map(|_| "<redacted>"))
            .field("table_name", &self.table_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_keys() {
        let env = FunctionEnv::from_lookup(lookup_from(&[
            (STRATZ_JWT, "jwt"),
            (DISCORD_WEBHOOK_URL, "https://discord.com/api/webhooks/7/hook"),
            (KOOK_TOKEN, "kook"),
            (GUILD_TABLE_NAME, "GuildsStaging"),
        ]))
        .unwrap();

        assert_eq!(env.stratz_jwt, "jwt");
        assert_eq!(env.kook_token.as_deref(), Some("kook"));
        assert_eq!(env.table_name, "GuildsStaging");
    }

    #[test]
    fn messaging_token_is_optional() {
        let env = FunctionEnv::from_lookup(lookup_from(&[
            (STRATZ_JWT, "jwt"),
            (DISCORD_WEBHOOK_URL, "https://discord.com/api/webhooks/7/hook"),
        ]))
        .unwrap();

        assert_eq!(env.kook_token, None);
        assert_eq!(env.table_name, "Guilds");
    }

    #[test]
    fn missing_jwt_is_reported_by_name() {
        let err = FunctionEnv::from_lookup(lookup_from(&[(DISCORD_WEBHOOK_URL, "https://x")]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingVariable(STRATZ_JWT)));
    }

    #[test]
    fn blank_webhook_counts_as_missing() {
        let err = FunctionEnv::from_lookup(lookup_from(&[
            (STRATZ_JWT, "jwt"),
            (DISCORD_WEBHOOK_URL, "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::MissingVariable(DISCORD_WEBHOOK_URL)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let env = FunctionEnv {
            stratz_jwt: "super-secret".into(),
            discord_webhook_url: "https://hook".into(),
            kook_token: None,
            table_name: "Guilds".into(),
        };
        assert!(!format!("{env:?}").contains("super-secret"));
    }
}
