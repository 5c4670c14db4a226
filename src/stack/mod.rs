//! The stack definition: a resource graph evaluated once from configuration.
//!
//! Building a [`StackDefinition`] performs every configuration-time check the
//! provisioning engine would otherwise only report after an upload round-trip.
//! Evaluation is pure; equal configurations always produce equal graphs.

mod resources;

use std::collections::BTreeMap;

pub use resources::*;

use crate::common::errors::Error;
use crate::config::StackConfig;
use crate::function_env::{
    DISCORD_WEBHOOK_URL, GUILD_TABLE_NAME, KOOK_TOKEN, RUST_BACKTRACE, STRATZ_JWT,
};

pub const ASSET_BUCKET_PARAM: &str = "AssetBucket";
pub const ASSET_KEY_PARAM: &str = "AssetKey";
pub const STRATZ_JWT_PARAM: &str = "StratzJwt";
pub const DISCORD_WEBHOOK_PARAM: &str = "DiscordWebhookUrl";
pub const KOOK_TOKEN_PARAM: &str = "KookToken";

const MANAGED_POLICY: &str = "AmazonDynamoDBFullAccess";
const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
const EVENTS_PRINCIPAL: &str = "events.amazonaws.com";
const FUNCTION_DESCRIPTION: &str = "Poller Lambda";
// provided.al2 ignores the handler, but the field is mandatory.
const FUNCTION_HANDLER: &str = "not.required";

const MAX_TIMEOUT_SECONDS: u32 = 900;
const LOG_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];
const RESERVED_ENV_KEYS: &[&str] = &[
    "_HANDLER",
    "_X_AMZN_TRACE_ID",
    "AWS_ACCESS_KEY",
    "AWS_ACCESS_KEY_ID",
    "AWS_DEFAULT_REGION",
    "AWS_EXECUTION_ENV",
    "AWS_LAMBDA_FUNCTION_MEMORY_SIZE",
    "AWS_LAMBDA_FUNCTION_NAME",
    "AWS_LAMBDA_FUNCTION_VERSION",
    "AWS_LAMBDA_INITIALIZATION_TYPE",
    "AWS_LAMBDA_LOG_GROUP_NAME",
    "AWS_LAMBDA_LOG_STREAM_NAME",
    "AWS_LAMBDA_RUNTIME_API",
    "AWS_REGION",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "LAMBDA_RUNTIME_DIR",
    "LAMBDA_TASK_ROOT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
    pub no_echo: bool,
}

/// Where the packaged artifact was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    pub role: ExecutionRole,
    pub function: ScheduledFunction,
    pub log_group: LogGroup,
    pub rule: ScheduleRule,
    pub permission: InvokePermission,
    pub table: KeyValueTable,
}

impl StackDefinition {
    pub fn from_config(config: &StackConfig) -> Result<Self, Error> {
        validate_config(config)?;

        let mut environment = BTreeMap::new();
        environment.insert(RUST_BACKTRACE.to_string(), EnvValue::Literal("1".into()));
        environment.insert(
            GUILD_TABLE_NAME.to_string(),
            EnvValue::Literal(config.table_name.clone()),
        );
        environment.insert(STRATZ_JWT.to_string(), EnvValue::Parameter(STRATZ_JWT_PARAM));
        environment.insert(
            DISCORD_WEBHOOK_URL.to_string(),
            EnvValue::Parameter(DISCORD_WEBHOOK_PARAM),
        );
        if config.messaging_token.is_some() {
            environment.insert(KOOK_TOKEN.to_string(), EnvValue::Parameter(KOOK_TOKEN_PARAM));
        }
        validate_environment(&environment)?;

        Ok(Self {
            role: ExecutionRole {
                logical_id: ROLE_ID,
                service_principal: LAMBDA_PRINCIPAL,
                managed_policies: vec![MANAGED_POLICY],
            },
            function: ScheduledFunction {
                logical_id: FUNCTION_ID,
                description: FUNCTION_DESCRIPTION,
                artifact_path: config.artifact_path.clone(),
                runtime: Runtime::ProvidedAl2,
                architecture: Architecture::X86_64,
                handler: FUNCTION_HANDLER,
                timeout_seconds: config.timeout_seconds,
                environment,
                role: ROLE_ID,
            },
            log_group: LogGroup {
                logical_id: LOG_GROUP_ID,
                function: FUNCTION_ID,
                retention_days: config.log_retention_days,
            },
            rule: ScheduleRule {
                logical_id: RULE_ID,
                interval_minutes: config.schedule_interval_minutes,
                target: FUNCTION_ID,
            },
            permission: InvokePermission {
                logical_id: PERMISSION_ID,
                function: FUNCTION_ID,
                source_rule: RULE_ID,
                principal: EVENTS_PRINCIPAL,
            },
            table: KeyValueTable {
                logical_id: TABLE_ID,
                table_name: config.table_name.clone(),
                read_capacity: config.read_capacity,
                write_capacity: config.write_capacity,
                partition_key: KeyAttribute {
                    name: PARTITION_KEY,
                    attribute_type: AttributeType::Number,
                },
            },
        })
    }

    /// Resources with every dependency ahead of its dependents.
    pub fn resources(&self) -> Vec<Resource<'_>> {
        vec![
            Resource::Role(&self.role),
            Resource::Table(&self.table),
            Resource::Function(&self.function),
            Resource::LogGroup(&self.log_group),
            Resource::Rule(&self.rule),
            Resource::Permission(&self.permission),
        ]
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        let mut parameters = vec![
            Parameter {
                name: ASSET_BUCKET_PARAM,
                description: "S3 bucket holding the packaged poller artifact",
                no_echo: false,
            },
            Parameter {
                name: ASSET_KEY_PARAM,
                description: "S3 key of the packaged poller artifact",
                no_echo: false,
            },
        ];

        for value in self.function.environment.values() {
            if let &EnvValue::Parameter(name) = value {
                parameters.push(Parameter {
                    name,
                    description: secret_description(name),
                    no_echo: true,
                });
            }
        }

        parameters
    }

    /// Pairs every declared parameter with its deploy-time value.
    pub fn bind_parameters(
        &self,
        config: &StackConfig,
        code: &CodeLocation,
    ) -> Result<BTreeMap<&'static str, String>, Error> {
        let mut values = BTreeMap::new();
        for parameter in self.parameters() {
            let value = match parameter.name {
                ASSET_BUCKET_PARAM => code.bucket.clone(),
                ASSET_KEY_PARAM => code.key.clone(),
                STRATZ_JWT_PARAM => config.jwt_token.expose().to_string(),
                DISCORD_WEBHOOK_PARAM => config.webhook_url.expose().to_string(),
                KOOK_TOKEN_PARAM => config
                    .messaging_token
                    .as_ref()
                    .map(|token| token.expose().to_string())
                    .ok_or_else(|| {
                        Error::InvalidConfig("messagingToken is required by the stack".into())
                    })?,
                other => {
                    return Err(Error::InvalidConfig(format!("no value for parameter {other}")))
                }
            };
            values.insert(parameter.name, value);
        }

        Ok(values)
    }
}

fn secret_description(parameter: &str) -> &'static str {
    match parameter {
        STRATZ_JWT_PARAM => "Bearer token for the match data GraphQL API",
        DISCORD_WEBHOOK_PARAM => "Webhook URL for chat notifications",
        KOOK_TOKEN_PARAM => "Bot token for the additional messaging platform",
        _ => "Secret injected into the poller environment",
    }
}

fn validate_config(config: &StackConfig) -> Result<(), Error> {
    if config.schedule_interval_minutes == 0 {
        return Err(Error::InvalidConfig(
            "scheduleIntervalMinutes must be a positive number of minutes".into(),
        ));
    }
    if config.read_capacity == 0 || config.write_capacity == 0 {
        return Err(Error::InvalidConfig(format!(
            "table capacities must be positive, got read={} write={}",
            config.read_capacity, config.write_capacity
        )));
    }
    if !(1..=MAX_TIMEOUT_SECONDS).contains(&config.timeout_seconds) {
        return Err(Error::InvalidConfig(format!(
            "timeoutSeconds must be within 1..={MAX_TIMEOUT_SECONDS}, got {}",
            config.timeout_seconds
        )));
    }
    if !LOG_RETENTION_DAYS.contains(&config.log_retention_days) {
        return Err(Error::InvalidConfig(format!(
            "logRetentionDays {} is not a supported retention period",
            config.log_retention_days
        )));
    }
    validate_table_name(&config.table_name)?;
    if config.artifact_path.as_os_str().is_empty() {
        return Err(Error::InvalidConfig("artifactPath must not be empty".into()));
    }

    Ok(())
}

fn validate_table_name(name: &str) -> Result<(), Error> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !(3..=255).contains(&name.len()) || !valid_chars {
        return Err(Error::InvalidConfig(format!("invalid table name {name:?}")));
    }
    Ok(())
}

pub(crate) fn validate_environment(environment: &BTreeMap<String, EnvValue>) -> Result<(), Error> {
    for key in environment.keys() {
        let mut chars = key.chars();
        let well_formed = chars.next().map_or(false, |c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !well_formed {
            return Err(Error::InvalidConfig(format!(
                "invalid environment variable name {key:?}"
            )));
        }
        if RESERVED_ENV_KEYS.contains(&key.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "environment variable {key} is reserved by the Lambda runtime"
            )));
        }
    }
    Ok(())
}
