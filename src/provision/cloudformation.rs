use std::collections::BTreeMap;
use std::time::Duration;

use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::{Capability, Parameter};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::common::errors::Error;
use crate::config::StackConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";
const MISSING_STACK_MESSAGE: &str = "does not exist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackProgress {
    InProgress,
    Succeeded,
    Failed,
}

impl StackProgress {
    pub fn from_status(status: &str) -> Self {
        match status {
            s if s.ends_with("_IN_PROGRESS") => Self::InProgress,
            "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE" => Self::Succeeded,
            _ => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    Created,
    Updated,
    Unchanged,
}

/// What `preflight` does with secrets that look unfilled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderPolicy {
    #[default]
    Block,
    /// The operator vouched for the values; only warn.
    Allow,
}

/// Refuses configurations whose secrets are still placeholders, unless the policy
/// allows them.
pub fn preflight(config: &StackConfig, policy: PlaceholderPolicy) -> Result<(), Error> {
    let pending = config.unsubstituted_placeholders();
    if pending.is_empty() {
        return Ok(());
    }

    match policy {
        PlaceholderPolicy::Block => {
            error!(
                "Deployment blocked, placeholders remain for {} (pass --allow-placeholders if these values are real)",
                pending.join(", ")
            );
            Err(Error::UnsubstitutedPlaceholders(pending))
        }
        PlaceholderPolicy::Allow => {
            warn!("Deploying with values that look like placeholders: {}", pending.join(", "));
            Ok(())
        }
    }
}

/// A stack left in `ROLLBACK_COMPLETE` after a failed create cannot be updated.
pub fn requires_recreate(status: &str) -> bool {
    status == "ROLLBACK_COMPLETE"
}

fn is_no_update(message: Option<&str>) -> bool {
    message.map_or(false, |m| m.contains(NO_UPDATES_MESSAGE))
}

fn is_missing_stack(message: Option<&str>) -> bool {
    message.map_or(false, |m| m.contains(MISSING_STACK_MESSAGE))
}

fn to_parameters(values: &BTreeMap<&'static str, String>) -> Vec<Parameter> {
    values
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(*key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

pub struct CloudFormationDeployer {
    client: aws_sdk_cloudformation::Client,
    poll_interval: Duration,
}

impl CloudFormationDeployer {
    pub fn new(client: aws_sdk_cloudformation::Client) -> Self {
        Self {
            client,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Creates or updates `stack_name` and waits for it to settle.
    #[tracing::instrument(skip(self, template_body, parameters))]
    pub async fn deploy(
        &self,
        stack_name: &str,
        template_body: &str,
        parameters: &BTreeMap<&'static str, String>,
    ) -> Result<DeployAction, Error> {
        let action = match self.current_status(stack_name).await? {
            None => {
                info!("Creating stack");
                self.client
                    .create_stack()
                    .stack_name(stack_name)
                    .template_body(template_body)
                    .set_parameters(Some(to_parameters(parameters)))
                    .capabilities(Capability::CapabilityIam)
                    .send()
                    .await
                    .map_err(Error::aws)?;
                DeployAction::Created
            }
            Some(status) if requires_recreate(&status) => {
                error!("Stack is in {status}; delete it before deploying again");
                return Err(Error::StackFailed {
                    stack: stack_name.to_string(),
                    status,
                });
            }
            Some(status) => {
                info!("Updating stack currently in {status}");
                let result = self
                    .client
                    .update_stack()
                    .stack_name(stack_name)
                    .template_body(template_body)
                    .set_parameters(Some(to_parameters(parameters)))
                    .capabilities(Capability::CapabilityIam)
                    .send()
                    .await;
                match result {
                    Ok(_) => DeployAction::Updated,
                    Err(err) if is_no_update(err.as_service_error().and_then(|e| e.message())) => {
                        info!("Stack is already up to date");
                        return Ok(DeployAction::Unchanged);
                    }
                    Err(err) => return Err(Error::aws(err)),
                }
            }
        };

        let status = self.wait_for_completion(stack_name).await?;
        info!("Stack settled in {status}");
        Ok(action)
    }

    async fn current_status(&self, stack_name: &str) -> Result<Option<String>, Error> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .stacks()
                .first()
                .and_then(|stack| stack.stack_status())
                .map(|status| status.as_str().to_string())),
            Err(err) if is_missing_stack(err.as_service_error().and_then(|e| e.message())) => {
                Ok(None)
            }
            Err(err) => Err(Error::aws(err)),
        }
    }

    /// Polls until the stack leaves every `*_IN_PROGRESS` state.
    pub async fn wait_for_completion(&self, stack_name: &str) -> Result<String, Error> {
        loop {
            let status = self.current_status(stack_name).await?.ok_or_else(|| {
                Error::StackFailed {
                    stack: stack_name.to_string(),
                    status: "DELETED".into(),
                }
            })?;

            match StackProgress::from_status(&status) {
                StackProgress::InProgress => {
                    info!("Waiting on {stack_name}: {status}");
                    sleep(self.poll_interval).await;
                }
                StackProgress::Succeeded => return Ok(status),
                StackProgress::Failed => {
                    warn!("Stack {stack_name} ended in {status}");
                    return Err(Error::StackFailed {
                        stack: stack_name.to_string(),
                        status,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[test]
    fn classifies_stack_statuses() {
        assert_eq!(StackProgress::from_status("CREATE_IN_PROGRESS"), StackProgress::InProgress);
        assert_eq!(
            StackProgress::from_status("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            StackProgress::InProgress
        );
        assert_eq!(StackProgress::from_status("CREATE_COMPLETE"), StackProgress::Succeeded);
        assert_eq!(StackProgress::from_status("UPDATE_COMPLETE"), StackProgress::Succeeded);
        assert_eq!(StackProgress::from_status("ROLLBACK_COMPLETE"), StackProgress::Failed);
        assert_eq!(
            StackProgress::from_status("UPDATE_ROLLBACK_COMPLETE"),
            StackProgress::Failed
        );
        assert_eq!(StackProgress::from_status("CREATE_FAILED"), StackProgress::Failed);
    }

    #[test]
    fn only_rollback_complete_requires_recreate() {
        assert!(requires_recreate("ROLLBACK_COMPLETE"));
        assert!(!requires_recreate("UPDATE_ROLLBACK_COMPLETE"));
        assert!(!requires_recreate("CREATE_COMPLETE"));
    }

    #[test]
    fn recognizes_engine_messages() {
        assert!(is_no_update(Some("No updates are to be performed.")));
        assert!(!is_no_update(Some("Template format error")));
        assert!(!is_no_update(None));
        assert!(is_missing_stack(Some("Stack with id tracker does not exist")));
    }

    #[test]
    fn preflight_blocks_placeholder_secrets() {
        let config = StackConfig {
            jwt_token: Secret::new("<STRATZ_JWT>"),
            webhook_url: Secret::new("<DISCORD_WEBHOOK_URL>"),
            ..StackConfig::default()
        };

        let err = preflight(&config, PlaceholderPolicy::Block).unwrap_err();

        assert!(matches!(
            err,
            Error::UnsubstitutedPlaceholders(ref names) if names == &vec!["jwtToken", "webhookUrl"]
        ));
    }

    #[test]
    fn preflight_passes_substituted_secrets() {
        let config = StackConfig {
            jwt_token: Secret::new("eyJhbGciOiJIUzI1NiJ9.e30.sig"),
            webhook_url: Secret::new("https://discord.com/api/webhooks/1/abc"),
            ..StackConfig::default()
        };
        assert!(preflight(&config, PlaceholderPolicy::Block).is_ok());
    }

    #[test]
    fn preflight_blocks_fillers_inside_values() {
        let config = StackConfig {
            jwt_token: Secret::new("your-jwt-here"),
            webhook_url: Secret::new("https://discord.com/api/webhooks/ID/TOKEN"),
            ..StackConfig::default()
        };
        assert!(matches!(
            preflight(&config, PlaceholderPolicy::default()),
            Err(Error::UnsubstitutedPlaceholders(ref names)) if names.len() == 2
        ));
    }

    #[test]
    fn allow_policy_lets_flagged_values_through() {
        let config = StackConfig {
            jwt_token: Secret::new("eyJhbGci.abc-TODO-q.sig"),
            webhook_url: Secret::new("https://discord.com/api/webhooks/1/abc"),
            ..StackConfig::default()
        };
        assert!(preflight(&config, PlaceholderPolicy::Block).is_err());
        assert!(preflight(&config, PlaceholderPolicy::Allow).is_ok());
    }

    #[test]
    fn parameters_keep_key_order() {
        let mut values = BTreeMap::new();
        values.insert("StratzJwt", "jwt".to_string());
        values.insert("AssetKey", "assets/a.zip".to_string());

        let parameters = to_parameters(&values);

        assert_eq!(parameters[0].parameter_key(), Some("AssetKey"));
        assert_eq!(parameters[1].parameter_value(), Some("jwt"));
    }
}
