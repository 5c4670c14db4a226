use std::path::PathBuf;

use aws_config::BehaviorVersion;
use clap::Parser;
use tracing::info;
use tracker_infra::common::{init_tracing, STACK_NAME_DEFAULT};
use tracker_infra::provision::cloudformation::{
    preflight, CloudFormationDeployer, PlaceholderPolicy,
};
use tracker_infra::provision::{asset, table};
use tracker_infra::{template, Error, StackConfig, StackDefinition};

/// Package the poller, then create or update its stack
#[derive(Parser)]
#[command(name = "deploy")]
struct Args {
    /// JSON stack configuration; defaults apply when omitted
    #[arg(long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "STACK_NAME", default_value = STACK_NAME_DEFAULT)]
    stack_name: String,
    /// Bucket the packaged artifact is uploaded to
    #[arg(long, env = "ASSET_BUCKET")]
    asset_bucket: String,
    /// Skip comparing the live table with the definition afterwards
    #[arg(long)]
    skip_verify: bool,
    /// Deploy even if a secret looks like an unfilled placeholder
    #[arg(long)]
    allow_placeholders: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let args = Args::parse();

    let config = StackConfig::load(args.config.as_deref())?;
    let policy = if args.allow_placeholders {
        PlaceholderPolicy::Allow
    } else {
        PlaceholderPolicy::Block
    };
    preflight(&config, policy)?;

    let stack = StackDefinition::from_config(&config)?;
    let template_body = template::to_json_string(&stack)?;
    let artifact = asset::package(&stack.function.artifact_path)?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let cloudformation_client = aws_sdk_cloudformation::Client::new(&aws_config);
    let dynamo_client = aws_sdk_dynamodb::Client::new(&aws_config);

    let (code, _) = asset::upload(&s3_client, &args.asset_bucket, &artifact).await?;
    let parameters = stack.bind_parameters(&config, &code)?;

    let deployer = CloudFormationDeployer::new(cloudformation_client);
    let action = deployer
        .deploy(&args.stack_name, &template_body, &parameters)
        .await?;
    info!("Stack {}: {action:?}", args.stack_name);

    if !args.skip_verify {
        table::verify(&dynamo_client, &stack.table).await?;
    }

    Ok(())
}
