use std::path::PathBuf;

use aws_config::BehaviorVersion;
use clap::Parser;
use tracing::info;
use tracker_infra::common::{init_tracing, GUILD_ID_DEFAULT};
use tracker_infra::provision::table::{seed, SeedOutcome};
use tracker_infra::{Error, StackConfig};

/// Write the starting row the poller expects in the guild table
#[derive(Parser)]
#[command(name = "seed-table")]
struct Args {
    /// JSON stack configuration, used for the table name
    #[arg(long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides the configured table name
    #[arg(long, env = "TABLE_NAME")]
    table_name: Option<String>,
    /// Partition key of the row (the guild id)
    #[arg(long, default_value_t = GUILD_ID_DEFAULT)]
    id: i64,
    /// Last match already published; newer matches get posted
    #[arg(long, default_value_t = 0)]
    match_id: i64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let args = Args::parse();

    let table_name = match args.table_name {
        Some(name) => name,
        None => StackConfig::load(args.config.as_deref())?.table_name,
    };

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let dynamo_client = aws_sdk_dynamodb::Client::new(&aws_config);

    match seed(&dynamo_client, &table_name, args.id, args.match_id).await? {
        SeedOutcome::Inserted => info!("{table_name}: row {} created", args.id),
        SeedOutcome::AlreadyPresent => info!("{table_name}: row {} kept as is", args.id),
    }

    Ok(())
}
