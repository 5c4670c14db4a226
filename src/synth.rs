use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracker_infra::common::init_tracing;
use tracker_infra::{template, Error, StackConfig, StackDefinition};

/// Render the poller stack as a CloudFormation template
#[derive(Parser)]
#[command(name = "synth")]
struct Args {
    /// JSON stack configuration; defaults apply when omitted
    #[arg(long, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,
    /// Write the template here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Error> {
    init_tracing();
    let args = Args::parse();

    let config = StackConfig::load(args.config.as_deref())?;
    let pending = config.unsubstituted_placeholders();
    if !pending.is_empty() {
        warn!(
            "Placeholders remain for {}; deploy will refuse this configuration without --allow-placeholders",
            pending.join(", ")
        );
    }

    let stack = StackDefinition::from_config(&config)?;
    let body = template::to_json_string(&stack)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &body)?;
            info!("Template written to {}", path.display());
        }
        None => println!("{body}"),
    }

    Ok(())
}
