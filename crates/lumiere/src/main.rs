//! Lumiere CLI binary.
//!
//! This binary provides command-line access to Lumiere:
//! - Generate lecture videos for one topic or a topic list
//! - Score finished videos
//! - Show the effective configuration

use clap::Parser;
use lumiere::{LoggingConfig, LumiereConfig, init_logging};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, evaluate_videos, run_topics};

    // Parse command-line arguments
    let cli = Cli::parse();

    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    init_logging(
        &LoggingConfig::new()
            .with_verbose(cli.verbose)
            .with_json_logs(cli.log_json),
    )?;

    let config = match &cli.config {
        Some(path) => LumiereConfig::from_file(path)?,
        None => LumiereConfig::load()?,
    };

    match cli.command {
        Commands::Run(args) => {
            let summary = run_topics(&config, args).await?;
            println!("{}", summary);
            if summary.succeeded() == 0 {
                return Err("no topic produced a lecture video".into());
            }
        }

        Commands::Evaluate(args) => {
            let to_stdout = args.report.is_none();
            let report = evaluate_videos(&config, args).await?;
            if to_stdout {
                println!("{}", report);
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
