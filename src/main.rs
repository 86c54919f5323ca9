use clap::Parser;
use trend_agent::cli::{Cli, Commands};
use trend_agent::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using bundled example configuration");
            Config::from_toml(include_str!("../config.toml.example"))?
        }
    };
    config.apply_env();

    // Initialize telemetry
    let _telemetry = trend_agent::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(once = args.once, "Starting trend agent");
            args.execute(&config).await?;
        }
        Commands::Status(args) => {
            args.execute(&config)?;
        }
        Commands::Config => {
            println!("Current configuration:");
            print!("{}", toml::to_string_pretty(&config)?);
            if config.notifier.credentials().is_none() {
                println!("# Telegram credentials not set, notifications are logged only");
            }
        }
    }

    Ok(())
}
