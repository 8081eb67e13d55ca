use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ledger_quotes::app::{self, UpdateOptions};
use ledger_quotes::checkpoint::JsonCheckpointStore;
use ledger_quotes::clock::SystemClock;
use ledger_quotes::config::{default_config_path, ResolvedConfig};
use ledger_quotes::error::UpdateError;
use ledger_quotes::logging::{self, LogConfig};
use ledger_quotes::quotes::{HelperCommand, HelperFetcher};
use tracing::error;

#[derive(Parser)]
#[command(name = "ledger-quotes")]
#[command(about = "Fetch commodity prices into a ledger, resuming where the last run stopped")]
#[command(version)]
struct Cli {
    /// Ledger file to update
    #[arg(short = 'f', long = "file", value_name = "LEDGER")]
    ledger: PathBuf,

    /// Log config file (TOML). Defaults to $LEDGER_QUOTES_LOG_CFG if set.
    #[arg(short = 'l', long = "logconfig", value_name = "FILE")]
    log_config: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Quote helper command line, e.g. `--helper "perl /opt/fq/gnc-fq-helper"`
    #[arg(long, value_name = "CMD")]
    helper: Option<String>,

    /// Checkpoint store, overriding `state_file` from the config
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Print the order the next run would visit commodities in, then exit
    #[arg(long)]
    show_order: bool,
}

impl Cli {
    /// `--helper` split into program and arguments on whitespace.
    fn helper_argv(&self) -> Vec<String> {
        self.helper
            .as_deref()
            .map(|line| line.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}

async fn run(cli: Cli) -> Result<(), UpdateError> {
    let mut config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    if let Some(helper) = HelperCommand::from_argv(&cli.helper_argv(), config.helper.timeout) {
        config.helper = helper;
    }
    if let Some(state) = cli.state {
        config.state_file = state;
    }

    let checkpoints = JsonCheckpointStore::new(&config.state_file);

    if cli.show_order {
        let (resume_after, ordered) = app::plan(&cli.ledger, &checkpoints).await?;
        match resume_after {
            Some(symbol) => println!("Resuming after {symbol}"),
            None => println!("No checkpoint, starting from the beginning"),
        }
        for commodity in ordered {
            println!(
                "{:<12} {:<10} {}",
                commodity.symbol,
                commodity.namespace,
                commodity.quote_source.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let fetcher = HelperFetcher::new(config.helper.clone())?;
    let options = UpdateOptions::new(&cli.ledger)
        .with_sources(config.sources.clone())
        .with_retry(config.retry.clone());

    app::update_prices(&options, &fetcher, &checkpoints, &SystemClock).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = match LogConfig::resolve(cli.log_config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&log_config);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "price update failed");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
