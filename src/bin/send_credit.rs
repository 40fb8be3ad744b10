use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Local};
use clap::Parser;
use telstra_mobile::logging::init_logging;
use telstra_mobile::{autodetect_serial_account, default_config_path, load_config, CarrierConfig, RunState};

/// Send credit to another service with CreditMe2U, at most once per period
#[derive(Parser, Debug)]
#[command(name = "send-credit", version, about)]
struct Cli {
    /// Phone number to send credit to
    phone_number: String,

    /// Amount of credit in whole dollars
    amount: i64,

    /// Days to wait before this script may send credit again
    #[arg(short, long, default_value_t = 10)]
    next_run: i64,

    /// File holding the time of the last successful transfer
    #[arg(short, long, default_value = "send_credit.data")]
    data_location: PathBuf,

    /// Send from the modem whose SIM has this phone number
    #[arg(long)]
    from: Option<String>,

    /// SIM PIN, if the SIM is locked
    #[arg(long)]
    pin: Option<String>,

    /// Carrier configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn carrier_config(path: Option<PathBuf>) -> CarrierConfig {
    let path = path.unwrap_or_else(default_config_path);
    load_config(&path).unwrap_or_else(|e| {
        log::warn!("{e}; using default carrier settings");
        CarrierConfig::new()
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let state = RunState::new(&cli.data_location);
    if !state
        .is_due(Local::now(), Duration::days(cli.next_run))
        .context("couldn't read the run state file")?
    {
        log::info!("Credit was sent less than {} day(s) ago, nothing to do", cli.next_run);
        return Ok(());
    }

    let config = carrier_config(cli.config);
    let mut account = autodetect_serial_account(&config, cli.from.as_deref(), cli.pin.as_deref())?
        .context("couldn't detect a suitable modem or account")?;

    log::info!("Running send credit script...");
    let result = account
        .transfer_credit(&cli.phone_number, cli.amount)
        .map(|done| done.text().trim().to_string())
        .with_context(|| format!("failed to send ${} credit to {}", cli.amount, cli.phone_number));

    if let Err(e) = account.close() {
        log::warn!("Failed to close modem: {e}");
    }

    let receipt = result?;
    state.record(Local::now())?;
    log::info!("Credit sent successfully: {receipt}");
    println!("Sent ${} credit to {}.", cli.amount, cli.phone_number);
    Ok(())
}
