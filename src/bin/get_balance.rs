use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use telstra_mobile::logging::init_logging;
use telstra_mobile::{autodetect_serial_account, default_config_path, load_config, Account, CarrierConfig, SerialModem};

/// Print the credit balance and expiry date of a prepaid service
#[derive(Parser, Debug)]
#[command(name = "get-balance", version, about)]
struct Cli {
    /// Use the modem whose SIM has this phone number
    #[arg(short, long)]
    phone_number: Option<String>,

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

fn report(account: &mut Account<SerialModem>, phone_number: Option<&str>) -> Result<()> {
    let number = match phone_number {
        Some(number) => number.to_string(),
        None => account.phone_number().context("failed to read phone number")?.to_string(),
    };

    match account.balance().context("failed to get balance")? {
        Some(balance) => println!("Credit balance for {number} is ${balance}."),
        None => println!("No credit balance shown for {number}."),
    }
    if let Some(expiry) = account.expiry_date().context("failed to get expiry date")? {
        println!("Credit expires on {}.", expiry.format("%d %B %Y"));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = carrier_config(cli.config);

    let Some(mut account) = autodetect_serial_account(&config, cli.phone_number.as_deref(), cli.pin.as_deref())?
    else {
        log::error!("Couldn't detect a suitable modem or account.");
        std::process::exit(1);
    };

    let result = report(&mut account, cli.phone_number.as_deref());
    if let Err(e) = account.close() {
        log::warn!("Failed to close modem: {e}");
    }
    result
}
