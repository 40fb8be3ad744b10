//! telstra-mobile: prepaid mobile account automation over USSD
//!
//! Reads the balance and expiry of a prepaid service and sends CreditMe2U
//! transfers by walking the carrier's USSD menus through a cellular modem.

/// Carrier codes, menu wording and modem settings
pub mod config;

/// Error types and per-layer result aliases
pub mod error;

/// USSD menu parsing, navigation and text extraction
pub mod ussd;

/// AT-command modem transport over serial ports
pub mod modem;

/// Domain operations on one account
pub mod account;

/// Finding an account across candidate ports
pub mod autodetect;

/// Logger setup for the binaries
pub mod logging;

/// Last-run stamp for scheduled transfers
pub mod run_state;

/// Scripted transport for tests and dry runs
pub mod testing;

pub use account::{Account, AccountKind};
pub use autodetect::{phone_number_is, Autodetector, PortEnumerator, TransportFactory};
pub use config::{default_config_path, load_config, save_config, CarrierConfig, ConfigValue};
pub use error::{
    AccountError, ConfigError, MenuError, MobileError, MobileResult, TransportError, TransportResult,
};
pub use modem::{autodetect_serial_account, AtModem, SerialModem, SerialModemFactory, SerialPorts};
pub use run_state::RunState;
pub use ussd::{Menu, MenuResponse, Money, Session, SessionStatus, Step, Transport};
