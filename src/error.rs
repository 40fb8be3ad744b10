//! Error handling for telstra-mobile
//!
//! Errors are layered the way the USSD stack is layered: transport faults from
//! the modem, menu-shape faults from the navigator, domain faults from the
//! account facade and configuration faults from the property store. Each layer
//! has its own enum and result alias, and everything converts into
//! [`MobileError`] for callers that do not care which layer failed.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for telstra-mobile operations
#[derive(Debug, Clone)]
pub enum MobileError {
    /// Modem / serial / timeout faults
    Transport(TransportError),
    /// Carrier menu did not have the expected shape
    Menu(MenuError),
    /// Account-level failures (transfer refused, feature missing, ...)
    Account(AccountError),
    /// Configuration errors
    Config(ConfigError),
}

/// Faults raised by a [`crate::ussd::Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Serial port could not be opened or failed mid-exchange
    Serial { port: String, message: String },
    /// No complete response within the allowed time
    Timeout { operation: String, timeout_ms: u64 },
    /// The transport was used after `close()`
    Closed,
    /// The modem answered with an error result code
    ModemError { command: String, response: String },
    /// SIM PIN required but missing or refused
    PinRejected,
}

/// Faults in the shape of a carrier menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuError {
    /// None of the wanted labels is offered by the current screen
    OptionNotFound { label: String, available: Vec<String> },
    /// "More" pagination did not finish within the page cap
    PageLimitExceeded { limit: usize },
}

/// Domain faults raised by the account facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Transfer amount outside the carrier's limits
    InvalidAmount { amount: i64, min: i64, max: i64 },
    /// Not enough credit to complete the transfer
    InsufficientCredit { message: String },
    /// Carrier refused the transfer because of its transfer limit
    TransferLimitExceeded { message: String },
    /// Confirmation screen was not recognised; nothing was confirmed
    UnconfirmedTransfer { message: String },
    /// The account tier does not offer this feature
    FeatureUnavailable { feature: String, reason: String },
    /// A screen could not be interpreted
    UnexpectedResponse { operation: String, message: String },
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration parameter
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Missing required configuration
    MissingRequired { parameter: String },
    /// Configuration or state file error
    FileError { path: String, error: String },
}

impl MobileError {
    /// True for faults of the communication layer, the faults autodetection
    /// skips over
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, MobileError::Transport(_))
    }

    /// True when the underlying fault is a protocol timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, MobileError::Transport(TransportError::Timeout { .. }))
    }
}

impl fmt::Display for MobileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MobileError::Transport(err) => write!(f, "Transport error: {err}"),
            MobileError::Menu(err) => write!(f, "Menu error: {err}"),
            MobileError::Account(err) => write!(f, "Account error: {err}"),
            MobileError::Config(err) => write!(f, "Configuration error: {err}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Serial { port, message } =>
                write!(f, "Serial error on {port}: {message}"),
            TransportError::Timeout { operation, timeout_ms } =>
                write!(f, "Timed out after {timeout_ms}ms waiting for {operation}"),
            TransportError::Closed =>
                write!(f, "Transport is closed"),
            TransportError::ModemError { command, response } =>
                write!(f, "Modem rejected '{command}': {response}"),
            TransportError::PinRejected =>
                write!(f, "SIM PIN missing or rejected"),
        }
    }
}

impl fmt::Display for MenuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuError::OptionNotFound { label, available } =>
                write!(f, "Menu option '{label}' not found; available: [{}]", available.join(", ")),
            MenuError::PageLimitExceeded { limit } =>
                write!(f, "Menu kept offering 'More' after {limit} pages"),
        }
    }
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::InvalidAmount { amount, min, max } =>
                write!(f, "Invalid transfer amount ${amount}: must be a whole dollar amount between ${min} and ${max}"),
            AccountError::InsufficientCredit { message } =>
                write!(f, "Insufficient credit: {message}"),
            AccountError::TransferLimitExceeded { message } =>
                write!(f, "Transfer limit exceeded: {message}"),
            AccountError::UnconfirmedTransfer { message } =>
                write!(f, "Transfer confirmation not recognised: {message}"),
            AccountError::FeatureUnavailable { feature, reason } =>
                write!(f, "Feature '{feature}' unavailable: {reason}"),
            AccountError::UnexpectedResponse { operation, message } =>
                write!(f, "Unexpected response to {operation}: {message}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } =>
                write!(f, "Invalid configuration parameter '{parameter}' = '{value}': {reason}"),
            ConfigError::MissingRequired { parameter } =>
                write!(f, "Missing required configuration parameter: {parameter}"),
            ConfigError::FileError { path, error } =>
                write!(f, "File error '{path}': {error}"),
        }
    }
}

impl StdError for MobileError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MobileError::Transport(err) => Some(err),
            MobileError::Menu(err) => Some(err),
            MobileError::Account(err) => Some(err),
            MobileError::Config(err) => Some(err),
        }
    }
}

impl StdError for TransportError {}
impl StdError for MenuError {}
impl StdError for AccountError {}
impl StdError for ConfigError {}

impl From<TransportError> for MobileError {
    fn from(err: TransportError) -> Self {
        MobileError::Transport(err)
    }
}

impl From<MenuError> for MobileError {
    fn from(err: MenuError) -> Self {
        MobileError::Menu(err)
    }
}

impl From<AccountError> for MobileError {
    fn from(err: AccountError) -> Self {
        MobileError::Account(err)
    }
}

impl From<ConfigError> for MobileError {
    fn from(err: ConfigError) -> Self {
        MobileError::Config(err)
    }
}

/// Result type alias for telstra-mobile operations
pub type MobileResult<T> = Result<T, MobileError>;

/// Specialized result types for different layers
pub type TransportResult<T> = Result<T, TransportError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
