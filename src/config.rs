//! Carrier configuration for telstra-mobile
//!
//! The carrier's USSD codes, menu wording and transfer limits change over
//! time, so they live in a property map rather than in constants. Properties
//! are typed [`ConfigValue`]s, serialised to JSON, and overlaid on defaults
//! when loaded from disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const MAIN_MENU_CODE: &str = "ussd.mainMenu";
pub const PHONE_NUMBER_CODE: &str = "ussd.phoneNumber";
pub const ACCOUNT_TYPE_CODE: &str = "ussd.accountType";
pub const CANCEL_CODE: &str = "ussd.cancelCode";
pub const CONFIRM_CODE: &str = "ussd.confirmCode";
pub const MAX_PAGES: &str = "ussd.maxPages";
pub const RECHARGE_LABELS: &str = "labels.recharge";
pub const CREDIT_TRANSFER_LABELS: &str = "labels.creditTransfer";
pub const BALANCE_DETAILS_LABELS: &str = "labels.balanceDetails";
pub const MORE_LABELS: &str = "labels.more";
pub const CALL_CREDIT_MARKER: &str = "markers.callCredit";
pub const INSUFFICIENT_CREDIT_MARKER: &str = "markers.insufficientCredit";
pub const TRANSFER_LIMIT_MARKER: &str = "markers.transferLimit";
pub const TRANSFER_MIN: &str = "transfer.minDollars";
pub const TRANSFER_MAX: &str = "transfer.maxDollars";
pub const BAUD_RATE: &str = "modem.baudRate";
pub const TIMEOUT_SECS: &str = "modem.timeoutSecs";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "TELSTRA_MOBILE_CONFIG";

/// Supported configuration value types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    StringArray(Vec<String>),
}

impl ConfigValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_string_array(&self) -> Option<&Vec<String>> {
        match self {
            ConfigValue::StringArray(arr) => Some(arr),
            _ => None,
        }
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::StringArray(value)
    }
}

impl From<&[&str]> for ConfigValue {
    fn from(value: &[&str]) -> Self {
        ConfigValue::StringArray(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Carrier vocabulary and modem settings
#[derive(Debug, Clone, PartialEq)]
pub struct CarrierConfig {
    properties: HashMap<String, ConfigValue>,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CarrierConfig {
    /// Create a configuration populated with the carrier defaults
    pub fn new() -> Self {
        let mut config = Self {
            properties: HashMap::new(),
        };
        config.set_defaults();
        config
    }

    fn set_defaults(&mut self) {
        // USSD request codes
        self.properties.insert(MAIN_MENU_CODE.to_string(), "#100#".into());
        self.properties.insert(PHONE_NUMBER_CODE.to_string(), "#150#".into());
        self.properties.insert(ACCOUNT_TYPE_CODE.to_string(), "#125#".into());
        self.properties.insert(CANCEL_CODE.to_string(), "00".into());
        self.properties.insert(CONFIRM_CODE.to_string(), "1".into());
        self.properties.insert(MAX_PAGES.to_string(), 10i64.into());

        // Menu wording, aliases in preference order
        self.properties.insert(RECHARGE_LABELS.to_string(), (&["Recharge"][..]).into());
        self.properties.insert(
            CREDIT_TRANSFER_LABELS.to_string(),
            (&["CreditMe2U", "CredMe2U", "Credit Me2U"][..]).into(),
        );
        self.properties.insert(BALANCE_DETAILS_LABELS.to_string(), (&["Bal Details"][..]).into());
        self.properties.insert(MORE_LABELS.to_string(), (&["More"][..]).into());

        // Screen markers
        self.properties.insert(CALL_CREDIT_MARKER.to_string(), "Call Cred Bal".into());
        self.properties.insert(INSUFFICIENT_CREDIT_MARKER.to_string(), "Insufficient credit".into());
        self.properties.insert(TRANSFER_LIMIT_MARKER.to_string(), "transfer limit".into());

        // CreditMe2U limits in whole dollars
        self.properties.insert(TRANSFER_MIN.to_string(), 1i64.into());
        self.properties.insert(TRANSFER_MAX.to_string(), 10i64.into());

        // Modem settings
        self.properties.insert(BAUD_RATE.to_string(), 9600i64.into());
        self.properties.insert(TIMEOUT_SECS.to_string(), 15i64.into());
    }

    /// Get configuration property as string
    pub fn get_string_property(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|v| v.as_string().map(|s| s.to_string()))
    }

    /// Get configuration property as string with default
    pub fn get_string_property_or(&self, key: &str, default: &str) -> String {
        self.get_string_property(key).unwrap_or_else(|| default.to_string())
    }

    /// Get configuration property as integer
    pub fn get_int_property(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(|v| v.as_integer())
    }

    /// Get configuration property as integer with default
    pub fn get_int_property_or(&self, key: &str, default: i64) -> i64 {
        self.get_int_property(key).unwrap_or(default)
    }

    /// Get configuration property as string array
    pub fn get_string_array_property(&self, key: &str) -> Option<&Vec<String>> {
        self.properties.get(key).and_then(|v| v.as_string_array())
    }

    /// Set configuration property
    pub fn set_property<T: Into<ConfigValue>>(&mut self, key: &str, value: T) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn main_menu_code(&self) -> String {
        self.get_string_property_or(MAIN_MENU_CODE, "#100#")
    }

    pub fn phone_number_code(&self) -> String {
        self.get_string_property_or(PHONE_NUMBER_CODE, "#150#")
    }

    pub fn account_type_code(&self) -> String {
        self.get_string_property_or(ACCOUNT_TYPE_CODE, "#125#")
    }

    pub fn cancel_code(&self) -> String {
        self.get_string_property_or(CANCEL_CODE, "00")
    }

    pub fn confirm_code(&self) -> String {
        self.get_string_property_or(CONFIRM_CODE, "1")
    }

    pub fn max_pages(&self) -> usize {
        self.get_int_property_or(MAX_PAGES, 10).max(1) as usize
    }

    /// Menu labels for `key`, in the order they should be tried
    pub fn labels(&self, key: &str) -> Vec<String> {
        self.get_string_array_property(key).cloned().unwrap_or_default()
    }

    pub fn marker(&self, key: &str) -> String {
        self.get_string_property_or(key, "")
    }

    /// Inclusive whole-dollar transfer range
    pub fn transfer_range(&self) -> (i64, i64) {
        (self.get_int_property_or(TRANSFER_MIN, 1), self.get_int_property_or(TRANSFER_MAX, 10))
    }

    pub fn baud_rate(&self) -> u32 {
        self.get_int_property_or(BAUD_RATE, 9600).clamp(300, 4_000_000) as u32
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.get_int_property_or(TIMEOUT_SECS, 15).max(1) as u64)
    }

    /// Check the values a session cannot run without
    pub fn validate(&self) -> ConfigResult<()> {
        for key in [MAIN_MENU_CODE, PHONE_NUMBER_CODE, ACCOUNT_TYPE_CODE, CANCEL_CODE, CONFIRM_CODE] {
            match self.get_string_property(key) {
                Some(value) if !value.trim().is_empty() => {}
                _ => return Err(ConfigError::MissingRequired { parameter: key.to_string() }),
            }
        }

        for key in [RECHARGE_LABELS, CREDIT_TRANSFER_LABELS, BALANCE_DETAILS_LABELS, MORE_LABELS] {
            if self.labels(key).is_empty() {
                return Err(ConfigError::MissingRequired { parameter: key.to_string() });
            }
        }

        let (min, max) = self.transfer_range();
        if min < 1 || max < min {
            return Err(ConfigError::InvalidParameter {
                parameter: format!("{TRANSFER_MIN}..{TRANSFER_MAX}"),
                value: format!("{min}..{max}"),
                reason: "range must be non-empty and start at $1 or more".to_string(),
            });
        }

        Ok(())
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.properties)
    }

    /// Overlay properties from JSON onto the current values
    pub fn from_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let loaded_properties: HashMap<String, ConfigValue> = serde_json::from_str(json)?;
        self.properties.extend(loaded_properties);
        Ok(())
    }
}

/// Determine the config file path.
/// Priority:
/// 1) TELSTRA_MOBILE_CONFIG env var
/// 2) platform config dir, e.g. ~/.config/telstra-mobile/config.json
/// 3) ./config.json
pub fn default_config_path() -> PathBuf {
    if let Ok(p) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(p);
    }

    dirs::config_dir()
        .map(|base| base.join("telstra-mobile").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Load the configuration at `path`, overlaid on defaults. A missing file
/// yields the defaults.
pub fn load_config(path: &Path) -> ConfigResult<CarrierConfig> {
    let mut config = CarrierConfig::new();
    if !path.exists() {
        log::debug!("No config file at {}, using defaults", path.display());
        return Ok(config);
    }

    let file_error = |error: String| ConfigError::FileError {
        path: path.display().to_string(),
        error,
    };
    let json = fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    config.from_json(&json).map_err(|e| file_error(e.to_string()))?;
    config.validate()?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Save the configuration to `path`, creating parent directories.
pub fn save_config(config: &CarrierConfig, path: &Path) -> ConfigResult<()> {
    let file_error = |error: String| ConfigError::FileError {
        path: path.display().to_string(),
        error,
    };
    let json = config.to_json().map_err(|e| file_error(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| file_error(e.to_string()))?;
        }
    }

    fs::write(path, json).map_err(|e| file_error(e.to_string()))
}
