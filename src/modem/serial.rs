//! Serial device access

use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::account::Account;
use crate::autodetect::{phone_number_is, Autodetector, PortEnumerator, TransportFactory};
use crate::config::CarrierConfig;
use crate::error::{MobileResult, TransportError, TransportResult};
use crate::modem::AtModem;

/// Poll interval for a single read on the device
const READ_TIMEOUT: Duration = Duration::from_millis(500);

pub type SerialModem = AtModem<Box<dyn SerialPort>>;

/// Serial ports present on this machine
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPorts;

impl PortEnumerator for SerialPorts {
    fn ports(&self) -> TransportResult<Vec<String>> {
        let ports = serialport::available_ports().map_err(|e| TransportError::Serial {
            port: "*".to_string(),
            message: e.to_string(),
        })?;
        Ok(ports.into_iter().map(|info| info.port_name).collect())
    }
}

/// Opens [`SerialModem`]s with 8N1 framing
#[derive(Debug, Clone)]
pub struct SerialModemFactory {
    baud_rate: u32,
    timeout: Duration,
}

impl SerialModemFactory {
    pub fn new(baud_rate: u32, timeout: Duration) -> Self {
        Self { baud_rate, timeout }
    }

    pub fn from_config(config: &CarrierConfig) -> Self {
        Self::new(config.baud_rate(), config.timeout())
    }
}

impl TransportFactory for SerialModemFactory {
    type Transport = SerialModem;

    fn open(&self, port: &str) -> TransportResult<SerialModem> {
        log::debug!("Opening {port} at {} baud", self.baud_rate);
        let device = serialport::new(port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Serial {
                port: port.to_string(),
                message: e.to_string(),
            })?;
        Ok(AtModem::new(port, device, self.timeout))
    }
}

/// Find an account on any serial port, optionally the one whose SIM has
/// `phone_number`
pub fn autodetect_serial_account(
    config: &CarrierConfig,
    phone_number: Option<&str>,
    pin: Option<&str>,
) -> MobileResult<Option<Account<SerialModem>>> {
    let mut detector = Autodetector::new(
        SerialPorts,
        SerialModemFactory::from_config(config),
        config.clone(),
    );
    if let Some(pin) = pin {
        detector = detector.with_pin(pin);
    }

    match phone_number {
        Some(number) => detector.detect(phone_number_is(number)),
        None => detector.detect_any(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_from_config() {
        let factory = SerialModemFactory::from_config(&CarrierConfig::new());
        assert_eq!(factory.baud_rate, CarrierConfig::new().baud_rate());
        assert_eq!(factory.timeout, CarrierConfig::new().timeout());
    }

    #[test]
    fn test_missing_device_is_serial_fault() {
        let factory = SerialModemFactory::new(115_200, Duration::from_secs(1));
        let err = factory
            .open("/dev/telstra-mobile-does-not-exist")
            .err()
            .expect("open should fail");
        assert!(matches!(err, TransportError::Serial { .. }));
    }
}
