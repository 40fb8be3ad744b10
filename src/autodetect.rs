//! Account autodetection
//!
//! Tries ports one at a time, in enumeration order, and stops at the first
//! account the caller accepts. Communication faults on a port (serial errors,
//! timeouts, refused PINs) skip that port; not finding an account is `None`,
//! not an error.

use crate::account::Account;
use crate::config::CarrierConfig;
use crate::error::{MobileResult, TransportResult};
use crate::ussd::Transport;

/// Source of candidate port names
pub trait PortEnumerator {
    fn ports(&self) -> TransportResult<Vec<String>>;
}

/// A fixed list of ports
impl PortEnumerator for Vec<String> {
    fn ports(&self) -> TransportResult<Vec<String>> {
        Ok(self.clone())
    }
}

/// Opens a transport on a named port
pub trait TransportFactory {
    type Transport: Transport;

    fn open(&self, port: &str) -> TransportResult<Self::Transport>;
}

/// Predicate accepting the account whose SIM has `expected` as its number
pub fn phone_number_is<T: Transport>(expected: impl Into<String>) -> impl FnMut(&mut Account<T>) -> bool {
    let expected = expected.into();
    move |account| {
        let port = account.port().to_string();
        match account.phone_number() {
            Ok(number) => {
                log::debug!("{port} has phone number {number}");
                number == expected
            }
            Err(e) => {
                log::warn!("Could not read phone number on {port}: {e}");
                false
            }
        }
    }
}

/// Finds an account across the ports of an enumerator
pub struct Autodetector<E, F> {
    enumerator: E,
    factory: F,
    config: CarrierConfig,
    pin: Option<String>,
}

impl<E: PortEnumerator, F: TransportFactory> Autodetector<E, F> {
    pub fn new(enumerator: E, factory: F, config: CarrierConfig) -> Self {
        Self {
            enumerator,
            factory,
            config,
            pin: None,
        }
    }

    /// Unlock SIMs with `pin` when they ask for one
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// First account on any port
    pub fn detect_any(&self) -> MobileResult<Option<Account<F::Transport>>> {
        self.detect(|_: &mut Account<F::Transport>| true)
    }

    /// First account for which `predicate` holds, already classified as
    /// prepaid or postpaid. Every rejected transport is closed.
    pub fn detect<P>(&self, mut predicate: P) -> MobileResult<Option<Account<F::Transport>>>
    where
        P: FnMut(&mut Account<F::Transport>) -> bool,
    {
        let ports = match self.enumerator.ports() {
            Ok(ports) => ports,
            Err(e) => {
                log::warn!("Could not enumerate ports: {e}");
                return Ok(None);
            }
        };
        log::debug!("Probing {} port(s): {:?}", ports.len(), ports);

        for port in ports {
            let mut transport = match self.factory.open(&port) {
                Ok(transport) => transport,
                Err(e) => {
                    log::warn!("Skipping {port}: {e}");
                    continue;
                }
            };

            if let Err(e) = transport.connect(self.pin.as_deref()) {
                log::warn!("Skipping {port}: {e}");
                if let Err(e) = transport.close() {
                    log::debug!("Ignoring close failure on {port}: {e}");
                }
                continue;
            }

            let mut account = Account::new(transport, self.config.clone());
            if !predicate(&mut account) {
                log::info!("Account on {port} not accepted");
                close_quietly(account);
                continue;
            }

            match account.kind() {
                Ok(kind) => {
                    log::info!("Detected {kind} account on {port}");
                    return Ok(Some(account));
                }
                Err(e) if e.is_transport_fault() => {
                    log::warn!("Skipping {port}, account type check failed: {e}");
                    close_quietly(account);
                }
                Err(e) => {
                    close_quietly(account);
                    return Err(e);
                }
            }
        }

        log::info!("No matching account found");
        Ok(None)
    }
}

fn close_quietly<T: Transport>(account: Account<T>) {
    let port = account.port().to_string();
    if let Err(e) = account.close() {
        log::debug!("Ignoring close failure on {port}: {e}");
    }
}
