//! AT-command USSD transport
//!
//! Drives a Hayes-compatible GSM modem over any byte stream. Commands are
//! written with a `\r` terminator and the reply is read until a final result
//! code (`OK`, `ERROR`, `+CME ERROR: ...`). USSD commands additionally wait
//! for the `+CUSD` record carrying the screen.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{TransportError, TransportResult};
use crate::modem::cusd;
use crate::ussd::{MenuResponse, Transport};

/// Data coding scheme sent with requests (GSM 7-bit default alphabet)
const REQUEST_DCS: u8 = 15;

/// Result code that ends a command response
#[derive(Debug, Clone, PartialEq, Eq)]
enum FinalResult {
    Ok,
    Error(String),
}

/// Last complete final result code in `buffer`
fn final_result(buffer: &str) -> Option<FinalResult> {
    buffer
        .split_inclusive('\n')
        .filter(|line| line.ends_with('\n'))
        .map(str::trim)
        .filter_map(|line| match line {
            "OK" => Some(FinalResult::Ok),
            "ERROR" => Some(FinalResult::Error(line.to_string())),
            l if l.starts_with("+CME ERROR") || l.starts_with("+CMS ERROR") => {
                Some(FinalResult::Error(l.to_string()))
            }
            _ => None,
        })
        .last()
}

/// A GSM modem speaking AT commands over `port`
pub struct AtModem<P: Read + Write> {
    port_name: String,
    port: P,
    timeout: Duration,
    // Raw bytes; decoded as a whole so characters split across reads survive
    buffer: Vec<u8>,
    closed: bool,
}

impl<P: Read + Write> AtModem<P> {
    /// `timeout` bounds each command, including the wait for the network
    pub fn new(port_name: impl Into<String>, port: P, timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            port,
            timeout,
            buffer: Vec::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    fn serial_error(&self, message: String) -> TransportError {
        TransportError::Serial {
            port: self.port_name.clone(),
            message,
        }
    }

    fn write_command(&mut self, command: &str) -> TransportResult<()> {
        self.ensure_open()?;
        self.buffer.clear();
        log::trace!("{} <- {command}", self.port_name);
        self.port
            .write_all(format!("{command}\r").as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(|e| self.serial_error(e.to_string()))
    }

    fn read_until<F>(&mut self, operation: &str, done: F) -> TransportResult<String>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        let mut chunk = [0u8; 256];

        loop {
            let text = String::from_utf8_lossy(&self.buffer);
            if done(&text) {
                let text = text.into_owned();
                log::trace!("{} -> {:?}", self.port_name, text);
                self.buffer.clear();
                return Ok(text);
            }
            if Instant::now() >= deadline {
                return Err(TransportError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }

            match self.port.read(&mut chunk) {
                Ok(0) => thread::sleep(Duration::from_millis(10)),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => return Err(self.serial_error(e.to_string())),
            }
        }
    }

    /// Run a plain command, returning its information lines
    fn command(&mut self, command: &str) -> TransportResult<Vec<String>> {
        self.write_command(command)?;
        let text = self.read_until(command, |buffer| final_result(buffer).is_some())?;

        match final_result(&text) {
            Some(FinalResult::Ok) => Ok(text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && *line != "OK" && *line != command)
                .map(str::to_string)
                .collect()),
            Some(FinalResult::Error(response)) => Err(TransportError::ModemError {
                command: command.to_string(),
                response,
            }),
            None => Err(TransportError::Timeout {
                operation: command.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    /// Run a `+CUSD` command and wait for the screen it produces
    fn ussd(&mut self, input: &str) -> TransportResult<MenuResponse> {
        let command = format!("AT+CUSD=1,\"{input}\",{REQUEST_DCS}");
        self.write_command(&command)?;
        let text = self.read_until(&command, |buffer| match final_result(buffer) {
            Some(FinalResult::Error(_)) => true,
            Some(FinalResult::Ok) => !cusd::parse_records(buffer).is_empty(),
            None => false,
        })?;

        if let Some(FinalResult::Error(response)) = final_result(&text) {
            return Err(TransportError::ModemError { command, response });
        }

        let lines: Vec<&str> = text.lines().collect();
        match cusd::reassemble(&lines).into_iter().next() {
            Some(record) => record.into_response(&command),
            None => Err(TransportError::ModemError {
                command,
                response: text.trim().to_string(),
            }),
        }
    }
}

impl<P: Read + Write> Transport for AtModem<P> {
    fn port(&self) -> &str {
        &self.port_name
    }

    fn connect(&mut self, pin: Option<&str>) -> TransportResult<()> {
        log::debug!("Connecting to modem on {}", self.port_name);
        self.command("AT")?;
        self.command("ATE0")?;

        let status = self.command("AT+CPIN?")?;
        if status.iter().any(|line| line.contains("SIM PIN")) {
            let pin = pin.ok_or(TransportError::PinRejected)?;
            log::info!("Unlocking SIM on {}", self.port_name);
            self.command(&format!("AT+CPIN=\"{pin}\""))
                .map_err(|_| TransportError::PinRejected)?;
        } else if !status.iter().any(|line| line.contains("READY")) {
            return Err(TransportError::PinRejected);
        }

        self.command("AT+CUSD=1")?;
        log::info!("Modem on {} ready", self.port_name);
        Ok(())
    }

    fn send_request(&mut self, code: &str) -> TransportResult<MenuResponse> {
        self.ussd(code)
    }

    fn reply(&mut self, input: &str) -> TransportResult<MenuResponse> {
        self.ussd(input)
    }

    fn cancel(&mut self) -> TransportResult<()> {
        self.command("AT+CUSD=2").map(|_| ())
    }

    fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.port
            .flush()
            .map_err(|e| self.serial_error(e.to_string()))
    }
}
