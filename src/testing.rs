//! Scripted in-memory transport
//!
//! [`ScriptedTransport`] plays back a menu tree: each screen is keyed by the
//! request code plus the replies sent so far. Every exchange is recorded in a
//! shared [`TransportLog`] that survives the transport being moved into an
//! [`crate::account::Account`] or closed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::autodetect::TransportFactory;
use crate::error::{TransportError, TransportResult};
use crate::ussd::{MenuResponse, Transport};

/// One interaction with the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Connect(Option<String>),
    Request(String),
    Reply(String),
    Cancel,
    Close,
}

#[derive(Debug, Default)]
struct LogState {
    exchanges: Vec<Exchange>,
    closed: bool,
}

/// Shared record of what a [`ScriptedTransport`] was asked to do
#[derive(Debug, Clone, Default)]
pub struct TransportLog {
    inner: Rc<RefCell<LogState>>,
}

impl TransportLog {
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.inner.borrow().exchanges.clone()
    }

    pub fn closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Number of times `code` was requested
    pub fn requests(&self, code: &str) -> usize {
        self.inner
            .borrow()
            .exchanges
            .iter()
            .filter(|e| matches!(e, Exchange::Request(c) if c == code))
            .count()
    }

    /// Replies sent, in order
    pub fn replies(&self) -> Vec<String> {
        self.inner
            .borrow()
            .exchanges
            .iter()
            .filter_map(|e| match e {
                Exchange::Reply(input) => Some(input.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().exchanges.is_empty()
    }

    fn record(&self, exchange: Exchange) {
        self.inner.borrow_mut().exchanges.push(exchange);
    }

    fn mark_closed(&self) {
        self.inner.borrow_mut().closed = true;
    }
}

type ScreenKey = (String, Vec<String>);

/// [`Transport`] double driven by a scripted menu tree
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    port: String,
    screens: HashMap<ScreenKey, Result<MenuResponse, TransportError>>,
    connect_error: Option<TransportError>,
    cancel_error: Option<TransportError>,
    current: Option<ScreenKey>,
    closed: bool,
    log: TransportLog,
}

impl ScriptedTransport {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            screens: HashMap::new(),
            connect_error: None,
            cancel_error: None,
            current: None,
            closed: false,
            log: TransportLog::default(),
        }
    }

    /// Screen answering `code`; it awaits a reply
    pub fn on_request(self, code: &str, text: &str) -> Self {
        self.on_path_response(code, &[], MenuResponse::awaiting(text))
    }

    /// Screen reached from `code` after sending `inputs`; it awaits a reply
    pub fn on_path(self, code: &str, inputs: &[&str], text: &str) -> Self {
        self.on_path_response(code, inputs, MenuResponse::awaiting(text))
    }

    pub fn on_path_response(mut self, code: &str, inputs: &[&str], response: MenuResponse) -> Self {
        self.screens.insert(key(code, inputs), Ok(response));
        self
    }

    pub fn fail_request(self, code: &str, error: TransportError) -> Self {
        self.fail_path(code, &[], error)
    }

    pub fn fail_path(mut self, code: &str, inputs: &[&str], error: TransportError) -> Self {
        self.screens.insert(key(code, inputs), Err(error));
        self
    }

    pub fn fail_connect(mut self, error: TransportError) -> Self {
        self.connect_error = Some(error);
        self
    }

    pub fn fail_cancel(mut self, error: TransportError) -> Self {
        self.cancel_error = Some(error);
        self
    }

    /// Handle on the exchange record, shared with every clone
    pub fn log(&self) -> TransportLog {
        self.log.clone()
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    fn screen(&mut self, screen: ScreenKey) -> TransportResult<MenuResponse> {
        match self.screens.get(&screen).cloned() {
            Some(Ok(response)) => {
                self.current = Some(screen);
                Ok(response)
            }
            Some(Err(error)) => {
                self.current = None;
                Err(error)
            }
            None => {
                self.current = None;
                Err(TransportError::ModemError {
                    command: format!("{} {:?}", screen.0, screen.1),
                    response: "no scripted screen".to_string(),
                })
            }
        }
    }
}

fn key(code: &str, inputs: &[&str]) -> ScreenKey {
    (code.to_string(), inputs.iter().map(|s| s.to_string()).collect())
}

impl Transport for ScriptedTransport {
    fn port(&self) -> &str {
        &self.port
    }

    fn connect(&mut self, pin: Option<&str>) -> TransportResult<()> {
        self.log.record(Exchange::Connect(pin.map(str::to_string)));
        self.ensure_open()?;
        match &self.connect_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn send_request(&mut self, code: &str) -> TransportResult<MenuResponse> {
        self.log.record(Exchange::Request(code.to_string()));
        self.ensure_open()?;
        self.screen((code.to_string(), Vec::new()))
    }

    fn reply(&mut self, input: &str) -> TransportResult<MenuResponse> {
        self.log.record(Exchange::Reply(input.to_string()));
        self.ensure_open()?;
        let Some((code, mut inputs)) = self.current.take() else {
            return Err(TransportError::ModemError {
                command: input.to_string(),
                response: "no open session".to_string(),
            });
        };
        inputs.push(input.to_string());
        self.screen((code, inputs))
    }

    fn cancel(&mut self) -> TransportResult<()> {
        self.log.record(Exchange::Cancel);
        self.ensure_open()?;
        self.current = None;
        match &self.cancel_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> TransportResult<()> {
        self.log.record(Exchange::Close);
        self.closed = true;
        self.log.mark_closed();
        Ok(())
    }
}

/// Opens pre-scripted transports by port name and remembers what was opened
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    transports: HashMap<String, ScriptedTransport>,
    opened: Rc<RefCell<Vec<String>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `transport` available under its own port name
    pub fn with_transport(mut self, transport: ScriptedTransport) -> Self {
        self.transports.insert(transport.port.clone(), transport);
        self
    }

    /// Ports opened so far, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl TransportFactory for ScriptedFactory {
    type Transport = ScriptedTransport;

    fn open(&self, port: &str) -> TransportResult<ScriptedTransport> {
        self.opened.borrow_mut().push(port.to_string());
        self.transports.get(port).cloned().ok_or_else(|| TransportError::Serial {
            port: port.to_string(),
            message: "no such device".to_string(),
        })
    }
}
