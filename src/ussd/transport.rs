//! Transport capability and the conversational session handle
//!
//! A [`Transport`] is anything that can carry USSD requests to the network:
//! the AT-command modem in [`crate::modem`] or the scripted double in
//! [`crate::testing`]. A USSD conversation allows a single outstanding
//! request, so a [`Session`] holds the transport exclusively and every reply
//! consumes the old handle and yields the next one.

use std::fmt;

use crate::error::TransportResult;
use crate::ussd::response::MenuResponse;

/// Blocking request/reply channel to the carrier
pub trait Transport {
    /// Name of the port or device this transport is bound to
    fn port(&self) -> &str;

    /// Bring the device up, unlocking the SIM with `pin` when asked
    fn connect(&mut self, pin: Option<&str>) -> TransportResult<()>;

    /// Start a new session with a request code such as `#100#`
    fn send_request(&mut self, code: &str) -> TransportResult<MenuResponse>;

    /// Answer the screen currently awaiting a reply
    fn reply(&mut self, input: &str) -> TransportResult<MenuResponse>;

    /// Abort the open session
    fn cancel(&mut self) -> TransportResult<()>;

    /// Release the device
    fn close(&mut self) -> TransportResult<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn port(&self) -> &str {
        (**self).port()
    }

    fn connect(&mut self, pin: Option<&str>) -> TransportResult<()> {
        (**self).connect(pin)
    }

    fn send_request(&mut self, code: &str) -> TransportResult<MenuResponse> {
        (**self).send_request(code)
    }

    fn reply(&mut self, input: &str) -> TransportResult<MenuResponse> {
        (**self).reply(input)
    }

    fn cancel(&mut self) -> TransportResult<()> {
        (**self).cancel()
    }

    fn close(&mut self) -> TransportResult<()> {
        (**self).close()
    }
}

/// One turn of a live USSD conversation
pub struct Session<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
    response: MenuResponse,
}

impl<T: Transport + ?Sized> fmt::Debug for Session<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("port", &self.transport.port())
            .field("response", &self.response)
            .finish()
    }
}

impl<'t, T: Transport + ?Sized> Session<'t, T> {
    /// Send `code` and hold the first screen
    pub fn start(transport: &'t mut T, code: &str) -> TransportResult<Self> {
        log::debug!("USSD request {code} on {}", transport.port());
        let response = transport.send_request(code)?;
        log::debug!("USSD response ({} bytes, {:?})", response.text().len(), response.status());
        Ok(Self { transport, response })
    }

    pub fn response(&self) -> &MenuResponse {
        &self.response
    }

    pub fn text(&self) -> &str {
        self.response.text()
    }

    /// Answer the current screen; the returned handle is the next turn
    pub fn reply(self, input: &str) -> TransportResult<Session<'t, T>> {
        log::debug!("USSD reply '{input}' on {}", self.transport.port());
        let response = self.transport.reply(input)?;
        log::debug!("USSD response ({} bytes, {:?})", response.text().len(), response.status());
        Ok(Session {
            transport: self.transport,
            response,
        })
    }

    /// End the conversation, returning the last screen seen. Nothing is sent
    /// when the network is not waiting for a reply.
    pub fn cancel(self) -> TransportResult<MenuResponse> {
        if self.response.awaits_reply() {
            log::debug!("USSD cancel on {}", self.transport.port());
            self.transport.cancel()?;
        }
        Ok(self.response)
    }

    /// Leave the conversation open and keep only the screen
    pub fn into_response(self) -> MenuResponse {
        self.response
    }
}
