//! Cellular modem transport
//!
//! [`AtModem`] speaks AT commands over any byte stream; [`serial`] opens it on
//! a real serial device and finds accounts across the machine's ports.

pub mod at;
pub mod cusd;
pub mod serial;

pub use at::AtModem;
pub use cusd::CusdRecord;
pub use serial::{autodetect_serial_account, SerialModem, SerialModemFactory, SerialPorts};
