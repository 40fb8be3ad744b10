//! USSD menu-session engine
//!
//! Carrier menus are text screens with numbered options. This module turns
//! those screens into [`Menu`]s, walks them through a [`Session`] on any
//! [`Transport`], and pulls balances and dates out of the free text.

pub mod extract;
pub mod menu;
pub mod navigator;
pub mod response;
pub mod transport;

pub use extract::Money;
pub use menu::{parse_menu, Menu, MenuOption};
pub use navigator::{collect_pages, follow_path, select, Step};
pub use response::{MenuResponse, SessionStatus};
pub use transport::{Session, Transport};
