//! Walking carrier menus
//!
//! A path mixes two kinds of steps: pick an option by its label, or send a
//! literal (a phone number, an amount, a confirmation digit). Label steps are
//! resolved against the screen the network actually sent, so menu renumbering
//! is harmless and wording changes fail only the operation that needed them.

use crate::error::{MenuError, MobileResult};
use crate::ussd::menu::parse_menu;
use crate::ussd::transport::{Session, Transport};

/// One hop through a menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Choose the first of these labels present on the screen
    Select(Vec<String>),
    /// Send this text as-is
    Send(String),
}

impl Step {
    pub fn select(label: impl Into<String>) -> Self {
        Step::Select(vec![label.into()])
    }

    /// Label with aliases for carrier wording changes, tried in order
    pub fn select_any<S: AsRef<str>>(labels: &[S]) -> Self {
        Step::Select(labels.iter().map(|l| l.as_ref().to_string()).collect())
    }

    pub fn send(input: impl Into<String>) -> Self {
        Step::Send(input.into())
    }
}

/// Pick the first of `labels` offered by the current screen and reply with
/// its key
pub fn select<'t, T, S>(session: Session<'t, T>, labels: &[S]) -> MobileResult<Session<'t, T>>
where
    T: Transport + ?Sized,
    S: AsRef<str>,
{
    let menu = parse_menu(session.text());
    let key = match menu.get_any(labels) {
        Some((label, key)) => {
            log::debug!("Selecting '{label}' ({key})");
            key.to_string()
        }
        None => {
            let wanted: Vec<&str> = labels.iter().map(|l| l.as_ref()).collect();
            return Err(MenuError::OptionNotFound {
                label: wanted.join(" | "),
                available: menu.labels(),
            }
            .into());
        }
    };
    Ok(session.reply(&key)?)
}

/// Apply `steps` in order, returning the session positioned on the last
/// screen
pub fn follow_path<'t, T>(session: Session<'t, T>, steps: &[Step]) -> MobileResult<Session<'t, T>>
where
    T: Transport + ?Sized,
{
    let mut session = session;
    for step in steps {
        session = match step {
            Step::Select(labels) => select(session, labels.as_slice())?,
            Step::Send(input) => session.reply(input)?,
        };
    }
    Ok(session)
}

/// Join a screen truncated over "More" pages into one text. Follows the
/// `more_labels` option until a page no longer offers it; more than
/// `max_pages` pages is a [`MenuError::PageLimitExceeded`].
pub fn collect_pages<'t, T, S>(
    session: Session<'t, T>,
    more_labels: &[S],
    max_pages: usize,
) -> MobileResult<(Session<'t, T>, String)>
where
    T: Transport + ?Sized,
    S: AsRef<str>,
{
    let mut session = session;
    let mut pages = vec![session.text().to_string()];

    while parse_menu(session.text()).get_any(more_labels).is_some() {
        if pages.len() >= max_pages {
            return Err(MenuError::PageLimitExceeded { limit: max_pages }.into());
        }
        session = select(session, more_labels)?;
        pages.push(session.text().to_string());
    }

    log::debug!("Collected {} page(s)", pages.len());
    Ok((session, pages.join("\r\n")))
}
