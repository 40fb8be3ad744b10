//! Account facade
//!
//! Domain operations on one SIM: balance, expiry, call-credit balance and
//! CreditMe2U transfers, built on the USSD navigator. Reads are recomputed on
//! every call because carrier state changes between calls; only the phone
//! number and the prepaid classification are memoised for the account's
//! lifetime.

use std::fmt;

use chrono::NaiveDate;
use once_cell::unsync::OnceCell;

use crate::config::{
    CarrierConfig, BALANCE_DETAILS_LABELS, CALL_CREDIT_MARKER, CREDIT_TRANSFER_LABELS,
    INSUFFICIENT_CREDIT_MARKER, MORE_LABELS, RECHARGE_LABELS, TRANSFER_LIMIT_MARKER,
};
use crate::error::{AccountError, MobileError, MobileResult};
use crate::ussd::extract::{
    extract_balance, extract_expiry, extract_money, extract_phone_number, has_balance_marker,
    has_expiry_marker,
};
use crate::ussd::{
    collect_pages, follow_path, parse_menu, select, Menu, MenuResponse, Money, Session, Step, Transport,
};

/// Billing variant of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Prepaid,
    Postpaid,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Prepaid => write!(f, "prepaid"),
            AccountKind::Postpaid => write!(f, "postpaid"),
        }
    }
}

/// A mobile service reachable through one transport
pub struct Account<T: Transport> {
    transport: T,
    config: CarrierConfig,
    phone_number: OnceCell<String>,
    is_prepaid: OnceCell<bool>,
}

impl<T: Transport> Account<T> {
    /// Wrap a connected transport
    pub fn new(transport: T, config: CarrierConfig) -> Self {
        Self {
            transport,
            config,
            phone_number: OnceCell::new(),
            is_prepaid: OnceCell::new(),
        }
    }

    pub fn port(&self) -> &str {
        self.transport.port()
    }

    pub fn config(&self) -> &CarrierConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Close the underlying transport
    pub fn close(mut self) -> MobileResult<()> {
        log::debug!("Closing account on {}", self.transport.port());
        Ok(self.transport.close()?)
    }

    /// Open the main menu. The session is left open for the caller.
    pub fn main_menu(&mut self) -> MobileResult<Session<'_, T>> {
        let code = self.config.main_menu_code();
        Ok(Session::start(&mut self.transport, &code)?)
    }

    /// Main menu options; the session is cancelled afterwards
    pub fn main_menu_parsed(&mut self) -> MobileResult<Menu> {
        let response = self.main_menu()?.cancel()?;
        Ok(parse_menu(response.text()))
    }

    /// The SIM's phone number, looked up once
    pub fn phone_number(&mut self) -> MobileResult<&str> {
        let code = self.config.phone_number_code();
        let transport = &mut self.transport;
        let number = self
            .phone_number
            .get_or_try_init(|| lookup_phone_number(transport, &code))?;
        Ok(number.as_str())
    }

    /// Whether the service is prepaid, checked once.
    ///
    /// Prepaid when the diagnostic screen shows both a balance and an expiry.
    /// Postpaid services may never answer the diagnostic code; a timeout is
    /// classified as prepaid. That can misclassify a postpaid service, which
    /// then simply reports no balance or expiry.
    pub fn is_prepaid(&mut self) -> MobileResult<bool> {
        let code = self.config.account_type_code();
        let transport = &mut self.transport;
        self.is_prepaid
            .get_or_try_init(|| detect_prepaid(transport, &code))
            .copied()
    }

    pub fn kind(&mut self) -> MobileResult<AccountKind> {
        Ok(if self.is_prepaid()? {
            AccountKind::Prepaid
        } else {
            AccountKind::Postpaid
        })
    }

    /// Classification if it has already been checked
    pub fn known_kind(&self) -> Option<AccountKind> {
        self.is_prepaid.get().map(|prepaid| {
            if *prepaid {
                AccountKind::Prepaid
            } else {
                AccountKind::Postpaid
            }
        })
    }

    /// Balance from the main menu banner. `None` when the banner has no
    /// amount.
    pub fn balance(&mut self) -> MobileResult<Option<Money>> {
        let response = self.main_menu()?.cancel()?;
        Ok(extract_balance(response.text()))
    }

    /// Expiry date from the main menu banner
    pub fn expiry_date(&mut self) -> MobileResult<Option<NaiveDate>> {
        let response = self.main_menu()?.cancel()?;
        Ok(extract_expiry(response.text()))
    }

    /// Call credit sub-balance under "Bal Details"
    pub fn call_credit_balance(&mut self) -> MobileResult<Option<Money>> {
        let marker = self.config.marker(CALL_CREDIT_MARKER);
        let text = match self.balance_details() {
            Ok(text) => text,
            Err(e) => {
                self.abandon_session();
                return Err(e);
            }
        };

        match text.find(&marker) {
            Some(position) => Ok(extract_money(&text[position..])),
            None => Err(AccountError::FeatureUnavailable {
                feature: "call credit balance".to_string(),
                reason: format!("no '{marker}' on the balance details page"),
            }
            .into()),
        }
    }

    /// Send `amount` whole dollars of credit to `target` with CreditMe2U,
    /// returning the carrier's final screen.
    ///
    /// One transfer is attempted per call and nothing is retried: a blind
    /// retry could move money twice. Callers that retry must check the
    /// balance first. Whatever the outcome, no session is left open.
    pub fn transfer_credit(&mut self, target: &str, amount: i64) -> MobileResult<MenuResponse> {
        let (min, max) = self.config.transfer_range();
        if amount < min || amount > max {
            return Err(AccountError::InvalidAmount { amount, min, max }.into());
        }

        log::info!("Sending ${amount} credit to {target} from {}", self.port());
        let result = self.send_transfer(target, amount);
        if result.is_err() {
            self.abandon_session();
        }
        result
    }

    /// Joined "Bal Details" pages. The session is cancelled on success; on
    /// error it may still be open.
    fn balance_details(&mut self) -> MobileResult<String> {
        let details = self.config.labels(BALANCE_DETAILS_LABELS);
        let more = self.config.labels(MORE_LABELS);
        let max_pages = self.config.max_pages();

        let session = self.main_menu()?;
        if parse_menu(session.text()).get_any(details.as_slice()).is_none() {
            return Err(AccountError::FeatureUnavailable {
                feature: "call credit balance".to_string(),
                reason: format!("'{}' is not on the main menu", details.join(" | ")),
            }
            .into());
        }

        let session = select(session, details.as_slice())?;
        let (session, text) = collect_pages(session, more.as_slice(), max_pages)?;
        session.cancel()?;
        Ok(text)
    }

    // On error the session may still be open
    fn send_transfer(&mut self, target: &str, amount: i64) -> MobileResult<MenuResponse> {
        let path = [
            Step::Select(self.config.labels(RECHARGE_LABELS)),
            Step::Select(self.config.labels(CREDIT_TRANSFER_LABELS)),
            Step::send(target),
            Step::send(amount.to_string()),
        ];
        let insufficient = self.config.marker(INSUFFICIENT_CREDIT_MARKER);
        let limit = self.config.marker(TRANSFER_LIMIT_MARKER);
        let cancel_code = self.config.cancel_code();
        let confirm_code = self.config.confirm_code();

        let session = follow_path(self.main_menu()?, &path)?;
        let screen = session.text().trim().to_string();

        if !insufficient.is_empty() && screen.contains(&insufficient) {
            return Err(AccountError::InsufficientCredit { message: screen }.into());
        }
        if !limit.is_empty() && screen.contains(&limit) {
            return Err(AccountError::TransferLimitExceeded { message: screen }.into());
        }
        if !(screen.contains(target) && mentions_amount(&screen, amount)) {
            log::warn!("Unrecognised transfer confirmation, closing session: {screen}");
            // The unconfirmed screen is the fault worth reporting
            if let Err(e) = session.reply(&cancel_code) {
                log::debug!("Ignoring failure while declining transfer: {e}");
            }
            return Err(AccountError::UnconfirmedTransfer { message: screen }.into());
        }

        let done = session.reply(&confirm_code)?;
        let response = done.response().clone();
        log::info!("Credit transfer confirmed: {}", response.text().trim());
        if let Err(e) = done.cancel() {
            log::debug!("Ignoring failure while closing confirmed transfer: {e}");
        }
        Ok(response)
    }

    /// Best-effort cancel of a session left open by a failed operation
    fn abandon_session(&mut self) {
        if let Err(e) = self.transport.cancel() {
            log::debug!("Ignoring failure while cancelling session on {}: {e}", self.transport.port());
        }
    }
}

/// `$<amount>` present and not the prefix of a larger figure
fn mentions_amount(screen: &str, amount: i64) -> bool {
    let needle = format!("${amount}");
    screen.match_indices(&needle).any(|(index, _)| {
        !screen[index + needle.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == ',')
    })
}

fn lookup_phone_number<T: Transport>(transport: &mut T, code: &str) -> MobileResult<String> {
    let response = Session::start(transport, code)?.cancel()?;
    extract_phone_number(response.text()).ok_or_else(|| {
        AccountError::UnexpectedResponse {
            operation: format!("phone number lookup {code}"),
            message: response.text().to_string(),
        }
        .into()
    })
}

fn detect_prepaid<T: Transport>(transport: &mut T, code: &str) -> MobileResult<bool> {
    let session = match Session::start(&mut *transport, code).map_err(MobileError::from) {
        Ok(session) => session,
        Err(e) if e.is_timeout() => {
            log::warn!("Account type check {code} timed out; assuming prepaid");
            return Ok(true);
        }
        Err(e) => return Err(e),
    };
    let response = session.cancel()?;
    let text = response.text();
    Ok(has_balance_marker(text) && has_expiry_marker(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_amount_whole_token() {
        assert!(mentions_amount("Send $1 to 0499888777?", 1));
        assert!(mentions_amount("Send $1.00 to 0499888777?", 1));
        assert!(!mentions_amount("Send $10 to 0499888777?", 1));
        assert!(mentions_amount("Send $10 to 0499888777?", 10));
        assert!(!mentions_amount("Send 10 to 0499888777?", 10));
    }

    #[test]
    fn test_account_kind_display() {
        assert_eq!(AccountKind::Prepaid.to_string(), "prepaid");
        assert_eq!(AccountKind::Postpaid.to_string(), "postpaid");
    }
}
