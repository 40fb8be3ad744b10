//! Extracting facts from free-text carrier screens
//!
//! None of these fail: a screen that does not carry the field yields `None`,
//! since carriers legitimately omit balances or expiry dates for some
//! account states.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\S+)").expect("currency pattern is valid"));

static EXPIRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Exp\S*[ \t]+([^\r\n]+)").expect("expiry pattern is valid"));

// "Exp", "Exp:", "Expiry" or "Expires" followed by a day number
static EXPIRY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bExp(?:iry|ires)?[.:]?[ \t]+[0-9]{1,2}\b").expect("expiry marker pattern is valid")
});

/// Day-month-year format used on expiry lines, e.g. `12 Aug 2007`
pub const EXPIRY_FORMAT: &str = "%d %b %Y";

/// A money amount in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self { cents: dollars * 100 }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn as_f64(&self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let cents = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl FromStr for Money {
    type Err = String;

    /// Parse `1,234.5` style amounts; at most two decimal places
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
        let (whole, fraction) = match cleaned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (cleaned.as_str(), ""),
        };

        let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if !digits(whole) || (!fraction.is_empty() && !digits(fraction)) || fraction.len() > 2 {
            return Err(format!("not a money amount: '{s}'"));
        }

        let dollars: i64 = whole.parse().map_err(|e| format!("'{s}': {e}"))?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|e| format!("'{s}': {e}"))? * 10,
            _ => fraction.parse().map_err(|e| format!("'{s}': {e}"))?,
        };
        dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .map(Money::from_cents)
            .ok_or_else(|| format!("amount out of range: '{s}'"))
    }
}

/// First `$<amount>` on the screen
pub fn extract_money(text: &str) -> Option<Money> {
    CURRENCY.captures_iter(text).find_map(|captures| {
        // "$5.00," or "$5." at the end of a sentence
        let token = captures[1].trim_end_matches(|c: char| !c.is_ascii_digit());
        token.parse().ok()
    })
}

/// Balance shown on the main menu banner
pub fn extract_balance(text: &str) -> Option<Money> {
    extract_money(text)
}

/// Expiry date on an `Exp ...` line
pub fn extract_expiry(text: &str) -> Option<NaiveDate> {
    EXPIRY.captures_iter(text).find_map(|captures| {
        NaiveDate::parse_from_str(captures[1].trim(), EXPIRY_FORMAT).ok()
    })
}

pub fn has_balance_marker(text: &str) -> bool {
    text.contains("Bal:") || extract_money(text).is_some()
}

/// An expiry label followed by a date, not just any word starting "Exp"
pub fn has_expiry_marker(text: &str) -> bool {
    EXPIRY_MARKER.is_match(text)
}

/// The phone-number lookup answers with a caption line and the number on
/// the second line
pub fn extract_phone_number(text: &str) -> Option<String> {
    text.lines()
        .nth(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}
