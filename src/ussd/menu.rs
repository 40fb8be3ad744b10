//! Menu parsing
//!
//! A carrier screen mixes banners, footnotes and numbered options:
//!
//! ```text
//! Bal:$123.45 *
//! Exp 12 Aug 2007
//! 1. Recharge
//! 2. Balance
//! 00. Home
//! *charges can take 48hrs
//! ```
//!
//! Only the `<digits>. <label>` lines are options. Everything else is ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ussd::response::MenuResponse;

static OPTION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9]+)\.[ \t]+(.+)$").expect("option line pattern is valid")
});

/// One numbered option on a screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub label: String,
    pub key: String,
}

/// Options of one screen, in screen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    options: Vec<MenuOption>,
}

impl Menu {
    /// Key to send for an exact `label`
    pub fn get(&self, label: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.label == label)
            .map(|option| option.key.as_str())
    }

    /// First of `labels` present on the screen, as `(label, key)`
    pub fn get_any<'a, S: AsRef<str>>(&'a self, labels: &[S]) -> Option<(&'a str, &'a str)> {
        labels.iter().find_map(|wanted| {
            self.options
                .iter()
                .find(|option| option.label == wanted.as_ref())
                .map(|option| (option.label.as_str(), option.key.as_str()))
        })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|option| option.label.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MenuOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// An empty menu means the screen format was not recognised
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    // First occurrence of a label wins
    fn insert(&mut self, label: String, key: String) {
        if !self.contains(&label) {
            self.options.push(MenuOption { label, key });
        }
    }
}

/// Parse the options out of a screen's text
pub fn parse_menu(text: &str) -> Menu {
    let mut menu = Menu::default();
    for line in text.lines() {
        if let Some(captures) = OPTION_LINE.captures(line) {
            let label = captures[2].trim();
            if !label.is_empty() {
                menu.insert(label.to_string(), captures[1].to_string());
            }
        }
    }
    menu
}

impl From<&MenuResponse> for Menu {
    fn from(response: &MenuResponse) -> Self {
        parse_menu(response.text())
    }
}
