//! Account operations against a scripted carrier menu tree

use chrono::NaiveDate;
use telstra_mobile::testing::{Exchange, ScriptedTransport, TransportLog};
use telstra_mobile::{
    Account, AccountError, AccountKind, CarrierConfig, MenuError, MenuResponse, MobileError, Money,
    TransportError,
};

const MENU: &str = "Bal:$123.45 *\r\nExp 12 Aug 2007\r\n1. Recharge\r\n2. Balance\r\n3. My Offer\r\n4. PlusPacks\r\n5. Tones&Extras\r\n6. History\r\n7. CredMe2U\r\n8. Hlp\r\n00. Home\r\n*charges can take 48hrs";

const DETAILS_MENU: &str = "Bal:$5.00\r\nExp 1 Jan 2030\r\n1. Recharge\r\n2. Bal Details\r\n00. Home";

const TARGET: &str = "0499888777";

fn account(transport: ScriptedTransport) -> (Account<ScriptedTransport>, TransportLog) {
    let log = transport.log();
    (Account::new(transport, CarrierConfig::new()), log)
}

/// Main menu down to the confirmation screen for a $5 transfer
fn transfer_tree(transfer_label: &str, confirmation: &str) -> ScriptedTransport {
    ScriptedTransport::new("/dev/ttyUSB0")
        .on_request("#100#", MENU)
        .on_path("#100#", &["1"], &format!("Recharge\r\n1. Voucher\r\n2. {transfer_label}\r\n00. Home"))
        .on_path("#100#", &["1", "2"], "Enter mobile number to send credit to")
        .on_path("#100#", &["1", "2", TARGET], "Enter amount in dollars")
        .on_path("#100#", &["1", "2", TARGET, "5"], confirmation)
}

fn transfer_error(account: &mut Account<ScriptedTransport>, target: &str, amount: i64) -> MobileError {
    match account.transfer_credit(target, amount) {
        Ok(response) => panic!("transfer unexpectedly confirmed: {}", response.text()),
        Err(e) => e,
    }
}

#[test]
fn test_balance_and_expiry_from_main_menu() {
    let (mut account, log) = account(ScriptedTransport::new("A").on_request("#100#", MENU));

    assert_eq!(account.balance().expect("balance"), Some(Money::from_cents(12_345)));
    assert_eq!(
        account.expiry_date().expect("expiry"),
        NaiveDate::from_ymd_opt(2007, 8, 12)
    );
    assert_eq!(log.requests("#100#"), 2);
    assert_eq!(
        log.exchanges(),
        vec![
            Exchange::Request("#100#".to_string()),
            Exchange::Cancel,
            Exchange::Request("#100#".to_string()),
            Exchange::Cancel,
        ]
    );
}

#[test]
fn test_banner_without_balance() {
    let (mut account, _) = account(ScriptedTransport::new("A").on_request("#100#", "1. Recharge\r\n00. Home"));

    assert_eq!(account.balance().expect("balance"), None);
    assert_eq!(account.expiry_date().expect("expiry"), None);
}

#[test]
fn test_main_menu_parsed() {
    let (mut account, log) = account(ScriptedTransport::new("A").on_request("#100#", MENU));

    let menu = account.main_menu_parsed().expect("menu");
    assert_eq!(menu.len(), 9);
    assert_eq!(menu.get("CredMe2U"), Some("7"));
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_prepaid_needs_balance_and_expiry() {
    let (mut prepaid, _) = account(
        ScriptedTransport::new("A").on_request("#125#", "Bal: $10.00\r\nExp 01 Jan 2030"),
    );
    assert!(prepaid.is_prepaid().expect("prepaid check"));
    assert_eq!(prepaid.kind().expect("kind"), AccountKind::Prepaid);

    let (mut balance_only, _) = account(ScriptedTransport::new("A").on_request("#125#", "Bal: $10.00"));
    assert!(!balance_only.is_prepaid().expect("prepaid check"));

    let (mut neither, _) = account(ScriptedTransport::new("A").on_request("#125#", "Service unavailable"));
    assert_eq!(neither.kind().expect("kind"), AccountKind::Postpaid);

    let (mut wording, _) = account(
        ScriptedTransport::new("A").on_request("#125#", "Bal: $10.00\r\nExplore our Expired-offer deals"),
    );
    assert_eq!(wording.kind().expect("kind"), AccountKind::Postpaid);
}

#[test]
fn test_prepaid_check_timeout_assumes_prepaid() {
    let (mut account, _) = account(ScriptedTransport::new("A").fail_request(
        "#125#",
        TransportError::Timeout {
            operation: "#125#".to_string(),
            timeout_ms: 15_000,
        },
    ));

    assert!(account.is_prepaid().expect("fallback"));
}

#[test]
fn test_prepaid_check_other_faults_propagate() {
    let (mut account, _) = account(ScriptedTransport::new("A").fail_request(
        "#125#",
        TransportError::Serial {
            port: "A".to_string(),
            message: "device unplugged".to_string(),
        },
    ));

    let err = account.is_prepaid().expect_err("should fail");
    assert!(err.is_transport_fault());
    assert_eq!(account.known_kind(), None);
}

#[test]
fn test_classification_is_memoised() {
    let (mut account, log) = account(
        ScriptedTransport::new("A").on_request("#125#", "Bal: $10.00\r\nExp 01 Jan 2030"),
    );

    assert_eq!(account.known_kind(), None);
    account.is_prepaid().expect("first");
    account.is_prepaid().expect("second");
    assert_eq!(account.known_kind(), Some(AccountKind::Prepaid));
    assert_eq!(log.requests("#125#"), 1);
}

#[test]
fn test_phone_number_lookup_is_memoised() {
    let (mut account, log) = account(
        ScriptedTransport::new("A").on_request("#150#", "Your mobile number is:\r\n 0412345678 "),
    );

    assert_eq!(account.phone_number().expect("number"), "0412345678");
    assert_eq!(account.phone_number().expect("number"), "0412345678");
    assert_eq!(log.requests("#150#"), 1);
}

#[test]
fn test_phone_number_missing_line() {
    let (mut account, log) = account(ScriptedTransport::new("A").on_request("#150#", "Try again later"));

    let err = account.phone_number().expect_err("should fail");
    assert!(matches!(err, MobileError::Account(AccountError::UnexpectedResponse { .. })));

    // Failures are not memoised
    let _ = account.phone_number();
    assert_eq!(log.requests("#150#"), 2);
}

#[test]
fn test_transfer_amount_validated_before_any_io() {
    let (mut account, log) = account(transfer_tree("CredMe2U", "unused"));

    for amount in [0, 11, -3] {
        let err = transfer_error(&mut account, TARGET, amount);
        assert!(matches!(
            err,
            MobileError::Account(AccountError::InvalidAmount { min: 1, max: 10, .. })
        ));
    }
    assert!(log.is_empty());
}

#[test]
fn test_transfer_confirmed() {
    let transport = transfer_tree("CredMe2U", "Send $5 to 0499888777?\r\n1. Yes\r\n00. No").on_path_response(
        "#100#",
        &["1", "2", TARGET, "5", "1"],
        MenuResponse::complete("Thanks. $5 sent to 0499888777."),
    );
    let (mut account, log) = account(transport);

    let done = account.transfer_credit(TARGET, 5).expect("transfer");
    assert_eq!(done.text(), "Thanks. $5 sent to 0499888777.");
    assert!(!done.awaits_reply());

    assert_eq!(log.replies(), vec!["1", "2", TARGET, "5", "1"]);
    // A final screen needs no cancel
    assert_eq!(log.exchanges().last(), Some(&Exchange::Reply("1".to_string())));
}

#[test]
fn test_transfer_receipt_awaiting_reply_is_cancelled() {
    let transport = transfer_tree("CredMe2U", "Send $5 to 0499888777?").on_path(
        "#100#",
        &["1", "2", TARGET, "5", "1"],
        "$5 sent to 0499888777\r\n00. Home",
    );
    let (mut account, log) = account(transport);

    let done = account.transfer_credit(TARGET, 5).expect("transfer");
    assert!(done.text().starts_with("$5 sent"));
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_transfer_label_alias() {
    let transport = transfer_tree("Credit Me2U", "Send $5 to 0499888777?").on_path_response(
        "#100#",
        &["1", "2", TARGET, "5", "1"],
        MenuResponse::complete("Done"),
    );
    let (mut account, _) = account(transport);

    assert_eq!(account.transfer_credit(TARGET, 5).expect("transfer").text(), "Done");
}

#[test]
fn test_transfer_insufficient_credit() {
    let (mut account, log) = account(transfer_tree(
        "CredMe2U",
        "Insufficient credit to send $5 to 0499888777.",
    ));

    let err = transfer_error(&mut account, TARGET, 5);
    assert!(matches!(
        err,
        MobileError::Account(AccountError::InsufficientCredit { ref message })
            if message.starts_with("Insufficient credit")
    ));
    assert_eq!(log.replies(), vec!["1", "2", TARGET, "5"]);
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_failed_transfer_leaves_no_session_open() {
    let (mut account, log) = account(transfer_tree("CredMe2U", "Insufficient credit."));

    transfer_error(&mut account, TARGET, 5);
    assert_eq!(account.balance().expect("balance"), Some(Money::from_cents(12_345)));

    let exchanges = log.exchanges();
    assert_eq!(
        exchanges[exchanges.len() - 4..],
        [
            Exchange::Reply("5".to_string()),
            Exchange::Cancel,
            Exchange::Request("#100#".to_string()),
            Exchange::Cancel,
        ]
    );
}

#[test]
fn test_transfer_limit_carries_carrier_text() {
    let screen = "Sorry, you have reached your monthly transfer limit.";
    let (mut account, log) = account(transfer_tree("CreditMe2U", screen));

    match transfer_error(&mut account, TARGET, 5) {
        MobileError::Account(AccountError::TransferLimitExceeded { message }) => assert_eq!(message, screen),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_transfer_unconfirmed_screen_cleans_up() {
    let (mut account, log) = account(transfer_tree("CredMe2U", "Send $50 to 0499111222?"));

    let err = transfer_error(&mut account, TARGET, 5);
    assert!(matches!(err, MobileError::Account(AccountError::UnconfirmedTransfer { .. })));
    // Cancel code instead of the confirm code; its failure is not reported
    assert_eq!(log.replies(), vec!["1", "2", TARGET, "5", "00"]);
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_transfer_missing_menu_option() {
    let transport = ScriptedTransport::new("A")
        .on_request("#100#", MENU)
        .on_path("#100#", &["1"], "Recharge\r\n1. Voucher\r\n00. Home");
    let (mut account, log) = account(transport);

    match transfer_error(&mut account, TARGET, 5) {
        MobileError::Menu(MenuError::OptionNotFound { label, available }) => {
            assert!(label.contains("CreditMe2U"));
            assert_eq!(available, vec!["Voucher", "Home"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        log.exchanges(),
        vec![
            Exchange::Request("#100#".to_string()),
            Exchange::Reply("1".to_string()),
            Exchange::Cancel,
        ]
    );
}

#[test]
fn test_call_credit_requires_balance_details() {
    let (mut account, log) = account(ScriptedTransport::new("A").on_request("#100#", MENU));

    let err = account.call_credit_balance().expect_err("should fail");
    assert!(matches!(err, MobileError::Account(AccountError::FeatureUnavailable { .. })));
    assert_eq!(
        log.exchanges(),
        vec![Exchange::Request("#100#".to_string()), Exchange::Cancel]
    );
}

#[test]
fn test_call_credit_marker_missing() {
    let transport = ScriptedTransport::new("A")
        .on_request("#100#", DETAILS_MENU)
        .on_path("#100#", &["2"], "SMS Bal: 20\r\nData Bal: 100MB");
    let (mut account, log) = account(transport);

    let err = account.call_credit_balance().expect_err("should fail");
    assert!(matches!(err, MobileError::Account(AccountError::FeatureUnavailable { .. })));
    // The pages were read and the session closed once
    assert_eq!(log.exchanges().iter().filter(|e| **e == Exchange::Cancel).count(), 1);
}

#[test]
fn test_call_credit_across_more_pages() {
    let transport = ScriptedTransport::new("A")
        .on_request("#100#", DETAILS_MENU)
        .on_path("#100#", &["2"], "SMS Bal: 20\r\n1. More")
        .on_path("#100#", &["2", "1"], "Call Cred Bal: $3.50\r\n00. Home");
    let (mut account, log) = account(transport);

    assert_eq!(
        account.call_credit_balance().expect("call credit"),
        Some(Money::from_cents(350))
    );
    assert_eq!(log.replies(), vec!["2", "1"]);
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_call_credit_page_cap() {
    let mut config = CarrierConfig::new();
    config.set_property("ussd.maxPages", 2i64);
    let transport = ScriptedTransport::new("A")
        .on_request("#100#", DETAILS_MENU)
        .on_path("#100#", &["2"], "Page 1\r\n1. More")
        .on_path("#100#", &["2", "1"], "Page 2\r\n1. More")
        .on_path("#100#", &["2", "1", "1"], "Call Cred Bal: $1.00");
    let log = transport.log();
    let mut account = Account::new(transport, config);

    let err = account.call_credit_balance().expect_err("should stop");
    assert!(matches!(err, MobileError::Menu(MenuError::PageLimitExceeded { limit: 2 })));
    assert_eq!(log.replies(), vec!["2", "1"]);
    assert_eq!(log.exchanges().last(), Some(&Exchange::Cancel));
}

#[test]
fn test_close_releases_transport() {
    let (account, log) = account(ScriptedTransport::new("A"));

    account.close().expect("close");
    assert!(log.closed());
}
