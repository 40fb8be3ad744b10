//! Autodetection across several scripted ports

use telstra_mobile::testing::{Exchange, ScriptedFactory, ScriptedTransport};
use telstra_mobile::{
    phone_number_is, AccountKind, Autodetector, CarrierConfig, PortEnumerator, TransportError,
    TransportResult,
};

const PREPAID: &str = "Bal: $10.00\r\nExp 01 Jan 2030";

fn ports(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn sim(port: &str, number: &str) -> ScriptedTransport {
    ScriptedTransport::new(port)
        .on_request("#150#", &format!("Your mobile number is:\r\n{number}"))
        .on_request("#125#", PREPAID)
}

struct BrokenEnumerator;

impl PortEnumerator for BrokenEnumerator {
    fn ports(&self) -> TransportResult<Vec<String>> {
        Err(TransportError::Serial {
            port: "*".to_string(),
            message: "permission denied".to_string(),
        })
    }
}

#[test]
fn test_stops_at_first_accepted_port() {
    let a = sim("A", "0400000001");
    let b = sim("B", "0400000002");
    let c = sim("C", "0400000003");
    let (a_log, b_log, c_log) = (a.log(), b.log(), c.log());
    let factory = ScriptedFactory::new().with_transport(a).with_transport(b).with_transport(c);

    let detector = Autodetector::new(ports(&["A", "B", "C"]), factory, CarrierConfig::new());
    let account = detector
        .detect(phone_number_is("0400000002"))
        .expect("detect")
        .expect("account on B");

    assert_eq!(account.port(), "B");
    assert_eq!(account.known_kind(), Some(AccountKind::Prepaid));
    assert_eq!(detector.factory().opened(), vec!["A", "B"]);
    assert!(a_log.closed());
    assert!(!b_log.closed());
    assert!(c_log.is_empty());
}

#[test]
fn test_no_ports_is_not_an_error() {
    let detector = Autodetector::new(Vec::<String>::new(), ScriptedFactory::new(), CarrierConfig::new());
    assert!(detector.detect_any().expect("detect").is_none());
}

#[test]
fn test_enumeration_failure_finds_nothing() {
    let detector = Autodetector::new(BrokenEnumerator, ScriptedFactory::new(), CarrierConfig::new());
    assert!(detector.detect_any().expect("detect").is_none());
}

#[test]
fn test_no_match_closes_everything() {
    let a = sim("A", "0400000001");
    let b = sim("B", "0400000002");
    let (a_log, b_log) = (a.log(), b.log());
    let factory = ScriptedFactory::new().with_transport(a).with_transport(b);

    let detector = Autodetector::new(ports(&["A", "B"]), factory, CarrierConfig::new());
    assert!(detector.detect(phone_number_is("0499999999")).expect("detect").is_none());
    assert!(a_log.closed());
    assert!(b_log.closed());
}

#[test]
fn test_faulty_ports_are_skipped() {
    let unplugged = ScriptedTransport::new("A").fail_connect(TransportError::Serial {
        port: "A".to_string(),
        message: "device disconnected".to_string(),
    });
    let unplugged_log = unplugged.log();
    let factory = ScriptedFactory::new()
        .with_transport(unplugged)
        .with_transport(sim("C", "0400000003"));

    // B is enumerated but cannot be opened
    let detector = Autodetector::new(ports(&["A", "B", "C"]), factory, CarrierConfig::new());
    let account = detector.detect_any().expect("detect").expect("account on C");

    assert_eq!(account.port(), "C");
    assert!(unplugged_log.closed());
    assert_eq!(detector.factory().opened(), vec!["A", "B", "C"]);
}

#[test]
fn test_failed_kind_check_skips_port() {
    // No #125# screen: the kind check fails with a modem error
    let silent = ScriptedTransport::new("A").on_request("#150#", "Number:\r\n0400000001");
    let silent_log = silent.log();
    let factory = ScriptedFactory::new()
        .with_transport(silent)
        .with_transport(sim("B", "0400000002"));

    let detector = Autodetector::new(ports(&["A", "B"]), factory, CarrierConfig::new());
    let account = detector.detect_any().expect("detect").expect("account on B");

    assert_eq!(account.port(), "B");
    assert!(silent_log.closed());
}

#[test]
fn test_postpaid_classification() {
    let transport = ScriptedTransport::new("A").on_request("#125#", "Bal: $10.00");
    let factory = ScriptedFactory::new().with_transport(transport);

    let detector = Autodetector::new(ports(&["A"]), factory, CarrierConfig::new());
    let account = detector.detect_any().expect("detect").expect("account");

    assert_eq!(account.known_kind(), Some(AccountKind::Postpaid));
}

#[test]
fn test_kind_check_timeout_classified_prepaid() {
    let transport = ScriptedTransport::new("A").fail_request(
        "#125#",
        TransportError::Timeout {
            operation: "#125#".to_string(),
            timeout_ms: 15_000,
        },
    );
    let factory = ScriptedFactory::new().with_transport(transport);

    let detector = Autodetector::new(ports(&["A"]), factory, CarrierConfig::new());
    let account = detector.detect_any().expect("detect").expect("account");

    assert_eq!(account.known_kind(), Some(AccountKind::Prepaid));
}

#[test]
fn test_pin_passed_to_connect() {
    let transport = sim("A", "0400000001");
    let log = transport.log();
    let factory = ScriptedFactory::new().with_transport(transport);

    let detector = Autodetector::new(ports(&["A"]), factory, CarrierConfig::new()).with_pin("1234");
    detector.detect_any().expect("detect").expect("account");

    assert_eq!(log.exchanges().first(), Some(&Exchange::Connect(Some("1234".to_string()))));
}
