#![cfg(test)]
use std::net::Ipv4Addr;
use std::time::Duration;

use lure_common::config::CaptureDefaults;
use lure_core::ErrorKind;
use lure_core::capture::{CaptureWindow, DnsExchange, capture_dns};
use lure_core::session::{Session, SessionConfig};
use lure_core::testing::{FakeLinks, HOST_IP};
use lure_protocols::fixtures::{self, Transport};

const RESOLVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 53);
const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 20);

fn tcp_response(name: &str) -> Vec<u8> {
    let message = fixtures::dns_message(name, 2);
    let mut payload = (message.len() as u16).to_be_bytes().to_vec();
    payload.extend_from_slice(&message);
    fixtures::ipv4_frame(RESOLVER, CLIENT, Transport::Tcp, 53, 51_000, &payload)
}

fn mixed_traffic() -> Vec<Vec<u8>> {
    vec![
        // outgoing query, no answers yet
        fixtures::ipv4_frame(
            CLIENT,
            RESOLVER,
            Transport::Udp,
            40_000,
            53,
            &fixtures::dns_message("example.com", 0),
        ),
        fixtures::ipv4_frame(
            RESOLVER,
            CLIENT,
            Transport::Udp,
            53,
            40_000,
            &fixtures::dns_message("example.com", 1),
        ),
        fixtures::non_ip_frame(),
        fixtures::ipv4_frame(
            RESOLVER,
            CLIENT,
            Transport::Udp,
            5353,
            5353,
            &fixtures::dns_message("printer.local", 1),
        ),
        tcp_response("mail.example.org"),
        fixtures::dns_response_frame(Ipv4Addr::new(10, 0, 0, 5), "example.com"),
    ]
}

#[tokio::test(start_paused = true)]
async fn window_reports_answered_lookups_in_arrival_order() {
    let links = FakeLinks::lan().with_frames(mixed_traffic());
    let defaults = CaptureDefaults {
        duration_sec: 3,
        ..CaptureDefaults::default()
    };
    let window = CaptureWindow::from_defaults("eth0", &defaults);

    let started = tokio::time::Instant::now();
    let result = capture_dns(&window, &links).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert!(!result.truncated);
    assert_eq!(
        result.exchanges,
        vec![
            DnsExchange {
                source_ip: RESOLVER,
                queried_name: "example.com".to_string(),
            },
            DnsExchange {
                source_ip: RESOLVER,
                queried_name: "mail.example.org".to_string(),
            },
            DnsExchange {
                source_ip: Ipv4Addr::new(10, 0, 0, 5),
                queried_name: "example.com".to_string(),
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn window_can_be_addressed_by_interface_ip() {
    let links = FakeLinks::lan().with_frames(mixed_traffic());
    let window = CaptureWindow::new("10.0.0.42", Duration::from_secs(1));

    let result = capture_dns(&window, &links).await.unwrap();
    assert_eq!(result.exchanges.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn capture_runs_alongside_a_session() {
    let links = FakeLinks::lan()
        .with_targets([CLIENT])
        .with_frames(mixed_traffic());
    let config = SessionConfig {
        interface: "eth0".to_string(),
        host_ip: HOST_IP.to_string(),
        targets: CLIENT.to_string(),
        injection_interval: Duration::from_millis(200),
        session_duration: Duration::from_secs(1),
        restore_interval: Duration::from_millis(500),
        restore_duration: Duration::from_secs(1),
        host_resolve_timeout: Duration::from_secs(2),
    };
    let window = CaptureWindow::new("eth0", Duration::from_secs(5));

    let (summary, captured) = tokio::join!(Session::run(config, &links), capture_dns(&window, &links));

    let summary = summary.unwrap();
    assert!(summary.poison.sent > 0);
    assert!(summary.restore.sent > 0);
    assert_eq!(captured.unwrap().exchanges.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_open_is_a_resource_error() {
    let links = FakeLinks::lan().failing_open();
    let window = CaptureWindow::new("eth0", Duration::from_secs(1));

    let err = capture_dns(&window, &links).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
}
