#![cfg(test)]
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use lure_common::AddressBinding;
use lure_core::ErrorKind;
use lure_core::SpoofError;
use lure_core::session::{Session, SessionConfig, SessionState};
use lure_core::testing::{FakeLinks, HOST_IP, HOST_MAC, OPERATOR_IP, OPERATOR_MAC, target_mac};
use lure_protocols::arp::ArpFrame;

fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn config(targets: &str) -> SessionConfig {
    SessionConfig {
        interface: "eth0".to_string(),
        host_ip: HOST_IP.to_string(),
        targets: targets.to_string(),
        injection_interval: Duration::from_millis(100),
        session_duration: Duration::from_secs(2),
        restore_interval: Duration::from_millis(500),
        restore_duration: Duration::from_secs(2),
        host_resolve_timeout: Duration::from_secs(2),
    }
}

fn is_poison(frame: &ArpFrame) -> bool {
    frame.sender == AddressBinding::new(HOST_IP, OPERATOR_MAC)
}

fn is_restore(frame: &ArpFrame) -> bool {
    frame.sender == AddressBinding::new(HOST_IP, HOST_MAC)
}

/// A range of three live targets goes through the whole lifecycle: each
/// one is poisoned, then restored, and never poisoned again afterwards.
#[tokio::test(start_paused = true)]
async fn session_poisons_and_restores_every_target() {
    let targets = [ip(20), ip(21), ip(22)];
    let links = FakeLinks::lan().with_targets(targets);
    let log = links.log();

    let summary = Session::run(config("10.0.0.20-10.0.0.22"), &links)
        .await
        .expect("session should run");

    assert_eq!(
        summary.transitions,
        vec![
            SessionState::Idle,
            SessionState::Poisoning,
            SessionState::Restoring,
            SessionState::Terminated,
        ]
    );
    assert_eq!(summary.targets, 3);
    assert_eq!(summary.host, AddressBinding::new(HOST_IP, HOST_MAC));
    assert_eq!(summary.poison.failed, 0);
    assert_eq!(summary.observer.interference, 0);

    let replies = log.arp_replies();
    for target in targets {
        let to_target: Vec<&ArpFrame> = replies.iter().filter(|r| r.target.ip() == target).collect();
        assert!(to_target.iter().all(|r| r.target.mac() == target_mac(target)));

        let first_restore = to_target
            .iter()
            .position(|r| is_restore(r))
            .unwrap_or_else(|| panic!("{target} was never restored"));
        assert!(to_target[..first_restore].iter().all(|r| is_poison(r)));
        assert!(to_target[first_restore..].iter().all(|r| is_restore(r)));
        assert!(first_restore > 0, "{target} was never poisoned");
    }
}

/// Silent addresses cost a probe per round but never stop the session.
#[tokio::test(start_paused = true)]
async fn wildcard_session_skips_silent_addresses() {
    let links = FakeLinks::lan().with_targets([ip(20), ip(21)]);
    let log = links.log();

    let summary = Session::run(config("10.0.0.*"), &links).await.unwrap();

    assert_eq!(summary.targets, 256);
    assert!(summary.poison.skipped > 0);

    let poisoned: HashSet<Ipv4Addr> = log
        .arp_replies()
        .iter()
        .filter(|r| is_poison(r))
        .map(|r| r.target.ip())
        .collect();
    assert!(poisoned.contains(&ip(20)));
    assert!(poisoned.contains(&ip(21)));
    assert!(!poisoned.contains(&ip(99)));

    let probed: HashSet<Ipv4Addr> = log.arp_requests().iter().map(|r| r.target.ip()).collect();
    assert!(probed.contains(&ip(99)));
    assert!(
        log.arp_requests()
            .iter()
            .all(|r| r.sender == AddressBinding::new(OPERATOR_IP, OPERATOR_MAC))
    );
}

#[tokio::test(start_paused = true)]
async fn interface_can_be_selected_by_its_address() {
    let links = FakeLinks::lan().with_targets([ip(20)]);
    let mut cfg = config("10.0.0.20");
    cfg.interface = OPERATOR_IP.to_string();

    let summary = Session::run(cfg, &links).await.unwrap();
    assert!(summary.poison.sent > 0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_targets_are_poisoned_once_per_round() {
    let links = FakeLinks::lan().with_targets([ip(20)]);
    let log = links.log();
    let mut cfg = config("10.0.0.20,10.0.0.20,10.0.0.20/32");
    cfg.session_duration = Duration::ZERO;
    cfg.restore_duration = Duration::ZERO;

    let summary = Session::run(cfg, &links).await.unwrap();

    assert_eq!(summary.targets, 1);
    assert_eq!(summary.poison.rounds, 1);
    assert_eq!(summary.restore.rounds, 1);
    assert!(log.arp_replies().iter().filter(|r| is_poison(r)).count() <= 1);
}

#[tokio::test(start_paused = true)]
async fn link_that_cannot_transmit_never_starts() {
    let links = FakeLinks::lan().with_targets([ip(20)]).failing_sends();

    let err = Session::start(config("10.0.0.20"), &links)
        .await
        .err()
        .expect("host cannot be probed");

    assert!(matches!(err, SpoofError::HostUnresolved(addr) if addr == HOST_IP));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(links.log().frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn state_watchers_see_termination() {
    let links = FakeLinks::lan().with_targets([ip(20)]);

    let running = Session::start(config("10.0.0.20"), &links).await.unwrap();
    let mut watcher = running.subscribe();
    assert_eq!(*watcher.borrow_and_update(), SessionState::Poisoning);

    let finish = tokio::spawn(running.finish());
    watcher.changed().await.unwrap();
    assert_eq!(*watcher.borrow_and_update(), SessionState::Restoring);

    finish.await.unwrap();
    assert_eq!(*watcher.borrow(), SessionState::Terminated);
}

struct Timing {
    session: u64,
    injection: u64,
    restore_interval: u64,
    restore: u64,
}

const fn ms(session: u64, injection: u64, restore_interval: u64, restore: u64) -> Timing {
    Timing {
        session,
        injection,
        restore_interval,
        restore,
    }
}

/// Phase order and per-target ordering hold for every timer combination,
/// including zero windows and intervals longer than their window.
#[tokio::test(start_paused = true)]
async fn ordering_holds_across_timer_combinations() {
    let timings = [
        ms(0, 100, 500, 0),
        ms(0, 1_000, 1_000, 1_000),
        ms(300, 1_000, 500, 0),
        ms(150, 40, 40, 150),
        ms(1_000, 100, 2_000, 500),
        ms(2_000, 250, 250, 1_000),
        ms(5_000, 3_000, 700, 2_000),
        ms(2_500, 2_500, 3_000, 3_000),
    ];
    let targets = [ip(20), ip(21), ip(22)];

    for timing in timings {
        let links = FakeLinks::lan().with_targets(targets);
        let log = links.log();
        let cfg = SessionConfig {
            injection_interval: Duration::from_millis(timing.injection),
            session_duration: Duration::from_millis(timing.session),
            restore_interval: Duration::from_millis(timing.restore_interval),
            restore_duration: Duration::from_millis(timing.restore),
            ..config("10.0.0.20-22")
        };
        let label = format!(
            "session={}ms injection={}ms restore={}ms every {}ms",
            timing.session, timing.injection, timing.restore, timing.restore_interval
        );

        let summary = Session::run(cfg, &links).await.unwrap();

        assert_eq!(
            summary.transitions,
            vec![
                SessionState::Idle,
                SessionState::Poisoning,
                SessionState::Restoring,
                SessionState::Terminated,
            ],
            "{label}"
        );
        assert!(summary.poison.rounds >= 1, "{label}");
        assert!(summary.restore.rounds >= 1, "{label}");
        assert_eq!(links.open_handles(), 0, "{label}");

        let replies = log.arp_replies();
        if let Some(first_restore) = replies.iter().position(is_restore) {
            assert!(
                replies[first_restore..].iter().all(is_restore),
                "{label}: poison after the first restore"
            );
        }
        for target in targets {
            let poisoned = replies
                .iter()
                .any(|r| r.target.ip() == target && is_poison(r));
            let restored = replies
                .iter()
                .any(|r| r.target.ip() == target && is_restore(r));
            assert!(!poisoned || restored, "{label}: {target} left poisoned");
        }
    }
}
