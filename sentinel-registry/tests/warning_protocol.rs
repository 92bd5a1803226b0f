//! End-to-end warning protocol scenarios
//!
//! Drives full vault lifecycles on a manual clock: expiry, warning, grace,
//! yield, and both resolutions of the liveness verdict.

use std::sync::Arc;

use sentinel_registry::{
    ManualClock, RegistryError, ResolveStatus, SentinelRegistry, VaultSetup, WarningStatus,
    YieldStatus,
};
use tempfile::TempDir;

const AGENT: &str = "agent.test";

fn registry() -> (SentinelRegistry, Arc<ManualClock>, TempDir) {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let registry =
        SentinelRegistry::with_clock(dir.path().join("registry"), AGENT, clock.clone()).unwrap();
    (registry, clock, dir)
}

/// interval=60s, grace=60s: the full timeline from setup to a cancelled
/// yield, with every intermediate gate checked.
#[test]
fn recovery_timeline() {
    let (registry, clock, _dir) = registry();

    registry
        .setup_vault(
            "alice.test",
            VaultSetup::new("bob.test")
                .with_interval_ms(60_000)
                .with_grace_period_ms(60_000),
        )
        .unwrap();
    registry.deposit("alice.test", "alice.test", 500).unwrap();

    // t=30s: window still open.
    clock.set(30_000);
    let outcome = registry.trigger_warning("alice.test").unwrap();
    assert_eq!(outcome.status, WarningStatus::NotExpired);

    // t=70s: expired, warning raised.
    clock.set(70_000);
    let outcome = registry.trigger_warning("alice.test").unwrap();
    assert_eq!(outcome.status, WarningStatus::WarningTriggered);

    // t=100s: still inside the grace window.
    clock.set(100_000);
    let outcome = registry.begin_yield("alice.test").unwrap();
    assert_eq!(outcome.status, YieldStatus::WarningGracePeriod);
    assert!(!outcome.is_yielding);

    // t=140s: grace elapsed, yield entered.
    clock.set(140_000);
    let outcome = registry.begin_yield("alice.test").unwrap();
    assert_eq!(outcome.status, YieldStatus::YieldInitiated);
    assert!(outcome.is_yielding);

    // t=150s: negative verdict cancels the yield, funds untouched.
    clock.set(150_000);
    let outcome = registry.resolve_yield("alice.test", false).unwrap();
    assert_eq!(outcome.status, ResolveStatus::ResumedAlive);

    let view = registry.get_vault("alice.test").unwrap().unwrap();
    assert!(!view.is_yielding);
    assert!(!view.is_completed);
    assert_eq!(view.warning_triggered_at_ms, 0);
    assert_eq!(view.balance, 500);
}

/// Same timeline with a confirmed verdict: the balance moves to the
/// beneficiary exactly once and the vault freezes.
#[test]
fn transfer_timeline() {
    let (registry, clock, _dir) = registry();

    registry
        .setup_vault(
            "alice.test",
            VaultSetup::new("bob.test")
                .with_interval_ms(60_000)
                .with_grace_period_ms(60_000),
        )
        .unwrap();
    registry.deposit("alice.test", "alice.test", 1_000).unwrap();

    clock.set(70_000);
    registry.trigger_warning("alice.test").unwrap();
    clock.set(140_000);
    registry.begin_yield("alice.test").unwrap();

    let outcome = registry.resolve_yield("alice.test", true).unwrap();
    assert_eq!(outcome.status, ResolveStatus::TransferComplete);
    assert_eq!(outcome.transferred, 1_000);
    assert_eq!(registry.payout_balance("bob.test").unwrap(), 1_000);

    let view = registry.get_vault("alice.test").unwrap().unwrap();
    assert_eq!(view.balance, 0);
    assert!(view.is_completed);
    assert!(view.is_emergency);

    assert!(matches!(
        registry.resolve_yield("alice.test", true),
        Err(RegistryError::NotYielding)
    ));
    assert!(matches!(
        registry.heartbeat("alice.test"),
        Err(RegistryError::VaultCompleted)
    ));
}

/// A heartbeat at any point before the confirmed verdict restores the vault.
#[test]
fn heartbeat_recovers_until_the_last_moment() {
    let (registry, clock, _dir) = registry();

    registry
        .setup_vault(
            "alice.test",
            VaultSetup::new("bob.test")
                .with_interval_ms(60_000)
                .with_grace_period_ms(60_000),
        )
        .unwrap();

    clock.set(70_000);
    registry.trigger_warning("alice.test").unwrap();
    clock.set(140_000);
    registry.begin_yield("alice.test").unwrap();

    // Owner comes back mid-yield, before any verdict lands.
    clock.set(141_000);
    registry.heartbeat("alice.test").unwrap();

    let view = registry.get_vault("alice.test").unwrap().unwrap();
    assert!(!view.is_expired);
    assert!(!view.is_yielding);
    assert_eq!(view.warning_triggered_at_ms, 0);

    // The verdict path now has nothing to act on.
    assert!(matches!(
        registry.resolve_yield("alice.test", true),
        Err(RegistryError::NotYielding)
    ));
}

/// An empty vault still completes on a confirmed verdict.
#[test]
fn empty_vault_completes_without_transfer() {
    let (registry, clock, _dir) = registry();

    registry
        .setup_vault(
            "alice.test",
            VaultSetup::new("bob.test")
                .with_interval_ms(60_000)
                .with_grace_period_ms(60_000),
        )
        .unwrap();

    clock.set(70_000);
    registry.trigger_warning("alice.test").unwrap();
    clock.set(140_000);
    registry.begin_yield("alice.test").unwrap();

    let outcome = registry.resolve_yield("alice.test", true).unwrap();
    assert_eq!(outcome.status, ResolveStatus::TransferEmpty);
    assert_eq!(outcome.transferred, 0);
    assert_eq!(registry.payout_balance("bob.test").unwrap(), 0);
    assert!(registry.get_vault("alice.test").unwrap().unwrap().is_completed);
}

/// The payload round-trips exactly, and only after completion for the
/// beneficiary.
#[test]
fn payload_disclosure_is_causally_gated() {
    let (registry, clock, _dir) = registry();

    let payload = "archive://blob/9f8a7c?key=base64:q2FzY2FkZQ==";
    registry
        .setup_vault(
            "alice.test",
            VaultSetup::new("bob.test")
                .with_interval_ms(60_000)
                .with_grace_period_ms(60_000)
                .with_secure_payload(payload),
        )
        .unwrap();

    assert!(matches!(
        registry.reveal_payload("bob.test", "alice.test"),
        Err(RegistryError::Unauthorized(_))
    ));

    clock.set(70_000);
    registry.trigger_warning("alice.test").unwrap();
    clock.set(140_000);
    registry.begin_yield("alice.test").unwrap();
    registry.resolve_yield("alice.test", true).unwrap();

    assert_eq!(
        registry.reveal_payload("bob.test", "alice.test").unwrap(),
        payload
    );
}
