//! Hook interaction tests.
//!
//! Hooks receive the hub itself, so they can query it and call back into
//! it while a settlement is in progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use trustflow_core::{AssetId, AvatarId, INDEFINITE};
use trustflow_hub::{
    AcceptanceHook, Delivery, FlowMatrix, Hub, HubError, HubEvent, Rejection,
};
use trustflow_integration_tests::{Fixture, avatar, raw_matrix, stream, tokens};

// ============================================================================
// Helper Functions
// ============================================================================

/// A(10) pays B(20) directly in A's currency.
fn direct_payment() -> (Fixture, FlowMatrix) {
    let fx = Fixture::new();
    let (a, b) = (fx.human(10, 100), fx.human(20, 0));
    fx.trust(b, a);
    let matrix = raw_matrix(&[a, b], &[(0, 0, 1, 10, 1)], vec![stream(0, &[0])]);
    (fx, matrix)
}

/// Tries to start a second settlement from inside the first.
struct ReentrantHook {
    matrix: FlowMatrix,
    outcome: Mutex<Option<HubError>>,
}

impl AcceptanceHook for ReentrantHook {
    fn on_receive(&self, hub: &Hub, _delivery: &Delivery<'_>) -> Result<(), Rejection> {
        if let Err(err) = hub.settle_flow(avatar(10), &self.matrix) {
            *self.outcome.lock() = Some(err);
        }
        Ok(())
    }
}

/// Records the receiver's balance at the time of the callback.
struct BalanceWitness {
    observed: Mutex<Option<(bool, u128)>>,
}

impl AcceptanceHook for BalanceWitness {
    fn on_receive(&self, hub: &Hub, delivery: &Delivery<'_>) -> Result<(), Rejection> {
        let balance = hub.balance_of(delivery.to, delivery.assets[0]);
        *self.observed.lock() = Some((hub.is_settling(), balance.as_atto()));
        Ok(())
    }
}

/// Trusts the sender back while accepting, then rejects.
struct TrustThenReject {
    me: AvatarId,
}

impl AcceptanceHook for TrustThenReject {
    fn on_receive(&self, hub: &Hub, delivery: &Delivery<'_>) -> Result<(), Rejection> {
        hub.trust(self.me, delivery.from, INDEFINITE)
            .map_err(|e| Rejection::new(e.to_string()))?;
        Err(Rejection::new("changed my mind"))
    }
}

/// Replaces itself with `next` while accepting, then rejects.
struct SwapThenReject {
    me: AvatarId,
    next: Arc<dyn AcceptanceHook>,
}

impl AcceptanceHook for SwapThenReject {
    fn on_receive(&self, hub: &Hub, _delivery: &Delivery<'_>) -> Result<(), Rejection> {
        hub.set_acceptance_hook(self.me, self.next.clone());
        Err(Rejection::new("swapped out"))
    }
}

/// Signals that it was reached, then waits for a release before rejecting.
struct PausingHook {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl AcceptanceHook for PausingHook {
    fn on_receive(&self, _hub: &Hub, _delivery: &Delivery<'_>) -> Result<(), Rejection> {
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv();
        Err(Rejection::new("released"))
    }
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn nested_settlement_from_hook_is_rejected() {
    let (fx, matrix) = direct_payment();
    let hook = Arc::new(ReentrantHook {
        matrix: matrix.clone(),
        outcome: Mutex::new(None),
    });
    fx.hub.set_acceptance_hook(avatar(20), hook.clone());

    fx.hub.settle_flow(avatar(10), &matrix).unwrap();

    assert_eq!(*hook.outcome.lock(), Some(HubError::Reentrancy));
    assert_eq!(fx.balance(avatar(20), avatar(10)), tokens(10));
    assert!(!fx.hub.is_settling());
}

#[test]
fn settlement_after_nested_attempt_succeeds() {
    let (fx, matrix) = direct_payment();
    let hook = Arc::new(ReentrantHook {
        matrix: matrix.clone(),
        outcome: Mutex::new(None),
    });
    fx.hub.set_acceptance_hook(avatar(20), hook);

    fx.hub.settle_flow(avatar(10), &matrix).unwrap();
    fx.hub.settle_flow(avatar(10), &matrix).unwrap();

    assert_eq!(fx.balance(avatar(20), avatar(10)), tokens(20));
}

// ============================================================================
// Hub Access From Hooks
// ============================================================================

#[test]
fn hook_sees_executed_balances() {
    let (fx, matrix) = direct_payment();
    let witness = Arc::new(BalanceWitness {
        observed: Mutex::new(None),
    });
    fx.hub.set_acceptance_hook(avatar(20), witness.clone());

    fx.hub.settle_flow(avatar(10), &matrix).unwrap();

    assert_eq!(
        *witness.observed.lock(),
        Some((true, tokens(10).as_atto()))
    );
}

#[test]
fn hook_side_effects_are_undone_with_the_settlement() {
    let (fx, matrix) = direct_payment();
    let b = avatar(20);
    fx.hub
        .set_acceptance_hook(b, Arc::new(TrustThenReject { me: b }));

    let err = fx.hub.settle_flow(avatar(10), &matrix).unwrap_err();

    assert!(err.to_string().contains("changed my mind"));
    assert!(!fx.hub.is_trusted(b, avatar(10)));
    assert!(!fx
        .hub
        .events()
        .iter()
        .any(|e| matches!(e, HubEvent::Trust { truster, .. } if *truster == b)));
    assert_eq!(fx.hub.balance_of(b, AssetId::of(avatar(10))), tokens(0));
}

#[test]
fn hook_can_be_replaced() {
    let (fx, matrix) = direct_payment();
    let b = avatar(20);
    fx.hub
        .set_acceptance_hook(b, Arc::new(TrustThenReject { me: b }));
    let recorder = Arc::new(trustflow_integration_tests::RecordingHook::default());
    fx.hub.set_acceptance_hook(b, recorder.clone());

    fx.hub.settle_flow(avatar(10), &matrix).unwrap();

    assert_eq!(recorder.seen().len(), 1);
}

#[test]
fn hook_swapped_during_failed_settlement_is_restored() {
    let (fx, matrix) = direct_payment();
    let b = avatar(20);
    let recorder = Arc::new(trustflow_integration_tests::RecordingHook::default());
    fx.hub.set_acceptance_hook(
        b,
        Arc::new(SwapThenReject {
            me: b,
            next: recorder.clone(),
        }),
    );

    let err = fx.hub.settle_flow(avatar(10), &matrix).unwrap_err();
    assert!(err.to_string().contains("swapped out"));

    let err = fx.hub.settle_flow(avatar(10), &matrix).unwrap_err();
    assert!(err.to_string().contains("swapped out"));
    assert!(recorder.seen().is_empty());
}

// ============================================================================
// Isolation Across Threads
// ============================================================================

#[test]
fn other_threads_wait_for_the_settlement_to_finish() {
    let (fx, matrix) = direct_payment();
    let (a, b, d) = (avatar(10), avatar(20), avatar(40));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    fx.hub.set_acceptance_hook(
        b,
        Arc::new(PausingHook {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }),
    );
    let observer_done = AtomicBool::new(false);

    thread::scope(|s| {
        let settler = s.spawn(|| fx.hub.settle_flow(a, &matrix));
        entered_rx.recv().unwrap();

        let observer = s.spawn(|| {
            let seen = fx.hub.balance_of(b, AssetId::of(a));
            fx.hub
                .with_ledger(|ledger| ledger.mint(d, AssetId::of(d), tokens(7), &[]))
                .unwrap();
            observer_done.store(true, Ordering::SeqCst);
            seen
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!observer_done.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        let err = settler.join().unwrap().unwrap_err();
        assert!(err.to_string().contains("released"));
        assert_eq!(observer.join().unwrap(), tokens(0));
    });

    assert_eq!(fx.hub.balance_of(d, AssetId::of(d)), tokens(7));
    assert_eq!(fx.balance(b, a), tokens(0));
    assert_eq!(fx.balance(a, a), tokens(100));
}
