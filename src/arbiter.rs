//! Event arbitration: first of activation / dismissal / failure wins
//!
//! Each listener writes into its own one-shot channel from the renderer's
//! callback thread; the waiting task races the three receivers, runs the
//! matching reaction, then unregisters every listener. Unregistration also
//! runs from `Drop`, so an aborted or timed-out wait still releases them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{RenderError, ToastError};
use crate::renderer::{
    Activation, DismissReason, FailureCode, Listener, ListenerToken, NotificationHandle,
};

/// Terminal outcome of one shown toast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "camelCase")]
pub enum Outcome {
    Activated(Activation),
    Dismissed(DismissReason),
    Failed(FailureCode),
}

/// Caller reaction to one outcome kind
pub type Reaction<T> = Box<dyn FnOnce(&T) + Send>;

/// Per-outcome reactions; a missing one only logs the outcome
#[derive(Default)]
pub struct Reactions {
    pub on_activated: Option<Reaction<Activation>>,
    pub on_dismissed: Option<Reaction<DismissReason>>,
    pub on_failed: Option<Reaction<FailureCode>>,
}

impl Reactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_click(mut self, f: impl FnOnce(&Activation) + Send + 'static) -> Self {
        self.on_activated = Some(Box::new(f));
        self
    }

    pub fn on_dismissed(mut self, f: impl FnOnce(&DismissReason) + Send + 'static) -> Self {
        self.on_dismissed = Some(Box::new(f));
        self
    }

    pub fn on_failed(mut self, f: impl FnOnce(&FailureCode) + Send + 'static) -> Self {
        self.on_failed = Some(Box::new(f));
        self
    }

    fn react(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Activated(a) => match self.on_activated.take() {
                Some(f) => f(a),
                None => info!(arguments = %a.arguments, inputs = ?a.user_inputs, "toast activated"),
            },
            Outcome::Dismissed(r) => match self.on_dismissed.take() {
                Some(f) => f(r),
                None => info!(reason = ?r, "toast dismissed"),
            },
            Outcome::Failed(c) => match self.on_failed.take() {
                Some(f) => f(c),
                None => warn!(code = %c, "toast failed"),
            },
        }
    }
}

impl std::fmt::Debug for Reactions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactions")
            .field("on_activated", &self.on_activated.is_some())
            .field("on_dismissed", &self.on_dismissed.is_some())
            .field("on_failed", &self.on_failed.is_some())
            .finish()
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    Armed,
    Resolved,
    TornDown,
}

/// Listener resolving its signal at most once, from any thread
///
/// All listeners of a session share `claimed`; only the first one invoked
/// sends, so the earliest signal wins even when several land before the
/// waiting task is polled.
fn signal<T: Send + 'static>(
    claimed: &Arc<AtomicBool>,
) -> (Listener<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));
    let claimed = Arc::clone(claimed);
    let listener: Listener<T> = Box::new(move |value: T| {
        if claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("signal after another one won; ignored");
            return;
        }
        let tx = slot.lock().ok().and_then(|mut s| s.take());
        if let Some(tx) = tx {
            // Receiver gone: session already resolved or torn down
            let _ = tx.send(value);
        }
    });
    (listener, rx)
}

/// Live notification with its three listeners registered
pub struct Session<H: NotificationHandle> {
    handle: H,
    tokens: Vec<ListenerToken>,
    activated: oneshot::Receiver<Activation>,
    dismissed: oneshot::Receiver<DismissReason>,
    failed: oneshot::Receiver<FailureCode>,
    reactions: Reactions,
    state: ArbiterState,
}

impl<H: NotificationHandle> Session<H> {
    /// Register activation, dismissal and failure listeners on `handle`
    ///
    /// A registration error unregisters whatever was already registered.
    pub fn arm(handle: H, reactions: Reactions) -> Result<Self, RenderError> {
        let claimed = Arc::new(AtomicBool::new(false));
        let (on_activated, activated) = signal(&claimed);
        let (on_dismissed, dismissed) = signal(&claimed);
        let (on_failed, failed) = signal(&claimed);

        let mut session = Self {
            handle,
            tokens: Vec::with_capacity(3),
            activated,
            dismissed,
            failed,
            reactions,
            state: ArbiterState::Armed,
        };
        let token = session.handle.on_activated(on_activated)?;
        session.tokens.push(token);
        let token = session.handle.on_dismissed(on_dismissed)?;
        session.tokens.push(token);
        let token = session.handle.on_failed(on_failed)?;
        session.tokens.push(token);

        debug!("session armed");
        Ok(session)
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Wait for the first signal, react to it, then unregister all listeners
    pub async fn wait(mut self) -> Result<Outcome, ToastError> {
        let outcome = tokio::select! {
            Ok(a) = &mut self.activated => Outcome::Activated(a),
            Ok(r) = &mut self.dismissed => Outcome::Dismissed(r),
            Ok(c) = &mut self.failed => Outcome::Failed(c),
            else => {
                warn!("every listener signal dropped without resolving");
                return Err(ToastError::SessionClosed);
            }
        };
        Ok(self.conclude(outcome))
    }

    /// Like [`Session::wait`], giving up after `timeout`
    ///
    /// Listeners are unregistered on timeout as well.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<Outcome, ToastError> {
        match tokio::time::timeout(timeout, self.wait()).await {
            Ok(result) => result,
            Err(_) => {
                info!(?timeout, "no toast outcome before timeout");
                Err(ToastError::TimedOut(timeout))
            }
        }
    }

    /// Resolve with an outcome produced outside the listeners (e.g. show refused)
    pub fn conclude(mut self, outcome: Outcome) -> Outcome {
        self.activated.close();
        self.dismissed.close();
        self.failed.close();
        self.state = ArbiterState::Resolved;
        debug!(outcome = ?outcome, "session resolved");

        self.reactions.react(&outcome);
        self.teardown();
        outcome
    }

    fn teardown(&mut self) {
        if self.state == ArbiterState::TornDown {
            return;
        }
        for token in self.tokens.drain(..) {
            if let Err(e) = self.handle.remove_listener(token) {
                warn!(kind = ?token.kind, error = %e, "listener removal failed");
            }
        }
        self.state = ArbiterState::TornDown;
        debug!("session torn down");
    }
}

impl<H: NotificationHandle> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("tokens", &self.tokens)
            .field("reactions", &self.reactions)
            .finish_non_exhaustive()
    }
}

impl<H: NotificationHandle> Drop for Session<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::EventKind;
    use crate::renderer::fake::FakeHandle;
    use std::sync::atomic::AtomicUsize;

    /// Reactions counting invocations per outcome kind
    fn counting() -> (Reactions, Arc<[AtomicUsize; 3]>) {
        let counts = Arc::new([AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0)]);
        let (a, d, f) = (counts.clone(), counts.clone(), counts.clone());
        let reactions = Reactions::new()
            .on_click(move |_| {
                a[0].fetch_add(1, Ordering::SeqCst);
            })
            .on_dismissed(move |_| {
                d[1].fetch_add(1, Ordering::SeqCst);
            })
            .on_failed(move |_| {
                f[2].fetch_add(1, Ordering::SeqCst);
            });
        (reactions, counts)
    }

    fn snapshot(counts: &[AtomicUsize; 3]) -> [usize; 3] {
        [0, 1, 2].map(|i| counts[i].load(Ordering::SeqCst))
    }

    // ========== Race Tests ==========

    #[tokio::test]
    async fn test_dismissed_user_canceled() {
        let handle = FakeHandle::default();
        let (reactions, counts) = counting();
        let session = Session::arm(handle.clone(), reactions).unwrap();
        assert_eq!(session.state(), ArbiterState::Armed);
        assert_eq!(handle.live_listeners(), 3);

        handle.fire_dismissed(DismissReason::UserCanceled);
        let outcome = session.wait().await.unwrap();

        assert_eq!(outcome, Outcome::Dismissed(DismissReason::UserCanceled));
        assert_eq!(snapshot(&counts), [0, 1, 0]);
        assert_eq!(handle.live_listeners(), 0);
        assert_eq!(handle.removed().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_unregisters_others() {
        let handle = FakeHandle::default();
        let (reactions, counts) = counting();
        let session = Session::arm(handle.clone(), reactions).unwrap();

        handle.fire_failed(FailureCode(0x803E0105));
        let outcome = session.wait().await.unwrap();

        assert_eq!(outcome, Outcome::Failed(FailureCode(0x803E0105)));
        let removed: Vec<_> = handle.removed().iter().map(|t| t.kind).collect();
        assert!(removed.contains(&EventKind::Activated));
        assert!(removed.contains(&EventKind::Dismissed));
        assert!(removed.contains(&EventKind::Failed));

        // late signals reach nobody
        handle.fire_activated(Activation::default());
        handle.fire_dismissed(DismissReason::TimedOut);
        assert_eq!(snapshot(&counts), [0, 0, 1]);
    }

    #[tokio::test]
    async fn test_activation_payload() {
        let handle = FakeHandle::default();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let reactions = Reactions::new().on_click(move |a| {
            *sink.lock().unwrap() = Some(a.clone());
        });
        let session = Session::arm(handle.clone(), reactions).unwrap();

        let mut activation = Activation {
            arguments: "http:Play".into(),
            ..Activation::default()
        };
        activation.user_inputs.insert("reply".into(), "hello".into());

        let firing = handle.clone();
        let fired = activation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            firing.fire_activated(fired);
        });

        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome, Outcome::Activated(activation.clone()));
        // reaction effects visible once wait returns
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&activation));
    }

    #[tokio::test]
    async fn test_concurrent_signals_single_winner() {
        let handle = FakeHandle::default();
        let (reactions, counts) = counting();
        let session = Session::arm(handle.clone(), reactions).unwrap();

        handle.fire_failed(FailureCode(1));
        handle.fire_dismissed(DismissReason::UserCanceled);
        handle.fire_activated(Activation::default());
        session.wait().await.unwrap();

        assert_eq!(snapshot(&counts).iter().sum::<usize>(), 1);
        assert_eq!(handle.live_listeners(), 0);
    }

    #[tokio::test]
    async fn test_first_invoked_signal_wins() {
        for _ in 0..200 {
            let handle = FakeHandle::default();
            let (reactions, counts) = counting();
            let session = Session::arm(handle.clone(), reactions).unwrap();

            handle.fire_failed(FailureCode(1));
            handle.fire_dismissed(DismissReason::UserCanceled);
            let outcome = session.wait().await.unwrap();

            assert_eq!(outcome, Outcome::Failed(FailureCode(1)));
            assert_eq!(snapshot(&counts), [0, 0, 1]);
        }
    }

    #[tokio::test]
    async fn test_signal_resolves_once() {
        let handle = FakeHandle::default();
        let session = Session::arm(handle.clone(), Reactions::new()).unwrap();

        handle.fire_dismissed(DismissReason::ApplicationHidden);
        handle.fire_dismissed(DismissReason::TimedOut);
        let outcome = session.wait().await.unwrap();
        assert_eq!(outcome, Outcome::Dismissed(DismissReason::ApplicationHidden));
    }

    // ========== Teardown Tests ==========

    #[tokio::test]
    async fn test_timeout_still_unregisters() {
        let handle = FakeHandle::default();
        let (reactions, counts) = counting();
        let session = Session::arm(handle.clone(), reactions).unwrap();

        let err = session
            .wait_timeout(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ToastError::TimedOut(_)));
        assert_eq!(handle.live_listeners(), 0);
        assert_eq!(snapshot(&counts), [0, 0, 0]);
    }

    #[tokio::test]
    async fn test_aborted_wait_unregisters() {
        let handle = FakeHandle::default();
        let session = Session::arm(handle.clone(), Reactions::new()).unwrap();

        let task = tokio::spawn(session.wait());
        tokio::task::yield_now().await;
        task.abort();
        let _ = task.await;

        assert_eq!(handle.live_listeners(), 0);
    }

    #[test]
    fn test_drop_without_wait_unregisters() {
        let handle = FakeHandle::default();
        let session = Session::arm(handle.clone(), Reactions::new()).unwrap();
        assert_eq!(handle.live_listeners(), 3);
        drop(session);
        assert_eq!(handle.live_listeners(), 0);
    }

    #[test]
    fn test_registration_failure_releases_earlier_listeners() {
        let handle = FakeHandle::default();
        handle.refuse(EventKind::Failed);
        let err = Session::arm(handle.clone(), Reactions::new()).unwrap_err();
        assert_eq!(err.operation, "add_listener");
        assert_eq!(handle.live_listeners(), 0);
        assert_eq!(handle.removed().len(), 2);
    }

    #[test]
    fn test_conclude_runs_failure_reaction() {
        let handle = FakeHandle::default();
        let (reactions, counts) = counting();
        let session = Session::arm(handle.clone(), reactions).unwrap();

        let outcome = session.conclude(Outcome::Failed(FailureCode(0x80070005)));
        assert_eq!(outcome, Outcome::Failed(FailureCode(0x80070005)));
        assert_eq!(snapshot(&counts), [0, 0, 1]);
        assert_eq!(handle.live_listeners(), 0);
    }

    #[test]
    fn test_outcome_json() {
        let json = serde_json::to_string(&Outcome::Dismissed(DismissReason::UserCanceled)).unwrap();
        assert_eq!(json, r#"{"outcome":"dismissed","value":"UserCanceled"}"#);
    }
}
