//! Shared unlocked-session cache and auto-lock timer.

use crate::{LockEvent, Session};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// In-memory unlocked state shared by every vault variant: the cached
/// session, the lock-event channel, and the idle timer that clears the cache.
pub(crate) struct LockState {
    cache: Arc<Mutex<Option<Session>>>,
    events: broadcast::Sender<LockEvent>,
    lock_after: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LockState {
    pub(crate) fn new(lock_after: Duration) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            cache: Arc::new(Mutex::new(None)),
            events,
            lock_after,
            timer: Mutex::new(None),
        }
    }

    pub(crate) fn cached(&self) -> Option<Session> {
        self.cache.lock().unwrap().clone()
    }

    /// Cache an unlocked session and (re)arm the idle timer.
    pub(crate) fn unlock(&self, session: Session) {
        *self.cache.lock().unwrap() = Some(session);
        self.arm();
    }

    /// Drop the unlocked state without emitting an event (logout path).
    pub(crate) fn forget(&self) {
        *self.cache.lock().unwrap() = None;
        self.disarm();
    }

    /// Drop the unlocked state and notify subscribers of an explicit lock.
    pub(crate) fn lock(&self, saved: bool) {
        *self.cache.lock().unwrap() = None;
        self.disarm();
        let _ = self.events.send(LockEvent {
            saved,
            timeout: false,
        });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<LockEvent> {
        self.events.subscribe()
    }

    /// Arm the auto-lock timer. Replaces any previous timer. Skipped when no
    /// tokio runtime is present (sync hosts manage locking explicitly) or
    /// when the idle delay is zero.
    fn arm(&self) {
        if self.lock_after.is_zero() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, auto-lock timer not armed");
            return;
        };

        let cache = Arc::clone(&self.cache);
        let events = self.events.clone();
        let after = self.lock_after;
        let task = handle.spawn(async move {
            tokio::time::sleep(after).await;
            let was_unlocked = cache.lock().unwrap().take().is_some();
            if was_unlocked {
                debug!("vault auto-locked after idle timeout");
                let _ = events.send(LockEvent {
                    saved: true,
                    timeout: true,
                });
            }
        });

        if let Some(previous) = self.timer.lock().unwrap().replace(task) {
            previous.abort();
        }
    }

    fn disarm(&self) {
        if let Some(task) = self.timer.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for LockState {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("token", "user@test.org")
    }

    #[test]
    fn unlock_and_forget_without_runtime() {
        let state = LockState::new(Duration::from_millis(5000));
        assert!(state.cached().is_none());
        state.unlock(session());
        assert_eq!(state.cached(), Some(session()));
        state.forget();
        assert!(state.cached().is_none());
    }

    #[test]
    fn explicit_lock_emits_event() {
        let state = LockState::new(Duration::ZERO);
        let mut rx = state.subscribe();
        state.unlock(session());
        state.lock(true);

        assert!(state.cached().is_none());
        let event = rx.try_recv().unwrap();
        assert_eq!(
            event,
            LockEvent {
                saved: true,
                timeout: false
            }
        );
    }

    #[tokio::test]
    async fn idle_timeout_locks_and_emits() {
        let state = LockState::new(Duration::from_millis(20));
        let mut rx = state.subscribe();
        state.unlock(session());

        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("timed out waiting for lock event")
            .unwrap();
        assert_eq!(
            event,
            LockEvent {
                saved: true,
                timeout: true
            }
        );
        assert!(state.cached().is_none());
    }

    #[tokio::test]
    async fn re_arming_replaces_the_timer() {
        let state = LockState::new(Duration::from_millis(40));
        let mut rx = state.subscribe();
        state.unlock(session());
        tokio::time::sleep(Duration::from_millis(20)).await;
        // second unlock resets the idle window
        state.unlock(session());
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(state.cached().is_some());

        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("timed out waiting for lock event")
            .unwrap();
        assert!(event.timeout);
    }

    #[tokio::test]
    async fn logout_before_timeout_emits_nothing() {
        let state = LockState::new(Duration::from_millis(20));
        let mut rx = state.subscribe();
        state.unlock(session());
        state.forget();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }
}
