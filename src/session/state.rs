use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    container_id: Option<String>,
    interrupted: bool,
    kills_in_flight: usize,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    kill_done: Condvar,
}

/// The part of a session both the controller and the interrupt thread touch.
///
/// The controller writes the container id once; the guardian marks the
/// session interrupted and reads the id. Both happen under one lock, so an
/// interrupt racing with launch completion is seen by at least one side.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Inner>,
}

/// A cleanup kill the guardian owes for an interrupted session.
///
/// While any of these is alive, [`SharedSession::wait_for_cleanup`] blocks.
#[derive(Debug)]
pub struct PendingKill {
    container_id: String,
    session: SharedSession,
}

impl PendingKill {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }
}

impl Drop for PendingKill {
    fn drop(&mut self) {
        let mut state = self.session.lock();
        state.kills_in_flight = state.kills_in_flight.saturating_sub(1);
        if state.kills_in_flight == 0 {
            self.session.inner.kill_done.notify_all();
        }
    }
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the launched container's id. Only the first non-empty id sticks.
    ///
    /// Returns `true` if an interrupt already arrived, in which case nobody has
    /// killed the container yet and the caller must.
    pub fn publish(&self, container_id: &str) -> bool {
        let mut state = self.lock();
        if state.container_id.is_none() && !container_id.is_empty() {
            state.container_id = Some(container_id.to_string());
        }
        state.interrupted
    }

    /// Mark the session interrupted and return the kill owed, if a container exists.
    ///
    /// The kill counts as in flight from the moment the flag is set until the
    /// returned [`PendingKill`] is dropped.
    pub fn interrupt(&self) -> Option<PendingKill> {
        let mut state = self.lock();
        state.interrupted = true;
        let container_id = state.container_id.clone()?;
        state.kills_in_flight += 1;
        Some(PendingKill {
            container_id,
            session: self.clone(),
        })
    }

    /// Block until every kill handed out by [`SharedSession::interrupt`] has finished.
    pub fn wait_for_cleanup(&self) {
        let state = self.lock();
        let _state = self
            .inner
            .kill_done
            .wait_while(state, |state| state.kills_in_flight > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    pub fn container_id(&self) -> Option<String> {
        self.lock().container_id.clone()
    }

    pub fn is_interrupted(&self) -> bool {
        self.lock().interrupted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_empty() {
        let session = SharedSession::new();
        assert_eq!(session.container_id(), None);
        assert!(!session.is_interrupted());
    }

    #[test]
    fn id_is_write_once() {
        let session = SharedSession::new();
        assert!(!session.publish("abc123"));
        session.publish("def456");
        assert_eq!(session.container_id().as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_id_is_not_published() {
        let session = SharedSession::new();
        session.publish("");
        assert_eq!(session.container_id(), None);
    }

    #[test]
    fn interrupt_before_publish_yields_nothing_to_kill() {
        let session = SharedSession::new();
        assert!(session.interrupt().is_none());
        assert!(session.is_interrupted());
        // The publisher learns about the earlier interrupt.
        assert!(session.publish("abc123"));
    }

    #[test]
    fn interrupt_after_publish_yields_id() {
        let session = SharedSession::new();
        session.publish("abc123");
        let pending = session.interrupt().unwrap();
        assert_eq!(pending.container_id(), "abc123");
    }

    #[test]
    fn clones_share_state() {
        let a = SharedSession::new();
        let b = a.clone();
        a.publish("abc123");
        drop(b.interrupt());
        assert!(a.is_interrupted());
        assert_eq!(b.container_id().as_deref(), Some("abc123"));
    }

    #[test]
    fn cleanup_wait_returns_immediately_without_kills() {
        let session = SharedSession::new();
        session.wait_for_cleanup();
        assert!(session.interrupt().is_none());
        session.wait_for_cleanup();
    }

    #[test]
    fn cleanup_wait_blocks_until_pending_kill_is_dropped() {
        let session = SharedSession::new();
        session.publish("abc123");
        let pending = session.interrupt().unwrap();
        let killed = Arc::new(AtomicBool::new(false));

        let finisher = {
            let killed = killed.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                killed.store(true, Ordering::SeqCst);
                drop(pending);
            })
        };

        session.wait_for_cleanup();
        assert!(killed.load(Ordering::SeqCst));
        finisher.join().unwrap();
    }

    #[test]
    fn overlapping_kills_all_finish_before_cleanup_returns() {
        let session = SharedSession::new();
        session.publish("abc123");
        let first = session.interrupt().unwrap();
        let second = session.interrupt().unwrap();

        drop(first);
        let waiter = {
            let session = session.clone();
            thread::spawn(move || session.wait_for_cleanup())
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        drop(second);
        waiter.join().unwrap();
    }
}
