/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The driver's lifecycle state and the runtime's session state, kept
//! behind a single lock so that both threads see consistent pairs.

use xrdriver_api::Error;
use xrdriver_api::SessionState;

use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use log::debug;
use log::info;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

/// Where the driver is in its own lifecycle.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AppState {
    Created,
    Initializing,
    Initialized,
    Starting,
    SessionCreated,
    Started,
    Restarting,
    StopRequested,
    Stopping,
    Stopped,
    Disposed,
}

impl AppState {
    /// States in which a start is in flight or a session is live.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            AppState::Starting
                | AppState::SessionCreated
                | AppState::Started
                | AppState::Restarting
        )
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StateSnapshot {
    pub app: AppState,
    pub session: SessionState,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StateChange {
    App { from: AppState, to: AppState },
    Session { from: SessionState, to: SessionState },
}

struct Inner {
    app: AppState,
    session: SessionState,
    subscribers: Vec<Sender<StateChange>>,
}

impl Inner {
    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            app: self.app,
            session: self.session,
        }
    }

    fn publish(&mut self, change: StateChange) {
        self.subscribers.retain(|s| s.send(change).is_ok());
    }

    fn set_app(&mut self, to: AppState) -> AppState {
        let from = std::mem::replace(&mut self.app, to);
        if from != to {
            info!("App state {} -> {}", from, to);
            self.publish(StateChange::App { from, to });
        }
        from
    }
}

/// Guards the state pair and wakes waiters on every change.
///
/// Hosts observe the states; only the driver moves them.
///
/// ```compile_fail
/// use xrdriver::AppState;
/// use xrdriver::SessionMonitor;
///
/// let monitor = SessionMonitor::new();
/// monitor.set_app_state(AppState::Stopped);
/// ```
pub struct SessionMonitor {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Default for SessionMonitor {
    fn default() -> Self {
        SessionMonitor::new()
    }
}

impl SessionMonitor {
    pub fn new() -> Self {
        SessionMonitor {
            inner: Mutex::new(Inner {
                app: AppState::Created,
                session: SessionState::Unknown,
                subscribers: vec![],
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.lock().snapshot()
    }

    pub fn app_state(&self) -> AppState {
        self.lock().app
    }

    pub fn session_state(&self) -> SessionState {
        self.lock().session
    }

    pub(crate) fn set_app_state(&self, to: AppState) -> AppState {
        let from = self.lock().set_app(to);
        self.changed.notify_all();
        from
    }

    /// Moves to `to` if the current state passes `allowed`, returning the
    /// previous state. Otherwise returns the current state untouched.
    pub(crate) fn transition<F>(&self, allowed: F, to: AppState) -> Result<AppState, AppState>
    where
        F: Fn(AppState) -> bool,
    {
        let mut inner = self.lock();
        if !allowed(inner.app) {
            return Err(inner.app);
        }
        let from = inner.set_app(to);
        drop(inner);
        self.changed.notify_all();
        Ok(from)
    }

    pub(crate) fn set_session_state(&self, to: SessionState) -> SessionState {
        let mut inner = self.lock();
        let from = std::mem::replace(&mut inner.session, to);
        if from != to {
            debug!("Session state {} -> {}", from, to);
            inner.publish(StateChange::Session { from, to });
        }
        drop(inner);
        self.changed.notify_all();
        from
    }

    /// Asks a starting or running session to stop. Any blocked waiter
    /// wakes with `Error::Cancelled`.
    pub fn request_stop(&self) -> bool {
        self.transition(AppState::is_active, AppState::StopRequested)
            .is_ok()
    }

    /// Blocks until `predicate` holds. Fails with `Error::Cancelled` once a
    /// stop was requested or the driver was disposed.
    pub fn wait_until<F>(&self, predicate: F) -> Result<StateSnapshot, Error>
    where
        F: Fn(&StateSnapshot) -> bool,
    {
        let mut inner = self.lock();
        loop {
            let snapshot = inner.snapshot();
            if matches!(snapshot.app, AppState::StopRequested | AppState::Disposed) {
                return Err(Error::Cancelled);
            }
            if predicate(&snapshot) {
                return Ok(snapshot);
            }
            inner = self
                .changed
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until `predicate` holds or `timeout` elapses. Stop requests
    /// don't end the wait; this is meant for observers of the driver.
    pub fn wait_timeout<F>(&self, predicate: F, timeout: Duration) -> Option<StateSnapshot>
    where
        F: Fn(&StateSnapshot) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            let snapshot = inner.snapshot();
            if predicate(&snapshot) {
                return Some(snapshot);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            inner = self
                .changed
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Every later transition is sent to the returned receiver.
    pub fn subscribe(&self) -> Receiver<StateChange> {
        let (sender, receiver) = unbounded();
        self.lock().subscribers.push(sender);
        receiver
    }
}

/// Requests a stop from any thread.
#[derive(Clone)]
pub struct StopHandle {
    monitor: Arc<SessionMonitor>,
}

impl StopHandle {
    pub(crate) fn new(monitor: Arc<SessionMonitor>) -> Self {
        StopHandle { monitor }
    }

    pub fn request_stop(&self) -> bool {
        self.monitor.request_stop()
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.monitor
    }
}

/// Ends an event loop.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn request_stop_wakes_waiter() {
        let monitor = Arc::new(SessionMonitor::new());
        monitor.set_app_state(AppState::Starting);
        let waiter = monitor.clone();
        let handle =
            thread::spawn(move || waiter.wait_until(|s| s.session == SessionState::Ready));
        thread::sleep(Duration::from_millis(20));
        assert!(monitor.request_stop());
        assert_eq!(handle.join().unwrap(), Err(Error::Cancelled));
    }

    #[test]
    fn session_state_change_satisfies_waiter() {
        let monitor = Arc::new(SessionMonitor::new());
        monitor.set_app_state(AppState::Starting);
        let setter = monitor.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            setter.set_session_state(SessionState::Idle);
            setter.set_session_state(SessionState::Ready);
        });
        let snapshot = monitor
            .wait_until(|s| s.session == SessionState::Ready)
            .unwrap();
        assert_eq!(snapshot.app, AppState::Starting);
        handle.join().unwrap();
    }

    #[test]
    fn request_stop_is_ignored_when_idle() {
        let monitor = SessionMonitor::new();
        assert!(!monitor.request_stop());
        assert_eq!(monitor.app_state(), AppState::Created);
    }

    #[test]
    fn transition_rejects_disallowed_source() {
        let monitor = SessionMonitor::new();
        assert_eq!(
            monitor.transition(|s| s == AppState::Initialized, AppState::Starting),
            Err(AppState::Created)
        );
    }

    #[test]
    fn subscribers_see_transitions_in_order() {
        let monitor = SessionMonitor::new();
        let changes = monitor.subscribe();
        monitor.set_app_state(AppState::Initializing);
        monitor.set_session_state(SessionState::Idle);
        monitor.set_app_state(AppState::Initializing);
        let seen: Vec<_> = changes.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                StateChange::App {
                    from: AppState::Created,
                    to: AppState::Initializing
                },
                StateChange::Session {
                    from: SessionState::Unknown,
                    to: SessionState::Idle
                },
            ]
        );
    }
}
