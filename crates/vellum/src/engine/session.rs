//! One in-flight load attempt against an engine.
//!
//! A session is split in two halves created together by
//! [`EngineSession::channel`]:
//!
//! - [`EngineSession`] is owned by the loader. It receives [`SessionEvent`]s and
//!   is the only place a session can be destroyed.
//! - [`SessionHandle`] is owned by the engine (usually moved into its worker
//!   task). It reports progress, password challenges and the final outcome.
//!
//! Destroying the loader half flips a shared signal, aborts the worker task and
//! closes the event channel. Anything the engine sends afterwards is dropped.

use crate::error::LoadError;
use crate::loader::password::{PasswordChallenges, PasswordVerifier, PendingPassword};
use crate::loader::progress::ProgressData;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Something an engine reported for a session.
pub enum SessionEvent<D> {
    Progress(ProgressData),
    /// `reason` is the engine's raw reason code; see [`crate::loader::password`].
    PasswordRequired {
        verify: PasswordVerifier,
        reason: u8,
    },
    Resolved(D),
    Rejected(LoadError),
}

impl<D> fmt::Debug for SessionEvent<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Progress(progress) => f.debug_tuple("Progress").field(progress).finish(),
            SessionEvent::PasswordRequired { verify, reason } => f
                .debug_struct("PasswordRequired")
                .field("round", &verify.round())
                .field("reason", reason)
                .finish(),
            SessionEvent::Resolved(_) => f.write_str("Resolved"),
            SessionEvent::Rejected(error) => f.debug_tuple("Rejected").field(error).finish(),
        }
    }
}

/// Loader half of a session.
pub struct EngineSession<D> {
    name: String,
    events: mpsc::UnboundedReceiver<SessionEvent<D>>,
    destroyed: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl<D> EngineSession<D> {
    /// Create both halves of a new session.
    pub fn channel(name: impl Into<String>) -> (Self, SessionHandle<D>) {
        let name = name.into();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (destroyed, destroyed_rx) = watch::channel(false);

        let handle = SessionHandle {
            name: Arc::from(name.as_str()),
            events: events_tx,
            destroyed: destroyed_rx,
            challenges: Arc::new(PasswordChallenges::new()),
        };

        let session = Self {
            name,
            events,
            destroyed,
            worker: None,
        };

        (session, handle)
    }

    /// Attach the task doing the engine's work so `destroy` can abort it.
    pub fn with_worker(mut self, worker: JoinHandle<()>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next event. `None` once destroyed or once the engine dropped every handle.
    pub async fn next_event(&mut self) -> Option<SessionEvent<D>> {
        if self.is_destroyed() {
            return None;
        }
        self.events.recv().await
    }

    /// Take an already queued event without waiting.
    pub fn try_next_event(&mut self) -> Option<SessionEvent<D>> {
        if self.is_destroyed() {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_destroyed(&self) -> bool {
        *self.destroyed.borrow()
    }

    /// Release the engine-side resources. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed.send_replace(true) {
            return;
        }

        tracing::debug!(session = %self.name, "Destroying engine session");
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.events.close();
    }
}

impl<D> Drop for EngineSession<D> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<D> fmt::Debug for EngineSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("name", &self.name)
            .field("destroyed", &self.is_destroyed())
            .field("has_worker", &self.worker.is_some())
            .finish()
    }
}

/// Engine half of a session. Cheap to clone.
pub struct SessionHandle<D> {
    name: Arc<str>,
    events: mpsc::UnboundedSender<SessionEvent<D>>,
    destroyed: watch::Receiver<bool>,
    challenges: Arc<PasswordChallenges>,
}

impl<D> Clone for SessionHandle<D> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            events: self.events.clone(),
            destroyed: self.destroyed.clone(),
            challenges: Arc::clone(&self.challenges),
        }
    }
}

impl<D> SessionHandle<D> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn report_progress(&self, loaded: u64, total: u64) {
        self.send(SessionEvent::Progress(ProgressData::new(loaded, total)));
    }

    /// Open a password challenge round and return the receiver for the answer.
    pub fn challenge(&self, reason: u8) -> PendingPassword {
        let (verify, pending) = self.challenges.issue();
        tracing::debug!(session = %self.name, round = pending.round(), reason, "Password required");
        self.send(SessionEvent::PasswordRequired { verify, reason });
        pending
    }

    /// Ask for a password and wait for it.
    ///
    /// Returns `None` when the session is destroyed first, or when the loader
    /// dropped the verifier without answering.
    pub async fn request_password(&self, reason: u8) -> Option<String> {
        let pending = self.challenge(reason);
        tokio::select! {
            password = pending.recv() => password,
            _ = self.destroyed() => None,
        }
    }

    /// Deliver the loaded document.
    pub fn resolve(&self, document: D) {
        self.send(SessionEvent::Resolved(document));
    }

    /// Report that the document cannot be loaded.
    pub fn reject(&self, error: LoadError) {
        self.send(SessionEvent::Rejected(error));
    }

    pub fn is_destroyed(&self) -> bool {
        *self.destroyed.borrow() || self.events.is_closed()
    }

    /// Completes once the loader destroyed (or dropped) the session.
    pub async fn destroyed(&self) {
        let mut destroyed = self.destroyed.clone();
        // An error means the sender is gone, which is also a teardown.
        let _ = destroyed.wait_for(|destroyed| *destroyed).await;
    }

    fn send(&self, event: SessionEvent<D>) {
        if self.events.send(event).is_err() {
            tracing::trace!(session = %self.name, "Dropping event for a closed session");
        }
    }
}

impl<D> fmt::Debug for SessionHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("name", &self.name)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
