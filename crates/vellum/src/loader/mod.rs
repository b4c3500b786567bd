//! The document loading state machine.
//!
//! [`DocumentLoader`] owns at most one engine session at a time and folds the
//! session's events into a single [`LoadingStatus`]:
//!
//! - password challenges become `AskingForPassword` / `WrongPassword`;
//! - progress ticks and the resolved document are kept separately and
//!   reconciled, so `Completed` needs both a document and more than 1% progress;
//! - a rejection becomes `Failed`, unless the session was already torn down.
//!
//! Every event is checked against the session's [`SessionToken`] and the
//! mounted flag first. Events from a superseded or released session never
//! change the status.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum::engine::LopdfEngine;
//! use vellum::loader::{DocumentLoader, LoaderView, LoadingStatus, Renderers};
//! use vellum::LoadRequest;
//!
//! # async fn example() {
//! let mut loader = DocumentLoader::new(Arc::new(LopdfEngine::new()));
//! loader.load(LoadRequest::new("report.pdf"));
//!
//! while let LoadingStatus::AskingForPassword { verify } | LoadingStatus::WrongPassword { verify } =
//!     loader.settle().await.clone()
//! {
//!     verify.verify("secret").ok();
//! }
//!
//! let renderers = Renderers::new(|doc: &vellum::engine::PdfDocument| format!("{} pages", doc.page_count()));
//! if let LoaderView::Document(text) = loader.render(&renderers) {
//!     println!("{}", text);
//! }
//! # }
//! ```

pub mod password;
pub mod progress;
pub mod status;
pub mod view;

use crate::core::config::LoaderConfig;
use crate::engine::{DocumentEngine, EngineSession, SessionEvent};
use crate::error::LoadError;
use crate::types::LoadRequest;
use password::PasswordReason;
use progress::ProgressTracker;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

pub use password::{INCORRECT_PASSWORD, NEED_PASSWORD, PasswordVerifier, PendingPassword};
pub use progress::{ProgressData, percentage};
pub use status::{LoadingStatus, StatusKind};
pub use view::{LoaderView, Renderers};

/// Liveness token of one load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Drives one document at a time through an engine.
pub struct DocumentLoader<E: DocumentEngine> {
    engine: Arc<E>,
    config: LoaderConfig,
    request: Option<LoadRequest>,
    session: Option<EngineSession<E::Document>>,
    token: Option<SessionToken>,
    generation: u64,
    mounted: bool,
    progress: ProgressTracker,
    document: Option<E::Document>,
    status: LoadingStatus<E::Document>,
    status_tx: watch::Sender<LoadingStatus<E::Document>>,
}

impl<E: DocumentEngine> DocumentLoader<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_config(engine, LoaderConfig::default())
    }

    pub fn with_config(engine: Arc<E>, config: LoaderConfig) -> Self {
        let (status_tx, _) = watch::channel(LoadingStatus::default());
        Self {
            engine,
            config,
            request: None,
            session: None,
            token: None,
            generation: 0,
            mounted: true,
            progress: ProgressTracker::new(),
            document: None,
            status: LoadingStatus::default(),
            status_tx,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn request(&self) -> Option<&LoadRequest> {
        self.request.as_ref()
    }

    /// Token of the current attempt, `None` before the first load or after unmount.
    pub fn token(&self) -> Option<SessionToken> {
        self.token
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn session_name(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.name())
    }

    pub fn status(&self) -> &LoadingStatus<E::Document> {
        &self.status
    }

    /// Last reported progress, independent of the current status.
    pub fn percentages(&self) -> f64 {
        self.progress.percentages()
    }

    pub fn document(&self) -> Option<&E::Document> {
        self.status.document()
    }

    /// Watch status changes from elsewhere (e.g. a UI task).
    pub fn subscribe(&self) -> watch::Receiver<LoadingStatus<E::Document>> {
        self.status_tx.subscribe()
    }

    /// Start a new attempt, discarding the current one whatever its state.
    ///
    /// The status is `Loading(0)` when this returns. If the engine cannot even
    /// start a session the attempt fails immediately.
    pub fn load(&mut self, request: LoadRequest) -> SessionToken {
        self.release_session();
        self.mounted = true;

        self.generation += 1;
        let token = SessionToken(self.generation);
        self.token = Some(token);
        self.progress.reset();
        self.document = None;
        self.set_status(LoadingStatus::default());

        tracing::debug!(
            token = %token,
            engine = self.engine.name(),
            source = %request.source.describe(),
            "Loading document"
        );

        match self.engine.create_session(&request) {
            Ok(session) => self.session = Some(session),
            Err(err) => {
                tracing::warn!(token = %token, error = %err, "Engine could not start a session");
                let error = LoadError::from(&err).or_default_message(&self.config.default_error_message);
                self.set_status(LoadingStatus::Failed { error });
            }
        }

        self.request = Some(request);
        token
    }

    /// Reload only when the source changed; header or credential changes alone
    /// keep the current attempt. Returns the new token when a load started.
    pub fn update_request(&mut self, request: LoadRequest) -> Option<SessionToken> {
        let unchanged = self.mounted
            && self.token.is_some()
            && self.request.as_ref().is_some_and(|current| current.source == request.source);
        if unchanged {
            return None;
        }
        Some(self.load(request))
    }

    /// Wait for the current session's next event and apply it.
    ///
    /// Returns `false` when there is nothing left to wait for: no session, or
    /// the engine finished and dropped its handles.
    pub async fn step(&mut self) -> bool {
        let Some(token) = self.token else {
            return false;
        };
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        match session.next_event().await {
            Some(event) => {
                self.apply(token, event);
                true
            }
            None => false,
        }
    }

    /// Apply already queued events without waiting. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let Some(token) = self.token else {
            return 0;
        };

        let mut applied = 0;
        while let Some(event) = self.session.as_mut().and_then(|session| session.try_next_event()) {
            self.apply(token, event);
            applied += 1;
        }
        applied
    }

    /// Process events until the status needs the user (password prompt), is
    /// terminal, or the session has nothing more to say.
    ///
    /// At least one event is processed unless the status is already terminal,
    /// so calling this right after answering a prompt waits for the engine's verdict.
    pub async fn settle(&mut self) -> &LoadingStatus<E::Document> {
        if !self.status.is_terminal() {
            while self.step().await {
                if self.status.is_terminal() || self.status.is_password_prompt() {
                    break;
                }
            }
        }
        &self.status
    }

    /// Fold one event into the status. Returns whether the status changed.
    ///
    /// Events for a token other than the current one, events after unmount and
    /// events after the attempt reached `Completed`/`Failed` are ignored.
    pub fn apply(&mut self, token: SessionToken, event: SessionEvent<E::Document>) -> bool {
        if !self.is_live(token) {
            tracing::debug!(token = %token, ?event, "Ignoring event from inactive session");
            return false;
        }
        if self.status.is_terminal() {
            tracing::debug!(token = %token, ?event, status = %self.status.kind(), "Ignoring event after terminal status");
            return false;
        }

        match event {
            SessionEvent::PasswordRequired { verify, reason } => match PasswordReason::from_code(reason) {
                Some(PasswordReason::NeedPassword) => self.set_status(LoadingStatus::AskingForPassword { verify }),
                Some(PasswordReason::IncorrectPassword) => self.set_status(LoadingStatus::WrongPassword { verify }),
                None => {
                    tracing::debug!(token = %token, reason, "Ignoring unknown password reason");
                    false
                }
            },
            SessionEvent::Progress(progress) => {
                self.progress.update(progress);
                if self.status.is_password_prompt() {
                    false
                } else {
                    self.reconcile()
                }
            }
            SessionEvent::Resolved(document) => {
                self.document = Some(document);
                self.reconcile()
            }
            SessionEvent::Rejected(error) => {
                let error = error.or_default_message(&self.config.default_error_message);
                tracing::warn!(token = %token, name = %error.name, message = %error.message, "Document failed to load");
                self.set_status(LoadingStatus::Failed { error })
            }
        }
    }

    /// Current view for `renderers`.
    pub fn render<T>(&self, renderers: &Renderers<'_, E::Document, T>) -> LoaderView<T> {
        renderers.view(&self.status)
    }

    /// The loader left the UI: release the session and ignore anything that
    /// still arrives. A later [`load`](Self::load) mounts it again.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.release_session();
        self.token = None;
    }

    fn is_live(&self, token: SessionToken) -> bool {
        self.mounted
            && self.token == Some(token)
            && self.session.as_ref().is_some_and(|session| !session.is_destroyed())
    }

    /// `Completed` needs both the document and more than 1% progress.
    fn reconcile(&mut self) -> bool {
        let percentages = self.progress.percentages();
        let next = match &self.document {
            Some(document) if percentages > 1.0 => LoadingStatus::Completed {
                document: document.clone(),
            },
            _ => LoadingStatus::loading(percentages),
        };

        if let (LoadingStatus::Loading { percentages: current }, LoadingStatus::Loading { percentages: next }) =
            (&self.status, &next)
            && current == next
        {
            return false;
        }
        self.set_status(next)
    }

    fn set_status(&mut self, next: LoadingStatus<E::Document>) -> bool {
        tracing::debug!(
            token = ?self.token,
            from = %self.status.kind(),
            to = %next.kind(),
            percentages = next.percentages(),
            "Status transition"
        );
        self.status_tx.send_replace(next.clone());
        self.status = next;
        true
    }

    fn release_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy();
            tracing::info!(session = %session.name(), "Released engine session");
        }
    }
}

impl<E: DocumentEngine> Drop for DocumentLoader<E> {
    fn drop(&mut self) {
        self.release_session();
    }
}

impl<E: DocumentEngine> fmt::Debug for DocumentLoader<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("engine", &self.engine.name())
            .field("token", &self.token)
            .field("mounted", &self.mounted)
            .field("status", &self.status.kind())
            .field("percentages", &self.progress.percentages())
            .finish()
    }
}
