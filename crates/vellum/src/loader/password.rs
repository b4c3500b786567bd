//! Password challenge coordination.
//!
//! Engines ask for a password by handing out a resume callback. Here every
//! challenge round produces a fresh single-use [`PasswordVerifier`] for the UI
//! and a [`PendingPassword`] the engine awaits.

use crate::{Result, VellumError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;

/// The document is encrypted and no password has been tried yet.
pub const NEED_PASSWORD: u8 = 1;
/// The previously submitted password was rejected.
pub const INCORRECT_PASSWORD: u8 = 2;

/// Reason codes the loader reacts to. Other codes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordReason {
    NeedPassword,
    IncorrectPassword,
}

impl PasswordReason {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            NEED_PASSWORD => Some(PasswordReason::NeedPassword),
            INCORRECT_PASSWORD => Some(PasswordReason::IncorrectPassword),
            _ => None,
        }
    }
}

/// Single-use handle that forwards a password to the engine.
///
/// Clones share the same slot, so the password can be submitted once per
/// round no matter which clone is used.
#[derive(Clone)]
pub struct PasswordVerifier {
    round: u32,
    slot: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl PasswordVerifier {
    /// Submit `password` exactly as typed. Empty strings are forwarded too.
    ///
    /// # Errors
    ///
    /// - `VellumError::PasswordAlreadySubmitted` if this round was answered
    /// - `VellumError::SessionClosed` if the engine stopped waiting
    pub fn verify(&self, password: impl Into<String>) -> Result<()> {
        let sender = self
            .slot
            .lock()
            .take()
            .ok_or(VellumError::PasswordAlreadySubmitted { round: self.round })?;

        tracing::debug!(round = self.round, "Forwarding password to engine");
        sender.send(password.into()).map_err(|_| VellumError::SessionClosed)
    }

    /// 1-based challenge round within the session.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_spent(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Whether two verifiers belong to the same challenge round.
    pub fn same_round(&self, other: &PasswordVerifier) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordVerifier")
            .field("round", &self.round)
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Engine side of a challenge round.
#[derive(Debug)]
pub struct PendingPassword {
    round: u32,
    rx: oneshot::Receiver<String>,
}

impl PendingPassword {
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Wait for the UI's answer. `None` if every verifier clone was dropped unanswered.
    pub async fn recv(self) -> Option<String> {
        self.rx.await.ok()
    }

    /// Non-blocking check used by engines polling between work units.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Issues numbered challenge rounds for one session.
#[derive(Debug, Default)]
pub struct PasswordChallenges {
    rounds: AtomicU32,
}

impl PasswordChallenges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new round: a verifier for the UI and the matching receiver for the engine.
    pub fn issue(&self) -> (PasswordVerifier, PendingPassword) {
        let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        let verifier = PasswordVerifier {
            round,
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (verifier, PendingPassword { round, rx })
    }

    pub fn rounds_issued(&self) -> u32 {
        self.rounds.load(Ordering::Relaxed)
    }
}
