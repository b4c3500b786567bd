//! Loading status values.

use crate::error::LoadError;
use crate::loader::password::PasswordVerifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the current load attempt stands. Exactly one value is current.
///
/// Values are replaced on every transition, never mutated.
#[derive(Clone)]
pub enum LoadingStatus<D> {
    /// Bytes are arriving or the document is being parsed.
    Loading { percentages: f64 },
    /// The engine needs a password for the first time.
    AskingForPassword { verify: PasswordVerifier },
    /// The last password was rejected; `verify` belongs to the new round.
    WrongPassword { verify: PasswordVerifier },
    /// Terminal success.
    Completed { document: D },
    /// Terminal failure.
    Failed { error: LoadError },
}

/// Tag of a [`LoadingStatus`], convenient for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Loading,
    AskingForPassword,
    WrongPassword,
    Completed,
    Failed,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusKind::Loading => "loading",
            StatusKind::AskingForPassword => "asking_for_password",
            StatusKind::WrongPassword => "wrong_password",
            StatusKind::Completed => "completed",
            StatusKind::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl<D> Default for LoadingStatus<D> {
    fn default() -> Self {
        LoadingStatus::Loading { percentages: 0.0 }
    }
}

impl<D> LoadingStatus<D> {
    pub fn loading(percentages: f64) -> Self {
        LoadingStatus::Loading { percentages }
    }

    pub fn kind(&self) -> StatusKind {
        match self {
            LoadingStatus::Loading { .. } => StatusKind::Loading,
            LoadingStatus::AskingForPassword { .. } => StatusKind::AskingForPassword,
            LoadingStatus::WrongPassword { .. } => StatusKind::WrongPassword,
            LoadingStatus::Completed { .. } => StatusKind::Completed,
            LoadingStatus::Failed { .. } => StatusKind::Failed,
        }
    }

    /// `Completed` and `Failed` end the attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadingStatus::Completed { .. } | LoadingStatus::Failed { .. })
    }

    pub fn is_password_prompt(&self) -> bool {
        matches!(
            self,
            LoadingStatus::AskingForPassword { .. } | LoadingStatus::WrongPassword { .. }
        )
    }

    pub fn percentages(&self) -> Option<f64> {
        match self {
            LoadingStatus::Loading { percentages } => Some(*percentages),
            _ => None,
        }
    }

    pub fn verifier(&self) -> Option<&PasswordVerifier> {
        match self {
            LoadingStatus::AskingForPassword { verify } | LoadingStatus::WrongPassword { verify } => Some(verify),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&D> {
        match self {
            LoadingStatus::Completed { document } => Some(document),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadingStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for LoadingStatus<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadingStatus::Loading { percentages } => f.debug_struct("Loading").field("percentages", percentages).finish(),
            LoadingStatus::AskingForPassword { verify } => {
                f.debug_struct("AskingForPassword").field("verify", verify).finish()
            }
            LoadingStatus::WrongPassword { verify } => f.debug_struct("WrongPassword").field("verify", verify).finish(),
            LoadingStatus::Completed { document } => f.debug_struct("Completed").field("document", document).finish(),
            LoadingStatus::Failed { error } => f.debug_struct("Failed").field("error", error).finish(),
        }
    }
}
