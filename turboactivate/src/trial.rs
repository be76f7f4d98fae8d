//! Trial policy.
//!
//! A trial is either verified or unverified, never both, and is always
//! scoped to the session's activation mode. A day count of zero means the
//! trial is exhausted or its data was tampered with; it is never treated as
//! "not started". That case comes back from the engine as
//! [`TurboActivateError::MustUseTrial`].

use crate::error::{LicenseResult, TurboActivateError};
use crate::flags::{ActivationMode, TrialFlags, TrialKind};
use serde::{Deserialize, Serialize};

/// Interpretation of a trial day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "days")]
pub enum TrialStatus {
    /// At most this many days remain. One day may mean seconds.
    Remaining(u32),
    /// No days remain, or the trial data is invalid.
    Exhausted,
}

impl TrialStatus {
    #[must_use]
    pub fn from_days(days: u32) -> Self {
        if days == 0 {
            Self::Exhausted
        } else {
            Self::Remaining(days)
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Remaining(_))
    }

    #[must_use]
    pub fn days(&self) -> u32 {
        match self {
            Self::Remaining(days) => *days,
            Self::Exhausted => 0,
        }
    }
}

/// Trial selection for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialPolicy {
    kind: TrialKind,
    mode: ActivationMode,
}

impl TrialPolicy {
    #[must_use]
    pub const fn new(kind: TrialKind, mode: ActivationMode) -> Self {
        Self { kind, mode }
    }

    #[must_use]
    pub const fn kind(&self) -> TrialKind {
        self.kind
    }

    #[must_use]
    pub const fn mode(&self) -> ActivationMode {
        self.mode
    }

    /// Flags selecting this policy's trial.
    #[must_use]
    pub fn flags(&self) -> TrialFlags {
        TrialFlags::new(self.kind, self.mode)
    }
}

/// Checks caller-supplied trial flags before they reach the engine.
///
/// # Errors
///
/// [`TurboActivateError::MustSpecifyTrialType`] when both or neither trial
/// kind is selected, [`TurboActivateError::InvalidFlags`] when both or
/// neither storage mode is selected.
pub fn validate_flags(flags: TrialFlags) -> LicenseResult<TrialKind> {
    let kind = flags.kind()?;
    if flags.mode().is_none() {
        return Err(TurboActivateError::InvalidFlags);
    }
    Ok(kind)
}
