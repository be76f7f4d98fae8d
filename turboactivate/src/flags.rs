//! Flag sets passed to the native engine.
//!
//! The engine reuses bit positions across functions (`TA_SYSTEM` and
//! `TA_SKIP_OFFLINE` are both 0x1), so each function family gets its own
//! type instead of one shared bitset.

use crate::error::{LicenseResult, TurboActivateError};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where activation and trial data is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Per-user install (`TA_USER`).
    #[default]
    User,
    /// Machine-wide install (`TA_SYSTEM`). Needs elevated permissions.
    System,
}

impl ActivationMode {
    /// Returns the raw flag value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::User => 0x0000_0002,
            Self::System => 0x0000_0001,
        }
    }
}

impl fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::System => f.write_str("system"),
        }
    }
}

impl FromStr for ActivationMode {
    type Err = TurboActivateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            other => Err(TurboActivateError::Configuration(format!(
                "unknown activation mode '{other}'"
            ))),
        }
    }
}

/// Trial flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialKind {
    /// Server-issued trial, resistant to local clock tampering.
    #[default]
    Verified,
    /// Trial tracked with local timestamps only.
    Unverified,
}

impl fmt::Display for TrialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => f.write_str("verified"),
            Self::Unverified => f.write_str("unverified"),
        }
    }
}

bitflags! {
    /// Flags for the extended genuine check.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct GenuineFlags: u32 {
        /// Treat offline activations as genuine without contacting the server.
        const SKIP_OFFLINE = 0x0000_0001;
        /// Report network errors for offline activations instead of skipping.
        const OFFLINE_SHOW_INET_ERR = 0x0000_0002;
        /// Fail when running inside a virtual machine.
        const DISALLOW_VM = 0x0000_0004;
        /// Fail when running inside a sandbox.
        const DISALLOW_SANDBOX = 0x0000_0008;
    }
}

bitflags! {
    /// Flags for starting, querying and extending trials.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct TrialFlags: u32 {
        const SYSTEM = 0x0000_0001;
        const USER = 0x0000_0002;
        const DISALLOW_VM = 0x0000_0004;
        const UNVERIFIED_TRIAL = 0x0000_0010;
        const VERIFIED_TRIAL = 0x0000_0020;
    }
}

impl TrialFlags {
    /// Builds the flags for a trial kind in a given mode.
    #[must_use]
    pub fn new(kind: TrialKind, mode: ActivationMode) -> Self {
        let kind = match kind {
            TrialKind::Verified => Self::VERIFIED_TRIAL,
            TrialKind::Unverified => Self::UNVERIFIED_TRIAL,
        };
        kind | Self::from_bits_retain(mode.bits())
    }

    /// Returns the trial kind these flags select.
    ///
    /// # Errors
    ///
    /// Returns [`TurboActivateError::MustSpecifyTrialType`] when both or
    /// neither kind is set.
    pub fn kind(self) -> LicenseResult<TrialKind> {
        let verified = self.contains(Self::VERIFIED_TRIAL);
        let unverified = self.contains(Self::UNVERIFIED_TRIAL);
        match (verified, unverified) {
            (true, false) => Ok(TrialKind::Verified),
            (false, true) => Ok(TrialKind::Unverified),
            _ => Err(TurboActivateError::MustSpecifyTrialType),
        }
    }

    /// Returns the storage mode these flags select, if exactly one is set.
    #[must_use]
    pub fn mode(self) -> Option<ActivationMode> {
        match (self.contains(Self::USER), self.contains(Self::SYSTEM)) {
            (true, false) => Some(ActivationMode::User),
            (false, true) => Some(ActivationMode::System),
            _ => None,
        }
    }
}

bitflags! {
    /// Flags for the date validity check.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct DateCheckFlags: u32 {
        /// The date must not have passed.
        const HAS_NOT_EXPIRED = 0x0000_0001;
    }
}
