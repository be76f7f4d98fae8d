//! Genuine-check policy.
//!
//! Decides how a raw genuine-check result is reported to the caller. The
//! engine owns the recheck interval and the grace-period clock; this layer
//! only routes its answers:
//!
//! - success is [`GenuineStatus::Genuine`]
//! - features-changed is a success, [`GenuineStatus::FeaturesChanged`]
//! - connection failed or delayed is [`GenuineStatus::GraceDegraded`] while
//!   the product is still activated, unless the caller asked for network
//!   errors with [`GenuineFlags::OFFLINE_SHOW_INET_ERR`]
//! - everything else propagates unchanged

use crate::error::{LicenseResult, TurboActivateError};
use crate::flags::GenuineFlags;
use crate::options::GenuineOptions;
use serde::{Deserialize, Serialize};

/// Why a genuine check fell back to the grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// The server could not be reached.
    ConnectionFailed,
    /// A previous attempt failed and the engine is waiting before retrying.
    ConnectionDelayed,
}

/// Caller-visible outcome of a successful genuine check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum GenuineStatus {
    /// Verified with the server, or within the recheck interval.
    Genuine,
    /// Reactivated and the license features changed. Still genuine.
    FeaturesChanged,
    /// Not verified this cycle, but still within the engine's grace period.
    GraceDegraded {
        /// The network failure that was absorbed.
        reason: DegradedReason,
    },
}

impl GenuineStatus {
    /// Returns true when the check reached the server (or its cache) cleanly.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Genuine | Self::FeaturesChanged)
    }
}

/// Last observed genuine state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenuineState {
    /// No genuine check has run yet.
    #[default]
    Unverified,
    Genuine,
    FeaturesChanged,
    GraceDegraded,
    NotGenuine,
}

impl GenuineState {
    /// Returns the state following a genuine-check outcome.
    #[must_use]
    pub fn after(outcome: &LicenseResult<GenuineStatus>) -> Self {
        match outcome {
            Ok(GenuineStatus::Genuine) => Self::Genuine,
            Ok(GenuineStatus::FeaturesChanged) => Self::FeaturesChanged,
            Ok(GenuineStatus::GraceDegraded { .. }) => Self::GraceDegraded,
            Err(_) => Self::NotGenuine,
        }
    }

    /// Returns true when the product may be used in this state.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            Self::Genuine | Self::FeaturesChanged | Self::GraceDegraded
        )
    }
}

/// Interprets a raw genuine-check result.
///
/// `is_activated` is consulted only for the two network failures, and
/// re-queries the engine each time it is called.
pub fn evaluate<F>(
    result: LicenseResult<()>,
    options: Option<&GenuineOptions>,
    is_activated: F,
) -> LicenseResult<GenuineStatus>
where
    F: FnOnce() -> bool,
{
    let err = match result {
        Ok(()) => return Ok(GenuineStatus::Genuine),
        Err(TurboActivateError::FeaturesChanged) => return Ok(GenuineStatus::FeaturesChanged),
        Err(err) => err,
    };

    let reason = match &err {
        TurboActivateError::Connection => DegradedReason::ConnectionFailed,
        TurboActivateError::ConnectionDelayed => DegradedReason::ConnectionDelayed,
        _ => return Err(err),
    };

    let show_network_errors = options
        .is_some_and(|opts| opts.flags().contains(GenuineFlags::OFFLINE_SHOW_INET_ERR));
    if show_network_errors || !is_activated() {
        return Err(err);
    }

    Ok(GenuineStatus::GraceDegraded { reason })
}
