//! Error types for the licensing layer.

use crate::status::{RawStatus, StatusCode};
use thiserror::Error;

/// Broad grouping of failures, for callers that only care about the concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Product key validity.
    Key,
    /// Activation state.
    Activation,
    /// Network and connectivity.
    Network,
    /// Trial state.
    Trial,
    /// Permissions and host environment.
    Environment,
    /// Invalid flags, arguments, handles or buffers.
    Arguments,
    /// Product identity, product details and the native library itself.
    Product,
    /// Anything else, including unrecognised codes.
    General,
}

/// Licensing errors.
///
/// Variants that mirror a native status code carry the vendor's meaning.
/// The remaining variants are raised locally before the engine is reached.
#[derive(Debug, Error)]
pub enum TurboActivateError {
    /// Generic failure reported by the engine.
    #[error("operation failed")]
    Fail,

    /// Invalid product key.
    #[error("invalid product key")]
    ProductKey,

    /// The product needs to be activated.
    #[error("product not activated")]
    NotActivated,

    /// Connection to the activation server failed.
    #[error("connection to the activation server failed")]
    Connection,

    /// The key is already activated on the maximum number of computers.
    #[error("product key is in use on the maximum number of computers")]
    InUse,

    /// The product key has been revoked.
    #[error("product key has been revoked")]
    Revoked,

    /// The version GUID doesn't match the product details file.
    #[error("version GUID does not match the product details")]
    GuidMismatch,

    /// The product details file failed to load.
    #[error("product details failed to load")]
    DatFile,

    /// Trial data is corrupted; the oldest possible date is in use.
    #[error("trial data has been corrupted")]
    TrialCorrupted,

    /// The hardware changed and the product must be reactivated.
    #[error("product must be reactivated")]
    Reactivate,

    /// The hardware id could not be generated because of the COM setup (Windows only).
    #[error("hardware id unavailable: COM/WMI failure")]
    Com,

    /// The trial extension has already been used.
    #[error("trial extension has already been used")]
    TrialExtensionUsed,

    /// The activation expired or the system clock was tampered with.
    #[error("activation expired or system time tampered with")]
    ActivationExpired,

    /// A caller buffer was too small.
    #[error("insufficient buffer")]
    InsufficientBuffer,

    /// Insufficient system permission; run elevated or use user mode.
    #[error("insufficient system permission")]
    Permission,

    /// Flags were invalid or missing.
    #[error("invalid flags")]
    InvalidFlags,

    /// Running inside a virtual machine is not allowed.
    #[error("running inside a virtual machine is not allowed")]
    InVm,

    /// Extra data exceeded 255 UTF-8 characters.
    #[error("extra data too long (limit is 255 UTF-8 characters)")]
    ExtraDataTooLong,

    /// Arguments were invalid.
    #[error("invalid arguments")]
    InvalidArgs,

    /// The key belongs to a floating license product.
    #[error("product key is for a floating license")]
    KeyForTurboFloat,

    /// A previous genuine check hit a network error; the engine waits before rechecking.
    #[error("connection to the activation server delayed")]
    ConnectionDelayed,

    /// The genuine check reactivated and the license features changed.
    #[error("license features changed")]
    FeaturesChanged,

    /// The Android runtime was not initialized.
    #[error("android runtime not initialized")]
    AndroidNotInitialized,

    /// No more deactivations are allowed for this key; still activated here.
    #[error("no more deactivations allowed for this product key")]
    NoMoreDeactivations,

    /// The vendor account was cancelled.
    #[error("licensing account has been cancelled")]
    AccountCanceled,

    /// Already activated with a product key; deactivate first.
    #[error("product already activated")]
    AlreadyActivated,

    /// The handle is not valid.
    #[error("invalid product handle")]
    InvalidHandle,

    /// Disabled network adapters prevented hardware identification.
    #[error("network adapters must be enabled")]
    EnableNetworkAdapters,

    /// The trial is already verified and cannot be downgraded.
    #[error("trial is already a verified trial")]
    AlreadyVerifiedTrial,

    /// The trial has expired.
    #[error("trial has expired")]
    TrialExpired,

    /// Exactly one trial kind must be specified.
    #[error("exactly one trial type (verified or unverified) must be specified")]
    MustSpecifyTrialType,

    /// A trial must be started before its days can be queried.
    #[error("trial has not been started")]
    MustUseTrial,

    /// No more trials are allowed for this product.
    #[error("no more trials allowed")]
    NoMoreTrialsAllowed,

    /// Running inside a sandbox is not allowed.
    #[error("running inside a sandbox is not allowed")]
    InSandbox,

    /// Any status not in the known set.
    #[error("unrecognised status code {code}")]
    Generic {
        /// The raw code, kept for diagnostics.
        code: RawStatus,
    },

    /// Missing or invalid product identity or settings.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The operation is not available on this platform.
    #[error("{0} is not supported on this platform")]
    PlatformUnsupported(&'static str),

    /// The native library could not be loaded or is missing a symbol.
    #[error("native library error: {0}")]
    Library(String),

    /// Malformed proxy address.
    #[error("invalid proxy address: {0}")]
    InvalidProxy(String),

    /// Malformed date string.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// A string could not be passed across the C ABI.
    #[error("invalid string argument: {0}")]
    InvalidString(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TurboActivateError {
    /// Returns the engine status this error was classified from, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        use TurboActivateError as E;

        let code = match self {
            E::Fail => StatusCode::Fail,
            E::ProductKey => StatusCode::ProductKey,
            E::NotActivated => StatusCode::NotActivated,
            E::Connection => StatusCode::Inet,
            E::InUse => StatusCode::InUse,
            E::Revoked => StatusCode::Revoked,
            E::GuidMismatch => StatusCode::Guid,
            E::DatFile => StatusCode::ProductDetails,
            E::TrialCorrupted => StatusCode::Trial,
            E::Reactivate => StatusCode::Reactivate,
            E::Com => StatusCode::Com,
            E::TrialExtensionUsed => StatusCode::TrialExtensionUsed,
            E::ActivationExpired => StatusCode::Expired,
            E::InsufficientBuffer => StatusCode::InsufficientBuffer,
            E::Permission => StatusCode::Permission,
            E::InvalidFlags => StatusCode::InvalidFlags,
            E::InVm => StatusCode::InVm,
            E::ExtraDataTooLong => StatusCode::ExtraDataLong,
            E::InvalidArgs => StatusCode::InvalidArgs,
            E::KeyForTurboFloat => StatusCode::KeyForTurboFloat,
            E::ConnectionDelayed => StatusCode::InetDelayed,
            E::FeaturesChanged => StatusCode::FeaturesChanged,
            E::AndroidNotInitialized => StatusCode::AndroidNotInit,
            E::NoMoreDeactivations => StatusCode::NoMoreDeactivations,
            E::AccountCanceled => StatusCode::AccountCanceled,
            E::AlreadyActivated => StatusCode::AlreadyActivated,
            E::InvalidHandle => StatusCode::InvalidHandle,
            E::EnableNetworkAdapters => StatusCode::EnableNetworkAdapters,
            E::AlreadyVerifiedTrial => StatusCode::AlreadyVerifiedTrial,
            E::TrialExpired => StatusCode::TrialExpired,
            E::MustSpecifyTrialType => StatusCode::MustSpecifyTrialType,
            E::MustUseTrial => StatusCode::MustUseTrial,
            E::NoMoreTrialsAllowed => StatusCode::NoMoreTrialsAllowed,
            E::InSandbox => StatusCode::InSandbox,
            E::Generic { code } => StatusCode::Unknown(*code),
            E::Configuration(_)
            | E::PlatformUnsupported(_)
            | E::Library(_)
            | E::InvalidProxy(_)
            | E::InvalidDate(_)
            | E::InvalidString(_)
            | E::Io(_) => return None,
        };
        Some(code)
    }

    /// Returns the concern this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        use TurboActivateError as E;

        match self {
            E::ProductKey | E::InUse | E::Revoked | E::KeyForTurboFloat => ErrorCategory::Key,
            E::NotActivated
            | E::AlreadyActivated
            | E::Reactivate
            | E::ActivationExpired
            | E::NoMoreDeactivations
            | E::AccountCanceled
            | E::FeaturesChanged => ErrorCategory::Activation,
            E::Connection | E::ConnectionDelayed | E::InvalidProxy(_) => ErrorCategory::Network,
            E::TrialCorrupted
            | E::TrialExtensionUsed
            | E::TrialExpired
            | E::AlreadyVerifiedTrial
            | E::MustSpecifyTrialType
            | E::MustUseTrial
            | E::NoMoreTrialsAllowed => ErrorCategory::Trial,
            E::Permission
            | E::InVm
            | E::InSandbox
            | E::Com
            | E::EnableNetworkAdapters
            | E::AndroidNotInitialized
            | E::PlatformUnsupported(_) => ErrorCategory::Environment,
            E::InvalidFlags
            | E::InvalidArgs
            | E::InvalidHandle
            | E::InsufficientBuffer
            | E::ExtraDataTooLong
            | E::InvalidDate(_)
            | E::InvalidString(_) => ErrorCategory::Arguments,
            E::GuidMismatch | E::DatFile | E::Configuration(_) | E::Library(_) => {
                ErrorCategory::Product
            }
            E::Fail | E::Generic { .. } | E::Io(_) => ErrorCategory::General,
        }
    }

    /// Returns true for the two network failures a genuine check may
    /// downgrade to a grace-period success.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection | Self::ConnectionDelayed)
    }
}

/// Result type for licensing operations.
pub type LicenseResult<T> = Result<T, TurboActivateError>;
