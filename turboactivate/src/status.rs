//! Status codes returned by the native engine and their classification.
//!
//! Every native call returns a small non-negative integer. Zero is success;
//! every other known value maps to exactly one [`TurboActivateError`]
//! variant. Values outside the known set are kept as
//! [`TurboActivateError::Generic`] with the raw code attached.
//!
//! `TA_E_EXPIRED` (0x0D) and `TA_E_TRIAL_EXPIRED` (0x1E) are separate codes
//! with separate variants. Older headers aliased the expired-trial name onto
//! 0x0D; that alias is not honoured here.

use crate::error::{LicenseResult, TurboActivateError};
use std::fmt;

/// Raw status value as returned across the C ABI.
pub type RawStatus = i32;

macro_rules! status_codes {
    ($($variant:ident = $value:literal => $symbol:literal),+ $(,)?) => {
        /// A status code reported by the native engine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $($variant,)+
            /// A code this crate does not know about.
            Unknown(RawStatus),
        }

        impl StatusCode {
            /// Every code with a documented meaning, in numeric order.
            pub const KNOWN: &'static [StatusCode] = &[$(StatusCode::$variant,)+];

            /// Maps a raw value to its code.
            #[must_use]
            pub const fn from_raw(raw: RawStatus) -> Self {
                match raw {
                    $($value => StatusCode::$variant,)+
                    other => StatusCode::Unknown(other),
                }
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn raw(self) -> RawStatus {
                match self {
                    $(StatusCode::$variant => $value,)+
                    StatusCode::Unknown(raw) => raw,
                }
            }

            /// Returns the symbolic name from the vendor header, if known.
            #[must_use]
            pub const fn symbol(self) -> Option<&'static str> {
                match self {
                    $(StatusCode::$variant => Some($symbol),)+
                    StatusCode::Unknown(_) => None,
                }
            }
        }
    };
}

status_codes! {
    Ok = 0x00 => "TA_OK",
    Fail = 0x01 => "TA_FAIL",
    ProductKey = 0x02 => "TA_E_PKEY",
    NotActivated = 0x03 => "TA_E_ACTIVATE",
    Inet = 0x04 => "TA_E_INET",
    InUse = 0x05 => "TA_E_INUSE",
    Revoked = 0x06 => "TA_E_REVOKED",
    Guid = 0x07 => "TA_E_GUID",
    ProductDetails = 0x08 => "TA_E_PDETS",
    Trial = 0x09 => "TA_E_TRIAL",
    Reactivate = 0x0A => "TA_E_REACTIVATE",
    Com = 0x0B => "TA_E_COM",
    TrialExtensionUsed = 0x0C => "TA_E_TRIAL_EUSED",
    Expired = 0x0D => "TA_E_EXPIRED",
    InsufficientBuffer = 0x0E => "TA_E_INSUFFICIENT_BUFFER",
    Permission = 0x0F => "TA_E_PERMISSION",
    InvalidFlags = 0x10 => "TA_E_INVALID_FLAGS",
    InVm = 0x11 => "TA_E_IN_VM",
    ExtraDataLong = 0x12 => "TA_E_EDATA_LONG",
    InvalidArgs = 0x13 => "TA_E_INVALID_ARGS",
    KeyForTurboFloat = 0x14 => "TA_E_KEY_FOR_TURBOFLOAT",
    InetDelayed = 0x15 => "TA_E_INET_DELAYED",
    FeaturesChanged = 0x16 => "TA_E_FEATURES_CHANGED",
    AndroidNotInit = 0x17 => "TA_E_ANDROID_NOT_INIT",
    NoMoreDeactivations = 0x18 => "TA_E_NO_MORE_DEACTIVATIONS",
    AccountCanceled = 0x19 => "TA_E_ACCOUNT_CANCELED",
    AlreadyActivated = 0x1A => "TA_E_ALREADY_ACTIVATED",
    InvalidHandle = 0x1B => "TA_E_INVALID_HANDLE",
    EnableNetworkAdapters = 0x1C => "TA_E_ENABLE_NETWORK_ADAPTERS",
    AlreadyVerifiedTrial = 0x1D => "TA_E_ALREADY_VERIFIED_TRIAL",
    TrialExpired = 0x1E => "TA_E_TRIAL_EXPIRED",
    MustSpecifyTrialType = 0x1F => "TA_E_MUST_SPECIFY_TRIAL_TYPE",
    MustUseTrial = 0x20 => "TA_E_MUST_USE_TRIAL",
    NoMoreTrialsAllowed = 0x21 => "TA_E_NO_MORE_TRIALS_ALLOWED",
    InSandbox = 0x22 => "TA_E_IN_SANDBOX",
}

impl StatusCode {
    /// Returns true for `TA_OK`.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, StatusCode::Ok)
    }

    /// Converts the code into a result, classifying any failure.
    pub fn into_result(self) -> LicenseResult<()> {
        match classify(self.raw()) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl From<RawStatus> for StatusCode {
    fn from(raw: RawStatus) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(symbol) => write!(f, "{symbol} (0x{:02X})", self.raw()),
            None => write!(f, "unknown status (0x{:02X})", self.raw()),
        }
    }
}

/// Maps a raw status to its failure, or `None` for success.
///
/// This is the only place raw codes are compared. Unknown codes become
/// [`TurboActivateError::Generic`] and keep the raw value.
#[must_use]
pub fn classify(raw: RawStatus) -> Option<TurboActivateError> {
    use TurboActivateError as E;

    let err = match StatusCode::from_raw(raw) {
        StatusCode::Ok => return None,
        StatusCode::Fail => E::Fail,
        StatusCode::ProductKey => E::ProductKey,
        StatusCode::NotActivated => E::NotActivated,
        StatusCode::Inet => E::Connection,
        StatusCode::InUse => E::InUse,
        StatusCode::Revoked => E::Revoked,
        StatusCode::Guid => E::GuidMismatch,
        StatusCode::ProductDetails => E::DatFile,
        StatusCode::Trial => E::TrialCorrupted,
        StatusCode::Reactivate => E::Reactivate,
        StatusCode::Com => E::Com,
        StatusCode::TrialExtensionUsed => E::TrialExtensionUsed,
        StatusCode::Expired => E::ActivationExpired,
        StatusCode::InsufficientBuffer => E::InsufficientBuffer,
        StatusCode::Permission => E::Permission,
        StatusCode::InvalidFlags => E::InvalidFlags,
        StatusCode::InVm => E::InVm,
        StatusCode::ExtraDataLong => E::ExtraDataTooLong,
        StatusCode::InvalidArgs => E::InvalidArgs,
        StatusCode::KeyForTurboFloat => E::KeyForTurboFloat,
        StatusCode::InetDelayed => E::ConnectionDelayed,
        StatusCode::FeaturesChanged => E::FeaturesChanged,
        StatusCode::AndroidNotInit => E::AndroidNotInitialized,
        StatusCode::NoMoreDeactivations => E::NoMoreDeactivations,
        StatusCode::AccountCanceled => E::AccountCanceled,
        StatusCode::AlreadyActivated => E::AlreadyActivated,
        StatusCode::InvalidHandle => E::InvalidHandle,
        StatusCode::EnableNetworkAdapters => E::EnableNetworkAdapters,
        StatusCode::AlreadyVerifiedTrial => E::AlreadyVerifiedTrial,
        StatusCode::TrialExpired => E::TrialExpired,
        StatusCode::MustSpecifyTrialType => E::MustSpecifyTrialType,
        StatusCode::MustUseTrial => E::MustUseTrial,
        StatusCode::NoMoreTrialsAllowed => E::NoMoreTrialsAllowed,
        StatusCode::InSandbox => E::InSandbox,
        StatusCode::Unknown(code) => E::Generic { code },
    };
    Some(err)
}

/// Converts a raw status into a result.
pub fn check(raw: RawStatus) -> LicenseResult<()> {
    StatusCode::from_raw(raw).into_result()
}
