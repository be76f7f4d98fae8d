//! Licensing for applications built on the TurboActivate engine.
//!
//! The engine itself (key validation, hardware fingerprinting, trial
//! clocks, server communication) lives in the vendor's shared library. This
//! crate is the policy layer on top of it:
//!
//! - Typed errors for every engine status code
//! - A [`Verifier`] trait describing the engine, with a native
//!   implementation that loads the library at runtime
//! - A [`LicenseSession`] coordinating product identity, keys, activation,
//!   trials and genuine checks
//! - Genuine-check and trial policies that turn engine answers into
//!   caller-facing results
//!
//! # Design Principles
//!
//! - **Never cache activation**: every activation or genuine query goes to
//!   the engine
//! - **Fail closed on activation**: a failed online activation erases the key
//! - **Soft successes stay soft**: features-changed and in-grace network
//!   failures are successes at the genuine-check boundary, not earlier
//! - **Explicit handles**: sessions carry their engine handle, so several
//!   products can be licensed in one process

mod config;
mod date;
mod error;
mod flags;
mod genuine;
#[cfg(all(feature = "native", any(unix, windows)))]
mod native;
mod options;
mod proxy;
mod session;
mod status;
mod trial;
mod verifier;

pub use config::{GenuineConfig, LicenseConfig, LIBRARY_DIR_ENV};
pub use date::{format_date, parse_date, DATE_FORMAT};
pub use error::{ErrorCategory, LicenseResult, TurboActivateError};
pub use flags::{ActivationMode, DateCheckFlags, GenuineFlags, TrialFlags, TrialKind};
pub use genuine::{evaluate as evaluate_genuine, DegradedReason, GenuineState, GenuineStatus};
pub use options::{
    GenuineOptions, RawGenuineOptions, RECOMMENDED_DAYS_BETWEEN_CHECKS, RECOMMENDED_GRACE_DAYS,
};
pub use proxy::{ProxyAddress, DEFAULT_PROXY_PORT};
pub use session::{
    set_custom_data_path, set_custom_proxy, LicenseSession, ProductIdentity, SessionOptions,
};
pub use status::{check, classify, RawStatus, StatusCode};
pub use trial::{validate_flags as validate_trial_flags, TrialPolicy, TrialStatus};
pub use verifier::{DetailsLocator, StringQuery, Verifier, VerifierHandle};

#[cfg(all(feature = "native", any(unix, windows)))]
pub use native::{library_file_name, library_path, NativeVerifier};
