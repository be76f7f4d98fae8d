//! The contract the native licensing engine satisfies.
//!
//! Every method is a single blocking call into the engine. Failures are
//! already classified into [`TurboActivateError`](crate::TurboActivateError);
//! no method swallows or reinterprets a result. Soft successes such as
//! features-changed are returned as errors here and resolved by the
//! genuine-check policy.

use crate::error::{LicenseResult, TurboActivateError};
use crate::flags::{ActivationMode, DateCheckFlags, TrialFlags};
use crate::options::GenuineOptions;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque handle for one product inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerifierHandle(u32);

impl VerifierHandle {
    /// Wraps a raw handle. Zero is never a valid handle.
    pub fn new(raw: u32) -> LicenseResult<Self> {
        if raw == 0 {
            return Err(TurboActivateError::InvalidHandle);
        }
        Ok(Self(raw))
    }

    /// Returns the raw handle.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VerifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the product details blob comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DetailsLocator {
    /// A product details file on disk.
    Path(PathBuf),
    /// Product details already in memory.
    Bytes(Vec<u8>),
}

impl DetailsLocator {
    /// Returns true when the locator points at nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Path(path) => path.as_os_str().is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
        }
    }
}

impl From<PathBuf> for DetailsLocator {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for DetailsLocator {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for DetailsLocator {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Variable-length strings the engine can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringQuery<'a> {
    /// The stored product key.
    ProductKey,
    /// Extra data attached at activation.
    ExtraData,
    /// The value of a named license feature.
    FeatureValue(&'a str),
}

/// The native licensing engine.
///
/// Implementations are not expected to be safe for concurrent use; a
/// session owns its verifier and serialises calls.
pub trait Verifier {
    /// Loads product details. Loading the same details twice may report
    /// [`TurboActivateError::Fail`].
    fn load_details(&self, details: &DetailsLocator) -> LicenseResult<()>;

    /// Resolves the handle for a product version.
    fn get_handle(&self, version_guid: &str) -> LicenseResult<VerifierHandle>;

    /// Validates and stores a product key.
    fn check_and_save_key(
        &self,
        handle: VerifierHandle,
        key: &str,
        mode: ActivationMode,
    ) -> LicenseResult<()>;

    /// Checks that the stored key is well formed. Does not check activation.
    fn is_product_key_valid(&self, handle: VerifierHandle) -> LicenseResult<()>;

    /// Activates online.
    fn activate(&self, handle: VerifierHandle, extra_data: Option<&str>) -> LicenseResult<()>;

    /// Writes an offline activation request instead of contacting the server.
    fn activation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        extra_data: Option<&str>,
    ) -> LicenseResult<()>;

    /// Activates from an offline activation response file.
    fn activate_from_file(&self, handle: VerifierHandle, path: &Path) -> LicenseResult<()>;

    /// Deactivates online, optionally erasing the stored key.
    fn deactivate(&self, handle: VerifierHandle, erase_key: bool) -> LicenseResult<()>;

    /// Writes an offline deactivation request, optionally erasing the stored key.
    fn deactivation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        erase_key: bool,
    ) -> LicenseResult<()>;

    fn is_activated(&self, handle: VerifierHandle) -> LicenseResult<()>;

    /// Basic genuine check.
    fn is_genuine(&self, handle: VerifierHandle) -> LicenseResult<()>;

    /// Extended genuine check carrying interval, grace period and flags.
    fn is_genuine_ex(&self, handle: VerifierHandle, options: &GenuineOptions)
    -> LicenseResult<()>;

    fn use_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extra_data: Option<&str>,
    ) -> LicenseResult<()>;

    fn trial_days_remaining(&self, handle: VerifierHandle, flags: TrialFlags)
    -> LicenseResult<u32>;

    fn extend_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extension_code: &str,
    ) -> LicenseResult<()>;

    /// Returns the number of characters needed to hold `query`, including
    /// the terminator.
    fn measure(&self, handle: VerifierHandle, query: StringQuery<'_>) -> LicenseResult<usize>;

    /// Reads `query` into a buffer of `capacity` characters.
    fn fill(
        &self,
        handle: VerifierHandle,
        query: StringQuery<'_>,
        capacity: usize,
    ) -> LicenseResult<String>;

    /// Measures then fills, so values of any length come back whole.
    fn read_string(&self, handle: VerifierHandle, query: StringQuery<'_>) -> LicenseResult<String> {
        let capacity = self.measure(handle, query)?;
        if capacity == 0 {
            return Ok(String::new());
        }
        self.fill(handle, query, capacity)
    }

    /// Checks a `YYYY-MM-DD HH-MM-SS` UTC date against the license.
    fn is_date_valid(
        &self,
        handle: VerifierHandle,
        date: &str,
        flags: DateCheckFlags,
    ) -> LicenseResult<()>;

    /// Stores activation data in a custom directory.
    fn set_custom_act_data_path(&self, path: &Path) -> LicenseResult<()>;

    /// Routes network calls through a proxy.
    fn set_custom_proxy(&self, address: &str) -> LicenseResult<()>;
}

impl<V: Verifier + ?Sized> Verifier for &V {
    fn load_details(&self, details: &DetailsLocator) -> LicenseResult<()> {
        (**self).load_details(details)
    }

    fn get_handle(&self, version_guid: &str) -> LicenseResult<VerifierHandle> {
        (**self).get_handle(version_guid)
    }

    fn check_and_save_key(
        &self,
        handle: VerifierHandle,
        key: &str,
        mode: ActivationMode,
    ) -> LicenseResult<()> {
        (**self).check_and_save_key(handle, key, mode)
    }

    fn is_product_key_valid(&self, handle: VerifierHandle) -> LicenseResult<()> {
        (**self).is_product_key_valid(handle)
    }

    fn activate(&self, handle: VerifierHandle, extra_data: Option<&str>) -> LicenseResult<()> {
        (**self).activate(handle, extra_data)
    }

    fn activation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        (**self).activation_request_to_file(handle, path, extra_data)
    }

    fn activate_from_file(&self, handle: VerifierHandle, path: &Path) -> LicenseResult<()> {
        (**self).activate_from_file(handle, path)
    }

    fn deactivate(&self, handle: VerifierHandle, erase_key: bool) -> LicenseResult<()> {
        (**self).deactivate(handle, erase_key)
    }

    fn deactivation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        erase_key: bool,
    ) -> LicenseResult<()> {
        (**self).deactivation_request_to_file(handle, path, erase_key)
    }

    fn is_activated(&self, handle: VerifierHandle) -> LicenseResult<()> {
        (**self).is_activated(handle)
    }

    fn is_genuine(&self, handle: VerifierHandle) -> LicenseResult<()> {
        (**self).is_genuine(handle)
    }

    fn is_genuine_ex(
        &self,
        handle: VerifierHandle,
        options: &GenuineOptions,
    ) -> LicenseResult<()> {
        (**self).is_genuine_ex(handle, options)
    }

    fn use_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        (**self).use_trial(handle, flags, extra_data)
    }

    fn trial_days_remaining(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
    ) -> LicenseResult<u32> {
        (**self).trial_days_remaining(handle, flags)
    }

    fn extend_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extension_code: &str,
    ) -> LicenseResult<()> {
        (**self).extend_trial(handle, flags, extension_code)
    }

    fn measure(&self, handle: VerifierHandle, query: StringQuery<'_>) -> LicenseResult<usize> {
        (**self).measure(handle, query)
    }

    fn fill(
        &self,
        handle: VerifierHandle,
        query: StringQuery<'_>,
        capacity: usize,
    ) -> LicenseResult<String> {
        (**self).fill(handle, query, capacity)
    }

    fn is_date_valid(
        &self,
        handle: VerifierHandle,
        date: &str,
        flags: DateCheckFlags,
    ) -> LicenseResult<()> {
        (**self).is_date_valid(handle, date, flags)
    }

    fn set_custom_act_data_path(&self, path: &Path) -> LicenseResult<()> {
        (**self).set_custom_act_data_path(path)
    }

    fn set_custom_proxy(&self, address: &str) -> LicenseResult<()> {
        (**self).set_custom_proxy(address)
    }
}
