//! [`Verifier`] backed by the vendor's TurboActivate shared library.
//!
//! The library is loaded at runtime from a directory chosen by the caller.
//! Strings cross the ABI as UTF-16 on Windows and as narrow NUL-terminated
//! strings everywhere else. Every status goes through [`status::check`].

use crate::error::{LicenseResult, TurboActivateError};
use crate::flags::{ActivationMode, DateCheckFlags, TrialFlags};
use crate::options::{GenuineOptions, RawGenuineOptions};
use crate::status::{self, RawStatus};
use crate::verifier::{DetailsLocator, StringQuery, Verifier, VerifierHandle};
use libloading::Library;
use std::ffi::{c_char, c_int};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(windows)]
type TaChar = u16;
#[cfg(not(windows))]
type TaChar = c_char;

/// File name of the native library on this platform.
#[must_use]
pub const fn library_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "TurboActivate.dll"
    } else if cfg!(target_os = "macos") {
        "libTurboActivate.dylib"
    } else {
        "libTurboActivate.so"
    }
}

/// Full path of the native library inside `dir`.
#[must_use]
pub fn library_path(dir: &Path) -> PathBuf {
    dir.join(library_file_name())
}

/// C layout of the activation options record.
#[repr(C)]
struct RawActivateOptions {
    n_length: u32,
    s_extra_data: *const TaChar,
}

// HRESULT is a 32-bit value on every supported target.
type PDetsFromPathFn = unsafe extern "system" fn(*const TaChar) -> RawStatus;
type PDetsFromByteArrayFn = unsafe extern "system" fn(*const u8, usize) -> RawStatus;
type GetHandleFn = unsafe extern "system" fn(*const TaChar) -> u32;
type HandleFn = unsafe extern "system" fn(u32) -> RawStatus;
type HandleStrFn = unsafe extern "system" fn(u32, *const TaChar) -> RawStatus;
type HandleStrFlagsFn = unsafe extern "system" fn(u32, *const TaChar, u32) -> RawStatus;
type HandleFlagsStrFn = unsafe extern "system" fn(u32, u32, *const TaChar) -> RawStatus;
type ReadStrFn = unsafe extern "system" fn(u32, *mut TaChar, c_int) -> RawStatus;
type ReadFeatureFn = unsafe extern "system" fn(u32, *const TaChar, *mut TaChar, c_int) -> RawStatus;
type ActivateFn = unsafe extern "system" fn(u32, *const RawActivateOptions) -> RawStatus;
type ActivateToFileFn =
    unsafe extern "system" fn(u32, *const TaChar, *const RawActivateOptions) -> RawStatus;
type DeactivateFn = unsafe extern "system" fn(u32, c_char) -> RawStatus;
type DeactivateToFileFn = unsafe extern "system" fn(u32, *const TaChar, c_char) -> RawStatus;
type IsGenuineExFn = unsafe extern "system" fn(u32, *const RawGenuineOptions) -> RawStatus;
type TrialDaysFn = unsafe extern "system" fn(u32, u32, *mut u32) -> RawStatus;
type StrFn = unsafe extern "system" fn(*const TaChar) -> RawStatus;

struct Symbols {
    pdets_from_path: PDetsFromPathFn,
    pdets_from_byte_array: PDetsFromByteArrayFn,
    get_handle: GetHandleFn,
    check_and_save_pkey: HandleStrFlagsFn,
    get_pkey: ReadStrFn,
    is_product_key_valid: HandleFn,
    activate: ActivateFn,
    activation_request_to_file: ActivateToFileFn,
    activate_from_file: HandleStrFn,
    deactivate: DeactivateFn,
    deactivation_request_to_file: DeactivateToFileFn,
    get_extra_data: ReadStrFn,
    get_feature_value: ReadFeatureFn,
    is_activated: HandleFn,
    is_genuine: HandleFn,
    is_genuine_ex: IsGenuineExFn,
    use_trial: HandleFlagsStrFn,
    trial_days_remaining: TrialDaysFn,
    extend_trial: HandleFlagsStrFn,
    is_date_valid: HandleStrFlagsFn,
    // Not exported on Linux.
    set_custom_act_data_path: Option<StrFn>,
    set_custom_proxy: StrFn,
}

/// Resolves a symbol and copies the function pointer out of the library.
///
/// # Safety
/// `T` must match the exported function's signature.
unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> LicenseResult<T> {
    let mut c_name = Vec::with_capacity(name.len() + 1);
    c_name.extend_from_slice(name.as_bytes());
    c_name.push(0);

    let symbol = unsafe { library.get::<T>(&c_name) }
        .map_err(|e| TurboActivateError::Library(format!("missing symbol {name}: {e}")))?;
    Ok(*symbol)
}

impl Symbols {
    /// # Safety
    /// `library` must be a TurboActivate 4.x build.
    unsafe fn resolve(library: &Library) -> LicenseResult<Self> {
        unsafe {
            Ok(Self {
                pdets_from_path: symbol(library, "TA_PDetsFromPath")?,
                pdets_from_byte_array: symbol(library, "TA_PDetsFromByteArray")?,
                get_handle: symbol(library, "TA_GetHandle")?,
                check_and_save_pkey: symbol(library, "TA_CheckAndSavePKey")?,
                get_pkey: symbol(library, "TA_GetPKey")?,
                is_product_key_valid: symbol(library, "TA_IsProductKeyValid")?,
                activate: symbol(library, "TA_Activate")?,
                activation_request_to_file: symbol(library, "TA_ActivationRequestToFile")?,
                activate_from_file: symbol(library, "TA_ActivateFromFile")?,
                deactivate: symbol(library, "TA_Deactivate")?,
                deactivation_request_to_file: symbol(library, "TA_DeactivationRequestToFile")?,
                get_extra_data: symbol(library, "TA_GetExtraData")?,
                get_feature_value: symbol(library, "TA_GetFeatureValue")?,
                is_activated: symbol(library, "TA_IsActivated")?,
                is_genuine: symbol(library, "TA_IsGenuine")?,
                is_genuine_ex: symbol(library, "TA_IsGenuineEx")?,
                use_trial: symbol(library, "TA_UseTrial")?,
                trial_days_remaining: symbol(library, "TA_TrialDaysRemaining")?,
                extend_trial: symbol(library, "TA_ExtendTrial")?,
                is_date_valid: symbol(library, "TA_IsDateValid")?,
                set_custom_act_data_path: if cfg!(target_os = "linux") {
                    None
                } else {
                    Some(symbol(library, "TA_SetCustomActDataPath")?)
                },
                set_custom_proxy: symbol(library, "TA_SetCustomProxy")?,
            })
        }
    }
}

/// NUL-terminated string in the library's native character type.
struct NativeString(Vec<TaChar>);

impl NativeString {
    fn new(value: &str) -> LicenseResult<Self> {
        if value.contains('\0') {
            return Err(TurboActivateError::InvalidString(format!(
                "'{}' contains a NUL character",
                value.escape_debug()
            )));
        }

        #[cfg(windows)]
        let chars: Vec<TaChar> = value.encode_utf16().chain(std::iter::once(0)).collect();
        #[cfg(not(windows))]
        let chars: Vec<TaChar> = value
            .bytes()
            .map(|b| b as TaChar)
            .chain(std::iter::once(0))
            .collect();

        Ok(Self(chars))
    }

    fn from_path(path: &Path) -> LicenseResult<Self> {
        #[cfg(windows)]
        let chars: Vec<TaChar> = {
            use std::os::windows::ffi::OsStrExt;
            path.as_os_str().encode_wide().collect()
        };
        #[cfg(unix)]
        let chars: Vec<TaChar> = {
            use std::os::unix::ffi::OsStrExt;
            path.as_os_str().as_bytes().iter().map(|&b| b as TaChar).collect()
        };

        if chars.contains(&0) {
            return Err(TurboActivateError::InvalidString(format!(
                "path '{}' contains a NUL character",
                path.display()
            )));
        }

        let mut chars = chars;
        chars.push(0);
        Ok(Self(chars))
    }

    fn optional(value: Option<&str>) -> LicenseResult<Option<Self>> {
        value.map(Self::new).transpose()
    }

    fn as_ptr(&self) -> *const TaChar {
        self.0.as_ptr()
    }
}

fn ptr_or_null(value: Option<&NativeString>) -> *const TaChar {
    value.map_or(std::ptr::null(), NativeString::as_ptr)
}

/// Decodes a filled buffer up to its first NUL.
fn decode(buffer: &[TaChar]) -> String {
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());

    #[cfg(windows)]
    {
        String::from_utf16_lossy(&buffer[..end])
    }
    #[cfg(not(windows))]
    {
        let bytes: Vec<u8> = buffer[..end].iter().map(|&c| c as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn capacity_to_c_int(capacity: usize) -> LicenseResult<c_int> {
    c_int::try_from(capacity).map_err(|_| TurboActivateError::InsufficientBuffer)
}

/// The native TurboActivate engine.
pub struct NativeVerifier {
    symbols: Symbols,
    path: PathBuf,
    _library: Library,
}

impl std::fmt::Debug for NativeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeVerifier")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NativeVerifier {
    /// Loads the platform library from `dir`.
    pub fn load(dir: &Path) -> LicenseResult<Self> {
        Self::load_file(&library_path(dir))
    }

    /// Loads a library from an explicit file path.
    pub fn load_file(path: &Path) -> LicenseResult<Self> {
        // SAFETY: loading runs the library's initialisers; TurboActivate's
        // are side-effect free apart from its own global state.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            TurboActivateError::Library(format!("failed to load {}: {e}", path.display()))
        })?;
        // SAFETY: the symbol table matches the TurboActivate 4.x headers.
        let symbols = unsafe { Symbols::resolve(&library) }?;
        info!(path = %path.display(), "native licensing library loaded");

        Ok(Self {
            symbols,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Where the library was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_into(
        &self,
        handle: VerifierHandle,
        query: StringQuery<'_>,
        buffer: *mut TaChar,
        capacity: c_int,
    ) -> LicenseResult<RawStatus> {
        let h = handle.raw();
        // SAFETY: `buffer` is either null with capacity 0, or valid for
        // `capacity` characters.
        let raw = unsafe {
            match query {
                StringQuery::ProductKey => (self.symbols.get_pkey)(h, buffer, capacity),
                StringQuery::ExtraData => (self.symbols.get_extra_data)(h, buffer, capacity),
                StringQuery::FeatureValue(name) => {
                    let name = NativeString::new(name)?;
                    (self.symbols.get_feature_value)(h, name.as_ptr(), buffer, capacity)
                }
            }
        };
        Ok(raw)
    }
}

impl Verifier for NativeVerifier {
    fn load_details(&self, details: &DetailsLocator) -> LicenseResult<()> {
        let raw = match details {
            DetailsLocator::Path(path) => {
                debug!(path = %path.display(), "loading product details");
                let path = NativeString::from_path(path)?;
                unsafe { (self.symbols.pdets_from_path)(path.as_ptr()) }
            }
            DetailsLocator::Bytes(bytes) => {
                debug!(len = bytes.len(), "loading product details from memory");
                unsafe { (self.symbols.pdets_from_byte_array)(bytes.as_ptr(), bytes.len()) }
            }
        };
        status::check(raw)
    }

    fn get_handle(&self, version_guid: &str) -> LicenseResult<VerifierHandle> {
        let guid = NativeString::new(version_guid)?;
        let raw = unsafe { (self.symbols.get_handle)(guid.as_ptr()) };
        VerifierHandle::new(raw)
    }

    fn check_and_save_key(
        &self,
        handle: VerifierHandle,
        key: &str,
        mode: ActivationMode,
    ) -> LicenseResult<()> {
        let key = NativeString::new(key)?;
        status::check(unsafe {
            (self.symbols.check_and_save_pkey)(handle.raw(), key.as_ptr(), mode.bits())
        })
    }

    fn is_product_key_valid(&self, handle: VerifierHandle) -> LicenseResult<()> {
        status::check(unsafe { (self.symbols.is_product_key_valid)(handle.raw()) })
    }

    fn activate(&self, handle: VerifierHandle, extra_data: Option<&str>) -> LicenseResult<()> {
        let extra = NativeString::optional(extra_data)?;
        let options = RawActivateOptions {
            n_length: std::mem::size_of::<RawActivateOptions>() as u32,
            s_extra_data: ptr_or_null(extra.as_ref()),
        };
        let options_ptr = if extra.is_some() {
            &options as *const RawActivateOptions
        } else {
            std::ptr::null()
        };
        debug!(handle = %handle, "activating");
        status::check(unsafe { (self.symbols.activate)(handle.raw(), options_ptr) })
    }

    fn activation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        let file = NativeString::from_path(path)?;
        let extra = NativeString::optional(extra_data)?;
        let options = RawActivateOptions {
            n_length: std::mem::size_of::<RawActivateOptions>() as u32,
            s_extra_data: ptr_or_null(extra.as_ref()),
        };
        let options_ptr = if extra.is_some() {
            &options as *const RawActivateOptions
        } else {
            std::ptr::null()
        };
        status::check(unsafe {
            (self.symbols.activation_request_to_file)(handle.raw(), file.as_ptr(), options_ptr)
        })
    }

    fn activate_from_file(&self, handle: VerifierHandle, path: &Path) -> LicenseResult<()> {
        let file = NativeString::from_path(path)?;
        status::check(unsafe { (self.symbols.activate_from_file)(handle.raw(), file.as_ptr()) })
    }

    fn deactivate(&self, handle: VerifierHandle, erase_key: bool) -> LicenseResult<()> {
        debug!(handle = %handle, erase_key, "deactivating");
        status::check(unsafe {
            (self.symbols.deactivate)(handle.raw(), c_char::from(erase_key))
        })
    }

    fn deactivation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        erase_key: bool,
    ) -> LicenseResult<()> {
        let file = NativeString::from_path(path)?;
        status::check(unsafe {
            (self.symbols.deactivation_request_to_file)(
                handle.raw(),
                file.as_ptr(),
                c_char::from(erase_key),
            )
        })
    }

    fn is_activated(&self, handle: VerifierHandle) -> LicenseResult<()> {
        status::check(unsafe { (self.symbols.is_activated)(handle.raw()) })
    }

    fn is_genuine(&self, handle: VerifierHandle) -> LicenseResult<()> {
        debug!(handle = %handle, "genuine check");
        status::check(unsafe { (self.symbols.is_genuine)(handle.raw()) })
    }

    fn is_genuine_ex(
        &self,
        handle: VerifierHandle,
        options: &GenuineOptions,
    ) -> LicenseResult<()> {
        let raw_options = options.to_raw();
        debug!(
            handle = %handle,
            days_between_checks = raw_options.n_days_between_checks,
            grace_days = raw_options.n_grace_days_on_inet_err,
            flags = raw_options.flags,
            "extended genuine check"
        );
        status::check(unsafe { (self.symbols.is_genuine_ex)(handle.raw(), &raw_options) })
    }

    fn use_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        let extra = NativeString::optional(extra_data)?;
        status::check(unsafe {
            (self.symbols.use_trial)(handle.raw(), flags.bits(), ptr_or_null(extra.as_ref()))
        })
    }

    fn trial_days_remaining(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
    ) -> LicenseResult<u32> {
        let mut days: u32 = 0;
        status::check(unsafe {
            (self.symbols.trial_days_remaining)(handle.raw(), flags.bits(), &mut days)
        })?;
        Ok(days)
    }

    fn extend_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extension_code: &str,
    ) -> LicenseResult<()> {
        let code = NativeString::new(extension_code)?;
        status::check(unsafe {
            (self.symbols.extend_trial)(handle.raw(), flags.bits(), code.as_ptr())
        })
    }

    fn measure(&self, handle: VerifierHandle, query: StringQuery<'_>) -> LicenseResult<usize> {
        // With a null buffer the return value is the required size, so it is
        // not classified here. The fill call's status is authoritative.
        let raw = self.read_into(handle, query, std::ptr::null_mut(), 0)?;
        if raw < 0 {
            return Err(TurboActivateError::Generic { code: raw });
        }
        Ok(raw as usize)
    }

    fn fill(
        &self,
        handle: VerifierHandle,
        query: StringQuery<'_>,
        capacity: usize,
    ) -> LicenseResult<String> {
        let mut buffer: Vec<TaChar> = vec![0; capacity];
        let c_capacity = capacity_to_c_int(capacity)?;
        let raw = self.read_into(handle, query, buffer.as_mut_ptr(), c_capacity)?;
        status::check(raw)?;
        Ok(decode(&buffer))
    }

    fn is_date_valid(
        &self,
        handle: VerifierHandle,
        date: &str,
        flags: DateCheckFlags,
    ) -> LicenseResult<()> {
        let date = NativeString::new(date)?;
        status::check(unsafe {
            (self.symbols.is_date_valid)(handle.raw(), date.as_ptr(), flags.bits())
        })
    }

    fn set_custom_act_data_path(&self, path: &Path) -> LicenseResult<()> {
        let set_path = self
            .symbols
            .set_custom_act_data_path
            .ok_or(TurboActivateError::PlatformUnsupported("custom activation data path"))?;
        let dir = NativeString::from_path(path)?;
        status::check(unsafe { set_path(dir.as_ptr()) })
    }

    fn set_custom_proxy(&self, address: &str) -> LicenseResult<()> {
        let address = NativeString::new(address)?;
        status::check(unsafe { (self.symbols.set_custom_proxy)(address.as_ptr()) })
    }
}
