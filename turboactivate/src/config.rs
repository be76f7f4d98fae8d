//! File-based configuration for a licensing session.
//!
//! ```toml
//! details_path = "TurboActivate.dat"
//! version_guid = "18324776654b3946fc44a5f3.49025204"
//! library_dir = "/opt/myapp/lib"
//! mode = "user"
//! trial = "verified"
//! proxy = "http://127.0.0.1:8080/"
//!
//! [genuine]
//! days_between_checks = 90
//! grace_days = 14
//! flags = ["SKIP_OFFLINE"]
//! ```

use crate::error::{LicenseResult, TurboActivateError};
use crate::flags::{ActivationMode, GenuineFlags, TrialKind};
use crate::options::GenuineOptions;
use crate::proxy::ProxyAddress;
use crate::session::{ProductIdentity, SessionOptions};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`LicenseConfig::library_dir`].
pub const LIBRARY_DIR_ENV: &str = "TURBOACTIVATE_LIBRARY_DIR";

/// Genuine-check settings as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenuineConfig {
    /// How often to contact the server, in days.
    pub days_between_checks: u32,
    /// Grace period after a network failure, in days.
    pub grace_days: u32,
    /// Flag names, e.g. `SKIP_OFFLINE` or `DISALLOW_VM`.
    pub flags: Vec<String>,
}

impl GenuineConfig {
    /// Converts the settings into options for the genuine check.
    pub fn to_options(&self) -> LicenseResult<GenuineOptions> {
        let mut flags = GenuineFlags::empty();
        for name in &self.flags {
            let flag = GenuineFlags::from_name(name.trim()).ok_or_else(|| {
                TurboActivateError::Configuration(format!("unknown genuine flag '{name}'"))
            })?;
            flags |= flag;
        }
        Ok(GenuineOptions::new()
            .with_flags(flags)
            .with_days_between_checks(self.days_between_checks)
            .with_grace_days(self.grace_days))
    }
}

/// Licensing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Product details file.
    pub details_path: PathBuf,
    /// Product version GUID.
    pub version_guid: String,
    /// Directory holding the native library.
    pub library_dir: PathBuf,
    pub mode: ActivationMode,
    pub trial: TrialKind,
    pub genuine: GenuineConfig,
    /// Proxy for network calls.
    pub proxy: Option<String>,
    /// Custom directory for activation data. Unsupported on Linux.
    pub custom_data_path: Option<PathBuf>,
    /// Deactivate and erase the key when a new key is rejected.
    pub deactivate_on_key_failure: bool,
}

impl LicenseConfig {
    /// Parses a TOML document and applies environment overrides.
    pub fn from_toml_str(content: &str) -> LicenseResult<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| TurboActivateError::Configuration(format!("invalid config: {e}")))?;
        config.apply_env();
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LicenseResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.apply_library_dir_override(std::env::var_os(LIBRARY_DIR_ENV));
    }

    /// Replaces `library_dir` with the value of [`LIBRARY_DIR_ENV`], if it
    /// was set to something non-empty.
    pub fn apply_library_dir_override(&mut self, value: Option<OsString>) {
        if let Some(dir) = value.filter(|dir| !dir.is_empty()) {
            self.library_dir = PathBuf::from(dir);
        }
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if !path.as_os_str().is_empty() && path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.details_path);
        resolve(&mut self.library_dir);
        if let Some(path) = self.custom_data_path.as_mut() {
            resolve(path);
        }
    }

    /// Checks that the product identity and optional settings are usable.
    pub fn validate(&self) -> LicenseResult<()> {
        self.product_identity()?;
        self.genuine.to_options()?;
        if let Some(proxy) = &self.proxy {
            ProxyAddress::parse(proxy)?;
        }
        Ok(())
    }

    /// The product identity named by this config.
    pub fn product_identity(&self) -> LicenseResult<ProductIdentity> {
        ProductIdentity::new(self.details_path.clone(), self.version_guid.clone())
    }

    /// Session options named by this config.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            mode: self.mode,
            trial_kind: self.trial,
            deactivate_on_key_failure: self.deactivate_on_key_failure,
            start_trial: false,
        }
    }
}
