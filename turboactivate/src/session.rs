//! License session: product identity, activation, keys, trials and genuine
//! checks over one [`Verifier`].
//!
//! The session holds the bound product and its engine handle. Activation
//! and genuine status are never cached: every query goes back to the
//! engine. The session is not meant to be shared between threads without
//! external locking.

use crate::date;
use crate::error::{LicenseResult, TurboActivateError};
use crate::flags::{ActivationMode, DateCheckFlags, TrialFlags, TrialKind};
use crate::genuine::{self, GenuineState, GenuineStatus};
use crate::options::GenuineOptions;
use crate::proxy::ProxyAddress;
use crate::trial::{self, TrialPolicy, TrialStatus};
use crate::verifier::{DetailsLocator, StringQuery, Verifier, VerifierHandle};
use std::cell::Cell;
use std::path::Path;
use tracing::{debug, info, warn};

/// The product a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductIdentity {
    details: DetailsLocator,
    version_guid: String,
}

impl ProductIdentity {
    /// Creates an identity.
    ///
    /// # Errors
    ///
    /// Returns [`TurboActivateError::Configuration`] if the details locator
    /// or the version GUID is empty.
    pub fn new(
        details: impl Into<DetailsLocator>,
        version_guid: impl Into<String>,
    ) -> LicenseResult<Self> {
        let details = details.into();
        let version_guid = version_guid.into().trim().to_string();

        if details.is_empty() {
            return Err(TurboActivateError::Configuration(
                "product details locator is empty".to_string(),
            ));
        }
        if version_guid.is_empty() {
            return Err(TurboActivateError::Configuration(
                "version GUID is empty".to_string(),
            ));
        }

        Ok(Self {
            details,
            version_guid,
        })
    }

    #[must_use]
    pub fn details(&self) -> &DetailsLocator {
        &self.details
    }

    #[must_use]
    pub fn version_guid(&self) -> &str {
        &self.version_guid
    }
}

/// Session behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub mode: ActivationMode,
    pub trial_kind: TrialKind,
    /// Deactivate and erase the key when [`LicenseSession::set_product_key`] fails.
    pub deactivate_on_key_failure: bool,
    /// Start a trial right after binding.
    pub start_trial: bool,
}

/// Stores activation data in a custom directory.
///
/// Must run before any session is created. Not available on Linux, where
/// it fails without calling the engine.
pub fn set_custom_data_path<V: Verifier>(verifier: &V, path: &Path) -> LicenseResult<()> {
    if cfg!(target_os = "linux") {
        return Err(TurboActivateError::PlatformUnsupported(
            "custom activation data path",
        ));
    }
    debug!(path = %path.display(), "setting custom activation data path");
    verifier.set_custom_act_data_path(path)
}

/// Routes the engine's network calls through a proxy.
pub fn set_custom_proxy<V: Verifier>(verifier: &V, address: &str) -> LicenseResult<ProxyAddress> {
    let proxy = ProxyAddress::parse(address)?;
    debug!(host = proxy.host(), port = proxy.port(), "setting custom proxy");
    verifier.set_custom_proxy(&proxy.to_string())?;
    Ok(proxy)
}

/// A licensing session for one product at a time.
#[derive(Debug)]
pub struct LicenseSession<V: Verifier> {
    verifier: V,
    identity: ProductIdentity,
    handle: VerifierHandle,
    options: SessionOptions,
    genuine_state: Cell<GenuineState>,
}

impl<V: Verifier> LicenseSession<V> {
    /// Binds a new session to `identity`.
    pub fn new(
        verifier: V,
        identity: ProductIdentity,
        options: SessionOptions,
    ) -> LicenseResult<Self> {
        let handle = resolve_handle(&verifier, &identity)?;
        info!(
            guid = identity.version_guid(),
            %handle,
            mode = %options.mode,
            "license session bound"
        );

        let session = Self {
            verifier,
            identity,
            handle,
            options,
            genuine_state: Cell::new(GenuineState::Unverified),
        };

        if options.start_trial {
            session.use_trial(None)?;
        }
        Ok(session)
    }

    /// Switches to another product, replacing the identity, mode and handle.
    ///
    /// Safe to call repeatedly to license several products in one process.
    pub fn bind(&mut self, identity: ProductIdentity, mode: ActivationMode) -> LicenseResult<()> {
        let handle = resolve_handle(&self.verifier, &identity)?;
        info!(
            guid = identity.version_guid(),
            %handle,
            %mode,
            "license session rebound"
        );
        self.identity = identity;
        self.handle = handle;
        self.options.mode = mode;
        self.genuine_state.set(GenuineState::Unverified);
        Ok(())
    }

    #[must_use]
    pub fn identity(&self) -> &ProductIdentity {
        &self.identity
    }

    #[must_use]
    pub fn handle(&self) -> VerifierHandle {
        self.handle
    }

    #[must_use]
    pub fn mode(&self) -> ActivationMode {
        self.options.mode
    }

    #[must_use]
    pub fn trial_kind(&self) -> TrialKind {
        self.options.trial_kind
    }

    pub fn set_trial_kind(&mut self, kind: TrialKind) {
        self.options.trial_kind = kind;
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    #[must_use]
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn into_verifier(self) -> V {
        self.verifier
    }

    // ── Product key ──────────────────────────────────────────────

    /// Returns the stored product key, or `None` when there is none.
    pub fn product_key(&self) -> LicenseResult<Option<String>> {
        match self.verifier.read_string(self.handle, StringQuery::ProductKey) {
            Ok(key) if key.is_empty() => Ok(None),
            Ok(key) => Ok(Some(key)),
            Err(TurboActivateError::ProductKey) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Checks and stores a product key.
    ///
    /// With `deactivate_on_key_failure` set, a rejected key also deactivates
    /// the product and erases the stored key before the error is returned.
    pub fn set_product_key(&self, key: &str) -> LicenseResult<()> {
        let result = self
            .verifier
            .check_and_save_key(self.handle, key.trim(), self.options.mode);

        match result {
            Ok(()) => {
                info!(handle = %self.handle, "product key saved");
                Ok(())
            }
            Err(err) => {
                if self.options.deactivate_on_key_failure {
                    warn!(error = %err, "product key rejected, deactivating");
                    if let Err(deactivate_err) = self.deactivate(true) {
                        warn!(error = %deactivate_err, "deactivation after key failure failed");
                    }
                }
                Err(err)
            }
        }
    }

    /// Returns true if the stored key is well formed. Does not check
    /// activation; use [`Self::is_activated`] or [`Self::is_genuine`].
    pub fn is_product_key_valid(&self) -> bool {
        self.verifier.is_product_key_valid(self.handle).is_ok()
    }

    // ── Activation ───────────────────────────────────────────────

    /// Returns true if the product is activated. Always asks the engine.
    pub fn is_activated(&self) -> bool {
        match self.verifier.is_activated(self.handle) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "not activated");
                false
            }
        }
    }

    /// Activates online.
    ///
    /// Returns `Ok(false)` without contacting the server if the product is
    /// already activated. On failure the product is deactivated and its key
    /// erased, so no half-activated state is left behind.
    pub fn activate(&self, extra_data: Option<&str>) -> LicenseResult<bool> {
        if self.is_activated() {
            debug!("already activated, skipping activation");
            return Ok(false);
        }

        match self.verifier.activate(self.handle, extra_data) {
            Ok(()) => {
                info!(handle = %self.handle, "product activated");
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "activation failed, erasing product key");
                if let Err(deactivate_err) = self.deactivate(true) {
                    warn!(error = %deactivate_err, "deactivation after failed activation failed");
                }
                Err(err)
            }
        }
    }

    /// Writes an offline activation request to `path`.
    ///
    /// Returns `Ok(false)` if already activated. A failure keeps the stored
    /// key so the request can be retried.
    pub fn activation_request_to_file(
        &self,
        path: &Path,
        extra_data: Option<&str>,
    ) -> LicenseResult<bool> {
        if self.is_activated() {
            debug!("already activated, skipping activation request");
            return Ok(false);
        }

        self.verifier
            .activation_request_to_file(self.handle, path, extra_data)?;
        info!(path = %path.display(), "activation request written");
        Ok(true)
    }

    /// Activates from an offline activation response file.
    pub fn activate_from_file(&self, path: &Path) -> LicenseResult<()> {
        self.verifier.activate_from_file(self.handle, path)?;
        info!(path = %path.display(), "product activated from response file");
        Ok(())
    }

    /// Deactivates online. Deactivating an inactive product succeeds.
    ///
    /// When moving between computers it is usually better to keep the key
    /// (`erase_key = false`) so the user does not have to enter it again.
    pub fn deactivate(&self, erase_key: bool) -> LicenseResult<()> {
        let result = self.verifier.deactivate(self.handle, erase_key);
        self.finish_deactivation(result, erase_key)
    }

    /// Writes an offline deactivation request to `path`.
    pub fn deactivate_to_file(&self, path: &Path, erase_key: bool) -> LicenseResult<()> {
        let result = self
            .verifier
            .deactivation_request_to_file(self.handle, path, erase_key);
        self.finish_deactivation(result, erase_key)
    }

    fn finish_deactivation(
        &self,
        result: LicenseResult<()>,
        erase_key: bool,
    ) -> LicenseResult<()> {
        match result {
            Ok(()) => {
                info!(handle = %self.handle, erase_key, "product deactivated");
                Ok(())
            }
            Err(TurboActivateError::NotActivated) => {
                warn!(handle = %self.handle, "deactivate on inactive product ignored");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the extra data passed at activation, or an empty string.
    pub fn get_extra_data(&self) -> LicenseResult<String> {
        match self.verifier.read_string(self.handle, StringQuery::ExtraData) {
            Ok(data) => Ok(data),
            Err(TurboActivateError::Fail) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    // ── Features ─────────────────────────────────────────────────

    /// Returns a license feature value, or an empty string if absent.
    pub fn get_feature_value(&self, name: &str) -> LicenseResult<String> {
        match self
            .verifier
            .read_string(self.handle, StringQuery::FeatureValue(name))
        {
            Ok(value) => Ok(value),
            Err(TurboActivateError::Fail) => {
                debug!(feature = name, "feature not present");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Returns true if the feature has a non-empty value.
    pub fn has_feature(&self, name: &str) -> LicenseResult<bool> {
        Ok(!self.get_feature_value(name)?.is_empty())
    }

    // ── Genuine ──────────────────────────────────────────────────

    /// Verifies the activation with the server, reactivating if needed.
    ///
    /// Zeroed or absent options use the basic check; anything else uses the
    /// extended check. See [`genuine::evaluate`] for how results map.
    pub fn is_genuine(&self, options: Option<&GenuineOptions>) -> LicenseResult<GenuineStatus> {
        let raw = match options {
            Some(opts) if !opts.is_default() => self.verifier.is_genuine_ex(self.handle, opts),
            _ => self.verifier.is_genuine(self.handle),
        };

        let outcome = genuine::evaluate(raw, options, || self.is_activated());
        match &outcome {
            Ok(GenuineStatus::GraceDegraded { reason }) => {
                warn!(?reason, "genuine check could not reach the server, within grace period");
            }
            Ok(status) => debug!(?status, "genuine check passed"),
            Err(e) => warn!(error = %e, "genuine check failed"),
        }

        self.genuine_state.set(GenuineState::after(&outcome));
        outcome
    }

    /// The state seen by the last genuine check. Diagnostic only.
    #[must_use]
    pub fn genuine_state(&self) -> GenuineState {
        self.genuine_state.get()
    }

    // ── Trial ────────────────────────────────────────────────────

    /// The trial selection for this session.
    #[must_use]
    pub fn trial_policy(&self) -> TrialPolicy {
        TrialPolicy::new(self.options.trial_kind, self.options.mode)
    }

    /// Starts (or resumes) the session's trial.
    pub fn use_trial(&self, extra_data: Option<&str>) -> LicenseResult<()> {
        self.use_trial_with_flags(self.trial_policy().flags(), extra_data)
    }

    /// Starts a trial with explicit flags.
    pub fn use_trial_with_flags(
        &self,
        flags: TrialFlags,
        extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        let kind = trial::validate_flags(flags)?;
        self.verifier.use_trial(self.handle, flags, extra_data)?;
        info!(%kind, "trial started");
        Ok(())
    }

    /// Days left in the session's trial. Zero means exhausted or tampered.
    pub fn trial_days_remaining(&self) -> LicenseResult<u32> {
        self.trial_days_remaining_with_flags(self.trial_policy().flags())
    }

    /// Days left in the trial selected by `flags`.
    pub fn trial_days_remaining_with_flags(&self, flags: TrialFlags) -> LicenseResult<u32> {
        trial::validate_flags(flags)?;
        let days = self.verifier.trial_days_remaining(self.handle, flags)?;
        debug!(days, "trial days remaining");
        Ok(days)
    }

    /// The session's trial status.
    pub fn trial_status(&self) -> LicenseResult<TrialStatus> {
        self.trial_days_remaining().map(TrialStatus::from_days)
    }

    /// Extends the session's trial with an extension code.
    pub fn extend_trial(&self, extension_code: &str) -> LicenseResult<()> {
        let flags = self.trial_policy().flags();
        self.verifier
            .extend_trial(self.handle, flags, extension_code.trim())?;
        info!("trial extended");
        Ok(())
    }

    // ── Utilities ────────────────────────────────────────────────

    /// Checks that `date` (or now, if `None` or blank) has not passed the
    /// license expiry.
    ///
    /// Invalid flags are an error; any other engine failure means `false`.
    pub fn is_date_valid(&self, date: Option<&str>) -> LicenseResult<bool> {
        let to_check = match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(date) => {
                date::parse_date(date)?;
                date.to_string()
            }
            None => date::now(),
        };

        match self
            .verifier
            .is_date_valid(self.handle, &to_check, DateCheckFlags::HAS_NOT_EXPIRED)
        {
            Ok(()) => Ok(true),
            Err(TurboActivateError::InvalidFlags) => Err(TurboActivateError::InvalidFlags),
            Err(e) => {
                debug!(date = %to_check, error = %e, "date not valid");
                Ok(false)
            }
        }
    }

    /// See [`set_custom_data_path`].
    pub fn set_custom_path(&self, path: &Path) -> LicenseResult<()> {
        set_custom_data_path(&self.verifier, path)
    }

    /// See [`set_custom_proxy`].
    pub fn set_custom_proxy(&self, address: &str) -> LicenseResult<ProxyAddress> {
        set_custom_proxy(&self.verifier, address)
    }
}

/// Loads product details and resolves the handle for `identity`.
fn resolve_handle<V: Verifier>(
    verifier: &V,
    identity: &ProductIdentity,
) -> LicenseResult<VerifierHandle> {
    match verifier.load_details(identity.details()) {
        Ok(()) => {}
        Err(TurboActivateError::Fail) => {
            debug!("product details already loaded");
        }
        Err(e) => return Err(e),
    }
    verifier.get_handle(identity.version_guid())
}
