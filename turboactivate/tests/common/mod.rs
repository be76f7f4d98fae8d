//! Shared test helpers: an in-memory engine standing in for the native library.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use turboactivate::{
    check, ActivationMode, DateCheckFlags, DetailsLocator, GenuineOptions, LicenseResult,
    ProductIdentity, RawStatus, StatusCode, StringQuery, TrialFlags, TrialKind, Verifier,
    VerifierHandle,
};

pub const GUID: &str = "18324776654b3946fc44a5f3.49025204";
pub const OTHER_GUID: &str = "5e0e3a4f1d2c7b8a9f6e5d4c.11223344";
pub const VALID_KEY: &str = "ABCD-EFGH-IJKL-MNOP-QRST-UVWX-YZ12";
pub const TRIAL_LENGTH: u32 = 30;

/// A trial as the mock engine tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTrial {
    pub kind: TrialKind,
    pub days: u32,
}

/// Engine state behind the mock.
#[derive(Debug, Default)]
pub struct MockState {
    pub loaded_details: Vec<DetailsLocator>,
    pub products: HashMap<String, u32>,
    pub valid_keys: HashSet<String>,
    pub key_results: HashMap<String, RawStatus>,
    pub keys: HashMap<u32, String>,
    pub activated: HashSet<u32>,
    pub extra_data: HashMap<u32, String>,
    pub features: HashMap<String, String>,
    pub trials: HashMap<(u32, u32), MockTrial>,
    pub trial_length: u32,
    pub activate_result: Option<RawStatus>,
    pub request_file_result: Option<RawStatus>,
    pub genuine_results: VecDeque<RawStatus>,
    pub date_result: Option<RawStatus>,
    pub last_genuine_options: Option<GenuineOptions>,
    pub last_date: Option<String>,
    pub proxy: Option<String>,
    pub custom_path: Option<PathBuf>,
    pub request_files: Vec<PathBuf>,
    pub calls: Vec<&'static str>,
}

/// In-memory engine. Uses raw status codes so results go through the real
/// classifier.
#[derive(Debug, Default)]
pub struct MockVerifier {
    state: Mutex<MockState>,
}

impl MockVerifier {
    pub fn new() -> Self {
        let mock = Self::default();
        {
            let mut state = mock.state();
            state.products.insert(GUID.to_string(), 1);
            state.valid_keys.insert(VALID_KEY.to_string());
            state.trial_length = TRIAL_LENGTH;
        }
        mock
    }

    pub fn with_product(self, guid: &str, handle: u32) -> Self {
        self.state().products.insert(guid.to_string(), handle);
        self
    }

    pub fn with_valid_key(self, key: &str) -> Self {
        self.state().valid_keys.insert(key.to_string());
        self
    }

    pub fn with_key_result(self, key: &str, code: StatusCode) -> Self {
        self.state().key_results.insert(key.to_string(), code.raw());
        self
    }

    pub fn with_feature(self, name: &str, value: &str) -> Self {
        self.state()
            .features
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_activate_result(self, code: StatusCode) -> Self {
        self.state().activate_result = Some(code.raw());
        self
    }

    pub fn with_request_file_result(self, code: StatusCode) -> Self {
        self.state().request_file_result = Some(code.raw());
        self
    }

    pub fn with_genuine_results(self, codes: &[StatusCode]) -> Self {
        self.state()
            .genuine_results
            .extend(codes.iter().map(|c| c.raw()));
        self
    }

    pub fn with_date_result(self, code: StatusCode) -> Self {
        self.state().date_result = Some(code.raw());
        self
    }

    /// Marks a handle as activated with a key, bypassing `activate`.
    pub fn activated(self, handle: u32) -> Self {
        {
            let mut state = self.state();
            state.keys.insert(handle, VALID_KEY.to_string());
            state.activated.insert(handle);
        }
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == name).count()
    }

    pub fn stored_key(&self, handle: u32) -> Option<String> {
        self.state().keys.get(&handle).cloned()
    }

    fn record(&self, name: &'static str) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(name);
        state
    }

    fn string_value(
        state: &MockState,
        handle: u32,
        query: StringQuery<'_>,
    ) -> Result<String, RawStatus> {
        match query {
            StringQuery::ProductKey => state
                .keys
                .get(&handle)
                .cloned()
                .ok_or(StatusCode::ProductKey.raw()),
            StringQuery::ExtraData => state
                .extra_data
                .get(&handle)
                .cloned()
                .ok_or(StatusCode::Fail.raw()),
            StringQuery::FeatureValue(name) => {
                if !state.activated.contains(&handle) {
                    return Err(StatusCode::NotActivated.raw());
                }
                state
                    .features
                    .get(name)
                    .cloned()
                    .ok_or(StatusCode::Fail.raw())
            }
        }
    }
}

fn mode_bits(flags: TrialFlags) -> u32 {
    (flags & (TrialFlags::USER | TrialFlags::SYSTEM)).bits()
}

fn status(code: StatusCode) -> LicenseResult<()> {
    check(code.raw())
}

impl Verifier for MockVerifier {
    fn load_details(&self, details: &DetailsLocator) -> LicenseResult<()> {
        let mut state = self.record("load_details");
        if state.loaded_details.contains(details) {
            return status(StatusCode::Fail);
        }
        state.loaded_details.push(details.clone());
        status(StatusCode::Ok)
    }

    fn get_handle(&self, version_guid: &str) -> LicenseResult<VerifierHandle> {
        let state = self.record("get_handle");
        VerifierHandle::new(state.products.get(version_guid).copied().unwrap_or(0))
    }

    fn check_and_save_key(
        &self,
        handle: VerifierHandle,
        key: &str,
        _mode: ActivationMode,
    ) -> LicenseResult<()> {
        let mut state = self.record("check_and_save_key");
        if let Some(code) = state.key_results.get(key) {
            return check(*code);
        }
        if !state.valid_keys.contains(key) {
            return status(StatusCode::ProductKey);
        }
        if state.activated.contains(&handle.raw())
            && state.keys.get(&handle.raw()).map(String::as_str) != Some(key)
        {
            return status(StatusCode::AlreadyActivated);
        }
        state.keys.insert(handle.raw(), key.to_string());
        status(StatusCode::Ok)
    }

    fn is_product_key_valid(&self, handle: VerifierHandle) -> LicenseResult<()> {
        let state = self.record("is_product_key_valid");
        match state.keys.get(&handle.raw()) {
            Some(key) if state.valid_keys.contains(key) => status(StatusCode::Ok),
            _ => status(StatusCode::ProductKey),
        }
    }

    fn activate(&self, handle: VerifierHandle, extra_data: Option<&str>) -> LicenseResult<()> {
        let mut state = self.record("activate");
        if !state.keys.contains_key(&handle.raw()) {
            return status(StatusCode::ProductKey);
        }
        if let Some(code) = state.activate_result {
            if code != StatusCode::Ok.raw() {
                return check(code);
            }
        }
        if let Some(extra) = extra_data {
            if extra.chars().count() > 255 {
                return status(StatusCode::ExtraDataLong);
            }
            state.extra_data.insert(handle.raw(), extra.to_string());
        }
        state.activated.insert(handle.raw());
        status(StatusCode::Ok)
    }

    fn activation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        _extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        let mut state = self.record("activation_request_to_file");
        if !state.keys.contains_key(&handle.raw()) {
            return status(StatusCode::ProductKey);
        }
        if let Some(code) = state.request_file_result {
            return check(code);
        }
        state.request_files.push(path.to_path_buf());
        status(StatusCode::Ok)
    }

    fn activate_from_file(&self, handle: VerifierHandle, path: &Path) -> LicenseResult<()> {
        let mut state = self.record("activate_from_file");
        if !path.exists() {
            return status(StatusCode::Fail);
        }
        state.activated.insert(handle.raw());
        status(StatusCode::Ok)
    }

    fn deactivate(&self, handle: VerifierHandle, erase_key: bool) -> LicenseResult<()> {
        let mut state = self.record("deactivate");
        if erase_key {
            state.keys.remove(&handle.raw());
        }
        if !state.activated.remove(&handle.raw()) {
            return status(StatusCode::NotActivated);
        }
        status(StatusCode::Ok)
    }

    fn deactivation_request_to_file(
        &self,
        handle: VerifierHandle,
        path: &Path,
        erase_key: bool,
    ) -> LicenseResult<()> {
        let mut state = self.record("deactivation_request_to_file");
        if erase_key {
            state.keys.remove(&handle.raw());
        }
        if !state.activated.remove(&handle.raw()) {
            return status(StatusCode::NotActivated);
        }
        state.request_files.push(path.to_path_buf());
        status(StatusCode::Ok)
    }

    fn is_activated(&self, handle: VerifierHandle) -> LicenseResult<()> {
        let state = self.record("is_activated");
        if state.activated.contains(&handle.raw()) {
            status(StatusCode::Ok)
        } else {
            status(StatusCode::NotActivated)
        }
    }

    fn is_genuine(&self, handle: VerifierHandle) -> LicenseResult<()> {
        let mut state = self.record("is_genuine");
        if let Some(code) = state.genuine_results.pop_front() {
            return check(code);
        }
        if state.activated.contains(&handle.raw()) {
            status(StatusCode::Ok)
        } else {
            status(StatusCode::NotActivated)
        }
    }

    fn is_genuine_ex(
        &self,
        handle: VerifierHandle,
        options: &GenuineOptions,
    ) -> LicenseResult<()> {
        let mut state = self.record("is_genuine_ex");
        state.last_genuine_options = Some(*options);
        if let Some(code) = state.genuine_results.pop_front() {
            return check(code);
        }
        if state.activated.contains(&handle.raw()) {
            status(StatusCode::Ok)
        } else {
            status(StatusCode::NotActivated)
        }
    }

    fn use_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        _extra_data: Option<&str>,
    ) -> LicenseResult<()> {
        let mut state = self.record("use_trial");
        let kind = match flags.kind() {
            Ok(kind) => kind,
            Err(_) => return status(StatusCode::MustSpecifyTrialType),
        };
        let key = (handle.raw(), mode_bits(flags));
        let length = state.trial_length;
        match state.trials.get(&key).copied() {
            Some(existing)
                if existing.kind == TrialKind::Verified && kind == TrialKind::Unverified =>
            {
                status(StatusCode::AlreadyVerifiedTrial)
            }
            Some(existing) if existing.kind == kind => status(StatusCode::Ok),
            _ => {
                state.trials.insert(key, MockTrial { kind, days: length });
                status(StatusCode::Ok)
            }
        }
    }

    fn trial_days_remaining(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
    ) -> LicenseResult<u32> {
        let state = self.record("trial_days_remaining");
        let kind = match flags.kind() {
            Ok(kind) => kind,
            Err(_) => return status(StatusCode::MustSpecifyTrialType).map(|()| 0),
        };
        match state.trials.get(&(handle.raw(), mode_bits(flags))) {
            None => status(StatusCode::MustUseTrial).map(|()| 0),
            Some(trial) if trial.kind == TrialKind::Verified && kind == TrialKind::Unverified => {
                status(StatusCode::AlreadyVerifiedTrial).map(|()| 0)
            }
            Some(trial) if trial.kind != kind => status(StatusCode::MustUseTrial).map(|()| 0),
            Some(trial) => Ok(trial.days),
        }
    }

    fn extend_trial(
        &self,
        handle: VerifierHandle,
        flags: TrialFlags,
        extension_code: &str,
    ) -> LicenseResult<()> {
        let mut state = self.record("extend_trial");
        let key = (handle.raw(), mode_bits(flags));
        let Some(trial) = state.trials.get_mut(&key) else {
            return status(StatusCode::MustUseTrial);
        };
        match extension_code {
            "EXTEND-15" => {
                trial.days += 15;
                status(StatusCode::Ok)
            }
            "USED" => status(StatusCode::TrialExtensionUsed),
            _ => status(StatusCode::InvalidArgs),
        }
    }

    fn measure(&self, handle: VerifierHandle, query: StringQuery<'_>) -> LicenseResult<usize> {
        let state = self.record("measure");
        match Self::string_value(&state, handle.raw(), query) {
            Ok(value) => Ok(value.chars().count() + 1),
            Err(code) => check(code).map(|()| 0),
        }
    }

    fn fill(
        &self,
        handle: VerifierHandle,
        query: StringQuery<'_>,
        capacity: usize,
    ) -> LicenseResult<String> {
        let state = self.record("fill");
        match Self::string_value(&state, handle.raw(), query) {
            Ok(value) if value.chars().count() + 1 > capacity => {
                status(StatusCode::InsufficientBuffer).map(|()| String::new())
            }
            Ok(value) => Ok(value),
            Err(code) => check(code).map(|()| String::new()),
        }
    }

    fn is_date_valid(
        &self,
        _handle: VerifierHandle,
        date: &str,
        flags: DateCheckFlags,
    ) -> LicenseResult<()> {
        let mut state = self.record("is_date_valid");
        if flags.is_empty() {
            return status(StatusCode::InvalidFlags);
        }
        state.last_date = Some(date.to_string());
        match state.date_result {
            Some(code) => check(code),
            None => status(StatusCode::Ok),
        }
    }

    fn set_custom_act_data_path(&self, path: &Path) -> LicenseResult<()> {
        let mut state = self.record("set_custom_act_data_path");
        state.custom_path = Some(path.to_path_buf());
        status(StatusCode::Ok)
    }

    fn set_custom_proxy(&self, address: &str) -> LicenseResult<()> {
        let mut state = self.record("set_custom_proxy");
        state.proxy = Some(address.to_string());
        status(StatusCode::Ok)
    }
}

/// Product identity matching the mock's default product.
pub fn identity() -> ProductIdentity {
    ProductIdentity::new(PathBuf::from("TurboActivate.dat"), GUID).unwrap()
}

/// Product identity for a second product.
pub fn other_identity() -> ProductIdentity {
    ProductIdentity::new(PathBuf::from("Other.dat"), OTHER_GUID).unwrap()
}
