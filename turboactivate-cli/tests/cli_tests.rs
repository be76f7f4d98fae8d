use clap::Parser;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use turboactivate::{
    check, ActivationMode, DateCheckFlags, DetailsLocator, GenuineOptions, GenuineStatus,
    LicenseResult, LicenseSession, ProductIdentity, SessionOptions, StatusCode, StringQuery,
    TrialFlags, TrialStatus, Verifier, VerifierHandle,
};
use turboactivate_cli::{execute, load_config, status_report, Args, Command};

const GUID: &str = "18324776654b3946fc44a5f3.49025204";
const KEY: &str = "AAAA-BBBB-CCCC";

/// Single-product engine with just enough state for the commands.
#[derive(Default)]
struct FakeVerifier {
    key: RefCell<Option<String>>,
    activated: Cell<bool>,
    trial_days: Cell<Option<u32>>,
    genuine: Cell<Option<StatusCode>>,
}

fn ok() -> LicenseResult<()> {
    check(StatusCode::Ok.raw())
}

fn fail(code: StatusCode) -> LicenseResult<()> {
    check(code.raw())
}

impl Verifier for FakeVerifier {
    fn load_details(&self, _details: &DetailsLocator) -> LicenseResult<()> {
        ok()
    }

    fn get_handle(&self, _version_guid: &str) -> LicenseResult<VerifierHandle> {
        VerifierHandle::new(7)
    }

    fn check_and_save_key(
        &self,
        _h: VerifierHandle,
        key: &str,
        _m: ActivationMode,
    ) -> LicenseResult<()> {
        if key != KEY {
            return fail(StatusCode::ProductKey);
        }
        *self.key.borrow_mut() = Some(key.to_string());
        ok()
    }

    fn is_product_key_valid(&self, _h: VerifierHandle) -> LicenseResult<()> {
        match self.key.borrow().as_deref() {
            Some(KEY) => ok(),
            _ => fail(StatusCode::ProductKey),
        }
    }

    fn activate(&self, _h: VerifierHandle, _extra: Option<&str>) -> LicenseResult<()> {
        if self.key.borrow().is_none() {
            return fail(StatusCode::ProductKey);
        }
        self.activated.set(true);
        ok()
    }

    fn activation_request_to_file(
        &self,
        _h: VerifierHandle,
        path: &Path,
        _extra: Option<&str>,
    ) -> LicenseResult<()> {
        std::fs::write(path, "<ActivationRequest/>")?;
        ok()
    }

    fn activate_from_file(&self, _h: VerifierHandle, _path: &Path) -> LicenseResult<()> {
        self.activated.set(true);
        ok()
    }

    fn deactivate(&self, _h: VerifierHandle, erase_key: bool) -> LicenseResult<()> {
        if erase_key {
            self.key.borrow_mut().take();
        }
        if !self.activated.replace(false) {
            return fail(StatusCode::NotActivated);
        }
        ok()
    }

    fn deactivation_request_to_file(
        &self,
        h: VerifierHandle,
        path: &Path,
        erase_key: bool,
    ) -> LicenseResult<()> {
        std::fs::write(path, "<DeactivationRequest/>")?;
        self.deactivate(h, erase_key)
    }

    fn is_activated(&self, _h: VerifierHandle) -> LicenseResult<()> {
        if self.activated.get() {
            ok()
        } else {
            fail(StatusCode::NotActivated)
        }
    }

    fn is_genuine(&self, h: VerifierHandle) -> LicenseResult<()> {
        match self.genuine.get() {
            Some(code) => fail(code),
            None => self.is_activated(h),
        }
    }

    fn is_genuine_ex(&self, h: VerifierHandle, _options: &GenuineOptions) -> LicenseResult<()> {
        self.is_genuine(h)
    }

    fn use_trial(
        &self,
        _h: VerifierHandle,
        _flags: TrialFlags,
        _extra: Option<&str>,
    ) -> LicenseResult<()> {
        if self.trial_days.get().is_none() {
            self.trial_days.set(Some(14));
        }
        ok()
    }

    fn trial_days_remaining(&self, _h: VerifierHandle, _flags: TrialFlags) -> LicenseResult<u32> {
        match self.trial_days.get() {
            Some(days) => Ok(days),
            None => fail(StatusCode::MustUseTrial).map(|()| 0),
        }
    }

    fn extend_trial(
        &self,
        _h: VerifierHandle,
        _flags: TrialFlags,
        _code: &str,
    ) -> LicenseResult<()> {
        self.trial_days.set(self.trial_days.get().map(|days| days + 10));
        ok()
    }

    fn measure(&self, _h: VerifierHandle, query: StringQuery<'_>) -> LicenseResult<usize> {
        self.value(query).map(|v| v.len() + 1)
    }

    fn fill(
        &self,
        _h: VerifierHandle,
        query: StringQuery<'_>,
        _capacity: usize,
    ) -> LicenseResult<String> {
        self.value(query)
    }

    fn is_date_valid(
        &self,
        _h: VerifierHandle,
        _date: &str,
        _flags: DateCheckFlags,
    ) -> LicenseResult<()> {
        ok()
    }

    fn set_custom_act_data_path(&self, _path: &Path) -> LicenseResult<()> {
        ok()
    }

    fn set_custom_proxy(&self, _address: &str) -> LicenseResult<()> {
        ok()
    }
}

impl FakeVerifier {
    fn value(&self, query: StringQuery<'_>) -> LicenseResult<String> {
        match query {
            StringQuery::ProductKey => match self.key.borrow().clone() {
                Some(key) => Ok(key),
                None => fail(StatusCode::ProductKey).map(|()| String::new()),
            },
            StringQuery::ExtraData => fail(StatusCode::Fail).map(|()| String::new()),
            StringQuery::FeatureValue("edition") => Ok("pro".to_string()),
            StringQuery::FeatureValue(_) => fail(StatusCode::Fail).map(|()| String::new()),
        }
    }
}

fn session(fake: &FakeVerifier) -> LicenseSession<&FakeVerifier> {
    let identity = ProductIdentity::new(PathBuf::from("TurboActivate.dat"), GUID).unwrap();
    LicenseSession::new(fake, identity, SessionOptions::default()).unwrap()
}

fn run(session: &LicenseSession<&FakeVerifier>, command: Command) -> anyhow::Result<String> {
    let mut out = Vec::new();
    execute(session, &command, &GenuineOptions::recommended(), &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

// ── Argument parsing ─────────────────────────────────────────────

#[test]
fn parse_activate_args() {
    let args = Args::try_parse_from([
        "turboactivate",
        "--config",
        "license.toml",
        "activate",
        "--key",
        KEY,
        "--extra",
        "seat-1",
    ])
    .unwrap();
    assert_eq!(args.config, Some(PathBuf::from("license.toml")));
    assert_eq!(
        args.command,
        Command::Activate {
            key: Some(KEY.to_string()),
            extra: Some("seat-1".to_string()),
            request_file: None,
            response_file: None,
        }
    );
}

#[test]
fn parse_extend_trial_and_feature() {
    let args = Args::try_parse_from(["turboactivate", "-v", "extend-trial", "CODE"]).unwrap();
    assert!(args.verbose);
    assert_eq!(args.command, Command::ExtendTrial { code: "CODE".into() });

    let args = Args::try_parse_from(["turboactivate", "feature", "edition"]).unwrap();
    assert_eq!(args.command, Command::Feature { name: "edition".into() });
}

#[test]
fn request_and_response_files_conflict() {
    let result = Args::try_parse_from([
        "turboactivate",
        "activate",
        "--request-file",
        "a.xml",
        "--response-file",
        "b.xml",
    ]);
    assert!(result.is_err());
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn load_config_applies_library_dir_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!("details_path = \"TurboActivate.dat\"\nversion_guid = \"{GUID}\"\n"),
    )
    .unwrap();

    let config = load_config(Some(path.as_path()), Some(Path::new("/opt/lib"))).unwrap();
    assert_eq!(config.library_dir, PathBuf::from("/opt/lib"));
    assert_eq!(config.details_path, dir.path().join("TurboActivate.dat"));
}

#[test]
fn load_config_rejects_empty_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "mode = \"user\"\n").unwrap();
    assert!(load_config(Some(path.as_path()), None).is_err());
}

// ── Commands ─────────────────────────────────────────────────────

#[test]
fn activate_then_status() {
    let fake = FakeVerifier::default();
    let session = session(&fake);

    let out = run(
        &session,
        Command::Activate {
            key: Some(KEY.into()),
            extra: None,
            request_file: None,
            response_file: None,
        },
    )
    .unwrap();
    assert_eq!(out, "activated\n");

    let report = status_report(&session, &GenuineOptions::recommended()).unwrap();
    assert!(report.activated);
    assert!(report.key_valid);
    assert_eq!(report.genuine, Some(GenuineStatus::Genuine));
    assert_eq!(report.trial, None);
}

#[test]
fn activate_without_key_fails() {
    let fake = FakeVerifier::default();
    let session = session(&fake);
    let result = run(
        &session,
        Command::Activate {
            key: None,
            extra: None,
            request_file: None,
            response_file: None,
        },
    );
    assert!(result.is_err());
}

#[test]
fn status_reports_trial_when_not_activated() {
    let fake = FakeVerifier::default();
    let session = session(&fake);

    let report = status_report(&session, &GenuineOptions::recommended()).unwrap();
    assert!(!report.has_key);
    assert_eq!(report.trial, None);

    run(&session, Command::Trial { extra: None }).unwrap();
    let report = status_report(&session, &GenuineOptions::recommended()).unwrap();
    assert_eq!(report.trial, Some(TrialStatus::Remaining(14)));
}

#[test]
fn status_json_output() {
    let fake = FakeVerifier::default();
    let session = session(&fake);
    let out = run(&session, Command::Status { json: true }).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["version_guid"], GUID);
    assert_eq!(value["mode"], "user");
    assert_eq!(value["activated"], false);
}

#[test]
fn grace_period_shows_in_genuine_command() {
    let fake = FakeVerifier::default();
    fake.activated.set(true);
    fake.genuine.set(Some(StatusCode::Inet));
    let session = session(&fake);

    let out = run(&session, Command::Genuine).unwrap();
    assert_eq!(out, "genuine (offline, within grace period)\n");
}

#[test]
fn deactivate_to_request_file_keeps_key() {
    let dir = tempfile::tempdir().unwrap();
    let request = dir.path().join("deactivate.xml");
    let fake = FakeVerifier::default();
    *fake.key.borrow_mut() = Some(KEY.into());
    fake.activated.set(true);
    let session = session(&fake);

    run(
        &session,
        Command::Deactivate {
            keep_key: true,
            request_file: Some(request.clone()),
        },
    )
    .unwrap();
    assert!(request.exists());
    assert!(!fake.activated.get());
    assert_eq!(fake.key.borrow().as_deref(), Some(KEY));
}

#[test]
fn feature_and_extend_trial_commands() {
    let fake = FakeVerifier::default();
    let session = session(&fake);

    assert_eq!(run(&session, Command::Feature { name: "edition".into() }).unwrap(), "pro\n");
    assert_eq!(run(&session, Command::Feature { name: "other".into() }).unwrap(), "\n");

    run(&session, Command::Trial { extra: None }).unwrap();
    let out = run(&session, Command::ExtendTrial { code: "X".into() }).unwrap();
    assert_eq!(out, "trial extended, 24 day(s) left\n");
}
