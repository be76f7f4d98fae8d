//! Commands for the `turboactivate` CLI.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use turboactivate::{
    ActivationMode, GenuineOptions, GenuineStatus, LicenseConfig, LicenseSession, TrialStatus,
    TurboActivateError, Verifier,
};

#[derive(Parser, Debug)]
#[command(name = "turboactivate")]
#[command(about = "Activate, verify and inspect TurboActivate licenses")]
pub struct Args {
    /// Path to the license config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the native library (overrides the config file)
    #[arg(long)]
    pub library_dir: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show key, activation, genuine and trial status
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start or resume the trial and print the days left
    Trial {
        /// Extra data to attach to the trial
        #[arg(long)]
        extra: Option<String>,
    },
    /// Save a product key and activate
    Activate {
        /// Product key to save before activating
        #[arg(short, long)]
        key: Option<String>,

        /// Extra data to attach to the activation
        #[arg(long)]
        extra: Option<String>,

        /// Write an offline activation request instead of going online
        #[arg(long, conflicts_with = "response_file")]
        request_file: Option<PathBuf>,

        /// Activate from an offline activation response
        #[arg(long)]
        response_file: Option<PathBuf>,
    },
    /// Deactivate this computer
    Deactivate {
        /// Keep the product key for a later reactivation
        #[arg(long)]
        keep_key: bool,

        /// Write an offline deactivation request instead of going online
        #[arg(long)]
        request_file: Option<PathBuf>,
    },
    /// Run a genuine check with the configured options
    Genuine,
    /// Print a license feature value
    Feature {
        /// Feature name
        name: String,
    },
    /// Extend the trial with an extension code
    ExtendTrial {
        /// Trial extension code
        code: String,
    },
}

/// Snapshot printed by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub version_guid: String,
    pub mode: ActivationMode,
    pub has_key: bool,
    pub key_valid: bool,
    pub activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genuine: Option<GenuineStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genuine_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial: Option<TrialStatus>,
}

/// `<config dir>/turboactivate/config.toml`, if the platform has a config dir.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("turboactivate").join("config.toml"))
}

/// Loads the config from `path` (or the default location) and applies the
/// library directory override.
pub fn load_config(path: Option<&Path>, library_dir: Option<&Path>) -> Result<LicenseConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().context("no config path given and no config directory")?,
    };
    debug!(path = %path.display(), "loading config");

    let mut config = LicenseConfig::from_file(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Some(dir) = library_dir {
        config.library_dir = dir.to_path_buf();
    }
    config.validate().context("invalid config")?;
    Ok(config)
}

/// Collects the status report. Genuine checks run only for activated
/// products; the trial is reported only for products that are not.
pub fn status_report<V: Verifier>(
    session: &LicenseSession<V>,
    genuine: &GenuineOptions,
) -> Result<StatusReport> {
    let has_key = session.product_key()?.is_some();
    let activated = session.is_activated();

    let (genuine, genuine_error) = if activated {
        match session.is_genuine(Some(genuine)) {
            Ok(status) => (Some(status), None),
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        (None, None)
    };

    let trial = if activated {
        None
    } else {
        match session.trial_status() {
            Ok(status) => Some(status),
            Err(TurboActivateError::MustUseTrial) => None,
            Err(e) => return Err(e.into()),
        }
    };

    Ok(StatusReport {
        version_guid: session.identity().version_guid().to_string(),
        mode: session.mode(),
        has_key,
        key_valid: has_key && session.is_product_key_valid(),
        activated,
        genuine,
        genuine_error,
        trial,
    })
}

/// Runs one command against a bound session, writing human output to `out`.
pub fn execute<V: Verifier>(
    session: &LicenseSession<V>,
    command: &Command,
    genuine: &GenuineOptions,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Status { json } => {
            let report = status_report(session, genuine)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                write_report(&report, out)?;
            }
        }
        Command::Trial { extra } => {
            session.use_trial(extra.as_deref())?;
            match session.trial_status()? {
                TrialStatus::Remaining(days) => writeln!(out, "trial active, {days} day(s) left")?,
                TrialStatus::Exhausted => writeln!(out, "trial expired")?,
            }
        }
        Command::Activate {
            key,
            extra,
            request_file,
            response_file,
        } => {
            if let Some(key) = key {
                session.set_product_key(key)?;
            }
            if let Some(path) = response_file {
                session.activate_from_file(path)?;
                writeln!(out, "activated from {}", path.display())?;
            } else if let Some(path) = request_file {
                if session.activation_request_to_file(path, extra.as_deref())? {
                    writeln!(out, "activation request written to {}", path.display())?;
                } else {
                    writeln!(out, "already activated")?;
                }
            } else {
                if session.product_key()?.is_none() {
                    bail!("no product key stored; pass --key");
                }
                if session.activate(extra.as_deref())? {
                    writeln!(out, "activated")?;
                } else {
                    writeln!(out, "already activated")?;
                }
            }
        }
        Command::Deactivate {
            keep_key,
            request_file,
        } => {
            match request_file {
                Some(path) => {
                    session.deactivate_to_file(path, !keep_key)?;
                    writeln!(out, "deactivation request written to {}", path.display())?;
                }
                None => {
                    session.deactivate(!keep_key)?;
                    writeln!(out, "deactivated")?;
                }
            }
        }
        Command::Genuine => {
            let status = session.is_genuine(Some(genuine))?;
            writeln!(out, "{}", describe_genuine(status))?;
        }
        Command::Feature { name } => {
            writeln!(out, "{}", session.get_feature_value(name)?)?;
        }
        Command::ExtendTrial { code } => {
            session.extend_trial(code)?;
            writeln!(out, "trial extended, {} day(s) left", session.trial_days_remaining()?)?;
        }
    }
    Ok(())
}

fn describe_genuine(status: GenuineStatus) -> &'static str {
    match status {
        GenuineStatus::Genuine => "genuine",
        GenuineStatus::FeaturesChanged => "genuine (license features changed)",
        GenuineStatus::GraceDegraded { .. } => "genuine (offline, within grace period)",
    }
}

fn write_report(report: &StatusReport, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "product:   {}", report.version_guid)?;
    writeln!(out, "mode:      {}", report.mode)?;
    let key = match (report.has_key, report.key_valid) {
        (false, _) => "none",
        (true, true) => "valid",
        (true, false) => "invalid",
    };
    writeln!(out, "key:       {key}")?;
    writeln!(out, "activated: {}", if report.activated { "yes" } else { "no" })?;
    if let Some(status) = report.genuine {
        writeln!(out, "genuine:   {}", describe_genuine(status))?;
    }
    if let Some(err) = &report.genuine_error {
        writeln!(out, "genuine:   no ({err})")?;
    }
    match report.trial {
        Some(TrialStatus::Remaining(days)) => writeln!(out, "trial:     {days} day(s) left")?,
        Some(TrialStatus::Exhausted) => writeln!(out, "trial:     expired")?,
        None => {}
    }
    Ok(())
}
