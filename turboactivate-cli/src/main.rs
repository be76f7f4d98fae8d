//! TurboActivate licensing CLI
//!
//! Usage:
//!   turboactivate --config license.toml status
//!   turboactivate activate --key XXXX-XXXX-XXXX
//!
//! The native library is loaded from `library_dir` in the config file, the
//! `TURBOACTIVATE_LIBRARY_DIR` environment variable, or `--library-dir`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use turboactivate::{set_custom_data_path, set_custom_proxy, LicenseSession, NativeVerifier};
use turboactivate_cli::{execute, load_config, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref(), args.library_dir.as_deref())?;
    let verifier = NativeVerifier::load(&config.library_dir).with_context(|| {
        format!(
            "failed to load the native library from {}",
            config.library_dir.display()
        )
    })?;

    if let Some(path) = &config.custom_data_path {
        set_custom_data_path(&verifier, path)?;
    }
    if let Some(proxy) = &config.proxy {
        let proxy = set_custom_proxy(&verifier, proxy)?;
        info!(host = proxy.host(), port = proxy.port(), "using proxy");
    }

    let genuine = config.genuine.to_options()?;
    let session =
        LicenseSession::new(verifier, config.product_identity()?, config.session_options())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&session, &args.command, &genuine, &mut out)?;
    out.flush()?;
    Ok(())
}
