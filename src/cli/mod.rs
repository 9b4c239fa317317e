//! Command-line interface for gitsync
//!
//! Long flags take one dash or two: `-config path`, `-config=path` and
//! `--config path` are the same. Everything after `--` is left as given.

use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

pub mod commands;
mod output;

pub use output::Output;

use crate::config::{Settings, SettingsOverrides};

/// Long flags that may also be written with a single dash.
const LONG_FLAGS: &[&str] = &[
    "config",
    "version",
    "debug",
    "insecure",
    "repodir",
    "keep-going",
    "help",
];

/// Long flags whose value may be the next argument.
const VALUE_FLAGS: &[&str] = &["config", "repodir"];

/// gitsync - mirror branches from a source remote to a target remote
#[derive(Parser, Debug)]
#[command(
    name = "gitsync",
    about = "Mirror git branches from a source remote to a target remote",
    long_about = "For every branch listed in the sync file, gitsync checks the branch out, \
                  fast-forwards it from the source remote and pushes it to the target remote. \
                  Run it on a dedicated mirror checkout, never on a tree you are working in.",
    disable_version_flag = true
)]
pub struct Cli {
    /// Config file path [default: .gitsync.conf]
    #[arg(long, value_name = "FILE", allow_hyphen_values = true)]
    pub config: Option<PathBuf>,

    /// Print version and build information and exit
    #[arg(long)]
    pub version: bool,

    /// Print debug information to stdout
    #[arg(long)]
    pub debug: bool,

    /// Allow reading an insecure config file
    #[arg(long)]
    pub insecure: bool,

    /// Path to the git repository checkout you want to sync [default: current directory]
    #[arg(long, value_name = "DIR", allow_hyphen_values = true)]
    pub repodir: Option<PathBuf>,

    /// Keep syncing the remaining branches after a failure, then exit with an error
    #[arg(long)]
    pub keep_going: bool,
}

impl Cli {
    /// Parse the process arguments, accepting single-dash long flags.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Flags given on the command line, for the settings layer.
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            config: self.config.clone(),
            repodir: self.repodir.clone(),
            debug: self.debug.then_some(true),
            insecure: self.insecure.then_some(true),
            keep_going: self.keep_going.then_some(true),
        }
    }

    pub fn run(self) -> Result<()> {
        if self.version {
            commands::version::execute(&Output::new(self.debug));
            return Ok(());
        }

        let settings = Settings::resolve(&self.overrides());
        let debug = settings.as_ref().map_or(self.debug, |s| s.debug);
        setup_logging(debug);
        let settings = settings?;

        commands::sync::execute(&settings, &Output::new(settings.debug))
    }
}

/// Rewrite `-flag` and `-flag=value` to `--flag` for the known long flags.
///
/// The value following `-config` or `-repodir` and every argument after `--`
/// pass through untouched.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut value_pending = false;
    let mut positional_only = false;

    for arg in args {
        if positional_only || std::mem::take(&mut value_pending) {
            normalized.push(arg);
            continue;
        }

        let Some(text) = arg.to_str().map(str::to_owned) else {
            normalized.push(arg);
            continue;
        };
        if text == "--" {
            positional_only = true;
            normalized.push(arg);
            continue;
        }

        match split_long_flag(&text) {
            Some((name, single_dash)) => {
                value_pending = VALUE_FLAGS.contains(&name) && !text.contains('=');
                if single_dash {
                    normalized.push(OsString::from(format!("-{text}")));
                } else {
                    normalized.push(arg);
                }
            }
            None => normalized.push(arg),
        }
    }

    normalized
}

/// Name of a known long flag and whether it was written with a single dash.
fn split_long_flag(text: &str) -> Option<(&str, bool)> {
    let (rest, single_dash) = match text.strip_prefix("--") {
        Some(rest) => (rest, false),
        None => (text.strip_prefix('-')?, true),
    };
    let name = rest.split('=').next().unwrap_or(rest);
    LONG_FLAGS
        .iter()
        .find(|flag| **flag == name)
        .map(|flag| (*flag, single_dash))
}

fn setup_logging(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            tracing_subscriber::EnvFilter::new("debug")
        } else {
            tracing_subscriber::EnvFilter::new("info")
        }
    });

    // Already installed when called twice in one process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stdout)
        .try_init();
}
