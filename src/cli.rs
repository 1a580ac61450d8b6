// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, ValueEnum};

use crate::types::{DbEngine, WebFlavour};

/// Command-line arguments for `stagehand`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stagehand",
    version,
    about = "Provision ephemeral backing services and run staged test plans against them.",
    long_about = None
)]
pub struct CliArgs {
    /// Stages to run, comma separated. "all" selects every known stage.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "all",
        value_name = "STAGE[,STAGE...]"
    )]
    pub run: Vec<String>,

    /// Stages to skip, comma separated. "all" skips every stage.
    #[arg(long, value_delimiter = ',', value_name = "STAGE[,STAGE...]")]
    pub skip: Vec<String>,

    /// Run COMMAND in the site directory instead of the built-in stages.
    /// May be given multiple times.
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    pub commands: Vec<String>,

    /// Database backend to provision.
    #[arg(long, value_enum, default_value_t = DbEngine::Mysql)]
    pub db: DbEngine,

    /// Base directory holding database files. A sub directory prefixed with
    /// "stagehand-" is created there and deleted on completion.
    /// If relative, resolved against the workspace. Default: system temp dir.
    #[arg(long, value_name = "PATH")]
    pub db_dir: Option<String>,

    /// Dump the database into the log directory before teardown (mysql only).
    #[arg(long)]
    pub dump_db_postrun: bool,

    /// Web server to use. "builtin" spawns the dev server; "external" assumes
    /// the site is already reachable at --web-url.
    #[arg(long, value_enum, default_value_t = WebFlavour::Builtin)]
    pub web_backend: WebFlavour,

    /// Base URL where the site can be accessed. Required with
    /// `--web-backend external`; computed from --web-port otherwise.
    #[arg(long, value_name = "URL")]
    pub web_url: Option<String>,

    /// Port for the built-in web server.
    #[arg(long, default_value_t = 4881, value_name = "PORT")]
    pub web_port: u16,

    /// Base path to work from. Default: current working directory.
    #[arg(long, value_name = "PATH")]
    pub workspace: Option<String>,

    /// Where logs and artifacts are written. If relative, resolved against
    /// the workspace.
    #[arg(long, default_value = "log", value_name = "PATH")]
    pub log_dir: String,

    /// Do not clone/checkout sources into the workspace.
    #[arg(long)]
    pub skip_clone: bool,

    /// Do not install project dependencies.
    #[arg(long)]
    pub skip_deps: bool,

    /// Do not install the site (implies no database backend is started).
    #[arg(long)]
    pub skip_install: bool,

    /// Path to an optional config file (TOML) with project settings.
    #[arg(long, value_name = "PATH", default_value = "Stagehand.toml")]
    pub config: String,

    /// Log the planned steps and exit without executing any of them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGEHAND_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Extra repositories to clone into the workspace.
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
