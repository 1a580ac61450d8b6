// src/types.rs

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// A test stage that can be selected with `--run` / `--skip`.
///
/// Stages map onto plan steps; their position in the plan is fixed by the
/// plan builder, not by the order they were selected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Unit tests; need neither an installed site nor a database.
    Unit,
    /// Test suite slice that runs against an installed site but no database.
    Databaseless,
    /// Static checks (linters etc.); need an installed site.
    Lint,
    /// HTTP API tests; need a running web server.
    Api,
    /// Browser tests; need a web server, a browser driver and a display.
    Browser,
    /// Database-backed test suite slice; runs last.
    Database,
}

impl Stage {
    /// All known stages, in canonical order.
    pub const ALL: [Stage; 6] = [
        Stage::Unit,
        Stage::Databaseless,
        Stage::Lint,
        Stage::Api,
        Stage::Browser,
        Stage::Database,
    ];

    /// Whether this stage needs the site installed (and therefore a
    /// provisioned database backend).
    pub fn needs_installed_site(self) -> bool {
        !matches!(self, Stage::Unit)
    }

    /// Whether this stage needs a reachable web server.
    pub fn needs_web(self) -> bool {
        matches!(self, Stage::Api | Stage::Browser)
    }

    /// Whether this stage needs a browser driver (and a display).
    pub fn needs_browser(self) -> bool {
        matches!(self, Stage::Browser)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Unit => "unit",
            Stage::Databaseless => "databaseless",
            Stage::Lint => "lint",
            Stage::Api => "api",
            Stage::Browser => "browser",
            Stage::Database => "database",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unit" => Ok(Stage::Unit),
            "databaseless" => Ok(Stage::Databaseless),
            "lint" => Ok(Stage::Lint),
            "api" => Ok(Stage::Api),
            "browser" => Ok(Stage::Browser),
            "database" => Ok(Stage::Database),
            other => Err(format!(
                "unknown stage: {other} (expected one of unit, databaseless, lint, api, browser, database, or \"all\")"
            )),
        }
    }
}

/// Database engine to provision for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    /// An ephemeral `mysqld` listening on a unix socket in a temp datadir.
    Mysql,
    /// An embedded file-based store; nothing to start.
    Sqlite,
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEngine::Mysql => f.write_str("mysql"),
            DbEngine::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// How the site is served during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebFlavour {
    /// Spawn the dev web server as a supervised backend.
    Builtin,
    /// Assume an already-running server reachable at `--web-url`.
    External,
}

impl fmt::Display for WebFlavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebFlavour::Builtin => f.write_str("builtin"),
            WebFlavour::External => f.write_str("external"),
        }
    }
}
