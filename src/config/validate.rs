// src/config/validate.rs

use crate::config::model::RunConfig;
use crate::errors::{Result, StagehandError};
use crate::types::WebFlavour;

/// Semantic checks on the merged configuration.
///
/// Stage-name validation already happened while resolving; this covers the
/// cross-field constraints.
pub fn validate(cfg: &RunConfig) -> Result<()> {
    ensure_external_web_has_url(cfg)?;
    ensure_ports_distinct(cfg)?;
    ensure_ready_timeout(cfg)?;
    Ok(())
}

fn ensure_external_web_has_url(cfg: &RunConfig) -> Result<()> {
    if cfg.web == WebFlavour::External && cfg.base_url.is_empty() && cfg.needs_web() {
        return Err(StagehandError::Config(
            "--web-backend external requires --web-url".to_string(),
        ));
    }
    Ok(())
}

fn ensure_ports_distinct(cfg: &RunConfig) -> Result<()> {
    if cfg.needs_browser() && cfg.services.chromedriver_port == cfg.web_port {
        return Err(StagehandError::Config(format!(
            "web server and browser driver cannot share port {}",
            cfg.web_port
        )));
    }
    Ok(())
}

fn ensure_ready_timeout(cfg: &RunConfig) -> Result<()> {
    if cfg.services.ready_timeout_secs == 0 {
        return Err(StagehandError::Config(
            "[services].ready_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliArgs;
    use crate::config::model::StagehandToml;
    use clap::Parser;

    fn resolved(argv: &[&str]) -> RunConfig {
        let mut full = vec!["stagehand"];
        full.extend_from_slice(argv);
        let args = CliArgs::parse_from(full);
        RunConfig::resolve(&args, StagehandToml::default(), None).unwrap()
    }

    #[test]
    fn external_web_without_url_is_rejected() {
        let cfg = resolved(&["--web-backend", "external", "--run", "api"]);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn external_web_with_url_passes() {
        let cfg = resolved(&[
            "--web-backend",
            "external",
            "--web-url",
            "http://127.0.0.1:8080",
            "--run",
            "api",
        ]);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn shared_port_is_rejected_for_browser_runs() {
        let cfg = resolved(&["--web-port", "4444", "--run", "browser"]);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn shared_port_is_fine_without_browser_stage() {
        let cfg = resolved(&["--web-port", "4444", "--run", "unit"]);
        assert!(validate(&cfg).is_ok());
    }
}
