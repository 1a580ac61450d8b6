// src/config/model.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::cli::CliArgs;
use crate::errors::{Result, StagehandError};
use crate::types::{DbEngine, Stage, WebFlavour};

/// Top-level configuration as read from a `Stagehand.toml` file.
///
/// ```toml
/// [project]
/// repository = "https://example.org/site.git"
/// projects = ["https://example.org/plugin-foo.git"]
///
/// [commands]
/// unit = "composer phpunit -- --testsuite unit"
///
/// [services]
/// web_port = 4881
/// ```
///
/// All sections are optional and have reasonable defaults; CLI flags win
/// over file values where both exist.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagehandToml {
    /// Sources to clone and workspace layout, from `[project]`.
    #[serde(default)]
    pub project: ProjectSection,

    /// Per-stage and install commands, from `[commands]`.
    #[serde(default)]
    pub commands: StageCommands,

    /// Backing-service settings, from `[services]`.
    #[serde(default)]
    pub services: ServiceSettings,
}

/// `[project]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectSection {
    /// Repository cloned into the site directory itself.
    #[serde(default)]
    pub repository: Option<String>,

    /// Extra repositories cloned next to the site sources. Merged with the
    /// positional PROJECT arguments from the CLI.
    #[serde(default)]
    pub projects: Vec<String>,

    /// Site directory, relative to the workspace.
    #[serde(default = "default_site_dir")]
    pub site_dir: String,
}

fn default_site_dir() -> String {
    "src".to_string()
}

/// `[commands]` section: the unit of work behind each stage.
///
/// These are opaque shell commands run in the site directory; stagehand only
/// cares about their exit status.
#[derive(Debug, Clone, Deserialize)]
pub struct StageCommands {
    #[serde(default = "default_unit_cmd")]
    pub unit: String,

    #[serde(default = "default_databaseless_cmd")]
    pub databaseless: String,

    #[serde(default = "default_database_cmd")]
    pub database: String,

    #[serde(default = "default_lint_cmd")]
    pub lint: String,

    #[serde(default = "default_api_cmd")]
    pub api: String,

    #[serde(default = "default_browser_cmd")]
    pub browser: String,

    /// PHP-level dependency installation, run before the unit stage.
    #[serde(default = "default_install_php_deps_cmd")]
    pub install_php_deps: String,

    /// JS-level dependency installation, run after the site install.
    #[serde(default = "default_install_js_deps_cmd")]
    pub install_js_deps: String,

    /// Site installer; receives the database and web descriptors via its
    /// environment (`DB_BACKEND`, `DB_SOCKET`/`DB_PATH`, `BASE_URL`).
    #[serde(default = "default_install_site_cmd")]
    pub install_site: String,
}

fn default_unit_cmd() -> String {
    "composer phpunit -- --testsuite unit".to_string()
}

fn default_databaseless_cmd() -> String {
    "composer phpunit -- --exclude-group database".to_string()
}

fn default_database_cmd() -> String {
    "composer phpunit -- --group database".to_string()
}

fn default_lint_cmd() -> String {
    "npm test".to_string()
}

fn default_api_cmd() -> String {
    "npm run api-testing".to_string()
}

fn default_browser_cmd() -> String {
    "npm run browser-test".to_string()
}

fn default_install_php_deps_cmd() -> String {
    "composer install --no-interaction --no-progress".to_string()
}

fn default_install_js_deps_cmd() -> String {
    "npm ci".to_string()
}

fn default_install_site_cmd() -> String {
    "php maintenance/install.php".to_string()
}

impl Default for StageCommands {
    fn default() -> Self {
        Self {
            unit: default_unit_cmd(),
            databaseless: default_databaseless_cmd(),
            database: default_database_cmd(),
            lint: default_lint_cmd(),
            api: default_api_cmd(),
            browser: default_browser_cmd(),
            install_php_deps: default_install_php_deps_cmd(),
            install_js_deps: default_install_js_deps_cmd(),
            install_site: default_install_site_cmd(),
        }
    }
}

impl StageCommands {
    /// The shell command backing a stage.
    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::Unit => &self.unit,
            Stage::Databaseless => &self.databaseless,
            Stage::Database => &self.database,
            Stage::Lint => &self.lint,
            Stage::Api => &self.api,
            Stage::Browser => &self.browser,
        }
    }
}

/// `[services]` section: binaries, ports and identifiers for the backends.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_mysqld")]
    pub mysqld: String,

    #[serde(default = "default_mysql_install_db")]
    pub mysql_install_db: String,

    #[serde(default = "default_mysql_client")]
    pub mysql_client: String,

    #[serde(default = "default_mysqldump")]
    pub mysqldump: String,

    #[serde(default = "default_db_user")]
    pub db_user: String,

    #[serde(default = "default_db_password")]
    pub db_password: String,

    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_php")]
    pub php: String,

    /// Optional router script passed to the built-in web server, relative to
    /// the site directory.
    #[serde(default)]
    pub router: Option<String>,

    #[serde(default = "default_web_host")]
    pub web_host: String,

    #[serde(default = "default_chromedriver")]
    pub chromedriver: String,

    #[serde(default = "default_chromedriver_port")]
    pub chromedriver_port: u16,

    #[serde(default = "default_url_base")]
    pub url_base: String,

    #[serde(default = "default_xvfb")]
    pub xvfb: String,

    #[serde(default = "default_xvfb_display")]
    pub xvfb_display: String,

    #[serde(default = "default_xvfb_screen")]
    pub xvfb_screen: String,

    /// Maximum seconds to wait for any backend to become ready.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

fn default_mysqld() -> String {
    "mysqld".to_string()
}

fn default_mysql_install_db() -> String {
    "mysql_install_db".to_string()
}

fn default_mysql_client() -> String {
    "mysql".to_string()
}

fn default_mysqldump() -> String {
    "mysqldump".to_string()
}

fn default_db_user() -> String {
    "testuser".to_string()
}

fn default_db_password() -> String {
    "testpass".to_string()
}

fn default_db_name() -> String {
    "testdb".to_string()
}

fn default_php() -> String {
    "php".to_string()
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_chromedriver() -> String {
    "chromedriver".to_string()
}

fn default_chromedriver_port() -> u16 {
    4444
}

fn default_url_base() -> String {
    "/wd/hub".to_string()
}

fn default_xvfb() -> String {
    "Xvfb".to_string()
}

fn default_xvfb_display() -> String {
    ":94".to_string()
}

fn default_xvfb_screen() -> String {
    "1280x1024x24".to_string()
}

fn default_ready_timeout_secs() -> u64 {
    60
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            mysqld: default_mysqld(),
            mysql_install_db: default_mysql_install_db(),
            mysql_client: default_mysql_client(),
            mysqldump: default_mysqldump(),
            db_user: default_db_user(),
            db_password: default_db_password(),
            db_name: default_db_name(),
            php: default_php(),
            router: None,
            web_host: default_web_host(),
            chromedriver: default_chromedriver(),
            chromedriver_port: default_chromedriver_port(),
            url_base: default_url_base(),
            xvfb: default_xvfb(),
            xvfb_display: default_xvfb_display(),
            xvfb_screen: default_xvfb_screen(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

/// Fully-resolved configuration for one run.
///
/// Everything downstream of config loading reads from this struct; the
/// ambient process environment is captured into it exactly once (see
/// `ambient_display`) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stages selected for this run, deduplicated.
    pub stages: Vec<Stage>,

    /// User-supplied commands replacing the built-in stages.
    pub user_commands: Vec<String>,

    pub db: DbEngine,
    pub db_dir: Option<PathBuf>,
    pub dump_db_postrun: bool,

    pub web: WebFlavour,
    /// Base URL of the site: `--web-url` for external, computed from
    /// host/port for builtin.
    pub base_url: String,
    pub web_port: u16,

    pub workspace: PathBuf,
    pub site_dir: PathBuf,
    pub log_dir: PathBuf,
    pub tmp_dir: PathBuf,

    /// Repository cloned into the site directory, if any.
    pub repository: Option<String>,
    /// Extra repositories cloned next to the site sources.
    pub projects: Vec<String>,

    pub skip_clone: bool,
    pub skip_deps: bool,
    pub skip_install: bool,
    pub dry_run: bool,

    /// `DISPLAY` captured from the environment at startup; `None` means a
    /// display server must be provisioned for browser stages.
    pub ambient_display: Option<String>,

    pub commands: StageCommands,
    pub services: ServiceSettings,
}

impl RunConfig {
    /// Merge CLI arguments and the optional config file into a resolved
    /// configuration.
    pub fn resolve(
        args: &CliArgs,
        file: StagehandToml,
        ambient_display: Option<String>,
    ) -> Result<Self> {
        let stages = stages_to_run(&args.run, &args.skip, &args.commands)?;

        let workspace = match &args.workspace {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir()?,
        };
        let site_dir = workspace.join(&file.project.site_dir);
        let log_dir = resolve_against(&workspace, &args.log_dir);
        let tmp_dir = std::env::temp_dir();

        let db_dir = args
            .db_dir
            .as_ref()
            .map(|dir| resolve_against(&workspace, dir));

        let base_url = match (args.web_backend, &args.web_url) {
            (_, Some(url)) => url.trim_end_matches('/').to_string(),
            (WebFlavour::Builtin, None) => {
                format!("http://{}:{}", file.services.web_host, args.web_port)
            }
            (WebFlavour::External, None) => String::new(),
        };

        let mut projects = file.project.projects.clone();
        projects.extend(args.projects.iter().cloned());

        Ok(Self {
            stages,
            user_commands: args.commands.clone(),
            db: args.db,
            db_dir,
            dump_db_postrun: args.dump_db_postrun,
            web: args.web_backend,
            base_url,
            web_port: args.web_port,
            workspace,
            site_dir,
            log_dir,
            tmp_dir,
            repository: file.project.repository.clone(),
            projects,
            skip_clone: args.skip_clone,
            skip_deps: args.skip_deps,
            skip_install: args.skip_install,
            dry_run: args.dry_run,
            ambient_display,
            commands: file.commands,
            services: file.services,
        })
    }

    /// Whether any selected work needs an installed site (and therefore a
    /// provisioned database).
    pub fn needs_installed_site(&self) -> bool {
        !self.user_commands.is_empty()
            || self.stages.iter().any(|s| s.needs_installed_site())
    }

    /// Whether any selected work needs a reachable web server.
    pub fn needs_web(&self) -> bool {
        !self.user_commands.is_empty() || self.stages.iter().any(|s| s.needs_web())
    }

    /// Whether any selected work needs a browser driver and display.
    pub fn needs_browser(&self) -> bool {
        self.stages.iter().any(|s| s.needs_browser())
    }

    /// Environment passed explicitly to every spawned step command.
    pub fn step_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("WORKSPACE".to_string(), path_str(&self.workspace));
        env.insert("SITE_DIR".to_string(), path_str(&self.site_dir));
        env.insert("LOG_DIR".to_string(), path_str(&self.log_dir));
        env.insert("TMPDIR".to_string(), path_str(&self.tmp_dir));
        env
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn resolve_against(workspace: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        workspace.join(path)
    }
}

/// Compute the stage set for a run from `--run` / `--skip` / `-c`.
///
/// - Explicit user commands replace the built-in stages entirely.
/// - `--skip all` clears everything.
/// - `--run all` (the default) selects every known stage minus `--skip`.
/// - An explicit `--run` list wins as given.
fn stages_to_run(run: &[String], skip: &[String], commands: &[String]) -> Result<Vec<Stage>> {
    let skip_all = skip.iter().any(|s| s == "all");
    if !commands.is_empty() || skip_all {
        return Ok(Vec::new());
    }

    let skipped = parse_stage_list(skip)?;

    if run.iter().any(|s| s == "all") {
        let stages = Stage::ALL
            .into_iter()
            .filter(|s| !skipped.contains(s))
            .collect();
        return Ok(stages);
    }

    parse_stage_list(run)
}

fn parse_stage_list(names: &[String]) -> Result<Vec<Stage>> {
    let mut stages = Vec::new();
    for name in names {
        let stage = Stage::from_str(name).map_err(StagehandError::Config)?;
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn run_all_selects_every_stage() {
        let stages = stages_to_run(&strs(&["all"]), &[], &[]).unwrap();
        assert_eq!(stages, Stage::ALL.to_vec());
    }

    #[test]
    fn skip_filters_the_default_set() {
        let stages = stages_to_run(&strs(&["all"]), &strs(&["browser", "api"]), &[]).unwrap();
        assert!(!stages.contains(&Stage::Browser));
        assert!(!stages.contains(&Stage::Api));
        assert!(stages.contains(&Stage::Unit));
    }

    #[test]
    fn explicit_run_list_wins() {
        let stages = stages_to_run(&strs(&["unit", "lint"]), &strs(&["lint"]), &[]).unwrap();
        assert_eq!(stages, vec![Stage::Unit, Stage::Lint]);
    }

    #[test]
    fn skip_all_clears_everything() {
        let stages = stages_to_run(&strs(&["all"]), &strs(&["all"]), &[]).unwrap();
        assert!(stages.is_empty());
    }

    #[test]
    fn user_commands_replace_stages() {
        let stages = stages_to_run(&strs(&["all"]), &[], &strs(&["true"])).unwrap();
        assert!(stages.is_empty());
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err = stages_to_run(&strs(&["qunit"]), &[], &[]);
        assert!(err.is_err());
    }
}
