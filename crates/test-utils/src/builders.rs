#![allow(dead_code)]

use std::path::PathBuf;

use stagehand::config::{RunConfig, ServiceSettings, StageCommands};
use stagehand::types::{DbEngine, Stage, WebFlavour};

/// Builder for `RunConfig` to simplify test setup.
///
/// Defaults describe a run rooted in a scratch workspace that selects no
/// stages at all; tests opt into exactly what they need.
pub struct RunConfigBuilder {
    cfg: RunConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        let workspace = PathBuf::from("/tmp/stagehand-tests");
        Self {
            cfg: RunConfig {
                stages: Vec::new(),
                user_commands: Vec::new(),
                db: DbEngine::Mysql,
                db_dir: None,
                dump_db_postrun: false,
                web: WebFlavour::Builtin,
                base_url: "http://127.0.0.1:4881".to_string(),
                web_port: 4881,
                site_dir: workspace.join("src"),
                log_dir: workspace.join("log"),
                tmp_dir: std::env::temp_dir(),
                workspace,
                repository: None,
                projects: Vec::new(),
                skip_clone: true,
                skip_deps: false,
                skip_install: false,
                dry_run: false,
                ambient_display: None,
                commands: StageCommands::default(),
                services: ServiceSettings::default(),
            },
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        if !self.cfg.stages.contains(&stage) {
            self.cfg.stages.push(stage);
        }
        self
    }

    pub fn stages(mut self, stages: &[Stage]) -> Self {
        for stage in stages {
            self = self.stage(*stage);
        }
        self
    }

    pub fn db(mut self, engine: DbEngine) -> Self {
        self.cfg.db = engine;
        self
    }

    pub fn web(mut self, flavour: WebFlavour) -> Self {
        self.cfg.web = flavour;
        self
    }

    pub fn ambient_display(mut self, display: &str) -> Self {
        self.cfg.ambient_display = Some(display.to_string());
        self
    }

    pub fn user_command(mut self, command: &str) -> Self {
        self.cfg.user_commands.push(command.to_string());
        self
    }

    pub fn skip_install(mut self, val: bool) -> Self {
        self.cfg.skip_install = val;
        self
    }

    pub fn skip_deps(mut self, val: bool) -> Self {
        self.cfg.skip_deps = val;
        self
    }

    pub fn repository(mut self, url: &str) -> Self {
        self.cfg.repository = Some(url.to_string());
        self.cfg.skip_clone = false;
        self
    }

    pub fn build(self) -> RunConfig {
        self.cfg
    }
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
