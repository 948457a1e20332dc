//! Build-then-distribute run over a resolved configuration.

use std::path::PathBuf;

use serde::Serialize;

use crate::build::{self, Artifact};
use crate::config::Configuration;
use crate::distribute::{self, DistributeConfig, DistributeSummary, MachineUpdate};
use crate::error::Result;
use crate::runner::CommandRunner;
use crate::ssh::SshOperations;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub repository_root: PathBuf,
    pub skip_build: bool,
    pub skip_check: bool,
    pub artifacts: Vec<Artifact>,
    pub machines: Vec<MachineUpdate>,
    pub summary: DistributeSummary,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

/// Build (or find) all packages, then update them on every machine.
///
/// Build errors abort before any machine is touched; machine errors are
/// part of the report.
pub fn run(runner: &dyn CommandRunner, config: &Configuration) -> Result<RunReport> {
    let artifacts = build::collect_artifacts(runner, config)?;

    let ssh = SshOperations::new(config.ssh_config.clone());
    let distribute_config = DistributeConfig {
        machines: config.machines.clone(),
        skip_check: config.skip_check,
    };
    let outcome = distribute::update_packages(runner, &ssh, &distribute_config, &artifacts);

    Ok(RunReport {
        repository_root: config.repository_root().to_path_buf(),
        skip_build: config.skip_build,
        skip_check: config.skip_check,
        artifacts,
        machines: outcome.results,
        summary: outcome.summary,
    })
}
