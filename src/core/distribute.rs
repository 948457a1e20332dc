//! Copy built packages to machines and update them there.
//!
//! Packages are only updated: unless the install check is skipped, a
//! package that is not installed on a machine is left alone. A failing
//! machine is recorded and the remaining machines are still processed.

use serde::Serialize;

use crate::build::Artifact;
use crate::error::{Error, RemoteCommandFailedDetails, RemoteUploadFailedDetails, Result};
use crate::runner::{CommandRunner, Invocation};
use crate::ssh::{remote_target, SshOperations};

/// Options for one distribution pass.
#[derive(Debug, Clone)]
pub struct DistributeConfig {
    pub machines: Vec<String>,
    pub skip_check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Updated,
    NothingToInstall,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineUpdate {
    pub machine: String,
    pub status: MachineStatus,
    pub installed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MachineUpdate {
    fn new(machine: &str) -> Self {
        Self {
            machine: machine.to_string(),
            status: MachineStatus::NothingToInstall,
            installed: Vec::new(),
            skipped: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeSummary {
    pub total: u32,
    pub updated: u32,
    pub nothing_to_install: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributeResult {
    pub results: Vec<MachineUpdate>,
    pub summary: DistributeSummary,
}

/// Whether the package is installed on the machine.
///
/// `dpkg-query --status` exits 1 for unknown packages; anything above
/// that is a real failure (including ssh's own 255).
pub fn is_package_installed(
    runner: &dyn CommandRunner,
    ssh: &SshOperations,
    machine: &str,
    package: &str,
) -> Result<bool> {
    let argv = vec![
        "dpkg-query".to_string(),
        "--status".to_string(),
        package.to_string(),
    ];
    let invocation = ssh.ssh(machine, &argv);
    let output = runner.output(&invocation)?;

    match output.exit_code {
        0 => Ok(true),
        1 => Ok(false),
        code => Err(remote_failure(machine, &invocation, code, &output)),
    }
}

pub fn copy_package(
    runner: &dyn CommandRunner,
    ssh: &SshOperations,
    machine: &str,
    artifact: &Artifact,
) -> Result<()> {
    tracing::debug!("Copying {} to {}", artifact.file_name, machine);
    let output = runner.output(&ssh.scp(&artifact.path, machine, &artifact.file_name))?;

    if !output.is_success() {
        return Err(Error::remote_upload_failed(RemoteUploadFailedDetails {
            machine: machine.to_string(),
            local_path: artifact.path.display().to_string(),
            remote_path: remote_target(machine, &artifact.file_name),
            exit_code: output.exit_code,
            stderr: output.error_text(),
        }));
    }
    Ok(())
}

/// Install already copied files on the machine with one `dpkg --install`.
pub fn install_packages(
    runner: &dyn CommandRunner,
    ssh: &SshOperations,
    machine: &str,
    file_names: &[String],
) -> Result<()> {
    let mut argv = vec!["dpkg".to_string(), "--install".to_string()];
    argv.extend(file_names.iter().cloned());
    let invocation = ssh.ssh(machine, &argv);

    tracing::debug!("Running dpkg --install on {}", machine);
    let output = runner.output(&invocation)?;
    if !output.is_success() {
        return Err(remote_failure(machine, &invocation, output.exit_code, &output));
    }
    Ok(())
}

fn remote_failure(
    machine: &str,
    invocation: &Invocation,
    exit_code: i32,
    output: &crate::runner::CommandOutput,
) -> Error {
    Error::remote_command_failed(RemoteCommandFailedDetails {
        machine: machine.to_string(),
        command: invocation.to_string(),
        exit_code,
        stdout: output.stdout.clone(),
        stderr: output.stderr.clone(),
    })
}

fn update_machine(
    runner: &dyn CommandRunner,
    ssh: &SshOperations,
    config: &DistributeConfig,
    machine: &str,
    artifacts: &[Artifact],
    update: &mut MachineUpdate,
) -> Result<()> {
    let mut to_install = Vec::new();

    for artifact in artifacts {
        let name = &artifact.package_name;
        if !config.skip_check {
            tracing::info!("Checking if {} has to be installed on {}", name, machine);
            if !is_package_installed(runner, ssh, machine, name)? {
                tracing::info!("{} is not installed on {}, skipped", name, machine);
                update.skipped.push(name.clone());
                continue;
            }
        }

        tracing::info!("Updating {} on {}", name, machine);
        copy_package(runner, ssh, machine, artifact)?;
        to_install.push(artifact.file_name.clone());
    }

    if to_install.is_empty() {
        tracing::info!("No packages to install on {}", machine);
        return Ok(());
    }

    install_packages(runner, ssh, machine, &to_install)?;
    update.installed = to_install;
    update.status = MachineStatus::Updated;
    Ok(())
}

/// Update `artifacts` on every machine, one machine at a time.
pub fn update_packages(
    runner: &dyn CommandRunner,
    ssh: &SshOperations,
    config: &DistributeConfig,
    artifacts: &[Artifact],
) -> DistributeResult {
    let mut results = Vec::with_capacity(config.machines.len());
    let mut summary = DistributeSummary::default();

    for machine in &config.machines {
        tracing::info!("Updating packages on {}", machine);
        let mut update = MachineUpdate::new(machine);

        if let Err(err) = update_machine(runner, ssh, config, machine, artifacts, &mut update) {
            tracing::error!("Updating {} failed: {} {}", machine, err.message, err.details);
            update.status = MachineStatus::Failed;
            update.installed.clear();
            update.error = Some(err.message);
        }

        summary.total += 1;
        match update.status {
            MachineStatus::Updated => summary.updated += 1,
            MachineStatus::NothingToInstall => summary.nothing_to_install += 1,
            MachineStatus::Failed => summary.failed += 1,
        }
        results.push(update);
    }

    DistributeResult { results, summary }
}
