//! Run configuration, resolved once from CLI input and then read-only.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::repo;

/// A named group of machines, as they are known to the ssh config.
#[derive(Debug, Clone, Copy)]
pub struct MachineSet {
    pub name: &'static str,
    pub machines: &'static [&'static str],
}

pub const MACHINE_SETS: &[MachineSet] = &[MachineSet {
    name: "single",
    machines: &["bsbt1"],
}];

const SET_PREFIX: char = '@';

pub fn machine_set(name: &str) -> Option<&'static MachineSet> {
    MACHINE_SETS.iter().find(|set| set.name == name)
}

pub fn machine_set_names() -> Vec<String> {
    MACHINE_SETS.iter().map(|set| set.name.to_string()).collect()
}

/// One `name: host,host` line per predefined set, for `--help`.
pub fn describe_machine_sets() -> String {
    MACHINE_SETS
        .iter()
        .map(|set| format!("{}: {}", set.name, set.machines.join(",")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn a machine spec into hostnames, each prefixed with `prefix`.
///
/// `@name` must name a predefined set. A bare predefined set name also
/// resolves to the set. Anything else is a comma separated host list.
pub fn resolve_machines(spec: &str, prefix: &str) -> Result<Vec<String>> {
    let spec = spec.trim();

    let hosts: Vec<String> = if let Some(name) = spec.strip_prefix(SET_PREFIX) {
        let set = machine_set(name)
            .ok_or_else(|| Error::machine_set_not_found(name, machine_set_names()))?;
        set.machines.iter().map(|m| m.to_string()).collect()
    } else if let Some(set) = machine_set(spec) {
        set.machines.iter().map(|m| m.to_string()).collect()
    } else {
        let hosts: Vec<String> = spec.split(',').map(|h| h.trim().to_string()).collect();
        if hosts.iter().any(|h| h.is_empty()) {
            return Err(Error::validation_invalid_argument(
                "machines",
                format!("Machine list '{}' contains an empty entry", spec),
                Some(spec.to_string()),
            ));
        }
        hosts
    };

    Ok(hosts
        .into_iter()
        .map(|host| format!("{}{}", prefix, host))
        .collect())
}

/// Where and with what image packages are built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTarget {
    pub repository_root: PathBuf,
    pub docker_image: String,
}

impl BuildTarget {
    pub fn resolve(
        docker_image: Option<String>,
        repository_root: Option<String>,
        cwd: &Path,
    ) -> Result<Self> {
        let docker_image = non_empty(docker_image).ok_or_else(|| {
            Error::validation_missing_argument(vec!["docker-image".to_string()])
                .with_hint("Pass --docker-image or set UP_DOCKER_IMAGE")
        })?;

        let explicit_root = non_empty(repository_root).map(|p| expand_path(&p));
        let repository_root = repo::resolve_repository_root(explicit_root.as_deref(), cwd)?;

        Ok(Self {
            repository_root,
            docker_image,
        })
    }

    /// Absolute path of `folder`, which must be a directory under the root.
    pub fn folder_path(&self, folder: &str) -> Result<PathBuf> {
        let path = self.repository_root.join(folder);
        if !path.is_dir() {
            return Err(Error::folder_not_found(
                folder,
                path.display().to_string(),
            ));
        }
        Ok(path)
    }
}

/// Raw options as they arrive from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigInput {
    pub folders: Vec<String>,
    pub machines: Option<String>,
    pub ssh_config: Option<String>,
    pub docker_image: Option<String>,
    pub prefix: String,
    pub repository_root: Option<String>,
    pub skip_build: bool,
    pub skip_check: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(flatten)]
    pub target: BuildTarget,
    pub folders: Vec<String>,
    pub machines: Vec<String>,
    pub ssh_config: Option<PathBuf>,
    pub skip_build: bool,
    pub skip_check: bool,
}

impl Configuration {
    /// Validate every user input before any build or distribution starts.
    pub fn resolve(input: ConfigInput, cwd: &Path) -> Result<Self> {
        if input.folders.is_empty() {
            return Err(Error::validation_missing_argument(vec![
                "FOLDER".to_string(),
            ]));
        }

        let machine_spec = non_empty(input.machines).ok_or_else(|| {
            Error::validation_missing_argument(vec!["machines".to_string()])
                .with_hint("Pass --machines or set UP_MACHINES")
        })?;
        let machines = resolve_machines(&machine_spec, &input.prefix)?;

        let target = BuildTarget::resolve(input.docker_image, input.repository_root, cwd)?;
        for folder in &input.folders {
            target.folder_path(folder)?;
        }

        Ok(Self {
            target,
            folders: input.folders,
            machines,
            ssh_config: non_empty(input.ssh_config).map(|p| expand_path(&p)),
            skip_build: input.skip_build,
            skip_check: input.skip_check,
        })
    }

    pub fn repository_root(&self) -> &Path {
        &self.target.repository_root
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
