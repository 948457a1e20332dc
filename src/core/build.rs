use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{BuildTarget, Configuration};
use crate::error::{BuildFailedDetails, Error, Result};
use crate::runner::{CommandRunner, Invocation};

/// Mount point of the package folder inside the build container.
pub const CONTAINER_SOURCE_DIR: &str = "/source";

const PKG_FILE_MARKER: &str = "PKG_FILE=";

/// Runs inside the container with the package folder as working directory.
///
/// Builds from a scratch copy so the bind-mounted folder only receives the
/// finished `.deb` files, owned by whoever owns the folder on the host.
pub const BUILD_SCRIPT: &str = r#"
set -ex

tmpdir="$(mktemp -d)"

pkg_dir="$(pwd)"
orig_uid=$(stat -c %u "${pkg_dir}")
orig_gid=$(stat -c %g "${pkg_dir}")
echo "Copying package files to ${tmpdir}"
cp -av "${pkg_dir}"/* "${tmpdir}"

cd "${tmpdir}"

dpkg-buildpackage --build=binary

for pkg_file in "${tmpdir}"/../*.deb; do
    cp "${pkg_file}" "${pkg_dir}"
    pkg=$(basename "${pkg_file}")
    chown ${orig_uid}:${orig_gid} "${pkg_dir}/${pkg}"
    echo "PKG_FILE=${pkg}"
done
"#;

/// A built package file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub package_name: String,
}

impl Artifact {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let package_name = package_name_of(&file_name);
        Self {
            path,
            file_name,
            package_name,
        }
    }
}

/// Package name from a `name_version_arch.deb` file name.
pub fn package_name_of(file_name: &str) -> String {
    match file_name.split_once('_') {
        Some((name, _)) => name.to_string(),
        None => file_name
            .strip_suffix(".deb")
            .unwrap_or(file_name)
            .to_string(),
    }
}

fn volume_arg(folder_path: &Path) -> String {
    format!("--volume={}:{}", folder_path.display(), CONTAINER_SOURCE_DIR)
}

/// `docker run` invocation that builds every package in `folder_path`.
pub fn build_invocation(image: &str, folder_path: &Path) -> Invocation {
    Invocation::new("docker")
        .args(["run", "--rm"])
        .arg(volume_arg(folder_path))
        .arg(format!("--workdir={}", CONTAINER_SOURCE_DIR))
        .arg(image)
        .args(["/bin/bash", "-c", BUILD_SCRIPT])
}

/// `docker run` invocation for an interactive shell in the build environment.
pub fn shell_invocation(image: &str, folder_path: &Path) -> Invocation {
    Invocation::new("docker")
        .args(["run", "--rm", "-it"])
        .arg(volume_arg(folder_path))
        .arg(format!("--workdir={}", CONTAINER_SOURCE_DIR))
        .arg(image)
        .arg("/bin/bash")
}

/// File names announced by the build script, in output order.
pub fn parse_package_files(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix(PKG_FILE_MARKER))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the packages of one folder and return the produced artifacts.
pub fn build_folder(
    runner: &dyn CommandRunner,
    target: &BuildTarget,
    folder: &str,
) -> Result<Vec<Artifact>> {
    let folder_path = target.folder_path(folder)?;
    tracing::info!("Building packages in {}", folder);

    let output = runner.output(&build_invocation(&target.docker_image, &folder_path))?;
    let combined = output.combined();

    if !output.is_success() {
        tracing::error!("Build of {} failed:\n{}", folder, combined);
        return Err(Error::build_failed(BuildFailedDetails {
            folder: folder.to_string(),
            exit_code: output.exit_code,
            output: combined,
        }));
    }
    tracing::debug!("Build output is:\n{}", combined);

    let artifacts: Vec<Artifact> = parse_package_files(&output.stdout)
        .into_iter()
        .map(|name| {
            tracing::info!("Successfully built package {}", name);
            Artifact::new(folder_path.join(name))
        })
        .collect();

    if artifacts.is_empty() {
        tracing::warn!("Build of {} reported no package files", folder);
    }

    Ok(artifacts)
}

/// Already built `.deb` files directly inside `folder`, sorted by path.
pub fn find_built_packages(target: &BuildTarget, folder: &str) -> Result<Vec<Artifact>> {
    let folder_path = target.folder_path(folder)?;
    // Escape the folder itself so only the file name part is a pattern.
    let pattern = format!(
        "{}/*.deb",
        glob::Pattern::escape(&folder_path.to_string_lossy())
    );

    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| {
            Error::validation_invalid_argument(
                "folder",
                format!("Invalid search pattern '{}': {}", pattern, e),
                Some(folder.to_string()),
            )
        })?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    tracing::info!("Found {} package file(s) in {}", paths.len(), folder);
    Ok(paths.into_iter().map(Artifact::new).collect())
}

/// Open an interactive shell in the build image with `folder` mounted.
///
/// Returns the container's exit code.
pub fn open_build_shell(
    runner: &dyn CommandRunner,
    target: &BuildTarget,
    folder: &str,
) -> Result<i32> {
    let folder_path = target.folder_path(folder)?;
    tracing::info!(
        "Dropping to build environment {} in {}",
        target.docker_image,
        folder
    );
    runner.interactive(&shell_invocation(&target.docker_image, &folder_path))
}

/// Build (or, with skip-build, search) every configured folder in order.
///
/// The first failing build aborts the run.
pub fn collect_artifacts(runner: &dyn CommandRunner, config: &Configuration) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for folder in &config.folders {
        let found = if config.skip_build {
            find_built_packages(&config.target, folder)?
        } else {
            build_folder(runner, &config.target, folder)?
        };
        artifacts.extend(found);
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::runner::{CommandOutput, MockRunner};
    use std::fs;
    use tempfile::TempDir;

    fn target(dir: &TempDir) -> BuildTarget {
        BuildTarget {
            repository_root: dir.path().to_path_buf(),
            docker_image: "ucs-build:5.0".to_string(),
        }
    }

    #[test]
    fn package_name_is_prefix_before_underscore() {
        assert_eq!(package_name_of("univention-foo_1.2-3_all.deb"), "univention-foo");
        assert_eq!(package_name_of("plain.deb"), "plain");
    }

    #[test]
    fn parse_package_files_ignores_other_lines() {
        let stdout = "+ cp a b\nPKG_FILE=foo_1.0_all.deb\r\nnoise PKG_FILE=x\nPKG_FILE=bar_2.0_amd64.deb\n";
        assert_eq!(
            parse_package_files(stdout),
            vec!["foo_1.0_all.deb", "bar_2.0_amd64.deb"]
        );
    }

    #[test]
    fn build_invocation_mounts_folder() {
        let inv = build_invocation("img:1", Path::new("/repo/pkg"));
        assert_eq!(inv.program, "docker");
        assert_eq!(
            &inv.args[..5],
            &["run", "--rm", "--volume=/repo/pkg:/source", "--workdir=/source", "img:1"]
        );
        assert_eq!(inv.args.last().map(String::as_str), Some(BUILD_SCRIPT));
    }

    #[test]
    fn shell_invocation_is_interactive() {
        let inv = shell_invocation("img:1", Path::new("/repo/pkg"));
        assert!(inv.args.contains(&"-it".to_string()));
        assert_eq!(inv.args.last().map(String::as_str), Some("/bin/bash"));
    }

    #[test]
    fn build_folder_returns_announced_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let runner = MockRunner::with_responder(|_| {
            CommandOutput::success("building...\nPKG_FILE=foo_1.0_all.deb\nPKG_FILE=foo-doc_1.0_all.deb\n")
        });

        let artifacts = build_folder(&runner, &target(&dir), "pkg").unwrap();

        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["foo_1.0_all.deb", "foo-doc_1.0_all.deb"]);
        assert_eq!(artifacts[0].path, dir.path().join("pkg/foo_1.0_all.deb"));
        assert_eq!(artifacts[1].package_name, "foo-doc");
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn build_folder_failure_reports_folder() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let runner = MockRunner::with_responder(|_| CommandOutput {
            stdout: "+ dpkg-buildpackage --build=binary".to_string(),
            stderr: "dpkg-checkbuilddeps: error: Unmet build dependencies".to_string(),
            exit_code: 2,
        });

        let err = build_folder(&runner, &target(&dir), "pkg").unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildFailed);
        assert_eq!(err.details["folder"], "pkg");
        assert_eq!(err.details["exitCode"], 2);
        assert!(err.details["output"]
            .as_str()
            .unwrap()
            .contains("Unmet build dependencies"));
    }

    #[test]
    fn open_build_shell_returns_container_exit_code() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let runner = MockRunner::with_responder(|_| CommandOutput::failure(130, ""));

        let code = open_build_shell(&runner, &target(&dir), "pkg").unwrap();

        assert_eq!(code, 130);
        assert!(runner.command_lines()[0].starts_with("docker run --rm -it"));
    }

    #[test]
    fn open_build_shell_requires_existing_folder() {
        let dir = TempDir::new().unwrap();
        let runner = MockRunner::new();

        let err = open_build_shell(&runner, &target(&dir), "missing").unwrap_err();

        assert_eq!(err.code, ErrorCode::FolderNotFound);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn find_built_packages_lists_only_debs() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir_all(pkg.join("debian")).unwrap();
        fs::write(pkg.join("b_1.0_all.deb"), b"").unwrap();
        fs::write(pkg.join("a_1.0_all.deb"), b"").unwrap();
        fs::write(pkg.join("a_1.0_amd64.changes"), b"").unwrap();
        fs::write(pkg.join("debian/nested_1.0_all.deb"), b"").unwrap();

        let artifacts = find_built_packages(&target(&dir), "pkg").unwrap();

        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["a_1.0_all.deb", "b_1.0_all.deb"]);
    }
}
