//! Repository root discovery.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const MARKER: &str = ".git";

/// Walk upward from `start` until a directory containing `.git` is found.
///
/// `.git` may be a directory or a file (worktrees and submodules use a file).
pub fn find_repository_root(start: &Path) -> Result<PathBuf> {
    let start = canonicalize(start)?;

    for candidate in start.ancestors() {
        if candidate.join(MARKER).exists() {
            tracing::debug!("Found repository root at {}", candidate.display());
            return Ok(candidate.to_path_buf());
        }
    }

    Err(Error::repository_root_not_found(start.display().to_string()))
}

/// Use `explicit` when given, otherwise search upward from `cwd`.
pub fn resolve_repository_root(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            let path = if path.is_relative() {
                cwd.join(path)
            } else {
                path.to_path_buf()
            };
            if !path.is_dir() {
                return Err(Error::validation_invalid_argument(
                    "repository-root",
                    format!("Repository root '{}' is not a directory", path.display()),
                    Some(path.display().to_string()),
                ));
            }
            canonicalize(&path)
        }
        None => find_repository_root(cwd),
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("resolve {}", path.display())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_marker_in_start_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let root = find_repository_root(dir.path()).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn walks_up_to_nearest_ancestor() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("inner");
        fs::create_dir_all(nested.join(".git")).unwrap();
        let deep = nested.join("services/foo/debian");
        fs::create_dir_all(&deep).unwrap();

        let root = find_repository_root(&deep).unwrap();
        assert_eq!(root, nested.canonicalize().unwrap());
    }

    #[test]
    fn accepts_git_file_marker() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".git"), "gitdir: ../elsewhere\n").unwrap();
        let sub = dir.path().join("pkg");
        fs::create_dir(&sub).unwrap();

        let root = find_repository_root(&sub).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn fails_when_no_ancestor_has_marker() {
        let dir = TempDir::new().unwrap();
        let start = dir.path().canonicalize().unwrap();
        // A scratch dir inside someone's checkout can't exercise this path.
        if start.ancestors().any(|p| p.join(".git").exists()) {
            return;
        }

        let err = find_repository_root(&start).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::RepositoryRootNotFound);
        assert_eq!(err.details["marker"], ".git");
    }

    #[test]
    fn explicit_root_skips_search() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("checkout");
        fs::create_dir(&sub).unwrap();

        let root = resolve_repository_root(Some(Path::new("checkout")), dir.path()).unwrap();
        assert_eq!(root, sub.canonicalize().unwrap());
    }

    #[test]
    fn explicit_root_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = resolve_repository_root(Some(Path::new("missing")), dir.path()).unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::ValidationInvalidArgument);
        assert_eq!(err.details["field"], "repository-root");
        let missing = dir.path().join("missing").display().to_string();
        assert_eq!(err.details["id"], missing.as_str());
        assert!(err.message.contains(&missing));
    }
}
