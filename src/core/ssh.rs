//! `ssh` / `scp` command construction.
//!
//! Host details (user, port, identity) live in the user's ssh config, so
//! machines are addressed by the names used there.

use std::path::{Path, PathBuf};

use crate::runner::Invocation;
use crate::utils::shell;

#[derive(Debug, Clone, Default)]
pub struct SshOperations {
    ssh_config: Option<PathBuf>,
}

impl SshOperations {
    pub fn new(ssh_config: Option<PathBuf>) -> Self {
        Self { ssh_config }
    }

    fn base(&self, program: &str) -> Invocation {
        let invocation = Invocation::new(program);
        match &self.ssh_config {
            Some(config) => invocation.arg("-F").arg(config.display().to_string()),
            None => invocation,
        }
    }

    /// Copy `local` into the login directory on `machine` as `remote_name`.
    pub fn scp(&self, local: &Path, machine: &str, remote_name: &str) -> Invocation {
        self.base("scp")
            .arg(local.display().to_string())
            .arg(remote_target(machine, remote_name))
    }

    /// Run `argv` on `machine`, quoted into a single remote command line.
    pub fn ssh(&self, machine: &str, argv: &[String]) -> Invocation {
        self.base("ssh").arg(machine).arg(shell::quote_args(argv))
    }
}

pub fn remote_target(machine: &str, remote_name: &str) -> String {
    format!("{}:{}", machine, remote_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scp_without_config() {
        let ops = SshOperations::default();
        let inv = ops.scp(Path::new("/repo/pkg/a_1_all.deb"), "bsbt1", "a_1_all.deb");
        assert_eq!(inv.program, "scp");
        assert_eq!(inv.args, vec!["/repo/pkg/a_1_all.deb", "bsbt1:a_1_all.deb"]);
    }

    #[test]
    fn ssh_passes_config_file() {
        let ops = SshOperations::new(Some(PathBuf::from("/home/me/.ssh/ucs_config")));
        let argv = vec!["dpkg-query".to_string(), "--status".to_string(), "foo".to_string()];
        let inv = ops.ssh("bsbt1", &argv);
        assert_eq!(
            inv.args,
            vec!["-F", "/home/me/.ssh/ucs_config", "bsbt1", "dpkg-query --status foo"]
        );
    }
}
