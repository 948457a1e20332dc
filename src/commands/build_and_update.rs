use clap::Args;

use update_package::config::{ConfigInput, Configuration};
use update_package::pipeline::{self, RunReport};
use update_package::runner::ProcessRunner;

use super::CmdResult;

#[derive(Args, Debug)]
pub struct BuildAndUpdateArgs {
    /// Folders to build (or, with -b, search) packages in, relative to the
    /// repository root. More than one package can stem from the same folder.
    #[arg(value_name = "FOLDER", required = true)]
    pub folders: Vec<String>,

    /// Machines to update: a comma separated host list or a predefined set (@NAME)
    #[arg(short = 'm', long, env = "UP_MACHINES")]
    pub machines: Option<String>,

    /// ssh config file passed to ssh and scp via -F
    #[arg(long, value_name = "FILE", env = "UP_SSH_CONFIG")]
    pub ssh_config: Option<String>,

    /// Docker image to build packages in
    #[arg(short = 'i', long, value_name = "IMG", env = "UP_DOCKER_IMAGE")]
    pub docker_image: Option<String>,

    /// Prefix every machine name with this string
    #[arg(short = 'p', long, env = "UP_PREFIX", default_value = "")]
    pub prefix: String,

    /// Repository root (default: nearest parent directory containing `.git`)
    #[arg(long, value_name = "DIR")]
    pub repository_root: Option<String>,

    /// Don't build; distribute the `.deb` files already present in each FOLDER
    #[arg(short = 'b', long)]
    pub skip_package_build: bool,

    /// Update packages even if they are not installed on a machine
    #[arg(short = 'c', long)]
    pub skip_install_check: bool,
}

impl BuildAndUpdateArgs {
    fn into_input(self) -> ConfigInput {
        ConfigInput {
            folders: self.folders,
            machines: self.machines,
            ssh_config: self.ssh_config,
            docker_image: self.docker_image,
            prefix: self.prefix,
            repository_root: self.repository_root,
            skip_build: self.skip_package_build,
            skip_check: self.skip_install_check,
        }
    }
}

pub fn run(args: BuildAndUpdateArgs) -> CmdResult<RunReport> {
    let cwd = super::current_dir()?;
    let config = Configuration::resolve(args.into_input(), &cwd)?;
    tracing::info!("Configuration is:\n{:#?}", config);

    let report = pipeline::run(&ProcessRunner, &config)?;

    let exit_code = if report.has_failures() { 1 } else { 0 };
    Ok((report, exit_code))
}
