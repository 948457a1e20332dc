use clap::Args;

use update_package::build;
use update_package::config::BuildTarget;
use update_package::runner::ProcessRunner;

#[derive(Args, Debug)]
pub struct BuildEnvArgs {
    /// Folder to mount at /source, relative to the repository root
    #[arg(value_name = "FOLDER")]
    pub folder: String,

    /// Docker image providing the build environment
    #[arg(short = 'i', long, value_name = "IMG", env = "UP_DOCKER_IMAGE")]
    pub docker_image: Option<String>,

    /// Repository root (default: nearest parent directory containing `.git`)
    #[arg(long, value_name = "DIR")]
    pub repository_root: Option<String>,
}

/// Returns the shell's exit code.
pub fn run(args: BuildEnvArgs) -> update_package::Result<i32> {
    let cwd = super::current_dir()?;
    let target = BuildTarget::resolve(args.docker_image, args.repository_root, &cwd)?;
    build::open_build_shell(&ProcessRunner, &target, &args.folder)
}
