use clap::{Parser, Subcommand};

use logging::LogLevel;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    InteractivePassthrough,
}

mod commands;
mod logging;
mod output;
mod tty;

use commands::{build_and_update, build_env};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const ABOUT: &str = "Build Debian packages in Docker and update them on remote machines";

const LONG_ABOUT: &str = "Build Debian packages in Docker and update them on remote machines.

Packages are built for each FOLDER, copied to the given machines and updated there. \
Packages are only updated: a package that is not installed on a machine is skipped \
unless the install check is disabled with -c. Run anywhere inside a git repository; \
FOLDER is relative to the repository root.";

fn machine_sets_help() -> String {
    format!(
        "These are the configured predefined sets of machines:\n{}",
        update_package::config::describe_machine_sets()
    )
}

#[derive(Parser)]
#[command(name = "update-package")]
#[command(version = VERSION)]
#[command(about = ABOUT, long_about = LONG_ABOUT)]
struct Cli {
    /// Minimum level of log messages printed to stderr
    #[arg(
        short = 'l',
        long,
        global = true,
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build packages and update them on remote machines
    #[command(visible_alias = "bu", alias = "build_and_update")]
    #[command(after_help = machine_sets_help())]
    BuildAndUpdate(build_and_update::BuildAndUpdateArgs),
    /// Open a shell in the build container with a folder mounted
    #[command(visible_alias = "dbe", alias = "drop_to_build_env")]
    DropToBuildEnv(build_env::BuildEnvArgs),
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::DropToBuildEnv(_) => ResponseMode::InteractivePassthrough,
        Commands::BuildAndUpdate(_) => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);
    tracing::debug!(
        "Passed command line arguments: {:?}",
        std::env::args().skip(1).collect::<Vec<_>>()
    );

    let exit_code = match response_mode(&cli.command) {
        ResponseMode::Json => {
            let (json_result, exit_code) = commands::run_json(cli.command);
            output::print_result(json_result);
            exit_code
        }
        ResponseMode::InteractivePassthrough => {
            let result = require_interactive(tty::require_tty_for_interactive())
                .and_then(|()| commands::run_interactive(cli.command));

            match result {
                Ok(code) => code,
                Err(err) => {
                    let code = output::exit_code_for_error(err.code);
                    output::print_result::<serde_json::Value>(Err(err));
                    code
                }
            }
        }
    };

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn require_interactive(is_tty: bool) -> update_package::Result<()> {
    if is_tty {
        return Ok(());
    }

    Err(update_package::Error::validation_invalid_argument(
        "tty",
        "This command requires an interactive TTY",
        None,
    )
    .with_hint("Run drop-to-build-env from a terminal, not through a pipe"))
}

/// Negative codes have no process meaning and count as failure.
fn exit_code_to_u8(code: i32) -> u8 {
    if code < 0 {
        1
    } else if code > 255 {
        255
    } else {
        code as u8
    }
}
