use std::path::PathBuf;

pub type CmdResult<T> = update_package::Result<(T, i32)>;

pub mod build_and_update;
pub mod build_env;

fn current_dir() -> update_package::Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        update_package::Error::internal_io(e.to_string(), Some("read current directory".to_string()))
    })
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (update_package::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::BuildAndUpdate(args) => dispatch!(args, build_and_update),

        // Interactive commands never produce a JSON payload
        crate::Commands::DropToBuildEnv(_) => {
            let err = update_package::Error::validation_invalid_argument(
                "output_mode",
                "drop-to-build-env uses interactive output mode",
                None,
            );
            crate::output::map_cmd_result_to_json::<serde_json::Value>(Err(err))
        }
    }
}

pub(crate) fn run_interactive(command: crate::Commands) -> update_package::Result<i32> {
    match command {
        crate::Commands::DropToBuildEnv(args) => build_env::run(args),
        crate::Commands::BuildAndUpdate(_) => Err(update_package::Error::validation_invalid_argument(
            "output_mode",
            "build-and-update uses JSON output mode",
            None,
        )),
    }
}
