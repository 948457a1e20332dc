//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use serde::Serialize;
use update_package::error::Hint;
use update_package::{Error, ErrorCode, Result};

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_result<T: Serialize>(result: Result<T>) {
    let printed = match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(err) => {
            tracing::error!("{}", err.message);
            print_response(&CliResponse::<()>::from_error(&err))
        }
    };
    if let Err(err) = printed {
        eprintln!("Failed to print response: {}", err.message);
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::MachineSetNotFound => 2,

        ErrorCode::RepositoryRootNotFound | ErrorCode::FolderNotFound => 4,

        ErrorCode::BuildFailed
        | ErrorCode::RemoteCommandFailed
        | ErrorCode::RemoteUploadFailed => 20,

        ErrorCode::InternalIoError | ErrorCode::InternalJsonError => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use update_package::error::BuildFailedDetails;

    #[test]
    fn build_failure_maps_to_exit_code_20() {
        let err = Error::build_failed(BuildFailedDetails {
            folder: "pkg".to_string(),
            exit_code: 2,
            output: String::new(),
        });

        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

        assert_eq!(exit_code, 20);
    }

    #[test]
    fn missing_root_maps_to_exit_code_4() {
        assert_eq!(exit_code_for_error(ErrorCode::RepositoryRootNotFound), 4);
        assert_eq!(exit_code_for_error(ErrorCode::FolderNotFound), 4);
    }

    #[test]
    fn unknown_machine_set_is_a_usage_error() {
        let err = update_package::config::resolve_machines("@nope", "").unwrap_err();

        assert_eq!(err.code, ErrorCode::MachineSetNotFound);
        assert_eq!(exit_code_for_error(err.code), 2);
    }

    #[test]
    fn error_envelope_carries_code_and_hints() {
        let err = Error::machine_set_not_found("lab", vec!["single".to_string()]);

        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

        assert!(json.contains("\"code\": \"machine_set.not_found\""));
        assert!(json.contains("\"success\": false"));
        assert!(json.contains("Known machine sets: single"));
    }

    #[test]
    fn success_keeps_command_exit_code() {
        let (value, exit_code) =
            map_cmd_result_to_json(Ok((serde_json::json!({"failed": 1}), 1)));

        assert_eq!(exit_code, 1);
        assert_eq!(value.unwrap()["failed"], 1);
    }
}
