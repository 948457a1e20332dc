use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationMissingArgument,
    ValidationInvalidArgument,

    RepositoryRootNotFound,
    FolderNotFound,
    MachineSetNotFound,

    BuildFailed,

    RemoteCommandFailed,
    RemoteUploadFailed,

    InternalIoError,
    InternalJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::RepositoryRootNotFound => "repository.root_not_found",
            ErrorCode::FolderNotFound => "folder.not_found",
            ErrorCode::MachineSetNotFound => "machine_set.not_found",

            ErrorCode::BuildFailed => "build.failed",

            ErrorCode::RemoteCommandFailed => "remote.command_failed",
            ErrorCode::RemoteUploadFailed => "remote.upload_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRootNotFoundDetails {
    pub start: String,
    pub marker: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNotFoundDetails {
    pub folder: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetNotFoundDetails {
    pub name: String,
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailedDetails {
    pub folder: String,
    pub exit_code: i32,
    pub output: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub machine: String,
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUploadFailedDetails {
    pub machine: String,
    pub local_path: String,
    pub remote_path: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        let message = format!("Missing required argument: {}", args.join(", "));
        Self::new(
            ErrorCode::ValidationMissingArgument,
            message,
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
            id,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            details,
        )
    }

    pub fn repository_root_not_found(start: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RepositoryRootNotFound,
            "Could not find repository root",
            to_details(RepositoryRootNotFoundDetails {
                start: start.into(),
                marker: ".git".to_string(),
            }),
        )
        .with_hint("Run inside a git checkout or pass --repository-root")
    }

    pub fn folder_not_found(folder: impl Into<String>, path: impl Into<String>) -> Self {
        let folder = folder.into();
        Self::new(
            ErrorCode::FolderNotFound,
            format!("Package folder '{}' does not exist", folder),
            to_details(FolderNotFoundDetails {
                folder,
                path: path.into(),
            }),
        )
        .with_hint("Folders are relative to the repository root")
    }

    pub fn machine_set_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        let name = name.into();
        let hint = format!("Known machine sets: {}", available.join(", "));
        Self::new(
            ErrorCode::MachineSetNotFound,
            format!("Unknown machine set '{}'", name),
            to_details(MachineSetNotFoundDetails { name, available }),
        )
        .with_hint(hint)
    }

    pub fn build_failed(details: BuildFailedDetails) -> Self {
        let message = format!(
            "Building packages in '{}' failed with exit code {}",
            details.folder, details.exit_code
        );
        Self::new(ErrorCode::BuildFailed, message, to_details(details))
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        let message = format!(
            "Remote command on {} failed with exit code {}",
            details.machine, details.exit_code
        );
        Self::new(ErrorCode::RemoteCommandFailed, message, to_details(details))
    }

    pub fn remote_upload_failed(details: RemoteUploadFailedDetails) -> Self {
        let message = format!(
            "Copying {} to {} failed with exit code {}",
            details.local_path, details.machine, details.exit_code
        );
        Self::new(ErrorCode::RemoteUploadFailed, message, to_details(details))
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dotted() {
        assert_eq!(
            ErrorCode::RepositoryRootNotFound.as_str(),
            "repository.root_not_found"
        );
        assert_eq!(ErrorCode::BuildFailed.as_str(), "build.failed");
    }

    #[test]
    fn build_failed_serializes_camel_case_details() {
        let err = Error::build_failed(BuildFailedDetails {
            folder: "services/foo".to_string(),
            exit_code: 2,
            output: "dpkg-buildpackage: error".to_string(),
        });

        assert_eq!(err.code, ErrorCode::BuildFailed);
        assert_eq!(err.details["exitCode"], 2);
        assert_eq!(err.details["folder"], "services/foo");
        assert!(err.message.contains("services/foo"));
    }

    #[test]
    fn machine_set_not_found_lists_available_sets() {
        let err = Error::machine_set_not_found("nope", vec!["single".to_string()]);
        assert_eq!(err.details["name"], "nope");
        assert_eq!(err.hints.len(), 1);
        assert!(err.hints[0].message.contains("single"));
    }

    #[test]
    fn with_hint_appends() {
        let err = Error::internal_io("boom", None)
            .with_hint("first")
            .with_hint("second");
        let messages: Vec<_> = err.hints.iter().map(|h| h.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
