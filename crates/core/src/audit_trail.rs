use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::config_dir;
use crate::mutation::MutationResponse;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    Failed,
}

/// One completed document mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp_unix_ms: u128,
    pub profile_name: Option<String>,
    pub database: String,
    pub collection: String,
    pub operation: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a mutation happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub profile_name: Option<String>,
    pub database: String,
    pub collection: String,
}

impl AuditRecord {
    #[must_use]
    pub fn from_mutation(context: &AuditContext, response: &MutationResponse) -> Self {
        let (outcome, error) = match &response.result {
            Ok(()) => (AuditOutcome::Succeeded, None),
            Err(error) => (AuditOutcome::Failed, Some(error.message().to_string())),
        };
        Self {
            timestamp_unix_ms: unix_timestamp_millis(),
            profile_name: context.profile_name.clone(),
            database: context.database.clone(),
            collection: context.collection.clone(),
            operation: response.command.operation().to_string(),
            document_id: response.command.document_id().display_text(),
            field: response.command.field().map(str::to_string),
            outcome,
            error,
        }
    }
}

#[must_use]
pub fn unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[derive(Debug, Error)]
pub enum AuditTrailError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("invalid audit trail path `{0}`")]
    InvalidPath(PathBuf),
    #[error("failed to create audit trail directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize audit record: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to append audit record at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only NDJSON log of document mutations.
#[derive(Debug, Clone)]
pub struct FileAuditTrail {
    path: PathBuf,
}

impl FileAuditTrail {
    pub fn load_default() -> Result<Self, AuditTrailError> {
        let dir = config_dir().ok_or(AuditTrailError::ConfigDirUnavailable)?;
        Ok(Self::from_path(dir.join("audit.ndjson")))
    }

    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &AuditRecord) -> Result<(), AuditTrailError> {
        let parent_dir = self
            .path
            .parent()
            .ok_or_else(|| AuditTrailError::InvalidPath(self.path.clone()))?;
        fs::create_dir_all(parent_dir).map_err(|source| AuditTrailError::CreateDir {
            path: parent_dir.to_path_buf(),
            source,
        })?;

        let line = serde_json::to_string(record)
            .map_err(|source| AuditTrailError::Serialize { source })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| AuditTrailError::Write {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{line}").map_err(|source| AuditTrailError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{AuditContext, AuditOutcome, AuditRecord, FileAuditTrail};
    use crate::data_source::DataSourceError;
    use crate::document::FieldValue;
    use crate::mutation::{MutationCommand, MutationResponse};

    fn context() -> AuditContext {
        AuditContext {
            profile_name: Some("local".to_string()),
            database: "shop".to_string(),
            collection: "orders".to_string(),
        }
    }

    #[test]
    fn records_describe_the_mutation() {
        let update = AuditRecord::from_mutation(
            &context(),
            &MutationResponse {
                command: MutationCommand::edit(FieldValue::Int(7), "status", "shipped"),
                result: Ok(()),
            },
        );
        assert_eq!(update.operation, "update");
        assert_eq!(update.document_id, "7");
        assert_eq!(update.field.as_deref(), Some("status"));
        assert_eq!(update.outcome, AuditOutcome::Succeeded);
        assert!(update.error.is_none());

        let delete = AuditRecord::from_mutation(
            &context(),
            &MutationResponse {
                command: MutationCommand::delete(FieldValue::Int(7)),
                result: Err(DataSourceError::new("not primary")),
            },
        );
        assert_eq!(delete.operation, "delete");
        assert!(delete.field.is_none());
        assert_eq!(delete.outcome, AuditOutcome::Failed);
        assert_eq!(delete.error.as_deref(), Some("not primary"));
    }

    #[test]
    fn appends_json_lines_to_file() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("nested").join("audit.ndjson");
        let trail = FileAuditTrail::from_path(&path);

        let first = AuditRecord::from_mutation(
            &context(),
            &MutationResponse {
                command: MutationCommand::delete(FieldValue::String("a1".to_string())),
                result: Ok(()),
            },
        );
        let mut second = first.clone();
        second.timestamp_unix_ms += 1;
        second.outcome = AuditOutcome::Failed;
        second.error = Some("timeout".to_string());

        trail.append(&first).expect("failed to append first record");
        trail
            .append(&second)
            .expect("failed to append second record");

        let content = std::fs::read_to_string(path).expect("failed to read audit file");
        let loaded: Vec<AuditRecord> = content
            .lines()
            .map(|line| serde_json::from_str(line).expect("failed to parse line"))
            .collect();
        assert_eq!(loaded, [first, second]);
        assert!(!content.contains("\"field\""));
    }
}
