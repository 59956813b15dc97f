//! Turning outcomes into messages for the host.

use serde::{Deserialize, Serialize};

use relabel_core::{FailureReason, ItemKind, RenameFailure, RenameOutcome, RenameSuccess};

/// Severity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Success,
    Warning,
    Error,
}

/// Entries the host should swap in its listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUpdate {
    pub kind: ItemKind,
    /// Name to remove.
    pub remove: String,
    /// Name to add.
    pub add: String,
}

/// A message for the host to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub level: MessageLevel,
    pub message: String,
    /// Present whenever the entry changed name on disk.
    pub list_update: Option<ListUpdate>,
}

/// Maps rename outcomes to reports. Messages are not localized.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeReporter;

impl OutcomeReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report(&self, outcome: &RenameOutcome) -> Report {
        match outcome {
            RenameOutcome::Success(s) => self.success(s),
            RenameOutcome::Failure(f) => self.failure(f),
        }
    }

    fn success(&self, s: &RenameSuccess) -> Report {
        let mut message = format!("Renamed {} '{}' to '{}'", s.kind, s.old_name, s.new_name);
        if s.kind.is_folder() {
            let noun = if s.affected_records == 1 { "record" } else { "records" };
            message.push_str(&format!(" ({} file {} updated)", s.affected_records, noun));
        }

        Report {
            level: MessageLevel::Success,
            message,
            list_update: Some(ListUpdate {
                kind: s.kind,
                remove: s.old_name.clone(),
                add: s.new_name.clone(),
            }),
        }
    }

    fn failure(&self, f: &RenameFailure) -> Report {
        let new_name = f.new_name.as_deref().unwrap_or("");

        if let Some(partial) = &f.partial {
            return Report {
                level: MessageLevel::Warning,
                message: format!(
                    "Renamed {} '{}' to '{}', but its file records still point to '{}' ({}). \
                     Reindex '{}' to '{}' to repair them.",
                    f.kind,
                    f.old_name,
                    new_name,
                    partial.old_prefix,
                    f.detail,
                    partial.old_prefix,
                    partial.new_prefix
                ),
                list_update: Some(ListUpdate {
                    kind: f.kind,
                    remove: f.old_name.clone(),
                    add: new_name.to_string(),
                }),
            };
        }

        let message = match f.reason {
            FailureReason::PermissionDenied => {
                format!("You are not allowed to rename {} '{}'", f.kind, f.old_name)
            }
            FailureReason::NameCollision => {
                format!("Cannot rename '{}': '{}' already exists", f.old_name, new_name)
            }
            FailureReason::NotWritable => {
                format!("Cannot rename '{}': the file is not writable", f.old_name)
            }
            FailureReason::FilesystemError => {
                format!("Could not rename {} '{}': {}", f.kind, f.old_name, f.detail)
            }
            FailureReason::MetadataUpdateFailed => format!(
                "Could not rename {} '{}': its file records could not be updated ({})",
                f.kind, f.old_name, f.detail
            ),
        };

        Report {
            level: MessageLevel::Error,
            message,
            list_update: None,
        }
    }
}
