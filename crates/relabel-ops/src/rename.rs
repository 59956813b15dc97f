//! Async rename with progress reporting.

use std::sync::Arc;

use tokio::sync::mpsc;

use relabel_core::{FailureReason, RenameFailure, RenameOutcome, RenameRequest};

use crate::{OPERATION_CHANNEL_SIZE, RenameEngine, RenameState};

/// Result sent through the channel during a rename.
#[derive(Debug)]
pub enum RenameResult {
    /// A state was reached.
    Progress(RenameState),
    /// The rename finished. Always the last message.
    Complete(RenameOutcome),
}

/// Start an async rename.
///
/// The engine runs on the blocking pool; states and the final outcome are
/// streamed through the returned receiver.
pub fn start_rename(
    engine: Arc<RenameEngine>,
    request: RenameRequest,
) -> mpsc::Receiver<RenameResult> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        rename_impl(engine, request, tx).await;
    });

    rx
}

/// Internal implementation of the async rename.
async fn rename_impl(
    engine: Arc<RenameEngine>,
    request: RenameRequest,
    tx: mpsc::Sender<RenameResult>,
) {
    let kind = request.item.kind;
    let old_name = request.item.name.clone();
    let progress_tx = tx.clone();

    let result = tokio::task::spawn_blocking(move || {
        engine.rename_observed(&request, |state| {
            let _ = progress_tx.blocking_send(RenameResult::Progress(state));
        })
    })
    .await;

    let outcome = result.unwrap_or_else(|e| {
        RenameFailure::new(
            FailureReason::FilesystemError,
            kind,
            old_name,
            None,
            format!("Task failed: {}", e),
        )
        .into()
    });

    let _ = tx.send(RenameResult::Complete(outcome)).await;
}
