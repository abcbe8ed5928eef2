//! Command dispatch from UI actions to the worker command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::WorkerCommand;

/// Queues one command for the worker. Returns `false` when the command never
/// left, with `status` set to the reason.
pub fn dispatch_worker_command(
    cmd_tx: &Sender<WorkerCommand>,
    cmd: WorkerCommand,
    status: &mut String,
) -> bool {
    let cmd_name = match &cmd {
        WorkerCommand::LoadFile { .. } => "load_file",
        WorkerCommand::LoadBytes { .. } => "load_bytes",
        WorkerCommand::Analyze { .. } => "analyze",
        WorkerCommand::FetchAnnotated { .. } => "fetch_annotated",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->worker command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = "Worker queue is full; please retry".to_string();
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Analysis worker is not running; restart the app".to_string();
            false
        }
    }
}
