use crate::{BuildCommand, BuildUpdate, RuntimeError, handlers};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channels and task of a running worker
pub struct WorkerHandle {
    pub commands: mpsc::UnboundedSender<BuildCommand>,
    pub updates: mpsc::UnboundedReceiver<BuildUpdate>,
    pub task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn send(&self, command: BuildCommand) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .map_err(|_| RuntimeError::WorkerClosed)
    }
}

/// Spawn the worker on the current tokio runtime
pub fn spawn_worker() -> WorkerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(worker_task(command_rx, update_tx));

    WorkerHandle {
        commands: command_tx,
        updates: update_rx,
        task,
    }
}

/// Async worker task that processes build commands and sends updates.
///
/// At most one build runs at a time. Returns once the command channel is
/// closed and the last build has finished.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<BuildCommand>,
    update_tx: mpsc::UnboundedSender<BuildUpdate>,
) {
    let busy = Arc::new(AtomicBool::new(false));
    let mut in_flight: Option<JoinHandle<()>> = None;

    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            BuildCommand::Build {
                folder,
                pages,
                options,
            } => {
                if busy.swap(true, Ordering::SeqCst) {
                    log::warn!("Rejecting build request, another build is running");
                    let _ = update_tx.send(BuildUpdate::Rejected {
                        error: RuntimeError::BuildInProgress,
                    });
                    continue;
                }

                in_flight = Some(tokio::spawn(handlers::handle_build(
                    folder,
                    pages,
                    options,
                    Arc::clone(&busy),
                    update_tx.clone(),
                )));
            }
            BuildCommand::Plan {
                folder,
                pages,
                options,
            } => {
                handlers::handle_plan(folder, pages, options, &update_tx);
            }
            BuildCommand::LoadOptions { path } => {
                handlers::handle_load_options(path, &update_tx).await;
            }
        }
    }

    if let Some(task) = in_flight {
        if let Err(e) = task.await {
            log::error!("Build task ended abnormally: {}", e);
        }
    }
    log::debug!("Build worker stopped");
}
