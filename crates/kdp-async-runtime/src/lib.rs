use std::path::PathBuf;
use thiserror::Error;

mod handlers;
mod worker;

pub use worker::{WorkerHandle, spawn_worker, worker_task};

// Re-export types from the library crate
pub use kdp_format::{
    BuildOptions, BuildPlan, BuildProgress, BuildReport, BuildState, SkippedPage,
};

/// Commands sent from the controlling surface to the worker
#[derive(Debug)]
pub enum BuildCommand {
    /// Render both documents; rejected while another build is running
    Build {
        folder: PathBuf,
        pages: Vec<String>,
        options: BuildOptions,
    },
    /// Validate and describe a build without rendering
    Plan {
        folder: PathBuf,
        pages: Vec<String>,
        options: BuildOptions,
    },
    LoadOptions {
        path: PathBuf,
    },
}

/// Updates sent from the worker back to the controlling surface
#[derive(Debug, Clone, PartialEq)]
pub enum BuildUpdate {
    StateChanged {
        state: BuildState,
    },
    Progress {
        filename: String,
        current: usize,
        total: usize,
    },
    PageRetry {
        index: usize,
        attempt: usize,
        reason: String,
    },
    PageSkipped {
        page: SkippedPage,
    },
    Planned {
        plan: BuildPlan,
    },
    OptionsLoaded {
        options: BuildOptions,
    },
    Complete {
        report: BuildReport,
    },
    Rejected {
        error: RuntimeError,
    },
    Error {
        message: String,
    },
}

impl From<BuildProgress> for BuildUpdate {
    fn from(progress: BuildProgress) -> Self {
        match progress {
            BuildProgress::StateChanged(state) => BuildUpdate::StateChanged { state },
            BuildProgress::PageStarted {
                index,
                total,
                filename,
            } => BuildUpdate::Progress {
                filename,
                current: index + 1,
                total,
            },
            BuildProgress::PageRetry {
                index,
                attempt,
                reason,
            } => BuildUpdate::PageRetry {
                index,
                attempt,
                reason,
            },
            BuildProgress::PageSkipped(page) => BuildUpdate::PageSkipped { page },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("A build is already in progress")]
    BuildInProgress,
    #[error("The build worker has stopped")]
    WorkerClosed,
}
