use crate::BuildUpdate;
use kdp_format::{BuildOptions, build_document_with_progress, plan_build};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

pub async fn handle_build(
    folder: PathBuf,
    pages: Vec<String>,
    options: BuildOptions,
    busy: Arc<AtomicBool>,
    update_tx: mpsc::UnboundedSender<BuildUpdate>,
) {
    let progress_tx = update_tx.clone();
    let result = build_document_with_progress(&folder, &pages, &options, move |event| {
        let _ = progress_tx.send(event.into());
    })
    .await;

    // Free the slot before reporting so a follow-up request is accepted
    busy.store(false, Ordering::SeqCst);

    match result {
        Ok(report) => {
            let _ = update_tx.send(BuildUpdate::Complete { report });
        }
        Err(e) => {
            let _ = update_tx.send(BuildUpdate::Error {
                message: e.to_string(),
            });
        }
    }
}

pub fn handle_plan(
    folder: PathBuf,
    pages: Vec<String>,
    options: BuildOptions,
    update_tx: &mpsc::UnboundedSender<BuildUpdate>,
) {
    match plan_build(&folder, &pages, &options) {
        Ok(plan) => {
            let _ = update_tx.send(BuildUpdate::Planned { plan });
        }
        Err(e) => {
            let _ = update_tx.send(BuildUpdate::Error {
                message: e.to_string(),
            });
        }
    }
}

pub async fn handle_load_options(path: PathBuf, update_tx: &mpsc::UnboundedSender<BuildUpdate>) {
    match BuildOptions::load(&path).await {
        Ok(options) => {
            let _ = update_tx.send(BuildUpdate::OptionsLoaded { options });
        }
        Err(e) => {
            let _ = update_tx.send(BuildUpdate::Error {
                message: format!("Failed to load build options: {}", e),
            });
        }
    }
}
