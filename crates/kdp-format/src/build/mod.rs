//! Document builder
//!
//! Turns an ordered page list plus build options into the two documents:
//! 1. Validate the folder, the page list and the geometry
//! 2. Normalize every page in order and append it to both encoders
//! 3. Stage both outputs and move them into place
//!
//! Progress is reported through a callback so the caller can mirror the
//! build state on whatever surface it drives.

mod docx;
mod output;
mod pdf;

pub use docx::DocxWriter;
pub use pdf::PdfWriter;

use crate::constants::MAX_NORMALIZE_ATTEMPTS;
use crate::geometry::PageGeometry;
use crate::normalize::{RenderedPage, normalize_page, page_path};
use crate::options::BuildOptions;
use crate::types::*;
use std::path::Path;

/// An append-only page stream
///
/// Pages must arrive in final print order; there is no way to go back.
pub trait PageEncoder {
    fn add_page(&mut self, page: &RenderedPage) -> Result<()>;
    fn page_count(&self) -> usize;
}

/// Build both documents for `pages` found in `folder`
pub async fn build_document(
    folder: impl AsRef<Path>,
    pages: &[String],
    options: &BuildOptions,
) -> Result<BuildReport> {
    build_document_with_progress(folder, pages, options, |_| {}).await
}

/// Build both documents, reporting progress to `progress`.
///
/// The callback runs on the blocking worker thread.
pub async fn build_document_with_progress<F>(
    folder: impl AsRef<Path>,
    pages: &[String],
    options: &BuildOptions,
    progress: F,
) -> Result<BuildReport>
where
    F: FnMut(BuildProgress) + Send + 'static,
{
    let folder = folder.as_ref().to_path_buf();
    let pages = pages.to_vec();
    let options = options.clone();

    tokio::task::spawn_blocking(move || {
        let mut progress = progress;
        build_document_sync(&folder, &pages, &options, &mut progress)
    })
    .await?
}

/// Blocking build; runs the whole state machine on the calling thread
pub fn build_document_sync(
    folder: &Path,
    pages: &[String],
    options: &BuildOptions,
    progress: &mut dyn FnMut(BuildProgress),
) -> Result<BuildReport> {
    progress(BuildProgress::StateChanged(BuildState::Validating));

    let geometry = match validate_inputs(folder, pages, options) {
        Ok(geometry) => geometry,
        Err(e) => {
            log::warn!("Build rejected: {}", e);
            progress(BuildProgress::StateChanged(BuildState::Idle));
            return Err(e);
        }
    };

    match render_and_finalize(folder, pages, options, &geometry, progress) {
        Ok(report) => {
            log::info!("{} ({} pages)", report.message(), report.pages_added);
            progress(BuildProgress::StateChanged(BuildState::Done));
            Ok(report)
        }
        Err(e) => {
            log::error!("Build failed: {}", e);
            progress(BuildProgress::StateChanged(BuildState::Failed));
            Err(e)
        }
    }
}

/// Checks that run before anything is rendered or written
pub(crate) fn validate_inputs(
    folder: &Path,
    pages: &[String],
    options: &BuildOptions,
) -> Result<PageGeometry> {
    if !folder.is_dir() {
        return Err(FormatError::FolderNotFound(folder.to_path_buf()));
    }
    if pages.is_empty() {
        return Err(FormatError::NoPagesWarning);
    }
    options.validate()?;
    options.geometry()
}

fn render_and_finalize(
    folder: &Path,
    pages: &[String],
    options: &BuildOptions,
    geometry: &PageGeometry,
    progress: &mut dyn FnMut(BuildProgress),
) -> Result<BuildReport> {
    progress(BuildProgress::StateChanged(BuildState::Rendering));
    log::info!(
        "Rendering {} pages at {:.3} x {:.3} in ({})",
        pages.len(),
        geometry.page_width_in,
        geometry.page_height_in,
        geometry.bleed_mode.name()
    );

    let mut docx = DocxWriter::new(geometry)?;
    let mut pdf = PdfWriter::new(geometry);
    let mut skipped = Vec::new();
    let total = pages.len();

    for (index, filename) in pages.iter().enumerate() {
        progress(BuildProgress::PageStarted {
            index,
            total,
            filename: filename.clone(),
        });
        let source = page_path(folder, filename);

        let page = match render_with_retry(&source, geometry, index, progress) {
            Ok(page) => page,
            Err(reason) => match options.failure_policy {
                PageFailurePolicy::Abort => {
                    return Err(FormatError::ImageUnreadable {
                        path: source,
                        reason,
                    });
                }
                PageFailurePolicy::Skip => {
                    log::warn!("Skipping page {} ({}): {}", index + 1, filename, reason);
                    let entry = SkippedPage {
                        index,
                        filename: filename.clone(),
                        reason,
                    };
                    progress(BuildProgress::PageSkipped(entry.clone()));
                    skipped.push(entry);
                    continue;
                }
            },
        };

        docx.add_page(&page)?;
        pdf.add_page(&page)?;
        debug_assert_eq!(docx.page_count(), pdf.page_count());

        if let Err(e) = page.dispose() {
            log::warn!("Could not remove temporary image for {}: {}", filename, e);
        }
    }

    progress(BuildProgress::StateChanged(BuildState::Finalizing));

    let pages_added = docx.page_count();
    if pages_added == 0 {
        return Err(FormatError::NoValidImages);
    }

    let docx_file = docx.finish()?;
    let pdf_doc = pdf.finish();
    let placed = output::place_outputs(docx_file, pdf_doc, folder, options)?;

    Ok(BuildReport {
        output_path: options.output_path(folder, options.output_kind),
        output_kind: options.output_kind,
        docx_path: placed.docx,
        pdf_path: placed.pdf,
        pages_added,
        skipped,
    })
}

/// Normalize one page, retrying a bounded number of times.
///
/// Returns the last failure reason when every attempt failed.
fn render_with_retry(
    source: &Path,
    geometry: &PageGeometry,
    index: usize,
    progress: &mut dyn FnMut(BuildProgress),
) -> std::result::Result<RenderedPage, String> {
    let mut last_reason = String::new();

    for attempt in 1..=MAX_NORMALIZE_ATTEMPTS {
        match normalize_page(source, geometry) {
            Ok(page) => return Ok(page),
            Err(e) => {
                last_reason = match e {
                    FormatError::ImageUnreadable { reason, .. } => reason,
                    other => other.to_string(),
                };
                log::warn!(
                    "Attempt {}/{} failed for {}: {}",
                    attempt,
                    MAX_NORMALIZE_ATTEMPTS,
                    source.display(),
                    last_reason
                );
                if attempt < MAX_NORMALIZE_ATTEMPTS {
                    progress(BuildProgress::PageRetry {
                        index,
                        attempt,
                        reason: last_reason.clone(),
                    });
                }
            }
        }
    }

    Err(last_reason)
}
