//! Output staging and replacement
//!
//! Both documents are written to temporary files inside the destination
//! directory first. Only when both are complete are they renamed over the
//! final paths. Previous outputs are moved aside beforehand and put back if
//! any rename fails, so the destination holds either the old pair or the
//! new pair.

use crate::options::BuildOptions;
use crate::types::*;
use lopdf::Document;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// Final paths of the documents left on disk
#[derive(Debug, Default)]
pub(crate) struct PlacedOutputs {
    pub docx: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

struct Staged {
    file: NamedTempFile,
    target: PathBuf,
}

/// Stage, place and clean up both documents for one finished build
pub(crate) fn place_outputs(
    docx: NamedTempFile,
    mut pdf: Document,
    source_folder: &Path,
    options: &BuildOptions,
) -> Result<PlacedOutputs> {
    let dest = options.destination_dir(source_folder);
    std::fs::create_dir_all(&dest)?;
    log::debug!("Writing outputs to {}", dest.display());

    let mut staged = Vec::new();

    if options.keeps(OutputKind::Docx) {
        let mut file = NamedTempFile::new_in(&dest)?;
        std::io::copy(&mut docx.reopen()?, &mut file)?;
        file.flush()?;
        staged.push((
            OutputKind::Docx,
            Staged {
                file,
                target: options.output_path(source_folder, OutputKind::Docx),
            },
        ));
    }

    if options.keeps(OutputKind::Pdf) {
        let mut file = NamedTempFile::new_in(&dest)?;
        pdf.save_to(&mut file)?;
        file.flush()?;
        staged.push((
            OutputKind::Pdf,
            Staged {
                file,
                target: options.output_path(source_folder, OutputKind::Pdf),
            },
        ));
    }

    // The DOCX staging copy in the system temp dir is no longer needed
    docx.close()?;

    let placed = swap_into_place(staged, &dest)?;

    for kind in [OutputKind::Docx, OutputKind::Pdf] {
        if !options.keeps(kind) {
            remove_stale(&options.output_path(source_folder, kind))?;
        }
    }

    Ok(placed)
}

/// Rename every staged file over its target.
///
/// Existing targets are moved to backups first. If any rename fails the
/// new files are removed and the backups restored.
fn swap_into_place(staged: Vec<(OutputKind, Staged)>, dest: &Path) -> Result<PlacedOutputs> {
    let targets: Vec<PathBuf> = staged.iter().map(|(_, s)| s.target.clone()).collect();

    let mut backups = Vec::with_capacity(targets.len());
    for target in &targets {
        match move_aside(target, dest) {
            Ok(backup) => backups.push(backup),
            Err(e) => {
                rollback(&targets, backups, 0);
                return Err(e);
            }
        }
    }

    let mut placed = PlacedOutputs::default();
    for (i, (kind, Staged { file, target })) in staged.into_iter().enumerate() {
        if backups[i].is_some() {
            log::info!("Replacing existing {}", target.display());
        }
        if let Err(e) = file.persist(&target) {
            log::error!("Could not place {}: {}", target.display(), e.error);
            rollback(&targets, backups, i);
            return Err(e.error.into());
        }
        log::info!("Wrote {} output {}", kind.name(), target.display());
        match kind {
            OutputKind::Docx => placed.docx = Some(target),
            OutputKind::Pdf => placed.pdf = Some(target),
        }
    }

    // Backups are deleted when dropped
    drop(backups);
    Ok(placed)
}

/// Move an existing output to a temporary backup in `dest`
fn move_aside(target: &Path, dest: &Path) -> Result<Option<TempPath>> {
    if !target.exists() {
        return Ok(None);
    }
    let backup = tempfile::Builder::new()
        .prefix(".previous-")
        .tempfile_in(dest)?
        .into_temp_path();
    std::fs::rename(target, &backup)?;
    Ok(Some(backup))
}

/// Undo the first `placed` renames and restore every backup
fn rollback(targets: &[PathBuf], backups: Vec<Option<TempPath>>, placed: usize) {
    for (i, target) in targets.iter().enumerate() {
        let result = match backups.get(i).and_then(Option::as_ref) {
            Some(backup) => std::fs::rename(backup, target),
            None if i < placed => std::fs::remove_file(target),
            None => Ok(()),
        };
        if let Err(e) = result {
            log::error!("Could not restore {}: {}", target.display(), e);
        }
    }
}

fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::info!("Removed unwanted output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
