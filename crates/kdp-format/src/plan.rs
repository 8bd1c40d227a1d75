use crate::build::validate_inputs;
use crate::normalize::{page_path, target_pixels};
use crate::options::BuildOptions;
use crate::types::*;
use std::path::{Path, PathBuf};

/// What a build would do, computed without rendering anything
#[derive(Debug, Clone, PartialEq)]
pub struct BuildPlan {
    pub page_count: usize,
    /// Page files in the sequence that are not on disk
    pub missing_pages: Vec<String>,
    pub page_width_in: f32,
    pub page_height_in: f32,
    pub printable_width_in: f32,
    pub printable_height_in: f32,
    pub bleed_mode: BleedMode,
    /// Pixel size every page is resampled to
    pub target_width_px: u32,
    pub target_height_px: u32,
    pub destination: PathBuf,
    /// Artifacts left on disk after the build
    pub outputs: Vec<(OutputKind, PathBuf)>,
}

/// Validate a build and describe its result
pub fn plan_build(folder: &Path, pages: &[String], options: &BuildOptions) -> Result<BuildPlan> {
    let geometry = validate_inputs(folder, pages, options)?;

    let missing_pages = pages
        .iter()
        .filter(|name| !page_path(folder, name).is_file())
        .cloned()
        .collect();

    let (target_width_px, target_height_px) =
        target_pixels(geometry.page_width_in, geometry.page_height_in);

    let outputs = [OutputKind::Docx, OutputKind::Pdf]
        .into_iter()
        .filter(|kind| options.keeps(*kind))
        .map(|kind| (kind, options.output_path(folder, kind)))
        .collect();

    Ok(BuildPlan {
        page_count: pages.len(),
        missing_pages,
        page_width_in: geometry.page_width_in,
        page_height_in: geometry.page_height_in,
        printable_width_in: geometry.printable_width_in(),
        printable_height_in: geometry.printable_height_in(),
        bleed_mode: geometry.bleed_mode,
        target_width_px,
        target_height_px,
        destination: options.destination_dir(folder),
        outputs,
    })
}
