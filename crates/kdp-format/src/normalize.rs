//! Page image normalization
//!
//! Loads one source image and resamples it to the print resolution of the
//! page. The result is kept in memory and also written to a temporary PNG
//! artifact that both encoders read from.

use crate::constants::{POINTS_PER_INCH, TARGET_PPI, in_to_pt};
use crate::geometry::PageGeometry;
use crate::types::*;
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// A resampled page, valid for one page iteration
#[derive(Debug)]
pub struct RenderedPage {
    pixels: RgbImage,
    artifact: TempPath,
}

impl RenderedPage {
    pub fn width_px(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height_px(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Temporary PNG holding the resampled raster
    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Encoded PNG bytes of the artifact
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.artifact)?)
    }

    /// Remove the temporary artifact
    pub fn dispose(self) -> Result<()> {
        self.artifact.close()?;
        Ok(())
    }
}

/// Pixel size of a page at the target print density
pub fn target_pixels(width_in: f32, height_in: f32) -> (u32, u32) {
    let to_px = |inches: f32| {
        let px = (in_to_pt(inches) * TARGET_PPI / POINTS_PER_INCH).round();
        px.max(1.0) as u32
    };
    (to_px(width_in), to_px(height_in))
}

/// Load `source` and resample it to fill the page of `geometry`.
///
/// The aspect ratio of the source is not preserved.
pub fn normalize_page(source: &Path, geometry: &PageGeometry) -> Result<RenderedPage> {
    let unreadable = |reason: String| FormatError::ImageUnreadable {
        path: source.to_path_buf(),
        reason,
    };

    let image = image::open(source).map_err(|e| unreadable(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(unreadable("image has no pixels".to_string()));
    }

    let (width_px, height_px) = target_pixels(geometry.page_width_in, geometry.page_height_in);
    log::debug!(
        "Resampling {} from {}x{} to {}x{}",
        source.display(),
        image.width(),
        image.height(),
        width_px,
        height_px
    );

    let pixels = image
        .resize_exact(width_px, height_px, FilterType::Lanczos3)
        .into_rgb8();

    let artifact = write_artifact(&pixels, source)?;
    Ok(RenderedPage { pixels, artifact })
}

fn write_artifact(pixels: &RgbImage, source: &Path) -> Result<TempPath> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());

    let mut file = tempfile::Builder::new()
        .prefix(&format!("temp_{stem}_"))
        .suffix(".png")
        .tempfile()?;

    {
        let mut writer = BufWriter::new(file.as_file_mut());
        pixels.write_to(&mut writer, ImageFormat::Png)?;
        writer.flush()?;
    }

    Ok(file.into_temp_path())
}

/// Absolute path of a page file inside the source folder
pub fn page_path(folder: &Path, filename: &str) -> PathBuf {
    folder.join(filename)
}
