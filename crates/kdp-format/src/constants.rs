//! Shared constants for page assembly
//!
//! This module centralizes magic numbers and constants used throughout
//! the build process.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per inch (PDF user space unit)
pub const POINTS_PER_INCH: f32 = 72.0;

/// Twentieths of a point per inch (OOXML page size and margin unit)
pub const TWIPS_PER_INCH: f32 = 1440.0;

/// English Metric Units per inch (OOXML drawing extent unit)
pub const EMU_PER_INCH: f32 = 914_400.0;

/// Convert inches to points
#[inline]
pub fn in_to_pt(inches: f32) -> f32 {
    inches * POINTS_PER_INCH
}

/// Convert inches to twips
#[inline]
pub fn in_to_twips(inches: f32) -> i64 {
    (inches * TWIPS_PER_INCH).round() as i64
}

/// Convert inches to EMU
#[inline]
pub fn in_to_emu(inches: f32) -> i64 {
    (f64::from(inches) * f64::from(EMU_PER_INCH)).round() as i64
}

// =============================================================================
// Print Resolution
// =============================================================================

/// Pixel density every page image is resampled to
pub const TARGET_PPI: f32 = 330.0;

// =============================================================================
// Bleed
// =============================================================================

/// Width added to a trim size when printing with bleed (0.125" outside edge)
pub const BLEED_WIDTH_ALLOWANCE_IN: f32 = 0.125;

/// Height added to a trim size when printing with bleed (0.125" top and bottom)
pub const BLEED_HEIGHT_ALLOWANCE_IN: f32 = 0.25;

// =============================================================================
// Source Images
// =============================================================================

/// File extensions recognized as page images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

/// Attempts made to load and resample one page before giving up on it
pub const MAX_NORMALIZE_ATTEMPTS: usize = 3;

// =============================================================================
// Defaults
// =============================================================================

/// Default page width in inches (A4)
pub const DEFAULT_PAGE_WIDTH_IN: f32 = 8.27;

/// Default page height in inches (A4)
pub const DEFAULT_PAGE_HEIGHT_IN: f32 = 11.69;

/// Default output file name, without extension
pub const DEFAULT_OUTPUT_NAME: &str = "Output";

/// Separator used when persisting the page order and the deleted stack
pub const PERSIST_SEPARATOR: &str = "|";
