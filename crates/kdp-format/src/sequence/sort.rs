//! Page file ordering

use crate::constants::IMAGE_EXTENSIONS;
use std::cmp::Ordering;
use std::path::Path;

/// Whether `filename` has one of the recognized image extensions
pub fn is_image_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Numeric page key: the text after the last space and before the
/// extension, with `-` read as a decimal point.
///
/// `"Page 12.png"` gives 12, `"Page 3-5.png"` gives 3.5, `"cover.png"`
/// gives `None`.
pub fn numeric_key(filename: &str) -> Option<f64> {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => filename,
    };
    let token = stem.rsplit(' ').next()?;
    let key: f64 = token.replace('-', ".").parse().ok()?;
    key.is_finite().then_some(key)
}

/// Sort filenames by numeric key, or lexically if any name has no key
pub fn sort_pages(files: &mut [String]) {
    let keys: Option<Vec<f64>> = files.iter().map(|f| numeric_key(f)).collect();
    if keys.is_none() {
        files.sort();
        return;
    }

    files.sort_by(|a, b| {
        let (ka, kb) = (numeric_key(a), numeric_key(b));
        ka.partial_cmp(&kb)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(b))
    });
}
