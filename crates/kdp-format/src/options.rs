use crate::geometry::{Margins, PageGeometry, PageSize};
use crate::types::*;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything a build needs besides the page sequence.
///
/// Owned by the caller and passed by reference; the builder never
/// mutates it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BuildOptions {
    // Output
    pub output_name: String,
    pub output_kind: OutputKind,
    pub location: OutputLocation,

    // Geometry
    pub page_size: PageSize,
    pub margins: Margins,
    pub bleed_mode: BleedMode,

    // Artifacts kept besides the requested one
    pub keep_docx: bool,
    pub keep_pdf: bool,

    pub failure_policy: PageFailurePolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output_name: crate::constants::DEFAULT_OUTPUT_NAME.to_string(),
            output_kind: OutputKind::Docx,
            location: OutputLocation::default(),
            page_size: PageSize::default(),
            margins: Margins::default(),
            bleed_mode: BleedMode::Bleed,
            keep_docx: true,
            keep_pdf: true,
            failure_policy: PageFailurePolicy::Skip,
        }
    }
}

impl BuildOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| FormatError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FormatError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Resolve the page geometry for these options
    pub fn geometry(&self) -> Result<PageGeometry> {
        PageGeometry::resolve(&self.page_size, self.margins, self.bleed_mode)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let name = self.output_name.trim();
        if name.is_empty() {
            return Err(FormatError::Config("Output file name is empty".to_string()));
        }
        if name.contains(['/', '\\']) {
            return Err(FormatError::Config(format!(
                "Output file name '{}' must not contain path separators",
                name
            )));
        }

        self.geometry()?.validate()
    }

    /// Directory the documents are written to
    pub fn destination_dir(&self, source_folder: &Path) -> PathBuf {
        match &self.location {
            OutputLocation::SourceFolder => source_folder.to_path_buf(),
            OutputLocation::Directory(dir) => dir.clone(),
        }
    }

    /// Final path of the artifact of `kind`
    pub fn output_path(&self, source_folder: &Path, kind: OutputKind) -> PathBuf {
        self.destination_dir(source_folder).join(format!(
            "{}.{}",
            self.output_name.trim(),
            kind.extension()
        ))
    }

    /// Whether the artifact of `kind` stays on disk after the build
    pub fn keeps(&self, kind: OutputKind) -> bool {
        if kind == self.output_kind {
            return true;
        }
        match kind {
            OutputKind::Docx => self.keep_docx,
            OutputKind::Pdf => self.keep_pdf,
        }
    }
}
