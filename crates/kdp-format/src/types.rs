use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Selected folder does not exist: {}", .0.display())]
    FolderNotFound(PathBuf),
    #[error("No image files found in the selected folder")]
    NoPagesWarning,
    #[error("Cannot read image {}: {reason}", path.display())]
    ImageUnreadable { path: PathBuf, reason: String },
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("No valid images were added to the document")]
    NoValidImages,
    #[error("Page index {index} is out of range for a sequence of {len} pages")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("DOCX archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FormatError>;

/// Whether page content runs to the physical edge of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BleedMode {
    /// Content extends past the trim; margins and gutter are ignored
    #[default]
    Bleed,
    /// Configured margins and gutter are honored
    NoBleed,
}

impl BleedMode {
    pub fn name(self) -> &'static str {
        match self {
            BleedMode::Bleed => "Bleed",
            BleedMode::NoBleed => "No Bleed",
        }
    }
}

/// The artifact the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputKind {
    /// Reflowable word-processor document
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "DOCX"))]
    Docx,
    /// Fixed-layout page description
    #[cfg_attr(feature = "serde", serde(rename = "PDF"))]
    Pdf,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Docx => "docx",
            OutputKind::Pdf => "pdf",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputKind::Docx => "DOCX",
            OutputKind::Pdf => "PDF",
        }
    }

    /// Parse the persisted settings value (`DOCX` or `PDF`, any case)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DOCX" => Some(OutputKind::Docx),
            "PDF" => Some(OutputKind::Pdf),
            _ => None,
        }
    }
}

/// Where finished documents are written
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputLocation {
    /// Next to the source images
    SourceFolder,
    /// A dedicated output directory, created on demand
    Directory(PathBuf),
}

impl Default for OutputLocation {
    fn default() -> Self {
        OutputLocation::Directory(PathBuf::from("OUTPUT"))
    }
}

/// What happens to a page whose image still fails after every retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageFailurePolicy {
    /// Leave the page out of both documents and report it
    #[default]
    Skip,
    /// Stop the build with `ImageUnreadable`
    Abort,
}

/// Build lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Validating,
    Rendering,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildState::Idle => "idle",
            BuildState::Validating => "validating",
            BuildState::Rendering => "rendering",
            BuildState::Finalizing => "finalizing",
            BuildState::Done => "done",
            BuildState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A page left out of the documents after exhausting its retries
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPage {
    /// Position in the page sequence (0-based)
    pub index: usize,
    pub filename: String,
    pub reason: String,
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// The requested artifact
    pub output_path: PathBuf,
    pub output_kind: OutputKind,
    /// DOCX file left on disk, if kept
    pub docx_path: Option<PathBuf>,
    /// PDF file left on disk, if kept
    pub pdf_path: Option<PathBuf>,
    /// Pages written to each document
    pub pages_added: usize,
    pub skipped: Vec<SkippedPage>,
}

impl BuildReport {
    /// Banner shown to the user on success
    pub fn message(&self) -> String {
        let name = self
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("Document saved as {name}")
    }
}

/// Progress events emitted while a build runs
#[derive(Debug, Clone, PartialEq)]
pub enum BuildProgress {
    StateChanged(BuildState),
    PageStarted {
        index: usize,
        total: usize,
        filename: String,
    },
    PageRetry {
        index: usize,
        attempt: usize,
        reason: String,
    },
    PageSkipped(SkippedPage),
}
