//! Persisted user settings
//!
//! The on-disk shape is a flat key/value record: folder, output name and
//! kind, page size and margins in inches, plus the pipe-joined page order
//! (`image_sequence`) and deleted stack (`deleted_items`).

use crate::constants::{DEFAULT_OUTPUT_NAME, DEFAULT_PAGE_HEIGHT_IN, DEFAULT_PAGE_WIDTH_IN};
use crate::geometry::{Margins, PageSize};
use crate::options::BuildOptions;
use crate::types::*;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Settings {
    pub input_folder: String,
    /// Output file name without extension
    pub output_filename: String,
    pub file_type: OutputKind,
    pub page_width: f32,
    pub page_height: f32,
    pub top_margin: f32,
    pub bottom_margin: f32,
    pub left_margin: f32,
    pub right_margin: f32,
    pub gutter: f32,
    /// Pipe-joined page filenames in print order
    pub image_sequence: String,
    /// Pipe-joined `filename:index` entries, oldest first
    pub deleted_items: String,

    /// Named trim size; overrides `page_width`/`page_height` when set
    pub page_template: Option<String>,
    pub bleed_mode: BleedMode,
    pub keep_docx: bool,
    pub keep_pdf: bool,
    pub output_location: OutputLocation,
    pub failure_policy: PageFailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_folder: String::new(),
            output_filename: DEFAULT_OUTPUT_NAME.to_string(),
            file_type: OutputKind::Docx,
            page_width: DEFAULT_PAGE_WIDTH_IN,
            page_height: DEFAULT_PAGE_HEIGHT_IN,
            top_margin: 0.0,
            bottom_margin: 0.0,
            left_margin: 0.0,
            right_margin: 0.0,
            gutter: 0.0,
            image_sequence: String::new(),
            deleted_items: String::new(),
            page_template: None,
            bleed_mode: BleedMode::Bleed,
            keep_docx: true,
            keep_pdf: true,
            output_location: OutputLocation::default(),
            failure_policy: PageFailurePolicy::Skip,
        }
    }
}

impl Settings {
    pub fn input_folder(&self) -> PathBuf {
        PathBuf::from(&self.input_folder)
    }

    pub fn margins(&self) -> Margins {
        Margins {
            top_in: self.top_margin,
            bottom_in: self.bottom_margin,
            left_in: self.left_margin,
            right_in: self.right_margin,
            gutter_in: self.gutter,
        }
    }

    pub fn page_size(&self) -> PageSize {
        match &self.page_template {
            Some(template) => PageSize::Template(template.clone()),
            None => PageSize::Custom {
                width_in: self.page_width,
                height_in: self.page_height,
            },
        }
    }

    /// Snapshot of the build-relevant fields
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            output_name: self.output_filename.clone(),
            output_kind: self.file_type,
            page_size: self.page_size(),
            margins: self.margins(),
            bleed_mode: self.bleed_mode,
            location: self.output_location.clone(),
            keep_docx: self.keep_docx,
            keep_pdf: self.keep_pdf,
            failure_policy: self.failure_policy,
        }
    }

    /// Write build options back into the flat record
    pub fn apply_build_options(&mut self, options: &BuildOptions) {
        self.output_filename = options.output_name.clone();
        self.file_type = options.output_kind;
        match &options.page_size {
            PageSize::Template(template) => self.page_template = Some(template.clone()),
            PageSize::Custom {
                width_in,
                height_in,
            } => {
                self.page_template = None;
                self.page_width = *width_in;
                self.page_height = *height_in;
            }
        }
        self.top_margin = options.margins.top_in;
        self.bottom_margin = options.margins.bottom_in;
        self.left_margin = options.margins.left_in;
        self.right_margin = options.margins.right_in;
        self.gutter = options.margins.gutter_in;
        self.bleed_mode = options.bleed_mode;
        self.output_location = options.location.clone();
        self.keep_docx = options.keep_docx;
        self.keep_pdf = options.keep_pdf;
        self.failure_policy = options.failure_policy;
    }
}

/// Key/value backing for settings
pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;

    fn save(&mut self, settings: &Settings) -> Result<()>;

    /// Persist the page order and deleted stack, leaving other fields alone
    fn save_sequence(&mut self, image_sequence: &str, deleted_items: &str) -> Result<()> {
        let mut settings = self.load()?;
        settings.image_sequence = image_sequence.to_string();
        settings.deleted_items = deleted_items.to_string();
        self.save(&settings)
    }
}

/// Settings kept in memory only
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    pub settings: Settings,
    /// Number of saves performed
    pub saves: usize,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings, saves: 0 }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        self.settings = settings.clone();
        self.saves += 1;
        Ok(())
    }
}

/// Settings stored as a JSON file
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

#[cfg(feature = "serde")]
impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(feature = "serde")]
impl SettingsStore for JsonSettingsStore {
    /// A missing file yields the defaults
    fn load(&self) -> Result<Settings> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            FormatError::Settings(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&mut self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| FormatError::Settings(format!("Failed to serialize settings: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
