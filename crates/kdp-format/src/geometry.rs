//! Page geometry resolution
//!
//! Turns a trim size (named template or explicit dimensions) plus a bleed
//! mode into the page and printable dimensions shared by both encoders.
//! All lengths are inches.

use crate::constants::{BLEED_HEIGHT_ALLOWANCE_IN, BLEED_WIDTH_ALLOWANCE_IN, in_to_pt};
use crate::types::*;

/// A standard print-on-demand trim size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSize {
    pub width_in: f32,
    pub height_in: f32,
}

impl TrimSize {
    pub const fn new(width_in: f32, height_in: f32) -> Self {
        Self {
            width_in,
            height_in,
        }
    }

    /// Template string of the form `"<W> x <H> in"`
    pub fn template(self) -> String {
        format!("{} x {} in", self.width_in, self.height_in)
    }

    /// Look up a built-in trim size by its template string
    pub fn find(template: &str) -> Option<Self> {
        let (w, h) = parse_template(template).ok()?;
        TRIM_SIZES
            .iter()
            .copied()
            .find(|t| t.width_in == w && t.height_in == h)
    }
}

/// Common paperback and hardcover trim sizes
pub const TRIM_SIZES: &[TrimSize] = &[
    TrimSize::new(5.0, 8.0),
    TrimSize::new(5.06, 7.81),
    TrimSize::new(5.25, 8.0),
    TrimSize::new(5.5, 8.5),
    TrimSize::new(6.0, 9.0),
    TrimSize::new(6.14, 9.21),
    TrimSize::new(6.69, 9.61),
    TrimSize::new(7.0, 10.0),
    TrimSize::new(7.44, 9.69),
    TrimSize::new(7.5, 9.25),
    TrimSize::new(8.0, 10.0),
    TrimSize::new(8.25, 6.0),
    TrimSize::new(8.25, 8.25),
    TrimSize::new(8.5, 8.5),
    TrimSize::new(8.5, 11.0),
    TrimSize::new(8.27, 11.69),
    TrimSize::new(8.25, 11.0),
];

/// How the page size was chosen
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageSize {
    /// A `"<W> x <H> in"` template; bleed allowance is added in bleed mode
    Template(String),
    /// Explicit page dimensions, used as-is
    Custom { width_in: f32, height_in: f32 },
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Custom {
            width_in: crate::constants::DEFAULT_PAGE_WIDTH_IN,
            height_in: crate::constants::DEFAULT_PAGE_HEIGHT_IN,
        }
    }
}

/// Page margins as entered by the user
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Margins {
    pub top_in: f32,
    pub bottom_in: f32,
    /// Inside margin (binding side)
    pub left_in: f32,
    /// Outside margin (fore edge)
    pub right_in: f32,
    /// Extra inside allowance for binding
    pub gutter_in: f32,
}

impl Margins {
    /// Same margin on all four sides, no gutter
    pub fn uniform(margin_in: f32) -> Self {
        Self {
            top_in: margin_in,
            bottom_in: margin_in,
            left_in: margin_in,
            right_in: margin_in,
            gutter_in: 0.0,
        }
    }

    fn values(&self) -> [(&'static str, f32); 5] {
        [
            ("top margin", self.top_in),
            ("bottom margin", self.bottom_in),
            ("left margin", self.left_in),
            ("right margin", self.right_in),
            ("gutter", self.gutter_in),
        ]
    }
}

/// Resolved geometry for one build
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_in: f32,
    pub page_height_in: f32,
    /// Effective margins (all zero in bleed mode)
    pub margins: Margins,
    pub bleed_mode: BleedMode,
}

impl PageGeometry {
    /// Resolve a page size choice into geometry
    pub fn resolve(size: &PageSize, margins: Margins, bleed_mode: BleedMode) -> Result<Self> {
        match size {
            PageSize::Template(template) => Self::from_template(template, margins, bleed_mode),
            PageSize::Custom {
                width_in,
                height_in,
            } => Self::from_dimensions(*width_in, *height_in, margins, bleed_mode),
        }
    }

    /// Geometry from a `"<W> x <H> in"` template, adding the bleed allowance
    pub fn from_template(template: &str, margins: Margins, bleed_mode: BleedMode) -> Result<Self> {
        let (mut width, mut height) = parse_template(template)?;
        if bleed_mode == BleedMode::Bleed {
            width += BLEED_WIDTH_ALLOWANCE_IN;
            height += BLEED_HEIGHT_ALLOWANCE_IN;
        }
        Self::from_dimensions(width, height, margins, bleed_mode)
    }

    /// Geometry from explicit page dimensions
    pub fn from_dimensions(
        width_in: f32,
        height_in: f32,
        margins: Margins,
        bleed_mode: BleedMode,
    ) -> Result<Self> {
        if !(width_in.is_finite() && width_in > 0.0) || !(height_in.is_finite() && height_in > 0.0)
        {
            return Err(FormatError::InvalidGeometry(format!(
                "page size must be positive, got {width_in} x {height_in} in"
            )));
        }

        let margins = match bleed_mode {
            BleedMode::Bleed => Margins::default(),
            BleedMode::NoBleed => margins,
        };

        Ok(Self {
            page_width_in: width_in,
            page_height_in: height_in,
            margins,
            bleed_mode,
        })
    }

    /// Width available for the page image
    pub fn printable_width_in(&self) -> f32 {
        self.page_width_in - self.margins.left_in - self.margins.right_in - self.margins.gutter_in
    }

    /// Height available for the page image
    pub fn printable_height_in(&self) -> f32 {
        self.page_height_in - self.margins.top_in - self.margins.bottom_in - self.margins.gutter_in
    }

    pub fn page_width_pt(&self) -> f32 {
        in_to_pt(self.page_width_in)
    }

    pub fn page_height_pt(&self) -> f32 {
        in_to_pt(self.page_height_in)
    }

    /// Reject geometry that leaves no room for content
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.margins.values() {
            if !value.is_finite() || value < 0.0 {
                return Err(FormatError::InvalidGeometry(format!(
                    "{name} must be zero or positive, got {value} in"
                )));
            }
        }

        let width = self.printable_width_in();
        let height = self.printable_height_in();
        if width <= 0.0 || height <= 0.0 {
            return Err(FormatError::InvalidGeometry(format!(
                "margins leave no printable area ({width:.3} x {height:.3} in)"
            )));
        }

        Ok(())
    }
}

/// Parse `"<W> x <H> in"` into (width, height)
pub fn parse_template(template: &str) -> Result<(f32, f32)> {
    let invalid = || FormatError::InvalidGeometry(format!("unrecognized page size '{template}'"));

    let parts: Vec<&str> = template.split(" x ").collect();
    let [width, height] = parts.as_slice() else {
        return Err(invalid());
    };

    let height = height
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .trim();

    let width: f32 = width.trim().parse().map_err(|_| invalid())?;
    let height: f32 = height.parse().map_err(|_| invalid())?;

    if !(width.is_finite() && width > 0.0) || !(height.is_finite() && height > 0.0) {
        return Err(invalid());
    }

    Ok((width, height))
}
