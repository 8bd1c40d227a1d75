pub mod build;
pub mod constants;
mod geometry;
pub mod normalize;
mod options;
mod plan;
pub mod sequence;
mod settings;
mod types;

pub use build::{PageEncoder, build_document, build_document_sync, build_document_with_progress};
pub use geometry::*;
pub use normalize::{RenderedPage, normalize_page, target_pixels};
pub use options::*;
pub use plan::{BuildPlan, plan_build};
pub use sequence::{DeletedPage, DeletedStack, PageSequenceStore, restore_order, scan_folder};
pub use settings::*;
pub use types::*;
