//! Resolved style records for the Tessera box-tree engine.
//!
//! The cascade is somebody else's job: this crate only describes the handful
//! of already-computed properties box construction reads, per node.
//!
//! - [`DisplayValue`] - the `display` keywords box construction understands
//! - [`StyleRecord`] - the per-node resolved style
//! - [`StyleMap`] - `NodeId -> StyleRecord`, optionally seeded from UA defaults
//! - [`ColorValue`], [`EdgeSizes`] - background and margin/padding values

mod display;
mod map;
mod record;
mod values;

pub use display::{DisplayValue, PageBreak};
pub use map::{StyleMap, default_display_for_element};
pub use record::StyleRecord;
pub use values::{ColorValue, EdgeSizes};
