//! Core library for packing images into a single spritesheet.
//!
//! - Registry: sprites keyed by identifier, kept in registration order; packing waits for every decode
//! - Packer: greedy shelf-free placement over a frontier of free-position candidates (deterministic)
//! - Pipeline: layout from sizes or a registry, RGBA compositing, PNG encode
//! - Manifests: JSON hash / JSON array / plist describing every frame
//!
//! Quick example:
//! ```ignore
//! use sheet_packer_core::{ManifestFormat, PackerConfig, Spritesheet};
//! # fn main() -> anyhow::Result<()> {
//! let mut sheet = Spritesheet::new(PackerConfig::default())?;
//! sheet.add("a.png")?;
//! sheet.add("b.png")?;
//! sheet.decode_pending()?;
//! let saved = sheet.save_with_manifest("sheet.png", "sheet.json", ManifestFormat::Hash)?;
//! println!("sheet: {}x{}", saved.layout.width, saved.layout.height);
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod export_plist;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod registry;
pub mod sheet;

pub use config::*;
pub use error::*;
pub use export::*;
pub use export_plist::*;
pub use model::*;
pub use packer::pack;
pub use pipeline::*;
pub use registry::*;
pub use sheet::*;

/// Convenience prelude for common types and functions.
/// Importing `sheet_packer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{PackerConfig, PackerConfigBuilder, SortOrder};
    pub use crate::export::{ManifestFormat, render_manifest, to_json_array, to_json_hash};
    pub use crate::model::{Extent, Frame, Layout, Meta, PackItem, PackStats, Point, Rect};
    pub use crate::packer::{FrontierPacker, pack};
    pub use crate::registry::{Registry, Sprite, SpriteHandle};
    pub use crate::sheet::{SavedSheet, SpriteSource, Spritesheet};
    pub use crate::{SheetPackerError, pack_layout};
}
