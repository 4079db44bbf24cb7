use crate::error::Result;
use crate::export_plist::to_plist_hash;
use crate::model::{Layout, Meta};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::str::FromStr;

/// Manifest flavours understood by [`render_manifest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    #[default]
    Hash,
    Array,
    Plist,
}

impl ManifestFormat {
    /// Conventional file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Hash | Self::Array => "json",
            Self::Plist => "plist",
        }
    }
}

impl FromStr for ManifestFormat {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hash" | "json-hash" | "json" => Ok(Self::Hash),
            "array" | "json-array" => Ok(Self::Array),
            "plist" => Ok(Self::Plist),
            _ => Err(()),
        }
    }
}

/// Frames keyed by identifier.
/// Shape: `{ frames: { key: { frame: {x,y,w,h}, index } }, meta }`.
/// `index` is the placement order, since object keys carry no order.
pub fn to_json_hash<K: ToString>(layout: &Layout<K>, meta: &Meta) -> Value {
    let mut frames = serde_json::Map::new();
    for (index, fr) in layout.frames.iter().enumerate() {
        frames.insert(
            fr.key.to_string(),
            json!({
                "frame": {"x": fr.frame.x, "y": fr.frame.y, "w": fr.frame.w, "h": fr.frame.h},
                "index": index,
            }),
        );
    }
    json!({ "frames": frames, "meta": meta })
}

/// Frames as an array in placement order.
/// Shape: `{ frames: [ { key, frame: {x,y,w,h} } ], meta }`.
pub fn to_json_array<K: ToString>(layout: &Layout<K>, meta: &Meta) -> Value {
    let frames: Vec<Value> = layout
        .frames
        .iter()
        .map(|fr| {
            json!({
                "key": fr.key.to_string(),
                "frame": {"x": fr.frame.x, "y": fr.frame.y, "w": fr.frame.w, "h": fr.frame.h},
            })
        })
        .collect();
    json!({ "frames": frames, "meta": meta })
}

/// Serializes the manifest for `layout` in the requested format.
pub fn render_manifest<K: ToString>(
    layout: &Layout<K>,
    meta: &Meta,
    format: ManifestFormat,
) -> Result<String> {
    Ok(match format {
        ManifestFormat::Hash => serde_json::to_string_pretty(&to_json_hash(layout, meta))?,
        ManifestFormat::Array => serde_json::to_string_pretty(&to_json_array(layout, meta))?,
        ManifestFormat::Plist => to_plist_hash(layout, meta),
    })
}
