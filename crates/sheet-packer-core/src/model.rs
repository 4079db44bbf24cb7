use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Integer pixel position. Used for sprite origins and for free-position candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Tight bounding box (width, height) of everything placed so far.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }

    /// Grows the extent so that it also covers `r`. Never shrinks.
    pub fn include(&mut self, r: &Rect) {
        self.width = self.width.max(r.right_edge());
        self.height = self.height.max(r.bottom_edge());
    }
}

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
///
/// Coverage is half-open: `[x, x + w) × [y, y + h)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn at(origin: Point, w: u32, h: u32) -> Self {
        Self::new(origin.x, origin.y, w, h)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Exclusive right edge (`x + w`).
    pub fn right_edge(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge (`y + h`).
    pub fn bottom_edge(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Zero-width or zero-height rectangles cover no pixels.
    pub fn is_degenerate(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Returns true if `self` and `other` share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_degenerate() || other.is_degenerate() {
            return false;
        }
        !(other.right_edge() <= self.x
            || other.x >= self.right_edge()
            || other.bottom_edge() <= self.y
            || other.y >= self.bottom_edge())
    }

    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
}

/// Sized input to the packing engine. Dimensions are known by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackItem<K = String> {
    pub key: K,
    pub w: u32,
    pub h: u32,
}

impl<K> PackItem<K> {
    pub fn new(key: K, w: u32, h: u32) -> Self {
        Self { key, w, h }
    }
}

/// A placed sprite within the sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frame<K = String> {
    /// Sprite identifier (e.g., normalized source path).
    pub key: K,
    /// Placed rectangle within the sheet.
    pub frame: Rect,
}

/// Result of a packing run: the canvas extent plus one frame per input, in input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Layout<K = String> {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Frame<K>>,
}

impl<K> Layout<K> {
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Computes packing statistics for this layout.
    pub fn stats(&self) -> PackStats {
        let total_area = self.extent().area();
        let used_area: u64 = self.frames.iter().map(|f| f.frame.area()).sum();
        let occupancy = if total_area > 0 {
            used_area as f64 / total_area as f64
        } else {
            0.0
        };
        PackStats {
            num_frames: self.frames.len(),
            width: self.width,
            height: self.height,
            total_area,
            used_area,
            occupancy,
        }
    }

    /// Looks up the frame placed for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&Frame<K>>
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.frames.iter().find(|f| f.key == *key)
    }
}

impl<K: Eq + Hash + Clone> Layout<K> {
    /// Identifier -> origin map.
    pub fn origins(&self) -> HashMap<K, Point> {
        self.frames
            .iter()
            .map(|f| (f.key.clone(), f.frame.origin()))
            .collect()
    }
}

/// Statistics about packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    /// Number of placed sprites.
    pub num_frames: usize,
    /// Sheet dimensions.
    pub width: u32,
    pub height: u32,
    /// Sheet area (width * height).
    pub total_area: u64,
    /// Sum of sprite areas.
    pub used_area: u64,
    /// used_area / total_area (0.0 to 1.0). Higher is better.
    pub occupancy: f64,
}

impl PackStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Sheet: {}x{}, Sprites: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px²",
            self.width,
            self.height,
            self.num_frames,
            self.occupancy * 100.0,
            self.total_area,
            self.used_area,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.total_area > 0 {
            (self.wasted_area() as f64 / self.total_area as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Sheet-level metadata written alongside the frames in every manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    /// Schema version of the JSON manifests; current: "1".
    pub schema_version: String,
    pub app: String,
    pub version: String,
    /// File name of the sheet image the frames refer to.
    pub image: Option<String>,
    pub format: String,
    pub size: Extent,
    pub sort_order: String,
}

impl Meta {
    pub fn new(size: Extent, image: Option<String>, sort_order: &str) -> Self {
        Self {
            schema_version: "1".into(),
            app: "sheet-packer".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            image,
            format: "RGBA8888".into(),
            size,
            sort_order: sort_order.into(),
        }
    }
}
