use crate::model::{Extent, Point, Rect};
use tracing::trace;

/// Greedy shelf-free packer driven by a frontier of free-position candidates.
///
/// Candidates are harvested from the bottom-left and top-right corners of placed
/// rectangles, but only while they lie inside the extent claimed so far. A new
/// rectangle takes the first candidate (x, then y ascending) that keeps it
/// strictly inside the current extent without touching anything already placed;
/// when none does, it starts a new column at `(extent.width, 0)`.
///
/// The extent is never wider than the sum of all placed widths; callers keep that
/// sum within `u32` (see [`crate::pipeline::plan_registry`]).
#[derive(Debug, Clone, Default)]
pub struct FrontierPacker {
    extent: Extent,
    candidates: Vec<Point>,
    placed: Vec<Rect>,
}

impl FrontierPacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            extent: Extent::default(),
            candidates: Vec::with_capacity(n * 2),
            placed: Vec::with_capacity(n),
        }
    }

    /// Current tight bounding box of all placed rectangles.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Rectangles placed so far, in placement order.
    pub fn placed(&self) -> &[Rect] {
        &self.placed
    }

    /// Free-position candidates still available for the next placement.
    pub fn candidates(&self) -> &[Point] {
        &self.candidates
    }

    /// Places a `w`×`h` rectangle and returns where it went. Always succeeds.
    pub fn place(&mut self, w: u32, h: u32) -> Rect {
        self.candidates.sort_by(by_x_then_y);
        let rect = match self.take_candidate(w, h) {
            Some(rect) => rect,
            None => {
                let origin = Point::new(self.extent.width, 0);
                trace!(w, h, x = origin.x, "no candidate fits, opening new column");
                Rect::at(origin, w, h)
            }
        };
        self.harvest(&rect);
        self.extent.include(&rect);
        self.placed.push(rect);
        rect
    }

    fn take_candidate(&mut self, w: u32, h: u32) -> Option<Rect> {
        let idx = self
            .candidates
            .iter()
            .position(|&p| self.fits_at(p, w, h))?;
        let p = self.candidates.remove(idx);
        trace!(w, h, x = p.x, y = p.y, "placed at candidate");
        Some(Rect::at(p, w, h))
    }

    fn fits_at(&self, p: Point, w: u32, h: u32) -> bool {
        let rect = Rect::at(p, w, h);
        // Strictly inside: touching the far edge of the extent counts as outside.
        if rect.right_edge() >= self.extent.width || rect.bottom_edge() >= self.extent.height {
            return false;
        }
        !self.placed.iter().any(|other| other.intersects(&rect))
    }

    // Tested against the extent before `rect` grows it.
    fn harvest(&mut self, rect: &Rect) {
        let below = rect.bottom_edge();
        if below < self.extent.height {
            self.candidates.push(Point::new(rect.x, below));
        }
        let right = rect.right_edge();
        if right < self.extent.width {
            self.candidates.push(Point::new(right, rect.y));
        }
    }
}

fn by_x_then_y(a: &Point, b: &Point) -> std::cmp::Ordering {
    a.x.cmp(&b.x).then_with(|| a.y.cmp(&b.y))
}
