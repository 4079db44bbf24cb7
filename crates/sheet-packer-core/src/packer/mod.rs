use crate::model::{Frame, Layout, PackItem};
use tracing::instrument;

pub mod frontier;

pub use frontier::FrontierPacker;

/// Packs `items` in the given order and returns one frame per item plus the sheet extent.
///
/// Pure and total: the same sequence always yields the same layout, and every
/// item is placed (the engine falls back to opening a new column on the right).
#[instrument(skip_all, fields(items = items.len()))]
pub fn pack<K: Clone>(items: &[PackItem<K>]) -> Layout<K> {
    let mut packer = FrontierPacker::with_capacity(items.len());
    let frames: Vec<Frame<K>> = items
        .iter()
        .map(|it| Frame {
            key: it.key.clone(),
            frame: packer.place(it.w, it.h),
        })
        .collect();
    let extent = packer.extent();
    Layout {
        width: extent.width,
        height: extent.height,
        frames,
    }
}
