//! Sprite bookkeeping: identifiers, sources, decoded sizes and placed origins.
//!
//! Registration order is the packing order. Decodes may complete in any order;
//! [`Registry::pack_items`] is the barrier that only yields sized items once every
//! registered sprite has been decoded.

use crate::error::{Result, SheetPackerError};
use crate::model::{Layout, PackItem, Point};
use std::collections::HashMap;
use std::path::PathBuf;

/// Position of a sprite in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteHandle(usize);

impl SpriteHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One source image to be placed.
#[derive(Debug, Clone)]
pub struct Sprite<S = PathBuf> {
    key: String,
    source: S,
    size: Option<(u32, u32)>,
    origin: Option<Point>,
}

impl<S> Sprite<S> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Decoded (width, height); `None` while the decode is pending.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Placed origin; `None` until a layout has been applied.
    pub fn origin(&self) -> Option<Point> {
        self.origin
    }

    pub fn is_pending(&self) -> bool {
        self.size.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Registry<S = PathBuf> {
    sprites: Vec<Sprite<S>>,
    index: HashMap<String, usize>,
    max_dimension: u32,
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Registry<S> {
    pub fn new() -> Self {
        Self::with_max_dimension(u16::MAX as u32)
    }

    /// Registry that rejects decoded sizes above `max_dimension` on either axis.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            sprites: Vec::new(),
            index: HashMap::new(),
            max_dimension,
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Adds a pending sprite. Fails if `key` is already registered.
    pub fn register(&mut self, key: impl Into<String>, source: S) -> Result<SpriteHandle> {
        let key = key.into();
        if self.index.contains_key(&key) {
            return Err(SheetPackerError::DuplicateIdentifier(key));
        }
        let idx = self.sprites.len();
        self.index.insert(key.clone(), idx);
        self.sprites.push(Sprite {
            key,
            source,
            size: None,
            origin: None,
        });
        Ok(SpriteHandle(idx))
    }

    /// Records the decoded size of `key`. Any previously applied origin is cleared.
    pub fn on_decoded(&mut self, key: &str, width: u32, height: u32) -> Result<SpriteHandle> {
        let idx = *self
            .index
            .get(key)
            .ok_or_else(|| SheetPackerError::UnknownIdentifier(key.to_string()))?;
        self.check_dimensions(key, width, height)?;
        let sprite = &mut self.sprites[idx];
        sprite.size = Some((width, height));
        sprite.origin = None;
        Ok(SpriteHandle(idx))
    }

    /// Rejects sizes the packer must never see.
    pub fn check_dimensions(&self, key: &str, width: u32, height: u32) -> Result<()> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(SheetPackerError::InvalidDimensions {
                key: key.to_string(),
                width,
                height,
                limit: self.max_dimension,
            });
        }
        Ok(())
    }

    /// True iff no registered sprite is waiting on a decode.
    pub fn is_ready(&self) -> bool {
        self.sprites.iter().all(|s| !s.is_pending())
    }

    pub fn pending_count(&self) -> usize {
        self.sprites.iter().filter(|s| s.is_pending()).count()
    }

    /// Sprites still waiting on a decode, in registration order.
    pub fn pending(&self) -> impl Iterator<Item = &Sprite<S>> {
        self.sprites.iter().filter(|s| s.is_pending())
    }

    /// All sprites in registration order.
    pub fn ordered_sprites(&self) -> std::slice::Iter<'_, Sprite<S>> {
        self.sprites.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Sprite<S>> {
        self.index.get(key).map(|&i| &self.sprites[i])
    }

    pub fn sprite(&self, handle: SpriteHandle) -> Option<&Sprite<S>> {
        self.sprites.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Sized packing input in registration order.
    ///
    /// Fails with `NotReady` while any sprite is pending; this is the only way to
    /// turn registered sprites into something the packer accepts.
    pub fn pack_items(&self) -> Result<Vec<PackItem<String>>> {
        let pending = self.pending_count();
        if pending > 0 {
            return Err(SheetPackerError::NotReady { pending });
        }
        Ok(self
            .sprites
            .iter()
            .filter_map(|s| s.size.map(|(w, h)| PackItem::new(s.key.clone(), w, h)))
            .collect())
    }

    /// Writes the origins of `layout` back onto the registered sprites.
    pub fn apply_layout(&mut self, layout: &Layout) -> Result<()> {
        // Resolve every key first so a bad layout leaves the registry untouched.
        let targets = layout
            .frames
            .iter()
            .map(|f| {
                self.index
                    .get(&f.key)
                    .map(|&i| (i, f.frame.origin()))
                    .ok_or_else(|| SheetPackerError::UnknownIdentifier(f.key.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        for (i, origin) in targets {
            self.sprites[i].origin = Some(origin);
        }
        Ok(())
    }
}
