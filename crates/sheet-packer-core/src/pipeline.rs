use crate::compositing::blit_rgba;
use crate::config::{PackerConfig, SortOrder};
use crate::error::{Result, SheetPackerError};
use crate::model::{Layout, PackItem};
use crate::packer;
use crate::registry::Registry;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Packs sizes into a single sheet without compositing pixel data.
/// Inputs are (key, width, height) in packing order.
///
/// Keys must be unique and sizes must respect `cfg.max_sprite_dimension`.
pub fn pack_layout<K: Into<String>>(
    inputs: Vec<(K, u32, u32)>,
    cfg: &PackerConfig,
) -> Result<Layout<String>> {
    cfg.validate()?;
    let mut registry: Registry<()> = Registry::with_max_dimension(cfg.max_sprite_dimension);
    for (k, w, h) in inputs {
        let key: String = k.into();
        registry.register(key.as_str(), ())?;
        registry.on_decoded(&key, w, h)?;
    }
    plan_registry(&registry, cfg)
}

/// Computes the layout for a fully decoded registry without touching it.
#[instrument(skip_all, fields(sprites = registry.len()))]
pub fn plan_registry<S>(registry: &Registry<S>, cfg: &PackerConfig) -> Result<Layout<String>> {
    let mut items = registry.pack_items()?;
    check_total_width(&items)?;
    sort_items(&mut items, cfg.sort_order);
    let layout = packer::pack(&items);
    debug!(
        width = layout.width,
        height = layout.height,
        sprites = layout.frames.len(),
        "layout computed"
    );
    Ok(layout)
}

/// Computes the layout and records every origin on the registry.
pub fn pack_registry<S>(registry: &mut Registry<S>, cfg: &PackerConfig) -> Result<Layout<String>> {
    let layout = plan_registry(registry, cfg)?;
    registry.apply_layout(&layout)?;
    Ok(layout)
}

/// Every fallback opens a column at the current width, so the sheet is at most
/// as wide as all sprites side by side. Refuse input where that could overflow.
pub fn check_total_width<K>(items: &[PackItem<K>]) -> Result<()> {
    let width: u64 = items.iter().map(|it| it.w as u64).sum();
    if width > u32::MAX as u64 {
        return Err(SheetPackerError::SheetTooLarge { width });
    }
    Ok(())
}

/// Stable pre-sort; `SortOrder::None` leaves the order untouched.
pub fn sort_items<K: Ord>(items: &mut [PackItem<K>], order: SortOrder) {
    match order {
        SortOrder::None => {}
        SortOrder::NameAsc => items.sort_by(|a, b| a.key.cmp(&b.key)),
        SortOrder::HeightDesc => {
            items.sort_by(|a, b| b.h.cmp(&a.h).then_with(|| a.key.cmp(&b.key)))
        }
        SortOrder::WidthDesc => {
            items.sort_by(|a, b| b.w.cmp(&a.w).then_with(|| a.key.cmp(&b.key)))
        }
        SortOrder::AreaDesc => items.sort_by(|a, b| {
            (b.w as u64 * b.h as u64)
                .cmp(&(a.w as u64 * a.h as u64))
                .then_with(|| a.key.cmp(&b.key))
        }),
        SortOrder::MaxSideDesc => items.sort_by(|a, b| {
            b.w.max(b.h)
                .cmp(&a.w.max(a.h))
                .then_with(|| a.key.cmp(&b.key))
        }),
    }
}

/// Renders `layout` into an RGBA canvas of the layout extent.
///
/// Every frame must have a decoded image in `images`.
#[instrument(skip_all, fields(width = layout.width, height = layout.height))]
pub fn compose(
    layout: &Layout,
    images: &HashMap<String, RgbaImage>,
    cfg: &PackerConfig,
) -> Result<RgbaImage> {
    if layout.width == 0 || layout.height == 0 {
        return Err(SheetPackerError::Empty {
            width: layout.width,
            height: layout.height,
        });
    }
    let fill = Rgba(cfg.background_color.unwrap_or([0, 0, 0, 0]));
    let mut canvas = RgbaImage::from_pixel(layout.width, layout.height, fill);
    for f in &layout.frames {
        let src = images
            .get(&f.key)
            .ok_or_else(|| SheetPackerError::UnknownIdentifier(f.key.clone()))?;
        blit_rgba(src, &mut canvas, f.frame.x, f.frame.y, cfg.outlines);
    }
    Ok(canvas)
}

/// Encodes the canvas as PNG bytes.
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(SheetPackerError::Encode)?;
    Ok(bytes)
}

/// Reads and decodes an image file into RGBA8.
pub fn decode_file(path: &Path) -> Result<RgbaImage> {
    let bytes = std::fs::read(path).map_err(|source| SheetPackerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bytes(path, &bytes)
}

/// Decodes in-memory image bytes; `path` only names the source in errors.
pub fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<RgbaImage> {
    let img: DynamicImage =
        image::load_from_memory(bytes).map_err(|source| SheetPackerError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(img.to_rgba8())
}

/// Reads only the image header to get (width, height).
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|source| SheetPackerError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Output written to a temporary file beside its destination. Nothing appears at
/// the destination until [`persist`](Self::persist); dropping it removes the temp file.
#[derive(Debug)]
pub struct StagedOutput {
    path: PathBuf,
    file: NamedTempFile,
}

impl StagedOutput {
    /// Final destination.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically moves the staged bytes onto the destination.
    pub fn persist(self) -> Result<PathBuf> {
        let path = self.path;
        self.file
            .persist(&path)
            .map_err(|e| SheetPackerError::Write {
                path: path.clone(),
                source: e.error,
            })?;
        Ok(path)
    }
}

/// Writes `bytes` to a temporary file in the destination directory.
pub fn stage_output(path: &Path, bytes: &[u8]) -> Result<StagedOutput> {
    let write_err = |source: std::io::Error| SheetPackerError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(bytes).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    Ok(StagedOutput {
        path: path.to_path_buf(),
        file,
    })
}

/// Writes `bytes` to `path` through a staged temp file, naming the path on failure.
/// A failed write never leaves a truncated file at `path`.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    stage_output(path, bytes)?.persist()?;
    Ok(())
}
