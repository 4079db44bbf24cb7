//! End-to-end spritesheet session: register sources, decode them, pack, render and write.

use crate::config::PackerConfig;
use crate::error::{Result, SheetPackerError};
use crate::export::{ManifestFormat, render_manifest};
use crate::model::{Layout, Meta};
use crate::pipeline::{
    compose, decode_file, encode_png, pack_registry, plan_registry, stage_output,
};
use crate::registry::{Registry, SpriteHandle};
use image::{DynamicImage, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Where a sprite's pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpriteSource {
    /// Image file, decoded by [`Spritesheet::decode_pending`].
    File(PathBuf),
    /// Image handed over already decoded.
    Memory,
}

pub struct Spritesheet {
    cfg: PackerConfig,
    registry: Registry<SpriteSource>,
    images: HashMap<String, RgbaImage>,
    exporting: AtomicBool,
}

/// Held for the duration of an export; only one can exist per sheet at a time.
pub struct ExportGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What a successful save produced.
#[derive(Debug, Clone)]
pub struct SavedSheet {
    pub layout: Layout,
    pub image_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

impl Spritesheet {
    pub fn new(cfg: PackerConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            registry: Registry::with_max_dimension(cfg.max_sprite_dimension),
            cfg,
            images: HashMap::new(),
            exporting: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PackerConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &Registry<SpriteSource> {
        &self.registry
    }

    /// Registers an image file keyed by its path (`\` normalized to `/`).
    pub fn add(&mut self, path: impl AsRef<Path>) -> Result<SpriteHandle> {
        let path = path.as_ref();
        self.add_with_key(path_key(path), path)
    }

    /// Registers an image file under an explicit key. The file is read later by
    /// [`decode_pending`](Self::decode_pending).
    pub fn add_with_key(
        &mut self,
        key: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<SpriteHandle> {
        self.registry
            .register(key, SpriteSource::File(path.as_ref().to_path_buf()))
    }

    /// Registers an already decoded image.
    pub fn add_image(&mut self, key: impl Into<String>, image: DynamicImage) -> Result<SpriteHandle> {
        let key = key.into();
        let rgba = image.to_rgba8();
        let (w, h) = rgba.dimensions();
        self.registry.check_dimensions(&key, w, h)?;
        let handle = self.registry.register(key.as_str(), SpriteSource::Memory)?;
        self.registry.on_decoded(&key, w, h)?;
        self.images.insert(key, rgba);
        Ok(handle)
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Decodes every pending file source. See [`decode_pending_with`](Self::decode_pending_with).
    pub fn decode_pending(&mut self) -> Result<usize> {
        self.decode_pending_with(|_| {})
    }

    /// Decodes every pending file source, calling `on_done(key)` as each one finishes.
    ///
    /// Decodes run in parallel when the `parallel` feature and `cfg.parallel` are on.
    /// Nothing is recorded unless every decode succeeds; the first failure in
    /// registration order is returned.
    #[instrument(skip_all, fields(pending = self.registry.pending_count()))]
    pub fn decode_pending_with<F>(&mut self, on_done: F) -> Result<usize>
    where
        F: Fn(&str) + Sync,
    {
        let jobs: Vec<(String, PathBuf)> = self
            .registry
            .pending()
            .filter_map(|s| match s.source() {
                SpriteSource::File(p) => Some((s.key().to_string(), p.clone())),
                SpriteSource::Memory => None,
            })
            .collect();

        let decoded = self
            .decode_jobs(&jobs, &on_done)
            .into_iter()
            .map(|(key, res)| res.map(|rgba| (key, rgba)))
            .collect::<Result<Vec<_>>>()?;
        for (key, rgba) in &decoded {
            self.registry
                .check_dimensions(key, rgba.width(), rgba.height())?;
        }

        let count = decoded.len();
        for (key, rgba) in decoded {
            self.registry.on_decoded(&key, rgba.width(), rgba.height())?;
            self.images.insert(key, rgba);
        }
        debug!(count, "decoded pending sprites");
        Ok(count)
    }

    fn decode_jobs<F>(
        &self,
        jobs: &[(String, PathBuf)],
        on_done: &F,
    ) -> Vec<(String, Result<RgbaImage>)>
    where
        F: Fn(&str) + Sync,
    {
        let run = |(key, path): &(String, PathBuf)| {
            let res = decode_file(path);
            on_done(key);
            (key.clone(), res)
        };

        #[cfg(feature = "parallel")]
        {
            if self.cfg.parallel {
                return jobs.par_iter().map(&run).collect();
            }
        }

        jobs.iter().map(&run).collect()
    }

    /// Computes the layout without recording origins.
    pub fn plan(&self) -> Result<Layout> {
        plan_registry(&self.registry, &self.cfg)
    }

    /// Computes the layout and records every sprite's origin in the registry.
    pub fn pack(&mut self) -> Result<Layout> {
        pack_registry(&mut self.registry, &self.cfg)
    }

    /// Composites the decoded sprites at their places in `layout`.
    pub fn render(&self, layout: &Layout) -> Result<RgbaImage> {
        compose(layout, &self.images, &self.cfg)
    }

    /// Manifest metadata for `layout`, naming the sheet image if known.
    pub fn meta(&self, layout: &Layout, image_path: Option<&Path>) -> Meta {
        let image = image_path
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        Meta::new(layout.extent(), image, self.cfg.sort_order.as_str())
    }

    /// Claims the export slot. Fails with `AlreadyInProgress` while another export holds it.
    pub fn export_guard(&self) -> Result<ExportGuard<'_>> {
        self.exporting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SheetPackerError::AlreadyInProgress)?;
        Ok(ExportGuard {
            flag: &self.exporting,
        })
    }

    /// Packs, renders and writes the sheet as PNG.
    pub fn save(&self, image_path: impl AsRef<Path>) -> Result<SavedSheet> {
        self.save_inner(image_path.as_ref(), None)
    }

    /// Packs, renders and writes the sheet as PNG plus a manifest.
    pub fn save_with_manifest(
        &self,
        image_path: impl AsRef<Path>,
        manifest_path: impl AsRef<Path>,
        format: ManifestFormat,
    ) -> Result<SavedSheet> {
        self.save_inner(image_path.as_ref(), Some((manifest_path.as_ref(), format)))
    }

    #[instrument(skip_all, fields(image = %image_path.display()))]
    fn save_inner(
        &self,
        image_path: &Path,
        manifest: Option<(&Path, ManifestFormat)>,
    ) -> Result<SavedSheet> {
        let _guard = self.export_guard()?;
        let layout = self.plan()?;
        let canvas = self.render(&layout)?;
        let png = encode_png(&canvas)?;
        let manifest = match manifest {
            Some((path, format)) => {
                let meta = self.meta(&layout, Some(image_path));
                Some((path, render_manifest(&layout, &meta, format)?))
            }
            None => None,
        };

        // Every byte is staged before anything appears at a destination.
        let staged_png = stage_output(image_path, &png)?;
        let staged_manifest = match &manifest {
            Some((path, text)) => Some(stage_output(path, text.as_bytes())?),
            None => None,
        };

        let image_path = staged_png.persist()?;
        info!(
            path = %image_path.display(),
            width = layout.width,
            height = layout.height,
            sprites = layout.frames.len(),
            "sheet written"
        );
        let manifest_path = match staged_manifest {
            Some(staged) => match staged.persist() {
                Ok(path) => {
                    info!(path = %path.display(), "manifest written");
                    Some(path)
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&image_path);
                    return Err(e);
                }
            },
            None => None,
        };

        Ok(SavedSheet {
            layout,
            image_path,
            manifest_path,
        })
    }
}

/// Identifier used for file sources: the path with `\` normalized to `/`.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
