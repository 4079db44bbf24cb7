use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::ImageFormat;
use serde::Deserialize;
use sheet_packer_core::{
    ManifestFormat, Meta, PackerConfig, Registry, SortOrder, Spritesheet, pack_registry, path_key,
    probe_dimensions, render_manifest, write_output,
};
use tracing::info;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "sheet-packer",
    about = "Pack images into a single spritesheet",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress=false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack images into a sheet (PNG + manifest)
    Pack(PackArgs),
    /// Layout-only export (no PNG): read image headers, compute placements, write the manifest
    Layout(LayoutArgs),
    /// Simple timing bench (packs once, prints time + occupancy)
    Bench(BenchArgs),
}

#[derive(Parser, Debug, Clone)]
struct SourceArgs {
    /// Input files or directories (files keep their order; directories are walked in name order)
    #[arg(required = true, help_heading = "Input/Output")]
    inputs: Vec<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// YAML config file path (overrides the layout options below)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Sort order: none|height_desc|area_desc|max_side_desc|width_desc|name_asc
    #[arg(long, default_value = "none", help_heading = "Layout")]
    sort_order: String,
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Output sheet image (PNG)
    #[arg(
        short,
        long,
        default_value = "spritesheet.png",
        help_heading = "Input/Output"
    )]
    output: PathBuf,
    /// Manifest path (defaults to the output path with the format's extension)
    #[arg(long, help_heading = "Export")]
    manifest: Option<PathBuf>,
    /// Skip writing the manifest
    #[arg(long, default_value_t = false, help_heading = "Export")]
    no_manifest: bool,
    /// Manifest format: hash | array | plist
    #[arg(long, default_value = "hash", help_heading = "Export")]
    manifest_format: String,
    /// Draw red outlines (debug)
    #[arg(long, default_value_t = false, help_heading = "Image Processing")]
    outlines: bool,
    /// Decode inputs in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Performance")]
    parallel: bool,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute layout and stats without writing the sheet or manifest
    /// (--export-stats is still written)
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct LayoutArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Manifest output path
    #[arg(short, long, default_value = "spritesheet.json", help_heading = "Input/Output")]
    output: PathBuf,
    /// Sheet image name recorded in the manifest meta
    #[arg(long, help_heading = "Export")]
    image_name: Option<String>,
    /// Manifest format: hash | array | plist
    #[arg(long, default_value = "hash", help_heading = "Export")]
    manifest_format: String,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    #[command(flatten)]
    source: SourceArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Layout(args) => run_layout(args),
        Commands::Bench(args) => run_bench(args),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = load_config(&cli.source)?;
    if cli.outlines {
        cfg.outlines = true;
    }
    if cli.parallel {
        cfg.parallel = true;
    }

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let format = parse_manifest_format(&cli.manifest_format)?;
    let paths = gather_inputs(&cli.source)?;
    if paths.is_empty() {
        anyhow::bail!("no input images found");
    }

    let mut sheet = Spritesheet::new(cfg)?;
    for p in &paths {
        sheet
            .add(p)
            .with_context(|| format!("register {}", p.display()))?;
    }
    decode_with_progress(&mut sheet, show_progress)?;
    info!(count = paths.len(), "decoded input images");

    let layout = if cli.dry_run {
        sheet.pack()?
    } else if cli.no_manifest {
        sheet.save(&cli.output)?.layout
    } else {
        let manifest_path = cli
            .manifest
            .clone()
            .unwrap_or_else(|| cli.output.with_extension(format.extension()));
        sheet
            .save_with_manifest(&cli.output, &manifest_path, format)?
            .layout
    };

    let stats = layout.stats();
    info!(
        width = stats.width,
        height = stats.height,
        sprites = stats.num_frames,
        used_area = stats.used_area,
        total_area = stats.total_area,
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "stats"
    );

    if cli.dry_run {
        println!("{}", stats.summary());
    }
    // A dry run skips the sheet and manifest, not the stats.
    if let Some(stats_path) = &cli.export_stats {
        write_output(stats_path, serde_json::to_string_pretty(&stats)?.as_bytes())
            .with_context(|| format!("export stats to {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }
    Ok(())
}

fn run_layout(cli: &LayoutArgs) -> anyhow::Result<()> {
    let cfg = load_config(&cli.source)?;
    let format = parse_manifest_format(&cli.manifest_format)?;
    let paths = gather_inputs(&cli.source)?;
    let mut registry = probe_registry(&paths, &cfg)?;
    let layout = pack_registry(&mut registry, &cfg)?;

    let meta = Meta::new(
        layout.extent(),
        cli.image_name.clone(),
        cfg.sort_order.as_str(),
    );
    let text = render_manifest(&layout, &meta, format)?;
    write_output(&cli.output, text.as_bytes())
        .with_context(|| format!("write manifest {}", cli.output.display()))?;
    info!(
        path = ?cli.output,
        width = layout.width,
        height = layout.height,
        "manifest written (layout-only)"
    );
    Ok(())
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    let cfg = load_config(&b.source)?;
    let paths = gather_inputs(&b.source)?;
    let mut registry = probe_registry(&paths, &cfg)?;
    let start = Instant::now();
    let layout = pack_registry(&mut registry, &cfg)?;
    let dur = start.elapsed();
    let stats = layout.stats();
    println!(
        "sprites={} sheet={}x{} occupancy={:.2}% time={}",
        stats.num_frames,
        stats.width,
        stats.height,
        stats.occupancy * 100.0,
        fmt_dur(dur)
    );
    Ok(())
}

/// Registers every path and records its header dimensions, without decoding pixels.
fn probe_registry(paths: &[PathBuf], cfg: &PackerConfig) -> anyhow::Result<Registry> {
    let mut registry: Registry = Registry::with_max_dimension(cfg.max_sprite_dimension);
    for p in paths {
        let key = path_key(p);
        registry.register(key.as_str(), p.clone())?;
        let (w, h) = probe_dimensions(p)?;
        registry.on_decoded(&key, w, h)?;
    }
    Ok(registry)
}

fn decode_with_progress(sheet: &mut Spritesheet, progress: bool) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    let total = sheet.registry().pending_count() as u64;
    let bar = if progress {
        let b = ProgressBar::new(total);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} decoding {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let result = sheet.decode_pending_with(|key| {
        if let Some(b) = &bar {
            b.set_message(key.to_string());
            b.inc(1);
        }
    });
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    result?;
    Ok(())
}

fn load_config(src: &SourceArgs) -> anyhow::Result<PackerConfig> {
    let base = PackerConfig {
        sort_order: parse_sort_order(&src.sort_order)?,
        ..Default::default()
    };
    let cfg = if let Some(path) = &src.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        y.into_packer_config(base)?
    } else {
        base
    };
    cfg.validate()?;
    Ok(cfg)
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms < 1.0 {
        format!("{}µs", d.as_micros())
    } else {
        format!("{:.2}ms", ms)
    }
}

/// Expands inputs: files keep their CLI position, directories contribute their
/// image files sorted by name. Include/exclude globs apply to both.
fn gather_inputs(src: &SourceArgs) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(&src.include)?;
    let exc_set = build_globset(&src.exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    for path in &src.inputs {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walk {}", path.display()))?;
                let p = entry.path();
                if p.is_file()
                    && is_image(p)
                    && !should_skip(p, inc_set.as_ref(), exc_set.as_ref())
                {
                    list.push(p.to_path_buf());
                }
            }
        } else if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) {
            // Explicit files are kept even if missing so the read error names them.
            list.push(path.clone());
        }
    }
    Ok(list)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("invalid glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    if let Some(inc) = include {
        if !inc.is_match(p) {
            return true;
        }
    }
    if let Some(exc) = exclude {
        if exc.is_match(p) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        ImageFormat::from_path(p),
        Ok(ImageFormat::Png | ImageFormat::Jpeg)
    )
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    sort_order: Option<String>,
    parallel: Option<bool>,
    max_sprite_dimension: Option<u32>,
    background_color: Option<[u8; 4]>,
    outlines: Option<bool>,
}

impl YamlConfig {
    fn into_packer_config(self, mut cfg: PackerConfig) -> anyhow::Result<PackerConfig> {
        if let Some(v) = self.sort_order {
            cfg.sort_order = parse_sort_order(&v)?;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        if let Some(v) = self.max_sprite_dimension {
            cfg.max_sprite_dimension = v;
        }
        if let Some(v) = self.background_color {
            cfg.background_color = Some(v);
        }
        if let Some(v) = self.outlines {
            cfg.outlines = v;
        }
        Ok(cfg)
    }
}

fn parse_sort_order(s: &str) -> anyhow::Result<SortOrder> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown sort order: {}", s))
}

fn parse_manifest_format(s: &str) -> anyhow::Result<ManifestFormat> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown manifest format: {}", s))
}
