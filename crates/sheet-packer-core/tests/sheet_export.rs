use image::{DynamicImage, Rgba, RgbaImage};
use sheet_packer_core::prelude::*;
use sheet_packer_core::{path_key, SheetPackerError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
}

fn write_png(path: &Path, w: u32, h: u32, px: [u8; 4]) {
    RgbaImage::from_pixel(w, h, Rgba(px))
        .save(path)
        .expect("write fixture png");
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[test]
fn in_memory_sprites_round_trip_through_png_and_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("sheet.png");
    let json = dir.path().join("sheet.json");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(4, 4, RED)).expect("a");
    sheet.add_image("b", solid(2, 2, BLUE)).expect("b");
    assert!(sheet.is_ready());

    let saved = sheet
        .save_with_manifest(&png, &json, ManifestFormat::Hash)
        .expect("save");
    assert_eq!((saved.layout.width, saved.layout.height), (6, 4));
    assert_eq!(saved.manifest_path.as_deref(), Some(json.as_path()));

    let img = image::open(&png).expect("reload").to_rgba8();
    assert_eq!(img.dimensions(), (6, 4));
    assert_eq!(img.get_pixel(0, 0).0, RED);
    assert_eq!(img.get_pixel(3, 3).0, RED);
    assert_eq!(img.get_pixel(4, 0).0, BLUE);
    assert_eq!(img.get_pixel(5, 1).0, BLUE);
    // uncovered pixels stay transparent
    assert_eq!(img.get_pixel(4, 2).0, [0, 0, 0, 0]);

    let text = std::fs::read_to_string(&json).expect("manifest");
    let v: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(v["frames"]["a"]["frame"]["x"], 0);
    assert_eq!(v["frames"]["b"]["frame"]["x"], 4);
    assert_eq!(v["frames"]["b"]["frame"]["w"], 2);
    assert_eq!(v["frames"]["b"]["index"], 1);
    assert_eq!(v["meta"]["image"], "sheet.png");
    assert_eq!(v["meta"]["size"]["width"], 6);
    assert_eq!(v["meta"]["size"]["height"], 4);
}

#[test]
fn save_does_not_record_origins_but_pack_does() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(4, 4, RED)).expect("a");
    sheet.add_image("b", solid(2, 2, BLUE)).expect("b");

    sheet.save(dir.path().join("out.png")).expect("save");
    assert!(sheet.registry().get("b").and_then(|s| s.origin()).is_none());

    let layout = sheet.pack().expect("pack");
    assert_eq!(
        sheet.registry().get("b").and_then(|s| s.origin()),
        Some(Point::new(4, 0))
    );
    assert_eq!(layout.origins().get("b"), Some(&Point::new(4, 0)));
}

#[test]
fn file_sources_are_decoded_before_packing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    write_png(&a, 3, 5, GREEN);
    write_png(&b, 2, 2, BLUE);

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add(&a).expect("add a");
    sheet.add_with_key("b", &b).expect("add b");
    assert!(!sheet.is_ready());
    assert_eq!(sheet.registry().pending_count(), 2);

    // not decoded yet: nothing can be packed or written
    let out = dir.path().join("early.png");
    let err = sheet.save(&out).unwrap_err();
    assert!(matches!(err, SheetPackerError::NotReady { pending: 2 }));
    assert!(!out.exists());

    assert_eq!(sheet.decode_pending().expect("decode"), 2);
    assert!(sheet.is_ready());

    let key_a = path_key(&a);
    assert_eq!(
        sheet.registry().get(&key_a).and_then(|s| s.size()),
        Some((3, 5))
    );
    let layout = sheet.plan().expect("plan");
    let keys: Vec<&str> = layout.frames.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec![key_a.as_str(), "b"]);
    assert_eq!(layout.get("b").map(|f| f.frame.origin()), Some(Point::new(3, 0)));

    // a second call has nothing left to do
    assert_eq!(sheet.decode_pending().expect("decode again"), 0);
}

#[test]
fn decode_progress_is_reported_per_sprite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = PackerConfig::builder().parallel(true).build();
    let mut sheet = Spritesheet::new(cfg).expect("sheet");
    for i in 0..6 {
        let p = dir.path().join(format!("s{i}.png"));
        write_png(&p, 1 + i, 2, GREEN);
        sheet.add_with_key(format!("s{i}"), &p).expect("add");
    }

    let done = AtomicUsize::new(0);
    let count = sheet
        .decode_pending_with(|_| {
            done.fetch_add(1, Ordering::Relaxed);
        })
        .expect("decode");
    assert_eq!(count, 6);
    assert_eq!(done.load(Ordering::Relaxed), 6);

    // completion order never leaks into the layout
    let layout = sheet.plan().expect("plan");
    let keys: Vec<String> = layout.frames.iter().map(|f| f.key.clone()).collect();
    let expected: Vec<String> = (0..6).map(|i| format!("s{i}")).collect();
    assert_eq!(keys, expected);
}

#[test]
fn corrupt_file_fails_decode_and_records_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.png");
    let bad = dir.path().join("bad.png");
    write_png(&good, 4, 4, RED);
    std::fs::write(&bad, b"definitely not a png").expect("write bad");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_with_key("good", &good).expect("good");
    sheet.add_with_key("bad", &bad).expect("bad");

    match sheet.decode_pending() {
        Err(SheetPackerError::Decode { path, .. }) => assert_eq!(path, bad),
        other => panic!("expected Decode error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(sheet.registry().pending_count(), 2);
    assert!(sheet.registry().get("good").and_then(|s| s.size()).is_none());
}

#[test]
fn missing_file_reports_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.png");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_with_key("nope", &missing).expect("register");
    let err = sheet.decode_pending().unwrap_err();
    match err {
        SheetPackerError::Read { path, .. } => assert_eq!(path, missing),
        other => panic!("expected Read error, got {other}"),
    }
    assert!(!sheet.is_ready());
}

#[test]
fn concurrent_export_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("sheet.png");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(2, 2, RED)).expect("a");

    let guard = sheet.export_guard().expect("first export");
    let err = sheet.save(&out).unwrap_err();
    assert!(matches!(err, SheetPackerError::AlreadyInProgress));
    assert!(matches!(
        sheet.export_guard(),
        Err(SheetPackerError::AlreadyInProgress)
    ));
    assert!(!out.exists());

    drop(guard);
    sheet.save(&out).expect("save after release");
    assert!(out.exists());
}

#[test]
fn failed_export_releases_the_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");

    assert!(sheet.save(dir.path().join("a.png")).is_err());
    // the previous attempt must not leave the slot claimed
    assert!(sheet.export_guard().is_ok());
}

#[test]
fn empty_sheet_cannot_be_rendered() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("empty.png");
    let sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");

    let err = sheet.save(&out).unwrap_err();
    assert!(matches!(
        err,
        SheetPackerError::Empty {
            width: 0,
            height: 0
        }
    ));
    assert!(!out.exists());
}

#[test]
fn only_zero_sized_sprites_is_empty_too() {
    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet
        .add_image("nothing", DynamicImage::new_rgba8(0, 0))
        .expect("zero-size sprites are allowed");
    let layout = sheet.plan().expect("plan");
    assert_eq!(layout.len(), 1);
    assert!(matches!(
        sheet.render(&layout),
        Err(SheetPackerError::Empty { .. })
    ));
}

#[test]
fn duplicate_keys_are_rejected_for_every_source_kind() {
    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(1, 1, RED)).expect("a");

    assert!(matches!(
        sheet.add_image("a", solid(2, 2, BLUE)),
        Err(SheetPackerError::DuplicateIdentifier(k)) if k == "a"
    ));
    assert!(matches!(
        sheet.add_with_key("a", "a.png"),
        Err(SheetPackerError::DuplicateIdentifier(_))
    ));
    assert_eq!(sheet.registry().len(), 1);

    // the first image survives the rejected insert
    let layout = sheet.plan().expect("plan");
    let img = sheet.render(&layout).expect("render");
    assert_eq!(img.dimensions(), (1, 1));
    assert_eq!(img.get_pixel(0, 0).0, RED);
}

#[test]
fn oversized_image_is_not_registered() {
    let cfg = PackerConfig::builder().max_sprite_dimension(8).build();
    let mut sheet = Spritesheet::new(cfg).expect("sheet");
    let err = sheet.add_image("wide", solid(9, 1, RED)).unwrap_err();
    assert!(matches!(
        err,
        SheetPackerError::InvalidDimensions { width: 9, limit: 8, .. }
    ));
    assert!(sheet.registry().is_empty());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let cfg = PackerConfig::builder().max_sprite_dimension(0).build();
    assert!(matches!(
        Spritesheet::new(cfg),
        Err(SheetPackerError::InvalidConfig(_))
    ));
}

#[test]
fn background_and_outlines_are_applied() {
    let bg = [10, 20, 30, 255];
    let cfg = PackerConfig::builder()
        .background_color(Some(bg))
        .outlines(true)
        .build();
    let mut sheet = Spritesheet::new(cfg).expect("sheet");
    sheet.add_image("a", solid(3, 3, GREEN)).expect("a");
    sheet.add_image("b", solid(2, 4, BLUE)).expect("b");

    let layout = sheet.plan().expect("plan");
    assert_eq!((layout.width, layout.height), (5, 4));
    let img = sheet.render(&layout).expect("render");

    // gap under "a"
    assert_eq!(img.get_pixel(0, 3).0, bg);
    // outline edges, untouched interior
    assert_eq!(img.get_pixel(0, 0).0, RED);
    assert_eq!(img.get_pixel(2, 2).0, RED);
    assert_eq!(img.get_pixel(1, 1).0, GREEN);
    assert_eq!(img.get_pixel(3, 0).0, RED);
    assert_eq!(img.get_pixel(4, 3).0, RED);
}

#[test]
fn plist_manifest_names_the_sheet_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("atlas.png");
    let plist = dir.path().join("atlas.plist");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("hero", solid(8, 8, RED)).expect("hero");
    sheet
        .save_with_manifest(&png, &plist, ManifestFormat::Plist)
        .expect("save");

    let text = std::fs::read_to_string(&plist).expect("plist");
    assert!(text.contains("<key>hero</key>"));
    assert!(text.contains("<string>{{0,0},{8,8}}</string>"));
    assert!(text.contains("<key>textureFileName</key><string>atlas.png</string>"));
}

#[test]
fn unwritable_manifest_path_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("sheet.png");
    let manifest = dir.path().join("missing_dir").join("sheet.json");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(2, 2, RED)).expect("a");
    match sheet.save_with_manifest(&png, &manifest, ManifestFormat::Array) {
        Err(SheetPackerError::Write { path, .. }) => assert_eq!(path, manifest),
        other => panic!("expected Write error, got {:?}", other.map(|s| s.image_path)),
    }
    // neither the sheet nor any staging file is left behind
    assert!(!png.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name())
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}

#[test]
fn failed_export_keeps_previous_sheet_intact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("sheet.png");
    std::fs::write(&png, b"previous sheet").expect("seed");

    // "sheet.png" exists as a file, so a manifest under it cannot be created
    let manifest = png.join("sheet.json");
    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(2, 2, RED)).expect("a");
    assert!(matches!(
        sheet.save_with_manifest(&png, &manifest, ManifestFormat::Hash),
        Err(SheetPackerError::Write { .. })
    ));
    assert_eq!(std::fs::read(&png).expect("read"), b"previous sheet");
}

#[test]
fn successful_save_leaves_only_the_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = dir.path().join("sheet.png");
    let json = dir.path().join("sheet.json");

    let mut sheet = Spritesheet::new(PackerConfig::default()).expect("sheet");
    sheet.add_image("a", solid(2, 2, RED)).expect("a");
    sheet
        .save_with_manifest(&png, &json, ManifestFormat::Hash)
        .expect("save");

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["sheet.json", "sheet.png"]);
}

#[test]
fn path_keys_use_forward_slashes() {
    assert_eq!(path_key(Path::new("sprites/hero.png")), "sprites/hero.png");
    assert_eq!(path_key(Path::new(r"sprites\enemy.png")), "sprites/enemy.png");
}
