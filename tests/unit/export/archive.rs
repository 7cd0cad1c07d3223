use super::*;
use std::sync::{Arc, Mutex};
use std::io::Read as _;

use crate::config::TimelineConfig;
use crate::export::job::{ExportSlots, NoProgress};
use crate::foundation::core::PixelSize;
use crate::render::raster::Rasterizer;
use crate::sequence::engine::PrecomputedEngine;
use crate::sequence::store::SceneStore;

struct Fixture {
    store: SceneStore,
    rasterizer: Rasterizer,
    slots: ExportSlots,
    config: TimelineConfig,
}

impl Fixture {
    fn new(scenes: Vec<String>) -> Self {
        let store = SceneStore::new();
        store.initialize(1, 1).unwrap();
        store
            .run(&mut PrecomputedEngine::new(scenes), 1, 1, &[0u8; 4])
            .unwrap();
        Self {
            store,
            rasterizer: Rasterizer::new(PixelSize::new(8, 8).unwrap()),
            slots: ExportSlots::new(),
            config: TimelineConfig::default(),
        }
    }

    fn ctx(&self) -> ExportContext<'_> {
        ExportContext {
            store: &self.store,
            rasterizer: &self.rasterizer,
            slots: &self.slots,
            config: &self.config,
            basename: "frames",
            stamp: None,
        }
    }
}

fn tiny(step: u32) -> String {
    let g = (step * 2) % 256;
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="3" height="2"><rect width="3" height="2" fill="rgb(0,{g},0)"/></svg>"#
    )
}

#[test]
fn entry_names_are_zero_padded_to_frame_count_width() {
    assert_eq!(archive_entry_name(7, 120), "frames/frame_007.png");
    assert_eq!(archive_entry_name(120, 120), "frames/frame_120.png");
    assert_eq!(archive_entry_name(3, 9), "frames/frame_3.png");
    assert_eq!(archive_entry_name(10, 10), "frames/frame_10.png");
}

#[test]
fn yield_interval_is_ceiling_of_fraction() {
    assert_eq!(yield_interval(120, 0.05), 6);
    assert_eq!(yield_interval(7, 0.05), 1);
    assert_eq!(yield_interval(21, 0.05), 2);
    assert_eq!(yield_interval(0, 0.05), 1);
}

#[test]
fn archive_holds_every_frame_in_order() {
    let fx = Fixture::new((1..=120).map(tiny).collect());
    let mut reports = Vec::new();
    let mut sink = |_: ExportKind, f: f32| reports.push(f);
    let art = pollster::block_on(export_archive(&fx.ctx(), &mut sink)).unwrap();
    assert_eq!(art.mime, "application/zip");
    assert!(art.file_name.ends_with(".zip"));

    let mut zip = zip::ZipArchive::new(Cursor::new(art.bytes)).unwrap();
    assert_eq!(zip.len(), 121);
    assert!(zip.by_index(0).unwrap().is_dir());
    for i in 1..=120u32 {
        let mut entry = zip.by_index(i as usize).unwrap();
        assert_eq!(entry.name(), archive_entry_name(i, 120));
        let mut png = Vec::new();
        entry.read_to_end(&mut png).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(1, 1).0, [0, ((i * 2) % 256) as u8, 0, 255]);
    }

    // 120 frames yield every 6: 20 mid-run reports, then completion.
    assert_eq!(reports.len(), 21);
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(reports.last(), Some(&1.0));
}

#[test]
fn later_frames_are_scaled_to_first_frame_size() {
    let big = r#"<svg xmlns="http://www.w3.org/2000/svg" width="6" height="4"><rect width="6" height="4" fill="red"/></svg>"#;
    let fx = Fixture::new(vec![tiny(1), big.to_string()]);
    let art = pollster::block_on(export_archive(&fx.ctx(), &mut NoProgress)).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(art.bytes)).unwrap();
    let mut png = Vec::new();
    zip.by_name("frames/frame_2.png")
        .unwrap()
        .read_to_end(&mut png)
        .unwrap();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
}

#[test]
fn broken_frame_fails_whole_archive() {
    let mut scenes: Vec<String> = (1..=5).map(tiny).collect();
    scenes[3] = "not a scene".to_string();
    let fx = Fixture::new(scenes);
    let err = pollster::block_on(export_archive(&fx.ctx(), &mut NoProgress)).unwrap_err();
    assert!(matches!(err, TimelineError::Rasterization(_)));
}

#[test]
fn rerun_mid_export_is_stale() {
    let fx = Fixture::new((1..=40).map(tiny).collect());
    let store = fx.store.clone();
    let mut sink = |_: ExportKind, f: f32| {
        if f > 0.2 && store.frame_count() == 40 {
            store
                .run(&mut PrecomputedEngine::new(vec![tiny(1)]), 1, 1, &[0u8; 4])
                .unwrap();
        }
    };
    let err = pollster::block_on(export_archive(&fx.ctx(), &mut sink)).unwrap_err();
    assert!(matches!(err, TimelineError::StaleSequence { .. }));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a plain-text fmt subscriber and return what it logged.
fn with_captured_logs<T>(level: tracing::Level, f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
    (out, text)
}

#[test]
fn archive_logs_yields_and_completion() {
    let fx = Fixture::new((1..=10).map(tiny).collect());
    let (result, logs) = with_captured_logs(tracing::Level::DEBUG, || {
        pollster::block_on(export_archive(&fx.ctx(), &mut NoProgress))
    });
    assert!(result.is_ok());
    // 10 frames at 5% yield after every frame.
    let yields = logs
        .lines()
        .filter(|l| l.contains("DEBUG") && l.contains("yield"))
        .count();
    assert_eq!(yields, 10);
    let done = logs
        .lines()
        .find(|l| l.contains("export finished"))
        .unwrap_or_else(|| panic!("no completion event in:\n{logs}"));
    assert!(done.contains("INFO"));
    assert!(done.contains("kind=archive"));
    assert!(done.contains("frames=10"));
}
