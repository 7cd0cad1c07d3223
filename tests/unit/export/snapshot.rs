use super::*;
use std::sync::{Arc, Mutex};
use crate::config::TimelineConfig;
use crate::export::job::{ExportSlots, NoProgress};
use crate::foundation::core::{PixelSize, Rgba8};
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
            basename: "shot",
            stamp: chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
                .and_then(|d| d.and_hms_opt(3, 4, 5)),
        }
    }
}

fn half_filled(i: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="6" height="4" data-step="{i}"><rect width="3" height="4" fill="blue"/></svg>"#
    )
}

#[test]
fn snapshot_is_png_over_background() {
    let fx = Fixture::new((1..=3).map(half_filled).collect());
    let art = pollster::block_on(export_snapshot(&fx.ctx(), 2, &mut NoProgress)).unwrap();

    assert_eq!(art.file_name, "shot_20250102_030405.png");
    assert_eq!(art.mime, "image/png");
    let img = image::load_from_memory(&art.bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (6, 4));
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
    // Uncovered half shows the opaque configured background, not transparency.
    assert_eq!(img.get_pixel(5, 3).0, [255, 255, 255, 255]);
}

#[test]
fn snapshot_honors_custom_background() {
    let mut fx = Fixture::new(vec![half_filled(1)]);
    fx.config.background = Rgba8::rgb(10, 20, 30);
    let art = pollster::block_on(export_snapshot(&fx.ctx(), 1, &mut NoProgress)).unwrap();
    let img = image::load_from_memory(&art.bytes).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(5, 0).0, [10, 20, 30, 255]);
}

#[test]
fn snapshot_progress_ends_at_one() {
    let fx = Fixture::new(vec![half_filled(1)]);
    let mut seen = Vec::new();
    let mut sink = |_: ExportKind, f: f32| seen.push(f);
    pollster::block_on(export_snapshot(&fx.ctx(), 1, &mut sink)).unwrap();
    assert_eq!(seen.last(), Some(&1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn snapshot_rejects_bad_step_and_empty_store() {
    let fx = Fixture::new(vec![half_filled(1)]);
    assert!(matches!(
        pollster::block_on(export_snapshot(&fx.ctx(), 2, &mut NoProgress)),
        Err(TimelineError::Validation(_))
    ));

    fx.store.reset();
    assert!(matches!(
        pollster::block_on(export_snapshot(&fx.ctx(), 1, &mut NoProgress)),
        Err(TimelineError::Validation(_))
    ));
    // The failed jobs released their slot.
    assert!(!fx.slots.is_busy(ExportKind::Snapshot));
}

#[test]
fn broken_scene_fails_with_rasterization() {
    let fx = Fixture::new(vec!["<svg".to_string()]);
    assert!(matches!(
        pollster::block_on(export_snapshot(&fx.ctx(), 1, &mut NoProgress)),
        Err(TimelineError::Rasterization(_))
    ));
}

#[test]
fn busy_slot_rejects_snapshot() {
    let fx = Fixture::new(vec![half_filled(1)]);
    let _held = fx.slots.try_begin(ExportKind::Snapshot).unwrap();
    assert!(matches!(
        pollster::block_on(export_snapshot(&fx.ctx(), 1, &mut NoProgress)),
        Err(TimelineError::Busy(ExportKind::Snapshot))
    ));
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
fn finished_snapshot_logs_info_inside_export_span() {
    let fx = Fixture::new(vec![half_filled(1), half_filled(2)]);
    let (result, logs) = with_captured_logs(tracing::Level::INFO, || {
        pollster::block_on(export_snapshot(&fx.ctx(), 2, &mut NoProgress))
    });
    assert!(result.is_ok());
    let line = logs
        .lines()
        .find(|l| l.contains("export finished"))
        .unwrap_or_else(|| panic!("no completion event in:\n{logs}"));
    assert!(line.contains("INFO"));
    assert!(line.contains("export_snapshot"));
    assert!(line.contains("kind=snapshot"));
    assert!(line.contains("step=2"));
}
