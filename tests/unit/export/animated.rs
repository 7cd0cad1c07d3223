use super::*;
use crate::config::TimelineConfig;
use crate::export::job::{ExportSlots, NoProgress};
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
    fn new(frames: u32) -> Self {
        let store = SceneStore::new();
        store.initialize(1, 1).unwrap();
        let scenes = (1..=frames).map(colored).collect();
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
            basename: "anim",
            stamp: None,
        }
    }
}

fn colored(step: u32) -> String {
    let shade = (step * 37) % 256;
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="5" height="3"><rect width="5" height="3" fill="rgb({shade},{shade},0)"/></svg>"#
    )
}

fn decode_delays(bytes: &[u8]) -> (u16, u16, Vec<u16>) {
    let mut opts = gif::DecodeOptions::new();
    opts.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = opts.read_info(bytes).unwrap();
    let (w, h) = (decoder.width(), decoder.height());
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    (w, h, delays)
}

#[test]
fn timing_follows_speed_hint() {
    // 1.2^10 ~= 6.19 steps per 2 s: every step kept, each shown ~323 ms.
    let t = AnimatedTiming::from_speed_hint(100.0, 3000).unwrap();
    assert_eq!(t.stride, 1);
    assert_eq!(t.delay_ms, 323);

    // 1.2^40 ~= 1469.77: stride round(73.49) = 73, delay round(73 * 2000 / 1469.77) = 99.
    let t = AnimatedTiming::from_speed_hint(400.0, 3000).unwrap();
    assert_eq!(t.stride, 73);
    assert_eq!(t.delay_ms, 99);

    assert!(AnimatedTiming::from_speed_hint(f64::INFINITY, 3000).is_err());
}

#[test]
fn last_frame_gets_final_hold() {
    let t = AnimatedTiming {
        stride: 2,
        delay_ms: 80,
        final_hold_ms: 3000,
    };
    assert_eq!(t.delay_for(0, 3), 80);
    assert_eq!(t.delay_for(2, 3), 3000);
    assert_eq!(t.delay_for(0, 1), 3000);
}

#[test]
fn sampling_always_ends_on_final_step() {
    assert_eq!(sample_steps(7, 3), vec![1, 4, 7]);
    assert_eq!(sample_steps(7, 2), vec![1, 3, 5, 7]);
    assert_eq!(sample_steps(8, 3), vec![1, 4, 7, 8]);
    assert_eq!(sample_steps(1, 5), vec![1]);
    assert_eq!(sample_steps(4, 0), vec![1, 2, 3, 4]);
    assert_eq!(sample_steps(10, 100), vec![1, 10]);
    assert!(sample_steps(0, 1).is_empty());
}

#[test]
fn delays_round_to_centiseconds() {
    assert_eq!(delay_centis(323), 32);
    assert_eq!(delay_centis(99), 10);
    assert_eq!(delay_centis(3000), 300);
    assert_eq!(delay_centis(0), 1);
    assert_eq!(delay_centis(u32::MAX), u16::MAX);
}

#[test]
fn gif_contains_sampled_frames_with_final_hold() {
    let mut fx = Fixture::new(10);
    // Small chunks so more than one parallel batch runs.
    fx.config.animated.chunk_frames = 3;

    let art = pollster::block_on(export_animated(&fx.ctx(), 100.0, &mut NoProgress)).unwrap();
    assert_eq!(art.mime, "image/gif");
    assert!(art.file_name.starts_with("anim_") && art.file_name.ends_with(".gif"));

    let (w, h, delays) = decode_delays(&art.bytes);
    assert_eq!((w, h), (5, 3));
    assert_eq!(delays.len(), 10);
    assert!(delays[..9].iter().all(|&d| d == 32));
    assert_eq!(delays[9], 300);
}

#[test]
fn single_frame_sequence_exports_one_held_frame() {
    let fx = Fixture::new(1);
    let art = pollster::block_on(export_animated(&fx.ctx(), 400.0, &mut NoProgress)).unwrap();
    let (_, _, delays) = decode_delays(&art.bytes);
    assert_eq!(delays, vec![300]);
}

#[test]
fn progress_is_monotonic_and_completes() {
    let fx = Fixture::new(6);
    let mut seen = Vec::new();
    let mut sink = |kind: ExportKind, f: f32| {
        assert_eq!(kind, ExportKind::Animated);
        seen.push(f);
    };
    pollster::block_on(export_animated(&fx.ctx(), 100.0, &mut sink)).unwrap();
    assert!(seen.len() > 2);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&1.0));
}

#[test]
fn reset_mid_export_is_stale() {
    let fx = Fixture::new(8);
    let store = fx.store.clone();
    let mut calls = 0;
    let mut sink = |_: ExportKind, _: f32| {
        calls += 1;
        if calls == 2 {
            store.reset();
        }
    };
    let err = pollster::block_on(export_animated(&fx.ctx(), 100.0, &mut sink)).unwrap_err();
    assert!(matches!(err, TimelineError::StaleSequence { .. }));
    assert!(!fx.slots.is_busy(ExportKind::Animated));
}

#[test]
fn final_hold_stays_longer_than_interior_delay() {
    // 1.2^-10 ~= 0.1615: every step kept, each shown round(2000 / 0.1615) = 12383 ms.
    let t = AnimatedTiming::from_speed_hint(-100.0, 3000).unwrap();
    assert_eq!(t.delay_ms, 12383);
    assert_eq!(t.final_hold_ms, 24766);

    let t = AnimatedTiming::from_speed_hint(100.0, 0).unwrap();
    assert_eq!(t.final_hold_ms, 646);
    assert!(t.final_hold_ms > t.delay_ms);
}

#[test]
fn zero_configured_hold_still_ends_on_longest_frame() {
    let mut fx = Fixture::new(4);
    fx.config.animated.final_hold_ms = 0;
    let art = pollster::block_on(export_animated(&fx.ctx(), 100.0, &mut NoProgress)).unwrap();
    let (_, _, delays) = decode_delays(&art.bytes);
    assert_eq!(delays, vec![32, 32, 32, 65]);
}
