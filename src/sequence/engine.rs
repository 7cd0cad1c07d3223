use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{TimelineError, TimelineResult};

/// Input handed to an [`OptimizationEngine`] for one run.
#[derive(Clone, Copy, Debug)]
pub struct RunRequest<'a> {
    /// Engine-defined algorithm selector (e.g. greedy, annealing).
    pub algorithm_id: u32,
    /// Number of rectangles the final frame should contain.
    pub target_count: u32,
    /// Source image dimensions.
    pub size: PixelSize,
    /// Source pixels, straight RGBA8, `size.rgba_len()` bytes.
    pub rgba: &'a [u8],
}

/// The external rectangle-fitting engine.
///
/// A run returns every intermediate state as an SVG document, in step order.
pub trait OptimizationEngine {
    /// Run the engine to completion.
    fn run(&mut self, req: &RunRequest<'_>) -> anyhow::Result<Vec<String>>;
}

impl<F> OptimizationEngine for F
where
    F: FnMut(&RunRequest<'_>) -> anyhow::Result<Vec<String>>,
{
    fn run(&mut self, req: &RunRequest<'_>) -> anyhow::Result<Vec<String>> {
        self(req)
    }
}

/// Engine stand-in that replays a fixed list of scenes.
///
/// Used to drive the timeline from previously captured engine output.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedEngine {
    scenes: Vec<String>,
}

impl PrecomputedEngine {
    /// Replay `scenes` on every run.
    pub fn new(scenes: Vec<String>) -> Self {
        Self { scenes }
    }

    /// Load captured output: a JSON array of SVG strings, or a directory of `.svg` files
    /// replayed in file-name order.
    pub fn from_path(path: &Path) -> TimelineResult<Self> {
        if path.is_dir() {
            return Self::from_svg_dir(path);
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene list '{}'", path.display()))?;
        let scenes: Vec<String> = serde_json::from_str(&text).map_err(|e| {
            TimelineError::validation(format!(
                "scene list '{}' must be a JSON array of strings: {e}",
                path.display()
            ))
        })?;
        Ok(Self::new(scenes))
    }

    fn from_svg_dir(dir: &Path) -> TimelineResult<Self> {
        let mut paths = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("read dir '{}'", dir.display()))?
        {
            let p = entry
                .with_context(|| format!("read dir entry in '{}'", dir.display()))?
                .path();
            let is_svg = p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
            if p.is_file() && is_svg {
                paths.push(p);
            }
        }
        paths.sort();

        let mut scenes = Vec::with_capacity(paths.len());
        for p in paths {
            scenes.push(
                std::fs::read_to_string(&p)
                    .with_context(|| format!("read scene '{}'", p.display()))?,
            );
        }
        Ok(Self::new(scenes))
    }

    /// Number of scenes replayed per run.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the replay list is empty.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl OptimizationEngine for PrecomputedEngine {
    fn run(&mut self, _req: &RunRequest<'_>) -> anyhow::Result<Vec<String>> {
        Ok(self.scenes.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/engine.rs"]
mod tests;
