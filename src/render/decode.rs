use std::sync::{Arc, LazyLock};

use anyhow::Context as _;
use resvg::tiny_skia;

use crate::sequence::scene::SceneDescription;

/// A scene decoded into something drawable.
pub enum DecodedScene {
    /// Parsed SVG tree.
    Vector(usvg::Tree),
    /// Raster image, premultiplied.
    Raster(tiny_skia::Pixmap),
}

impl std::fmt::Debug for DecodedScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vector(tree) => f
                .debug_struct("Vector")
                .field("width", &tree.size().width())
                .field("height", &tree.size().height())
                .finish(),
            Self::Raster(p) => f
                .debug_struct("Raster")
                .field("width", &p.width())
                .field("height", &p.height())
                .finish(),
        }
    }
}

/// One strategy for turning a scene description into a [`DecodedScene`].
///
/// The rasterizer tries its paths in order; every path must draw well-formed input identically.
pub trait DecodePath {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Decode `scene`.
    fn decode(&self, scene: &SceneDescription) -> anyhow::Result<DecodedScene>;
}

static SYSTEM_FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "system fonts loaded");
    Arc::new(db)
});

/// Process-wide font database, loaded from the system on first use.
pub fn system_fonts() -> Arc<usvg::fontdb::Database> {
    Arc::clone(&SYSTEM_FONTS)
}

fn svg_options(fontdb: Arc<usvg::fontdb::Database>) -> usvg::Options<'static> {
    usvg::Options {
        fontdb,
        ..usvg::Options::default()
    }
}

/// Fast path: parse the scene text directly as an SVG document.
pub struct FastSvgPath {
    opts: usvg::Options<'static>,
}

impl FastSvgPath {
    /// Fast path resolving text against `fontdb`.
    pub fn with_fonts(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self {
            opts: svg_options(fontdb),
        }
    }
}

impl Default for FastSvgPath {
    fn default() -> Self {
        Self::with_fonts(system_fonts())
    }
}

impl DecodePath for FastSvgPath {
    fn name(&self) -> &'static str {
        "fast-svg"
    }

    fn decode(&self, scene: &SceneDescription) -> anyhow::Result<DecodedScene> {
        let tree = usvg::Tree::from_str(scene.as_str(), &self.opts).context("parse svg text")?;
        Ok(DecodedScene::Vector(tree))
    }
}

/// Fallback path: hand the scene bytes to a generic image loader.
///
/// Raster formats recognized by `image` are decoded as bitmaps; anything else goes through
/// the byte-level SVG loader.
pub struct GenericImagePath {
    opts: usvg::Options<'static>,
}

impl GenericImagePath {
    /// Fallback path resolving text against `fontdb`.
    pub fn with_fonts(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self {
            opts: svg_options(fontdb),
        }
    }
}

impl Default for GenericImagePath {
    fn default() -> Self {
        Self::with_fonts(system_fonts())
    }
}

impl DecodePath for GenericImagePath {
    fn name(&self) -> &'static str {
        "generic-image"
    }

    fn decode(&self, scene: &SceneDescription) -> anyhow::Result<DecodedScene> {
        let bytes = scene.as_bytes();
        if image::guess_format(bytes).is_ok() {
            let rgba = image::load_from_memory(bytes)
                .context("decode raster scene")?
                .to_rgba8();
            let (width, height) = rgba.dimensions();
            let mut data = rgba.into_raw();
            premultiply_rgba8_in_place(&mut data);
            let size = tiny_skia::IntSize::from_wh(width, height)
                .context("raster scene has zero size")?;
            let pixmap = tiny_skia::Pixmap::from_vec(data, size)
                .context("wrap raster scene pixels")?;
            return Ok(DecodedScene::Raster(pixmap));
        }

        let tree = usvg::Tree::from_data(bytes, &self.opts).context("load svg data")?;
        Ok(DecodedScene::Vector(tree))
    }
}

pub(crate) fn default_paths() -> Vec<Box<dyn DecodePath>> {
    let fonts = system_fonts();
    vec![
        Box::new(FastSvgPath::with_fonts(Arc::clone(&fonts))),
        Box::new(GenericImagePath::with_fonts(fonts)),
    ]
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/decode.rs"]
mod tests;
