use std::sync::{Arc, LazyLock};

use regex::Regex;

/// One frame of the animation: a self-contained SVG document produced by the engine.
///
/// Cloning is cheap; the text is shared.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SceneDescription(Arc<str>);

static SVG_ROOT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<svg\b[^>]*>").expect("valid svg root regex"));
static VIEW_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bviewBox\s*=\s*["']\s*0\s+0\s+([\d.]+)\s+([\d.]+)\s*["']"#)
        .expect("valid viewBox regex")
});
static WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)width\s*=\s*["']\s*([\d.]+)\s*(?:px)?\s*["']"#)
        .expect("valid width regex")
});
static HEIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)height\s*=\s*["']\s*([\d.]+)\s*(?:px)?\s*["']"#)
        .expect("valid height regex")
});

impl SceneDescription {
    /// Wrap scene text.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// Borrow the scene text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrow the scene text as an encoded blob.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Intrinsic size declared on the root `<svg>` element, rounded to whole pixels.
    ///
    /// A `viewBox="0 0 w h"` wins over `width`/`height` attributes. Returns `None` when the
    /// scene declares neither; a declared size may still round to zero.
    pub fn declared_size(&self) -> Option<(u32, u32)> {
        let root = SVG_ROOT_TAG.find(&self.0)?.as_str();

        let parse = |caps: regex::Captures<'_>| -> Option<(u32, u32)> {
            let w: f64 = caps.get(1)?.as_str().parse().ok()?;
            let h: f64 = caps.get(2)?.as_str().parse().ok()?;
            if !(w.is_finite() && h.is_finite()) {
                return None;
            }
            Some((w.round() as u32, h.round() as u32))
        };

        if let Some(size) = VIEW_BOX.captures(root).and_then(parse) {
            return Some(size);
        }

        let w: f64 = WIDTH.captures(root)?.get(1)?.as_str().parse().ok()?;
        let h: f64 = HEIGHT.captures(root)?.get(1)?.as_str().parse().ok()?;
        if !(w.is_finite() && h.is_finite()) {
            return None;
        }
        Some((w.round() as u32, h.round() as u32))
    }
}

impl From<String> for SceneDescription {
    fn from(text: String) -> Self {
        Self(Arc::from(text))
    }
}

impl From<&str> for SceneDescription {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/scene.rs"]
mod tests;
