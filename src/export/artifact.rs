use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDateTime;

use crate::export::job::ExportKind;
use crate::foundation::error::TimelineResult;

/// Finished export: encoded bytes plus the name and MIME type to save them under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Which exporter produced it.
    pub kind: ExportKind,
    /// `<basename>_<YYYYMMDD_HHMMSS>.<ext>`
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime: &'static str,
    /// Encoded file contents.
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub(crate) fn new(kind: ExportKind, basename: &str, at: NaiveDateTime, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            file_name: export_file_name(basename, kind.extension(), at),
            mime: kind.mime(),
            bytes,
        }
    }

    /// Write `bytes` to `dir/file_name`, creating `dir` when missing.
    pub fn write_to_dir(&self, dir: &Path) -> TimelineResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("write export to '{}'", path.display()))?;
        Ok(path)
    }
}

/// Base name for exports derived from the source file name: the name with its last extension
/// removed, or `fallback` when there is no usable name.
pub fn export_basename(source_name: Option<&str>, fallback: &str) -> String {
    let Some(name) = source_name else {
        return fallback.to_string();
    };
    let file = Path::new(name)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(name);
    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    if stem.trim().is_empty() {
        fallback.to_string()
    } else {
        stem.to_string()
    }
}

/// `<basename>_<YYYYMMDD_HHMMSS>.<ext>`
pub fn export_file_name(basename: &str, ext: &str, at: NaiveDateTime) -> String {
    format!("{basename}_{}.{ext}", at.format("%Y%m%d_%H%M%S"))
}

/// Local wall-clock time used to stamp export names.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
#[path = "../../tests/unit/export/artifact.rs"]
mod tests;
