use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

/// Font files tried when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// The one display font the engine renders lyrics with.
///
/// Loading is best-effort: without a font the engine keeps running on fallback metrics and draws
/// no glyphs.
#[derive(Clone)]
pub struct FontBook {
    source: Option<PathBuf>,
    bytes: Option<Arc<Vec<u8>>>,
    font: Option<vello_cpu::peniko::FontData>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("source", &self.source)
            .field("bytes", &self.bytes.as_ref().map(|b| b.len()))
            .finish()
    }
}

impl FontBook {
    /// Font book with no font (fallback metrics only).
    pub fn empty() -> Self {
        Self {
            source: None,
            bytes: None,
            font: None,
        }
    }

    /// Load `configured` if given, else the first readable system candidate.
    pub fn load(configured: Option<&Path>) -> Self {
        let mut tried: Vec<PathBuf> = Vec::new();
        if let Some(p) = configured {
            tried.push(p.to_path_buf());
        }
        tried.extend(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in &tried {
            match read_font(path) {
                Ok(bytes) => {
                    tracing::debug!(font = %path.display(), "font loaded");
                    return Self::from_bytes(bytes, Some(path.clone()));
                }
                Err(e) if configured.is_some_and(|c| c == path) => {
                    tracing::warn!(error = %format!("{e:#}"), "configured font unavailable");
                }
                Err(_) => {}
            }
        }
        tracing::warn!("no font could be loaded; using fallback text metrics");
        Self::empty()
    }

    /// Wrap font bytes already in memory.
    pub fn from_bytes(bytes: Vec<u8>, source: Option<PathBuf>) -> Self {
        let bytes = Arc::new(bytes);
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
            0,
        );
        Self {
            source,
            bytes: Some(bytes),
            font: Some(font),
        }
    }

    /// Raw font bytes, if a font is loaded.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref().map(Vec::as_slice)
    }

    /// Font handle for glyph drawing.
    pub fn font_data(&self) -> Option<&vello_cpu::peniko::FontData> {
        self.font.as_ref()
    }

    /// Where the font came from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Return `true` when a font is loaded.
    pub fn is_loaded(&self) -> bool {
        self.font.is_some()
    }
}

fn read_font(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
    if bytes.len() < 12 {
        anyhow::bail!("font '{}' is too small to be a font file", path.display());
    }
    Ok(bytes)
}
