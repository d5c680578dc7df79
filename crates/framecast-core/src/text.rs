//! Text rasterization for the 2D drawing context.
//! Uses fontdue for CPU-based glyph rendering.
//!
//! No font is embedded: a font is loaded from an explicit path or from a
//! short list of well-known system locations. Without one, text drawing is a
//! no-op and callers can check [`TextRenderer::has_font`].

use std::path::Path;
use std::sync::Arc;

use fontdue::{Font, FontSettings};

use crate::error::{FramecastError, FramecastResult};
use crate::frame::FrameBuffer;
use crate::Color;

/// System font locations probed by [`TextRenderer::system_default`].
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Text horizontal alignment relative to the anchor x coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Measurements for a single line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMeasure {
    /// Total advance width.
    pub width: i32,
    /// Max ascent (above baseline).
    pub ascent: i32,
    /// Max descent (below baseline).
    pub descent: i32,
}

/// Rasterizes single lines of text into a FrameBuffer.
#[derive(Clone, Default)]
pub struct TextRenderer {
    font: Option<Arc<Font>>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("has_font", &self.has_font())
            .finish()
    }
}

impl TextRenderer {
    /// A renderer with no font; all text drawing is skipped.
    pub fn empty() -> Self {
        Self { font: None }
    }

    /// Parse a font from raw TrueType/OpenType bytes.
    pub fn from_bytes(data: &[u8]) -> FramecastResult<Self> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| FramecastError::Render(format!("failed to parse font: {}", e)))?;
        Ok(Self {
            font: Some(Arc::new(font)),
        })
    }

    /// Load a font from a file path.
    pub fn from_path(path: &Path) -> FramecastResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data).map_err(|e| {
            FramecastError::Render(format!("{} ({})", e, path.display()))
        })
    }

    /// Load the first parseable font from the well-known system locations.
    pub fn system_default() -> Self {
        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::from_path(path) {
                Ok(renderer) => {
                    tracing::debug!(font = %path.display(), "loaded system font");
                    return renderer;
                }
                Err(e) => tracing::debug!(font = %path.display(), error = %e, "skipping font"),
            }
        }
        Self::empty()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Measure a single line of text. Returns None without a font.
    pub fn measure(&self, text: &str, font_size: f32) -> Option<LineMeasure> {
        let font = self.font.as_deref()?;
        let mut total_width: i32 = 0;
        let mut max_ascent: i32 = 0;
        let mut max_descent: i32 = 0;

        for ch in text.chars() {
            let metrics = font.metrics(ch, font_size);
            max_ascent = max_ascent.max(metrics.height as i32 + metrics.ymin);
            max_descent = max_descent.max(-metrics.ymin);
            total_width += metrics.advance_width.round() as i32;
        }

        Some(LineMeasure {
            width: total_width,
            ascent: max_ascent,
            descent: max_descent,
        })
    }

    /// Draw a line of text with its alphabetic baseline at `baseline_y`.
    ///
    /// `x` is interpreted according to `align`. Glyph coverage is
    /// source-over blended onto `fb`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &self,
        fb: &mut FrameBuffer,
        text: &str,
        x: f32,
        baseline_y: f32,
        font_size: f32,
        color: &Color,
        align: TextAlign,
    ) {
        let (Some(font), Some(measure)) = (self.font.as_deref(), self.measure(text, font_size))
        else {
            return;
        };

        let start_x = match align {
            TextAlign::Left => x.round() as i32,
            TextAlign::Center => (x - measure.width as f32 / 2.0).round() as i32,
            TextAlign::Right => (x - measure.width as f32).round() as i32,
        };
        let baseline = baseline_y.round() as i32;
        let [r, g, b, a] = color.to_rgba8();
        let mut cursor_x = start_x;

        for ch in text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, font_size);
            let glyph_x = cursor_x + metrics.xmin;
            let glyph_y = baseline - (metrics.height as i32 + metrics.ymin);

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let px = glyph_x + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 {
                        continue;
                    }
                    let alpha = (coverage as u32 * a as u32 / 255) as u8;
                    fb.blend_pixel(px as u32, py as u32, [r, g, b, alpha]);
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;

    #[test]
    fn test_empty_renderer_draws_nothing() {
        let renderer = TextRenderer::empty();
        let mut fb = FrameBuffer::new(64, 32, PixelFormat::Rgba8);
        renderer.draw_line(&mut fb, "Hi", 32.0, 20.0, 16.0, &Color::WHITE, TextAlign::Center);
        assert!(fb.data.iter().all(|&b| b == 0));
        assert!(renderer.measure("Hi", 16.0).is_none());
    }

    #[test]
    fn test_invalid_font_bytes() {
        assert!(TextRenderer::from_bytes(b"definitely not a font").is_err());
    }

    #[test]
    fn test_missing_font_path() {
        let err = TextRenderer::from_path(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, FramecastError::Io(_)));
    }

    fn fixture_font() -> TextRenderer {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSans.ttf");
        TextRenderer::from_path(&path).unwrap()
    }

    fn lit_columns(fb: &FrameBuffer) -> Vec<u32> {
        (0..fb.width)
            .filter(|&x| (0..fb.height).any(|y| fb.get_pixel(x, y).is_some_and(|p| p[3] > 0)))
            .collect()
    }

    #[test]
    fn test_draws_centered() {
        let renderer = fixture_font();
        let mut fb = FrameBuffer::new(200, 60, PixelFormat::Rgba8);
        renderer.draw_line(&mut fb, "MM", 100.0, 40.0, 24.0, &Color::WHITE, TextAlign::Center);

        let lit = lit_columns(&fb);
        assert!(!lit.is_empty(), "text should produce visible pixels");
        let (min_x, max_x) = (lit[0], lit[lit.len() - 1]);
        let center = (min_x + max_x) as i32 / 2;
        assert!((center - 100).abs() <= 4, "text should be centered, got {}", center);
    }

    #[test]
    fn test_left_and_right_alignment() {
        let renderer = fixture_font();
        let width = renderer.measure("Hi", 20.0).unwrap().width;
        assert!(width > 0);

        let mut left = FrameBuffer::new(120, 40, PixelFormat::Rgba8);
        renderer.draw_line(&mut left, "Hi", 60.0, 30.0, 20.0, &Color::WHITE, TextAlign::Left);
        assert!(lit_columns(&left).iter().all(|&x| x >= 58));

        let mut right = FrameBuffer::new(120, 40, PixelFormat::Rgba8);
        renderer.draw_line(&mut right, "Hi", 60.0, 30.0, 20.0, &Color::WHITE, TextAlign::Right);
        assert!(lit_columns(&right).iter().all(|&x| x <= 62));
    }

    #[test]
    fn test_glyphs_sit_on_baseline() {
        let renderer = fixture_font();
        let mut fb = FrameBuffer::new(100, 60, PixelFormat::Rgba8);
        renderer.draw_line(&mut fb, "HH", 10.0, 40.0, 24.0, &Color::WHITE, TextAlign::Left);
        let lit_rows: Vec<u32> = (0..fb.height)
            .filter(|&y| (0..fb.width).any(|x| fb.get_pixel(x, y).is_some_and(|p| p[3] > 0)))
            .collect();
        assert!(lit_rows.iter().all(|&y| y <= 40), "no descenders in 'HH'");
        assert!(lit_rows[0] < 30, "cap height should rise above the baseline");
    }
}
