//! A minimal 2D drawing context over a surface's back buffer.
//!
//! Drawing happens on a private back buffer; [`Context2d::commit`] publishes
//! it to the surface so readers only ever see complete frames.

use std::sync::Arc;

use crate::color::Color;
use crate::frame::{FrameBuffer, PixelFormat};
use crate::surface::SurfaceShared;
use crate::text::{TextAlign, TextRenderer};

pub struct Context2d {
    surface: Arc<SurfaceShared>,
    back: FrameBuffer,
    fill_style: Color,
    font_size: f32,
    text_align: TextAlign,
    text: TextRenderer,
}

impl Context2d {
    pub(crate) fn new(surface: Arc<SurfaceShared>) -> Self {
        let back = FrameBuffer::new(surface.width(), surface.height(), PixelFormat::Rgba8);
        Self {
            surface,
            back,
            fill_style: Color::BLACK,
            font_size: 10.0,
            text_align: TextAlign::Left,
            text: TextRenderer::empty(),
        }
    }

    pub fn width(&self) -> u32 {
        self.back.width
    }

    pub fn height(&self) -> u32 {
        self.back.height
    }

    pub fn fill_style(&self) -> Color {
        self.fill_style
    }

    pub fn set_fill_style(&mut self, color: Color) {
        self.fill_style = color;
    }

    /// Set the font size in pixels used by [`Context2d::fill_text`].
    pub fn set_font_size(&mut self, px: f32) {
        if px.is_finite() && px > 0.0 {
            self.font_size = px;
        }
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.text_align = align;
    }

    /// Install the font used for text drawing.
    pub fn set_text_renderer(&mut self, text: TextRenderer) {
        self.text = text;
    }

    pub fn has_font(&self) -> bool {
        self.text.has_font()
    }

    /// Reset the rectangle to transparent black.
    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if let Some((x0, y0, x1, y1)) = self.pixel_bounds(x, y, w, h) {
            self.back.fill_region(x0, y0, x1, y1, [0, 0, 0, 0]);
        }
    }

    /// Fill the rectangle with the current fill style.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let Some((x0, y0, x1, y1)) = self.pixel_bounds(x, y, w, h) else {
            return;
        };
        let rgba = self.fill_style.to_rgba8();
        if rgba[3] == 255 {
            self.back.fill_region(x0, y0, x1, y1, rgba);
            return;
        }
        for py in y0..y1 {
            for px in x0..x1 {
                self.back.blend_pixel(px, py, rgba);
            }
        }
    }

    /// Draw text with its alphabetic baseline at `y`, aligned around `x`.
    ///
    /// No-op when no font is installed.
    pub fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.text.draw_line(
            &mut self.back,
            text,
            x as f32,
            y as f32,
            self.font_size,
            &self.fill_style,
            self.text_align,
        );
    }

    /// The frame currently being drawn (not yet visible to readers).
    pub fn back_buffer(&self) -> &FrameBuffer {
        &self.back
    }

    /// Publish the back buffer to the surface. Returns the commit generation.
    pub fn commit(&mut self) -> u64 {
        self.surface.commit(self.back.clone())
    }

    /// Round a rectangle to pixel-center coverage, clipped to the buffer.
    fn pixel_bounds(&self, x: f64, y: f64, w: f64, h: f64) -> Option<(u32, u32, u32, u32)> {
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (left, right) = if w < 0.0 { (x + w, x) } else { (x, x + w) };
        let (top, bottom) = if h < 0.0 { (y + h, y) } else { (y, y + h) };

        let clamp_x = |v: f64| v.round().clamp(0.0, self.back.width as f64) as u32;
        let clamp_y = |v: f64| v.round().clamp(0.0, self.back.height as f64) as u32;
        let (x0, x1) = (clamp_x(left), clamp_x(right));
        let (y0, y1) = (clamp_y(top), clamp_y(bottom));
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

impl std::fmt::Debug for Context2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context2d")
            .field("width", &self.back.width)
            .field("height", &self.back.height)
            .field("fill_style", &self.fill_style)
            .field("font_size", &self.font_size)
            .field("text_align", &self.text_align)
            .finish()
    }
}
