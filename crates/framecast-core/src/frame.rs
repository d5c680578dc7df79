use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FramecastError, FramecastResult};

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel).
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// A raw pixel buffer backing a surface or a captured video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &crate::Color) -> Self {
        let pixel = color.to_rgba8();
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * self.format.bytes_per_pixel()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.data[offset..offset + 4]);
        Some(rgba)
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel();
        self.data[offset..offset + bpp].copy_from_slice(&rgba[..bpp]);
    }

    /// Source-over blend `rgba` onto the pixel at (x, y). No-op if out of bounds.
    pub fn blend_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let sa = rgba[3] as u32;
        if sa == 0 {
            return;
        }
        if sa == 255 {
            self.set_pixel(x, y, rgba);
            return;
        }
        let Some(d) = self.get_pixel(x, y) else {
            return;
        };

        let da = d[3] as u32;
        let inv_sa = 255 - sa;
        let out_a = sa + ((da * inv_sa) / 255);
        if out_a == 0 {
            return;
        }

        let mix = |s: u8, d: u8| -> u8 {
            ((s as u32 * sa * 255 + d as u32 * da * inv_sa) / (out_a * 255)) as u8
        };
        self.set_pixel(
            x,
            y,
            [
                mix(rgba[0], d[0]),
                mix(rgba[1], d[1]),
                mix(rgba[2], d[2]),
                out_a as u8,
            ],
        );
    }

    /// Overwrite every pixel in the half-open region with `rgba`.
    ///
    /// The region is clipped to the buffer bounds.
    pub fn fill_region(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgba: [u8; 4]) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        for y in y0..y1 {
            let start = self.offset(x0, y);
            let end = start + (x1 - x0) as usize * bpp;
            for px in self.data[start..end].chunks_exact_mut(bpp) {
                px.copy_from_slice(&rgba[..bpp]);
            }
        }
    }

    /// Copy the buffer into an `image::RgbaImage`.
    ///
    /// Returns None if the pixel data does not match the declared dimensions.
    pub fn to_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Encode the buffer as a PNG file.
    pub fn save_png(&self, path: &Path) -> FramecastResult<()> {
        let image = self.to_image().ok_or_else(|| {
            FramecastError::Render(format!(
                "pixel data does not match {}x{}",
                self.width, self.height
            ))
        })?;
        image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| FramecastError::Render(format!("failed to write {}: {}", path.display(), e)))
    }
}
