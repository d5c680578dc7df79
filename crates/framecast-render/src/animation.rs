//! The hue-cycling rectangle animation.
//!
//! Pure functions of the frame timestamp and surface size, plus
//! [`draw_scene`] which paints one complete frame into a context.

use framecast_core::{
    Color, Context2d, FramecastError, FramecastResult, RenderConfig, TextAlign, TextRenderer,
    Timestamp,
};

/// Hue in whole degrees: `floor(t / 10 % 360)`. Period is 3600 ms.
pub fn hue_at(timestamp: Timestamp) -> u32 {
    ((timestamp.as_millis() / 10.0) % 360.0).floor() as u32
}

/// Left edge of the rectangle: `sin(t / 1000) * w/4 + w/4`, always in `[0, w/2]`.
pub fn x_position(timestamp: Timestamp, width: u32) -> f64 {
    let quarter = width as f64 / 4.0;
    (timestamp.as_millis() / 1000.0).sin() * quarter + quarter
}

/// Placement of the animated rectangle for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Half the surface wide, a third tall, top edge a third of the way down.
pub fn rect_geometry(timestamp: Timestamp, width: u32, height: u32) -> RectGeometry {
    RectGeometry {
        x: x_position(timestamp, width),
        y: height as f64 / 3.0,
        width: width as f64 / 2.0,
        height: height as f64 / 3.0,
    }
}

/// Everything about a frame that does not depend on time.
#[derive(Debug, Clone)]
pub struct SceneStyle {
    pub background: Color,
    pub saturation: f32,
    pub lightness: f32,
    pub label: String,
    pub label_color: Color,
    pub font_size: f32,
    pub text: TextRenderer,
}

impl SceneStyle {
    /// Build the style from configuration, loading the label font.
    ///
    /// An explicit `font_path` that cannot be loaded is an error; without one
    /// the system fonts are probed and a missing font only drops the label.
    pub fn from_config(config: &RenderConfig) -> FramecastResult<Self> {
        let background = Color::from_hex(&config.background).map_err(|e| {
            FramecastError::InvalidArgument(format!("background {:?}: {}", config.background, e))
        })?;
        let text = match &config.font_path {
            Some(path) => TextRenderer::from_path(path)?,
            None => TextRenderer::system_default(),
        };
        Ok(Self {
            background,
            saturation: config.saturation,
            lightness: config.lightness,
            label: config.label.clone(),
            label_color: Color::WHITE,
            font_size: config.font_size,
            text,
        })
    }

    /// The hue-cycling fill color at `timestamp`.
    pub fn fill_color(&self, timestamp: Timestamp) -> Color {
        Color::from_hsl(hue_at(timestamp) as f32, self.saturation, self.lightness)
    }
}

impl Default for SceneStyle {
    fn default() -> Self {
        let config = RenderConfig::default();
        Self {
            background: Color::rgb(30.0 / 255.0, 30.0 / 255.0, 30.0 / 255.0),
            saturation: config.saturation,
            lightness: config.lightness,
            label: config.label,
            label_color: Color::WHITE,
            font_size: config.font_size,
            text: TextRenderer::empty(),
        }
    }
}

/// Paint one full frame into `ctx`. Does not commit.
pub fn draw_scene(ctx: &mut Context2d, style: &SceneStyle, timestamp: Timestamp) {
    let width = ctx.width();
    let height = ctx.height();
    let (w, h) = (width as f64, height as f64);

    ctx.clear_rect(0.0, 0.0, w, h);

    ctx.set_fill_style(style.background);
    ctx.fill_rect(0.0, 0.0, w, h);

    let rect = rect_geometry(timestamp, width, height);
    ctx.set_fill_style(style.fill_color(timestamp));
    ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);

    if !style.label.is_empty() {
        ctx.set_font_size(style.font_size);
        ctx.set_fill_style(style.label_color);
        ctx.set_text_align(TextAlign::Center);
        ctx.fill_text(&style.label, w / 2.0, h / 5.0);
    }
}
