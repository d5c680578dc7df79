use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::FramecastResult;

/// Size of the document canvas.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Selectors the coordinator resolves once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub canvas_selector: String,
    pub video_selector: String,
    pub info_selector: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            canvas_selector: "canvas#my-canvas".to_string(),
            video_selector: "video#my-video".to_string(),
            info_selector: "div#mediaStreamInfo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Nominal capture rate in frames per second. `None` captures on every
    /// committed frame and leaves the track's frame rate unreported.
    pub frame_rate: Option<f64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_rate: Some(30.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Display refresh rate driving the animation-frame clock, in Hz.
    pub refresh_rate: f64,
    pub label: String,
    pub font_size: f32,
    /// Explicit font file for the label; system fonts are probed otherwise.
    pub font_path: Option<PathBuf>,
    pub background: String,
    pub saturation: f32,
    pub lightness: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 60.0,
            label: "Rendering in Worker!".to_string(),
            font_size: 48.0,
            font_path: None,
            background: "#1e1e1e".to_string(),
            saturation: 0.7,
            lightness: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Whether the host lets the video element start playing without a
    /// user gesture.
    pub autoplay_allowed: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay_allowed: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FramecastConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl FramecastConfig {
    pub fn load_from_file(path: &Path) -> FramecastResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> FramecastResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn save_to_file(&self, path: &Path) -> FramecastResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
