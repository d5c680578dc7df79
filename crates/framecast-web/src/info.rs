//! Human-readable stream metadata for the info panel.

use serde::Serialize;

use crate::stream::MediaStream;

/// Where frames are produced; shown verbatim in the panel.
pub const RENDERING_LOCATION: &str = "Offloaded to Web Worker via OffscreenCanvas";

/// Panel contents when the stream carries no video track.
pub const NO_VIDEO_TRACK_HTML: &str = "<p>Error: No video tracks found in the MediaStream.</p>";

/// Shown in place of a frame rate the track does not report.
pub const FRAME_RATE_FALLBACK: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub rendering: &'static str,
    pub id: String,
    pub frame_rate: Option<f64>,
    pub width: u32,
    pub height: u32,
}

impl TrackInfo {
    /// Frame rate as displayed: `N/A` when missing or zero.
    pub fn frame_rate_label(&self) -> String {
        match self.frame_rate {
            Some(rate) if rate > 0.0 => rate.to_string(),
            _ => FRAME_RATE_FALLBACK.to_string(),
        }
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StreamInfo {
    Track(TrackInfo),
    NoVideoTrack,
}

impl StreamInfo {
    /// Describe the first video track of `stream`.
    pub fn from_stream(stream: &MediaStream) -> Self {
        match stream.get_video_tracks().first() {
            Some(track) => {
                let settings = track.get_settings();
                StreamInfo::Track(TrackInfo {
                    rendering: RENDERING_LOCATION,
                    id: track.id().to_string(),
                    frame_rate: settings.frame_rate,
                    width: settings.width,
                    height: settings.height,
                })
            }
            None => StreamInfo::NoVideoTrack,
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            StreamInfo::Track(info) => format!(
                "<h4>MediaStream (Video Track) Details - Offloaded Rendering!</h4>\n\
                 <ul>\n    \
                 <li><strong>Rendering:</strong> {}</li>\n    \
                 <li><strong>ID:</strong> {}</li>\n    \
                 <li><strong>Frame Rate:</strong> {} FPS</li>\n    \
                 <li><strong>Resolution:</strong> {}</li>\n\
                 </ul>",
                info.rendering,
                escape_html(&info.id),
                info.frame_rate_label(),
                info.resolution(),
            ),
            StreamInfo::NoVideoTrack => NO_VIDEO_TRACK_HTML.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(frame_rate: Option<f64>) -> StreamInfo {
        StreamInfo::Track(TrackInfo {
            rendering: RENDERING_LOCATION,
            id: "track-1".to_string(),
            frame_rate,
            width: 640,
            height: 480,
        })
    }

    #[test]
    fn test_no_track_is_exact_error() {
        let html = StreamInfo::from_stream(&MediaStream::new()).to_html();
        assert_eq!(html, "<p>Error: No video tracks found in the MediaStream.</p>");
        assert!(!html.contains("ID:"));
        assert!(!html.contains("Resolution:"));
    }

    #[test]
    fn test_track_html() {
        let expected = "<h4>MediaStream (Video Track) Details - Offloaded Rendering!</h4>\n\
<ul>\n    \
<li><strong>Rendering:</strong> Offloaded to Web Worker via OffscreenCanvas</li>\n    \
<li><strong>ID:</strong> track-1</li>\n    \
<li><strong>Frame Rate:</strong> 30 FPS</li>\n    \
<li><strong>Resolution:</strong> 640x480</li>\n\
</ul>";
        assert_eq!(info(Some(30.0)).to_html(), expected);
    }

    #[test]
    fn test_frame_rate_fallback() {
        assert!(info(None).to_html().contains("<strong>Frame Rate:</strong> N/A FPS"));
        assert!(info(Some(0.0)).to_html().contains("N/A FPS"));
        assert!(info(Some(29.97)).to_html().contains("29.97 FPS"));
    }

    #[test]
    fn test_id_is_escaped() {
        let html = StreamInfo::Track(TrackInfo {
            rendering: RENDERING_LOCATION,
            id: "<b>&".to_string(),
            frame_rate: None,
            width: 1,
            height: 1,
        })
        .to_html();
        assert!(html.contains("&lt;b&gt;&amp;"));
    }

    #[test]
    fn test_json() {
        let json = info(Some(30.0)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "track");
        assert_eq!(value["width"], 640);
        let value: serde_json::Value =
            serde_json::from_str(&StreamInfo::NoVideoTrack.to_json().unwrap()).unwrap();
        assert_eq!(value["status"], "no_video_track");
    }
}
