//! The foreground coordinator.
//!
//! Resolves the document's elements, moves the canvas's drawing rights to a
//! background worker, captures the canvas as a stream, plays it in the video
//! element and writes the stream's metadata into the info panel.

use framecast_core::{FramecastConfig, FramecastError, FramecastResult};
use framecast_render::{AnimationFrameClock, FrameTiming, SceneStyle, Worker, WorkerMessage};

use crate::document::{CanvasElement, Document, InfoPanel, VideoElement};
use crate::info::StreamInfo;
use crate::stream::MediaStream;

pub struct Coordinator {
    canvas: CanvasElement,
    video: VideoElement,
    info: InfoPanel,
    worker: Worker,
    stream: Option<MediaStream>,
}

impl Coordinator {
    /// Set up the pipeline with a refresh-rate clock from the config.
    ///
    /// Must be called inside a tokio runtime (stream capture spawns tasks).
    pub fn new(document: &Document, config: &FramecastConfig) -> FramecastResult<Self> {
        let clock = AnimationFrameClock::new(config.render.refresh_rate)?;
        Self::with_clock(document, config, Box::new(clock))
    }

    /// Set up the pipeline, driving the worker with `clock`.
    pub fn with_clock(
        document: &Document,
        config: &FramecastConfig,
        clock: Box<dyn FrameTiming>,
    ) -> FramecastResult<Self> {
        let selectors = &config.document;
        let canvas = document
            .query_canvas(&selectors.canvas_selector)
            .ok_or_else(|| FramecastError::missing_element(&selectors.canvas_selector))?;
        let video = document
            .query_video(&selectors.video_selector)
            .ok_or_else(|| FramecastError::missing_element(&selectors.video_selector))?;
        let info = document
            .query_div(&selectors.info_selector)
            .ok_or_else(|| FramecastError::missing_element(&selectors.info_selector))?;

        // Load the label font before giving up the canvas.
        let style = SceneStyle::from_config(&config.render)?;
        let worker = Self::initialize(&canvas, style, clock)?;

        let mut coordinator = Self {
            canvas,
            video,
            info,
            worker,
            stream: None,
        };
        coordinator.capture_stream(config.stream.frame_rate)?;
        Ok(coordinator)
    }

    /// Transfer the canvas to a freshly spawned worker. Runs once, at
    /// construction.
    fn initialize(
        canvas: &CanvasElement,
        style: SceneStyle,
        clock: Box<dyn FrameTiming>,
    ) -> FramecastResult<Worker> {
        let offscreen = canvas.transfer_control_to_offscreen()?;
        let worker = Worker::spawn(style, clock)?;
        worker.post_message(WorkerMessage::with_canvas(offscreen))?;
        tracing::info!(
            width = canvas.width(),
            height = canvas.height(),
            "canvas control handed to worker"
        );
        Ok(worker)
    }

    /// Capture the canvas, play it in the video element and describe it.
    ///
    /// A playback rejection is logged and leaves the video paused.
    pub fn capture_stream(&mut self, frame_rate: Option<f64>) -> FramecastResult<MediaStream> {
        let stream = self.canvas.capture_stream(frame_rate)?;

        self.video.set_src_object(Some(stream.clone()));
        if let Err(e) = self.video.play() {
            tracing::error!(error = %e, "video playback failed");
        }

        if let Some(previous) = self.stream.replace(stream.clone()) {
            for track in previous.get_video_tracks() {
                track.stop();
            }
        }
        self.describe_stream();
        Ok(stream)
    }

    /// Summarize the stream's first video track into the info panel.
    pub fn describe_stream(&self) -> StreamInfo {
        let info = match &self.stream {
            Some(stream) => StreamInfo::from_stream(stream),
            None => StreamInfo::NoVideoTrack,
        };
        if matches!(info, StreamInfo::NoVideoTrack) {
            tracing::warn!("stream has no video track");
        }
        self.info.set_inner_html(info.to_html());
        info
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn canvas(&self) -> &CanvasElement {
        &self.canvas
    }

    pub fn video(&self) -> &VideoElement {
        &self.video
    }

    pub fn info(&self) -> &InfoPanel {
        &self.info
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// Pause playback, end the capture and stop the worker.
    pub fn shutdown(&mut self) {
        self.video.pause();
        if let Some(stream) = &self.stream {
            for track in stream.get_video_tracks() {
                track.stop();
            }
        }
        self.worker.terminate();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("canvas", &self.canvas)
            .field("video", &self.video)
            .field("worker", &self.worker)
            .field("stream", &self.stream.as_ref().map(|s| s.id().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::info::NO_VIDEO_TRACK_HTML;
    use framecast_render::ManualFrameClock;

    fn manual() -> Box<dyn FrameTiming> {
        Box::new(ManualFrameClock::new().0)
    }

    #[tokio::test]
    async fn test_missing_elements_are_fatal() {
        let config = FramecastConfig::default();
        for selector in ["canvas#my-canvas", "video#my-video", "div#mediaStreamInfo"] {
            let mut document = Document::standard(&config);
            document.remove(selector);
            let err = Coordinator::with_clock(&document, &config, manual()).unwrap_err();
            match err {
                FramecastError::MissingElement { selector: missing } => {
                    assert_eq!(missing, selector)
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_initialize_transfers_canvas() {
        let config = FramecastConfig::default();
        let document = Document::standard(&config);
        let coordinator = Coordinator::with_clock(&document, &config, manual()).unwrap();

        let canvas = document.query_canvas("canvas#my-canvas").unwrap();
        assert!(canvas.surface().is_transferred());
        assert!(matches!(
            canvas.get_context_2d(),
            Err(FramecastError::SurfaceTransferred)
        ));
        assert!(!coordinator.video().paused());
        assert!(coordinator.info().inner_html().contains("640x480"));
    }

    #[tokio::test]
    async fn test_autoplay_rejection_is_not_fatal() {
        let mut config = FramecastConfig::default();
        config.playback.autoplay_allowed = false;
        let document = Document::standard(&config);
        let coordinator = Coordinator::with_clock(&document, &config, manual()).unwrap();

        assert!(coordinator.video().paused());
        assert!(coordinator.stream().is_some());
        assert!(coordinator.info().inner_html().contains("30 FPS"));
    }

    #[tokio::test]
    async fn test_describe_without_tracks() {
        let config = FramecastConfig::default();
        let document = Document::standard(&config);
        let coordinator = Coordinator::with_clock(&document, &config, manual()).unwrap();

        let stream = coordinator.stream().unwrap().clone();
        let id = stream.get_video_tracks()[0].id().to_string();
        stream.remove_track(&id);

        assert_eq!(coordinator.describe_stream(), StreamInfo::NoVideoTrack);
        assert_eq!(coordinator.info().inner_html(), NO_VIDEO_TRACK_HTML);
    }

    #[tokio::test]
    async fn test_custom_selectors() {
        let mut config = FramecastConfig::default();
        config.document.video_selector = "video#preview".to_string();
        let mut document = Document::standard(&config);
        assert!(document.query_video("video#preview").is_some());
        document.insert("video#my-video", Element::Div(InfoPanel::new()));

        assert!(Coordinator::with_clock(&document, &config, manual()).is_ok());
    }

    #[tokio::test]
    async fn test_recapture_without_frame_rate() {
        let config = FramecastConfig::default();
        let document = Document::standard(&config);
        let mut coordinator = Coordinator::with_clock(&document, &config, manual()).unwrap();
        let first = coordinator.stream().unwrap().get_video_tracks().remove(0);

        coordinator.capture_stream(None).unwrap();
        assert_eq!(first.ready_state(), crate::stream::TrackState::Ended);
        assert!(coordinator.info().inner_html().contains("N/A FPS"));
        match coordinator.describe_stream() {
            StreamInfo::Track(info) => assert_eq!(info.frame_rate, None),
            other => panic!("expected a track, got {:?}", other),
        }
    }
}
