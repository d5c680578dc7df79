//! An in-process stand-in for the host document: selector-addressed
//! canvas, video and info-panel elements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use framecast_core::{
    Context2d, FramecastConfig, FramecastResult, OffscreenSurface, Surface,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::stream::{capture_surface, MediaStream, TrackState};

/// Why `VideoElement::play` refused to start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("play() failed because the user didn't interact with the document first")]
    NotAllowed,

    #[error("the element has no supported source")]
    NoSource,

    #[error("playback needs a running tokio runtime")]
    NoRuntime,
}

/// A `<canvas>` element backed by a [`Surface`].
#[derive(Clone, Debug)]
pub struct CanvasElement {
    surface: Surface,
}

impl CanvasElement {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Surface::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn get_context_2d(&self) -> FramecastResult<Context2d> {
        self.surface.get_context_2d()
    }

    pub fn transfer_control_to_offscreen(&self) -> FramecastResult<OffscreenSurface> {
        self.surface.transfer_control_to_offscreen()
    }

    pub fn capture_stream(&self, frame_rate: Option<f64>) -> FramecastResult<MediaStream> {
        capture_surface(&self.surface, frame_rate)
    }
}

struct VideoInner {
    autoplay_allowed: bool,
    src: Mutex<Option<MediaStream>>,
    presenter: Mutex<Option<CancellationToken>>,
    playing: AtomicBool,
    presented: Arc<AtomicU64>,
}

/// A `<video>` element that presents frames from its source stream.
#[derive(Clone)]
pub struct VideoElement {
    inner: Arc<VideoInner>,
}

impl VideoElement {
    pub fn new(autoplay_allowed: bool) -> Self {
        Self {
            inner: Arc::new(VideoInner {
                autoplay_allowed,
                src: Mutex::new(None),
                presenter: Mutex::new(None),
                playing: AtomicBool::new(false),
                presented: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Replace the source. Any current playback is paused.
    pub fn set_src_object(&self, stream: Option<MediaStream>) {
        self.pause();
        *self.inner.src.lock() = stream;
    }

    pub fn src_object(&self) -> Option<MediaStream> {
        self.inner.src.lock().clone()
    }

    /// Start presenting frames from the first video track of the source.
    ///
    /// Fails with [`PlaybackError::NoSource`] when that track has ended.
    pub fn play(&self) -> Result<(), PlaybackError> {
        if self.inner.playing.load(Ordering::Acquire) {
            return Ok(());
        }
        if !self.inner.autoplay_allowed {
            return Err(PlaybackError::NotAllowed);
        }
        let track = self
            .inner
            .src
            .lock()
            .as_ref()
            .and_then(|stream| stream.get_video_tracks().into_iter().next())
            .filter(|track| track.ready_state() == TrackState::Live)
            .ok_or(PlaybackError::NoSource)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PlaybackError::NoRuntime)?;

        let stop = CancellationToken::new();
        let presented = self.inner.presented.clone();
        let presenter_stop = stop.clone();
        runtime.spawn(async move {
            let mut last = 0;
            loop {
                let frame = tokio::select! {
                    _ = presenter_stop.cancelled() => break,
                    frame = track.next_frame(last) => frame,
                };
                let Some(frame) = frame else {
                    break;
                };
                last = frame.sequence;
                presented.fetch_add(1, Ordering::AcqRel);
            }
        });

        *self.inner.presenter.lock() = Some(stop);
        self.inner.playing.store(true, Ordering::Release);
        tracing::debug!("video playback started");
        Ok(())
    }

    pub fn pause(&self) {
        if let Some(stop) = self.inner.presenter.lock().take() {
            stop.cancel();
        }
        self.inner.playing.store(false, Ordering::Release);
    }

    pub fn paused(&self) -> bool {
        !self.inner.playing.load(Ordering::Acquire)
    }

    /// Frames presented since the element was created.
    pub fn frames_presented(&self) -> u64 {
        self.inner.presented.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for VideoElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoElement")
            .field("autoplay_allowed", &self.inner.autoplay_allowed)
            .field("paused", &self.paused())
            .field("frames_presented", &self.frames_presented())
            .finish()
    }
}

/// A `<div>` whose inner HTML displays stream metadata.
#[derive(Clone, Debug, Default)]
pub struct InfoPanel {
    inner_html: Arc<Mutex<String>>,
}

impl InfoPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_inner_html(&self, html: impl Into<String>) {
        *self.inner_html.lock() = html.into();
    }

    pub fn inner_html(&self) -> String {
        self.inner_html.lock().clone()
    }
}

#[derive(Clone, Debug)]
pub enum Element {
    Canvas(CanvasElement),
    Video(VideoElement),
    Div(InfoPanel),
}

/// Elements addressable by selector.
#[derive(Clone, Debug, Default)]
pub struct Document {
    elements: HashMap<String, Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page the coordinator expects: a canvas, a video and an info div
    /// under the configured selectors.
    pub fn standard(config: &FramecastConfig) -> Self {
        let mut document = Self::new();
        document.insert(
            &config.document.canvas_selector,
            Element::Canvas(CanvasElement::new(config.canvas.width, config.canvas.height)),
        );
        document.insert(
            &config.document.video_selector,
            Element::Video(VideoElement::new(config.playback.autoplay_allowed)),
        );
        document.insert(&config.document.info_selector, Element::Div(InfoPanel::new()));
        document
    }

    pub fn insert(&mut self, selector: &str, element: Element) -> Option<Element> {
        self.elements.insert(selector.to_string(), element)
    }

    pub fn remove(&mut self, selector: &str) -> Option<Element> {
        self.elements.remove(selector)
    }

    pub fn query_selector(&self, selector: &str) -> Option<&Element> {
        self.elements.get(selector)
    }

    pub fn query_canvas(&self, selector: &str) -> Option<CanvasElement> {
        match self.query_selector(selector)? {
            Element::Canvas(canvas) => Some(canvas.clone()),
            _ => None,
        }
    }

    pub fn query_video(&self, selector: &str) -> Option<VideoElement> {
        match self.query_selector(selector)? {
            Element::Video(video) => Some(video.clone()),
            _ => None,
        }
    }

    pub fn query_div(&self, selector: &str) -> Option<InfoPanel> {
        match self.query_selector(selector)? {
            Element::Div(panel) => Some(panel.clone()),
            _ => None,
        }
    }
}
