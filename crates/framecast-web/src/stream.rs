//! Media streams captured from a surface.
//!
//! Capture reads the surface's committed buffer, which sits beneath the
//! drawing-rights boundary: a transferred surface still captures whatever
//! the offscreen owner commits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framecast_core::{FrameBuffer, FramecastError, FramecastResult, Surface};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Settings reported by a video track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    /// Nominal capture rate; absent when capturing on every commit.
    pub frame_rate: Option<f64>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    Live,
    Ended,
}

/// One captured frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 1-based capture sequence number within the track.
    pub sequence: u64,
    /// Time since capture started.
    pub captured_at: Duration,
    pub buffer: Arc<FrameBuffer>,
}

struct TrackInner {
    id: String,
    label: String,
    settings: TrackSettings,
    frames: Arc<watch::Sender<Option<VideoFrame>>>,
    captured: Arc<AtomicU64>,
    stop: CancellationToken,
}

impl Drop for TrackInner {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// A live video track fed by a capture sampler task.
///
/// Clones share the same track; the sampler stops when the track is stopped
/// or the last clone is dropped.
#[derive(Clone)]
pub struct VideoTrack {
    inner: Arc<TrackInner>,
}

impl VideoTrack {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> &'static str {
        "video"
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn get_settings(&self) -> TrackSettings {
        self.inner.settings.clone()
    }

    pub fn ready_state(&self) -> TrackState {
        if self.inner.stop.is_cancelled() {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }

    /// End the track. Idempotent.
    pub fn stop(&self) {
        if !self.inner.stop.is_cancelled() {
            tracing::debug!(track = %self.inner.id, "video track stopped");
        }
        self.inner.stop.cancel();
    }

    pub fn frames_captured(&self) -> u64 {
        self.inner.captured.load(Ordering::Acquire)
    }

    pub fn latest_frame(&self) -> Option<VideoFrame> {
        self.inner.frames.borrow().clone()
    }

    /// Wait for a frame newer than sequence `after`. None once the track ends.
    pub async fn next_frame(&self, after: u64) -> Option<VideoFrame> {
        let mut frames = self.inner.frames.subscribe();
        let newer = async {
            frames
                .wait_for(|f| f.as_ref().is_some_and(|f| f.sequence > after))
                .await
                .ok()
                .and_then(|f| f.clone())
        };
        tokio::select! {
            _ = self.inner.stop.cancelled() => None,
            frame = newer => frame,
        }
    }
}

impl std::fmt::Debug for VideoTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTrack")
            .field("id", &self.inner.id)
            .field("settings", &self.inner.settings)
            .field("state", &self.ready_state())
            .field("frames_captured", &self.frames_captured())
            .finish()
    }
}

/// A set of tracks. Clones share the same track list.
#[derive(Clone, Debug)]
pub struct MediaStream {
    id: String,
    tracks: Arc<Mutex<Vec<VideoTrack>>>,
}

impl MediaStream {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get_video_tracks(&self) -> Vec<VideoTrack> {
        self.tracks.lock().clone()
    }

    pub fn add_track(&self, track: VideoTrack) {
        let mut tracks = self.tracks.lock();
        if !tracks.iter().any(|t| t.id() == track.id()) {
            tracks.push(track);
        }
    }

    /// Remove a track by id, returning it if it was part of the stream.
    pub fn remove_track(&self, id: &str) -> Option<VideoTrack> {
        let mut tracks = self.tracks.lock();
        let index = tracks.iter().position(|t| t.id() == id)?;
        Some(tracks.remove(index))
    }

    /// True while any track is live.
    pub fn active(&self) -> bool {
        self.tracks
            .lock()
            .iter()
            .any(|t| t.ready_state() == TrackState::Live)
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture a live stream with one video track from `surface`.
///
/// With a frame rate the surface is sampled on that interval; without one a
/// frame is captured on every commit. Frames only flow once the surface has
/// committed content. Must be called inside a tokio runtime.
pub fn capture_surface(surface: &Surface, frame_rate: Option<f64>) -> FramecastResult<MediaStream> {
    if let Some(rate) = frame_rate {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(FramecastError::InvalidArgument(format!(
                "capture frame rate must be a positive number of frames per second, got {}",
                rate
            )));
        }
    }
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
        FramecastError::invalid_state("stream capture needs a running tokio runtime")
    })?;

    let (frames, _) = watch::channel(None);
    let inner = Arc::new(TrackInner {
        id: uuid::Uuid::new_v4().to_string(),
        label: "canvas".to_string(),
        settings: TrackSettings {
            frame_rate,
            width: surface.width(),
            height: surface.height(),
        },
        frames: Arc::new(frames),
        captured: Arc::new(AtomicU64::new(0)),
        stop: CancellationToken::new(),
    });

    let sampler = Sampler {
        surface: surface.clone(),
        frames: inner.frames.clone(),
        captured: inner.captured.clone(),
        started: Instant::now(),
    };
    runtime.spawn(sampler.run(frame_rate, inner.stop.clone()));

    tracing::info!(
        track = %inner.id,
        width = inner.settings.width,
        height = inner.settings.height,
        frame_rate = ?frame_rate,
        "canvas capture started"
    );

    let stream = MediaStream::new();
    stream.add_track(VideoTrack { inner });
    Ok(stream)
}

struct Sampler {
    surface: Surface,
    frames: Arc<watch::Sender<Option<VideoFrame>>>,
    captured: Arc<AtomicU64>,
    started: Instant,
}

impl Sampler {
    async fn run(self, frame_rate: Option<f64>, stop: CancellationToken) {
        match frame_rate {
            Some(rate) => {
                let period = Duration::from_secs_f64(1.0 / rate);
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = interval.tick() => self.sample(),
                    }
                }
            }
            None => {
                let mut commits = self.surface.subscribe_commits();
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        changed = commits.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            self.sample();
                        }
                    }
                }
            }
        }
        tracing::debug!(frames = self.captured.load(Ordering::Acquire), "capture sampler exited");
    }

    fn sample(&self) {
        if self.surface.generation() == 0 {
            return;
        }
        let sequence = self.captured.fetch_add(1, Ordering::AcqRel) + 1;
        self.frames.send_replace(Some(VideoFrame {
            sequence,
            captured_at: self.started.elapsed(),
            buffer: self.surface.snapshot(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framecast_core::Color;

    fn paint(surface: &Surface, color: Color) {
        let mut ctx = surface.get_context_2d().unwrap();
        ctx.set_fill_style(color);
        ctx.fill_rect(0.0, 0.0, surface.width() as f64, surface.height() as f64);
        ctx.commit();
    }

    #[tokio::test]
    async fn test_capture_reports_settings() {
        let surface = Surface::new(640, 480);
        let stream = capture_surface(&surface, Some(30.0)).unwrap();
        let tracks = stream.get_video_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].kind(), "video");
        assert_eq!(
            tracks[0].get_settings(),
            TrackSettings {
                frame_rate: Some(30.0),
                width: 640,
                height: 480
            }
        );
        assert_eq!(tracks[0].ready_state(), TrackState::Live);
        assert!(stream.active());
    }

    #[tokio::test]
    async fn test_capture_rejects_bad_frame_rate() {
        let surface = Surface::new(4, 4);
        for rate in [0.0, -30.0, f64::NAN] {
            assert!(matches!(
                capture_surface(&surface, Some(rate)),
                Err(FramecastError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_capture_needs_runtime() {
        let surface = Surface::new(4, 4);
        assert!(matches!(
            capture_surface(&surface, None),
            Err(FramecastError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_capture_on_commit() {
        let surface = Surface::new(4, 4);
        let stream = capture_surface(&surface, None).unwrap();
        let track = stream.get_video_tracks().remove(0);
        assert!(track.latest_frame().is_none());

        paint(&surface, Color::RED);
        let frame = tokio::time::timeout(Duration::from_secs(5), track.next_frame(0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.buffer.get_pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(track.get_settings().frame_rate, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_capture_sees_transferred_surface() {
        let surface = Surface::new(4, 4);
        let mut offscreen = surface.transfer_control_to_offscreen().unwrap();
        let stream = capture_surface(&surface, Some(30.0)).unwrap();
        let track = stream.get_video_tracks().remove(0);

        let mut ctx = offscreen.get_context_2d().unwrap();
        ctx.set_fill_style(Color::BLUE);
        ctx.fill_rect(0.0, 0.0, 4.0, 4.0);
        ctx.commit();

        let frame = track.next_frame(0).await.unwrap();
        assert_eq!(frame.buffer.get_pixel(3, 3), Some([0, 0, 255, 255]));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let captured = track.frames_captured();
        assert!((29..=32).contains(&captured), "captured {} frames", captured);
    }

    #[tokio::test]
    async fn test_stop_ends_track() {
        let surface = Surface::new(4, 4);
        let stream = capture_surface(&surface, None).unwrap();
        let track = stream.get_video_tracks().remove(0);
        track.stop();
        track.stop();
        assert_eq!(track.ready_state(), TrackState::Ended);
        assert!(!stream.active());
        assert!(track.next_frame(0).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_track_shared_between_clones() {
        let surface = Surface::new(4, 4);
        let stream = capture_surface(&surface, Some(30.0)).unwrap();
        let alias = stream.clone();
        let id = stream.get_video_tracks()[0].id().to_string();

        assert!(alias.remove_track(&id).is_some());
        assert!(stream.get_video_tracks().is_empty());
        assert!(stream.remove_track(&id).is_none());
    }
}
