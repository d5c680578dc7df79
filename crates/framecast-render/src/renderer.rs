//! The background renderer: owns the transferred surface and runs the
//! self-rescheduling animation loop on a [`FrameTiming`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use framecast_core::{Context2d, FramecastError, FramecastResult, OffscreenSurface, Timestamp};

use crate::animation::{draw_scene, SceneStyle};
use crate::scheduler::{FrameRequestId, FrameTick, FrameTiming};

/// Read-only render counters, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    frames_rendered: AtomicU64,
    last_timestamp_bits: AtomicU64,
}

impl RenderStats {
    pub fn frames_rendered(&self) -> u64 {
        self.inner.frames_rendered.load(Ordering::Acquire)
    }

    /// Timestamp of the most recent frame, if any frame was rendered.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        (self.frames_rendered() > 0).then(|| {
            Timestamp::from_millis(f64::from_bits(
                self.inner.last_timestamp_bits.load(Ordering::Acquire),
            ))
        })
    }

    fn record(&self, timestamp: Timestamp) {
        self.inner
            .last_timestamp_bits
            .store(timestamp.as_millis().to_bits(), Ordering::Release);
        self.inner.frames_rendered.fetch_add(1, Ordering::AcqRel);
    }
}

/// Animation state for one background context.
///
/// Holds the offscreen surface, its drawing context, the running flag and the
/// id of the currently scheduled frame request.
pub struct Renderer {
    style: SceneStyle,
    surface: Option<OffscreenSurface>,
    context: Option<Context2d>,
    running: AtomicBool,
    animation_frame_id: Option<FrameRequestId>,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(style: SceneStyle) -> Self {
        Self::with_stats(style, RenderStats::default())
    }

    pub fn with_stats(style: SceneStyle, stats: RenderStats) -> Self {
        Self {
            style,
            surface: None,
            context: None,
            running: AtomicBool::new(false),
            animation_frame_id: None,
            stats,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn animation_frame_id(&self) -> Option<FrameRequestId> {
        self.animation_frame_id
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Take ownership of a transferred surface and start the loop.
    ///
    /// Only the first handle is accepted; later ones are rejected with
    /// [`FramecastError::SurfaceAlreadyReceived`] and dropped, leaving the
    /// running loop untouched.
    pub fn receive_surface(
        &mut self,
        mut surface: OffscreenSurface,
        timing: &mut dyn FrameTiming,
    ) -> FramecastResult<()> {
        if self.surface.is_some() {
            return Err(FramecastError::SurfaceAlreadyReceived);
        }

        let mut context = surface.get_context_2d()?;
        context.set_text_renderer(self.style.text.clone());
        if !context.has_font() && !self.style.label.is_empty() {
            tracing::warn!("no font available; the label will not be drawn");
        }

        tracing::debug!(
            width = surface.width(),
            height = surface.height(),
            "renderer acquired 2d context"
        );
        self.surface = Some(surface);
        self.context = Some(context);
        self.start_loop(timing);
        Ok(())
    }

    /// Start the redraw loop. Returns false if it was already running or no
    /// surface has been received yet.
    pub fn start_loop(&mut self, timing: &mut dyn FrameTiming) -> bool {
        if self.context.is_none() {
            return false;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.animation_frame_id = Some(timing.request_frame());
        true
    }

    /// Clear the running flag and cancel the scheduled frame.
    pub fn stop_loop(&mut self, timing: &mut dyn FrameTiming) {
        self.running.store(false, Ordering::Release);
        if let Some(id) = self.animation_frame_id.take() {
            timing.cancel_frame(id);
        }
    }

    /// Dispatch one refresh: every fired request runs one frame.
    pub fn on_tick(&mut self, tick: &FrameTick, timing: &mut dyn FrameTiming) -> FramecastResult<()> {
        for _ in &tick.callbacks {
            self.render_frame(tick.timestamp, timing)?;
        }
        Ok(())
    }

    /// Draw and commit one frame, then request the next one while running.
    pub fn render_frame(
        &mut self,
        timestamp: Timestamp,
        timing: &mut dyn FrameTiming,
    ) -> FramecastResult<()> {
        if !self.is_running() {
            return Ok(());
        }
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| FramecastError::invalid_state("running without a drawing context"))?;

        draw_scene(context, &self.style, timestamp);
        context.commit();
        self.stats.record(timestamp);

        // Keep a single scheduled request when called outside a tick.
        if let Some(previous) = self.animation_frame_id.take() {
            timing.cancel_frame(previous);
        }
        self.animation_frame_id = if self.is_running() {
            Some(timing.request_frame())
        } else {
            None
        };
        Ok(())
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("surface", &self.surface)
            .field("running", &self.is_running())
            .field("animation_frame_id", &self.animation_frame_id)
            .field("frames_rendered", &self.stats.frames_rendered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualFrameClock;
    use framecast_core::Surface;

    fn renderer() -> Renderer {
        Renderer::new(SceneStyle::default())
    }

    #[test]
    fn test_no_frames_before_surface() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let mut renderer = renderer();

        assert!(!renderer.start_loop(&mut clock));
        assert_eq!(clock.pending(), 0);

        renderer.render_frame(Timestamp::from_millis(16.0), &mut clock).unwrap();
        assert_eq!(renderer.stats().frames_rendered(), 0);
        assert!(renderer.stats().last_timestamp().is_none());
    }

    #[test]
    fn test_receive_surface_starts_loop() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let surface = Surface::new(64, 48);
        let mut renderer = renderer();

        renderer
            .receive_surface(surface.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();
        assert!(renderer.is_running());
        assert!(renderer.has_surface());
        assert_eq!(clock.pending(), 1);
        assert!(renderer.animation_frame_id().is_some());
    }

    #[test]
    fn test_start_loop_idempotent() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let surface = Surface::new(64, 48);
        let mut renderer = renderer();
        renderer
            .receive_surface(surface.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();

        assert!(!renderer.start_loop(&mut clock));
        assert!(!renderer.start_loop(&mut clock));
        assert_eq!(clock.pending(), 1);
    }

    #[tokio::test]
    async fn test_one_frame_per_tick() {
        let (mut clock, handle) = ManualFrameClock::new();
        let surface = Surface::new(64, 48);
        let mut renderer = renderer();
        renderer
            .receive_surface(surface.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();
        renderer.start_loop(&mut clock);

        for t in [16.0, 33.0, 50.0] {
            handle.tick(t);
            let tick = clock.next_tick().await;
            renderer.on_tick(&tick, &mut clock).unwrap();
            assert_eq!(clock.pending(), 1);
        }
        assert_eq!(renderer.stats().frames_rendered(), 3);
        assert_eq!(surface.generation(), 3);
        assert_eq!(
            renderer.stats().last_timestamp(),
            Some(Timestamp::from_millis(50.0))
        );
    }

    #[test]
    fn test_second_surface_rejected() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let first = Surface::new(64, 48);
        let second = Surface::new(32, 32);
        let mut renderer = renderer();
        renderer
            .receive_surface(first.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();

        let err = renderer
            .receive_surface(second.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap_err();
        assert!(matches!(err, FramecastError::SurfaceAlreadyReceived));
        assert_eq!(clock.pending(), 1);
        assert!(renderer.is_running());
    }

    #[test]
    fn test_render_frame_commits_to_original_surface() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let surface = Surface::new(640, 480);
        let mut renderer = renderer();
        renderer
            .receive_surface(surface.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();

        renderer.render_frame(Timestamp::zero(), &mut clock).unwrap();
        assert_eq!(clock.pending(), 1);
        let frame = surface.snapshot();
        assert_eq!(frame.get_pixel(0, 0), Some([30, 30, 30, 255]));
        assert_eq!(frame.get_pixel(320, 240), Some([217, 38, 38, 255]));
    }

    #[test]
    fn test_direct_render_keeps_single_request() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let surface = Surface::new(16, 16);
        let mut renderer = renderer();
        renderer
            .receive_surface(surface.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();
        let first = renderer.animation_frame_id();

        for t in [0.0, 16.0, 33.0] {
            renderer.render_frame(Timestamp::from_millis(t), &mut clock).unwrap();
            assert_eq!(clock.pending(), 1);
        }
        assert_ne!(renderer.animation_frame_id(), first);
        assert_eq!(renderer.stats().frames_rendered(), 3);
    }

    #[test]
    fn test_stop_loop_cancels_pending_frame() {
        let (mut clock, _handle) = ManualFrameClock::new();
        let surface = Surface::new(16, 16);
        let mut renderer = renderer();
        renderer
            .receive_surface(surface.transfer_control_to_offscreen().unwrap(), &mut clock)
            .unwrap();

        renderer.stop_loop(&mut clock);
        assert!(!renderer.is_running());
        assert_eq!(clock.pending(), 0);

        renderer.render_frame(Timestamp::from_millis(16.0), &mut clock).unwrap();
        assert_eq!(renderer.stats().frames_rendered(), 0);
        assert_eq!(clock.pending(), 0);

        assert!(renderer.start_loop(&mut clock));
        assert_eq!(clock.pending(), 1);
    }
}
