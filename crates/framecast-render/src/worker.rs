//! The background execution context.
//!
//! A [`Worker`] owns a dedicated OS thread running its own single-threaded
//! tokio runtime. The only way in is [`Worker::post_message`]; nothing is
//! ever sent back. The renderer's state lives entirely on that thread.

use std::thread::JoinHandle;

use framecast_core::{FramecastError, FramecastResult, OffscreenSurface};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::animation::SceneStyle;
use crate::renderer::{RenderStats, Renderer};
use crate::scheduler::FrameTiming;

const WORKER_THREAD_NAME: &str = "framecast-renderer";

/// A message posted to the worker.
///
/// The surface travels under the `canvas` field; messages without it are
/// ignored by the worker.
#[derive(Debug, Default)]
pub struct WorkerMessage {
    pub canvas: Option<OffscreenSurface>,
}

impl WorkerMessage {
    pub fn with_canvas(canvas: OffscreenSurface) -> Self {
        Self {
            canvas: Some(canvas),
        }
    }
}

/// Handle to a running background renderer.
pub struct Worker {
    inbox: Option<mpsc::UnboundedSender<WorkerMessage>>,
    cancel: CancellationToken,
    stats: RenderStats,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread with its renderer and frame clock.
    pub fn spawn(style: SceneStyle, clock: Box<dyn FrameTiming>) -> FramecastResult<Self> {
        let (inbox, messages) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let stats = RenderStats::default();

        let scope = WorkerScope {
            renderer: Renderer::with_stats(style, stats.clone()),
            clock,
            messages,
            cancel: cancel.clone(),
        };

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to start worker runtime");
                        return;
                    }
                };
                runtime.block_on(scope.run());
            })?;

        tracing::debug!(thread = WORKER_THREAD_NAME, "worker spawned");
        Ok(Self {
            inbox: Some(inbox),
            cancel,
            stats,
            thread: Some(thread),
        })
    }

    /// Post a message to the worker. Ownership of any surface moves with it.
    pub fn post_message(&self, message: WorkerMessage) -> FramecastResult<()> {
        let inbox = self
            .inbox
            .as_ref()
            .ok_or_else(|| FramecastError::invalid_state("worker was terminated"))?;
        inbox
            .send(message)
            .map_err(|_| FramecastError::invalid_state("worker is no longer running"))
    }

    /// Render counters published by the worker.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the worker's event loop and wait for its thread to exit.
    pub fn terminate(&mut self) {
        self.cancel.cancel();
        self.inbox = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("terminated", &self.is_terminated())
            .field("frames_rendered", &self.stats.frames_rendered())
            .finish()
    }
}

/// State living on the worker thread.
struct WorkerScope {
    renderer: Renderer,
    clock: Box<dyn FrameTiming>,
    messages: mpsc::UnboundedReceiver<WorkerMessage>,
    cancel: CancellationToken,
}

impl WorkerScope {
    async fn run(mut self) {
        let mut inbox_open = true;
        loop {
            let frame_pending = self.clock.pending() > 0;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                message = self.messages.recv(), if inbox_open => match message {
                    Some(message) => self.handle_message(message),
                    None => inbox_open = false,
                },
                tick = self.clock.next_tick(), if frame_pending => {
                    if let Err(e) = self.renderer.on_tick(&tick, self.clock.as_mut()) {
                        tracing::error!(error = %e, "frame render failed");
                    }
                }
            }
        }

        self.renderer.stop_loop(self.clock.as_mut());
        tracing::info!(
            frames = self.renderer.stats().frames_rendered(),
            "worker stopped"
        );
    }

    fn handle_message(&mut self, message: WorkerMessage) {
        let Some(canvas) = message.canvas else {
            tracing::debug!("ignoring worker message without a canvas");
            return;
        };
        match self.renderer.receive_surface(canvas, self.clock.as_mut()) {
            Ok(()) => tracing::info!("worker received offscreen surface and started rendering"),
            Err(FramecastError::SurfaceAlreadyReceived) => {
                tracing::warn!("worker already owns a surface; ignoring the new one")
            }
            Err(e) => tracing::error!(error = %e, "worker could not take the surface"),
        }
    }
}
