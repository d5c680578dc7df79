//! Drawable surfaces and the one-way transfer of their drawing rights.
//!
//! A [`Surface`] is the document-bound side: it can hand out a 2D context
//! for foreground drawing, or give up its drawing rights exactly once via
//! [`Surface::transfer_control_to_offscreen`]. The returned
//! [`OffscreenSurface`] is move-only and `Send`, so it can be posted to a
//! background context. Both sides keep pointing at the same committed pixel
//! buffer, which is what stream capture reads.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::canvas::Context2d;
use crate::error::{FramecastError, FramecastResult};
use crate::frame::{FrameBuffer, PixelFormat};

/// Who currently holds drawing rights on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    /// Nobody has drawn yet; transfer is still possible.
    Unclaimed,
    /// The foreground acquired a context; transfer is no longer possible.
    Foreground,
    /// Drawing rights moved to an offscreen handle.
    Transferred,
}

pub(crate) struct SurfaceShared {
    width: u32,
    height: u32,
    control: Mutex<Control>,
    committed: RwLock<Arc<FrameBuffer>>,
    commits: watch::Sender<u64>,
}

impl SurfaceShared {
    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    /// Publish a fully drawn frame and bump the commit generation.
    pub(crate) fn commit(&self, frame: FrameBuffer) -> u64 {
        *self.committed.write() = Arc::new(frame);
        let mut generation = 0;
        self.commits.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        generation
    }
}

/// A document-bound drawable surface of fixed size.
///
/// Cloning yields another handle to the same surface, like holding two
/// references to one canvas element.
#[derive(Clone)]
pub struct Surface {
    shared: Arc<SurfaceShared>,
}

impl Surface {
    /// Create a surface whose committed buffer starts transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        let (commits, _) = watch::channel(0);
        Self {
            shared: Arc::new(SurfaceShared {
                width,
                height,
                control: Mutex::new(Control::Unclaimed),
                committed: RwLock::new(Arc::new(FrameBuffer::new(
                    width,
                    height,
                    PixelFormat::Rgba8,
                ))),
                commits,
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.shared.width
    }

    pub fn height(&self) -> u32 {
        self.shared.height
    }

    /// Acquire a 2D drawing context from the foreground.
    ///
    /// Fails with [`FramecastError::SurfaceTransferred`] once drawing rights
    /// have moved to an offscreen handle.
    pub fn get_context_2d(&self) -> FramecastResult<Context2d> {
        let mut control = self.shared.control.lock();
        if *control == Control::Transferred {
            return Err(FramecastError::SurfaceTransferred);
        }
        *control = Control::Foreground;
        Ok(Context2d::new(self.shared.clone()))
    }

    /// Move this surface's drawing rights into a transferable handle.
    ///
    /// One-shot and irreversible. Fails if a foreground context was already
    /// acquired or if the surface was transferred before.
    pub fn transfer_control_to_offscreen(&self) -> FramecastResult<OffscreenSurface> {
        let mut control = self.shared.control.lock();
        match *control {
            Control::Unclaimed => {
                *control = Control::Transferred;
                tracing::debug!(
                    width = self.shared.width,
                    height = self.shared.height,
                    "surface control transferred offscreen"
                );
                Ok(OffscreenSurface {
                    shared: self.shared.clone(),
                    context_acquired: false,
                })
            }
            Control::Foreground => Err(FramecastError::invalid_state(
                "cannot transfer a surface that already has a rendering context",
            )),
            Control::Transferred => Err(FramecastError::invalid_state(
                "surface control was already transferred",
            )),
        }
    }

    pub fn is_transferred(&self) -> bool {
        *self.shared.control.lock() == Control::Transferred
    }

    /// The last fully committed frame.
    pub fn snapshot(&self) -> Arc<FrameBuffer> {
        self.shared.committed.read().clone()
    }

    /// Number of frames committed so far.
    pub fn generation(&self) -> u64 {
        *self.shared.commits.borrow()
    }

    /// Subscribe to commit notifications; the value is the commit generation.
    pub fn subscribe_commits(&self) -> watch::Receiver<u64> {
        self.shared.commits.subscribe()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.shared.width)
            .field("height", &self.shared.height)
            .field("control", &*self.shared.control.lock())
            .finish()
    }
}

/// Exclusive drawing rights to a surface, detached from the document.
///
/// Not `Clone`: posting it to another context moves it.
pub struct OffscreenSurface {
    shared: Arc<SurfaceShared>,
    context_acquired: bool,
}

impl OffscreenSurface {
    pub fn width(&self) -> u32 {
        self.shared.width
    }

    pub fn height(&self) -> u32 {
        self.shared.height
    }

    /// Acquire the surface's single 2D drawing context.
    pub fn get_context_2d(&mut self) -> FramecastResult<Context2d> {
        if self.context_acquired {
            return Err(FramecastError::invalid_state(
                "a 2d context was already acquired for this offscreen surface",
            ));
        }
        self.context_acquired = true;
        Ok(Context2d::new(self.shared.clone()))
    }
}

impl fmt::Debug for OffscreenSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffscreenSurface")
            .field("width", &self.shared.width)
            .field("height", &self.shared.height)
            .field("context_acquired", &self.context_acquired)
            .finish()
    }
}
