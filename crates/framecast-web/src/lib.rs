//! # framecast-web
//!
//! The foreground side of framecast: a document of canvas, video and info
//! elements, canvas stream capture, and the [`Coordinator`] that hands the
//! canvas to a background worker and plays back what it draws.

pub mod coordinator;
pub mod document;
pub mod info;
pub mod stream;

pub use coordinator::Coordinator;
pub use document::{CanvasElement, Document, Element, InfoPanel, PlaybackError, VideoElement};
pub use info::{StreamInfo, TrackInfo};
pub use stream::{capture_surface, MediaStream, TrackSettings, TrackState, VideoFrame, VideoTrack};
