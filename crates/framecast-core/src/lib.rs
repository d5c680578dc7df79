//! # framecast-core
//!
//! Core types shared by the framecast crates: colors, pixel buffers,
//! the transferable drawing surface and its 2D drawing context,
//! frame-timing timestamps, configuration and error types.

pub mod canvas;
pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod surface;
pub mod text;
pub mod time;

pub use config::*;

pub use canvas::Context2d;
pub use color::Color;
pub use error::{FramecastError, FramecastResult};
pub use frame::{FrameBuffer, PixelFormat};
pub use surface::{OffscreenSurface, Surface};
pub use text::{TextAlign, TextRenderer};
pub use time::Timestamp;
