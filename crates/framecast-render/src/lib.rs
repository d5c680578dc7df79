//! # framecast-render
//!
//! The background side of framecast: a worker thread that receives a
//! transferred surface and keeps redrawing it on every display refresh.

pub mod animation;
pub mod renderer;
pub mod scheduler;
pub mod worker;

pub use animation::{draw_scene, hue_at, x_position, SceneStyle};
pub use renderer::{RenderStats, Renderer};
pub use scheduler::{
    AnimationFrameClock, FrameRequestId, FrameTick, FrameTiming, ManualClockHandle,
    ManualFrameClock,
};
pub use worker::{Worker, WorkerMessage};
