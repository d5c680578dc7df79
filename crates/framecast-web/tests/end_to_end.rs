use std::time::Duration;

use framecast_core::{FramecastConfig, FramecastError};
use framecast_render::ManualFrameClock;
use framecast_web::{Coordinator, Document, StreamInfo};

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

#[tokio::test]
async fn test_offloaded_canvas_streams_640x480() {
    let config = FramecastConfig::default();
    let document = Document::standard(&config);
    let (clock, ticks) = ManualFrameClock::new();
    let coordinator = Coordinator::with_clock(&document, &config, Box::new(clock)).unwrap();

    // Exactly one video track matching the canvas.
    let stream = coordinator.stream().unwrap();
    let tracks = stream.get_video_tracks();
    assert_eq!(tracks.len(), 1);
    let settings = tracks[0].get_settings();
    assert_eq!((settings.width, settings.height), (640, 480));
    assert_eq!(settings.frame_rate, Some(30.0));

    // The foreground can no longer draw.
    let canvas = document.query_canvas("canvas#my-canvas").unwrap();
    assert!(matches!(
        canvas.get_context_2d(),
        Err(FramecastError::SurfaceTransferred)
    ));

    // One refresh at t = 0 puts the rectangle at x = 160 in hsl(0, 70%, 50%).
    ticks.tick(0.0);
    let frame = tokio::time::timeout(Duration::from_secs(5), tracks[0].next_frame(0))
        .await
        .expect("captured frame")
        .expect("track live");
    assert_eq!(frame.buffer.width, 640);
    assert_eq!(frame.buffer.height, 480);
    assert_eq!(frame.buffer.get_pixel(5, 470), Some([30, 30, 30, 255]));
    assert_eq!(frame.buffer.get_pixel(320, 240), Some([217, 38, 38, 255]));
    assert_eq!(frame.buffer.get_pixel(100, 240), Some([30, 30, 30, 255]));

    let video = document.query_video("video#my-video").unwrap();
    wait_until("a presented frame", || video.frames_presented() > 0).await;
    assert!(!video.paused());

    let panel = document.query_div("div#mediaStreamInfo").unwrap();
    let html = panel.inner_html();
    assert!(html.contains(&format!("<strong>ID:</strong> {}", tracks[0].id())));
    assert!(html.contains("<strong>Frame Rate:</strong> 30 FPS"));
    assert!(html.contains("<strong>Resolution:</strong> 640x480"));
    assert!(html.contains("Offloaded to Web Worker via OffscreenCanvas"));
    assert!(matches!(coordinator.describe_stream(), StreamInfo::Track(_)));
}

#[tokio::test]
async fn test_real_clock_keeps_stream_moving() {
    let mut config = FramecastConfig::default();
    config.canvas.width = 160;
    config.canvas.height = 120;
    config.render.refresh_rate = 120.0;
    config.stream.frame_rate = Some(60.0);
    let document = Document::standard(&config);
    let coordinator = Coordinator::new(&document, &config).unwrap();

    let track = coordinator.stream().unwrap().get_video_tracks().remove(0);
    wait_until("several captured frames", || track.frames_captured() >= 5).await;
    wait_until("several rendered frames", || {
        coordinator.worker().stats().frames_rendered() >= 5
    })
    .await;

    let latest = track.latest_frame().expect("latest frame");
    assert_eq!(latest.buffer.get_pixel(0, 119), Some([30, 30, 30, 255]));
}
