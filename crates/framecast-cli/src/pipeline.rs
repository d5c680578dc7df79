use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use framecast_core::FramecastConfig;
use framecast_web::{Coordinator, Document};

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the tokio runtime")
}

fn start(config: &FramecastConfig) -> Result<(Document, Coordinator)> {
    let document = Document::standard(config);
    let coordinator =
        Coordinator::new(&document, config).context("failed to start the pipeline")?;
    Ok((document, coordinator))
}

pub async fn cmd_run(config: FramecastConfig, duration: f64, report_every: f64) -> Result<()> {
    if !report_every.is_finite() || report_every <= 0.0 {
        anyhow::bail!("--report-every must be a positive number of seconds");
    }
    let (_document, mut coordinator) = start(&config)?;
    println!("{}", coordinator.info().inner_html());

    if !duration.is_finite() || duration < 0.0 {
        anyhow::bail!("--duration must be zero or a positive number of seconds");
    }
    let run_for = Some(Duration::from_secs_f64(duration)).filter(|limit| !limit.is_zero());
    let deadline = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut report = tokio::time::interval(Duration::from_secs_f64(report_every));
    report.tick().await;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                tracing::info!("interrupted");
                break;
            }
            _ = report.tick() => log_progress(&coordinator),
        }
    }

    log_progress(&coordinator);
    coordinator.shutdown();
    Ok(())
}

pub async fn cmd_describe(config: FramecastConfig, json: bool) -> Result<()> {
    let (_document, mut coordinator) = start(&config)?;
    let info = coordinator.describe_stream();
    if json {
        println!("{}", info.to_json().context("failed to serialize stream info")?);
    } else {
        println!("{}", coordinator.info().inner_html());
    }
    coordinator.shutdown();
    Ok(())
}

/// Save the first captured frame of the pipeline as a PNG.
pub async fn cmd_snapshot(config: FramecastConfig, output: &Path, wait: f64) -> Result<()> {
    let wait = Duration::try_from_secs_f64(wait)
        .ok()
        .filter(|wait| !wait.is_zero())
        .context("--wait must be a positive number of seconds")?;
    let (_document, mut coordinator) = start(&config)?;
    let track = coordinator
        .stream()
        .and_then(|stream| stream.get_video_tracks().into_iter().next())
        .context("the captured stream has no video track")?;

    let frame = tokio::time::timeout(wait, track.next_frame(0))
        .await
        .context("no frame was captured in time")?
        .context("the video track ended before a frame was captured")?;
    frame
        .buffer
        .save_png(output)
        .with_context(|| format!("failed to save snapshot: {}", output.display()))?;
    coordinator.shutdown();

    tracing::info!(
        path = %output.display(),
        sequence = frame.sequence,
        width = frame.buffer.width,
        height = frame.buffer.height,
        "snapshot saved"
    );
    println!("Saved frame {} to {}", frame.sequence, output.display());
    Ok(())
}

fn log_progress(coordinator: &Coordinator) {
    let captured: u64 = coordinator
        .stream()
        .map(|s| s.get_video_tracks().iter().map(|t| t.frames_captured()).sum::<u64>())
        .unwrap_or(0);
    tracing::info!(
        rendered = coordinator.worker().stats().frames_rendered(),
        captured,
        presented = coordinator.video().frames_presented(),
        playing = !coordinator.video().paused(),
        "progress"
    );
}
