use parkwatch_store::app_config::{VideoConfig, VideoSourceKind};
use parkwatch_vision::{
    FfmpegSource, FrameAnalyzer, FrameSource, ImageSequenceSource, LoopingSource, VisionResult,
};
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::LiveFeed;

/// Wait before retrying a source that produced nothing even after a rewind.
const EMPTY_SOURCE_BACKOFF: Duration = Duration::from_secs(1);

/// Opens the configured source. A missing video file or `ffmpeg` binary
/// fails here rather than inside the worker.
pub fn open_source(video: &VideoConfig) -> VisionResult<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match video.source {
        VideoSourceKind::Ffmpeg => {
            if !Path::new(&video.path).is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("video file {} not found", video.path),
                )
                .into());
            }
            let mut ffmpeg = FfmpegSource::new(&video.path, video.width, video.height);
            ffmpeg.start()?;
            Box::new(ffmpeg)
        }
        VideoSourceKind::Images => Box::new(ImageSequenceSource::open(&video.path)?),
    };
    Ok(source)
}

/// Runs detection on a blocking thread until every other handle to `live`
/// is dropped. The worker owns its source and analyzer; results only leave
/// through `live`.
pub fn start_detection_worker<S>(
    source: LoopingSource<S>,
    analyzer: FrameAnalyzer,
    live: LiveFeed,
    frame_interval: Duration,
) -> JoinHandle<()>
where
    S: FrameSource + 'static,
{
    tokio::task::spawn_blocking(move || run_detection(source, analyzer, live, frame_interval))
}

fn run_detection<S: FrameSource>(
    mut source: LoopingSource<S>,
    analyzer: FrameAnalyzer,
    live: LiveFeed,
    frame_interval: Duration,
) {
    info!(
        "Detection worker started, watching {} slots",
        analyzer.detector().layout().len()
    );

    let mut sequence: u64 = 0;
    while !live.is_detached() {
        let frame = match source.read() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Video source unusable: {}", e);
                thread::sleep(EMPTY_SOURCE_BACKOFF);
                continue;
            }
        };

        match analyzer.analyze(frame, sequence) {
            Ok((snapshot, update)) => {
                debug!(
                    "Frame {}: {}/{} free",
                    sequence,
                    snapshot.free_count(),
                    snapshot.total()
                );
                live.publish(update);
            }
            Err(e) => warn!("Frame {} dropped: {}", sequence, e),
        }

        sequence += 1;
        if !frame_interval.is_zero() {
            thread::sleep(frame_interval);
        }
    }
    info!("Detection worker stopped after {} frames", sequence);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use parkwatch_vision::{OccupancyDetector, SlotLayout};

    struct OneFrame;

    impl FrameSource for OneFrame {
        fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
            Ok(Some(RgbImage::from_pixel(200, 100, Rgb([128, 128, 128]))))
        }

        fn rewind(&mut self) -> VisionResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_publishes_updates() {
        let mut layout = SlotLayout::new(107, 48);
        layout.add("A-1".parse().unwrap(), 10, 10).unwrap();
        let analyzer = FrameAnalyzer::new(OccupancyDetector::new(layout, 900), 80);

        let live = LiveFeed::new(8);
        let mut rx = live.subscribe();
        let _worker = start_detection_worker(
            LoopingSource::new(OneFrame),
            analyzer,
            live.clone(),
            Duration::from_millis(5),
        );

        let update = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.total_slots, 1);
        assert_eq!(update.free_slots, 1);
        assert!(live.latest().is_some());
    }

    #[test]
    fn test_unreadable_source_fails_at_open() {
        for source in [VideoSourceKind::Ffmpeg, VideoSourceKind::Images] {
            let video = VideoConfig {
                source,
                path: "/nonexistent/parkwatch-carpark.mp4".to_string(),
                width: 1100,
                height: 720,
            };
            assert!(open_source(&video).is_err(), "{:?}", source);
        }
    }
}
