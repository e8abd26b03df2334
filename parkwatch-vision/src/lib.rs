//! Video-derived parking occupancy.
//!
//! Frames come from a looping [`source::FrameSource`], go through the fixed
//! [`preprocess`] chain, and every slot rectangle of the [`layout::SlotLayout`]
//! is classified by its foreground pixel count.

pub mod annotate;
pub mod detector;
pub mod layout;
pub mod pipeline;
pub mod preprocess;
pub mod source;

pub use detector::{OccupancyDetector, OccupancySnapshot, SlotReading};
pub use layout::{SlotLayout, SlotPosition};
pub use pipeline::FrameAnalyzer;
pub use source::{FfmpegSource, FrameSource, ImageSequenceSource, LoopingSource};

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid layout file: {0}")]
    Layout(#[from] serde_json::Error),
    #[error("Slot {0} already has a position")]
    DuplicateSlot(String),
    #[error("Failed to start ffmpeg for {path}: {source}")]
    FfmpegSpawn {
        path: String,
        source: std::io::Error,
    },
    #[error("Frame buffer does not match {width}x{height}")]
    FrameSize { width: u32, height: u32 },
    #[error("Video source produced no frames")]
    EmptySource,
}

pub type VisionResult<T> = Result<T, VisionError>;
