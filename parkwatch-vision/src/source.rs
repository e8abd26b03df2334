use image::RgbImage;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

use crate::{VisionError, VisionResult};

/// Something that yields RGB frames in order and can start over.
pub trait FrameSource: Send {
    /// Next frame, `None` once the stream is exhausted.
    fn next_frame(&mut self) -> VisionResult<Option<RgbImage>>;

    /// Back to the first frame.
    fn rewind(&mut self) -> VisionResult<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
        (**self).next_frame()
    }

    fn rewind(&mut self) -> VisionResult<()> {
        (**self).rewind()
    }
}

/// Endless playback: end of stream or a failed read rewinds to frame zero.
pub struct LoopingSource<S> {
    inner: S,
}

impl<S: FrameSource> LoopingSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns the next frame, rewinding as needed. Fails with
    /// [`VisionError::EmptySource`] only when a fresh rewind still yields
    /// nothing, so callers never spin on an empty input.
    pub fn read(&mut self) -> VisionResult<RgbImage> {
        match self.inner.next_frame() {
            Ok(Some(frame)) => return Ok(frame),
            Ok(None) => debug!("End of video, rewinding"),
            Err(e) => warn!("Frame read failed, rewinding: {}", e),
        }

        self.inner.rewind()?;

        match self.inner.next_frame() {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(VisionError::EmptySource),
            Err(e) => Err(e),
        }
    }
}

impl<S: FrameSource> FrameSource for LoopingSource<S> {
    fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
        self.read().map(Some)
    }

    fn rewind(&mut self) -> VisionResult<()> {
        self.inner.rewind()
    }
}

/// Decodes a video file through an `ffmpeg` child process emitting raw rgb24.
pub struct FfmpegSource {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<(Child, ChildStdout)>,
}

impl FfmpegSource {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            child: None,
        }
    }

    fn spawn(&self) -> VisionResult<(Child, ChildStdout)> {
        let scale_arg = format!("scale={}:{}", self.width, self.height);
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(&self.path)
            .arg("-an")
            .arg("-vf")
            .arg(&scale_arg)
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| VisionError::FfmpegSpawn {
            path: self.path.display().to_string(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| VisionError::FfmpegSpawn {
            path: self.path.display().to_string(),
            source: std::io::Error::new(ErrorKind::BrokenPipe, "ffmpeg stdout unavailable"),
        })?;
        debug!("Spawned ffmpeg for {}", self.path.display());
        Ok((child, stdout))
    }

    /// Starts decoding now instead of on the first read, so a missing
    /// `ffmpeg` binary shows up at startup.
    pub fn start(&mut self) -> VisionResult<()> {
        if self.child.is_none() {
            self.child = Some(self.spawn()?);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((mut child, _)) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
        self.start()?;
        let Some((_, stdout)) = self.child.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or(VisionError::FrameSize {
                width: self.width,
                height: self.height,
            })
    }

    fn rewind(&mut self) -> VisionResult<()> {
        self.stop();
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop();
    }
}

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Plays a directory of still frames in file name order.
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> VisionResult<Self> {
        let mut frames: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        frames.sort();
        debug!("Found {} frames in {}", frames.len(), dir.as_ref().display());
        Ok(Self { frames, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
        let Some(path) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(image::open(path)?.to_rgb8()))
    }

    fn rewind(&mut self) -> VisionResult<()> {
        self.cursor = 0;
        Ok(())
    }
}
