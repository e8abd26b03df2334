use anyhow::Result;
use image::RgbImage;
use parkwatch_vision::annotate::draw_layout;
use parkwatch_vision::{FrameSource, LoopingSource};

use crate::session::{Command, EditorSession, Outcome};

/// Input collected from the editor window between two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    LeftClick { x: u32, y: u32 },
    RightClick { x: u32, y: u32 },
    Key(char),
}

impl WindowEvent {
    /// Left click adds a rectangle with the next free id, right click removes
    /// what is under the cursor, `s` saves and `q` quits.
    pub fn command(self) -> Option<Command> {
        match self {
            WindowEvent::LeftClick { x, y } => Some(Command::Add { x, y, slot_id: None }),
            WindowEvent::RightClick { x, y } => Some(Command::Remove { x, y }),
            WindowEvent::Key('s') => Some(Command::Save),
            WindowEvent::Key('q') => Some(Command::Quit),
            WindowEvent::Key(_) => None,
        }
    }
}

/// The looping video with the layout drawn over it, driven by window events.
#[cfg_attr(not(feature = "window"), allow(dead_code))]
pub struct WindowEditor {
    session: EditorSession,
    frames: LoopingSource<Box<dyn FrameSource>>,
}

#[cfg_attr(not(feature = "window"), allow(dead_code))]
impl WindowEditor {
    pub fn new(session: EditorSession, frames: Box<dyn FrameSource>) -> Self {
        Self {
            session,
            frames: LoopingSource::new(frames),
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Next video frame, rewinding at the end, with every rectangle drawn.
    pub fn next_view(&mut self) -> Result<RgbImage> {
        let mut frame = self.frames.read()?;
        draw_layout(&mut frame, self.session.layout());
        Ok(frame)
    }

    /// `None` for events that map to no command.
    pub fn handle(&mut self, event: WindowEvent) -> Result<Option<Outcome>> {
        let Some(command) = event.command() else {
            return Ok(None);
        };
        self.session.execute(command, &mut self.frames).map(Some)
    }
}

#[cfg(feature = "window")]
pub use highgui_window::run_window;

#[cfg(feature = "window")]
mod highgui_window {
    use super::{WindowEditor, WindowEvent};
    use crate::session::Outcome;
    use anyhow::Result;
    use image::{ImageFormat, RgbImage};
    use opencv::core::{Mat, Vector};
    use opencv::{highgui, imgcodecs};
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use tracing::{info, warn};

    const WINDOW_NAME: &str = "Parking slot editor";

    fn to_mat(frame: &RgbImage) -> Result<Mat> {
        let mut encoded = Vec::new();
        frame.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
        Ok(imgcodecs::imdecode(&Vector::<u8>::from_slice(&encoded), imgcodecs::IMREAD_COLOR)?)
    }

    fn click(event: i32, x: i32, y: i32) -> Option<WindowEvent> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        match event {
            highgui::EVENT_LBUTTONDOWN => Some(WindowEvent::LeftClick { x, y }),
            highgui::EVENT_RBUTTONDOWN => Some(WindowEvent::RightClick { x, y }),
            _ => None,
        }
    }

    /// Shows frames until the session quits. Command errors are logged and
    /// the window stays open.
    pub fn run_window(editor: &mut WindowEditor, frame_delay_ms: i32) -> Result<()> {
        highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE)?;

        let pending: Arc<Mutex<Vec<WindowEvent>>> = Arc::default();
        let sink = Arc::clone(&pending);
        highgui::set_mouse_callback(
            WINDOW_NAME,
            Some(Box::new(move |event: i32, x: i32, y: i32, _flags: i32| {
                if let (Some(event), Ok(mut queue)) = (click(event, x, y), sink.lock()) {
                    queue.push(event);
                }
            })),
        )?;

        'frames: loop {
            let view = editor.next_view()?;
            highgui::imshow(WINDOW_NAME, &to_mat(&view)?)?;
            let key = highgui::wait_key(frame_delay_ms)?;

            let mut events: Vec<WindowEvent> = pending
                .lock()
                .map(|mut queue| queue.drain(..).collect())
                .unwrap_or_default();
            if key > 0 {
                if let Some(c) = char::from_u32((key & 0xff) as u32) {
                    events.push(WindowEvent::Key(c));
                }
            }

            for event in events {
                match editor.handle(event) {
                    Ok(Some(Outcome::Quit)) => break 'frames,
                    Ok(Some(Outcome::Continue(reply))) => info!("{}", reply),
                    Ok(None) => {}
                    Err(e) => warn!("{:#}", e),
                }
            }
        }

        highgui::destroy_all_windows()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use parkwatch_vision::{SlotLayout, VisionResult};

    /// Two dark frames, then end of stream.
    struct TwoFrames {
        served: u32,
    }

    impl FrameSource for TwoFrames {
        fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
            if self.served == 2 {
                return Ok(None);
            }
            self.served += 1;
            Ok(Some(RgbImage::from_pixel(400, 200, Rgb([10, 10, 10]))))
        }

        fn rewind(&mut self) -> VisionResult<()> {
            self.served = 0;
            Ok(())
        }
    }

    fn editor(dir: &tempfile::TempDir) -> WindowEditor {
        let session = EditorSession::new(
            SlotLayout::new(107, 48),
            dir.path().join("layout.json"),
            vec!['A'],
            5,
        );
        WindowEditor::new(session, Box::new(TwoFrames { served: 0 }))
    }

    #[test]
    fn test_events_map_to_commands() {
        assert_eq!(
            WindowEvent::LeftClick { x: 3, y: 4 }.command(),
            Some(Command::Add { x: 3, y: 4, slot_id: None })
        );
        assert_eq!(
            WindowEvent::RightClick { x: 3, y: 4 }.command(),
            Some(Command::Remove { x: 3, y: 4 })
        );
        assert_eq!(WindowEvent::Key('s').command(), Some(Command::Save));
        assert_eq!(WindowEvent::Key('q').command(), Some(Command::Quit));
        assert_eq!(WindowEvent::Key('x').command(), None);
    }

    #[test]
    fn test_clicks_edit_and_keys_save_then_quit() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor(&dir);

        editor.handle(WindowEvent::LeftClick { x: 10, y: 10 }).unwrap();
        editor.handle(WindowEvent::LeftClick { x: 200, y: 10 }).unwrap();
        editor.handle(WindowEvent::RightClick { x: 50, y: 30 }).unwrap();
        assert_eq!(editor.handle(WindowEvent::Key('z')).unwrap(), None);

        let ids: Vec<String> = editor
            .session()
            .layout()
            .positions
            .iter()
            .map(|p| p.slot_id.to_string())
            .collect();
        assert_eq!(ids, vec!["A-2"]);

        // Unsaved: the first q only warns.
        assert!(matches!(
            editor.handle(WindowEvent::Key('q')).unwrap(),
            Some(Outcome::Continue(_))
        ));
        editor.handle(WindowEvent::Key('s')).unwrap();
        assert_eq!(editor.handle(WindowEvent::Key('q')).unwrap(), Some(Outcome::Quit));

        let saved = SlotLayout::load_or_default(dir.path().join("layout.json"), 1, 1).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn test_view_loops_and_shows_new_rectangles() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = editor(&dir);

        editor.handle(WindowEvent::LeftClick { x: 20, y: 30 }).unwrap();

        // Past the end of the two-frame video the view keeps coming.
        for _ in 0..5 {
            let view = editor.next_view().unwrap();
            assert_eq!(*view.get_pixel(20, 30), Rgb([0, 255, 0]));
            assert_eq!(*view.get_pixel(60, 50), Rgb([10, 10, 10]));
        }
    }
}
