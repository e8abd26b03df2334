use anyhow::{anyhow, bail, Context, Result};
use parkwatch_core::SlotId;
use parkwatch_vision::annotate::draw_layout;
use parkwatch_vision::{FrameSource, SlotLayout};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub const HELP: &str = "\
commands:
  add <x> <y> [slot_id]   add a rectangle, next free id if none given
  remove <x> <y>          remove every rectangle containing the point
  list                    show all rectangles
  save                    write the layout file
  preview <out.png>       draw rectangles on the first video frame
  quit                    leave (twice with unsaved changes)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { x: u32, y: u32, slot_id: Option<SlotId> },
    Remove { x: u32, y: u32 },
    List,
    Save,
    Preview(PathBuf),
    Help,
    Quit,
}

fn coordinate(raw: Option<&str>, name: &str) -> Result<u32> {
    let raw = raw.ok_or_else(|| anyhow!("missing {}", name))?;
    raw.parse()
        .with_context(|| format!("{} must be a pixel coordinate, got {:?}", name, raw))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            bail!("empty command");
        };

        let command = match word {
            "add" | "a" => {
                let x = coordinate(parts.next(), "x")?;
                let y = coordinate(parts.next(), "y")?;
                let slot_id = parts
                    .next()
                    .map(|raw| raw.parse::<SlotId>())
                    .transpose()?;
                Command::Add { x, y, slot_id }
            }
            "remove" | "rm" => {
                let x = coordinate(parts.next(), "x")?;
                let y = coordinate(parts.next(), "y")?;
                Command::Remove { x, y }
            }
            "list" | "ls" => Command::List,
            "save" | "s" => Command::Save,
            "preview" => {
                let out = parts.next().ok_or_else(|| anyhow!("missing output path"))?;
                Command::Preview(PathBuf::from(out))
            }
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("unknown command {:?}, try help", other),
        };

        if let Some(extra) = parts.next() {
            bail!("unexpected argument {:?}", extra);
        }
        Ok(command)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// Editing state for one layout file.
pub struct EditorSession {
    layout: SlotLayout,
    layout_path: PathBuf,
    zones: Vec<char>,
    slots_per_zone: u32,
    dirty: bool,
    quit_armed: bool,
}

impl EditorSession {
    pub fn new(layout: SlotLayout, layout_path: PathBuf, zones: Vec<char>, slots_per_zone: u32) -> Self {
        Self {
            layout,
            layout_path,
            zones,
            slots_per_zone,
            dirty: false,
            quit_armed: false,
        }
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn execute(&mut self, command: Command, frames: &mut dyn FrameSource) -> Result<Outcome> {
        if command != Command::Quit {
            self.quit_armed = false;
        }

        let reply = match command {
            Command::Add { x, y, slot_id } => {
                let slot_id = match slot_id {
                    Some(id) => id,
                    None => self
                        .layout
                        .next_slot_id(&self.zones, self.slots_per_zone)
                        .ok_or_else(|| anyhow!("every slot id already has a rectangle"))?,
                };
                self.layout.add(slot_id, x, y)?;
                self.dirty = true;
                format!("added {} at ({}, {})", slot_id, x, y)
            }
            Command::Remove { x, y } => {
                let removed = self.layout.remove_at(x, y);
                if removed.is_empty() {
                    format!("no rectangle contains ({}, {})", x, y)
                } else {
                    self.dirty = true;
                    let ids: Vec<String> = removed.iter().map(|p| p.slot_id.to_string()).collect();
                    format!("removed {}", ids.join(", "))
                }
            }
            Command::List => self.listing(),
            Command::Save => {
                self.layout.save(&self.layout_path)?;
                self.dirty = false;
                format!("saved {} positions to {}", self.layout.len(), self.layout_path.display())
            }
            Command::Preview(out) => {
                frames.rewind()?;
                let mut frame = frames
                    .next_frame()?
                    .ok_or_else(|| anyhow!("video produced no frames"))?;
                draw_layout(&mut frame, &self.layout);
                frame
                    .save(&out)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!("Preview written to {}", out.display());
                format!("preview written to {}", out.display())
            }
            Command::Help => HELP.to_string(),
            Command::Quit => {
                if self.dirty && !self.quit_armed {
                    self.quit_armed = true;
                    return Ok(Outcome::Continue(
                        "unsaved changes, save first or quit again to discard".to_string(),
                    ));
                }
                return Ok(Outcome::Quit);
            }
        };

        Ok(Outcome::Continue(reply))
    }

    fn listing(&self) -> String {
        if self.layout.is_empty() {
            return "no positions".to_string();
        }
        let mut out = format!(
            "{} positions, {}x{}:",
            self.layout.len(),
            self.layout.width,
            self.layout.height
        );
        for pos in &self.layout.positions {
            out.push_str(&format!("\n  {:<5} ({}, {})", pos.slot_id.to_string(), pos.x, pos.y));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use parkwatch_vision::VisionResult;

    struct StillFrame;

    impl FrameSource for StillFrame {
        fn next_frame(&mut self) -> VisionResult<Option<RgbImage>> {
            Ok(Some(RgbImage::from_pixel(300, 200, Rgb([50, 50, 50]))))
        }

        fn rewind(&mut self) -> VisionResult<()> {
            Ok(())
        }
    }

    fn session(dir: &tempfile::TempDir) -> EditorSession {
        EditorSession::new(
            SlotLayout::new(107, 48),
            dir.path().join("layout.json"),
            vec!['A', 'B'],
            2,
        )
    }

    fn run(session: &mut EditorSession, line: &str) -> Result<Outcome> {
        session.execute(line.parse()?, &mut StillFrame)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "add 10 20".parse::<Command>().unwrap(),
            Command::Add { x: 10, y: 20, slot_id: None }
        );
        assert_eq!(
            "add 10 20 B-2".parse::<Command>().unwrap(),
            Command::Add { x: 10, y: 20, slot_id: Some("B-2".parse().unwrap()) }
        );
        assert_eq!("rm 5 6".parse::<Command>().unwrap(), Command::Remove { x: 5, y: 6 });
        assert_eq!("  list ".parse::<Command>().unwrap(), Command::List);

        assert!("add 10".parse::<Command>().is_err());
        assert!("add -1 5".parse::<Command>().is_err());
        assert!("add 1 2 b2".parse::<Command>().is_err());
        assert!("save now".parse::<Command>().is_err());
        assert!("paint".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn test_add_generates_ids_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        run(&mut session, "add 0 0").unwrap();
        run(&mut session, "add 200 0 B-1").unwrap();
        run(&mut session, "add 400 0").unwrap();

        let ids: Vec<String> = session
            .layout()
            .positions
            .iter()
            .map(|p| p.slot_id.to_string())
            .collect();
        assert_eq!(ids, vec!["A-1", "B-1", "A-2"]);

        assert!(run(&mut session, "add 9 9 A-1").is_err());
        assert_eq!(session.layout().len(), 3);
    }

    #[test]
    fn test_remove_and_save_replace_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        run(&mut session, "add 100 100 A-1").unwrap();
        run(&mut session, "add 300 100 A-2").unwrap();
        run(&mut session, "save").unwrap();
        assert!(!session.is_dirty());

        // Border point is not inside.
        assert_eq!(
            run(&mut session, "remove 100 110").unwrap(),
            Outcome::Continue("no rectangle contains (100, 110)".to_string())
        );
        run(&mut session, "remove 150 120").unwrap();
        run(&mut session, "save").unwrap();

        let saved = SlotLayout::load_or_default(dir.path().join("layout.json"), 1, 1).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.positions[0].slot_id.to_string(), "A-2");
    }

    #[test]
    fn test_quit_guards_unsaved_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        assert_eq!(run(&mut session, "quit").unwrap(), Outcome::Quit);

        run(&mut session, "add 0 0").unwrap();
        assert!(matches!(run(&mut session, "quit").unwrap(), Outcome::Continue(_)));
        assert_eq!(run(&mut session, "quit").unwrap(), Outcome::Quit);
    }

    #[test]
    fn test_preview_draws_rectangles() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        run(&mut session, "add 20 30 A-1").unwrap();

        let out = dir.path().join("preview.png");
        run(&mut session, &format!("preview {}", out.display())).unwrap();

        let preview = image::open(&out).unwrap().to_rgb8();
        assert_eq!(*preview.get_pixel(20, 30), Rgb([0, 255, 0]));
        assert_eq!(*preview.get_pixel(60, 50), Rgb([50, 50, 50]));
    }
}
