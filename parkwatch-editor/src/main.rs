use anyhow::{Context, Result};
use clap::Parser;
use parkwatch_store::app_config::{Config, VideoSourceKind};
use parkwatch_vision::{FfmpegSource, FrameSource, ImageSequenceSource, SlotLayout};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod session;
mod window;

use session::{Command, EditorSession, Outcome, HELP};
use window::WindowEditor;

/// Interactive editor for the slot rectangles the detector watches.
///
/// Defaults come from the `config/` files, flags override them.
#[derive(Parser, Debug)]
#[command(name = "parkwatch-editor", version)]
struct Args {
    /// Layout file to edit
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Video file, or frame directory with --images, used by `preview` and the window
    #[arg(long)]
    video: Option<PathBuf>,

    /// Treat --video as a directory of still frames
    #[arg(long, default_value_t = false)]
    images: bool,

    /// Rectangle width for a new layout file
    #[arg(long)]
    width: Option<u32>,

    /// Rectangle height for a new layout file
    #[arg(long)]
    height: Option<u32>,

    /// Edit on the looping video in a window instead of the command prompt
    #[arg(long, default_value_t = false)]
    window: bool,

    /// Milliseconds each frame stays on screen in window mode
    #[arg(long, default_value_t = 30)]
    frame_delay: i32,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkwatch_editor=info,parkwatch_vision=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::load().context("Failed to load config")?;

    let layout_path = args
        .layout
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.layout.path));
    let layout = SlotLayout::load_or_default(
        &layout_path,
        args.width.unwrap_or(config.layout.slot_width),
        args.height.unwrap_or(config.layout.slot_height),
    )
    .with_context(|| format!("Failed to read {}", layout_path.display()))?;

    let mut frames = open_frames(&args, &config)?;
    let mut session = EditorSession::new(
        layout,
        layout_path,
        config.zones.letters.clone(),
        config.zones.slots_per_zone,
    );

    if args.window {
        let mut editor = WindowEditor::new(session, frames);
        return show_window(&mut editor, args.frame_delay);
    }

    println!("{}", HELP);
    run(&mut session, frames.as_mut(), io::stdin().lock(), io::stdout())
}

#[cfg(feature = "window")]
fn show_window(editor: &mut WindowEditor, frame_delay_ms: i32) -> Result<()> {
    println!("left click: add, right click: remove, s: save, q: quit");
    window::run_window(editor, frame_delay_ms)?;
    if editor.session().is_dirty() {
        println!("window closed, unsaved changes discarded");
    }
    Ok(())
}

#[cfg(not(feature = "window"))]
fn show_window(_editor: &mut WindowEditor, _frame_delay_ms: i32) -> Result<()> {
    anyhow::bail!("this build has no window support, rebuild with --features window")
}

fn open_frames(args: &Args, config: &Config) -> Result<Box<dyn FrameSource>> {
    let (path, images) = match &args.video {
        Some(path) => (path.clone(), args.images),
        None => (
            PathBuf::from(&config.video.path),
            config.video.source == VideoSourceKind::Images,
        ),
    };

    let source: Box<dyn FrameSource> = if images {
        Box::new(ImageSequenceSource::open(&path)?)
    } else {
        Box::new(FfmpegSource::new(path, config.video.width, config.video.height))
    };
    Ok(source)
}

fn run(
    session: &mut EditorSession,
    frames: &mut dyn FrameSource,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            let result = line
                .parse::<Command>()
                .and_then(|command| session.execute(command, frames));
            match result {
                Ok(Outcome::Quit) => return Ok(()),
                Ok(Outcome::Continue(reply)) => writeln!(output, "{}", reply)?,
                Err(e) => writeln!(output, "error: {:#}", e)?,
            }
        }
        write!(output, "> ")?;
        output.flush()?;
    }

    if session.is_dirty() {
        writeln!(output, "input closed, unsaved changes discarded")?;
    }
    Ok(())
}
