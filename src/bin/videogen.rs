use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use videogen::{
    BackgroundMedia, BackgroundSource, Compositor, Fps, HttpLyricSource, HttpRenderService,
    LyricSource as _, OfflineRenderPipeline, ProgressSink, RenderGeometry, RenderRequest,
    map_bars, parse_lrc,
};

#[derive(Parser, Debug)]
#[command(name = "videogen", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single silent frame as a PNG.
    Frame(FrameArgs),
    /// Render a full video through a render server.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Timestamp to render, in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Background media path (image, or video with the `media-ffmpeg`
    /// feature).
    #[arg(long)]
    background: Option<PathBuf>,

    /// TTF/OTF font for lyrics and captions.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Local LRC lyric file.
    #[arg(long)]
    lyrics: Option<PathBuf>,

    /// Track name caption.
    #[arg(long, default_value = "")]
    name: String,

    /// Artist caption.
    #[arg(long, default_value = "")]
    artist: String,

    /// Render scale over the 1280x720 logical canvas.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Render server API root, no trailing slash.
    #[arg(long)]
    api_root: String,

    /// Track id on the server.
    #[arg(long)]
    id: String,

    /// Track source/provider tag.
    #[arg(long)]
    source: String,

    /// Track name caption.
    #[arg(long)]
    name: String,

    /// Artist caption.
    #[arg(long)]
    artist: String,

    /// Background media path (image, or video with the `media-ffmpeg`
    /// feature).
    #[arg(long)]
    background: Option<PathBuf>,

    /// TTF/OTF font for lyrics and captions.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Local LRC lyric file; skips the server lyric fetch.
    #[arg(long)]
    lyrics: Option<PathBuf>,

    /// Render scale over the 1280x720 logical canvas.
    #[arg(long, default_value_t = 1.5)]
    scale: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_background(path: Option<&PathBuf>) -> anyhow::Result<BackgroundSource> {
    let Some(path) = path else {
        return Ok(BackgroundSource::None);
    };
    let is_image = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp")
    );
    if is_image {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read background image '{}'", path.display()))?;
        Ok(BackgroundSource::Image(bytes))
    } else {
        Ok(BackgroundSource::VideoFile(path.clone()))
    }
}

fn read_lyrics(path: &PathBuf) -> anyhow::Result<Vec<videogen::LyricLine>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read lyric file '{}'", path.display()))?;
    Ok(parse_lrc(&text))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let geometry = RenderGeometry::new(args.scale)?;
    let mut compositor = Compositor::new(geometry);
    if let Some(font_path) = &args.font {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("read font '{}'", font_path.display()))?;
        compositor.set_font(bytes);
    }

    let lyrics = match &args.lyrics {
        Some(p) => read_lyrics(p)?,
        None => Vec::new(),
    };

    let mut background = BackgroundMedia::prepare(&read_background(args.background.as_ref())?)?;
    let bg = background.frame_at(args.time);

    // No audio on this path; every bar sits at its resting height.
    let bars = map_bars(&[]);
    let frame = compositor.draw_frame(
        args.time,
        &bars,
        bg.as_ref(),
        &lyrics,
        &args.name,
        &args.artist,
    )?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let lyrics = match &args.lyrics {
        Some(p) => read_lyrics(p)?,
        None => {
            let source = HttpLyricSource::new(args.api_root.clone())?;
            parse_lrc(&source.fetch_lyrics(&args.id, &args.source)?)
        }
    };

    let request = RenderRequest {
        track_id: args.id,
        source: args.source,
        name: args.name,
        artist: args.artist,
        background: read_background(args.background.as_ref())?,
        lyrics,
        fps: Fps::FIXED_30,
    };

    let service = HttpRenderService::new(args.api_root)?;
    let geometry = RenderGeometry::new(args.scale)?;
    let mut pipeline = OfflineRenderPipeline::new(service).with_geometry(geometry);
    if let Some(font_path) = &args.font {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("read font '{}'", font_path.display()))?;
        pipeline = pipeline.with_font(bytes);
    }

    let outcome = pipeline.run(&request, &mut StderrProgress)?;
    eprintln!(
        "done: {} ({} frames)",
        outcome.url, outcome.frames_uploaded
    );
    Ok(())
}

struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn progress(&mut self, title: &str, detail: &str, percent: u8) {
        eprintln!("[{percent:>3}%] {title}: {detail}");
    }
}
