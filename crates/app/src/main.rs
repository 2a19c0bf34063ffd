use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use retrodesk_core::{
    AppConfig, BarFrame, Desk, DeskEvent, FixedStep, FocusManager, FrameClock, HeadlessAudio,
    PlaybackEvent, RenderGraph, RetroDeskError, ToneDecoder, TrackRegistry, WindowEvent,
};
use tracing_subscriber::EnvFilter;

mod assets;

use assets::WavDecoder;

const BAR_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn main() -> retrodesk_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tracks => run_tracks(&config),
        Commands::Play(args) => run_play(&config, &args),
        Commands::Windows { raise } => run_windows(&config, &raise),
        Commands::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> retrodesk_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn playlist(config: &AppConfig) -> retrodesk_core::Result<TrackRegistry> {
    match &config.tracks {
        Some(entries) => TrackRegistry::new(entries.clone()),
        None => Ok(TrackRegistry::portfolio()),
    }
}

fn run_tracks(config: &AppConfig) -> retrodesk_core::Result<()> {
    for track in playlist(config)?.iter() {
        println!("{:>2}  {} - {}  ({})", track.index, track.artist, track.title, track.audio);
    }
    Ok(())
}

fn run_play(config: &AppConfig, args: &PlayArgs) -> retrodesk_core::Result<()> {
    let audio = match &args.assets {
        Some(root) => HeadlessAudio::new(config.audio.clone(), WavDecoder::new(root)),
        None => HeadlessAudio::new(
            config.audio.clone(),
            ToneDecoder::new(config.audio.sample_rate, tone_length(args.tone_seconds)?),
        ),
    }
    .with_auto_complete();

    let mut desk = Desk::new(config, audio, RenderGraph::new())?;
    tracing::info!(track = args.track, seconds = args.seconds, "starting playback");
    desk.handle(DeskEvent::Playback(PlaybackEvent::Select(args.track)));
    desk.handle(DeskEvent::Playback(PlaybackEvent::Toggle));

    let fps = u64::from(config.visualizer.fps);
    let total = (f64::from(args.seconds.max(0.0)) * fps as f64).round() as u64;
    let interval = desk.frame_interval();
    let mut clock: Box<dyn FrameClock> = if args.realtime {
        Box::new(RealtimeClock::new(interval, total))
    } else {
        Box::new(FixedStep::new(interval, total))
    };

    let print_every = (fps / 4).max(1);
    let mut keys = args.keys.iter();
    let mut frame_no = 0_u64;
    while let Some(elapsed) = clock.next_frame() {
        if frame_no > 0 && frame_no % fps == 0 {
            if let Some(key) = keys.next() {
                tracing::info!(%key, "key press");
                desk.handle(DeskEvent::Key(key.clone()));
            }
        }

        let frame = desk.frame(elapsed);
        if frame_no % print_every == 0 {
            if let Some(frame) = frame {
                print_frame(&desk, &frame, frame_no, fps);
            }
        }
        frame_no += 1;
    }

    let player = desk.player();
    tracing::info!(
        frames = frame_no,
        track = player.current_index(),
        playing = player.is_playing(),
        "finished"
    );
    Ok(())
}

fn tone_length(seconds: f32) -> retrodesk_core::Result<Duration> {
    Duration::try_from_secs_f32(seconds).map_err(|err| {
        RetroDeskError::Config(format!("--tone-seconds {seconds} is not a usable length: {err}"))
    })
}

fn print_frame(desk: &Desk<HeadlessAudio>, frame: &BarFrame, frame_no: u64, fps: u64) {
    let player = desk.player();
    let title = player
        .tracks()
        .get(player.current_index())
        .map(|track| format!("{} - {}", track.artist, track.title))
        .unwrap_or_default();
    let state = if player.active_handle().is_some() {
        ">"
    } else if player.is_playing() {
        "~"
    } else {
        "."
    };
    let bars: String = frame.values().iter().map(|value| bar_glyph(*value)).collect();
    println!(
        "{:>7.2}s {state} {bars}  {title}",
        frame_no as f64 / fps as f64
    );
}

fn bar_glyph(value: f32) -> char {
    const MAX: f32 = 255.0 * 0.015;
    let level = ((value / MAX) * (BAR_LEVELS.len() - 1) as f32).round();
    BAR_LEVELS[(level.max(0.0) as usize).min(BAR_LEVELS.len() - 1)]
}

fn run_windows(config: &AppConfig, raise: &[String]) -> retrodesk_core::Result<()> {
    let mut windows = FocusManager::from_config(&config.windows);
    for id in raise {
        if let Err(err) = windows.handle(&WindowEvent::Press(id.clone())) {
            tracing::warn!(%err, "skipping raise");
        }
    }

    for layer in windows.stacking() {
        println!("{:>6}  {}", layer.z_order, layer.id);
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Sleeps until each refresh deadline, like a display would pace frames.
struct RealtimeClock {
    interval: Duration,
    remaining: u64,
    last: Instant,
}

impl RealtimeClock {
    fn new(interval: Duration, frames: u64) -> Self {
        Self {
            interval,
            remaining: frames,
            last: Instant::now(),
        }
    }
}

impl FrameClock for RealtimeClock {
    fn next_frame(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let deadline = self.last + self.interval;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        Some(elapsed)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Retro desktop playback, visualizer and window stacking", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the playlist.
    Tracks,
    /// Play the playlist headlessly and print the visualizer bars.
    Play(PlayArgs),
    /// Press windows in order and print the resulting stacking.
    Windows {
        /// Window to press; repeat to raise several in sequence.
        #[arg(short, long)]
        raise: Vec<String>,
    },
    /// Print the effective configuration as JSON.
    Config,
}

#[derive(clap::Args, Debug)]
struct PlayArgs {
    /// Playlist index to start from.
    #[arg(short, long, default_value_t = 0)]
    track: usize,
    /// How long to run, in seconds of host time.
    #[arg(short, long, default_value_t = 5.0)]
    seconds: f32,
    /// Pace frames against the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
    /// Directory holding the audio assets as WAV files.
    #[arg(long)]
    assets: Option<PathBuf>,
    /// Length of synthesised tones when no asset directory is given.
    #[arg(long, default_value_t = 2.0)]
    tone_seconds: f32,
    /// Keys to press, one per second, e.g. `ArrowRight,ArrowLeft`.
    #[arg(long, value_delimiter = ',')]
    keys: Vec<String>,
}
