use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ball_knowledge::commentary::{self, CommentaryPayload};
use ball_knowledge::kernel::event::{command_for_key, Command};
use ball_knowledge::kernel::time::format_time;
use ball_knowledge::media::sim::{SimulatedElement, SimulatedLoader};
use ball_knowledge::media::MediaSet;
use ball_knowledge::services::backend::{BackendClient, UploadPreferences, VideoFile};
use ball_knowledge::session::{self, SessionContext, UploadSource, ViewerInputs};
use ball_knowledge::{Viewer, ViewerConfig};

/// Seconds of video kept past the last caption when no duration is given.
const TAIL_SECONDS: f64 = 15.0;

#[derive(Parser)]
#[command(name = "ball-knowledge", about = "Synchronized sports commentary viewer")]
struct Cli {
    /// JSON config file; environment overrides still apply on top.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a commentary result against a simulated video. Reads key names
    /// (space, k, arrowleft, m, 0-9, ...) from stdin, one per line.
    Watch {
        payload: PathBuf,
        /// Video length in seconds.
        #[arg(long)]
        duration: Option<f64>,
        /// Length of every simulated audio clip.
        #[arg(long, default_value_t = 4.0)]
        clip_seconds: f64,
        /// Start playing immediately.
        #[arg(long)]
        autoplay: bool,
    },
    /// Upload a video (or have the backend fetch a URL) and print the
    /// generated commentary timeline.
    Submit {
        source: String,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        energy: Option<String>,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        /// Write the commentary result JSON here, ready for `watch`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ball_knowledge=info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ViewerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ViewerConfig::default(),
    }
    .with_overrides(|key| std::env::var(key).ok());

    match cli.command {
        Commands::Watch {
            payload,
            duration,
            clip_seconds,
            autoplay,
        } => watch(config, payload, duration, clip_seconds, autoplay).await,
        Commands::Submit {
            source,
            style,
            energy,
            voice,
            duration,
            output,
        } => {
            let defaults = UploadPreferences::default();
            let prefs = UploadPreferences {
                style: style.unwrap_or(defaults.style),
                energy: energy.unwrap_or(defaults.energy),
                voice: voice.unwrap_or(defaults.voice),
                duration: duration.unwrap_or(defaults.duration),
            };
            submit(config, source, prefs, output).await
        }
    }
}

async fn watch(
    config: ViewerConfig,
    payload_path: PathBuf,
    duration: Option<f64>,
    clip_seconds: f64,
    autoplay: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(&payload_path)
        .with_context(|| format!("reading {}", payload_path.display()))?;
    let payload: CommentaryPayload = serde_json::from_str(&raw).context("parsing commentary result")?;

    let captions = commentary::resolve(&payload);
    let duration = duration.unwrap_or_else(|| {
        captions
            .iter()
            .map(|c| c.timestamp)
            .fold(0.0, f64::max)
            + TAIL_SECONDS
    });

    let video = Arc::new(SimulatedElement::new("video", Some(duration)));
    let loader = SimulatedLoader::new(clip_seconds);
    let media = MediaSet::from_payload(video, &payload, &loader, |locator| {
        config.backend.resolve_media(locator)
    });
    let viewer = Viewer::new(media, &payload, config.sync.clone());
    let telemetry = viewer.telemetry().clone();

    for caption in viewer.captions() {
        tracing::info!("{:>6}  [{}]  {}", format_time(caption.timestamp), caption.category.as_str(), caption.text);
    }

    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<Command>(64);

    // Caption printer; ends the session once the video has played out.
    let mut snapshots = viewer.subscribe();
    let printer = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut shown = None;
            let mut started = false;
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.caption_index != shown {
                    shown = snapshot.caption_index;
                    if let Some(caption) = &snapshot.caption {
                        tracing::info!(
                            at = %format_time(snapshot.transport.current_time),
                            category = caption.category.as_str(),
                            "{}",
                            caption.text
                        );
                    }
                }
                started |= snapshot.transport.is_playing;
                let at_end = snapshot.transport.duration > 0.0
                    && snapshot.transport.current_time >= snapshot.transport.duration;
                if started && at_end && !snapshot.transport.is_playing {
                    tracing::info!("playback finished");
                    shutdown.cancel();
                    break;
                }
            }
        })
    };

    // Console input
    {
        let tx = tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let key = line.trim();
                if key.eq_ignore_ascii_case("quit") || key.eq_ignore_ascii_case("q") {
                    shutdown.cancel();
                    break;
                }
                match command_for_key(key) {
                    Some(command) => {
                        if let Err(e) = tx.send(command).await {
                            tracing::error!("Failed to send command: {}", e);
                            break;
                        }
                    }
                    None => tracing::warn!(key, "no shortcut bound to key"),
                }
            }
            // Keep the sender alive after EOF so piped input does not end the session.
            shutdown.cancelled().await;
        });
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    if autoplay {
        tx.send(Command::TogglePlay).await.context("viewer is not accepting commands")?;
    }
    drop(tx);

    viewer.run(rx, shutdown.clone()).await;
    printer.abort();

    let stats = telemetry.snapshot();
    tracing::info!(
        completed = stats.transport.completed,
        dropped = stats.transport.dropped,
        degraded = stats.transport.degraded,
        lock_reclaims = stats.transport.lock_reclaims,
        drift_corrections = stats.sync.drift_corrections,
        clip_activations = stats.sync.clip_activations,
        clip_failures = stats.sync.clip_failures,
        "session summary"
    );
    Ok(())
}

async fn submit(
    config: ViewerConfig,
    source: String,
    prefs: UploadPreferences,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = BackendClient::new(&config.backend);
    let mut session = SessionContext::new();

    let upload = if source.starts_with("http://") || source.starts_with("https://") {
        UploadSource::Url(source)
    } else {
        let file = VideoFile::from_path(&source).with_context(|| format!("reading {}", source))?;
        UploadSource::File {
            file,
            locator: source,
        }
    };
    session::stage_upload(&mut session, upload, &prefs);

    session::run_upload_step(&client, &mut session)
        .await
        .context("commentary generation failed")?;
    let inputs = ViewerInputs::from_session(&session)?;

    println!("video: {}", inputs.video_source);
    for caption in commentary::resolve(&inputs.payload) {
        println!(
            "{:>6}  [{}]  {}",
            format_time(caption.timestamp),
            caption.category.as_str(),
            caption.text
        );
    }

    if let Some(path) = output {
        let raw = serde_json::to_string_pretty(&inputs.payload)?;
        std::fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "commentary result saved");
    }
    Ok(())
}
