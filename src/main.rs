use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_canvas::audio::is_submittable;
use voice_canvas::{
    create_router, AppState, AudioFile, AudioRecorder, CaptureConfig, Config, EditInput,
    GeminiClient, GenerationResult, MediaBlob, MicrophoneDevice, SessionOrchestrator, Submission,
};

#[derive(Parser)]
#[command(name = "voice-canvas")]
#[command(about = "Turn spoken or typed requests into images")]
struct Cli {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/voice-canvas")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate from a typed prompt, then apply follow-up edits
    Generate {
        text: String,

        /// Reference image; the first one is edited, the rest are context
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Follow-up edit instruction, applied in order
        #[arg(long = "then")]
        edits: Vec<String>,

        /// Output path for the final image
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate from a voice command
    Voice {
        /// Use a recorded audio file instead of the microphone
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Stop recording after this many seconds (default: on Enter)
        #[arg(long)]
        seconds: Option<u64>,

        #[arg(long = "image")]
        images: Vec<PathBuf>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run the HTTP control API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voice_canvas=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let api_key = Config::api_key()?;

    info!("Voice Canvas v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Models: {} (text), {} (image)",
        cfg.models.text_model, cfg.models.image_model
    );

    let backend = Arc::new(GeminiClient::new(api_key, &cfg.models.base_url));
    let orchestrator = Arc::new(SessionOrchestrator::from_config(backend, &cfg));

    match cli.command {
        Command::Generate {
            text,
            images,
            edits,
            out,
        } => {
            let images = load_images(&images)?;
            let printer = spawn_thought_printer(&orchestrator);

            let mut result = orchestrator
                .submit(Submission::Text { text, images })
                .await?;
            for edit in edits {
                eprintln!();
                info!("Applying edit: {}", edit);
                result = orchestrator
                    .submit_edit(EditInput {
                        text: Some(edit),
                        ..Default::default()
                    })
                    .await?;
            }

            printer.abort();
            save_result(&result, out)?;
        }

        Command::Voice {
            audio,
            seconds,
            images,
            out,
        } => {
            let images = load_images(&images)?;
            let clip = match audio {
                Some(path) => AudioFile::open(path)?.clip,
                None => record_clip(&cfg, seconds).await?,
            };
            if !is_submittable(&clip, cfg.audio.min_clip_bytes) {
                bail!("Recording is empty or too short ({} bytes)", clip.len());
            }

            let printer = spawn_thought_printer(&orchestrator);
            let result = orchestrator
                .submit(Submission::Voice {
                    audio: clip,
                    images,
                })
                .await?;

            printer.abort();
            save_result(&result, out)?;
        }

        Command::Serve => {
            let app = create_router(AppState::new(orchestrator));
            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("HTTP API listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn load_images(paths: &[PathBuf]) -> Result<Vec<MediaBlob>> {
    paths.iter().map(MediaBlob::load_image).collect()
}

/// Echo thought fragments to stderr as they stream in
fn spawn_thought_printer(orchestrator: &SessionOrchestrator) -> tokio::task::JoinHandle<()> {
    let mut thoughts = orchestrator.subscribe_thoughts();
    tokio::spawn(async move {
        loop {
            match thoughts.recv().await {
                Ok(delta) => {
                    eprint!("{}", delta);
                    let _ = std::io::stderr().flush();
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} thought fragments", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn record_clip(cfg: &Config, seconds: Option<u64>) -> Result<MediaBlob> {
    let capture = CaptureConfig {
        target_sample_rate: cfg.audio.sample_rate,
        target_channels: cfg.audio.channels,
    };
    let mut recorder = AudioRecorder::new(MicrophoneDevice::new(), capture);

    if let Err(e) = recorder.start_capture().await {
        bail!("{} ({})", e.user_message(), e);
    }

    match seconds {
        Some(secs) => info!("Recording for {} seconds...", secs),
        None => info!("Recording... press Enter to stop"),
    }

    let limit = seconds.map(Duration::from_secs).unwrap_or(Duration::MAX);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        _ = tokio::time::sleep(limit) => {}
        _ = stdin.next_line() => {}
    }

    recorder
        .stop_capture()
        .await?
        .context("Recorder was not running")
}

fn save_result(result: &GenerationResult, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(|| {
        PathBuf::from(format!(
            "voice-canvas-{}.{}",
            result.id,
            result.image.extension()
        ))
    });
    write_image(&path, &result.image)?;

    eprintln!();
    info!("Original prompt: {}", result.original_prompt);
    info!("Enhanced prompt: {}", result.enhanced_prompt);
    info!("Aspect ratio: {}", result.aspect_ratio);
    println!("{}", path.display());
    Ok(())
}

fn write_image(path: &Path, image: &MediaBlob) -> Result<()> {
    std::fs::write(path, &image.data)
        .with_context(|| format!("Failed to write image to {}", path.display()))
}
