use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use voicekit::assistant::{LogSpeaker, StdinRecognizer};
use voicekit::audio::mime;
use voicekit::{
    playback, Assistant, CapturePlatform, CaptureSession, CapturedAudio, Config, FilePlatform,
    Segment,
};

#[derive(Parser)]
#[command(name = "voicekit", version, about = "Capture, play back and dispatch voice utterances")]
struct Cli {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/voicekit")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture one utterance and save it as WAV
    Record {
        /// Replay this WAV file instead of the microphone
        #[arg(long)]
        input: Option<PathBuf>,

        /// Stop after this many seconds
        #[arg(long, default_value_t = 5)]
        seconds: u64,

        /// Where to write the recording
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Decode an audio file and play it
    Play { file: PathBuf },
    /// Dispatch wake-word commands typed on stdin
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    info!("voicekit v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Record {
            input,
            seconds,
            output,
        } => record(&cfg, input, seconds, output).await,
        Command::Play { file } => play(&cfg, &file),
        Command::Listen => listen(&cfg).await,
    }
}

fn capture_platform(cfg: &Config, input: Option<PathBuf>) -> Result<Arc<dyn CapturePlatform>> {
    match input {
        Some(path) => Ok(Arc::new(
            FilePlatform::new(path, cfg.audio.capture_config()).realtime(cfg.audio.realtime),
        )),
        None => {
            #[cfg(feature = "microphone")]
            {
                Ok(Arc::new(voicekit::audio::MicrophonePlatform::new(
                    cfg.audio.capture_config(),
                )))
            }

            #[cfg(not(feature = "microphone"))]
            {
                anyhow::bail!(
                    "No --input given and microphone capture is not compiled in \
                    (build with --features microphone)"
                )
            }
        }
    }
}

async fn record(
    cfg: &Config,
    input: Option<PathBuf>,
    seconds: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    let session = CaptureSession::new(capture_platform(cfg, input)?);

    session
        .start_with(cfg.audio.encoder_options(), |segment: &Segment| {
            debug!(
                "Segment received at {}: {} bytes",
                segment.received_at().format("%H:%M:%S%.3f"),
                segment.size()
            );
        })
        .await?;

    info!(
        "Recording from {} for up to {}s, Ctrl-C cancels",
        session.platform_name(),
        seconds
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            info!("Recording cancelled, nothing saved");
            return Ok(());
        }
    }

    let audio = session.stop().await?;

    let output = output.unwrap_or_else(|| {
        PathBuf::from(&cfg.playback.output_dir).join(format!(
            "capture-{}.wav",
            Utc::now().format("%Y%m%d-%H%M%S")
        ))
    });
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    let wav = playback::encode_wav(&playback::decode(&audio)?)?;
    fs::write(&output, wav).with_context(|| format!("Failed to write {}", output.display()))?;

    let summary = serde_json::json!({
        "output": output.display().to_string(),
        "mime_type": audio.mime_type(),
        "bytes": audio.size(),
        "segments": audio.segment_count(),
        "duration_secs": audio.duration().map(|d| d.as_secs_f64()),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn play(cfg: &Config, file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mime_type = match file.extension().and_then(|ext| ext.to_str()) {
        Some("wav") => mime::WAV_MIME,
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    };

    let mut sink = playback::default_sink(&cfg.playback.output_dir)?;
    playback::play(&CapturedAudio::new(bytes, mime_type), sink.as_mut())
}

async fn listen(cfg: &Config) -> Result<()> {
    let mut assistant = Assistant::new(cfg.assistant.clone(), StdinRecognizer::new(), LogSpeaker);
    let mut handler =
        |command: &str| (!command.is_empty()).then(|| format!("You said {command}"));

    info!(
        "Type commands starting with \"{}\", Ctrl-C to quit",
        assistant.config().name
    );

    let dispatched = assistant
        .run_until(&mut handler, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("{} commands handled", dispatched);
    Ok(())
}
