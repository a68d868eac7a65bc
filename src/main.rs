use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use luminous_core::gemini::TutorModels;
use luminous_core::{
    create_router, normalize_quiz_output, parse_model_json, AppState, AudioOutput, AudioSink,
    AudioSource, Config, DeviceSelection, DictionaryEntry, GeminiClient, GeminiLiveConnector,
    LiveCallbacks, LiveRuntime, LiveSession, ModelResult, Roadmap, SessionResources, StudyGuide,
    TranslationResult, Tutor, WavRecorderOutput,
};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "luminous", version, about = "Language tutoring backend")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/luminous")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recover and normalize raw model output from a file or stdin
    Normalize {
        #[arg(long, value_enum, default_value_t = OutputKind::Json)]
        kind: OutputKind,
        /// Keep at most this many quiz questions
        #[arg(long)]
        limit: Option<usize>,
        /// Input file; stdin when omitted
        file: Option<String>,
    },
    /// Run the HTTP API
    Serve,
    /// Run a live interpretation session until Ctrl-C
    Live {
        #[arg(long, default_value = "English")]
        source: String,
        #[arg(long, default_value = "Spanish")]
        target: String,
        /// Stream this WAV file instead of the microphone
        #[arg(long)]
        input_wav: Option<String>,
        /// Record model audio to this WAV file instead of the speaker
        #[arg(long)]
        output_wav: Option<String>,
    },
    /// Generate a practice quiz
    Quiz {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "English")]
        lang: String,
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Translate text
    Translate {
        #[arg(long)]
        text: String,
        #[arg(long)]
        target: String,
        #[arg(long, default_value = "neutral")]
        tone: String,
    },
    /// Look up a word
    Define {
        #[arg(long)]
        word: String,
        #[arg(long, default_value = "English")]
        lang: String,
    },
    /// Build a learning roadmap
    Roadmap {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "beginner")]
        difficulty: String,
        #[arg(long, default_value = "English")]
        lang: String,
    },
    /// Synthesize speech into a WAV file
    Speak {
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "English")]
        lang: String,
        #[arg(long, default_value = "speech.wav")]
        out: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputKind {
    Json,
    Quiz,
    Dictionary,
    StudyGuide,
    Roadmap,
    Translation,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Luminous v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Normalize { kind, limit, file } => normalize(kind, limit, file.as_deref()),
        Command::Serve => serve(&cfg).await,
        Command::Live {
            source,
            target,
            input_wav,
            output_wav,
        } => run_live(&cfg, &source, &target, input_wav, output_wav).await,
        Command::Quiz { topic, lang, count } => {
            let questions = tutor(&cfg)?.generate_quiz(&topic, &lang, count).await;
            print_json(&questions)
        }
        Command::Translate { text, target, tone } => {
            print_json(&tutor(&cfg)?.translate(&text, &target, &tone).await)
        }
        Command::Define { word, lang } => match tutor(&cfg)?.lookup_word(&word, &lang).await {
            Some(entry) => print_json(&entry),
            None => anyhow::bail!("No definition found for {}", word),
        },
        Command::Roadmap {
            topic,
            difficulty,
            lang,
        } => match tutor(&cfg)?.roadmap(&topic, &difficulty, &lang).await {
            Some(roadmap) => print_json(&roadmap),
            None => anyhow::bail!("Could not build a roadmap for {}", topic),
        },
        Command::Speak { text, lang, out } => speak(&cfg, &text, &lang, &out).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path)),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            Ok(raw)
        }
    }
}

fn normalize(kind: OutputKind, limit: Option<usize>, file: Option<&str>) -> Result<()> {
    let raw = read_input(file)?;
    let raw = Some(raw.as_str());

    fn coerced<T: ModelResult + Serialize>(raw: Option<&str>) -> Result<()> {
        let result = T::from_model_output(raw).context("No JSON could be recovered from the input")?;
        print_json(&result)
    }

    match kind {
        OutputKind::Json => {
            let value = parse_model_json(raw).context("No JSON could be recovered from the input")?;
            print_json(&value)
        }
        OutputKind::Quiz => print_json(&normalize_quiz_output(raw, limit)),
        OutputKind::Dictionary => coerced::<DictionaryEntry>(raw),
        OutputKind::StudyGuide => coerced::<StudyGuide>(raw),
        OutputKind::Roadmap => coerced::<Roadmap>(raw),
        OutputKind::Translation => coerced::<TranslationResult>(raw),
    }
}

fn tutor(cfg: &Config) -> Result<Tutor<GeminiClient>> {
    let client = GeminiClient::new(cfg.gemini.base_url.clone(), cfg.gemini.api_key.clone())?;
    let models: TutorModels = cfg.tutor_models();
    Ok(Tutor::new(client, models))
}

fn connector(cfg: &Config) -> GeminiLiveConnector {
    GeminiLiveConnector::new(cfg.gemini.live_endpoint.clone(), cfg.gemini.api_key.clone())
}

async fn serve(cfg: &Config) -> Result<()> {
    let mut state = AppState::new();
    if cfg.has_api_key() {
        let resources = SessionResources::new(Arc::new(DeviceSelection::hardware()), Arc::new(connector(cfg)));
        let defaults = cfg.live_session_config("English", "Spanish");
        state = state.with_live(LiveRuntime::new(defaults, resources));
    } else {
        warn!("No Gemini API key configured; live sessions are disabled");
    }

    let app = create_router(state);
    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_live(
    cfg: &Config,
    source_language: &str,
    target_language: &str,
    input_wav: Option<String>,
    output_wav: Option<String>,
) -> Result<()> {
    if !cfg.has_api_key() {
        anyhow::bail!("A Gemini API key is required for live sessions");
    }

    let source = input_wav.map(AudioSource::File).unwrap_or(AudioSource::Microphone);
    let sink = output_wav.map(AudioSink::WavFile).unwrap_or(AudioSink::Speaker);
    let resources = SessionResources::new(Arc::new(DeviceSelection::new(source, sink)), Arc::new(connector(cfg)));

    let session = LiveSession::start(
        cfg.live_session_config(source_language, target_language),
        resources,
        LiveCallbacks::logging(),
    );
    info!("Press Ctrl-C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Stopping"),
        _ = session.stopped() => info!("Session ended"),
    }

    let stats = session.shutdown().await;
    print_json(&stats)
}

async fn speak(cfg: &Config, text: &str, lang: &str, out: &str) -> Result<()> {
    let clip = tutor(cfg)?
        .synthesize_speech(text, lang)
        .await
        .context("No speech was returned")?;

    let mut output = WavRecorderOutput::create(out, clip.sample_rate)?;
    output.play_at(&clip.samples, 0.0)?;
    output.close().await?;

    info!("Wrote {:.1}s of speech to {}", clip.duration_secs(), out);
    Ok(())
}
