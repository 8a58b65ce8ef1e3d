use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use herald::assistant::TEST_VOICE_TEXT;
use herald::generator::format_time;
use herald::voice::{
    AudioPlayback, AudioSink, ConsoleInput, ConsoleRecognizer, ElevenLabsClient,
    MicrophoneRecognizer, NullSink, RecognitionSender, SpeechRecognizer, SpeechRequest,
    SpeechSynthesizer, StopSignal, WhisperTranscriber,
};
use herald::{
    Assistant, AssistantCommand, AssistantHandle, AssistantOptions, AssistantUpdate,
    Collaborators, FileSettingsStore, QuickAction, ResponseGenerator, Settings,
    SettingsOverrides, SettingsStore, Speaker, SystemClock,
};

/// Herald - a conversational voice assistant
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// `ElevenLabs` API key for voice responses
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// `ElevenLabs` voice identifier
    #[arg(long)]
    voice: Option<String>,

    /// Re-arm listening after every reply
    #[arg(long)]
    continuous: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Listen through the microphone instead of typed input
    #[arg(long, requires = "openai_api_key")]
    microphone: bool,

    /// `OpenAI` API key for Whisper transcription
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the reply to a single utterance and exit
    Ask {
        /// What to say
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Speak the voice test sentence with the current settings
    TestVoice,
}

const HELP: &str = "\
Commands:
  /listen          start listening (next line is treated as speech)
  /stop            stop listening
  /toggle          toggle listening
  /quick <action>  greeting | time | weather | joke | calculate | help
  /voice-test      speak a test sentence
  /settings        show settings
  /set <key> <value>
                   voice | speed | volume | key | continuous
  /history         print the conversation as JSON
  /clear           clear the conversation
  /quit            exit
Anything else is sent to the assistant.";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info",
        1 => "info,herald=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(mut cli: Cli) -> anyhow::Result<()> {
    let file_store = match &cli.settings {
        Some(path) => FileSettingsStore::new(path),
        None => FileSettingsStore::standard()?,
    };
    tracing::debug!(path = %file_store.path().display(), "settings file");
    let store: Arc<dyn SettingsStore> = Arc::new(file_store);
    let settings = store.load();
    let overrides = overrides(&cli);
    tracing::debug!(?settings, ?overrides, "loaded settings");

    match cli.command.take() {
        Some(Command::Ask { text }) => {
            let mut generator = ResponseGenerator::system();
            println!("{}", generator.generate(&text.join(" ")));
            Ok(())
        }
        Some(Command::TestVoice) => test_voice(&overrides.apply(settings)).await,
        None => interactive(&cli, store, settings, overrides).await,
    }
}

/// CLI flags win over stored settings for this session only
fn overrides(cli: &Cli) -> SettingsOverrides {
    SettingsOverrides {
        api_key: cli.api_key.clone(),
        voice_id: cli.voice.clone(),
        continuous_listening: cli.continuous,
    }
}

fn audio_sink() -> Arc<dyn AudioSink> {
    match AudioPlayback::new() {
        Ok(playback) => Arc::new(playback),
        Err(e) => {
            tracing::warn!(error = %e, "no audio output, voice responses will be silent");
            Arc::new(NullSink)
        }
    }
}

async fn test_voice(settings: &Settings) -> anyhow::Result<()> {
    if !settings.synthesis_enabled() {
        anyhow::bail!("no ElevenLabs API key configured (use --api-key or ELEVENLABS_API_KEY)");
    }

    println!("Speaking: {TEST_VOICE_TEXT}");
    let request = SpeechRequest {
        text: TEST_VOICE_TEXT.to_string(),
        voice_id: settings.voice_id.clone(),
        speed: settings.speech_speed,
        api_key: settings.api_key_secret(),
    };
    let audio = ElevenLabsClient::new()
        .synthesize(&request)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {e}", e.user_message()))?;

    audio_sink()
        .play(audio, settings.volume, StopSignal::new())
        .await?;
    println!("Done.");
    Ok(())
}

fn recognizer(
    cli: &Cli,
    events: RecognitionSender,
) -> anyhow::Result<(Box<dyn SpeechRecognizer>, Option<ConsoleInput>)> {
    if cli.microphone {
        let key = cli.openai_api_key.clone().unwrap_or_default();
        let transcriber = WhisperTranscriber::new(SecretString::from(key))?;
        tracing::info!("listening through the microphone");
        return Ok((Box::new(MicrophoneRecognizer::new(events, transcriber)), None));
    }

    let (recognizer, input) = ConsoleRecognizer::new(events);
    Ok((Box::new(recognizer), Some(input)))
}

async fn interactive(
    cli: &Cli,
    store: Arc<dyn SettingsStore>,
    settings: Settings,
    overrides: SettingsOverrides,
) -> anyhow::Result<()> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (recognizer, console) = recognizer(cli, events_tx)?;

    let clock = Arc::new(SystemClock);
    let collaborators = Collaborators {
        generator: ResponseGenerator::system(),
        recognizer,
        synthesizer: Arc::new(ElevenLabsClient::new()),
        sink: audio_sink(),
        store,
        clock,
    };

    if !settings.synthesis_enabled() {
        println!("Voice responses are off. Add an ElevenLabs API key with /set key <key>.");
    }
    println!("Type /help for commands.");

    let (assistant, handle, mut updates) =
        Assistant::new(collaborators, events_rx, settings, AssistantOptions::default());
    let driver = tokio::spawn(assistant.with_overrides(overrides).run());

    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            render(&update);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&handle, console.as_ref(), line.trim()).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    driver.await?;
    printer.abort();
    Ok(())
}

/// Returns `false` when the user asked to quit
async fn dispatch(
    handle: &AssistantHandle,
    console: Option<&ConsoleInput>,
    line: &str,
) -> anyhow::Result<bool> {
    let Some(command) = line.strip_prefix('/') else {
        // Typed while "listening" counts as speech
        if !console.is_some_and(|input| input.offer(line)) {
            handle.submit(line)?;
        }
        return Ok(true);
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));

    match name {
        "quit" | "exit" => return Ok(false),
        "help" => println!("{HELP}"),
        "listen" => handle.send(AssistantCommand::StartListening)?,
        "stop" => handle.send(AssistantCommand::StopListening)?,
        "toggle" => handle.send(AssistantCommand::ToggleListening)?,
        "clear" => handle.send(AssistantCommand::Clear)?,
        "voice-test" => handle.send(AssistantCommand::TestVoice)?,
        "quick" => match arg.parse::<QuickAction>() {
            Ok(action) => handle.send(AssistantCommand::QuickAction(action))?,
            Err(e) => println!("{e}"),
        },
        "settings" => println!("{:#?}", handle.settings().await?),
        "set" => {
            let current = handle.stored_settings().await?;
            match update_setting(current, arg) {
                Ok(settings) => handle.send(AssistantCommand::SaveSettings(settings))?,
                Err(message) => println!("{message}"),
            }
        }
        "history" => {
            let turns = handle.history().await?;
            println!("{}", serde_json::to_string_pretty(&turns)?);
        }
        other => println!("unknown command /{other}, try /help"),
    }
    Ok(true)
}

fn update_setting(mut settings: Settings, arg: &str) -> Result<Settings, String> {
    let (key, value) = arg
        .split_once(char::is_whitespace)
        .map(|(k, v)| (k, v.trim()))
        .ok_or_else(|| "usage: /set <key> <value>".to_string())?;

    match key {
        "voice" => settings.voice_id = value.to_string(),
        "key" => settings.api_key = value.to_string(),
        "speed" => {
            settings.speech_speed = value.parse().map_err(|_| format!("not a number: {value}"))?;
        }
        "volume" => {
            settings.volume = value.parse().map_err(|_| format!("not a number: {value}"))?;
        }
        "continuous" => {
            settings.continuous_listening = matches!(value, "on" | "true" | "yes" | "1");
        }
        other => return Err(format!("unknown setting: {other}")),
    }
    Ok(settings)
}

fn render(update: &AssistantUpdate) {
    match update {
        AssistantUpdate::Phase(phase) => println!("[{phase}]"),
        AssistantUpdate::Message(turn) => {
            let who = match turn.speaker {
                Speaker::User => "you",
                Speaker::Assistant => "herald",
            };
            println!("{} {who}: {}", format_time(turn.timestamp.time()), turn.text);
        }
        AssistantUpdate::Notification(notification) => println!("{notification}"),
        AssistantUpdate::Interim(text) => println!("... {text}"),
        AssistantUpdate::Cleared => println!("(conversation cleared)"),
    }
}
