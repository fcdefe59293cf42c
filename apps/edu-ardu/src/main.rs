use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use robot_mouth::RobotVoiceConfig;
use tracing::info;
use voice_local::voices::best_voice;
use voice_local::VoiceProfile;

mod app;
mod chat;
mod config;

use app::{App, TtsMode};
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(
    name = "edu-ardu",
    version,
    about = "Edu-Ardu: robotics chat with voice",
    disable_help_subcommand = true
)]
struct Cli {
    /// JSON config file; created with defaults when missing
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the AI chat backend
    #[arg(long, env = "EDU_ARDU_API_URL", global = true)]
    api_url: Option<String>,

    /// Base URL of the robot voice device API
    #[arg(long, env = "EDU_ARDU_ROBOT_URL", global = true)]
    robot_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive chat with the AI assistant
    Chat {
        /// Where answers are spoken
        #[arg(long, value_enum, default_value_t = TtsMode::Robot)]
        tts: TtsMode,
    },
    /// Talk to the robot voice device directly
    Robot {
        #[command(subcommand)]
        action: RobotAction,
    },
    /// List the voices of the configured speech backend
    Voices,
}

#[derive(Subcommand, Debug)]
enum RobotAction {
    /// Check whether the device is reachable
    Health,
    /// Make the robot say something
    Say {
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(long, default_value_t = 0.85)]
        rate: f32,
        #[arg(long, default_value_t = 0.8)]
        pitch: f32,
        #[arg(long, default_value_t = 1.0)]
        volume: f32,
    },
    /// Interrupt the robot
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .with_overrides(cli.api_url, cli.robot_url);
    let app = App::build(config)?;

    match cli.command {
        Commands::Chat { tts } => chat::run(&app, tts).await,
        Commands::Robot { action } => robot(&app, action).await,
        Commands::Voices => {
            voices(&app);
            Ok(())
        }
    }
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn robot(app: &App, action: RobotAction) -> Result<()> {
    match action {
        RobotAction::Health => {
            let ok = app.robot.check_connection().await;
            println!("{}", if ok { "online" } else { "offline" });
            if !ok {
                anyhow::bail!("robot at {} is unreachable", app.config.robot.base_url);
            }
        }
        RobotAction::Say {
            text,
            rate,
            pitch,
            volume,
        } => {
            let voice = RobotVoiceConfig {
                rate,
                pitch,
                volume,
            };
            let report = app.robot.dispatch_with_report(&text.join(" "), &voice).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.delivered {
                anyhow::bail!("robot did not accept the text");
            }
            info!("robot accepted the text");
        }
        RobotAction::Stop => {
            if !app.robot.stop().await {
                anyhow::bail!("robot did not accept the stop request");
            }
            println!("stopped");
        }
    }
    Ok(())
}

fn voices(app: &App) {
    let listings = app.output.available_voices();
    if listings.is_empty() {
        println!("no voices for {}", app.output.config().language);
        return;
    }
    let voices: Vec<_> = listings.iter().map(|l| l.voice.clone()).collect();
    let chosen = best_voice(&voices, &VoiceProfile::default()).map(|m| m.voice.id.clone());
    for (i, listing) in listings.iter().enumerate() {
        let voice = &listing.voice;
        let marker = if chosen.as_deref() == Some(voice.id.as_str()) { "*" } else { " " };
        println!("{marker} {i}\t{}\t{}\t{:?}", voice.name, voice.language, listing.gender);
    }
}
