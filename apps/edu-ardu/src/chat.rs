//! Interactive terminal chat.

use std::io::Write;

use anyhow::Result;
use chat_session::{ChatMessage, ChatSession, MessageKind, Sender, SubmitOutcome, TtsStatus};
use robot_mouth::{spawn_connection_monitor, DEFAULT_MONITOR_INTERVAL};
use tracing::{debug, warn};
use voice_local::ConsoleInput;

use crate::app::{App, TtsMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Say(String),
    Listen,
    Stop,
    Repeat,
    Clear,
    Status,
    Quit,
    Unknown(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Say(line.to_string()));
        };
        Some(match command.to_lowercase().as_str() {
            "voz" => Self::Listen,
            "parar" => Self::Stop,
            "repetir" => Self::Repeat,
            "limpar" => Self::Clear,
            "estado" => Self::Status,
            "sair" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        })
    }
}

fn tts_icon(status: Option<TtsStatus>) -> &'static str {
    match status {
        Some(TtsStatus::Pending) => " ⏳",
        Some(TtsStatus::Sent) => " 🔊",
        Some(TtsStatus::Failed) => " 🔇",
        None => "",
    }
}

fn render(message: &ChatMessage) -> String {
    let time = format!(
        "{:02}:{:02}",
        message.timestamp.hour(),
        message.timestamp.minute()
    );
    match (message.sender, message.kind) {
        (Sender::User, _) => format!("[{time}] você: {}", message.text),
        (Sender::Assistant, MessageKind::Error) => format!("[{time}] ⚠️  {}", message.text),
        (Sender::Assistant, _) => format!(
            "[{time}] {}: {}{}",
            message.model.as_deref().unwrap_or("Edu-Ardu"),
            message.text,
            tts_icon(message.tts_status)
        ),
    }
}

fn print_new(session: &ChatSession, shown: &mut usize) {
    let messages = session.transcript().snapshot();
    if messages.len() < *shown {
        *shown = 0;
    }
    for message in &messages[*shown..] {
        if message.sender == Sender::Assistant {
            println!("{}", render(message));
        }
    }
    *shown = messages.len();
}

pub async fn run(app: &App, mode: TtsMode) -> Result<()> {
    let session = app.chat_session(mode);
    let monitor = (mode == TtsMode::Robot)
        .then(|| spawn_connection_monitor(app.robot.clone(), DEFAULT_MONITOR_INTERVAL));
    if mode == TtsMode::Robot && !app.robot.check_connection().await {
        println!("🤖 robô offline, as respostas continuam aparecendo aqui");
    }
    if app.support.recognition_available {
        app.input.request_microphone_permission();
    }

    // Shared with the console recognizer so `/voz` and the prompt never race
    let input = ConsoleInput::stdin();
    let mut shown = 0;
    session.welcome();
    print_new(&session, &mut shown);
    println!("comandos: /voz /parar /repetir /limpar /estado /sair");

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = input.next_line().await else {
            break;
        };
        let Some(command) = ChatCommand::parse(&line) else {
            continue;
        };
        debug!(?command, "chat command");
        match command {
            ChatCommand::Say(text) => {
                if let SubmitOutcome::Failed { error, .. } = session.submit(&text).await {
                    warn!(%error, "message not answered");
                }
            }
            ChatCommand::Listen => {
                let _interim = app.input.subscribe_interim(|text| {
                    print!("\r… {text}");
                    let _ = std::io::stdout().flush();
                });
                if let Err(e) = session.listen_and_submit(&app.input).await {
                    println!("🎤 {e}");
                }
            }
            ChatCommand::Stop => {
                if !session.stop_speaking().await {
                    println!("nada para parar");
                }
            }
            ChatCommand::Repeat => {
                if !session.repeat_last().await {
                    println!("nada para repetir");
                }
            }
            ChatCommand::Clear => {
                session.clear();
                shown = 0;
                println!("conversa limpa");
            }
            ChatCommand::Status => {
                let status = app.voice_status();
                println!("{}", serde_json::to_string_pretty(&status)?);
                if let Some(monitor) = &monitor {
                    println!("robô conectado: {}", monitor.is_connected());
                }
            }
            ChatCommand::Quit => break,
            ChatCommand::Unknown(other) => println!("comando desconhecido: /{other}"),
        }
        print_new(&session, &mut shown);
    }

    session.stop_speaking().await;
    Ok(())
}
