use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use modelchat_client::{ImageAttachment, MessageComposer, ModelChatApp, PollState};
use modelchat_core::{ClientConfig, DownloadSource, ErrorKind};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::terminal::TerminalTranscript;
use crate::{print_models, resolve_model_id};

/// A `/`-prefixed line in interactive mode.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Help,
    Models,
    Use(&'a str),
    Status,
    Source(&'a str),
    Download,
    Wait,
    Image(&'a str),
    New,
    History,
    Clear,
    Exit,
    Unknown(&'a str),
}

/// What one line of input means when no message is being composed.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Command(Command<'a>),
    /// Chat text, passed on to the composer as typed.
    Message(&'a str),
}

/// Only lines starting with `/` are commands; `//` escapes a leading slash.
fn parse_line(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if trimmed.starts_with("//") {
        return Line::Message(&line.trim_start()[1..]);
    }
    let Some(body) = trimmed.strip_prefix('/') else {
        return Line::Message(line);
    };

    let (name, arg) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "help" | "h" | "?" => Command::Help,
        "models" | "m" => Command::Models,
        "use" | "u" => Command::Use(arg),
        "status" | "s" => Command::Status,
        "source" => Command::Source(arg),
        "download" | "d" => Command::Download,
        "wait" | "w" => Command::Wait,
        "image" | "i" => Command::Image(arg),
        "new" => Command::New,
        "history" => Command::History,
        "clear" | "cls" => Command::Clear,
        "exit" | "quit" | "q" => Command::Exit,
        _ => Command::Unknown(name),
    };
    Line::Command(command)
}

pub async fn run(app: &mut ModelChatApp, config: &ClientConfig) -> Result<()> {
    display_welcome(config);
    match app.load_models().await.map(|_| ()) {
        Ok(()) => list_models(app),
        Err(e) => println!("Error: {}", e),
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut composer = MessageComposer::new();
    let mut transcript = TerminalTranscript;

    loop {
        print!("{}", if composer.is_composing() { ". " } else { "> " });
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };

        if composer.is_composing() {
            if let Some(message) = composer.push_line(&line) {
                send(app, &message, &mut transcript).await;
            }
            continue;
        }

        let command = match parse_line(&line) {
            Line::Blank => continue,
            Line::Message(text) => {
                if let Some(message) = composer.push_line(text) {
                    send(app, &message, &mut transcript).await;
                }
                continue;
            }
            Line::Command(command) => command,
        };

        match command {
            Command::Help => display_help(),
            Command::Models => match app.refresh_models().await.map(|_| ()) {
                Ok(()) => list_models(app),
                Err(e) => println!("Error: {}", e),
            },
            Command::Use(arg) => {
                if let Err(e) = use_model(app, arg).await {
                    println!("Error: {}", e);
                }
            }
            Command::Status => {
                app.refresh_status().await;
            }
            Command::Source(arg) => set_source(app, arg),
            Command::Download => {
                // Failures are already reported through the display.
                if app.download().await.is_ok() {
                    println!("  Following progress. Type `/wait` to block until it finishes.");
                }
            }
            Command::Wait => {
                if app.poll_state() == PollState::Idle {
                    println!("  No download in progress.");
                } else if let Some(end) = app.wait_for_download().await {
                    tracing::debug!(?end, "Download polling ended");
                }
            }
            Command::Image("") => {
                app.clear_image();
                println!("  Image cleared.");
            }
            Command::Image(arg) => {
                let path = PathBuf::from(arg);
                if !path.is_file() {
                    println!("Error: not a file: {}", path.display());
                    continue;
                }
                println!("  Attached {}", path.display());
                app.attach_image(ImageAttachment::new(path));
            }
            Command::New => {
                app.reset_conversation();
                println!("  Started a new conversation.");
            }
            Command::History => match serde_json::to_string_pretty(app.history()) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("Error: {}", e),
            },
            Command::Clear => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush()?;
            }
            Command::Exit => {
                println!("  Goodbye!");
                break;
            }
            Command::Unknown(name) => {
                println!("Unknown command: /{}. Type /help for available commands.", name);
            }
        }
    }

    Ok(())
}

async fn send(app: &mut ModelChatApp, message: &str, transcript: &mut TerminalTranscript) {
    if !app.send_gate().is_enabled() {
        println!("  Still waiting for the previous reply.");
        return;
    }
    if let Err(e) = app.send_message(message, transcript).await {
        if e.kind() != ErrorKind::Validation {
            tracing::debug!(error = %e, "Chat turn failed");
        }
    }
}

fn list_models(app: &ModelChatApp) {
    let current = app.current_model();
    print_models(app.catalog(), current.as_deref());
}

async fn use_model(app: &mut ModelChatApp, arg: &str) -> Result<()> {
    if arg.is_empty() {
        app.select_model("").await;
        return Ok(());
    }
    let id = resolve_model_id(app.catalog(), arg)?;
    if !app.models().contains(&id) {
        println!("  {} is not in the model list; using it anyway.", id);
    }
    app.select_model(&id).await;
    Ok(())
}

fn set_source(app: &mut ModelChatApp, arg: &str) {
    if arg.is_empty() {
        for source in DownloadSource::all() {
            let marker = if *source == app.source() { "*" } else { " " };
            println!("  {} {:<12} {}", marker, source.as_str(), source.label());
        }
        return;
    }
    match arg.parse::<DownloadSource>() {
        Ok(source) => {
            app.set_source(source);
            println!("  Download source: {}", source.label());
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn display_welcome(config: &ClientConfig) {
    println!();
    println!("  ╔╦╗ ╔═╗ ╔╦╗ ╔═╗ ╦    ╔═╗ ╦ ╦ ╔═╗ ╔╦╗");
    println!("  ║║║ ║ ║  ║║ ║╣  ║    ║   ╠═╣ ╠═╣  ║ ");
    println!("  ╩ ╩ ╚═╝ ═╩╝ ╚═╝ ╩═╝  ╚═╝ ╩ ╩ ╩ ╩  ╩ ");
    println!();
    println!("  Local model download and chat");
    println!("  Backend: {}", config.base_url());
    println!();
    println!("  /models, /m            # List available models");
    println!("  /use, /u <#|id>        # Select a model (e.g., `/u 1`)");
    println!("  /download, /d          # Download the selected model");
    println!("  /help                  # Show all command options");
    println!("  /exit, /quit, /q       # Leave");
    println!();
    println!("  Lines without a leading / are sent as chat messages.");
}

fn display_help() {
    println!();
    println!("Available Commands:");
    println!("  /models, /m            List available models (with index numbers)");
    println!("  /use, /u <#|id>        Select a model by index or ID; no argument clears it");
    println!("  /status, /s            Show the selected model's download status");
    println!("  /source [name]         Show or set the download source (huggingface, modelscope)");
    println!("  /download, /d          Start downloading the selected model");
    println!("  /wait, /w              Block until the running download finishes");
    println!("  /image, /i [path]      Attach an image to the next message; no path clears it");
    println!("  /new                   Start a new conversation");
    println!("  /history               Print the conversation history as JSON");
    println!("  /clear, /cls           Clear screen");
    println!("  /help, /h              Show this help message");
    println!("  /exit, /quit, /q       Leave");
    println!();
    println!("Messages:");
    println!("  Any line without a leading / is sent to the selected model.");
    println!("  Start a line with // to send a message that begins with /.");
    println!("  End a line with \\ to continue the message on the next line.");
    println!();
}
