//! Terminal rendering for the status line, notices and transcript.

use modelchat_client::{MessageSink, StatusDisplay};
use modelchat_core::{MessageContent, Role, TranscriptEntry};

pub struct TerminalDisplay;

impl StatusDisplay for TerminalDisplay {
    fn show_status(&self, text: &str) {
        println!("  [status] {}", text);
    }

    fn alert(&self, message: &str) {
        println!("  ! {}", message);
    }
}

#[derive(Default)]
pub struct TerminalTranscript;

impl MessageSink for TerminalTranscript {
    fn append(&mut self, entry: TranscriptEntry) {
        let prefix = match entry.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::Error => "error",
        };
        match entry.content {
            MessageContent::Text(text) => {
                let mut lines = text.lines();
                println!("{:>10}> {}", prefix, lines.next().unwrap_or_default());
                for line in lines {
                    println!("{:>10}  {}", "", line);
                }
            }
            MessageContent::Image(url) => {
                println!("{:>10}> {}", prefix, describe_image(&url));
            }
        }
    }
}

/// `[image/png, 1234 bytes]` for a base64 data URL.
fn describe_image(data_url: &str) -> String {
    let Some((header, payload)) = data_url.split_once(',') else {
        return "[image]".to_string();
    };
    let mime = header
        .trim_start_matches("data:")
        .trim_end_matches(";base64");
    let padding = payload.chars().rev().take_while(|c| *c == '=').count();
    let bytes = (payload.len() / 4 * 3).saturating_sub(padding);
    format!("[{}, {} bytes]", mime, bytes)
}
