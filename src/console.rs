//! Line-oriented stdin console for driving a device without hardware.
//!
//! `tap` stands in for the impact sensor, `face <n>` / `face none` moves the
//! simulated device, `config <json>` injects a configuration document as if
//! it arrived on the config topic.

use anyhow::Result;
use log::{info, warn};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::adapters::FaceHandle;
use crate::config::FaceIndex;
use crate::device::Device;
use crate::ports::{KeyValueStore, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tap,
    Face(Option<FaceIndex>),
    Config(String),
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word {
            "tap" => Ok(Command::Tap),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "face" if rest == "none" => Ok(Command::Face(None)),
            "face" => rest
                .parse::<usize>()
                .ok()
                .and_then(FaceIndex::new)
                .map(|face| Command::Face(Some(face)))
                .ok_or_else(|| format!("expected a face number or 'none', got '{rest}'")),
            "config" if !rest.is_empty() => Ok(Command::Config(rest.to_string())),
            "config" => Err("config needs a JSON document".into()),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

const HELP: &str = "commands: tap | face <0-11> | face none | config <json> | status | quit";

/// Read commands until `quit` or end of input.
pub async fn run_console<S, T>(device: &Device<S, T>, face: &FaceHandle) -> Result<()>
where
    S: KeyValueStore + 'static,
    T: Transport,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(reason) => {
                println!("{reason}");
                continue;
            }
        };

        match command {
            Command::Tap => {
                if !device.controller().record_impact().await {
                    println!("tap ignored: current face is not counting");
                }
            }
            Command::Face(next) => {
                face.set(next);
                info!(
                    "Simulated device now resting on {}",
                    next.map_or_else(|| "nothing".to_string(), |f| format!("face {f}"))
                );
            }
            Command::Config(document) => {
                if let Err(err) = device
                    .on_message(device.config_topic(), document.as_bytes())
                    .await
                {
                    warn!("Configuration not applied: {err:#}");
                }
            }
            Command::Status => {
                let status = json!({
                    "session": device.controller().snapshot().await,
                    "version": device.store().version(),
                    "faces": device.store().snapshot(),
                });
                println!("{status:#}");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    Ok(())
}
