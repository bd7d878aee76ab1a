//! Hark Control - send a wake or a command to a running agent
//!
//! Run with: cargo run --bin hark-ctl -- cmd "stop music"

use anyhow::Result;
use clap::{Parser, Subcommand};
use hark::ipc::{ControlClient, ControlMessage};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent control address
    #[arg(short, long, default_value = "127.0.0.1:2013")]
    target: SocketAddr,

    #[command(subcommand)]
    message: Message,
}

#[derive(Subcommand, Debug)]
enum Message {
    /// Open the command window
    Wake,
    /// Run a command phrase without the wake word
    Cmd {
        /// Command text, e.g. "open firefox"
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let message = match args.message {
        Message::Wake => ControlMessage::Wake,
        Message::Cmd { words } => ControlMessage::RunCommand(words.join(" ")),
    };

    ControlClient::connect(args.target)
        .await?
        .send(&message)
        .await
}
