//! pastelink CLI: drive one peer session from a terminal.
//!
//! `pastelink initiate` prints an offer blob to copy to the other device
//! and waits for the pasted answer; `pastelink join` does the reverse.
//! After the handshake, plain lines are chat, `/send <path>` transfers a
//! file, `/quit` exits. Logs go to stderr so blobs and chat stay clean on
//! stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pastelink::core::pipeline::receiver::ReceivedFile;
use pastelink::core::session::{Direction, Session, SessionEvent};
use pastelink::core::transport::webrtc::WebRtcTransport;
use pastelink::utils::paths::sanitize_file_name;

#[derive(Parser)]
#[command(name = "pastelink", version, about = "Serverless LAN chat and file transfer with copy-paste signaling")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory where received files are saved.
    #[arg(long, default_value = "downloads")]
    download_dir: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session and print the offer blob to share.
    Initiate,
    /// Join a session from a pasted offer blob.
    Join,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // webrtc_ice logs "unknown TransactionID" warnings for late-arriving
    // STUN responses, which are normal. Filter these out to reduce noise.
    let filter = match args.verbose {
        0 => "warn,pastelink=info,webrtc_ice::agent=error",
        1 => "info,webrtc_ice::agent=error",
        2 => "debug,webrtc_ice::agent=error",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let (transport, mut transport_rx) = WebRtcTransport::new().await?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(transport, event_tx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match args.command {
        Command::Initiate => {
            let blob = session.start_as_initiator().await?;
            println!("── copy this offer to the other device ──");
            println!("{blob}");
            println!("── then paste their answer below ──");
            let answer = read_blob(&mut lines).await?;
            session.apply_remote_answer(&answer).await?;
        }
        Command::Join => {
            println!("── paste the offer blob below ──");
            let offer = read_blob(&mut lines).await?;
            let blob = session.accept_remote_offer(&offer).await?;
            println!("── copy this answer back to the other device ──");
            println!("{blob}");
        }
    }

    println!("type to chat, /send <path> to transfer a file, /quit to exit");
    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                let Some(line) = maybe_line.context("reading stdin")? else {
                    break;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                if let Some(path) = line.strip_prefix("/send ") {
                    // Failures on the spawned transfer task come back as
                    // TransferFailed events, so the handle can be dropped.
                    if let Err(err) = session.send_file(path.trim()) {
                        eprintln!("cannot send file: {err}");
                    }
                } else if let Err(err) = session.send_chat(line).await {
                    eprintln!("cannot send: {err}");
                }
            }
            Some(ev) = transport_rx.recv() => {
                session.handle_transport_event(ev);
            }
            Some(ev) = event_rx.recv() => {
                render_event(ev, &args.download_dir).await;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    session.close().await;
    Ok(())
}

/// Read the next non-empty stdin line (pasted blobs often arrive with
/// stray blank lines around them).
async fn read_blob(lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
    loop {
        match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => return Ok(line),
            Some(_) => continue,
            None => bail!("stdin closed before a blob was pasted"),
        }
    }
}

async fn render_event(event: SessionEvent, download_dir: &Path) {
    match event {
        SessionEvent::StateChanged(state) => println!("[session] {state:?}"),
        SessionEvent::ChatAppended(msg) => {
            let who = match msg.origin {
                pastelink::core::chat::Origin::Local => "you",
                pastelink::core::chat::Origin::Remote => "peer",
            };
            println!("[{}] {who}: {}", msg.timestamp, msg.text);
        }
        SessionEvent::FileReceived(file) => save_received_file(download_dir, file).await,
        SessionEvent::TrackAdded { kind } => {
            println!("[media] remote {kind} track available");
        }
        SessionEvent::TransferProgress {
            name,
            direction,
            transferred,
            total,
        } => {
            let arrow = match direction {
                Direction::Inbound => "recv",
                Direction::Outbound => "send",
            };
            if total > 0 {
                println!("[{arrow}] {name}: {transferred}/{total} bytes");
            } else {
                println!("[{arrow}] {name}: {transferred} bytes");
            }
        }
        SessionEvent::TransferFailed { name, reason } => {
            eprintln!("[send] {name} failed: {reason}");
        }
    }
}

async fn save_received_file(dir: &Path, file: ReceivedFile) {
    if let Err(err) = tokio::fs::create_dir_all(dir).await {
        warn!(%err, "cannot create download directory");
        eprintln!("cannot save {}: {err}", file.meta.name);
        return;
    }

    let name = sanitize_file_name(&file.meta.name);
    let mut path = dir.join(&name);
    let mut counter = 1u32;
    while path.exists() {
        path = dir.join(format!("{counter}-{name}"));
        counter += 1;
    }

    match tokio::fs::write(&path, &file.bytes).await {
        Ok(()) => println!(
            "[file] saved {} ({} bytes) to {}",
            file.meta.name,
            file.bytes.len(),
            path.display()
        ),
        Err(err) => eprintln!("cannot save {}: {err}", file.meta.name),
    }
}
