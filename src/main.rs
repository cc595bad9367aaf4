//! Avatalk - Chat companion with a speech-synchronized avatar
//!
//! Terminal front-end wiring the chat session, utterance controller, and
//! lip-sync animator together.

use anyhow::Result;
use avatalk::avatar::{self, AssetRef, AvatarPresenter, TracePresenter};
use avatalk::chat::{ChatSession, HttpTransport};
use avatalk::config::Config;
use avatalk::lipsync::continuous::ContinuousAnimator;
use avatalk::lipsync::discrete::DiscreteAnimator;
use avatalk::lipsync::LipSyncAnimator;
use avatalk::synth;
use avatalk::utterance::{CaptionFn, UtteranceController};
use avatalk::voices::VoiceCatalog;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Chat endpoint URL override
    #[arg(long)]
    url: Option<String>,

    /// Synthesis engine: scripted or process
    #[arg(long)]
    engine: Option<String>,

    /// Avatar mode: discrete or continuous
    #[arg(long)]
    avatar: Option<String>,
}

fn prompt() {
    print!("you> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🗨️ Avatalk v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load()?;
    if let Some(url) = args.url {
        config.chat_url = url;
    }
    if let Some(engine) = args.engine {
        config.synth_engine = engine;
    }
    if let Some(mode) = args.avatar {
        config.avatar_mode = mode;
    }

    let (engine, voice_source) = synth::create_engine(&config);

    let mut catalog = VoiceCatalog::new();
    catalog.refresh(voice_source.as_ref()).await;
    if catalog.is_empty() {
        warn!("⚠️ No voices available, replies will use the engine default");
    }

    let presenter: Arc<dyn AvatarPresenter> = Arc::new(TracePresenter::new());

    let animator: Arc<dyn LipSyncAnimator> = match config.avatar_mode.as_str() {
        "continuous" => {
            let reference = if config.avatar_asset.is_empty() {
                "builtin-rig".to_string()
            } else {
                config.avatar_asset.clone()
            };
            let animator = ContinuousAnimator::spawn(presenter.clone(), &config);
            match presenter.load_asset(&AssetRef::Rig(reference)) {
                Ok(caps) => animator.set_mouth_capable(caps.morph_targets),
                Err(e) => {
                    warn!("⚠️ Avatar asset failed, mouth animation disabled: {}", e);
                    animator.set_mouth_capable(false);
                }
            }
            animator
        }
        _ => {
            let animator = Arc::new(DiscreteAnimator::new(presenter.clone(), &config));
            match presenter.load_asset(&avatar::default_pose_set()) {
                Ok(caps) => animator.set_mouth_capable(caps.mouth_poses),
                Err(e) => {
                    warn!("⚠️ Avatar asset failed, mouth animation disabled: {}", e);
                    animator.set_mouth_capable(false);
                }
            }
            animator
        }
    };

    let controller =
        UtteranceController::new(engine, animator).with_prosody(config.pitch, config.rate);
    let mut session = ChatSession::new(Arc::new(HttpTransport::new(&config)));

    info!("✅ Avatalk ready - type a message, or /voices, /voice N, /history, /quit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    prompt();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();

        if line == "/quit" || line == "/exit" {
            break;
        }

        if line == "/voices" {
            catalog.refresh(voice_source.as_ref()).await;
            for (idx, option) in catalog.options().iter().enumerate() {
                let mark = if option.selected { '*' } else { ' ' };
                println!("{} {:2}  {}", mark, idx, option.label);
            }
            prompt();
            continue;
        }

        if line == "/history" {
            for message in session.transcript() {
                println!(
                    "[{}] {}: {}",
                    message.timestamp.format("%H:%M:%S"),
                    message.sender.display(),
                    message.text
                );
            }
            prompt();
            continue;
        }

        if let Some(rest) = line.strip_prefix("/voice") {
            match rest.trim().parse::<usize>() {
                Ok(idx) => {
                    if let Err(e) = catalog.select(idx) {
                        warn!("{}", e);
                    }
                }
                Err(_) => warn!("Usage: /voice <index>"),
            }
            prompt();
            continue;
        }

        if line.is_empty() {
            prompt();
            continue;
        }

        // Stop any reply still being spoken before sending the next turn
        controller.cancel().await;

        match session.send(&line).await {
            Ok(Some(reply)) => {
                let caption: CaptionFn = Arc::new(|partial: &str| {
                    print!("\r ai> {}", partial);
                    let _ = std::io::stdout().flush();
                });
                let voice = catalog.selected_voice().cloned();
                match controller.speak(&reply, voice, Some(caption)).await {
                    Ok(()) => {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        controller.wait_until_idle().await;
                        println!();
                    }
                    Err(e) => {
                        warn!("⚠️ Could not speak reply: {}", e);
                        println!(" ai> {}", reply);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => println!(" !! {}", e),
        }

        prompt();
    }

    controller.cancel().await;
    info!("👋 Avatalk shutting down");
    Ok(())
}
