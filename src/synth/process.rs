//! Process synthesis backend
//!
//! Shells out to spd-say or espeak-ng for audible output while pacing
//! approximate word boundary events alongside the child process. Boundary
//! timing is an estimate; the utterance controller corrects the final
//! caption regardless.

use super::{word_boundaries, BoundaryKind, SpeechSynth, SynthEvent, SynthRequest};
use crate::config::Config;
use crate::voices::{Voice, VoiceSource};
use anyhow::Result;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const CHILD_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct ProcessSynth {
    words_per_minute: u32,
    generation: Arc<AtomicU64>,
    child: Arc<Mutex<Option<Child>>>,
}

impl ProcessSynth {
    pub fn new(config: &Config) -> Self {
        Self {
            words_per_minute: config.words_per_minute.max(1),
            generation: Arc::new(AtomicU64::new(0)),
            child: Arc::new(Mutex::new(None)),
        }
    }

    fn spawn_speaker(&self, request: &SynthRequest) -> Result<Child> {
        // Try spd-say (speech-dispatcher) or espeak-ng
        let rate_pct = (((request.rate - 1.0) * 100.0).clamp(-100.0, 100.0)) as i32;
        let pitch_pct = (((request.pitch - 1.0) * 100.0).clamp(-100.0, 100.0)) as i32;

        let mut spd = Command::new("spd-say");
        spd.arg("-r")
            .arg(rate_pct.to_string())
            .arg("-p")
            .arg(pitch_pct.to_string());
        if let Some(voice) = &request.voice {
            spd.arg("-l").arg(&voice.lang);
        }
        spd.arg("-w").arg(&request.text);
        spd.stdout(Stdio::null()).stderr(Stdio::null());
        if let Ok(child) = spd.spawn() {
            return Ok(child);
        }

        let speed = (self.words_per_minute as f32 * request.rate.max(0.1)) as u32;
        let pitch = ((request.pitch * 50.0).clamp(0.0, 99.0)) as u32;
        let mut espeak = Command::new("espeak-ng");
        espeak
            .arg("-s")
            .arg(speed.to_string())
            .arg("-p")
            .arg(pitch.to_string());
        if let Some(voice) = &request.voice {
            espeak.arg("-v").arg(&voice.id);
        }
        espeak.arg(&request.text);
        espeak.stdout(Stdio::null()).stderr(Stdio::null());
        if let Ok(child) = espeak.spawn() {
            return Ok(child);
        }

        Err(anyhow::anyhow!(
            "No system TTS command found (tried spd-say, espeak-ng)"
        ))
    }

    fn word_delay(&self, rate: f32) -> Duration {
        let rate = if rate > 0.0 { rate } else { 1.0 };
        Duration::from_secs_f32(60.0 / (self.words_per_minute as f32 * rate))
    }

    /// Parse `espeak-ng --voices` output into voice snapshots
    fn parse_voices(output: &str) -> Vec<Voice> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let cols: Vec<&str> = line.split_whitespace().collect();
                if cols.len() < 5 {
                    return None;
                }
                let lang = cols[1].to_string();
                let name = cols[3].replace('_', " ").replace(['(', ')'], "");
                Some(Voice {
                    id: cols[4].to_string(),
                    name,
                    lang,
                    is_platform_default: false,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SpeechSynth for ProcessSynth {
    async fn speak(
        &self,
        request: SynthRequest,
        events: mpsc::UnboundedSender<SynthEvent>,
    ) -> Result<()> {
        info!("📢 Speaking via process engine: '{}'", request.text);

        let generation = self.generation.clone();
        let my_gen = generation.fetch_add(1, Ordering::SeqCst) + 1;

        let spawned = self.spawn_speaker(&request)?;
        {
            let mut slot = self.child.lock().await;
            // A replaced child belongs to a superseded utterance
            if let Some(mut old) = slot.replace(spawned) {
                let _ = old.start_kill();
            }
        }

        let child = self.child.clone();
        let delay = self.word_delay(request.rate);

        tokio::spawn(async move {
            let owns = |g: &AtomicU64| g.load(Ordering::SeqCst) == my_gen;

            if !owns(&generation) || events.send(SynthEvent::Started).is_err() {
                return;
            }

            for (char_index, char_length) in word_boundaries(&request.text) {
                if !owns(&generation) {
                    return;
                }
                if events
                    .send(SynthEvent::Boundary {
                        char_index,
                        char_length,
                        kind: BoundaryKind::Word,
                    })
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(delay).await;
            }

            // Pacing done; report completion when the child exits
            loop {
                if !owns(&generation) {
                    return;
                }
                {
                    let mut slot = child.lock().await;
                    let Some(c) = slot.as_mut() else {
                        // Cancelled from under us
                        return;
                    };
                    match c.try_wait() {
                        Ok(Some(status)) => {
                            *slot = None;
                            if status.success() {
                                let _ = events.send(SynthEvent::Ended);
                            } else {
                                let _ = events.send(SynthEvent::Error(format!(
                                    "synthesis process exited with {}",
                                    status
                                )));
                            }
                            return;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            *slot = None;
                            let _ = events.send(SynthEvent::Error(e.to_string()));
                            return;
                        }
                    }
                }
                tokio::time::sleep(CHILD_POLL).await;
            }
        });

        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.child.lock().await;
        if let Some(mut c) = slot.take() {
            debug!("🛑 Killing in-flight synthesis process");
            let _ = c.start_kill();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "process"
    }
}

#[async_trait]
impl VoiceSource for ProcessSynth {
    async fn voices(&self) -> Result<Vec<Voice>> {
        let output = Command::new("espeak-ng")
            .arg("--voices")
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("espeak-ng not available: {}", e))?;

        if !output.status.success() {
            warn!("⚠️ espeak-ng --voices exited with {}", output.status);
            return Ok(Vec::new());
        }

        Ok(Self::parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }
}
