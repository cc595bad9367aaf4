//! Scripted synthesis backend
//!
//! Paces word boundary events from the text itself on tokio timers instead
//! of producing audio. Default engine: needs no external binaries and gives
//! the animation pipeline the same event stream a real platform would.

use super::{word_boundaries, BoundaryKind, SpeechSynth, SynthEvent, SynthRequest};
use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
pub struct ScriptedSynth {
    words_per_minute: u32,
    /// Bumped on every speak/cancel; the pacing task stops when it no
    /// longer owns the current generation.
    generation: Arc<AtomicU64>,
}

impl ScriptedSynth {
    pub fn new(config: &Config) -> Self {
        Self {
            words_per_minute: config.words_per_minute.max(1),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fast pacing for tests
    #[doc(hidden)]
    pub fn with_words_per_minute(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn word_delay(&self, rate: f32) -> Duration {
        let rate = if rate > 0.0 { rate } else { 1.0 };
        let secs = 60.0 / (self.words_per_minute as f32 * rate);
        Duration::from_secs_f32(secs)
    }
}

#[async_trait]
impl SpeechSynth for ScriptedSynth {
    async fn speak(
        &self,
        request: SynthRequest,
        events: mpsc::UnboundedSender<SynthEvent>,
    ) -> Result<()> {
        let generation = self.generation.clone();
        let my_gen = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.word_delay(request.rate);

        debug!(
            "Scripted speaking {} chars at {} wpm",
            request.text.chars().count(),
            self.words_per_minute
        );

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

            if owns(&generation) {
                let _ = events.send(SynthEvent::Ended);
            }
        });

        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
