//! Utterance Controller
//!
//! One in-flight speak request at a time: starts and cancels synthesis,
//! tracks the Idle/Speaking state, reconstructs partial captions from word
//! boundary events, and toggles the lip-sync animator. A generation counter
//! tags every utterance so callbacks from a cancelled one can never mutate
//! state after its replacement has begun.

use crate::error::{AvaError, AvaResult};
use crate::lipsync::LipSyncAnimator;
use crate::synth::{BoundaryKind, SpeechSynth, SynthEvent, SynthRequest};
use crate::voices::Voice;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Caption callback receiving the text spoken so far
pub type CaptionFn = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Speaking,
}

#[derive(Debug)]
struct Shared {
    generation: u64,
    state: SpeechState,
}

pub struct UtteranceController {
    synth: Arc<dyn SpeechSynth>,
    animator: Arc<dyn LipSyncAnimator>,
    shared: Arc<Mutex<Shared>>,
    pitch: f32,
    rate: f32,
}

impl std::fmt::Debug for UtteranceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtteranceController")
            .field("engine", &self.synth.name())
            .field("state", &self.state())
            .finish()
    }
}

impl UtteranceController {
    pub fn new(synth: Arc<dyn SpeechSynth>, animator: Arc<dyn LipSyncAnimator>) -> Self {
        Self {
            synth,
            animator,
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                state: SpeechState::Idle,
            })),
            pitch: 1.0,
            rate: 1.0,
        }
    }

    pub fn with_prosody(mut self, pitch: f32, rate: f32) -> Self {
        self.pitch = pitch;
        self.rate = rate;
        self
    }

    pub fn state(&self) -> SpeechState {
        self.shared.lock().expect("speech state poisoned").state
    }

    pub fn is_speaking(&self) -> bool {
        self.state() == SpeechState::Speaking
    }

    /// Speak `text`, cancelling any in-flight utterance first.
    ///
    /// Empty or whitespace-only text is a no-op. The caption callback gets
    /// the substring spoken so far on every word boundary and always ends
    /// with the complete, exact input text on natural completion.
    pub async fn speak(
        &self,
        text: &str,
        voice: Option<Voice>,
        caption: Option<CaptionFn>,
    ) -> AvaResult<()> {
        if text.trim().is_empty() {
            debug!("Ignoring empty speak request");
            return Ok(());
        }

        let my_gen = self.retire_current().await;

        let request = SynthRequest {
            text: text.to_string(),
            voice,
            pitch: self.pitch,
            rate: self.rate,
        };
        let (tx, rx) = mpsc::unbounded_channel();

        if let Err(e) = self.synth.speak(request, tx).await {
            warn!("⚠️ Synthesis failed to start: {}", e);
            return Err(AvaError::Synthesis(e.to_string()));
        }

        self.pump_events(my_gen, text.to_string(), rx, caption);
        Ok(())
    }

    /// Stop the in-flight utterance, if any, and force the Idle state
    pub async fn cancel(&self) {
        self.retire_current().await;
    }

    /// Block until the controller has settled back to Idle
    pub async fn wait_until_idle(&self) {
        while self.is_speaking() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Invalidate the current utterance and return the generation the next
    /// one will own. The synthesis backend is cancelled and the animator
    /// reset before this returns, so a caller can start the replacement
    /// immediately.
    async fn retire_current(&self) -> u64 {
        let my_gen = {
            let mut shared = self.shared.lock().expect("speech state poisoned");
            shared.generation += 1;
            if shared.state == SpeechState::Speaking {
                debug!("Cancelling in-flight utterance");
            }
            shared.state = SpeechState::Idle;
            shared.generation
        };

        if let Err(e) = self.synth.cancel().await {
            warn!("⚠️ Synthesis cancel failed: {}", e);
        }
        self.animator.stop_talking();
        my_gen
    }

    fn pump_events(
        &self,
        my_gen: u64,
        text: String,
        mut rx: mpsc::UnboundedReceiver<SynthEvent>,
        caption: Option<CaptionFn>,
    ) {
        let shared = self.shared.clone();
        let animator = self.animator.clone();
        let text_chars = text.chars().count();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    SynthEvent::Started => {
                        if !transition(&shared, my_gen, SpeechState::Speaking) {
                            break;
                        }
                        animator.start_talking();
                    }
                    SynthEvent::Boundary {
                        char_index,
                        char_length,
                        kind: BoundaryKind::Word,
                    } => {
                        if !owns(&shared, my_gen) {
                            break;
                        }
                        if let Some(cb) = &caption {
                            // Rebuild the text up to the end of the word
                            // just started; boundary offsets may overshoot
                            let upto = (char_index + char_length).min(text_chars);
                            let partial: String = text.chars().take(upto).collect();
                            cb(&partial);
                        }
                    }
                    SynthEvent::Boundary { .. } => {}
                    SynthEvent::Ended => {
                        if transition(&shared, my_gen, SpeechState::Idle) {
                            animator.stop_talking();
                            // Boundary events may have under- or over-shot;
                            // the last caption is always the exact input
                            if let Some(cb) = &caption {
                                cb(&text);
                            }
                        }
                        break;
                    }
                    SynthEvent::Error(e) => {
                        warn!("⚠️ Synthesis error, recovering: {}", e);
                        if transition(&shared, my_gen, SpeechState::Idle) {
                            animator.stop_talking();
                        }
                        break;
                    }
                }
            }
        });
    }
}

/// Whether `my_gen` is still the live utterance
fn owns(shared: &Arc<Mutex<Shared>>, my_gen: u64) -> bool {
    shared.lock().expect("speech state poisoned").generation == my_gen
}

/// Apply a state transition only if `my_gen` is still the live utterance
fn transition(shared: &Arc<Mutex<Shared>>, my_gen: u64, to: SpeechState) -> bool {
    let mut shared = shared.lock().expect("speech state poisoned");
    if shared.generation != my_gen {
        return false;
    }
    shared.state = to;
    true
}
