//! Speech Synthesis Module
//!
//! Provides a unified interface for speech synthesis backends.

use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::voices::{StaticVoices, Voice, VoiceSource};

pub mod process;
pub mod scripted;

/// One request to vocalize a text string
#[derive(Debug, Clone)]
pub struct SynthRequest {
    pub text: String,
    pub voice: Option<Voice>,
    pub pitch: f32,
    pub rate: f32,
}

impl SynthRequest {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            voice: None,
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

/// Boundary granularity reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Word,
    Sentence,
}

/// Lifecycle events reported by a synthesis backend.
///
/// Boundary offsets are in characters of the request text: `char_index` is
/// the start of the word just begun, `char_length` its length.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthEvent {
    /// Audio output began
    Started,
    /// A word/sentence boundary was reached during synthesis
    Boundary {
        char_index: usize,
        char_length: usize,
        kind: BoundaryKind,
    },
    /// Synthesis finished naturally
    Ended,
    /// Synthesis failed mid-flight
    Error(String),
}

/// Trait for speech synthesis engines
#[async_trait]
pub trait SpeechSynth: Send + Sync + std::fmt::Debug {
    /// Begin speaking the request, reporting lifecycle events on `events`.
    ///
    /// Returns once synthesis is underway, not when it finishes.
    async fn speak(
        &self,
        request: SynthRequest,
        events: mpsc::UnboundedSender<SynthEvent>,
    ) -> Result<()>;

    /// Cancel any in-flight synthesis. Events from the cancelled utterance
    /// stop once this returns.
    async fn cancel(&self) -> Result<()>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the configured synthesis engine together with its
/// voice source
pub fn create_engine(config: &Config) -> (Arc<dyn SpeechSynth>, Arc<dyn VoiceSource>) {
    info!("🛠️ Creating synthesis engine: {}", config.synth_engine);
    let (engine, voices): (Arc<dyn SpeechSynth>, Arc<dyn VoiceSource>) =
        match config.synth_engine.as_str() {
            "process" => {
                info!("  - Using process engine (spd-say / espeak-ng)");
                let engine = Arc::new(process::ProcessSynth::new(config));
                (engine.clone(), engine)
            }
            "scripted" => (
                Arc::new(scripted::ScriptedSynth::new(config)),
                Arc::new(StaticVoices::builtin()),
            ),
            _ => {
                warn!(
                    "  - Unknown engine '{}', falling back to scripted",
                    config.synth_engine
                );
                (
                    Arc::new(scripted::ScriptedSynth::new(config)),
                    Arc::new(StaticVoices::builtin()),
                )
            }
        };
    info!("✅ Synthesis engine '{}' initialized", engine.name());
    (engine, voices)
}

/// Word boundaries of a text, in characters: (start, length) per word
pub(crate) fn word_boundaries(text: &str) -> Vec<(usize, usize)> {
    let mut boundaries = Vec::new();
    let mut start = None;
    let mut idx = 0;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                boundaries.push((s, idx - s));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
        idx += 1;
    }
    if let Some(s) = start {
        boundaries.push((s, idx - s));
    }
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_boundaries() {
        assert_eq!(word_boundaries("Hi there"), vec![(0, 2), (3, 5)]);
        assert_eq!(word_boundaries("  padded  out "), vec![(2, 6), (10, 3)]);
        assert_eq!(word_boundaries(""), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn test_word_boundaries_multibyte() {
        // Offsets are chars, not bytes
        assert_eq!(word_boundaries("héllo wörld"), vec![(0, 5), (6, 5)]);
    }
}
