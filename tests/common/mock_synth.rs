//! Mock Synthesis Engine for Testing
//!
//! Records every request and replays a complete event stream immediately.

use anyhow::Result;
use async_trait::async_trait;
use avatalk::synth::{BoundaryKind, SpeechSynth, SynthEvent, SynthRequest};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Mock synthesis engine that records requested utterances
#[derive(Debug)]
pub struct MockSynth {
    /// Every request that was "spoken"
    pub requests: Arc<Mutex<Vec<SynthRequest>>>,
    /// Simulate a mid-utterance failure
    pub should_fail: Arc<Mutex<bool>>,
}

impl MockSynth {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn fail_next(&self) {
        *self.should_fail.lock().unwrap() = true;
    }

    /// Get all spoken texts
    pub fn spoken(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect()
    }

    /// Check if a phrase was spoken
    pub fn was_spoken(&self, text: &str) -> bool {
        self.spoken().iter().any(|s| s.contains(text))
    }
}

impl Default for MockSynth {
    fn default() -> Self {
        Self::new()
    }
}

fn words(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    let mut idx = 0;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, idx - s));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
        idx += 1;
    }
    if let Some(s) = start {
        out.push((s, idx - s));
    }
    out
}

#[async_trait]
impl SpeechSynth for MockSynth {
    async fn speak(
        &self,
        request: SynthRequest,
        events: mpsc::UnboundedSender<SynthEvent>,
    ) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());

        let _ = events.send(SynthEvent::Started);

        if std::mem::take(&mut *self.should_fail.lock().unwrap()) {
            let _ = events.send(SynthEvent::Error("mock synthesis failure".to_string()));
            return Ok(());
        }

        for (char_index, char_length) in words(&request.text) {
            let _ = events.send(SynthEvent::Boundary {
                char_index,
                char_length,
                kind: BoundaryKind::Word,
            });
        }
        let _ = events.send(SynthEvent::Ended);
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_synth_records_requests() {
        let mock = MockSynth::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        mock.speak(SynthRequest::new("hello world"), tx)
            .await
            .unwrap();

        assert!(mock.was_spoken("hello"));
        assert_eq!(rx.recv().await, Some(SynthEvent::Started));
        let mut last = None;
        while let Some(ev) = rx.recv().await {
            last = Some(ev);
        }
        assert_eq!(last, Some(SynthEvent::Ended));
    }
}
