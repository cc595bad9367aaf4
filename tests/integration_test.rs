use std::sync::{Arc, Mutex};
use std::time::Duration;

use avatalk::avatar::RecordingPresenter;
use avatalk::chat::ChatSession;
use avatalk::config::Config;
use avatalk::lipsync::discrete::DiscreteAnimator;
use avatalk::lipsync::MouthFrame;
use avatalk::synth::scripted::ScriptedSynth;
use avatalk::utterance::{CaptionFn, SpeechState, UtteranceController};

mod common;
use common::{MockSynth, MockTransport};

fn fast_config() -> Config {
    let mut config = Config::default();
    config.tick_ms = 1;
    config
}

fn capture() -> (CaptionFn, Arc<Mutex<Vec<String>>>) {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let cb: CaptionFn = Arc::new(move |partial: &str| {
        sink.lock().unwrap().push(partial.to_string());
    });
    (cb, log)
}

async fn settle(controller: &UtteranceController) {
    tokio::time::sleep(Duration::from_millis(40)).await;
    controller.wait_until_idle().await;
}

/// Full chat turn: user text in, reply spoken, avatar animated, everything
/// back to neutral afterwards
#[tokio::test]
async fn test_chat_turn_end_to_end() {
    let presenter = Arc::new(RecordingPresenter::new());
    let animator = Arc::new(DiscreteAnimator::new(presenter.clone(), &fast_config()));
    let synth = Arc::new(ScriptedSynth::with_words_per_minute(600));
    let controller = UtteranceController::new(synth, animator.clone());

    let mut session = ChatSession::new(Arc::new(MockTransport::replying("Hi there")));

    let reply = session.send("Hello").await.expect("chat turn failed");
    assert_eq!(reply.as_deref(), Some("Hi there"));
    assert_eq!(session.transcript().len(), 2);

    let (cb, log) = capture();
    controller
        .speak(&reply.unwrap(), None, Some(cb))
        .await
        .expect("speak failed");

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(controller.state(), SpeechState::Speaking);
    controller.wait_until_idle().await;

    // The caption converged on the exact reply text
    let captions = log.lock().unwrap().clone();
    assert_eq!(captions.last().map(String::as_str), Some("Hi there"));

    // Frame sequence: neutral, at least one non-neutral while speaking,
    // neutral again at the end
    let frames = presenter.frames();
    assert_eq!(frames.first(), Some(&MouthFrame::neutral()));
    assert_eq!(frames.last(), Some(&MouthFrame::neutral()));
    assert!(
        frames.iter().any(|f| !f.is_neutral()),
        "no non-neutral frame was produced while speaking"
    );

    // No tick survives the return to Idle
    assert!(!animator.timer_active());
}

/// A new turn cancels the previous reply before speaking the next one
#[tokio::test]
async fn test_new_turn_supersedes_spoken_reply() {
    let presenter = Arc::new(RecordingPresenter::new());
    let animator = Arc::new(DiscreteAnimator::new(presenter.clone(), &fast_config()));
    // Slow pacing so the first reply is still in flight
    let synth = Arc::new(ScriptedSynth::with_words_per_minute(120));
    let controller = UtteranceController::new(synth, animator.clone());

    let (cb, log) = capture();
    controller
        .speak("alpha beta gamma delta epsilon", None, Some(cb.clone()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(controller.is_speaking());

    // Next chat turn: cancel, then speak the new reply
    controller.cancel().await;
    assert_eq!(controller.state(), SpeechState::Idle);
    assert!(!animator.timer_active());

    let marker = log.lock().unwrap().len();
    controller.speak("short reply", None, Some(cb)).await.unwrap();
    settle(&controller).await;

    let captions = log.lock().unwrap().clone();
    for caption in &captions[marker..] {
        assert!(
            "short reply".starts_with(caption.as_str()),
            "caption from the cancelled reply leaked through: '{}'",
            caption
        );
    }
    assert_eq!(captions.last().map(String::as_str), Some("short reply"));
}

/// Empty chat input creates no utterance and leaves all state untouched
#[tokio::test]
async fn test_empty_input_creates_no_utterance() {
    let presenter = Arc::new(RecordingPresenter::new());
    let animator = Arc::new(DiscreteAnimator::new(presenter.clone(), &fast_config()));
    let synth = Arc::new(MockSynth::new());
    let controller = UtteranceController::new(synth.clone(), animator);

    let mut session = ChatSession::new(Arc::new(MockTransport::replying("unused")));
    assert!(session.send("   ").await.unwrap().is_none());
    assert!(session.transcript().is_empty());

    controller.speak("   \t ", None, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(synth.spoken().is_empty());
    assert_eq!(controller.state(), SpeechState::Idle);
}

/// Synthesis failure recovers to Idle and the chat keeps working
#[tokio::test]
async fn test_synthesis_failure_keeps_chat_usable() {
    let presenter = Arc::new(RecordingPresenter::new());
    let animator = Arc::new(DiscreteAnimator::new(presenter.clone(), &fast_config()));
    let synth = Arc::new(MockSynth::new());
    let controller = UtteranceController::new(synth.clone(), animator.clone());

    synth.fail_next();
    controller.speak("doomed reply", None, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(controller.state(), SpeechState::Idle);
    assert!(!animator.timer_active());

    // The next utterance goes through normally
    controller.speak("second reply", None, None).await.unwrap();
    settle(&controller).await;
    assert!(synth.was_spoken("second reply"));
    assert_eq!(controller.state(), SpeechState::Idle);
}

/// Transport failure surfaces as a system message without touching speech
#[tokio::test]
async fn test_transport_failure_is_isolated() {
    let presenter = Arc::new(RecordingPresenter::new());
    let animator = Arc::new(DiscreteAnimator::new(presenter.clone(), &fast_config()));
    let synth = Arc::new(MockSynth::new());
    let controller = UtteranceController::new(synth.clone(), animator);

    let transport = Arc::new(MockTransport::replying("unused"));
    *transport.should_fail.lock().unwrap() = true;
    let mut session = ChatSession::new(transport);

    assert!(session.send("Hello").await.is_err());
    assert_eq!(controller.state(), SpeechState::Idle);
    assert!(synth.spoken().is_empty());

    // Transcript shows the user turn plus the visible system message
    let senders: Vec<_> = session.transcript().iter().map(|m| m.sender).collect();
    assert_eq!(
        senders,
        vec![avatalk::chat::Sender::User, avatalk::chat::Sender::System]
    );
}
