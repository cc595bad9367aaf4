//! Continuous-weight lip-sync
//!
//! Samples composed oscillators over elapsed session time every rendered
//! frame. A fast "syllable" wave supplies the flapping, a slower two-tone
//! "rhythm" wave gates and tapers it so speech has open-mouth stretches and
//! pauses. Blinking and eye saccades are independent of speech and keep
//! running while idle; mouth weights are forced to zero every idle frame.

use super::{lerp, LipSyncAnimator, MorphWeights, MouthFrame};
use crate::avatar::AvatarPresenter;
use crate::config::Config;
use rand::Rng;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Horizontal / vertical gaze target range
const SACCADE_RANGE_X: f32 = 0.3;
const SACCADE_RANGE_Y: f32 = 0.2;

/// Oscillator and idle-motion tuning, taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct MotionConfig {
    pub syllable_freq: f32,
    pub rhythm_freq_a: f32,
    pub rhythm_freq_b: f32,
    pub rhythm_gate: f32,
    pub jaw_amplitude: f32,
    pub blink_min_secs: f32,
    pub blink_max_secs: f32,
    pub blink_duration: f32,
    pub saccade_min_secs: f32,
    pub saccade_max_secs: f32,
    pub saccade_smoothing: f32,
}

impl MotionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            syllable_freq: config.syllable_freq,
            rhythm_freq_a: config.rhythm_freq_a,
            rhythm_freq_b: config.rhythm_freq_b,
            rhythm_gate: config.rhythm_gate,
            jaw_amplitude: config.jaw_amplitude,
            blink_min_secs: config.blink_min_secs,
            blink_max_secs: config.blink_max_secs,
            blink_duration: config.blink_duration.max(0.01),
            saccade_min_secs: config.saccade_min_secs,
            saccade_max_secs: config.saccade_max_secs,
            saccade_smoothing: config.saccade_smoothing,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Per-frame morph-weight sampler over session time `t`.
///
/// Deterministic given its RNG; the frame loop feeds it the thread RNG,
/// tests feed it a seeded one.
#[derive(Debug)]
pub struct MotionSampler {
    cfg: MotionConfig,
    mouth_capable: bool,
    blink_start: Option<f32>,
    next_blink: Option<f32>,
    next_saccade: Option<f32>,
    eye_target: (f32, f32),
    eye: (f32, f32),
}

impl MotionSampler {
    pub fn new(cfg: MotionConfig) -> Self {
        Self {
            cfg,
            mouth_capable: true,
            blink_start: None,
            next_blink: None,
            next_saccade: None,
            eye_target: (0.0, 0.0),
            eye: (0.0, 0.0),
        }
    }

    pub fn set_mouth_capable(&mut self, capable: bool) {
        self.mouth_capable = capable;
    }

    /// Whether a blink window is currently open
    pub fn blinking(&self) -> bool {
        self.blink_start.is_some()
    }

    /// Sample all morph weights at session time `t` (seconds)
    pub fn sample<R: Rng>(&mut self, t: f32, talking: bool, rng: &mut R) -> MorphWeights {
        let jaw_open = if talking && self.mouth_capable {
            self.jaw(t)
        } else {
            0.0
        };
        let blink = self.blink(t, rng);
        self.saccade(t, rng);

        MorphWeights {
            jaw_open,
            blink,
            eye_x: self.eye.0,
            eye_y: self.eye.1,
        }
    }

    fn jaw(&self, t: f32) -> f32 {
        let rhythm = (t * self.cfg.rhythm_freq_a).sin() + (t * self.cfg.rhythm_freq_b).sin();
        if rhythm <= self.cfg.rhythm_gate {
            return 0.0;
        }
        let syllable = (t * self.cfg.syllable_freq).sin().abs();
        // Taper intensity toward the edges of the rhythm envelope
        let envelope = 0.5 + 0.5 * (rhythm + 1.0) / 3.0;
        syllable * self.cfg.jaw_amplitude * envelope
    }

    fn blink<R: Rng>(&mut self, t: f32, rng: &mut R) -> f32 {
        if let Some(start) = self.blink_start {
            let progress = (t - start) / self.cfg.blink_duration;
            if progress >= 1.0 {
                // Window over: weight lands exactly on 0 and the next blink
                // is scheduled, so windows can never overlap
                self.blink_start = None;
                self.next_blink = Some(t + self.blink_delay(rng));
                return 0.0;
            }
            return (progress * PI).sin().clamp(0.0, 1.0);
        }

        let due = match self.next_blink {
            Some(due) => due,
            None => {
                let due = t + self.blink_delay(rng);
                self.next_blink = Some(due);
                due
            }
        };
        if t >= due {
            self.blink_start = Some(t);
        }
        0.0
    }

    fn blink_delay<R: Rng>(&self, rng: &mut R) -> f32 {
        rng.gen_range(self.cfg.blink_min_secs..self.cfg.blink_max_secs)
    }

    fn saccade<R: Rng>(&mut self, t: f32, rng: &mut R) {
        let due = match self.next_saccade {
            Some(due) => due,
            None => {
                let due =
                    t + rng.gen_range(self.cfg.saccade_min_secs..self.cfg.saccade_max_secs);
                self.next_saccade = Some(due);
                due
            }
        };
        if t >= due {
            self.eye_target = (
                rng.gen_range(-SACCADE_RANGE_X..SACCADE_RANGE_X),
                rng.gen_range(-SACCADE_RANGE_Y..SACCADE_RANGE_Y),
            );
            self.next_saccade =
                Some(t + rng.gen_range(self.cfg.saccade_min_secs..self.cfg.saccade_max_secs));
        }
        // Approach the target instead of snapping to avoid visible jitter
        self.eye.0 = lerp(self.eye.0, self.eye_target.0, self.cfg.saccade_smoothing);
        self.eye.1 = lerp(self.eye.1, self.eye_target.1, self.cfg.saccade_smoothing);
    }
}

/// Frame-loop animator for rigged avatars.
///
/// The loop runs for the animator's whole life so idle motion continues
/// between utterances; only the talking flag toggles with speech.
pub struct ContinuousAnimator {
    talking: Arc<AtomicBool>,
    sampler: Arc<Mutex<MotionSampler>>,
    presenter: Arc<dyn AvatarPresenter>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ContinuousAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuousAnimator")
            .field("talking", &self.is_talking())
            .finish()
    }
}

impl ContinuousAnimator {
    pub fn spawn(presenter: Arc<dyn AvatarPresenter>, config: &Config) -> Arc<Self> {
        let animator = Arc::new(Self {
            talking: Arc::new(AtomicBool::new(false)),
            sampler: Arc::new(Mutex::new(MotionSampler::new(MotionConfig::from_config(
                config,
            )))),
            presenter: presenter.clone(),
            task: Mutex::new(None),
        });

        let talking = animator.talking.clone();
        let sampler = animator.sampler.clone();
        let frame = Duration::from_secs_f64(1.0 / config.frame_hz.max(1) as f64);

        let handle = tokio::spawn(async move {
            let epoch = Instant::now();
            let mut interval = tokio::time::interval(frame);
            loop {
                interval.tick().await;
                let t = epoch.elapsed().as_secs_f32();
                let weights = {
                    let mut rng = rand::thread_rng();
                    sampler
                        .lock()
                        .expect("motion sampler poisoned")
                        .sample(t, talking.load(Ordering::SeqCst), &mut rng)
                };
                presenter.apply_frame(&MouthFrame::Weights(weights));
            }
        });

        *animator.task.lock().expect("frame task slot poisoned") = Some(handle);
        animator
    }

    pub fn set_mouth_capable(&self, capable: bool) {
        self.sampler
            .lock()
            .expect("motion sampler poisoned")
            .set_mouth_capable(capable);
    }
}

impl Drop for ContinuousAnimator {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().expect("frame task slot poisoned").take() {
            handle.abort();
        }
    }
}

impl LipSyncAnimator for ContinuousAnimator {
    fn start_talking(&self) {
        self.talking.store(true, Ordering::SeqCst);
        self.presenter.set_talking(true);
    }

    fn stop_talking(&self) {
        // Mouth weights zero out on the very next frame; blink and saccade
        // keep running
        self.talking.store(false, Ordering::SeqCst);
        self.presenter.set_talking(false);
    }

    fn is_talking(&self) -> bool {
        self.talking.load(Ordering::SeqCst)
    }
}
