//! Discrete-pose lip-sync
//!
//! Runs a fixed-period tick only while speaking. Each tick draws a uniform
//! random value and maps it through the configured thresholds to one of the
//! avatar's poses. The tick task is owned exclusively by this animator and
//! is torn down whenever speech stops; stopping always emits the neutral
//! pose as the immediately next frame.

use super::{LipSyncAnimator, MouthFrame, MouthPose, PoseThresholds};
use crate::avatar::AvatarPresenter;
use crate::config::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct DiscreteAnimator {
    presenter: Arc<dyn AvatarPresenter>,
    thresholds: PoseThresholds,
    tick: Duration,
    talking: Arc<AtomicBool>,
    /// Whether the loaded avatar has swappable mouth poses at all
    mouth_capable: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DiscreteAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscreteAnimator")
            .field("tick", &self.tick)
            .field("talking", &self.is_talking())
            .finish()
    }
}

impl DiscreteAnimator {
    pub fn new(presenter: Arc<dyn AvatarPresenter>, config: &Config) -> Self {
        Self::with_tick(
            presenter,
            PoseThresholds::from_config(config),
            Duration::from_millis(config.tick_ms.max(1)),
        )
    }

    pub fn with_tick(
        presenter: Arc<dyn AvatarPresenter>,
        thresholds: PoseThresholds,
        tick: Duration,
    ) -> Self {
        Self {
            presenter,
            thresholds,
            tick,
            talking: Arc::new(AtomicBool::new(false)),
            mouth_capable: AtomicBool::new(true),
            task: Mutex::new(None),
        }
    }

    /// Degrade to a no-op when the loaded avatar exposes no mouth poses
    pub fn set_mouth_capable(&self, capable: bool) {
        self.mouth_capable.store(capable, Ordering::SeqCst);
    }

    /// Whether the tick task currently exists. Must be false whenever the
    /// controller is Idle.
    pub fn timer_active(&self) -> bool {
        self.task
            .lock()
            .expect("discrete animator task slot poisoned")
            .is_some()
    }

    fn clear_task(&self) {
        let handle = self
            .task
            .lock()
            .expect("discrete animator task slot poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl LipSyncAnimator for DiscreteAnimator {
    fn start_talking(&self) {
        // A new utterance replaces any stale tick before starting its own
        self.clear_task();
        self.talking.store(true, Ordering::SeqCst);
        self.presenter.set_talking(true);

        if !self.mouth_capable.load(Ordering::SeqCst) {
            debug!("Avatar has no mouth poses, lip-sync is a no-op");
            return;
        }

        let presenter = self.presenter.clone();
        let thresholds = self.thresholds;
        let talking = self.talking.clone();
        let tick = self.tick;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // The immediate first tick would emit a frame before any audio
            interval.tick().await;
            loop {
                interval.tick().await;
                if !talking.load(Ordering::SeqCst) {
                    break;
                }
                let pose = thresholds.map(rand::random::<f64>());
                presenter.apply_frame(&MouthFrame::Pose(pose));
            }
        });

        *self
            .task
            .lock()
            .expect("discrete animator task slot poisoned") = Some(handle);
    }

    fn stop_talking(&self) {
        self.talking.store(false, Ordering::SeqCst);
        self.clear_task();
        self.presenter
            .apply_frame(&MouthFrame::Pose(MouthPose::NEUTRAL));
        self.presenter.set_talking(false);
    }

    fn is_talking(&self) -> bool {
        self.talking.load(Ordering::SeqCst)
    }
}
