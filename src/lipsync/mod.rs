//! Lip-Sync Animation
//!
//! Maps the coarse speaking/not-speaking signal onto a time-varying mouth
//! state. No audio or phoneme data is available; the only ground truth is
//! whether an utterance is in flight, so both strategies shape randomness
//! into plausible motion and settle on the neutral frame when idle.

use serde::{Deserialize, Serialize};

use crate::config::Config;

pub mod continuous;
pub mod discrete;

/// Discrete mouth pose for raster/vector avatars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouthPose {
    Closed,
    Smile,
    Open,
}

impl MouthPose {
    /// The resting pose emitted whenever speech stops
    pub const NEUTRAL: MouthPose = MouthPose::Closed;
}

/// Morph-target weights for rigged avatars, all in [0, 1] except the gaze
/// offsets which are centered on 0
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MorphWeights {
    pub jaw_open: f32,
    pub blink: f32,
    pub eye_x: f32,
    pub eye_y: f32,
}

/// One animation frame handed to the presenter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouthFrame {
    Pose(MouthPose),
    Weights(MorphWeights),
}

impl MouthFrame {
    pub fn neutral() -> Self {
        MouthFrame::Pose(MouthPose::NEUTRAL)
    }

    pub fn is_neutral(&self) -> bool {
        match self {
            MouthFrame::Pose(pose) => *pose == MouthPose::NEUTRAL,
            MouthFrame::Weights(w) => w.jaw_open == 0.0,
        }
    }
}

/// Random-draw to pose mapping, tunable per avatar asset
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoseThresholds {
    /// Draws above this open the mouth
    pub open: f64,
    /// Draws above this (up to `open`) smile
    pub smile: f64,
}

impl Default for PoseThresholds {
    fn default() -> Self {
        Self {
            open: 0.7,
            smile: 0.4,
        }
    }
}

impl PoseThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            open: config.open_threshold,
            smile: config.smile_threshold,
        }
    }

    /// Map a uniform draw in [0, 1) to a pose
    pub fn map(&self, r: f64) -> MouthPose {
        if r > self.open {
            MouthPose::Open
        } else if r > self.smile {
            MouthPose::Smile
        } else {
            MouthPose::Closed
        }
    }
}

/// Strategy driving the avatar mouth from the binary speaking signal.
///
/// Implementations own whatever timers they need and must tear them down on
/// `stop_talking` so no stale driver keeps animating.
pub trait LipSyncAnimator: Send + Sync + std::fmt::Debug {
    /// An utterance started; begin emitting non-neutral frames
    fn start_talking(&self);

    /// Speech stopped (completion, error, or cancellation); settle on the
    /// neutral frame
    fn stop_talking(&self);

    fn is_talking(&self) -> bool;
}

pub(crate) fn lerp(from: f32, to: f32, factor: f32) -> f32 {
    from + (to - from) * factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_mapping() {
        let t = PoseThresholds::default();
        assert_eq!(t.map(0.95), MouthPose::Open);
        assert_eq!(t.map(0.5), MouthPose::Smile);
        assert_eq!(t.map(0.1), MouthPose::Closed);
        // Boundaries: open only strictly above 0.7
        assert_eq!(t.map(0.7), MouthPose::Smile);
        assert_eq!(t.map(0.4), MouthPose::Closed);
    }

    #[test]
    fn test_neutral_frame() {
        assert!(MouthFrame::neutral().is_neutral());
        assert!(!MouthFrame::Pose(MouthPose::Open).is_neutral());
        assert!(MouthFrame::Weights(MorphWeights::default()).is_neutral());
    }
}
