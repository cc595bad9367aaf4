//! Avatar Presentation
//!
//! Rendering adapter between the lip-sync animators and a concrete visual
//! substrate. The core only ever talks to the `AvatarPresenter` trait; the
//! shipped implementations render to the log (terminal demo), to nothing
//! (placeholder fallback), or into a buffer (tests).

use crate::error::{AvaError, AvaResult};
use crate::lipsync::{MouthFrame, MouthPose};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Reference to an avatar asset, one variant per substrate
#[derive(Debug, Clone)]
pub enum AssetRef {
    /// Single static raster image
    Image(String),
    /// Swappable documents keyed by mouth pose
    PoseSet(HashMap<MouthPose, String>),
    /// Rigged model document with named morph targets
    Rig(String),
}

/// What the loaded asset can animate
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetCapabilities {
    pub mouth_poses: bool,
    pub morph_targets: bool,
}

/// Rendering adapter. `MouthFrame` values are read-only here; all animation
/// state lives in the animators.
pub trait AvatarPresenter: Send + Sync + std::fmt::Debug {
    /// Render the animator's current frame
    fn apply_frame(&self, frame: &MouthFrame);

    /// Toggle secondary talking effects (bob, sway, glow)
    fn set_talking(&self, talking: bool);

    /// Load an avatar asset, reporting what it can animate
    fn load_asset(&self, asset: &AssetRef) -> AvaResult<AssetCapabilities>;
}

/// Presenter that renders frames into the log, for the terminal demo
#[derive(Debug, Default)]
pub struct TracePresenter;

impl TracePresenter {
    pub fn new() -> Self {
        Self
    }
}

impl AvatarPresenter for TracePresenter {
    fn apply_frame(&self, frame: &MouthFrame) {
        match frame {
            MouthFrame::Pose(pose) => debug!("🗿 pose: {:?}", pose),
            MouthFrame::Weights(w) => debug!(
                "🗿 jaw {:.2} blink {:.2} gaze ({:+.2}, {:+.2})",
                w.jaw_open, w.blink, w.eye_x, w.eye_y
            ),
        }
    }

    fn set_talking(&self, talking: bool) {
        if talking {
            info!("💬 Avatar talking");
        } else {
            info!("🤐 Avatar idle");
        }
    }

    fn load_asset(&self, asset: &AssetRef) -> AvaResult<AssetCapabilities> {
        match asset {
            AssetRef::Image(path) => {
                info!("🖼️ Static avatar image: {}", path);
                Ok(AssetCapabilities::default())
            }
            AssetRef::PoseSet(poses) => {
                if poses.is_empty() {
                    return Err(AvaError::Asset("pose set is empty".to_string()));
                }
                info!("🖼️ Avatar pose set with {} poses", poses.len());
                Ok(AssetCapabilities {
                    mouth_poses: true,
                    morph_targets: false,
                })
            }
            AssetRef::Rig(reference) => {
                if reference.is_empty() {
                    return Err(AvaError::Asset("rig reference is empty".to_string()));
                }
                info!("🖼️ Avatar rig: {}", reference);
                Ok(AssetCapabilities {
                    mouth_poses: false,
                    morph_targets: true,
                })
            }
        }
    }
}

/// Presenter that discards everything; the fallback when no asset loads
#[derive(Debug, Default)]
pub struct NullPresenter;

impl AvatarPresenter for NullPresenter {
    fn apply_frame(&self, _frame: &MouthFrame) {}

    fn set_talking(&self, _talking: bool) {}

    fn load_asset(&self, _asset: &AssetRef) -> AvaResult<AssetCapabilities> {
        Ok(AssetCapabilities::default())
    }
}

/// Presenter that records every frame and talking transition
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    frames: Mutex<Vec<MouthFrame>>,
    talking: Mutex<Vec<bool>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<MouthFrame> {
        self.frames.lock().expect("frame log poisoned").clone()
    }

    pub fn talking_transitions(&self) -> Vec<bool> {
        self.talking.lock().expect("talking log poisoned").clone()
    }
}

impl AvatarPresenter for RecordingPresenter {
    fn apply_frame(&self, frame: &MouthFrame) {
        self.frames.lock().expect("frame log poisoned").push(*frame);
    }

    fn set_talking(&self, talking: bool) {
        self.talking
            .lock()
            .expect("talking log poisoned")
            .push(talking);
    }

    fn load_asset(&self, _asset: &AssetRef) -> AvaResult<AssetCapabilities> {
        Ok(AssetCapabilities {
            mouth_poses: true,
            morph_targets: true,
        })
    }
}

/// Default pose-keyed asset set for the demo avatar
pub fn default_pose_set() -> AssetRef {
    let mut poses = HashMap::new();
    poses.insert(MouthPose::Closed, "avatar-closed.svg".to_string());
    poses.insert(MouthPose::Smile, "avatar-smile.svg".to_string());
    poses.insert(MouthPose::Open, "avatar-open.svg".to_string());
    AssetRef::PoseSet(poses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pose_set_is_asset_error() {
        let presenter = TracePresenter::new();
        let err = presenter
            .load_asset(&AssetRef::PoseSet(HashMap::new()))
            .unwrap_err();
        assert!(matches!(err, AvaError::Asset(_)));
    }

    #[test]
    fn test_capabilities_per_variant() {
        let presenter = TracePresenter::new();

        let caps = presenter.load_asset(&default_pose_set()).unwrap();
        assert!(caps.mouth_poses && !caps.morph_targets);

        let caps = presenter
            .load_asset(&AssetRef::Rig("model.glb".to_string()))
            .unwrap();
        assert!(!caps.mouth_poses && caps.morph_targets);

        let caps = presenter
            .load_asset(&AssetRef::Image("avatar.png".to_string()))
            .unwrap();
        assert!(!caps.mouth_poses && !caps.morph_targets);
    }

    #[test]
    fn test_recording_presenter_records() {
        let presenter = RecordingPresenter::new();
        presenter.apply_frame(&MouthFrame::Pose(MouthPose::Open));
        presenter.set_talking(true);
        presenter.set_talking(false);

        assert_eq!(presenter.frames(), vec![MouthFrame::Pose(MouthPose::Open)]);
        assert_eq!(presenter.talking_transitions(), vec![true, false]);
    }
}
