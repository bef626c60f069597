//! Rig build configuration.
//!
//! Angles are given in degrees and converted to radians where they are used.

use autorig_armature::{AxisLimit, BoneLayer};
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};
use crate::pipeline::Side;

/// A per-side pair of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerSide<T> {
    pub left: T,
    pub right: T,
}

impl<T: Copy> PerSide<T> {
    pub fn get(&self, side: Side) -> T {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Configuration for the rig assembly pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RigConfig {
    /// Name of the spine guide curve.
    #[serde(default = "default_spine_curve")]
    pub spine_curve: String,
    /// Name of the root handle every limb hangs from.
    #[serde(default = "default_center_bone")]
    pub center_bone: String,

    /// Number of cuts of the spine result chain (segments = cuts + 1).
    #[serde(default = "default_spine_cuts")]
    pub spine_cuts: u32,
    /// Stretch the spine chain to the curve length.
    #[serde(default)]
    pub spine_fit_curve: bool,
    /// Number of cuts of each forearm torsion chain.
    #[serde(default = "default_forearm_cuts")]
    pub forearm_cuts: u32,

    #[serde(default = "default_handle_layer")]
    pub handle_layer: u8,
    #[serde(default = "default_aux_layer")]
    pub aux_layer: u8,
    #[serde(default = "default_result_layer")]
    pub result_layer: u8,

    /// Length of the shoulder handles.
    #[serde(default = "default_shoulder_handle_length")]
    pub shoulder_handle_length: f64,
    /// Multiplier applied to the finger curl drivers.
    #[serde(default = "default_bend_multiplier")]
    pub finger_bend_multiplier: f64,

    /// IK pole angle of each arm, in degrees.
    #[serde(default = "default_arm_pole_angles")]
    pub arm_pole_angles: PerSide<f64>,
    /// IK pole angle of each leg, in degrees.
    #[serde(default = "default_leg_pole_angles")]
    pub leg_pole_angles: PerSide<f64>,
    /// IK axis locks of the arm mid bones.
    #[serde(default = "default_arm_ik_locks")]
    pub arm_ik_locks: [bool; 3],
    /// IK axis locks of the leg mid bones.
    #[serde(default = "default_leg_ik_locks")]
    pub leg_ik_locks: [bool; 3],

    /// Forward roll range of the foot pivot, in degrees.
    #[serde(default = "default_pivot_roll_limits")]
    pub pivot_roll_limits: [f64; 2],
    /// Backward roll range of the heel, in degrees.
    #[serde(default = "default_heel_roll_limits")]
    pub heel_roll_limits: [f64; 2],
}

fn default_spine_curve() -> String {
    "spine_SPL".to_string()
}

fn default_center_bone() -> String {
    "center_HDL".to_string()
}

fn default_spine_cuts() -> u32 {
    6
}

fn default_forearm_cuts() -> u32 {
    3
}

fn default_handle_layer() -> u8 {
    16
}

fn default_aux_layer() -> u8 {
    7
}

fn default_result_layer() -> u8 {
    23
}

fn default_shoulder_handle_length() -> f64 {
    0.3
}

fn default_bend_multiplier() -> f64 {
    1.0
}

fn default_arm_pole_angles() -> PerSide<f64> {
    PerSide {
        left: 0.0,
        right: 180.0,
    }
}

fn default_leg_pole_angles() -> PerSide<f64> {
    PerSide {
        left: 90.0,
        right: 90.0,
    }
}

fn default_arm_ik_locks() -> [bool; 3] {
    [false, false, true]
}

fn default_leg_ik_locks() -> [bool; 3] {
    [false, true, true]
}

fn default_pivot_roll_limits() -> [f64; 2] {
    [0.0, 170.0]
}

fn default_heel_roll_limits() -> [f64; 2] {
    [-170.0, 0.0]
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            spine_curve: default_spine_curve(),
            center_bone: default_center_bone(),
            spine_cuts: default_spine_cuts(),
            spine_fit_curve: false,
            forearm_cuts: default_forearm_cuts(),
            handle_layer: default_handle_layer(),
            aux_layer: default_aux_layer(),
            result_layer: default_result_layer(),
            shoulder_handle_length: default_shoulder_handle_length(),
            finger_bend_multiplier: default_bend_multiplier(),
            arm_pole_angles: default_arm_pole_angles(),
            leg_pole_angles: default_leg_pole_angles(),
            arm_ik_locks: default_arm_ik_locks(),
            leg_ik_locks: default_leg_ik_locks(),
            pivot_roll_limits: default_pivot_roll_limits(),
            heel_roll_limits: default_heel_roll_limits(),
        }
    }
}

impl RigConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> RigResult<()> {
        for (name, layer) in [
            ("handle_layer", self.handle_layer),
            ("aux_layer", self.aux_layer),
            ("result_layer", self.result_layer),
        ] {
            if BoneLayer::new(layer).is_err() {
                return Err(RigError::Config(format!("{} {} is not in range 0..32", name, layer)));
            }
        }
        if self.spine_cuts == 0 {
            return Err(RigError::Config("spine_cuts must be at least 1".to_string()));
        }
        if self.forearm_cuts == 0 {
            return Err(RigError::Config("forearm_cuts must be at least 1".to_string()));
        }
        if !(self.shoulder_handle_length.is_finite() && self.shoulder_handle_length > 0.0) {
            return Err(RigError::Config(
                "shoulder_handle_length must be positive".to_string(),
            ));
        }
        if !self.finger_bend_multiplier.is_finite() {
            return Err(RigError::Config("finger_bend_multiplier must be finite".to_string()));
        }
        for (name, [min, max]) in [
            ("pivot_roll_limits", self.pivot_roll_limits),
            ("heel_roll_limits", self.heel_roll_limits),
        ] {
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(RigError::Config(format!("{} must satisfy min <= max", name)));
            }
        }
        if self.spine_curve.is_empty() || self.center_bone.is_empty() {
            return Err(RigError::Config("template names must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn handle_layer(&self) -> RigResult<BoneLayer> {
        Ok(BoneLayer::new(self.handle_layer)?)
    }

    pub fn aux_layer(&self) -> RigResult<BoneLayer> {
        Ok(BoneLayer::new(self.aux_layer)?)
    }

    pub fn result_layer(&self) -> RigResult<BoneLayer> {
        Ok(BoneLayer::new(self.result_layer)?)
    }

    /// X-axis rotation limit of the foot pivot, in radians.
    pub fn pivot_limit(&self) -> AxisLimit {
        let [min, max] = self.pivot_roll_limits;
        AxisLimit::new(min.to_radians(), max.to_radians())
    }

    /// X-axis rotation limit of the heel, in radians.
    pub fn heel_limit(&self) -> AxisLimit {
        let [min, max] = self.heel_roll_limits;
        AxisLimit::new(min.to_radians(), max.to_radians())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_empty_json() {
        let config = RigConfig::from_json("{}").unwrap();
        assert_eq!(config, RigConfig::default());
        assert_eq!(config.spine_cuts, 6);
        assert_eq!(config.arm_pole_angles.get(Side::Right), 180.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(RigConfig::from_json(r#"{"spine_segments": 4}"#).is_err());
    }

    #[test]
    fn test_validate() {
        let config = RigConfig {
            aux_layer: 32,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().code(), "RIG_004");

        let config = RigConfig {
            heel_roll_limits: [10.0, -10.0],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RigConfig {
            forearm_cuts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limits_in_radians() {
        let config = RigConfig::default();
        let pivot = config.pivot_limit();
        assert_eq!(pivot.min, 0.0);
        assert!((pivot.max - 170f64.to_radians()).abs() < 1e-12);
        assert!(config.heel_limit().min < 0.0);
    }
}
