//! Bone constraint descriptors.
//!
//! Constraints reference their owner and targets by [`BoneId`], so renaming a
//! bone never breaks a constraint. Names are only produced for the host.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::bone::BoneId;
use crate::channel::parse_host;
use crate::error::ArmatureError;

/// Stable constraint identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(pub u32);

// =============================================================================
// Parameter enums
// =============================================================================

/// Space a constraint reads its target in and writes its owner in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Space {
    #[default]
    World,
    Local,
}

impl Space {
    pub fn as_str(&self) -> &'static str {
        match self {
            Space::World => "WORLD",
            Space::Local => "LOCAL",
        }
    }
}

impl std::str::FromStr for Space {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "space",
            s,
            &[("WORLD", Space::World), ("LOCAL", Space::Local)],
            "WORLD, LOCAL",
        )
    }
}

/// Axis a damped track constraint points at its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackAxis {
    TrackX,
    TrackY,
    TrackZ,
    TrackNegativeX,
    TrackNegativeY,
    TrackNegativeZ,
}

impl TrackAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackAxis::TrackX => "TRACK_X",
            TrackAxis::TrackY => "TRACK_Y",
            TrackAxis::TrackZ => "TRACK_Z",
            TrackAxis::TrackNegativeX => "TRACK_NEGATIVE_X",
            TrackAxis::TrackNegativeY => "TRACK_NEGATIVE_Y",
            TrackAxis::TrackNegativeZ => "TRACK_NEGATIVE_Z",
        }
    }
}

impl std::str::FromStr for TrackAxis {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "track axis",
            s,
            &[
                ("TRACK_X", TrackAxis::TrackX),
                ("TRACK_Y", TrackAxis::TrackY),
                ("TRACK_Z", TrackAxis::TrackZ),
                ("TRACK_NEGATIVE_X", TrackAxis::TrackNegativeX),
                ("TRACK_NEGATIVE_Y", TrackAxis::TrackNegativeY),
                ("TRACK_NEGATIVE_Z", TrackAxis::TrackNegativeZ),
            ],
            "TRACK_X, TRACK_Y, TRACK_Z, TRACK_NEGATIVE_X, TRACK_NEGATIVE_Y, TRACK_NEGATIVE_Z",
        )
    }
}

/// How a spline IK chain scales along the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum YScaleMode {
    /// Bones keep their rest length.
    #[default]
    None,
    /// Bones stretch to the curve length.
    FitCurve,
}

impl YScaleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            YScaleMode::None => "NONE",
            YScaleMode::FitCurve => "FIT_CURVE",
        }
    }
}

/// Cross-section scaling of a spline IK chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum XzScaleMode {
    None,
    #[default]
    BoneOriginal,
}

impl XzScaleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            XzScaleMode::None => "NONE",
            XzScaleMode::BoneOriginal => "BONE_ORIGINAL",
        }
    }
}

// =============================================================================
// Constraint kinds
// =============================================================================

/// IK pole target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoleTarget {
    pub bone: BoneId,
    /// Pole angle in radians.
    pub angle: f64,
}

/// Per-axis rotation limit in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisLimit {
    pub enabled: bool,
    pub min: f64,
    pub max: f64,
}

impl AxisLimit {
    /// An enabled limit.
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    /// Applies the limit to a value. Values past a bound are clamped.
    pub fn apply(&self, value: f64) -> f64 {
        if self.enabled {
            value.max(self.min).min(self.max)
        } else {
            value
        }
    }
}

/// `Child Of` inverse correction state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildOfInverse {
    /// Must be baked before the constraint is evaluated.
    Pending,
    /// Captured owner-head minus target-head at bake time.
    Baked { offset: DVec3 },
}

/// Kind-specific constraint parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    CopyRotation {
        target: BoneId,
        axes: [bool; 3],
        target_space: Space,
        owner_space: Space,
    },
    CopyTransforms {
        target: BoneId,
        target_space: Space,
    },
    Ik {
        target: BoneId,
        pole: Option<PoleTarget>,
        chain_count: u32,
    },
    ChildOf {
        target: BoneId,
        /// Location, rotation, scale × X, Y, Z.
        channels: [bool; 9],
        inverse: ChildOfInverse,
    },
    DampedTrack {
        target: BoneId,
        track_axis: TrackAxis,
        head_tail: f64,
    },
    LimitRotation {
        limits: [AxisLimit; 3],
        owner_space: Space,
    },
    SplineIk {
        curve: String,
        chain_count: u32,
        use_curve_radius: bool,
        xz_scale_mode: XzScaleMode,
        y_scale_mode: YScaleMode,
    },
}

impl ConstraintKind {
    /// Returns the host's default name for constraints of this kind.
    pub fn host_name(&self) -> &'static str {
        match self {
            ConstraintKind::CopyRotation { .. } => "Copy Rotation",
            ConstraintKind::CopyTransforms { .. } => "Copy Transforms",
            ConstraintKind::Ik { .. } => "IK",
            ConstraintKind::ChildOf { .. } => "Child Of",
            ConstraintKind::DampedTrack { .. } => "Damped Track",
            ConstraintKind::LimitRotation { .. } => "Limit Rotation",
            ConstraintKind::SplineIk { .. } => "Spline IK",
        }
    }

    /// Returns the host type identifier.
    pub fn type_id(&self) -> &'static str {
        match self {
            ConstraintKind::CopyRotation { .. } => "COPY_ROTATION",
            ConstraintKind::CopyTransforms { .. } => "COPY_TRANSFORMS",
            ConstraintKind::Ik { .. } => "IK",
            ConstraintKind::ChildOf { .. } => "CHILD_OF",
            ConstraintKind::DampedTrack { .. } => "DAMPED_TRACK",
            ConstraintKind::LimitRotation { .. } => "LIMIT_ROTATION",
            ConstraintKind::SplineIk { .. } => "SPLINE_IK",
        }
    }

    /// Returns every bone this constraint references (target and pole).
    pub fn referenced_bones(&self) -> Vec<BoneId> {
        match self {
            ConstraintKind::CopyRotation { target, .. }
            | ConstraintKind::CopyTransforms { target, .. }
            | ConstraintKind::ChildOf { target, .. }
            | ConstraintKind::DampedTrack { target, .. } => vec![*target],
            ConstraintKind::Ik { target, pole, .. } => {
                let mut bones = vec![*target];
                bones.extend(pole.map(|p| p.bone));
                bones
            }
            ConstraintKind::LimitRotation { .. } | ConstraintKind::SplineIk { .. } => Vec::new(),
        }
    }

    /// Returns the bone whose evaluated channels this constraint copies.
    pub fn channel_source(&self) -> Option<BoneId> {
        match self {
            ConstraintKind::CopyRotation { target, .. }
            | ConstraintKind::CopyTransforms { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Rewrites bone references through `map`.
    pub fn remap_bones(&mut self, map: impl Fn(BoneId) -> BoneId) {
        match self {
            ConstraintKind::CopyRotation { target, .. }
            | ConstraintKind::CopyTransforms { target, .. }
            | ConstraintKind::ChildOf { target, .. }
            | ConstraintKind::DampedTrack { target, .. } => *target = map(*target),
            ConstraintKind::Ik { target, pole, .. } => {
                *target = map(*target);
                if let Some(pole) = pole {
                    pole.bone = map(pole.bone);
                }
            }
            ConstraintKind::LimitRotation { .. } | ConstraintKind::SplineIk { .. } => {}
        }
    }
}

/// A constraint attached to one bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: ConstraintId,
    /// Host name, unique per owner (`Copy Transforms`, `Copy Transforms.001`).
    pub name: String,
    pub owner: BoneId,
    #[serde(default = "default_influence")]
    pub influence: f64,
    pub kind: ConstraintKind,
}

fn default_influence() -> f64 {
    1.0
}

/// Picks a host-style unique name: `base`, then `base.001`, `base.002`, ...
pub fn unique_name<'a>(base: &str, taken: impl Iterator<Item = &'a str> + Clone) -> String {
    if !taken.clone().any(|n| n == base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}.{:03}", base, n))
        .find(|candidate| !taken.clone().any(|n| n == candidate))
        .unwrap_or_else(|| base.to_string())
}
