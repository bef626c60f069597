//! Bone records and their per-bone settings.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::channel::{parse_host, TransformChannel, TransformLocks};
use crate::error::{ArmatureError, ArmatureResult};
use crate::names::{BoneName, BoneRole};

/// Number of bone layers available on an armature.
pub const LAYER_COUNT: u8 = 32;

/// Stable bone identifier. Survives renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneId(pub u32);

impl std::fmt::Display for BoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// One of the 32 bone layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BoneLayer(u8);

impl BoneLayer {
    /// Creates a layer, failing for indices outside `0..32`.
    pub fn new(index: u8) -> ArmatureResult<Self> {
        if index < LAYER_COUNT {
            Ok(Self(index))
        } else {
            Err(ArmatureError::InvalidLayer(index))
        }
    }

    /// Returns the layer index.
    pub fn index(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BoneLayer {
    type Error = ArmatureError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoneLayer> for u8 {
    fn from(layer: BoneLayer) -> Self {
        layer.0
    }
}

/// How a bone inherits scale from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InheritScale {
    #[default]
    Full,
    FixShear,
    Average,
    None,
    NoneLegacy,
    Aligned,
}

const INHERIT_SCALE: &[(&str, InheritScale)] = &[
    ("FULL", InheritScale::Full),
    ("FIX_SHEAR", InheritScale::FixShear),
    ("AVERAGE", InheritScale::Average),
    ("NONE", InheritScale::None),
    ("NONE_LEGACY", InheritScale::NoneLegacy),
    ("ALIGNED", InheritScale::Aligned),
];

impl InheritScale {
    /// Returns the host identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritScale::Full => "FULL",
            InheritScale::FixShear => "FIX_SHEAR",
            InheritScale::Average => "AVERAGE",
            InheritScale::None => "NONE",
            InheritScale::NoneLegacy => "NONE_LEGACY",
            InheritScale::Aligned => "ALIGNED",
        }
    }
}

impl std::str::FromStr for InheritScale {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "inherit scale",
            s,
            INHERIT_SCALE,
            "FULL, FIX_SHEAR, AVERAGE, NONE, NONE_LEGACY, ALIGNED",
        )
    }
}

/// Rotation representation of a pose bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationMode {
    #[default]
    Quaternion,
    Xyz,
}

impl RotationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationMode::Quaternion => "QUATERNION",
            RotationMode::Xyz => "XYZ",
        }
    }
}

/// End of a bone used as a placement reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoneEnd {
    Head,
    Tail,
}

impl std::str::FromStr for BoneEnd {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "bone end",
            s,
            &[("HEAD", BoneEnd::Head), ("TAIL", BoneEnd::Tail)],
            "HEAD, TAIL",
        )
    }
}

/// A signed world axis used to orient new bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    #[serde(rename = "+X")]
    PosX,
    #[serde(rename = "+Y")]
    PosY,
    #[serde(rename = "+Z")]
    PosZ,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "-Z")]
    NegZ,
}

impl AxisDirection {
    /// Returns the unit vector for this direction.
    pub fn unit(&self) -> DVec3 {
        match self {
            AxisDirection::PosX => DVec3::X,
            AxisDirection::PosY => DVec3::Y,
            AxisDirection::PosZ => DVec3::Z,
            AxisDirection::NegX => DVec3::NEG_X,
            AxisDirection::NegY => DVec3::NEG_Y,
            AxisDirection::NegZ => DVec3::NEG_Z,
        }
    }
}

impl std::str::FromStr for AxisDirection {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "axis",
            s,
            &[
                ("+X", AxisDirection::PosX),
                ("+Y", AxisDirection::PosY),
                ("+Z", AxisDirection::PosZ),
                ("-X", AxisDirection::NegX),
                ("-Y", AxisDirection::NegY),
                ("-Z", AxisDirection::NegZ),
            ],
            "+X, +Y, +Z, -X, -Y, -Z",
        )
    }
}

// =============================================================================
// Pose
// =============================================================================

/// Local pose channels of a bone (Euler rotation in radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            location: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Pose {
    /// Returns the value of one channel.
    pub fn get(&self, channel: TransformChannel) -> f64 {
        self.as_array()[channel.flag_index()]
    }

    /// Sets the value of one channel.
    pub fn set(&mut self, channel: TransformChannel, value: f64) {
        let axis = channel.axis.index();
        match channel.kind {
            crate::channel::ChannelKind::Location => self.location[axis] = value,
            crate::channel::ChannelKind::Rotation => self.rotation[axis] = value,
            crate::channel::ChannelKind::Scale => self.scale[axis] = value,
        }
    }

    /// Returns all nine channels in lock-flag order.
    pub fn as_array(&self) -> [f64; 9] {
        let mut out = [0.0; 9];
        out[0..3].copy_from_slice(&self.location);
        out[3..6].copy_from_slice(&self.rotation);
        out[6..9].copy_from_slice(&self.scale);
        out
    }
}

// =============================================================================
// Bone
// =============================================================================

/// A bone of an armature.
///
/// Rest geometry (`head`, `tail`, `roll`) and hierarchy belong to edit mode;
/// locks, rotation mode and pose belong to pose mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bone {
    pub id: BoneId,
    pub name: String,
    pub role: BoneRole,
    pub head: DVec3,
    pub tail: DVec3,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub parent: Option<BoneId>,
    #[serde(default)]
    pub connected: bool,
    #[serde(default = "default_true")]
    pub inherit_rotation: bool,
    #[serde(default)]
    pub inherit_scale: InheritScale,
    #[serde(default)]
    pub layer: BoneLayer,
    #[serde(default = "default_true")]
    pub deletable: bool,
    #[serde(default)]
    pub rotation_mode: RotationMode,
    #[serde(default)]
    pub locks: TransformLocks,
    #[serde(default)]
    pub ik_locks: [bool; 3],
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub hide: bool,
}

fn default_true() -> bool {
    true
}

impl Bone {
    /// Creates a free, unparented bone spanning `head` to `tail`.
    pub fn new(id: BoneId, name: impl Into<String>, head: DVec3, tail: DVec3) -> Self {
        let name = name.into();
        let role = BoneName::parse(&name).role();
        Self {
            id,
            name,
            role,
            head,
            tail,
            roll: 0.0,
            parent: None,
            connected: false,
            inherit_rotation: true,
            inherit_scale: InheritScale::Full,
            layer: BoneLayer::default(),
            deletable: true,
            rotation_mode: RotationMode::Quaternion,
            locks: TransformLocks::NONE,
            ik_locks: [false; 3],
            pose: Pose::default(),
            hide: false,
        }
    }

    /// Returns the structured name of this bone.
    pub fn bone_name(&self) -> BoneName {
        BoneName::parse(&self.name)
    }

    /// Returns the rest length.
    pub fn length(&self) -> f64 {
        self.head.distance(self.tail)
    }

    /// Returns the unit direction from head to tail, or +Y for a zero-length bone.
    pub fn direction(&self) -> DVec3 {
        (self.tail - self.head).try_normalize().unwrap_or(DVec3::Y)
    }

    /// Returns the position of one end.
    pub fn end(&self, end: BoneEnd) -> DVec3 {
        match end {
            BoneEnd::Head => self.head,
            BoneEnd::Tail => self.tail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Axis;

    #[test]
    fn test_layer_range() {
        assert_eq!(BoneLayer::new(31).unwrap().index(), 31);
        assert_eq!(BoneLayer::new(32), Err(ArmatureError::InvalidLayer(32)));
        assert!(serde_json::from_str::<BoneLayer>("40").is_err());
    }

    #[test]
    fn test_host_enum_parsing() {
        assert_eq!("FIX_SHEAR".parse::<InheritScale>().unwrap(), InheritScale::FixShear);
        assert_eq!("-Y".parse::<AxisDirection>().unwrap().unit(), DVec3::NEG_Y);
        assert_eq!("TAIL".parse::<BoneEnd>().unwrap(), BoneEnd::Tail);

        let err = "MIDDLE".parse::<BoneEnd>().unwrap_err();
        assert!(matches!(err, ArmatureError::InvalidEnum { what: "bone end", .. }));
        assert!("Y".parse::<AxisDirection>().is_err());
    }

    #[test]
    fn test_new_bone_role_and_geometry() {
        let bone = Bone::new(BoneId(3), "hand_left_RST", DVec3::ZERO, DVec3::new(0.0, 0.0, 2.0));
        assert_eq!(bone.role, BoneRole::Result);
        assert_eq!(bone.length(), 2.0);
        assert_eq!(bone.direction(), DVec3::Z);
        assert_eq!(bone.end(BoneEnd::Tail).z, 2.0);
        assert!(bone.deletable);
    }

    #[test]
    fn test_pose_channels() {
        let mut pose = Pose::default();
        pose.set(TransformChannel::rotation(Axis::Y), 0.5);
        assert_eq!(pose.get(TransformChannel::rotation(Axis::Y)), 0.5);
        assert_eq!(pose.get(TransformChannel::scale(Axis::X)), 1.0);
        assert_eq!(pose.as_array()[4], 0.5);
    }
}
