//! Transform channels, channel locks and transform reads.

use serde::{Deserialize, Serialize};

use crate::error::{ArmatureError, ArmatureResult};

/// Looks up a host identifier in a table of `(identifier, value)` pairs.
pub(crate) fn parse_host<T: Copy>(
    what: &'static str,
    value: &str,
    table: &[(&'static str, T)],
    expected: &'static str,
) -> ArmatureResult<T> {
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, v)| *v)
        .ok_or_else(|| ArmatureError::InvalidEnum {
            what,
            value: value.to_string(),
            expected,
        })
}

// =============================================================================
// Axes and channels
// =============================================================================

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the array index of this axis.
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Returns the axis name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// The transform property a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Location,
    Rotation,
    Scale,
}

impl ChannelKind {
    /// Returns a short lowercase prefix (`loc`, `rot`, `scale`).
    pub fn prefix(&self) -> &'static str {
        match self {
            ChannelKind::Location => "loc",
            ChannelKind::Rotation => "rot",
            ChannelKind::Scale => "scale",
        }
    }
}

/// One of the nine lockable transform channels of a pose bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransformChannel {
    pub kind: ChannelKind,
    pub axis: Axis,
}

impl TransformChannel {
    /// All nine channels in lock-flag order: location, rotation, scale × X, Y, Z.
    pub const ALL: [TransformChannel; 9] = [
        TransformChannel::new(ChannelKind::Location, Axis::X),
        TransformChannel::new(ChannelKind::Location, Axis::Y),
        TransformChannel::new(ChannelKind::Location, Axis::Z),
        TransformChannel::new(ChannelKind::Rotation, Axis::X),
        TransformChannel::new(ChannelKind::Rotation, Axis::Y),
        TransformChannel::new(ChannelKind::Rotation, Axis::Z),
        TransformChannel::new(ChannelKind::Scale, Axis::X),
        TransformChannel::new(ChannelKind::Scale, Axis::Y),
        TransformChannel::new(ChannelKind::Scale, Axis::Z),
    ];

    pub const fn new(kind: ChannelKind, axis: Axis) -> Self {
        Self { kind, axis }
    }

    pub const fn location(axis: Axis) -> Self {
        Self::new(ChannelKind::Location, axis)
    }

    pub const fn rotation(axis: Axis) -> Self {
        Self::new(ChannelKind::Rotation, axis)
    }

    pub const fn scale(axis: Axis) -> Self {
        Self::new(ChannelKind::Scale, axis)
    }

    /// Returns the position of this channel in a nine-flag array.
    pub fn flag_index(&self) -> usize {
        let base = match self.kind {
            ChannelKind::Location => 0,
            ChannelKind::Rotation => 3,
            ChannelKind::Scale => 6,
        };
        base + self.axis.index()
    }

    /// Parses a channel written as `loc_x`, `rot_y`, `scale_z`.
    pub fn parse(value: &str) -> ArmatureResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.to_string() == value)
            .ok_or_else(|| ArmatureError::InvalidEnum {
                what: "transform channel",
                value: value.to_string(),
                expected: "loc_x, loc_y, loc_z, rot_x, rot_y, rot_z, scale_x, scale_y, scale_z",
            })
    }
}

impl std::fmt::Display for TransformChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}",
            self.kind.prefix(),
            self.axis.as_str().to_ascii_lowercase()
        )
    }
}

// =============================================================================
// Locks
// =============================================================================

/// Lock flags for the nine transform channels.
///
/// Order: location X, Y, Z, rotation X, Y, Z, scale X, Y, Z. A locked channel
/// refuses external keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransformLocks(pub [bool; 9]);

impl TransformLocks {
    /// Every channel locked.
    pub const ALL: Self = Self([true; 9]);
    /// Every channel free.
    pub const NONE: Self = Self([false; 9]);
    /// Only rotation is free.
    pub const ROTATION_FREE: Self =
        Self([true, true, true, false, false, false, true, true, true]);
    /// Location and rotation are free, scale is locked.
    pub const LOCATION_ROTATION_FREE: Self =
        Self([false, false, false, false, false, false, true, true, true]);
    /// Only location is free.
    pub const LOCATION_FREE: Self =
        Self([false, false, false, true, true, true, true, true, true]);
    /// Only scale is free.
    pub const SCALE_FREE: Self =
        Self([true, true, true, true, true, true, false, false, false]);

    /// Builds locks from a flag slice, which must hold exactly nine flags.
    pub fn from_slice(flags: &[bool]) -> ArmatureResult<Self> {
        let flags: [bool; 9] = flags.try_into().map_err(|_| ArmatureError::InvalidArity {
            what: "transform locks",
            expected: 9,
            got: flags.len(),
        })?;
        Ok(Self(flags))
    }

    /// Returns true if the channel is locked.
    pub fn is_locked(&self, channel: TransformChannel) -> bool {
        self.0[channel.flag_index()]
    }

    /// Returns the location flags.
    pub fn location(&self) -> [bool; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Returns the rotation flags.
    pub fn rotation(&self) -> [bool; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Returns the scale flags.
    pub fn scale(&self) -> [bool; 3] {
        [self.0[6], self.0[7], self.0[8]]
    }
}

/// Converts a three-element flag slice into an axis array.
pub fn axis_flags(what: &'static str, flags: &[bool]) -> ArmatureResult<[bool; 3]> {
    flags.try_into().map_err(|_| ArmatureError::InvalidArity {
        what,
        expected: 3,
        got: flags.len(),
    })
}

// =============================================================================
// Transform reads
// =============================================================================

/// The transform component a driver variable reads from a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformRead {
    LocX,
    LocY,
    LocZ,
    RotX,
    RotY,
    RotZ,
    ScaleX,
    ScaleY,
    ScaleZ,
    /// Mean of the three scale channels.
    ScaleAvg,
}

const TRANSFORM_READS: &[(&str, TransformRead)] = &[
    ("LOC_X", TransformRead::LocX),
    ("LOC_Y", TransformRead::LocY),
    ("LOC_Z", TransformRead::LocZ),
    ("ROT_X", TransformRead::RotX),
    ("ROT_Y", TransformRead::RotY),
    ("ROT_Z", TransformRead::RotZ),
    ("SCALE_X", TransformRead::ScaleX),
    ("SCALE_Y", TransformRead::ScaleY),
    ("SCALE_Z", TransformRead::ScaleZ),
    ("SCALE_AVG", TransformRead::ScaleAvg),
];

impl TransformRead {
    /// Returns the channels this read depends on.
    pub fn channels(&self) -> Vec<TransformChannel> {
        match self {
            TransformRead::LocX => vec![TransformChannel::location(Axis::X)],
            TransformRead::LocY => vec![TransformChannel::location(Axis::Y)],
            TransformRead::LocZ => vec![TransformChannel::location(Axis::Z)],
            TransformRead::RotX => vec![TransformChannel::rotation(Axis::X)],
            TransformRead::RotY => vec![TransformChannel::rotation(Axis::Y)],
            TransformRead::RotZ => vec![TransformChannel::rotation(Axis::Z)],
            TransformRead::ScaleX => vec![TransformChannel::scale(Axis::X)],
            TransformRead::ScaleY => vec![TransformChannel::scale(Axis::Y)],
            TransformRead::ScaleZ => vec![TransformChannel::scale(Axis::Z)],
            TransformRead::ScaleAvg => {
                Axis::ALL.iter().map(|a| TransformChannel::scale(*a)).collect()
            }
        }
    }

    /// Returns the host identifier (`ROT_Y`, `SCALE_AVG`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformRead::LocX => "LOC_X",
            TransformRead::LocY => "LOC_Y",
            TransformRead::LocZ => "LOC_Z",
            TransformRead::RotX => "ROT_X",
            TransformRead::RotY => "ROT_Y",
            TransformRead::RotZ => "ROT_Z",
            TransformRead::ScaleX => "SCALE_X",
            TransformRead::ScaleY => "SCALE_Y",
            TransformRead::ScaleZ => "SCALE_Z",
            TransformRead::ScaleAvg => "SCALE_AVG",
        }
    }
}

impl std::str::FromStr for TransformRead {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "transform type",
            s,
            TRANSFORM_READS,
            "LOC_X, LOC_Y, LOC_Z, ROT_X, ROT_Y, ROT_Z, SCALE_X, SCALE_Y, SCALE_Z, SCALE_AVG",
        )
    }
}

/// Coordinate space a driver variable reads a transform in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSpace {
    World,
    /// Transform space: the channel values without constraints.
    Transform,
    /// Local space: the channel values with constraints.
    #[default]
    Local,
}

impl TransformSpace {
    /// Returns the host identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformSpace::World => "WORLD_SPACE",
            TransformSpace::Transform => "TRANSFORM_SPACE",
            TransformSpace::Local => "LOCAL_SPACE",
        }
    }
}

impl std::str::FromStr for TransformSpace {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "transform space",
            s,
            &[
                ("WORLD_SPACE", TransformSpace::World),
                ("TRANSFORM_SPACE", TransformSpace::Transform),
                ("LOCAL_SPACE", TransformSpace::Local),
            ],
            "WORLD_SPACE, TRANSFORM_SPACE, LOCAL_SPACE",
        )
    }
}
