//! Autorig armature model
//!
//! This crate holds the data model a rig is built from and the host-side
//! runtime that evaluates it:
//!
//! - [`Armature`]: a tree of [`Bone`]s with their [`Constraint`]s and [`Driver`]s
//! - [`Curve`]: Bezier guide objects with hook modifiers
//! - [`Expression`]: the arithmetic language drivers are written in
//! - [`evaluate`]: recomputes drivers and channel-space constraints
//! - [`TemplateAsset`] and [`RigInstance`]: the starting skeleton and its instantiation
//! - [`HostManifest`]: host-facing records with data-path strings
//!
//! # Example
//!
//! ```
//! use autorig_armature::{RigInstance, TemplateAsset};
//!
//! let rig = RigInstance::from_template(&TemplateAsset::humanoid()).unwrap();
//! assert!(rig.armature.contains("center_HDL"));
//! assert!(rig.curve("spine_SPL").is_ok());
//! ```

pub mod armature;
pub mod bone;
pub mod channel;
pub mod constraint;
pub mod curve;
pub mod driver;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod host;
pub mod mode;
pub mod names;
pub mod properties;
pub mod rig;
pub mod template;

pub use armature::Armature;
pub use bone::{AxisDirection, Bone, BoneEnd, BoneId, BoneLayer, InheritScale, Pose, RotationMode};
pub use channel::{
    Axis, ChannelKind, TransformChannel, TransformLocks, TransformRead, TransformSpace,
};
pub use constraint::{
    AxisLimit, ChildOfInverse, Constraint, ConstraintId, ConstraintKind, PoleTarget, Space,
    TrackAxis, XzScaleMode, YScaleMode,
};
pub use curve::{BezierPoint, Curve, HookModifier, ObjectChildOf};
pub use driver::{Driver, DriverId, DriverTarget, DriverVariable, VariableBinding};
pub use error::{ArmatureError, ArmatureResult};
pub use evaluate::{evaluate, EvaluatedPose};
pub use expression::{Expression, ExpressionError};
pub use host::HostManifest;
pub use mode::{Mode, ObjectKind};
pub use names::{BoneName, BoneRole, CURVE_SUFFIX};
pub use properties::{ProductionState, RigProperties, SwitchProperty};
pub use rig::RigInstance;
pub use template::TemplateAsset;
