//! Rig assembly pipeline.
//!
//! Turns an instantiated template into an animation rig by running a fixed
//! sequence of stages over the builder primitives:
//!
//! 1. spine, shoulders, neck and head
//! 2. FK/IK arms with forearm torsion, fingers and thumbs
//! 3. FK/IK legs with foot roll
//!
//! Stages run per region and, for limbs, per side. A failed stage keeps what
//! it already built, is reported, and causes the stages that consume its
//! bones to be skipped; unrelated regions still run. Every stage puts the
//! armature in the mode it needs before it starts.

mod feet;
mod forearm;
mod hands;
mod limb;
mod neck;
mod report;
mod shoulders;
mod spine;

pub use report::{PopulateReport, StageOutcome, StageReport};

use std::fmt;

use autorig_armature::{
    ArmatureError, AxisDirection, BoneName, BoneRole, Mode, RigInstance, SwitchProperty,
};

use crate::builder::bake_child_of_inverses;
use crate::config::RigConfig;
use crate::error::RigResult;

pub(crate) use spine::SpineChain;

// =============================================================================
// Stages
// =============================================================================

/// Character side. The template's left side is +X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn arm_switch(&self) -> SwitchProperty {
        match self {
            Side::Left => SwitchProperty::LeftArm,
            Side::Right => SwitchProperty::RightArm,
        }
    }

    pub fn leg_switch(&self) -> SwitchProperty {
        match self {
            Side::Left => SwitchProperty::LeftLeg,
            Side::Right => SwitchProperty::RightLeg,
        }
    }

    /// Direction from the shoulder towards the body center.
    pub(crate) fn inward(&self) -> AxisDirection {
        match self {
            Side::Left => AxisDirection::NegX,
            Side::Right => AxisDirection::PosX,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Spine,
    Shoulders,
    NeckHead,
    Arm(Side),
    ForearmTorsion(Side),
    Hand(Side),
    Leg(Side),
    Foot(Side),
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 13] = [
        Stage::Spine,
        Stage::Shoulders,
        Stage::NeckHead,
        Stage::Arm(Side::Left),
        Stage::Arm(Side::Right),
        Stage::ForearmTorsion(Side::Left),
        Stage::ForearmTorsion(Side::Right),
        Stage::Hand(Side::Left),
        Stage::Hand(Side::Right),
        Stage::Leg(Side::Left),
        Stage::Leg(Side::Right),
        Stage::Foot(Side::Left),
        Stage::Foot(Side::Right),
    ];

    /// Stages whose output this stage consumes.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Spine | Stage::Arm(_) | Stage::Hand(_) => &[],
            Stage::Shoulders | Stage::NeckHead => &[Stage::Spine],
            Stage::ForearmTorsion(Side::Left) => &[Stage::Arm(Side::Left)],
            Stage::ForearmTorsion(Side::Right) => &[Stage::Arm(Side::Right)],
            Stage::Leg(_) => &[Stage::Spine],
            Stage::Foot(Side::Left) => &[Stage::Leg(Side::Left)],
            Stage::Foot(Side::Right) => &[Stage::Leg(Side::Right)],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Spine => f.write_str("spine"),
            Stage::Shoulders => f.write_str("shoulders"),
            Stage::NeckHead => f.write_str("neck_head"),
            Stage::Arm(side) => write!(f, "arm.{}", side),
            Stage::ForearmTorsion(side) => write!(f, "forearm_torsion.{}", side),
            Stage::Hand(side) => write!(f, "hand.{}", side),
            Stage::Leg(side) => write!(f, "leg.{}", side),
            Stage::Foot(side) => write!(f, "foot.{}", side),
        }
    }
}

// =============================================================================
// Naming
// =============================================================================

/// `{stem}_{side}` with the suffix of `role`, e.g. `hand_left_RST`.
pub(crate) fn sided(stem: &str, side: Side, role: BoneRole) -> String {
    BoneName::new(format!("{}_{}", stem, side), role).to_string()
}

/// `name` with `extra` appended to its stem and the suffix of `role`.
pub(crate) fn derived(name: &str, extra: &str, role: BoneRole) -> String {
    BoneName::parse(name).extend(extra).with_role(role).to_string()
}

/// Location and scale locked, rotation free.
pub(crate) const ROTATION_CHANNELS: [bool; 9] =
    [false, false, false, true, true, true, false, false, false];

// =============================================================================
// Populate
// =============================================================================

#[derive(Default)]
struct Built {
    spine: Option<SpineChain>,
}

impl Built {
    fn spine(&self) -> RigResult<&SpineChain> {
        self.spine
            .as_ref()
            .ok_or_else(|| ArmatureError::missing_bone(format!("{}01_RST", spine::PREFIX)).into())
    }
}

/// Runs every stage over `rig` and bakes the `Child Of` inverses.
///
/// Returns an error only for an invalid config or a failure after the
/// stages ran; stage failures are reported in the [`PopulateReport`]. The
/// armature is left in object mode.
pub fn populate(rig: &mut RigInstance, config: &RigConfig) -> RigResult<PopulateReport> {
    config.validate()?;
    let mut report = PopulateReport::default();
    let mut built = Built::default();

    for stage in Stage::ALL {
        if let Some(missing) = stage.dependencies().iter().find(|dep| !report.completed(**dep)) {
            tracing::info!(%stage, dependency = %missing, "Skipping stage");
            report.record(
                stage,
                StageOutcome::Skipped {
                    reason: format!("{} did not complete", missing),
                },
            );
            continue;
        }

        let bones = rig.armature.bone_count();
        let constraints = rig.armature.constraints().len();
        let drivers = rig.armature.drivers().len();
        tracing::debug!(%stage, "Running stage");

        let result = match stage {
            Stage::Spine => spine::build(rig, config).map(|chain| built.spine = Some(chain)),
            Stage::Shoulders => built
                .spine()
                .and_then(|chain| shoulders::build(rig, config, chain)),
            Stage::NeckHead => built.spine().and_then(|chain| neck::build(rig, config, chain)),
            Stage::Arm(side) => limb::build_arm(rig, config, side),
            Stage::ForearmTorsion(side) => forearm::build(rig, config, side),
            Stage::Hand(side) => hands::build(rig, config, side),
            Stage::Leg(side) => built
                .spine()
                .and_then(|chain| limb::build_leg(rig, config, side, chain)),
            Stage::Foot(side) => feet::build(rig, config, side),
        };

        match result {
            Ok(()) => {
                let outcome = StageOutcome::Completed {
                    bones_added: rig.armature.bone_count().saturating_sub(bones),
                    constraints_added: rig.armature.constraints().len().saturating_sub(constraints),
                    drivers_added: rig.armature.drivers().len().saturating_sub(drivers),
                };
                tracing::info!(%stage, "Stage completed");
                report.record(stage, outcome);
            }
            Err(error) => {
                tracing::warn!(%stage, code = error.code(), "Stage failed: {}", error);
                report.record(stage, StageOutcome::Failed { error });
            }
        }
    }

    rig.armature.set_mode(Mode::Pose)?;
    report.baked_inverses = bake_child_of_inverses(rig)?;
    rig.armature.set_mode(Mode::Object)?;

    tracing::info!(
        bones = rig.armature.bone_count(),
        constraints = rig.armature.constraints().len(),
        drivers = rig.armature.drivers().len(),
        complete = report.is_complete(),
        "Populated rig"
    );
    Ok(report)
}
