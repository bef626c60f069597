//! Toe switch and foot roll.
//!
//! The roll handle drives two mechanism bones: rolling forward turns the
//! pivot under the toe (clamped to the pivot range), rolling back turns the
//! heel (clamped to the heel range). The IK foot hangs from the pivot and
//! the IK toe from the heel.

use autorig_armature::{
    AxisDirection, AxisLimit, BoneEnd, BoneName, BoneRole, InheritScale, Mode, RigInstance, Space,
    TransformLocks,
};

use super::{derived, sided, Side};
use crate::builder::{
    add_bone_axis, add_hide_driver, assign_layer, assign_rotation_mode, copy_rotation,
    create_fk_ik_switch, duplicate_bones, limit_rotation, lock_transforms, parent_bones,
};
use crate::config::RigConfig;
use crate::error::RigResult;

const ROLL_LOCKS: [bool; 9] = [true, true, true, false, true, false, true, true, true];

pub(crate) fn build(rig: &mut RigInstance, config: &RigConfig, side: Side) -> RigResult<()> {
    let foot_mech = derived(&sided("foot", side, BoneRole::Result), "_mech", BoneRole::Auxiliary);
    let foot_fk = derived(&sided("foot", side, BoneRole::Result), "_fk", BoneRole::Handle);
    let toe = sided("toe", side, BoneRole::Result);
    let toe_fk = derived(&toe, "_fk", BoneRole::Handle);
    let toe_mech = derived(&toe, "_mch", BoneRole::Auxiliary);
    let switch = side.leg_switch();
    let armature = &mut rig.armature;

    armature.set_mode(Mode::Edit)?;
    assign_layer(armature, &[&foot_mech], config.aux_layer()?)?;

    armature.set_mode(Mode::Pose)?;
    assign_rotation_mode(armature, &[&toe])?;

    armature.set_mode(Mode::Edit)?;
    duplicate_bones(armature, &[&toe], &[&toe_fk], config.handle_layer()?, true)?;
    duplicate_bones(armature, &[&toe], &[&toe_mech], config.aux_layer()?, true)?;

    armature.set_mode(Mode::Pose)?;
    lock_transforms(armature, &[&toe], &TransformLocks::ALL.0)?;
    lock_transforms(armature, &[&toe_fk], &TransformLocks::ROTATION_FREE.0)?;
    lock_transforms(armature, &[&toe_mech], &TransformLocks::ALL.0)?;

    armature.set_mode(Mode::Edit)?;
    parent_bones(armature, &[&toe_fk], &foot_fk, true, true, InheritScale::Full)?;

    armature.set_mode(Mode::Pose)?;
    create_fk_ik_switch(armature, &toe, &toe_fk, &toe_mech, switch)?;

    let ik_main = derived(&sided("foot", side, BoneRole::Handle), "_IK_main", BoneRole::Handle);
    build_roll(rig, config, &foot_mech, &toe_mech, &ik_main, side)
}

/// Builds the roll handle with its heel and pivot mechanism.
fn build_roll(
    rig: &mut RigInstance,
    config: &RigConfig,
    foot_mech: &str,
    toe_mech: &str,
    ik_main: &str,
    side: Side,
) -> RigResult<()> {
    let armature = &mut rig.armature;
    let switch = side.leg_switch();
    let stem = BoneName::parse(toe_mech).stem().trim_end_matches("_mch").to_string();
    let roll = BoneName::new(format!("{}_roll", stem), BoneRole::Handle).to_string();
    let heel = BoneName::new(format!("{}_heel", stem), BoneRole::Auxiliary).to_string();
    let pivot = BoneName::new(format!("{}_pivot", stem), BoneRole::Handle).to_string();
    let length = armature.bone_named(toe_mech)?.length();
    let aux = config.aux_layer()?;

    armature.set_mode(Mode::Edit)?;
    add_bone_axis(
        armature,
        &roll,
        foot_mech,
        ik_main,
        BoneEnd::Head,
        AxisDirection::NegY,
        length,
        false,
        config.handle_layer()?,
        true,
    )?;

    armature.set_mode(Mode::Pose)?;
    lock_transforms(armature, &[&roll], &ROLL_LOCKS)?;
    add_hide_driver(armature, &roll, switch, "1-var")?;

    armature.set_mode(Mode::Edit)?;
    add_bone_axis(
        armature,
        &heel,
        ik_main,
        ik_main,
        BoneEnd::Tail,
        AxisDirection::NegY,
        length,
        false,
        aux,
        true,
    )?;
    armature.set_mode(Mode::Pose)?;
    lock_transforms(armature, &[&heel], &TransformLocks::ALL.0)?;

    armature.set_mode(Mode::Edit)?;
    add_bone_axis(
        armature,
        &pivot,
        toe_mech,
        &heel,
        BoneEnd::Head,
        AxisDirection::NegY,
        length,
        false,
        aux,
        true,
    )?;
    armature.set_mode(Mode::Pose)?;
    lock_transforms(armature, &[&pivot], &TransformLocks::ALL.0)?;

    armature.set_mode(Mode::Edit)?;
    parent_bones(armature, &[foot_mech], &pivot, false, true, InheritScale::Full)?;
    parent_bones(armature, &[toe_mech], &heel, false, true, InheritScale::Full)?;

    armature.set_mode(Mode::Pose)?;
    copy_rotation(armature, &[&pivot], &roll, &[true; 3], Space::Local)?;
    limit_rotation(
        armature,
        &[&pivot],
        [config.pivot_limit(), AxisLimit::default(), AxisLimit::default()],
        Space::Local,
    )?;
    copy_rotation(armature, &[&heel], &roll, &[true, false, false], Space::Local)?;
    limit_rotation(
        armature,
        &[&heel],
        [config.heel_limit(), AxisLimit::default(), AxisLimit::default()],
        Space::Local,
    )?;
    add_hide_driver(armature, ik_main, switch, "1-var")?;

    tracing::debug!(%side, roll = %roll, "Built foot roll");
    Ok(())
}
