//! FK/IK limbs.
//!
//! A limb is a three-bone result chain (root, mid, end) that follows either
//! an FK duplicate or an IK duplicate, blended by a switch property.

use autorig_armature::{
    BoneRole, InheritScale, Mode, RigInstance, SwitchProperty, TransformLocks,
};

use super::{derived, sided, Side, SpineChain, ROTATION_CHANNELS};
use crate::builder::{
    add_hide_driver, assign_layer, assign_rotation_mode, child_of, create_fk_ik_switch,
    duplicate_bones, ik, lock_transforms, parent_bones,
};
use crate::config::RigConfig;
use crate::error::RigResult;

const FK_MID_LOCKS: [bool; 9] = [true, true, true, false, true, true, true, true, true];

/// Bone names of one limb.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LimbRig {
    pub bones: [String; 3],
    pub fk: [String; 3],
    pub ik: [String; 3],
    pub pole: String,
    pub switch: SwitchProperty,
    /// Pole angle in degrees.
    pub pole_angle: f64,
    pub ik_locks: [bool; 3],
}

impl LimbRig {
    pub fn arm(config: &RigConfig, side: Side) -> Self {
        let bones = [
            sided("arm", side, BoneRole::Result),
            sided("forearm", side, BoneRole::Auxiliary),
            sided("hand", side, BoneRole::Result),
        ];
        let fk = bones.clone().map(|b| derived(&b, "_fk", BoneRole::Handle));
        let ik = [
            derived(&bones[0], "_ik", BoneRole::Handle),
            derived(&bones[1], "_ik", BoneRole::Auxiliary),
            derived(&bones[2], "_ik", BoneRole::Handle),
        ];
        Self {
            bones,
            fk,
            ik,
            pole: derived(&sided("arm", side, BoneRole::Handle), "_Pole", BoneRole::Handle),
            switch: side.arm_switch(),
            pole_angle: config.arm_pole_angles.get(side),
            ik_locks: config.arm_ik_locks,
        }
    }

    pub fn leg(config: &RigConfig, side: Side) -> Self {
        let bones = [
            sided("thigh", side, BoneRole::Result),
            sided("calf", side, BoneRole::Result),
            sided("foot", side, BoneRole::Result),
        ];
        let fk = bones.clone().map(|b| derived(&b, "_fk", BoneRole::Handle));
        let ik = [
            derived(&bones[0], "_ik", BoneRole::Handle),
            derived(&bones[1], "_ik", BoneRole::Auxiliary),
            derived(&bones[2], "_mech", BoneRole::Auxiliary),
        ];
        Self {
            bones,
            fk,
            ik,
            pole: derived(&sided("leg", side, BoneRole::Handle), "_Pole", BoneRole::Handle),
            switch: side.leg_switch(),
            pole_angle: config.leg_pole_angles.get(side),
            ik_locks: config.leg_ik_locks,
        }
    }

    /// Builds the FK and IK duplicates, the IK solver and the switch.
    fn build(&self, rig: &mut RigInstance, config: &RigConfig) -> RigResult<()> {
        let armature = &mut rig.armature;
        let center = config.center_bone.as_str();

        armature.set_mode(Mode::Edit)?;
        duplicate_bones(armature, &self.bones, &self.fk, config.handle_layer()?, true)?;
        duplicate_bones(armature, &self.bones, &self.ik, config.handle_layer()?, true)?;
        assign_layer(armature, &self.ik[1..2], config.aux_layer()?)?;
        parent_bones(armature, &self.ik[2..], center, false, true, InheritScale::Full)?;

        armature.set_mode(Mode::Pose)?;
        assign_rotation_mode(armature, &self.bones)?;
        lock_transforms(armature, &self.bones, &TransformLocks::ALL.0)?;
        lock_transforms(armature, &[&self.pole], &TransformLocks::LOCATION_FREE.0)?;
        lock_transforms(
            armature,
            &[&self.fk[0], &self.fk[2]],
            &TransformLocks::ROTATION_FREE.0,
        )?;
        lock_transforms(armature, &self.fk[1..2], &FK_MID_LOCKS)?;
        lock_transforms(armature, &self.ik[..1], &TransformLocks::SCALE_FREE.0)?;
        lock_transforms(armature, &self.ik[1..2], &TransformLocks::ALL.0)?;
        lock_transforms(armature, &self.ik[2..], &TransformLocks::LOCATION_ROTATION_FREE.0)?;

        child_of(armature, &[&self.fk[0], &self.ik[0]], center, &ROTATION_CHANNELS)?;
        ik(
            armature,
            &self.ik[1..2],
            &self.ik[2],
            Some(self.pole.as_str()),
            2,
            self.pole_angle.to_radians(),
            &self.ik_locks,
        )?;
        for ((result, fk), ik) in self.bones.iter().zip(&self.fk).zip(&self.ik) {
            create_fk_ik_switch(armature, result, fk, ik, self.switch)?;
        }
        add_hide_driver(armature, &self.pole, self.switch, "1-var")?;
        Ok(())
    }
}

pub(crate) fn build_arm(rig: &mut RigInstance, config: &RigConfig, side: Side) -> RigResult<()> {
    LimbRig::arm(config, side).build(rig, config)
}

/// Builds a leg and hangs its FK and IK roots from the spine root.
pub(crate) fn build_leg(
    rig: &mut RigInstance,
    config: &RigConfig,
    side: Side,
    spine: &SpineChain,
) -> RigResult<()> {
    let limb = LimbRig::leg(config, side);
    limb.build(rig, config)?;

    let armature = &mut rig.armature;
    armature.set_mode(Mode::Edit)?;
    parent_bones(
        armature,
        &[&limb.fk[0], &limb.ik[0]],
        spine.root(),
        false,
        false,
        InheritScale::Full,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arm_names() {
        let limb = LimbRig::arm(&RigConfig::default(), Side::Left);
        assert_eq!(limb.fk, ["arm_left_fk_HDL", "forearm_left_fk_HDL", "hand_left_fk_HDL"]);
        assert_eq!(limb.ik, ["arm_left_ik_HDL", "forearm_left_ik_AUX", "hand_left_ik_HDL"]);
        assert_eq!(limb.pole, "arm_left_Pole_HDL");
        assert_eq!(limb.switch, SwitchProperty::LeftArm);
        assert_eq!(limb.pole_angle, 0.0);
    }

    #[test]
    fn test_leg_names() {
        let limb = LimbRig::leg(&RigConfig::default(), Side::Right);
        assert_eq!(limb.bones, ["thigh_right_RST", "calf_right_RST", "foot_right_RST"]);
        assert_eq!(limb.ik[2], "foot_right_mech_AUX");
        assert_eq!(limb.pole, "leg_right_Pole_HDL");
        assert_eq!(limb.ik_locks, [false, true, true]);
    }
}
