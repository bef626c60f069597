//! Finger and thumb curl drivers.
//!
//! Each finger is a three-segment chain. The root segment's spread follows
//! the Z rotation of the finger handle and its curl follows the handle's
//! scale (`1 - scale`). The distal segments curl from the root segment's X
//! rotation, times 1.5 and 2.0 scaled by the bend multiplier.

use autorig_armature::{
    Axis, BoneRole, DriverTarget, DriverVariable, Mode, RigInstance, Space, TransformChannel,
    TransformLocks, TransformRead, VariableBinding,
};

use super::{sided, Side};
use crate::builder::{assign_rotation_mode, attach_driver, copy_rotation, lock_transforms};
use crate::config::RigConfig;
use crate::error::RigResult;

const FINGERS: [&str; 4] = ["index", "middle", "ring", "pinky"];

fn segments(stem: &str, side: Side) -> [String; 3] {
    [1, 2, 3].map(|i| sided(&format!("{}_0{}", stem, i), side, BoneRole::Result))
}

/// Drives the rotation of `bone` around `axis` from one channel of `source`.
fn drive(
    rig: &mut RigInstance,
    bone: &str,
    axis: Axis,
    source: &str,
    read: TransformRead,
    expression: &str,
) -> RigResult<()> {
    let armature = &mut rig.armature;
    let target = DriverTarget::BoneChannel {
        bone: armature.bone_id(bone)?,
        channel: TransformChannel::rotation(axis),
    };
    let source = armature.bone_id(source)?;
    attach_driver(
        armature,
        target,
        vec![DriverVariable::new("var", VariableBinding::transform(source, read))],
        expression,
    )?;
    Ok(())
}

fn lock_chain(rig: &mut RigInstance, chain: &[String]) -> RigResult<()> {
    assign_rotation_mode(&mut rig.armature, chain)?;
    lock_transforms(&mut rig.armature, chain, &TransformLocks::ALL.0)?;
    Ok(())
}

fn build_finger(
    rig: &mut RigInstance,
    config: &RigConfig,
    finger: &str,
    side: Side,
) -> RigResult<()> {
    let chain = segments(finger, side);
    let [s1, s2, s3] = &chain;
    let handle = sided(finger, side, BoneRole::Handle);
    let m = config.finger_bend_multiplier;

    lock_chain(rig, &chain)?;
    drive(rig, s2, Axis::X, s1, TransformRead::RotX, &format!("{}*1.5*var", m))?;
    drive(rig, s3, Axis::X, s1, TransformRead::RotX, &format!("{}*2.0*var", m))?;
    drive(rig, s1, Axis::Z, &handle, TransformRead::RotZ, "var")?;
    drive(rig, s1, Axis::X, &handle, TransformRead::ScaleAvg, "-var + 1")?;
    Ok(())
}

/// The thumb root follows its own handle; the curl handle drives the second
/// and third segments.
fn build_thumb(rig: &mut RigInstance, config: &RigConfig, side: Side) -> RigResult<()> {
    let chain = segments("thumb", side);
    let [t1, t2, t3] = &chain;
    let root = sided("thumb_root", side, BoneRole::Handle);
    let handle = sided("thumb", side, BoneRole::Handle);
    let m = config.finger_bend_multiplier;

    lock_chain(rig, &chain)?;
    drive(rig, t3, Axis::X, t2, TransformRead::RotX, &format!("{}*2.0*var", m))?;
    drive(rig, t2, Axis::Z, &handle, TransformRead::RotZ, "var")?;
    drive(rig, t2, Axis::X, &handle, TransformRead::ScaleAvg, "-var + 1")?;
    copy_rotation(&mut rig.armature, &[t1], &root, &[true; 3], Space::World)?;
    Ok(())
}

pub(crate) fn build(rig: &mut RigInstance, config: &RigConfig, side: Side) -> RigResult<()> {
    rig.armature.set_mode(Mode::Pose)?;
    for finger in FINGERS {
        build_finger(rig, config, finger, side)?;
    }
    build_thumb(rig, config, side)
}
