//! Bone graph builder.
//!
//! Graph-construction primitives over an explicit [`Armature`]. Every
//! primitive states the mode it needs and fails with `WrongMode` instead of
//! switching modes itself:
//!
//! | Primitive | Mode |
//! |-----------|------|
//! | [`duplicate_bones`], [`parent_bones`], [`assign_layer`], [`connect_tail_head`], [`add_bone_axis`], [`subdivide`], [`create_spline_chain`], [`create_spline_hooks`] | Edit |
//! | [`assign_rotation_mode`], [`lock_transforms`], constraints, drivers | Pose |
//! | [`object_child_of`] | Object (curve) |
//!
//! Bones are named with strings at this boundary and referenced by id inside
//! the model. A rejected call logs a warning and returns the error; it leaves
//! whatever it had already changed in place.
//!
//! [`Armature`]: autorig_armature::Armature

mod constraints;
mod drivers;
mod spline;
mod structure;

pub use constraints::{
    attach_constraint, bake_child_of_inverses, child_of, copy_rotation, copy_transforms,
    damped_track, delete_constraints_and_drivers, ik, limit_rotation, object_child_of,
    ConstraintSpec,
};
pub use drivers::{add_hide_driver, attach_driver, chain_torsion, create_fk_ik_switch, FkIkSwitch};
pub use spline::{create_spline_chain, create_spline_hooks};
pub use structure::{
    add_bone_axis, assign_layer, assign_rotation_mode, connect_tail_head, duplicate_bones,
    lock_transforms, parent_bones, subdivide,
};

use autorig_armature::ArmatureResult;

/// Runs a primitive, logging the error if the call is rejected.
pub(crate) fn logged<T>(
    operation: &'static str,
    call: impl FnOnce() -> ArmatureResult<T>,
) -> ArmatureResult<T> {
    call().inspect_err(|err| tracing::warn!(operation, code = err.code(), "{}", err))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use autorig_armature::{Armature, BezierPoint, Curve, Mode};
    use glam::DVec3;

    /// A three-bone connected chain `root_RST -> mid_RST -> end_RST` along +Z
    /// and a free `ctrl_HDL`, in edit mode.
    pub fn chain() -> Armature {
        let mut arm = Armature::new("rig");
        let root = arm.add_bone("root_RST", DVec3::ZERO, DVec3::Z).unwrap();
        let mid = arm.add_bone("mid_RST", DVec3::Z, DVec3::Z * 2.0).unwrap();
        let end = arm.add_bone("end_RST", DVec3::Z * 2.0, DVec3::Z * 3.0).unwrap();
        arm.add_bone("ctrl_HDL", DVec3::X, DVec3::X + DVec3::Y).unwrap();
        arm.set_parent(mid, Some(root), true).unwrap();
        arm.set_parent(end, Some(mid), true).unwrap();
        arm.set_mode(Mode::Edit).unwrap();
        arm
    }

    /// A straight three-point curve of length 2 along +Z.
    pub fn straight_curve() -> Curve {
        let points = [0.0, 1.0, 2.0]
            .iter()
            .map(|z| BezierPoint::new(DVec3::new(0.0, 0.0, *z)))
            .collect();
        Curve::new("guide_SPL", points)
    }
}
