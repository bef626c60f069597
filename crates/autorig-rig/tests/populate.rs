//! End-to-end tests of the assembly pipeline on the humanoid template.

use autorig_armature::{
    evaluate, Axis, BoneName, BoneRole, ProductionState, RigInstance, SwitchProperty,
    TemplateAsset, TransformChannel, TransformLocks,
};
use autorig_rig::{
    operators, PopulateReport, RigConfig, RigError, Side, Stage, StageOutcome, Workspace,
};
use pretty_assertions::assert_eq;

fn populated(template: &TemplateAsset, config: &RigConfig) -> (Workspace, PopulateReport) {
    let mut ws = Workspace::new();
    operators::add_armature(&mut ws, template).unwrap();
    let report = operators::populate(&mut ws, config).unwrap();
    (ws, report)
}

fn full_rig() -> RigInstance {
    let (ws, report) = populated(&TemplateAsset::humanoid(), &RigConfig::default());
    assert!(report.is_complete(), "{:?}", report);
    ws.active.unwrap()
}

fn rot(axis: Axis) -> TransformChannel {
    TransformChannel::rotation(axis)
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_populate_completes_every_stage() {
    let (ws, report) = populated(&TemplateAsset::humanoid(), &RigConfig::default());
    assert_eq!(report.stages.len(), Stage::ALL.len());
    assert!(report.is_complete());
    assert!(report.baked_inverses > 0);

    let rig = ws.active().unwrap();
    assert_eq!(rig.armature.properties().production_state, ProductionState::Ready);
    for name in [
        "spine07_RST",
        "hips_location_HDL",
        "shoulder_con_left_AUX",
        "shoulder_right_HDL",
        "neck_HDL",
        "head_HDL",
        "arm_left_fk_HDL",
        "forearm_right_ik_AUX",
        "hand_left_ik_HDL",
        "forearm_left_part4_RST",
        "hand_right_torsion_E_AUX",
        "foot_left_mech_AUX",
        "toe_right_mch_AUX",
        "toe_left_roll_HDL",
        "toe_left_pivot_HDL",
        "toe_right_heel_AUX",
    ] {
        assert!(rig.armature.contains(name), "missing {}", name);
    }
    assert!(!rig.armature.contains("spine08_RST"));
    assert!(evaluate(&rig.armature).is_ok());
}

#[test]
fn test_spine_stage_counts() {
    let (_, report) = populated(&TemplateAsset::humanoid(), &RigConfig::default());
    match report.outcome(Stage::Spine).unwrap() {
        StageOutcome::Completed {
            bones_added,
            constraints_added,
            drivers_added,
        } => {
            // seven result bones, four hooks, hips
            assert_eq!(*bones_added, 12);
            // spline IK and the chain root's child-of
            assert_eq!(*constraints_added, 2);
            assert_eq!(*drivers_added, 7);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_result_bones_are_locked() {
    let mut rig = full_rig();
    for bone in rig.armature.bones() {
        if BoneName::parse(&bone.name).role() == BoneRole::Result {
            assert_eq!(bone.locks, TransformLocks::ALL, "{} is not locked", bone.name);
        }
    }

    let hand = rig.armature.bone_id("hand_left_RST").unwrap();
    let err = rig.armature.keyframe(hand, rot(Axis::X), 0.5).unwrap_err();
    assert_eq!(err.code(), "ARM_009");
}

#[test]
fn test_arm_switch_blends_fk_and_ik() {
    let mut rig = full_rig();
    let arm = rig.armature.bone_id("arm_left_RST").unwrap();
    let fk = rig.armature.constraint_named(arm, "Copy Transforms").unwrap().id;
    let ik = rig.armature.constraint_named(arm, "Copy Transforms.001").unwrap().id;
    let fk_bone = rig.armature.bone_id("arm_left_fk_HDL").unwrap();
    let pole = rig.armature.bone_id("arm_left_Pole_HDL").unwrap();
    rig.armature.keyframe(fk_bone, rot(Axis::X), 1.0).unwrap();

    for v in [0.0, 0.3, 0.5, 1.0] {
        rig.armature.properties_mut().set_switch(SwitchProperty::LeftArm, v);
        let pose = evaluate(&rig.armature).unwrap();
        let (fk, ik) = (pose.influence(fk).unwrap(), pose.influence(ik).unwrap());
        assert_close(fk + ik, 1.0);
        assert_close(ik, v);
        assert_eq!(pose.is_hidden(fk_bone), v >= 0.5);
        assert_eq!(pose.is_hidden(pole), 1.0 - v >= 0.5);
        // The IK copy blends over the FK copy's output.
        let result = pose.value(arm, rot(Axis::X)).unwrap();
        assert_close(result, (1.0 - v) * (1.0 - v));
    }
}

#[test]
fn test_spine_twist_interpolates_between_hooks() {
    let mut rig = full_rig();
    let first = rig.armature.bone_id("spine01_HDL").unwrap();
    let last = rig.armature.bone_id("spine04_HDL").unwrap();
    let (t0, t1) = (0.3, -0.9);
    rig.armature.keyframe(first, rot(Axis::Y), t0).unwrap();
    rig.armature.keyframe(last, rot(Axis::Y), t1).unwrap();

    let names: Vec<String> = (1..=7).map(|i| format!("spine{:02}_RST", i)).collect();
    let chain = rig.armature.bone_ids(&names).unwrap();
    let pose = evaluate(&rig.armature).unwrap();
    for (i, twist) in pose.accumulated_twist(&chain).into_iter().enumerate() {
        assert_close(twist, t0 + i as f64 / 6.0 * (t1 - t0));
    }
}

#[test]
fn test_forearm_twist_follows_hand() {
    let mut rig = full_rig();
    let hand_fk = rig.armature.bone_id("hand_left_fk_HDL").unwrap();
    rig.armature.keyframe(hand_fk, rot(Axis::Y), 0.8).unwrap();

    let names: Vec<String> = (1..=4).map(|i| format!("forearm_left_part{}_RST", i)).collect();
    let parts = rig.armature.bone_ids(&names).unwrap();
    let pose = evaluate(&rig.armature).unwrap();
    let twist = pose.accumulated_twist(&parts);
    assert_eq!(twist.len(), 4);
    for (i, value) in twist.into_iter().enumerate() {
        assert_close(value, i as f64 / 3.0 * 0.8);
    }
}

#[test]
fn test_finger_curl_from_handle_scale() {
    let mut rig = full_rig();
    let handle = rig.armature.bone_id("index_left_HDL").unwrap();
    let segments = rig
        .armature
        .bone_ids(&["index_01_left_RST", "index_02_left_RST", "index_03_left_RST"])
        .unwrap();

    for r in [0.0, std::f64::consts::FRAC_PI_2, -0.5] {
        rig.armature.bone_mut(handle).unwrap().pose.scale = [1.0 - r; 3];
        let pose = evaluate(&rig.armature).unwrap();
        assert_close(pose.value(segments[0], rot(Axis::X)).unwrap(), r);
        assert_close(pose.value(segments[1], rot(Axis::X)).unwrap(), 1.5 * r);
        assert_close(pose.value(segments[2], rot(Axis::X)).unwrap(), 2.0 * r);
    }
}

#[test]
fn test_finger_multiplier_scales_distal_curl() {
    let config = RigConfig {
        finger_bend_multiplier: 0.5,
        ..RigConfig::default()
    };
    let (ws, report) = populated(&TemplateAsset::humanoid(), &config);
    assert!(report.is_complete());
    let mut rig = ws.active.unwrap();
    let handle = rig.armature.bone_id("ring_right_HDL").unwrap();
    rig.armature.bone_mut(handle).unwrap().pose.scale = [0.6; 3];
    let tip = rig.armature.bone_id("ring_03_right_RST").unwrap();
    let pose = evaluate(&rig.armature).unwrap();
    assert_close(pose.value(tip, rot(Axis::X)).unwrap(), 0.5 * 2.0 * 0.4);
}

#[test]
fn test_foot_roll_is_clamped() {
    let mut rig = full_rig();
    let roll = rig.armature.bone_id("toe_left_roll_HDL").unwrap();
    let pivot = rig.armature.bone_id("toe_left_pivot_HDL").unwrap();
    let heel = rig.armature.bone_id("toe_left_heel_AUX").unwrap();

    rig.armature.keyframe(roll, rot(Axis::X), 200f64.to_radians()).unwrap();
    let pose = evaluate(&rig.armature).unwrap();
    assert_close(pose.value(pivot, rot(Axis::X)).unwrap(), 170f64.to_radians());
    assert_close(pose.value(heel, rot(Axis::X)).unwrap(), 0.0);

    rig.armature.keyframe(roll, rot(Axis::X), -200f64.to_radians()).unwrap();
    let pose = evaluate(&rig.armature).unwrap();
    assert_close(pose.value(pivot, rot(Axis::X)).unwrap(), 0.0);
    assert_close(pose.value(heel, rot(Axis::X)).unwrap(), -170f64.to_radians());

    let err = rig.armature.keyframe(roll, rot(Axis::Y), 0.1).unwrap_err();
    assert_eq!(err.code(), "ARM_009");
}

#[test]
fn test_missing_bone_aborts_only_its_region() {
    let template = TemplateAsset::humanoid().without_bones(&["index_02_left_RST"]);
    let (ws, report) = populated(&template, &RigConfig::default());

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Stage::Hand(Side::Left));
    assert!(failures[0].1.is_missing_name());
    assert!(report.completed(Stage::Hand(Side::Right)));
    assert!(report.completed(Stage::Foot(Side::Left)));
    assert_eq!(report.skipped().count(), 0);

    let rig = ws.active().unwrap();
    assert_eq!(
        rig.armature.properties().production_state,
        ProductionState::BasicEdition
    );
}

#[test]
fn test_failed_leg_skips_its_foot() {
    let template = TemplateAsset::humanoid().without_bones(&["calf_left_RST"]);
    let (_, report) = populated(&template, &RigConfig::default());
    assert!(matches!(
        report.outcome(Stage::Leg(Side::Left)),
        Some(StageOutcome::Failed { .. })
    ));
    assert_eq!(report.skipped().collect::<Vec<_>>(), vec![Stage::Foot(Side::Left)]);
    assert!(report.completed(Stage::Leg(Side::Right)));
    assert!(report.completed(Stage::Foot(Side::Right)));
}

#[test]
fn test_missing_spine_curve() {
    let mut ws = Workspace::new();
    operators::add_armature(&mut ws, &TemplateAsset::humanoid()).unwrap();
    ws.active_mut().unwrap().curves.clear();
    let report = operators::populate(&mut ws, &RigConfig::default()).unwrap();

    match report.outcome(Stage::Spine) {
        Some(StageOutcome::Failed { error }) => {
            assert_eq!(
                *error,
                RigError::MissingCurve {
                    name: "spine_SPL".into()
                }
            );
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let skipped: Vec<Stage> = report.skipped().collect();
    assert_eq!(
        skipped,
        vec![
            Stage::Shoulders,
            Stage::NeckHead,
            Stage::Leg(Side::Left),
            Stage::Leg(Side::Right),
            Stage::Foot(Side::Left),
            Stage::Foot(Side::Right),
        ]
    );
    assert!(report.completed(Stage::Arm(Side::Right)));
    assert!(report.completed(Stage::Hand(Side::Left)));
}

#[test]
fn test_custom_spine_cuts() {
    let config = RigConfig {
        spine_cuts: 3,
        ..RigConfig::default()
    };
    let (ws, report) = populated(&TemplateAsset::humanoid(), &config);
    assert!(report.is_complete());
    let rig = ws.active().unwrap();
    assert!(rig.armature.contains("spine04_RST"));
    assert!(!rig.armature.contains("spine05_RST"));

    let top = rig.armature.bone_id("spine04_RST").unwrap();
    let driver = rig
        .armature
        .drivers()
        .iter()
        .find(|d| d.target.bone() == Some(top))
        .unwrap();
    assert_eq!(driver.expression.source(), "-1/3*var_first + 1/3*var_last");
}

#[test]
fn test_populated_rig_survives_json() {
    let rig = full_rig();
    let json = rig.to_json_pretty().unwrap();
    let parsed = RigInstance::from_json(&json).unwrap();
    assert_eq!(parsed.armature.bone_names(), rig.armature.bone_names());
    assert_eq!(parsed.armature.constraints().len(), rig.armature.constraints().len());
    assert_eq!(parsed.armature.drivers().len(), rig.armature.drivers().len());
    assert!(evaluate(&parsed.armature).is_ok());
}
