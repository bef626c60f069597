//! Template assets: the starting skeleton and curve guides of a rig.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::bone::BoneLayer;
use crate::curve::BezierPoint;
use crate::names::{BoneName, BoneRole};
use crate::properties::ProductionState;

/// Layer template result bones are placed on.
pub const TEMPLATE_RESULT_LAYER: u8 = 23;
/// Layer template handle bones are placed on.
pub const TEMPLATE_HANDLE_LAYER: u8 = 16;
/// Layer template auxiliary bones are placed on.
pub const TEMPLATE_AUX_LAYER: u8 = 7;

/// A bone record of a template asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateBone {
    pub name: String,
    pub head: DVec3,
    pub tail: DVec3,
    #[serde(default)]
    pub roll: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub connected: bool,
    #[serde(default = "default_true")]
    pub inherit_rotation: bool,
    #[serde(default)]
    pub layer: BoneLayer,
}

fn default_true() -> bool {
    true
}

/// A curve guide object (`_SPL`) of a template asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateCurve {
    pub name: String,
    pub points: Vec<BezierPoint>,
}

/// A packaged template: bone hierarchy, curve guides and production state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateAsset {
    /// Name of the armature object.
    pub armature: String,
    pub bones: Vec<TemplateBone>,
    #[serde(default)]
    pub curves: Vec<TemplateCurve>,
    #[serde(default = "default_state")]
    pub production_state: ProductionState,
}

fn default_state() -> ProductionState {
    ProductionState::Template
}

impl TemplateAsset {
    /// Parses a template from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the template to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// BLAKE3 hash of the template's JSON form, as 64 lowercase hex digits.
    ///
    /// Object keys are sorted before hashing, so the hash does not depend on
    /// field order in the source file.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let canonical = serde_json::to_value(self)?.to_string();
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    /// Returns the template bone with this name.
    pub fn bone(&self, name: &str) -> Option<&TemplateBone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Returns a copy of this template without the named bones.
    pub fn without_bones(&self, names: &[&str]) -> Self {
        let mut out = self.clone();
        out.bones.retain(|b| !names.contains(&b.name.as_str()));
        for bone in &mut out.bones {
            if bone.parent.as_deref().is_some_and(|p| names.contains(&p)) {
                bone.parent = None;
                bone.connected = false;
            }
        }
        out
    }

    /// The built-in humanoid template.
    ///
    /// Z is up, the character faces -Y and its left side is +X.
    pub fn humanoid() -> Self {
        let mut b = TemplateBuilder::default();

        b.bone("center_HDL", [0.0, 0.0, 0.0], [0.0, 0.4, 0.0], None, false);

        b.bone("neck01_RST", [0.0, 0.02, 1.5], [0.0, 0.02, 1.55], None, false);
        b.bone("neck02_RST", [0.0, 0.02, 1.55], [0.0, 0.01, 1.6], Some("neck01_RST"), true);
        b.bone("head_RST", [0.0, 0.01, 1.6], [0.0, 0.0, 1.8], Some("neck02_RST"), true);

        for (side, s) in [("left", 1.0), ("right", -1.0)] {
            let x = |v: f64| v * s;
            let n = |stem: &str| format!("{stem}_{side}");

            // Arm
            let shoulder = format!("{}_RST", n("shoulder"));
            let arm = format!("{}_RST", n("arm"));
            let forearm = format!("{}_AUX", n("forearm"));
            let hand = format!("{}_RST", n("hand"));
            b.bone(&shoulder, [x(0.03), 0.0, 1.48], [x(0.18), 0.0, 1.47], None, false);
            b.bone(&arm, [x(0.18), 0.0, 1.47], [x(0.45), 0.03, 1.25], Some(&shoulder), true);
            b.bone(&forearm, [x(0.45), 0.03, 1.25], [x(0.68), 0.0, 1.05], Some(&arm), true);
            b.bone(&hand, [x(0.68), 0.0, 1.05], [x(0.76), -0.01, 0.98], Some(&forearm), true);
            b.bone(
                &format!("{}_Pole_HDL", n("arm")),
                [x(0.45), 0.4, 1.25],
                [x(0.45), 0.5, 1.25],
                Some("center_HDL"),
                false,
            );

            // Fingers
            let fingers = [("index", -0.03), ("middle", -0.01), ("ring", 0.01), ("pinky", 0.03)];
            for (finger, dy) in fingers {
                let seg = |i: u32| format!("{finger}_0{i}_{side}_RST");
                let root = [x(0.77), dy, 0.97];
                let knuckle = [x(0.8), dy - 0.005, 0.94];
                let mid = [x(0.82), dy - 0.01, 0.92];
                let tip = [x(0.835), dy - 0.015, 0.905];
                b.bone(&seg(1), root, knuckle, Some(&hand), false);
                b.bone(&seg(2), knuckle, mid, Some(&seg(1)), true);
                b.bone(&seg(3), mid, tip, Some(&seg(2)), true);
                b.bone(
                    &format!("{finger}_{side}_HDL"),
                    root,
                    [x(0.77), dy, 1.0],
                    Some(&hand),
                    false,
                );
            }

            // Thumb
            let thumb = |i: u32| format!("thumb_0{i}_{side}_RST");
            let root = [x(0.7), -0.04, 1.02];
            b.bone(
                &format!("thumb_root_{side}_HDL"),
                root,
                [x(0.72), -0.07, 1.0],
                Some(&hand),
                false,
            );
            b.bone(&thumb(1), root, [x(0.72), -0.07, 1.0], Some(&hand), false);
            let (mid, tip) = ([x(0.735), -0.09, 0.985], [x(0.745), -0.105, 0.975]);
            b.bone(&thumb(2), [x(0.72), -0.07, 1.0], mid, Some(&thumb(1)), true);
            b.bone(&thumb(3), mid, tip, Some(&thumb(2)), true);
            b.bone(
                &format!("thumb_{side}_HDL"),
                [x(0.72), -0.07, 1.0],
                [x(0.72), -0.07, 1.03],
                Some(&hand),
                false,
            );

            // Leg
            let thigh = format!("{}_RST", n("thigh"));
            let calf = format!("{}_RST", n("calf"));
            let foot = format!("{}_RST", n("foot"));
            let toe = format!("{}_RST", n("toe"));
            b.bone(&thigh, [x(0.1), 0.0, 0.95], [x(0.11), -0.01, 0.52], None, false);
            b.bone(&calf, [x(0.11), -0.01, 0.52], [x(0.12), 0.01, 0.1], Some(&thigh), true);
            b.bone(&foot, [x(0.12), 0.01, 0.1], [x(0.12), -0.1, 0.03], Some(&calf), true);
            b.bone(&toe, [x(0.12), -0.1, 0.03], [x(0.12), -0.18, 0.02], Some(&foot), true);
            b.bone(
                &format!("{}_Pole_HDL", n("leg")),
                [x(0.11), -0.5, 0.52],
                [x(0.11), -0.6, 0.52],
                Some("center_HDL"),
                false,
            );
            b.bone(
                &format!("{}_IK_main_HDL", n("foot")),
                [x(0.12), -0.18, 0.0],
                [x(0.12), 0.05, 0.0],
                Some("center_HDL"),
                false,
            );
        }

        let spine = [
            [0.0, 0.0, 1.0],
            [0.0, -0.02, 1.15],
            [0.0, 0.0, 1.3],
            [0.0, 0.02, 1.45],
        ];
        let tangent = DVec3::new(0.0, 0.0, 0.05);
        let points = spine
            .iter()
            .map(|p| BezierPoint::with_tangent(DVec3::from_array(*p), tangent))
            .collect();

        TemplateAsset {
            armature: "autorig_armature".to_string(),
            bones: b.bones,
            curves: vec![TemplateCurve {
                name: "spine_SPL".to_string(),
                points,
            }],
            production_state: ProductionState::Template,
        }
    }
}

#[derive(Default)]
struct TemplateBuilder {
    bones: Vec<TemplateBone>,
}

impl TemplateBuilder {
    fn bone(
        &mut self,
        name: &str,
        head: [f64; 3],
        tail: [f64; 3],
        parent: Option<&str>,
        connected: bool,
    ) {
        let layer = match BoneName::parse(name).role() {
            BoneRole::Handle => TEMPLATE_HANDLE_LAYER,
            BoneRole::Auxiliary => TEMPLATE_AUX_LAYER,
            BoneRole::Result | BoneRole::Other => TEMPLATE_RESULT_LAYER,
        };
        self.bones.push(TemplateBone {
            name: name.to_string(),
            head: DVec3::from_array(head),
            tail: DVec3::from_array(tail),
            roll: 0.0,
            parent: parent.map(str::to_string),
            connected,
            inherit_rotation: true,
            layer: BoneLayer::new(layer).unwrap_or_default(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanoid_has_unique_names_and_known_parents() {
        let template = TemplateAsset::humanoid();
        let mut names: Vec<&str> = template.bones.iter().map(|b| b.name.as_str()).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);

        for bone in &template.bones {
            if let Some(parent) = &bone.parent {
                let idx_parent = template.bones.iter().position(|b| &b.name == parent);
                let idx_bone = template.bones.iter().position(|b| b.name == bone.name);
                assert!(
                    idx_parent.is_some() && idx_parent < idx_bone,
                    "{} listed before its parent",
                    bone.name
                );
            }
        }
    }

    #[test]
    fn test_humanoid_names() {
        let template = TemplateAsset::humanoid();
        for name in [
            "center_HDL",
            "neck01_RST",
            "head_RST",
            "forearm_left_AUX",
            "hand_right_RST",
            "arm_left_Pole_HDL",
            "ring_02_right_RST",
            "pinky_left_HDL",
            "thumb_root_left_HDL",
            "thumb_03_right_RST",
            "toe_left_RST",
            "leg_right_Pole_HDL",
            "foot_left_IK_main_HDL",
        ] {
            assert!(template.bone(name).is_some(), "missing {}", name);
        }
        assert_eq!(template.curves[0].name, "spine_SPL");
        assert_eq!(template.curves[0].points.len(), 4);
        assert_eq!(template.production_state, ProductionState::Template);
        assert_eq!(template.bone("forearm_left_AUX").map(|b| b.layer.index()), Some(7));
    }

    #[test]
    fn test_json_round_trip_and_without_bones() {
        let template = TemplateAsset::humanoid();
        let json = template.to_json_pretty().unwrap();
        assert_eq!(TemplateAsset::from_json(&json).unwrap(), template);

        let trimmed = template.without_bones(&["calf_left_RST"]);
        assert!(trimmed.bone("calf_left_RST").is_none());
        let foot = trimmed.bone("foot_left_RST").unwrap();
        assert_eq!(foot.parent, None);
        assert!(!foot.connected);
    }

    #[test]
    fn test_content_hash_tracks_edits() {
        let template = TemplateAsset::humanoid();
        let hash = template.content_hash().unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, TemplateAsset::humanoid().content_hash().unwrap());

        let reparsed = TemplateAsset::from_json(&template.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reparsed.content_hash().unwrap(), hash);

        let edited = template.without_bones(&["toe_left_RST"]);
        assert_ne!(edited.content_hash().unwrap(), hash);
    }
}
