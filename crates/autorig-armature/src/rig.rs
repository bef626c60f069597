//! A rig instance: one armature plus the curve objects of its collection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::armature::Armature;
use crate::curve::Curve;
use crate::error::{ArmatureError, ArmatureResult};
use crate::template::TemplateAsset;

/// An instantiated rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RigInstance {
    pub armature: Armature,
    #[serde(default)]
    pub curves: BTreeMap<String, Curve>,
}

impl RigInstance {
    /// Instantiates a template asset.
    ///
    /// Template bones are not deletable. The bone records are captured as the
    /// template snapshot that cleaning restores.
    pub fn from_template(template: &TemplateAsset) -> ArmatureResult<Self> {
        let mut armature = Armature::new(template.armature.clone());
        armature.properties_mut().production_state = template.production_state;

        for record in &template.bones {
            let id = armature.add_bone(&record.name, record.head, record.tail)?;
            let bone = armature.bone_mut(id)?;
            bone.roll = record.roll;
            bone.layer = record.layer;
            bone.inherit_rotation = record.inherit_rotation;
            bone.deletable = false;
        }
        for record in &template.bones {
            if let Some(parent) = &record.parent {
                let id = armature.bone_id(&record.name)?;
                let parent = armature.bone_id(parent)?;
                armature.set_parent(id, Some(parent), record.connected)?;
            }
        }
        armature.capture_template();

        let mut curves = BTreeMap::new();
        for record in &template.curves {
            if curves.contains_key(&record.name) || armature.contains(&record.name) {
                return Err(ArmatureError::name_collision(record.name.clone()));
            }
            curves.insert(
                record.name.clone(),
                Curve::new(record.name.clone(), record.points.clone()),
            );
        }

        tracing::debug!(
            armature = armature.name(),
            bones = armature.bone_count(),
            curves = curves.len(),
            "Instantiated template"
        );
        Ok(Self { armature, curves })
    }

    /// Looks up a curve object.
    pub fn curve(&self, name: &str) -> ArmatureResult<&Curve> {
        self.curves
            .get(name)
            .ok_or_else(|| ArmatureError::missing_object(name))
    }

    /// Looks up a curve object for editing.
    pub fn curve_mut(&mut self, name: &str) -> ArmatureResult<&mut Curve> {
        self.curves
            .get_mut(name)
            .ok_or_else(|| ArmatureError::missing_object(name))
    }

    /// Parses a rig from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the rig to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::ProductionState;

    #[test]
    fn test_from_template() {
        let rig = RigInstance::from_template(&TemplateAsset::humanoid()).unwrap();
        let hand = rig.armature.bone_named("hand_left_RST").unwrap();
        let forearm = rig.armature.bone_id("forearm_left_AUX").unwrap();
        assert_eq!(hand.parent, Some(forearm));
        assert!(hand.connected);
        assert!(!hand.deletable);
        assert!(rig.armature.has_template());
        assert_eq!(
            rig.armature.properties().production_state,
            ProductionState::Template
        );
        assert!(rig.curve("spine_SPL").is_ok());
        assert_eq!(
            rig.curve("neck_SPL").unwrap_err(),
            ArmatureError::missing_object("neck_SPL")
        );
    }

    #[test]
    fn test_missing_parent_is_reported() {
        let mut template = TemplateAsset::humanoid();
        template.bones.retain(|b| b.name != "center_HDL");
        let err = RigInstance::from_template(&template).unwrap_err();
        assert_eq!(err, ArmatureError::missing_bone("center_HDL"));
    }

    #[test]
    fn test_json_round_trip() {
        let rig = RigInstance::from_template(&TemplateAsset::humanoid()).unwrap();
        let json = rig.to_json_pretty().unwrap();
        assert_eq!(RigInstance::from_json(&json).unwrap(), rig);
    }
}
