//! Per-rig animatable properties.

use serde::{Deserialize, Serialize};

use crate::channel::parse_host;
use crate::error::ArmatureError;

/// One of the four FK/IK blend switches. `0.0` is full FK, `1.0` full IK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchProperty {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl SwitchProperty {
    pub const ALL: [SwitchProperty; 4] = [
        SwitchProperty::LeftArm,
        SwitchProperty::RightArm,
        SwitchProperty::LeftLeg,
        SwitchProperty::RightLeg,
    ];

    /// Returns the property's data path on the rig object.
    pub fn data_path(&self) -> &'static str {
        match self {
            SwitchProperty::LeftArm => "fk_ik_left_arm",
            SwitchProperty::RightArm => "fk_ik_right_arm",
            SwitchProperty::LeftLeg => "fk_ik_left_leg",
            SwitchProperty::RightLeg => "fk_ik_right_leg",
        }
    }

    /// Returns the default switch value (arms start in FK, legs in IK).
    pub fn default_value(&self) -> f64 {
        match self {
            SwitchProperty::LeftArm | SwitchProperty::RightArm => 0.0,
            SwitchProperty::LeftLeg | SwitchProperty::RightLeg => 1.0,
        }
    }
}

impl std::str::FromStr for SwitchProperty {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_host(
            "switch property",
            s,
            &[
                ("fk_ik_left_arm", SwitchProperty::LeftArm),
                ("fk_ik_right_arm", SwitchProperty::RightArm),
                ("fk_ik_left_leg", SwitchProperty::LeftLeg),
                ("fk_ik_right_leg", SwitchProperty::RightLeg),
            ],
            "fk_ik_left_arm, fk_ik_right_arm, fk_ik_left_leg, fk_ik_right_leg",
        )
    }
}

/// Production state tag of a rig object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionState {
    /// Not a rig object.
    #[default]
    None,
    /// Untouched template asset.
    Template,
    /// Template instantiated, basic bones editable.
    BasicEdition,
    /// Extra bones being added.
    ExtrasEdition,
    /// Populated and ready to animate.
    Ready,
}

impl ProductionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionState::None => "NONE",
            ProductionState::Template => "TEMPLATE",
            ProductionState::BasicEdition => "BASIC_EDITION",
            ProductionState::ExtrasEdition => "EXTRAS_EDITION",
            ProductionState::Ready => "READY",
        }
    }
}

impl std::fmt::Display for ProductionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animatable properties stored on a rig object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RigProperties {
    #[serde(default = "default_arm")]
    fk_ik_left_arm: f64,
    #[serde(default = "default_arm")]
    fk_ik_right_arm: f64,
    #[serde(default = "default_leg")]
    fk_ik_left_leg: f64,
    #[serde(default = "default_leg")]
    fk_ik_right_leg: f64,
    #[serde(default)]
    pub production_state: ProductionState,
}

fn default_arm() -> f64 {
    SwitchProperty::LeftArm.default_value()
}

fn default_leg() -> f64 {
    SwitchProperty::LeftLeg.default_value()
}

impl Default for RigProperties {
    fn default() -> Self {
        Self {
            fk_ik_left_arm: default_arm(),
            fk_ik_right_arm: default_arm(),
            fk_ik_left_leg: default_leg(),
            fk_ik_right_leg: default_leg(),
            production_state: ProductionState::None,
        }
    }
}

impl RigProperties {
    /// Returns the current value of a switch.
    pub fn switch(&self, property: SwitchProperty) -> f64 {
        match property {
            SwitchProperty::LeftArm => self.fk_ik_left_arm,
            SwitchProperty::RightArm => self.fk_ik_right_arm,
            SwitchProperty::LeftLeg => self.fk_ik_left_leg,
            SwitchProperty::RightLeg => self.fk_ik_right_leg,
        }
    }

    /// Sets a switch, clamping the value to `[0, 1]`.
    pub fn set_switch(&mut self, property: SwitchProperty, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let slot = match property {
            SwitchProperty::LeftArm => &mut self.fk_ik_left_arm,
            SwitchProperty::RightArm => &mut self.fk_ik_right_arm,
            SwitchProperty::LeftLeg => &mut self.fk_ik_left_leg,
            SwitchProperty::RightLeg => &mut self.fk_ik_right_leg,
        };
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_defaults() {
        let props = RigProperties::default();
        assert_eq!(props.switch(SwitchProperty::LeftArm), 0.0);
        assert_eq!(props.switch(SwitchProperty::RightArm), 0.0);
        assert_eq!(props.switch(SwitchProperty::LeftLeg), 1.0);
        assert_eq!(props.switch(SwitchProperty::RightLeg), 1.0);
        assert_eq!(props.production_state, ProductionState::None);
    }

    #[test]
    fn test_switch_is_clamped() {
        let mut props = RigProperties::default();
        props.set_switch(SwitchProperty::LeftArm, 1.7);
        assert_eq!(props.switch(SwitchProperty::LeftArm), 1.0);
        props.set_switch(SwitchProperty::LeftArm, -0.2);
        assert_eq!(props.switch(SwitchProperty::LeftArm), 0.0);
        props.set_switch(SwitchProperty::LeftArm, 0.4);
        assert_eq!(props.switch(SwitchProperty::LeftArm), 0.4);
    }

    #[test]
    fn test_data_paths() {
        for property in SwitchProperty::ALL {
            let parsed: SwitchProperty = property.data_path().parse().unwrap();
            assert_eq!(parsed, property);
        }
        assert_eq!(
            serde_json::to_string(&ProductionState::BasicEdition).unwrap(),
            "\"BASIC_EDITION\""
        );
    }
}
