//! Bone roles and role-suffixed names.
//!
//! The host encodes a bone's role in its name (`_RST`, `_HDL`, `_AUX`). Inside
//! this crate the role is carried as [`BoneRole`] and names are built from a
//! stem plus a role, so related names are derived structurally rather than by
//! slicing strings.

use serde::{Deserialize, Serialize};

/// Suffix used by curve guide objects.
pub const CURVE_SUFFIX: &str = "_SPL";

/// Role of a bone in the rig.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BoneRole {
    /// Result bone, fully driven by constraints and drivers (`_RST`).
    Result,
    /// Animator-facing handle (`_HDL`).
    Handle,
    /// Hidden mechanism bone (`_AUX`).
    Auxiliary,
    /// A name without a recognized role suffix.
    #[default]
    Other,
}

impl BoneRole {
    /// Returns the name suffix for this role.
    pub fn suffix(&self) -> &'static str {
        match self {
            BoneRole::Result => "_RST",
            BoneRole::Handle => "_HDL",
            BoneRole::Auxiliary => "_AUX",
            BoneRole::Other => "",
        }
    }

    /// Returns all roles that carry a suffix.
    pub fn suffixed() -> &'static [BoneRole] {
        &[BoneRole::Result, BoneRole::Handle, BoneRole::Auxiliary]
    }
}

/// A bone name split into stem and role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneName {
    stem: String,
    role: BoneRole,
}

impl BoneName {
    /// Creates a name from a stem and a role.
    pub fn new(stem: impl Into<String>, role: BoneRole) -> Self {
        Self {
            stem: stem.into(),
            role,
        }
    }

    /// Parses a host name, splitting off a known role suffix.
    pub fn parse(name: &str) -> Self {
        for role in BoneRole::suffixed() {
            if let Some(stem) = name.strip_suffix(role.suffix()) {
                if !stem.is_empty() {
                    return Self::new(stem, *role);
                }
            }
        }
        Self::new(name, BoneRole::Other)
    }

    /// Returns the name without its role suffix.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Returns the role.
    pub fn role(&self) -> BoneRole {
        self.role
    }

    /// Returns a new name with `extra` appended to the stem.
    pub fn extend(&self, extra: &str) -> Self {
        Self::new(format!("{}{}", self.stem, extra), self.role)
    }

    /// Returns the same stem with another role.
    pub fn with_role(&self, role: BoneRole) -> Self {
        Self::new(self.stem.clone(), role)
    }
}

impl std::fmt::Display for BoneName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.stem, self.role.suffix())
    }
}

impl From<&str> for BoneName {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_suffixes() {
        let name = BoneName::parse("forearm_left_AUX");
        assert_eq!(name.stem(), "forearm_left");
        assert_eq!(name.role(), BoneRole::Auxiliary);

        assert_eq!(BoneName::parse("center_HDL").role(), BoneRole::Handle);
        assert_eq!(BoneName::parse("spine01_RST").stem(), "spine01");

        let plain = BoneName::parse("root");
        assert_eq!(plain.role(), BoneRole::Other);
        assert_eq!(plain.to_string(), "root");

        // A bare suffix is not a role-suffixed name.
        assert_eq!(BoneName::parse("_RST").role(), BoneRole::Other);
    }

    #[test]
    fn test_derived_names() {
        let hand = BoneName::parse("hand_left_RST");
        let torsion = hand.extend("_torsion").with_role(BoneRole::Auxiliary);
        assert_eq!(torsion.to_string(), "hand_left_torsion_AUX");
        assert_eq!(torsion.extend("_D").to_string(), "hand_left_torsion_D_AUX");

        let part = BoneName::parse("forearm_left_AUX")
            .extend("_part")
            .with_role(BoneRole::Result);
        assert_eq!(part.extend("2").to_string(), "forearm_left_part2_RST");
    }

    #[test]
    fn test_names_sort_by_stem_then_role() {
        let mut names = vec![
            BoneName::parse("hand_left_AUX"),
            BoneName::parse("arm_left_HDL"),
            BoneName::parse("hand_left_RST"),
            BoneName::parse("hand_left_HDL"),
        ];
        names.sort();
        let sorted: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            sorted,
            vec!["arm_left_HDL", "hand_left_RST", "hand_left_HDL", "hand_left_AUX"]
        );
    }
}
