//! Data-driven round tuning
//!
//! Static tunables supplied before a round starts. Missing JSON fields fall
//! back to the shipped defaults.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{CatchError, Result};

/// A template a falling object is instantiated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    /// Node name given to spawned instances
    pub name: String,
    /// Radius of the solid collision sphere
    pub radius: f32,
}

impl Archetype {
    pub fn new(name: impl Into<String>, radius: f32) -> Self {
        Self {
            name: name.into(),
            radius,
        }
    }
}

/// Round tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Run seed for reproducibility
    pub seed: u64,

    // === Spawning ===
    /// The two archetypes chosen between 50/50
    pub archetypes: [Archetype; 2],
    /// Spawn area center. `None` means the round cannot start.
    pub spawn_origin: Option<Vec3>,
    /// Height above the origin at which objects appear
    pub spawn_height: f32,
    /// Radius of the horizontal disk objects appear in
    pub spawn_radius: f32,
    /// Seconds between spawns
    pub spawn_interval: f32,

    // === Hands ===
    /// Radius of each hand's detector sphere
    pub catch_radius: f32,
    /// Explicit anchor name for the left hand (auto-detect when unset)
    pub left_anchor: Option<String>,
    /// Explicit anchor name for the right hand (auto-detect when unset)
    pub right_anchor: Option<String>,

    // === World ===
    /// Gravity along Y (m/s²)
    pub gravity: f32,
    /// Height of the floor plane
    pub floor_height: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            seed: 0x5eed_cafe,

            archetypes: [Archetype::new("Banana", 0.06), Archetype::new("Burger", 0.08)],
            spawn_origin: Some(Vec3::ZERO),
            spawn_height: 3.0,
            spawn_radius: 1.5,
            spawn_interval: 2.0,

            catch_radius: 0.08,
            left_anchor: None,
            right_anchor: None,

            gravity: -9.81,
            floor_height: 0.0,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<()> {
        positive("spawn_interval", self.spawn_interval)?;
        positive("spawn_height", self.spawn_height)?;
        positive("catch_radius", self.catch_radius)?;
        finite("gravity", self.gravity)?;
        finite("floor_height", self.floor_height)?;

        if !self.spawn_radius.is_finite() || self.spawn_radius < 0.0 {
            return Err(CatchError::invalid(
                "spawn_radius",
                format!("must be zero or positive, got {}", self.spawn_radius),
            ));
        }

        if let Some(origin) = self.spawn_origin {
            if !origin.is_finite() {
                return Err(CatchError::invalid("spawn_origin", "must be finite"));
            }
        }

        for archetype in &self.archetypes {
            if archetype.name.trim().is_empty() {
                return Err(CatchError::invalid("archetypes", "name must not be empty"));
            }
            positive("archetypes", archetype.radius)?;
        }

        for (field, anchor) in [("left_anchor", &self.left_anchor), ("right_anchor", &self.right_anchor)] {
            if anchor.as_deref().is_some_and(|name| name.trim().is_empty()) {
                return Err(CatchError::invalid(field, "must not be blank when set"));
            }
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CatchError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn finite(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CatchError::invalid(field, format!("must be finite, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "spawn_interval": 0.5, "left_anchor": "palm" }"#).unwrap();
        assert_eq!(tuning.spawn_interval, 0.5);
        assert_eq!(tuning.left_anchor.as_deref(), Some("palm"));
        assert_eq!(tuning.spawn_radius, 1.5);
        assert_eq!(tuning.archetypes[1].name, "Burger");
    }

    #[test]
    fn test_null_origin_is_allowed() {
        let tuning = Tuning::from_json(r#"{ "spawn_origin": null }"#).unwrap();
        assert!(tuning.spawn_origin.is_none());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Tuning::from_json(r#"{ "spawn_interval": 0.0 }"#).unwrap_err();
        assert!(matches!(err, CatchError::InvalidTuning { field: "spawn_interval", .. }));
    }

    #[test]
    fn test_rejects_blank_override() {
        let tuning = Tuning {
            right_anchor: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            tuning.validate(),
            Err(CatchError::InvalidTuning { field: "right_anchor", .. })
        ));
    }

    #[test]
    fn test_rejects_empty_archetype_name() {
        let mut tuning = Tuning::default();
        tuning.archetypes[0].name.clear();
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_values() {
        let tuning = Tuning {
            seed: 7,
            spawn_origin: Some(Vec3::new(0.5, 1.0, -2.0)),
            ..Default::default()
        };
        let back = Tuning::from_json(&tuning.to_json().unwrap()).unwrap();
        assert_eq!(back.seed, 7);
        assert_eq!(back.spawn_origin, Some(Vec3::new(0.5, 1.0, -2.0)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Tuning::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CatchError::Io(_)));
    }
}
