//! Aggregate AI configuration

use serde::{Deserialize, Serialize};

use crate::boss::BossConfig;
use crate::enemy::EnemyConfig;
use crate::error::Result;
use crate::grid::GridConfig;

/// Everything a level needs to set up its AI
///
/// Each section falls back to its defaults when missing, so a TOML
/// table only has to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub grid: GridConfig,
    pub enemy: EnemyConfig,
    pub boss: BossConfig,
}

impl AiConfig {
    /// Check every section, stopping at the first error
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.enemy.validate()?;
        self.boss.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Resolution;
    use crate::steering::BehaviourConfig;

    #[test]
    fn test_defaults_are_valid() {
        AiConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "grid": { "allow_corner_cutting": false },
            "enemy": {
                "attack_chance": 0.25,
                "steering": {
                    "solver": { "resolution": "blend" },
                    "behaviours": [ { "kind": "seek" }, { "kind": "avoidance", "radius": 3.0 } ]
                }
            },
            "boss": { "phase2_threshold": 0.6 }
        }"#;
        let config: AiConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert!(!config.grid.allow_corner_cutting);
        assert_eq!(config.grid.cell_size, 1.0);
        assert_eq!(config.enemy.attack_chance, 0.25);
        assert_eq!(config.enemy.attack_distance, 0.5);
        assert_eq!(config.enemy.steering.solver.resolution, Resolution::Blend);
        assert_eq!(config.enemy.steering.behaviours.len(), 2);
        assert!(matches!(
            config.enemy.steering.behaviours[1],
            BehaviourConfig::Avoidance(ref a) if a.radius == 3.0
        ));
        assert_eq!(config.boss.phase2_threshold, 0.6);
        assert_eq!(config.boss.phase3_threshold, 0.3);
    }

    #[test]
    fn test_validation_reaches_nested_sections() {
        let mut config = AiConfig::default();
        config.boss.volley.min_shots = 0;
        assert!(config.validate().is_err());

        let mut config = AiConfig::default();
        config.enemy.perception.detection_interval = 0.0;
        assert!(config.validate().is_err());
    }
}
