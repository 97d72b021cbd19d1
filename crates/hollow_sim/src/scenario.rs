//! Scenario files
//!
//! A scenario is a TOML document describing one arena run:
//!
//! ```toml
//! tick_rate = 50.0
//! duration = 20.0
//! seed = 7
//! map = [
//!     "#######",
//!     "#.....#",
//!     "#######",
//! ]
//!
//! [player]
//! route = [[1.5, 1.5], [5.5, 1.5]]
//!
//! [[enemies]]
//! position = [4.5, 1.5]
//!
//! [ai.enemy]
//! attack_chance = 0.8
//! ```
//!
//! Map rows are listed top first: `.` is floor, `#` is a wall and a
//! space is void.

use std::path::{Path, PathBuf};

use glam::Vec2;
use hollow_ai::config::AiConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Environment variable naming a scenario file
pub const SCENARIO_ENV: &str = "HOLLOW_SCENARIO";

/// Scenario used when none is given
pub const BUILTIN_SCENARIO: &str = include_str!("../scenarios/arena.toml");

/// The player body and the route it walks in a loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSpec {
    pub route: Vec<Vec2>,
    /// Units per second
    pub speed: f32,
    pub health: f32,
    /// Invulnerability after each hit, in seconds
    pub invulnerability: f32,
}

impl Default for PlayerSpec {
    fn default() -> Self {
        Self {
            route: Vec::new(),
            speed: 3.0,
            health: 100.0,
            invulnerability: 0.5,
        }
    }
}

/// One grunt spawn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySpec {
    pub position: Vec2,
    pub speed: f32,
    /// Damage per landed swing
    pub damage: f32,
    /// A swing lands when the player is this close
    pub reach: f32,
}

impl Default for EnemySpec {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            speed: 2.5,
            damage: 10.0,
            reach: 0.8,
        }
    }
}

/// Boss projectiles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSpec {
    pub speed: f32,
    pub damage: f32,
    /// Hit radius around the player
    pub radius: f32,
    /// Seconds before a projectile fizzles
    pub lifetime: f32,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            speed: 8.0,
            damage: 10.0,
            radius: 0.4,
            lifetime: 3.0,
        }
    }
}

/// The boss spawn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossSpec {
    pub position: Vec2,
    pub speed: f32,
    pub health: f32,
    /// Scripted damage taken every second, walking it through its phases
    pub damage_per_second: f32,
    pub melee_damage: f32,
    pub melee_reach: f32,
    /// Volley corners; when empty the `[ai.boss.volley]` corners are kept
    pub corners: Vec<Vec2>,
    pub projectile: ProjectileSpec,
}

impl Default for BossSpec {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            speed: 2.0,
            health: 300.0,
            damage_per_second: 15.0,
            melee_damage: 20.0,
            melee_reach: 1.75,
            corners: Vec::new(),
            projectile: ProjectileSpec::default(),
        }
    }
}

/// A complete arena run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    /// Ticks per second
    pub tick_rate: f32,
    /// Seconds to simulate
    pub duration: f32,
    pub seed: u64,
    pub cell_size: f32,
    pub map: Vec<String>,
    pub player: PlayerSpec,
    pub enemies: Vec<EnemySpec>,
    pub boss: Option<BossSpec>,
    pub ai: AiConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            tick_rate: 50.0,
            duration: 30.0,
            seed: 0,
            cell_size: 1.0,
            map: Vec::new(),
            player: PlayerSpec::default(),
            enemies: Vec::new(),
            boss: None,
            ai: AiConfig::default(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a scenario
    pub fn from_toml(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// The scenario shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_SCENARIO)
    }

    /// Seconds per tick
    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Number of ticks covering `duration`
    pub fn total_ticks(&self) -> u64 {
        (self.duration * self.tick_rate).round() as u64
    }

    /// Check ranges, then the `[ai]` section
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate <= 0.0 {
            return Err(SimError::scenario("tick_rate must be positive"));
        }
        if self.duration < 0.0 {
            return Err(SimError::scenario("duration must not be negative"));
        }
        if self.cell_size <= 0.0 {
            return Err(SimError::scenario("cell_size must be positive"));
        }
        if self.map.is_empty() {
            return Err(SimError::scenario("map has no rows"));
        }
        if self.player.route.is_empty() {
            return Err(SimError::scenario("player route needs at least one point"));
        }
        if self.player.speed <= 0.0 || self.player.health <= 0.0 {
            return Err(SimError::scenario("player speed and health must be positive"));
        }
        if let Some(boss) = &self.boss {
            if boss.health <= 0.0 {
                return Err(SimError::scenario("boss health must be positive"));
            }
        }
        self.ai.validate()?;
        Ok(())
    }
}

/// Scenario path from the first argument, else the environment
pub fn locate(mut args: impl Iterator<Item = String>, env: Option<String>) -> Option<PathBuf> {
    args.next()
        .or(env)
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenario_is_valid() {
        let scenario = Scenario::builtin().unwrap();
        assert!(!scenario.map.is_empty());
        assert!(!scenario.enemies.is_empty());
        assert!(scenario.boss.is_some());
        assert_eq!(scenario.delta_time(), 0.02);
    }

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_toml(
            r#"
            map = ["....."]
            [player]
            route = [[0.5, 0.5]]
            "#,
        )
        .unwrap();

        assert_eq!(scenario.tick_rate, 50.0);
        assert_eq!(scenario.player.speed, 3.0);
        assert!(scenario.enemies.is_empty());
        assert!(scenario.boss.is_none());
        assert_eq!(scenario.total_ticks(), 1500);
    }

    #[test]
    fn test_ai_overrides_are_applied() {
        let scenario = Scenario::from_toml(
            r#"
            map = ["....."]
            [player]
            route = [[0.5, 0.5]]
            [ai.enemy]
            attack_chance = 0.9
            [ai.boss]
            phase_mode = "ratchet"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.ai.enemy.attack_chance, 0.9);
        assert_eq!(scenario.ai.boss.phase_mode, hollow_ai::boss::PhaseMode::Ratchet);
    }

    #[test]
    fn test_rejects_bad_values() {
        let missing_route = Scenario::from_toml(r#"map = ["..."]"#);
        assert!(matches!(missing_route, Err(SimError::Scenario(_))));

        let bad_ai = Scenario::from_toml(
            r#"
            map = ["..."]
            [player]
            route = [[0.5, 0.5]]
            [ai.enemy]
            attack_chance = 2.0
            "#,
        );
        assert!(matches!(bad_ai, Err(SimError::Ai(_))));

        let not_toml = Scenario::from_toml("map = [");
        assert!(matches!(not_toml, Err(SimError::Parse(_))));
    }

    #[test]
    fn test_locate_prefers_argument() {
        let args = vec!["a.toml".to_string()].into_iter();
        assert_eq!(locate(args, Some("b.toml".into())), Some(PathBuf::from("a.toml")));
        assert_eq!(
            locate(std::iter::empty(), Some("b.toml".into())),
            Some(PathBuf::from("b.toml"))
        );
        assert_eq!(locate(std::iter::empty(), Some(" ".into())), None);
        assert_eq!(locate(std::iter::empty(), None), None);
    }
}
