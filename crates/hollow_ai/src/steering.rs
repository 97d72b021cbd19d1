//! Context steering behaviours
//!
//! Each behaviour reads the agent's [`SensedWorld`] and raises danger
//! or interest in the shared [`ContextMap`]. Behaviours only ever raise
//! a slot (by max, or by adding to interest), so the order they run in
//! does not let one erase another's opinion.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::{ContextMap, ContextSolver, SolverConfig};
use crate::direction::Directions;
use crate::error::{AiError, Result};
use crate::perception::SensedWorld;

/// A contributor to the danger/interest map
pub trait SteeringBehaviour: Send {
    fn name(&self) -> &'static str;
    fn evaluate(&mut self, map: &mut ContextMap, sensed: &SensedWorld, directions: &Directions);
}

fn require_positive(what: &str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(AiError::config(format!("{} must be positive, got {}", what, value)))
    }
}

/// Obstacle avoidance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Obstacles further than this are ignored
    pub radius: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self { radius: 2.0 }
    }
}

/// Danger toward nearby obstacles, stronger the closer they are
///
/// Contribution per slot is `(1 - d / R) * dot(dir_to_obstacle, dir)`,
/// folded by max.
#[derive(Debug, Clone)]
pub struct ObstacleAvoidance {
    pub config: AvoidanceConfig,
}

impl ObstacleAvoidance {
    /// Avoidance with the given tuning
    pub fn new(config: AvoidanceConfig) -> Self {
        Self { config }
    }
}

impl SteeringBehaviour for ObstacleAvoidance {
    fn name(&self) -> &'static str {
        "avoidance"
    }

    fn evaluate(&mut self, map: &mut ContextMap, sensed: &SensedWorld, directions: &Directions) {
        let radius = self.config.radius;
        for obstacle in &sensed.obstacles {
            let closest = obstacle.closest_point(sensed.position);
            let distance = closest.distance(sensed.position);
            if distance > radius {
                continue;
            }

            // Inside the shape the closest point is our own position
            let Some(to_obstacle) = (closest - sensed.position)
                .try_normalize()
                .or_else(|| (obstacle.center() - sensed.position).try_normalize())
            else {
                continue;
            };

            let weight = (1.0 - distance / radius).clamp(0.0, 1.0);
            for (i, dir) in directions.iter().enumerate() {
                map.raise_danger(i, weight * to_obstacle.dot(dir));
            }
        }
    }
}

/// Separation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    pub detection_radius: f32,
    /// How strongly allies push each other apart
    pub strength: f32,
    /// Exponent for distance falloff (higher = sharper repulsion)
    pub falloff: f32,
    /// Preferred alignment with the ally direction (-1 = straight away)
    pub angle_dot: f32,
    /// Left/right bias for smoother side-steps
    pub side_bias: f32,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            detection_radius: 2.5,
            strength: 1.5,
            falloff: 3.0,
            angle_dot: -0.65,
            side_bias: 1.0,
        }
    }
}

/// Keeps allies from bunching up
#[derive(Debug, Clone)]
pub struct Separation {
    pub config: SeparationConfig,
}

impl Separation {
    /// Separation with the given tuning
    pub fn new(config: SeparationConfig) -> Self {
        Self { config }
    }
}

impl SteeringBehaviour for Separation {
    fn name(&self) -> &'static str {
        "separation"
    }

    fn evaluate(&mut self, map: &mut ContextMap, sensed: &SensedWorld, directions: &Directions) {
        let cfg = &self.config;
        for &ally in &sensed.neighbours {
            let offset = ally - sensed.position;
            let distance = offset.length();
            if distance < 0.01 || distance > cfg.detection_radius {
                continue;
            }

            let to_ally = offset / distance;
            let proximity =
                (1.0 - (distance / cfg.detection_radius).clamp(0.0, 1.0)).powf(cfg.falloff);

            for (i, dir) in directions.iter().enumerate() {
                let dot = to_ally.dot(dir);
                let shape = 1.0 - (dot - cfg.angle_dot).abs();
                let side = cfg.side_bias * 0.1 * dot;
                let avoidance = ((shape + side) * proximity * cfg.strength).clamp(0.0, 1.0);
                map.raise_danger(i, avoidance);
            }
        }
    }
}

/// Strafe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrafeConfig {
    /// Orbit distance around the target
    pub preferred_distance: f32,
    /// Random spread applied once to the orbit distance
    pub distance_jitter: f32,
    pub strength: f32,
    /// Strafing starts below this fraction of the orbit distance
    pub start_ratio: f32,
    /// Power-curve exponent for the ramp-up
    pub sharpness: f32,
}

impl Default for StrafeConfig {
    fn default() -> Self {
        Self {
            preferred_distance: 2.5,
            distance_jitter: 0.5,
            strength: 1.0,
            start_ratio: 0.7,
            sharpness: 3.0,
        }
    }
}

/// Which way an agent circles its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrafeSide {
    Left,
    Right,
}

impl StrafeSide {
    fn sign(self) -> f32 {
        match self {
            StrafeSide::Left => 1.0,
            StrafeSide::Right => -1.0,
        }
    }
}

/// Sidestep around the target when it gets close
#[derive(Debug, Clone)]
pub struct Strafe {
    pub config: StrafeConfig,
    preferred_distance: f32,
    side: StrafeSide,
}

impl Strafe {
    /// Fixed orbit distance and side
    pub fn new(config: StrafeConfig, side: StrafeSide) -> Self {
        Self {
            preferred_distance: config.preferred_distance,
            config,
            side,
        }
    }

    /// Jitter the orbit distance and pick a side, once per instance
    pub fn randomized(config: StrafeConfig, rng: &mut impl Rng) -> Self {
        let jitter = config.distance_jitter.max(0.0);
        let offset = if jitter > 0.0 {
            rng.gen_range(-jitter..jitter)
        } else {
            0.0
        };
        let side = if rng.gen_bool(0.5) {
            StrafeSide::Left
        } else {
            StrafeSide::Right
        };

        Self {
            preferred_distance: (config.preferred_distance + offset).max(0.1),
            config,
            side,
        }
    }

    /// Distance this instance tries to keep, after jitter
    pub fn preferred_distance(&self) -> f32 {
        self.preferred_distance
    }

    /// Side picked at construction
    pub fn side(&self) -> StrafeSide {
        self.side
    }
}

impl SteeringBehaviour for Strafe {
    fn name(&self) -> &'static str {
        "strafe"
    }

    fn evaluate(&mut self, map: &mut ContextMap, sensed: &SensedWorld, directions: &Directions) {
        let Some(target) = sensed.current_target_position() else {
            return;
        };

        let offset = target - sensed.position;
        let Some(to_target) = offset.try_normalize() else {
            return;
        };

        let ratio = (offset.length() / self.preferred_distance).clamp(0.0, 1.0);
        if ratio > self.config.start_ratio {
            return;
        }

        let weight = (1.0 - ratio / self.config.start_ratio).powf(self.config.sharpness);
        let side_dir = (to_target * self.side.sign()).perp();

        for (i, dir) in directions.iter().enumerate() {
            let value = side_dir.dot(dir).max(0.0) * self.config.strength * weight;
            map.raise_interest(i, value);
        }
    }
}

/// Seek settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    /// A remembered position closer than this is considered reached
    pub reach_threshold: f32,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            reach_threshold: 0.5,
        }
    }
}

/// Interest toward the target, or where it was last seen
#[derive(Debug, Clone)]
pub struct Seek {
    pub config: SeekConfig,
}

impl Seek {
    pub fn new(config: SeekConfig) -> Self {
        Self { config }
    }
}

impl SteeringBehaviour for Seek {
    fn name(&self) -> &'static str {
        "seek"
    }

    fn evaluate(&mut self, map: &mut ContextMap, sensed: &SensedWorld, directions: &Directions) {
        let Some(target) = sensed.current_target_position() else {
            return;
        };

        let offset = target - sensed.position;
        if !sensed.is_current_target_visible() && offset.length() < self.config.reach_threshold {
            return;
        }

        let Some(to_target) = offset.try_normalize() else {
            return;
        };
        for (i, dir) in directions.iter().enumerate() {
            map.raise_interest(i, to_target.dot(dir).max(0.0));
        }
    }
}

/// Path following settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFollowingConfig {
    /// Interest added toward the waypoint slot
    pub bonus: f32,
}

impl Default for PathFollowingConfig {
    fn default() -> Self {
        Self { bonus: 1.5 }
    }
}

/// Boosts the slot pointing at the current waypoint
#[derive(Debug, Clone)]
pub struct PathFollowing {
    pub config: PathFollowingConfig,
}

impl PathFollowing {
    /// Path following with the given waypoint bonus
    pub fn new(config: PathFollowingConfig) -> Self {
        Self { config }
    }
}

impl SteeringBehaviour for PathFollowing {
    fn name(&self) -> &'static str {
        "path_following"
    }

    fn evaluate(&mut self, map: &mut ContextMap, sensed: &SensedWorld, directions: &Directions) {
        let Some(waypoint) = sensed.current_waypoint else {
            return;
        };
        if let Some(slot) = directions.closest_index(waypoint - sensed.position) {
            map.add_interest(slot, self.config.bonus);
        }
    }
}

/// Serializable description of a behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviourConfig {
    Avoidance(AvoidanceConfig),
    Separation(SeparationConfig),
    Strafe(StrafeConfig),
    Seek(SeekConfig),
    PathFollowing(PathFollowingConfig),
}

impl BehaviourConfig {
    /// Check the tuning of this behaviour
    pub fn validate(&self) -> Result<()> {
        match self {
            BehaviourConfig::Avoidance(c) => require_positive("avoidance radius", c.radius),
            BehaviourConfig::Separation(c) => {
                require_positive("separation radius", c.detection_radius)?;
                require_positive("separation falloff", c.falloff)
            }
            BehaviourConfig::Strafe(c) => {
                require_positive("strafe preferred_distance", c.preferred_distance)?;
                require_positive("strafe sharpness", c.sharpness)?;
                if !(c.start_ratio > 0.0 && c.start_ratio <= 1.0) {
                    return Err(AiError::config(format!(
                        "strafe start_ratio must be in (0, 1], got {}",
                        c.start_ratio
                    )));
                }
                Ok(())
            }
            BehaviourConfig::Seek(c) => {
                if c.reach_threshold < 0.0 {
                    return Err(AiError::config("seek reach_threshold must not be negative"));
                }
                Ok(())
            }
            BehaviourConfig::PathFollowing(c) => require_positive("path bonus", c.bonus),
        }
    }

    /// Instantiate the behaviour; strafe draws its jitter from `rng`
    pub fn build(&self, rng: &mut impl Rng) -> Box<dyn SteeringBehaviour> {
        match self {
            BehaviourConfig::Avoidance(c) => Box::new(ObstacleAvoidance::new(c.clone())),
            BehaviourConfig::Separation(c) => Box::new(Separation::new(c.clone())),
            BehaviourConfig::Strafe(c) => Box::new(Strafe::randomized(c.clone(), rng)),
            BehaviourConfig::Seek(c) => Box::new(Seek::new(c.clone())),
            BehaviourConfig::PathFollowing(c) => Box::new(PathFollowing::new(c.clone())),
        }
    }
}

/// Steering pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Number of discrete directions
    pub directions: usize,
    pub solver: SolverConfig,
    pub behaviours: Vec<BehaviourConfig>,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            directions: 8,
            solver: SolverConfig::default(),
            behaviours: vec![
                BehaviourConfig::Seek(SeekConfig::default()),
                BehaviourConfig::Avoidance(AvoidanceConfig::default()),
                BehaviourConfig::Separation(SeparationConfig::default()),
                BehaviourConfig::Strafe(StrafeConfig::default()),
                BehaviourConfig::PathFollowing(PathFollowingConfig::default()),
            ],
        }
    }
}

impl SteeringConfig {
    /// Need at least one direction
    pub fn validate(&self) -> Result<()> {
        if self.directions == 0 {
            return Err(AiError::EmptyDirectionTable);
        }
        self.solver.validate()?;
        self.behaviours.iter().try_for_each(BehaviourConfig::validate)
    }
}

/// Behaviours, solver and map for one agent
pub struct ContextSteering {
    behaviours: Vec<Box<dyn SteeringBehaviour>>,
    solver: ContextSolver,
    directions: Directions,
    map: ContextMap,
}

impl ContextSteering {
    /// Pipeline with no behaviours
    pub fn new(directions: Directions, solver: ContextSolver) -> Self {
        Self {
            map: ContextMap::for_directions(&directions),
            behaviours: Vec::new(),
            solver,
            directions,
        }
    }

    /// Eight-way pipeline with the default solver
    pub fn eight_way() -> Self {
        Self::new(Directions::eight().clone(), ContextSolver::default())
    }

    /// Validate `config` and build every listed behaviour
    pub fn from_config(config: &SteeringConfig, rng: &mut impl Rng) -> Result<Self> {
        config.validate()?;
        let directions = if config.directions == 8 {
            Directions::eight().clone()
        } else {
            Directions::new(config.directions)?
        };

        let mut steering = Self::new(directions, ContextSolver::new(config.solver.clone()));
        for behaviour in &config.behaviours {
            steering.add_behaviour(behaviour.build(rng));
        }
        Ok(steering)
    }

    /// Add a behaviour
    pub fn with_behaviour(mut self, behaviour: impl SteeringBehaviour + 'static) -> Self {
        self.behaviours.push(Box::new(behaviour));
        self
    }

    pub fn add_behaviour(&mut self, behaviour: Box<dyn SteeringBehaviour>) {
        self.behaviours.push(behaviour);
    }

    /// Number of behaviours
    pub fn behaviour_count(&self) -> usize {
        self.behaviours.len()
    }

    pub fn directions(&self) -> &Directions {
        &self.directions
    }

    /// Map produced by the most recent decision
    pub fn last_map(&self) -> &ContextMap {
        &self.map
    }

    /// Rebuild the map from scratch and pick a direction
    pub fn decide(&mut self, sensed: &SensedWorld) -> Vec2 {
        self.map.clear();

        for behaviour in &mut self.behaviours {
            #[cfg(debug_assertions)]
            let before = self.map.clone();

            behaviour.evaluate(&mut self.map, sensed, &self.directions);

            #[cfg(debug_assertions)]
            if let Some(slot) = self.map.first_lowered_slot(&before) {
                panic!(
                    "steering behaviour '{}' lowered slot {} written earlier in the same pass",
                    behaviour.name(),
                    slot
                );
            }
        }

        log::trace!(
            "Context map danger={:?} interest={:?}",
            self.map.danger(),
            self.map.interest()
        );
        self.solver.solve(&self.map, &self.directions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::EntityId;
    use crate::world::Obstacle;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const N: usize = 0;
    const NE: usize = 1;
    const E: usize = 2;
    const S: usize = 4;
    const W: usize = 6;

    fn sensed_with_target(target: Vec2) -> SensedWorld {
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        sensed.begin_detection();
        sensed.observe_target(EntityId::from_index(1), target);
        sensed.end_detection();
        sensed.ensure_current_target();
        sensed
    }

    fn run(behaviour: &mut dyn SteeringBehaviour, sensed: &SensedWorld) -> ContextMap {
        let dirs = Directions::eight();
        let mut map = ContextMap::for_directions(dirs);
        behaviour.evaluate(&mut map, sensed, dirs);
        map
    }

    #[test]
    fn test_avoidance_obstacle_north_at_half_radius() {
        let radius = 2.0;
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        sensed.obstacles.push(Obstacle::circle(Vec2::new(0.0, radius / 2.0), 0.0));

        let mut avoidance = ObstacleAvoidance::new(AvoidanceConfig { radius });
        let map = run(&mut avoidance, &sensed);

        assert_abs_diff_eq!(map.danger()[N], 0.5, epsilon = 1e-5);
        for i in 1..8 {
            assert!(map.danger()[i] < map.danger()[N]);
        }
        assert_abs_diff_eq!(map.danger()[NE], 0.5 * std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-5);
        assert_eq!(map.danger()[S], 0.0);
    }

    #[test]
    fn test_avoidance_ignores_far_obstacles() {
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        sensed.obstacles.push(Obstacle::circle(Vec2::new(5.0, 0.0), 0.5));
        let map = run(&mut ObstacleAvoidance::new(AvoidanceConfig::default()), &sensed);
        assert!(map.danger().iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_avoidance_keeps_max_per_slot() {
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        sensed.obstacles.push(Obstacle::circle(Vec2::new(0.0, 1.5), 0.0));
        sensed.obstacles.push(Obstacle::circle(Vec2::new(0.0, 0.5), 0.0));
        let map = run(&mut ObstacleAvoidance::new(AvoidanceConfig { radius: 2.0 }), &sensed);
        assert_abs_diff_eq!(map.danger()[N], 0.75, epsilon = 1e-5);
    }

    #[test]
    fn test_separation_pushes_away_from_ally() {
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        sensed.neighbours.push(Vec2::new(0.5, 0.0));
        let map = run(&mut Separation::new(SeparationConfig::default()), &sensed);

        // Something is flagged, and the slots are clamped
        assert!(map.danger().iter().any(|d| *d > 0.0));
        assert!(map.danger().iter().all(|d| (0.0..=1.0).contains(d)));
        // Heading straight into the ally is worse than heading away
        assert!(map.danger()[W] > map.danger()[E] || map.danger()[E] == 0.0);
    }

    #[test]
    fn test_separation_ignores_self_and_far() {
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        sensed.neighbours.push(Vec2::ZERO);
        sensed.neighbours.push(Vec2::new(10.0, 0.0));
        let map = run(&mut Separation::new(SeparationConfig::default()), &sensed);
        assert!(map.danger().iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_strafe_only_when_close() {
        let config = StrafeConfig::default();
        let mut strafe = Strafe::new(config, StrafeSide::Left);

        // 2.5 orbit, start at 0.7 => only closer than 1.75
        let far = run(&mut strafe, &sensed_with_target(Vec2::new(0.0, 2.0)));
        assert!(far.interest().iter().all(|i| *i == 0.0));

        let near = run(&mut strafe, &sensed_with_target(Vec2::new(0.0, 0.5)));
        // Target north, left side = perpendicular of north = west
        assert!(near.interest()[W] > 0.0);
        assert_eq!(near.interest()[E], 0.0);
    }

    #[test]
    fn test_strafe_ramps_up_as_distance_shrinks() {
        let mut strafe = Strafe::new(StrafeConfig::default(), StrafeSide::Right);
        let mid = run(&mut strafe, &sensed_with_target(Vec2::new(0.0, 1.2)));
        let close = run(&mut strafe, &sensed_with_target(Vec2::new(0.0, 0.3)));
        assert!(close.interest()[E] > mid.interest()[E]);
        assert!(mid.interest()[E] > 0.0);
    }

    #[test]
    fn test_strafe_randomized_is_stable_per_instance() {
        let mut rng = StdRng::seed_from_u64(7);
        let strafe = Strafe::randomized(StrafeConfig::default(), &mut rng);
        let d = strafe.preferred_distance();
        assert!((2.0..3.0).contains(&d));
        let side = strafe.side();

        let mut strafe = strafe;
        let _ = run(&mut strafe, &sensed_with_target(Vec2::new(0.0, 0.5)));
        assert_eq!(strafe.preferred_distance(), d);
        assert_eq!(strafe.side(), side);
    }

    #[test]
    fn test_seek_points_at_target() {
        let map = run(
            &mut Seek::new(SeekConfig::default()),
            &sensed_with_target(Vec2::new(4.0, 0.0)),
        );
        assert_abs_diff_eq!(map.interest()[E], 1.0, epsilon = 1e-5);
        assert_eq!(map.interest()[W], 0.0);
    }

    #[test]
    fn test_seek_stops_at_reached_memory() {
        let mut sensed = sensed_with_target(Vec2::new(0.2, 0.0));
        sensed.begin_detection();
        sensed.end_detection();
        let map = run(&mut Seek::new(SeekConfig::default()), &sensed);
        assert!(map.interest().iter().all(|i| *i == 0.0));

        // The memory is left to expire on its own timer
        assert_eq!(sensed.last_known_target_position(), Some(Vec2::new(0.2, 0.0)));
        assert!(sensed.current_target().is_some());
    }

    #[test]
    fn test_path_following_bonus() {
        let mut sensed = SensedWorld::new(Vec2::ZERO);
        let mut follow = PathFollowing::new(PathFollowingConfig::default());

        let map = run(&mut follow, &sensed);
        assert!(map.interest().iter().all(|i| *i == 0.0));

        sensed.current_waypoint = Some(Vec2::new(0.0, -3.0));
        let map = run(&mut follow, &sensed);
        assert_abs_diff_eq!(map.interest()[S], 1.5);
        assert_eq!(map.interest().iter().filter(|i| **i > 0.0).count(), 1);
    }

    #[test]
    fn test_pipeline_steers_around_obstacle() {
        let mut steering = ContextSteering::eight_way()
            .with_behaviour(Seek::new(SeekConfig::default()))
            .with_behaviour(ObstacleAvoidance::new(AvoidanceConfig { radius: 2.0 }));

        let mut sensed = sensed_with_target(Vec2::new(0.0, 5.0));
        assert_eq!(steering.decide(&sensed), Directions::eight()[N]);

        sensed.obstacles.push(Obstacle::circle(Vec2::new(0.0, 0.6), 0.0));
        let dir = steering.decide(&sensed);
        assert_ne!(dir, Directions::eight()[N]);
        assert_ne!(dir, Vec2::ZERO);
        assert!(steering.last_map().danger()[N] > 0.5);
    }

    #[test]
    fn test_pipeline_rebuilds_each_tick() {
        let mut steering =
            ContextSteering::eight_way().with_behaviour(Seek::new(SeekConfig::default()));
        steering.decide(&sensed_with_target(Vec2::new(3.0, 0.0)));
        let dir = steering.decide(&sensed_with_target(Vec2::new(-3.0, 0.0)));
        assert_eq!(dir, Directions::eight()[W]);
        assert_eq!(steering.last_map().interest()[E], 0.0);
    }

    struct Shrinker;

    impl SteeringBehaviour for Shrinker {
        fn name(&self) -> &'static str {
            "shrinker"
        }

        fn evaluate(&mut self, map: &mut ContextMap, _: &SensedWorld, _: &Directions) {
            map.clear();
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "lowered slot")]
    fn test_pipeline_rejects_lowering_behaviour() {
        let mut steering = ContextSteering::eight_way()
            .with_behaviour(Seek::new(SeekConfig::default()))
            .with_behaviour(Shrinker);
        steering.decide(&sensed_with_target(Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn test_from_config() {
        let mut rng = StdRng::seed_from_u64(1);
        let steering = ContextSteering::from_config(&SteeringConfig::default(), &mut rng).unwrap();
        assert_eq!(steering.behaviour_count(), 5);
        assert_eq!(steering.directions().len(), 8);

        let bad = SteeringConfig {
            behaviours: vec![BehaviourConfig::Strafe(StrafeConfig {
                start_ratio: 1.5,
                ..Default::default()
            })],
            ..Default::default()
        };
        assert!(ContextSteering::from_config(&bad, &mut rng).is_err());
    }

    #[test]
    fn test_behaviour_config_serde() {
        let json = r#"[{"kind":"avoidance","radius":3.0},{"kind":"path_following"}]"#;
        let parsed: Vec<BehaviourConfig> = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            vec![
                BehaviourConfig::Avoidance(AvoidanceConfig { radius: 3.0 }),
                BehaviourConfig::PathFollowing(PathFollowingConfig::default()),
            ]
        );
    }
}
