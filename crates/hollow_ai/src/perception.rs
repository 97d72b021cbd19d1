//! Sensed world data and the detectors that fill it
//!
//! Each agent owns one [`SensedWorld`]. Detectors run on their own
//! cadence through [`Perception`] and write into it; steering and
//! brains read the latest snapshot, which may be up to one detection
//! interval old.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::handle::EntityId;
use crate::world::{LayerMask, Obstacle, WorldQuery};

/// A target the agent knows about
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensedTarget {
    pub id: EntityId,
    /// Last position the agent perceived
    pub position: Vec2,
    /// Seen during the most recent detection pass
    pub visible: bool,
    /// Seconds since the target was last seen
    pub unseen_for: f32,
}

/// Per-agent snapshot of what it perceives
#[derive(Debug, Clone)]
pub struct SensedWorld {
    /// Agent's own position
    pub position: Vec2,
    /// Agent's facing, used by vision cones
    pub facing: Vec2,
    /// Obstacles near the agent
    pub obstacles: Vec<Obstacle>,
    /// Positions of nearby allies
    pub neighbours: Vec<Vec2>,
    /// Waypoint published by path following
    pub current_waypoint: Option<Vec2>,
    /// How long an unseen target is remembered
    pub memory_duration: f32,
    targets: Vec<SensedTarget>,
    current_target: Option<EntityId>,
    last_known_target_position: Option<Vec2>,
    last_seen_timer: f32,
}

impl Default for SensedWorld {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl SensedWorld {
    /// Fresh view with no targets, facing down
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            facing: Vec2::NEG_Y,
            obstacles: Vec::new(),
            neighbours: Vec::new(),
            current_waypoint: None,
            memory_duration: 2.5,
            targets: Vec::new(),
            current_target: None,
            last_known_target_position: None,
            last_seen_timer: 0.0,
        }
    }

    /// Seconds a target is remembered after losing sight of it
    pub fn with_memory_duration(mut self, seconds: f32) -> Self {
        self.memory_duration = seconds;
        self
    }

    /// Known targets in detection order
    pub fn targets(&self) -> &[SensedTarget] {
        &self.targets
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Whether any target is known, seen or remembered
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Target the agent is focused on
    pub fn current_target(&self) -> Option<EntityId> {
        self.current_target
    }

    /// Point the agent at a specific target; ignored if it is not known
    pub fn set_current_target(&mut self, id: EntityId) {
        if self.targets.iter().any(|t| t.id == id) {
            self.current_target = Some(id);
            self.sync_current();
        }
    }

    /// Drop focus and the last known position
    pub fn clear_current_target(&mut self) {
        self.current_target = None;
        self.last_known_target_position = None;
        self.last_seen_timer = 0.0;
    }

    /// Keep the current target, or fall back to the first known one
    pub fn ensure_current_target(&mut self) -> Option<EntityId> {
        let still_known = self
            .current_target
            .map_or(false, |id| self.targets.iter().any(|t| t.id == id));

        if !still_known {
            self.current_target = self.targets.first().map(|t| t.id);
            self.sync_current();
        }
        self.current_target
    }

    fn current_entry(&self) -> Option<&SensedTarget> {
        let id = self.current_target?;
        self.targets.iter().find(|t| t.id == id)
    }

    /// Where the current target is (or was last seen)
    pub fn current_target_position(&self) -> Option<Vec2> {
        self.current_entry().map(|t| t.position)
    }

    /// Whether the current target was seen on the latest pass
    pub fn is_current_target_visible(&self) -> bool {
        self.current_entry().map_or(false, |t| t.visible)
    }

    /// Last position the current target was seen at
    pub fn last_known_target_position(&self) -> Option<Vec2> {
        self.last_known_target_position
    }

    /// Remaining memory for the current target
    pub fn last_seen_timer(&self) -> f32 {
        self.last_seen_timer
    }

    /// Start a detection pass: nothing is visible until observed again
    pub fn begin_detection(&mut self) {
        for target in &mut self.targets {
            target.visible = false;
        }
        self.obstacles.clear();
        self.neighbours.clear();
    }

    /// Record a target seen during the current pass
    pub fn observe_target(&mut self, id: EntityId, position: Vec2) {
        match self.targets.iter_mut().find(|t| t.id == id) {
            Some(target) => {
                target.position = position;
                target.visible = true;
                target.unseen_for = 0.0;
            }
            None => self.targets.push(SensedTarget {
                id,
                position,
                visible: true,
                unseen_for: 0.0,
            }),
        }
    }

    /// Drop a target outright, e.g. when its entity is gone
    pub fn forget_target(&mut self, id: EntityId) {
        self.targets.retain(|t| t.id != id);
        if self.current_target == Some(id) {
            log::debug!("Target {} no longer exists", id);
            self.clear_current_target();
        }
    }

    /// Finish a detection pass
    pub fn end_detection(&mut self) {
        self.forget_expired();
        self.sync_current();
    }

    /// Age memories of targets that are not visible
    pub fn advance_memory(&mut self, delta_time: f32) {
        for target in self.targets.iter_mut().filter(|t| !t.visible) {
            target.unseen_for += delta_time;
        }
        self.forget_expired();
        self.sync_current();
    }

    fn forget_expired(&mut self) {
        let memory = self.memory_duration;
        self.targets
            .retain(|t| t.visible || t.unseen_for < memory);

        if let Some(id) = self.current_target {
            if !self.targets.iter().any(|t| t.id == id) {
                log::debug!("Forgot target {}", id);
                self.clear_current_target();
            }
        }
    }

    fn sync_current(&mut self) {
        if let Some(entry) = self.current_entry().copied() {
            self.last_known_target_position = Some(entry.position);
            self.last_seen_timer = (self.memory_duration - entry.unseen_for).max(0.0);
        }
    }
}

/// Fills a [`SensedWorld`] from world queries
pub trait Detector: Send {
    fn name(&self) -> &'static str;
    fn detect(&mut self, query: &dyn WorldQuery, sensed: &mut SensedWorld);
}

fn has_line_of_sight(
    query: &dyn WorldQuery,
    from: Vec2,
    to: Vec2,
    occluders: LayerMask,
) -> bool {
    let offset = to - from;
    let distance = offset.length();
    if distance < 1e-4 {
        return true;
    }
    query.raycast(from, offset, distance, occluders).is_none()
}

/// Radius check with optional line of sight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDetector {
    pub radius: f32,
    pub target_mask: LayerMask,
    pub occluder_mask: LayerMask,
    pub line_of_sight: bool,
}

impl TargetDetector {
    /// Player detector with line of sight against walls and obstacles
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            target_mask: LayerMask::PLAYER,
            occluder_mask: LayerMask::WALLS.union(LayerMask::OBSTACLES),
            line_of_sight: true,
        }
    }

    /// Detect through walls
    pub fn without_line_of_sight(mut self) -> Self {
        self.line_of_sight = false;
        self
    }

    pub fn with_masks(mut self, targets: LayerMask, occluders: LayerMask) -> Self {
        self.target_mask = targets;
        self.occluder_mask = occluders;
        self
    }
}

impl Detector for TargetDetector {
    fn name(&self) -> &'static str {
        "target"
    }

    fn detect(&mut self, query: &dyn WorldQuery, sensed: &mut SensedWorld) {
        let origin = sensed.position;
        for hit in query.overlap_circle(origin, self.radius, self.target_mask) {
            if self.line_of_sight
                && !has_line_of_sight(query, origin, hit.position, self.occluder_mask)
            {
                continue;
            }
            sensed.observe_target(hit.id, hit.position);
        }
    }
}

/// Range plus field of view around the agent's facing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConeDetector {
    pub range: f32,
    /// Full cone angle in radians
    pub fov: f32,
    pub target_mask: LayerMask,
    pub occluder_mask: LayerMask,
}

impl VisionConeDetector {
    /// Cone of `fov` radians and `range` units around the facing
    pub fn new(range: f32, fov: f32) -> Self {
        Self {
            range,
            fov,
            target_mask: LayerMask::PLAYER,
            occluder_mask: LayerMask::WALLS.union(LayerMask::OBSTACLES),
        }
    }

    fn in_cone(&self, facing: Vec2, to_target: Vec2) -> bool {
        let (Some(facing), Some(dir)) = (facing.try_normalize(), to_target.try_normalize()) else {
            return true;
        };
        facing.dot(dir) >= (self.fov * 0.5).cos()
    }
}

impl Detector for VisionConeDetector {
    fn name(&self) -> &'static str {
        "vision_cone"
    }

    fn detect(&mut self, query: &dyn WorldQuery, sensed: &mut SensedWorld) {
        let origin = sensed.position;
        let facing = sensed.facing;
        for hit in query.overlap_circle(origin, self.range, self.target_mask) {
            if !self.in_cone(facing, hit.position - origin) {
                continue;
            }
            if !has_line_of_sight(query, origin, hit.position, self.occluder_mask) {
                continue;
            }
            sensed.observe_target(hit.id, hit.position);
        }
    }
}

/// Collects obstacle shapes around the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleDetector {
    pub radius: f32,
    pub mask: LayerMask,
}

impl ObstacleDetector {
    /// Walls and obstacles within `radius`
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            mask: LayerMask::WALLS.union(LayerMask::OBSTACLES),
        }
    }
}

impl Detector for ObstacleDetector {
    fn name(&self) -> &'static str {
        "obstacle"
    }

    fn detect(&mut self, query: &dyn WorldQuery, sensed: &mut SensedWorld) {
        let found = query.overlap_obstacles(sensed.position, self.radius, self.mask);
        sensed.obstacles.extend(found);
    }
}

/// Collects nearby allies for separation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighbourDetector {
    pub radius: f32,
    pub mask: LayerMask,
    /// The agent itself, excluded from results
    pub own_id: Option<EntityId>,
}

impl NeighbourDetector {
    /// Enemies within `radius`, skipping `own_id`
    pub fn new(radius: f32, own_id: Option<EntityId>) -> Self {
        Self {
            radius,
            mask: LayerMask::ENEMIES,
            own_id,
        }
    }
}

impl Detector for NeighbourDetector {
    fn name(&self) -> &'static str {
        "neighbour"
    }

    fn detect(&mut self, query: &dyn WorldQuery, sensed: &mut SensedWorld) {
        let origin = sensed.position;
        for hit in query.overlap_circle(origin, self.radius, self.mask) {
            if Some(hit.id) == self.own_id || hit.position.distance(origin) < 0.01 {
                continue;
            }
            sensed.neighbours.push(hit.position);
        }
    }
}

/// Serializable description of a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorConfig {
    Target {
        radius: f32,
        #[serde(default = "default_true")]
        line_of_sight: bool,
    },
    VisionCone {
        range: f32,
        fov_degrees: f32,
    },
    Obstacle {
        radius: f32,
    },
    Neighbour {
        radius: f32,
    },
}

fn default_true() -> bool {
    true
}

impl DetectorConfig {
    /// Radii and the cone angle must be positive
    pub fn validate(&self) -> Result<()> {
        let (what, value) = match self {
            DetectorConfig::Target { radius, .. } => ("target radius", *radius),
            DetectorConfig::VisionCone { range, fov_degrees } => {
                if *fov_degrees <= 0.0 || *fov_degrees > 360.0 {
                    return Err(AiError::config(format!(
                        "vision cone fov must be in (0, 360], got {}",
                        fov_degrees
                    )));
                }
                ("vision range", *range)
            }
            DetectorConfig::Obstacle { radius } => ("obstacle radius", *radius),
            DetectorConfig::Neighbour { radius } => ("neighbour radius", *radius),
        };
        if value <= 0.0 {
            return Err(AiError::config(format!("{} must be positive, got {}", what, value)));
        }
        Ok(())
    }

    /// Instantiate the detector for an agent
    pub fn build(&self, own_id: Option<EntityId>) -> Box<dyn Detector> {
        match *self {
            DetectorConfig::Target {
                radius,
                line_of_sight,
            } => {
                let mut detector = TargetDetector::new(radius);
                detector.line_of_sight = line_of_sight;
                Box::new(detector)
            }
            DetectorConfig::VisionCone { range, fov_degrees } => {
                Box::new(VisionConeDetector::new(range, fov_degrees.to_radians()))
            }
            DetectorConfig::Obstacle { radius } => Box::new(ObstacleDetector::new(radius)),
            DetectorConfig::Neighbour { radius } => {
                Box::new(NeighbourDetector::new(radius, own_id))
            }
        }
    }
}

/// Detection cadence and memory settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Seconds between detection passes
    pub detection_interval: f32,
    /// Seconds an unseen target is remembered
    pub memory_duration: f32,
    pub detectors: Vec<DetectorConfig>,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            detection_interval: 0.05,
            memory_duration: 2.5,
            detectors: vec![
                DetectorConfig::Target {
                    radius: 6.0,
                    line_of_sight: true,
                },
                DetectorConfig::Obstacle { radius: 2.0 },
                DetectorConfig::Neighbour { radius: 2.5 },
            ],
        }
    }
}

impl PerceptionConfig {
    /// Check the cadence, memory and every detector
    pub fn validate(&self) -> Result<()> {
        if self.detection_interval <= 0.0 {
            return Err(AiError::config("detection_interval must be positive"));
        }
        if self.memory_duration < 0.0 {
            return Err(AiError::config("memory_duration must not be negative"));
        }
        self.detectors.iter().try_for_each(DetectorConfig::validate)
    }
}

/// Runs detectors on a fixed cadence
pub struct Perception {
    detectors: Vec<Box<dyn Detector>>,
    interval: f32,
    timer: f32,
}

impl Perception {
    /// No detectors; the first tick detects immediately
    pub fn new(detection_interval: f32) -> Self {
        Self {
            detectors: Vec::new(),
            interval: detection_interval,
            timer: 0.0,
        }
    }

    /// Build the configured detectors for the agent `own_id`
    pub fn from_config(config: &PerceptionConfig, own_id: Option<EntityId>) -> Self {
        let mut perception = Self::new(config.detection_interval);
        for detector in &config.detectors {
            perception.add_detector(detector.build(own_id));
        }
        perception
    }

    /// Add a detector
    pub fn with_detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn add_detector(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    /// Age memories and run a detection pass when the cadence is due
    ///
    /// Returns whether detection ran this tick.
    pub fn tick(&mut self, delta_time: f32, query: &dyn WorldQuery, sensed: &mut SensedWorld) -> bool {
        sensed.advance_memory(delta_time);

        let gone: Vec<EntityId> = sensed
            .targets()
            .iter()
            .filter(|t| query.position_of(t.id).is_none())
            .map(|t| t.id)
            .collect();
        for id in gone {
            sensed.forget_target(id);
        }

        self.timer -= delta_time;
        if self.timer > 0.0 {
            return false;
        }
        self.timer = self.interval;
        self.detect_now(query, sensed);
        true
    }

    /// Run every detector immediately
    pub fn detect_now(&mut self, query: &dyn WorldQuery, sensed: &mut SensedWorld) {
        sensed.begin_detection();
        for detector in &mut self.detectors {
            detector.detect(query, sensed);
        }
        sensed.end_detection();

        log::trace!(
            "Detection: {} targets, {} obstacles, {} neighbours",
            sensed.target_count(),
            sensed.obstacles.len(),
            sensed.neighbours.len()
        );
    }
}
