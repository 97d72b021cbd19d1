//! Timed combat routines
//!
//! Multi-step attacks are resumable state machines ticked once per
//! frame. Every suspension point is either a countdown or a polled
//! animation condition, and every routine can be cancelled from any
//! phase with the shared [`CombatFlags`] reset.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::actuator::{Actuator, AnimationProgress};
use crate::error::{AiError, Result};

/// Flags shared between a brain and its running routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatFlags {
    pub is_attacking: bool,
    pub can_attack: bool,
    pub movement_locked: bool,
}

impl Default for CombatFlags {
    fn default() -> Self {
        Self {
            is_attacking: false,
            can_attack: true,
            movement_locked: false,
        }
    }
}

impl CombatFlags {
    /// Mark an attack as running; no new one may start
    pub fn begin_attack(&mut self) {
        self.is_attacking = true;
        self.can_attack = false;
    }

    /// Back to the neutral, ready-to-attack state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A suspension point
#[derive(Debug, Clone, PartialEq)]
pub enum Wait {
    /// Remaining seconds
    Seconds(f32),
    /// Until the named animation state has played through once
    Animation(String),
}

impl Wait {
    /// Advance; true once the wait is over
    pub fn tick(&mut self, delta_time: f32, animation: &dyn AnimationProgress) -> bool {
        match self {
            Wait::Seconds(remaining) => {
                *remaining -= delta_time;
                *remaining <= 0.0
            }
            Wait::Animation(state) => {
                animation.is_in_state(state) && animation.normalized_time() >= 1.0
            }
        }
    }
}

/// Per-tick inputs for a routine
#[derive(Debug, Clone, Copy)]
pub struct RoutineInput {
    pub position: Vec2,
    /// Current target position, if one is still known
    pub target: Option<Vec2>,
    pub delta_time: f32,
}

/// Where a routine stands after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineStatus {
    Running,
    /// Ran to the end
    Completed,
    /// Gave up early (target lost, approach timed out)
    Aborted,
}

impl RoutineStatus {
    /// Completed or aborted
    pub fn is_done(self) -> bool {
        self != RoutineStatus::Running
    }
}

fn halt(actuator: &mut dyn Actuator, flags: &mut CombatFlags) {
    flags.reset();
    actuator.cancel_attack();
    actuator.move_in(Vec2::ZERO);
}

/// Melee settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeConfig {
    pub range: f32,
    /// Give up the approach after this many seconds
    pub approach_timeout: f32,
    pub attack_duration: f32,
    pub attack_cooldown: f32,
}

impl Default for MeleeConfig {
    fn default() -> Self {
        Self {
            range: 1.5,
            approach_timeout: 3.0,
            attack_duration: 1.3,
            attack_cooldown: 1.5,
        }
    }
}

impl MeleeConfig {
    /// Range and timeout must be positive, timings non-negative
    pub fn validate(&self) -> Result<()> {
        if self.range <= 0.0 || self.approach_timeout <= 0.0 {
            return Err(AiError::config("melee range and approach_timeout must be positive"));
        }
        if self.attack_duration < 0.0 || self.attack_cooldown < 0.0 {
            return Err(AiError::config("melee timings must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MeleePhase {
    Approach { elapsed: f32 },
    Recover(Wait),
    Done,
}

/// Close in, swing once, recover
#[derive(Debug, Clone)]
pub struct MeleeRoutine {
    config: MeleeConfig,
    phase: MeleePhase,
}

impl MeleeRoutine {
    /// Claim the attack flags and begin approaching
    pub fn start(config: MeleeConfig, flags: &mut CombatFlags) -> Self {
        flags.begin_attack();
        log::debug!("Melee routine started");
        Self {
            config,
            phase: MeleePhase::Approach { elapsed: 0.0 },
        }
    }

    /// Still closing in, not yet swinging
    pub fn is_approaching(&self) -> bool {
        matches!(self.phase, MeleePhase::Approach { .. })
    }

    /// Advance one frame
    pub fn tick(
        &mut self,
        input: RoutineInput,
        actuator: &mut dyn Actuator,
        animation: &dyn AnimationProgress,
        flags: &mut CombatFlags,
    ) -> RoutineStatus {
        match &mut self.phase {
            MeleePhase::Approach { elapsed } => {
                let Some(target) = input.target else {
                    return self.abort("target lost", actuator, flags);
                };

                *elapsed += input.delta_time;
                let offset = target - input.position;
                if offset.length() <= self.config.range {
                    actuator.move_in(Vec2::ZERO);
                    actuator.look_at(target);
                    actuator.attack();
                    flags.movement_locked = true;
                    self.phase = MeleePhase::Recover(Wait::Seconds(
                        self.config.attack_duration + self.config.attack_cooldown,
                    ));
                    return RoutineStatus::Running;
                }

                if *elapsed >= self.config.approach_timeout {
                    return self.abort("approach timed out", actuator, flags);
                }

                actuator.look_at(target);
                actuator.move_in(offset.normalize_or_zero());
                RoutineStatus::Running
            }
            MeleePhase::Recover(wait) => {
                if wait.tick(input.delta_time, animation) {
                    flags.reset();
                    self.phase = MeleePhase::Done;
                    log::debug!("Melee routine finished");
                    RoutineStatus::Completed
                } else {
                    RoutineStatus::Running
                }
            }
            MeleePhase::Done => RoutineStatus::Completed,
        }
    }

    fn abort(
        &mut self,
        reason: &str,
        actuator: &mut dyn Actuator,
        flags: &mut CombatFlags,
    ) -> RoutineStatus {
        log::debug!("Melee routine aborted: {}", reason);
        flags.reset();
        actuator.move_in(Vec2::ZERO);
        self.phase = MeleePhase::Done;
        RoutineStatus::Aborted
    }

    /// Stop wherever the routine is
    pub fn cancel(&mut self, actuator: &mut dyn Actuator, flags: &mut CombatFlags) {
        log::debug!("Melee routine cancelled");
        halt(actuator, flags);
        self.phase = MeleePhase::Done;
    }
}

/// Ranged volley settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolleyConfig {
    /// Candidate firing spots; empty = fire from where the boss stands
    pub corners: Vec<Vec2>,
    pub stop_distance: f32,
    /// Give up walking to the corner after this long
    pub reposition_timeout: f32,
    pub settle_time: f32,
    pub min_shots: u32,
    pub max_shots: u32,
    /// Fixed wind-up before each shot
    pub windup_time: f32,
    /// Wait on this animation state instead of the fixed wind-up
    pub windup_animation: Option<String>,
    pub attack_duration: f32,
    pub time_between_shots: f32,
    pub recover_time: f32,
}

impl Default for VolleyConfig {
    fn default() -> Self {
        Self {
            corners: Vec::new(),
            stop_distance: 0.1,
            reposition_timeout: 4.0,
            settle_time: 0.25,
            min_shots: 3,
            max_shots: 5,
            windup_time: 0.67,
            windup_animation: None,
            attack_duration: 1.3,
            time_between_shots: 0.5,
            recover_time: 0.3,
        }
    }
}

impl VolleyConfig {
    /// Firing spots to pick from
    pub fn with_corners(mut self, corners: Vec<Vec2>) -> Self {
        self.corners = corners;
        self
    }

    /// Shot counts must satisfy `1 <= min <= max`
    pub fn validate(&self) -> Result<()> {
        if self.min_shots == 0 || self.min_shots > self.max_shots {
            return Err(AiError::config(format!(
                "volley shots must satisfy 1 <= min <= max, got {}..={}",
                self.min_shots, self.max_shots
            )));
        }
        if self.stop_distance < 0.0 || self.reposition_timeout <= 0.0 {
            return Err(AiError::config("volley movement settings out of range"));
        }
        let timings = [
            self.settle_time,
            self.windup_time,
            self.attack_duration,
            self.time_between_shots,
            self.recover_time,
        ];
        if timings.iter().any(|t| *t < 0.0) {
            return Err(AiError::config("volley timings must not be negative"));
        }
        Ok(())
    }

    fn windup(&self) -> Wait {
        match &self.windup_animation {
            Some(state) => Wait::Animation(state.clone()),
            None => Wait::Seconds(self.windup_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum VolleyPhase {
    Reposition { corner: Vec2, elapsed: f32 },
    Settle(Wait),
    WindUp(Wait),
    Between(Wait),
    Recover(Wait),
    Done,
}

/// Walk to a corner and fire a burst at the target
#[derive(Debug, Clone)]
pub struct VolleyRoutine {
    config: VolleyConfig,
    phase: VolleyPhase,
    shots: u32,
    fired: u32,
}

impl VolleyRoutine {
    /// Claim the attack flags, roll the shot count and pick a corner
    pub fn start(config: VolleyConfig, rng: &mut impl Rng, flags: &mut CombatFlags) -> Self {
        flags.begin_attack();

        let shots = rng.gen_range(config.min_shots..=config.max_shots);
        let phase = if config.corners.is_empty() {
            log::warn!("Volley has no corners configured, firing in place");
            flags.movement_locked = true;
            VolleyPhase::Settle(Wait::Seconds(config.settle_time))
        } else {
            let corner = config.corners[rng.gen_range(0..config.corners.len())];
            VolleyPhase::Reposition {
                corner,
                elapsed: 0.0,
            }
        };

        log::debug!("Volley routine started: {} shots", shots);
        Self {
            config,
            phase,
            shots,
            fired: 0,
        }
    }

    /// Shots planned for this volley
    pub fn shot_count(&self) -> u32 {
        self.shots
    }

    pub fn shots_fired(&self) -> u32 {
        self.fired
    }

    /// Corner being walked to, while repositioning
    pub fn corner(&self) -> Option<Vec2> {
        match self.phase {
            VolleyPhase::Reposition { corner, .. } => Some(corner),
            _ => None,
        }
    }

    /// Advance one frame
    pub fn tick(
        &mut self,
        input: RoutineInput,
        actuator: &mut dyn Actuator,
        animation: &dyn AnimationProgress,
        flags: &mut CombatFlags,
    ) -> RoutineStatus {
        let dt = input.delta_time;
        let next = match &mut self.phase {
            VolleyPhase::Reposition { corner, elapsed } => {
                *elapsed += dt;
                let offset = *corner - input.position;
                let arrived = offset.length() <= self.config.stop_distance;
                if arrived || *elapsed >= self.config.reposition_timeout {
                    if !arrived {
                        log::warn!("Volley could not reach corner {}, firing from here", corner);
                    }
                    actuator.move_in(Vec2::ZERO);
                    flags.movement_locked = true;
                    Some(VolleyPhase::Settle(Wait::Seconds(self.config.settle_time)))
                } else {
                    actuator.move_in(offset.normalize_or_zero());
                    None
                }
            }
            VolleyPhase::Settle(wait) | VolleyPhase::Between(wait) => {
                if !wait.tick(dt, animation) {
                    None
                } else if let Some(target) = input.target {
                    actuator.look_at(target);
                    Some(VolleyPhase::WindUp(self.config.windup()))
                } else {
                    log::warn!("Volley without target, ending early");
                    Some(VolleyPhase::Recover(Wait::Seconds(self.config.recover_time)))
                }
            }
            VolleyPhase::WindUp(wait) => {
                if !wait.tick(dt, animation) {
                    None
                } else {
                    if let Some(target) = input.target {
                        let aim = (target - input.position)
                            .try_normalize()
                            .unwrap_or(Vec2::NEG_Y);
                        actuator.fire(aim);
                    } else {
                        log::warn!("Volley target vanished during wind-up");
                    }
                    self.fired += 1;

                    if self.fired >= self.shots {
                        Some(VolleyPhase::Recover(Wait::Seconds(self.config.recover_time)))
                    } else {
                        Some(VolleyPhase::Between(Wait::Seconds(
                            self.config.attack_duration + self.config.time_between_shots,
                        )))
                    }
                }
            }
            VolleyPhase::Recover(wait) => {
                if wait.tick(dt, animation) {
                    flags.reset();
                    log::debug!("Volley routine finished after {} shots", self.fired);
                    Some(VolleyPhase::Done)
                } else {
                    None
                }
            }
            VolleyPhase::Done => return RoutineStatus::Completed,
        };

        match next {
            Some(VolleyPhase::Done) => {
                self.phase = VolleyPhase::Done;
                RoutineStatus::Completed
            }
            Some(phase) => {
                self.phase = phase;
                RoutineStatus::Running
            }
            None => RoutineStatus::Running,
        }
    }

    /// Stop wherever the routine is
    pub fn cancel(&mut self, actuator: &mut dyn Actuator, flags: &mut CombatFlags) {
        log::debug!("Volley routine cancelled after {} shots", self.fired);
        halt(actuator, flags);
        self.phase = VolleyPhase::Done;
    }
}
