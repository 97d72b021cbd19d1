//! Boss brain
//!
//! Three health-driven phases. While chasing, the boss periodically
//! picks between a melee swing and a ranged volley; both run as
//! routines that can be interrupted by stuns or death.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::actuator::{Actuator, AnimationProgress};
use crate::enemy::make_rng;
use crate::error::{AiError, Result};
use crate::handle::EntityId;
use crate::navigation::{PathFollowerConfig, PathService};
use crate::perception::{DetectorConfig, Perception, PerceptionConfig, SensedWorld};
use crate::pilot::Pilot;
use crate::routine::{
    CombatFlags, MeleeConfig, MeleeRoutine, RoutineInput, RoutineStatus, VolleyConfig,
    VolleyRoutine,
};
use crate::state_machine::{StateChange, StateMachine};
use crate::steering::{ContextSteering, SteeringConfig};
use crate::world::WorldQuery;

/// Boss states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossState {
    Idle,
    Chase,
    Melee,
    Ranged,
    Stunned,
    Dead,
}

/// Difficulty tier from remaining health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BossPhase {
    Phase1,
    Phase2,
    Phase3,
}

/// How phases follow health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseMode {
    /// Recomputed from the live ratio; healing can move back a phase
    #[default]
    Live,
    /// Never returns to an earlier phase
    Ratchet,
}

/// Decision tuning for one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTuning {
    /// Chance a decision picks melee over ranged
    pub melee_chance: f32,
    /// Seconds before another volley may start
    pub ranged_cooldown: f32,
    /// Seconds between decisions while chasing
    pub decision_delay: f32,
}

impl Default for PhaseTuning {
    fn default() -> Self {
        Self {
            melee_chance: 0.7,
            ranged_cooldown: 5.0,
            decision_delay: 1.5,
        }
    }
}

impl PhaseTuning {
    fn validate(&self, phase: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.melee_chance) {
            return Err(AiError::config(format!(
                "{} melee_chance must be in [0, 1], got {}",
                phase, self.melee_chance
            )));
        }
        if self.decision_delay <= 0.0 || self.ranged_cooldown < 0.0 {
            return Err(AiError::config(format!("{} timings out of range", phase)));
        }
        Ok(())
    }
}

/// Boss tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    pub phase1: PhaseTuning,
    pub phase2: PhaseTuning,
    pub phase3: PhaseTuning,
    /// Health ratio at or below which Phase2 starts
    pub phase2_threshold: f32,
    /// Health ratio at or below which Phase3 starts
    pub phase3_threshold: f32,
    pub phase_mode: PhaseMode,
    pub melee: MeleeConfig,
    pub volley: VolleyConfig,
    pub seed: Option<u64>,
    pub perception: PerceptionConfig,
    pub steering: SteeringConfig,
    pub path: PathFollowerConfig,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            phase1: PhaseTuning::default(),
            phase2: PhaseTuning {
                melee_chance: 0.6,
                ranged_cooldown: 4.0,
                decision_delay: 1.2,
            },
            phase3: PhaseTuning {
                melee_chance: 0.5,
                ranged_cooldown: 3.0,
                decision_delay: 0.9,
            },
            phase2_threshold: 0.7,
            phase3_threshold: 0.3,
            phase_mode: PhaseMode::Live,
            melee: MeleeConfig::default(),
            volley: VolleyConfig::default(),
            seed: None,
            perception: PerceptionConfig {
                detectors: vec![
                    DetectorConfig::Target {
                        radius: 12.0,
                        line_of_sight: false,
                    },
                    DetectorConfig::Obstacle { radius: 2.0 },
                ],
                ..Default::default()
            },
            steering: SteeringConfig::default(),
            path: PathFollowerConfig::default(),
        }
    }
}

impl BossConfig {
    /// Fixed seed for repeatable runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_phase_mode(mut self, mode: PhaseMode) -> Self {
        self.phase_mode = mode;
        self
    }

    /// Replace the volley firing spots
    pub fn with_corners(mut self, corners: Vec<Vec2>) -> Self {
        self.volley.corners = corners;
        self
    }

    /// Decision tuning for a phase
    pub fn tuning(&self, phase: BossPhase) -> &PhaseTuning {
        match phase {
            BossPhase::Phase1 => &self.phase1,
            BossPhase::Phase2 => &self.phase2,
            BossPhase::Phase3 => &self.phase3,
        }
    }

    /// Phase for a health ratio, ignoring history
    pub fn phase_for(&self, health_ratio: f32) -> BossPhase {
        let ratio = health_ratio.clamp(0.0, 1.0);
        if ratio <= self.phase3_threshold {
            BossPhase::Phase3
        } else if ratio <= self.phase2_threshold {
            BossPhase::Phase2
        } else {
            BossPhase::Phase1
        }
    }

    /// Check thresholds, every phase and every routine
    pub fn validate(&self) -> Result<()> {
        let descending = 0.0 <= self.phase3_threshold
            && self.phase3_threshold < self.phase2_threshold
            && self.phase2_threshold <= 1.0;
        if !descending {
            return Err(AiError::config(format!(
                "phase thresholds must satisfy 0 <= phase3 < phase2 <= 1, got {} / {}",
                self.phase3_threshold, self.phase2_threshold
            )));
        }
        self.phase1.validate("phase1")?;
        self.phase2.validate("phase2")?;
        self.phase3.validate("phase3")?;
        self.melee.validate()?;
        self.volley.validate()?;
        self.perception.validate()?;
        self.steering.validate()?;
        self.path.validate()
    }
}

/// What the condition transitions look at
#[derive(Debug, Clone, Copy)]
pub struct BossView {
    pub has_target: bool,
    pub alive: bool,
}

#[derive(Debug)]
enum ActiveRoutine {
    None,
    Melee(MeleeRoutine),
    Volley(VolleyRoutine),
}

fn boss_fsm() -> StateMachine<BossState, BossView> {
    use BossState::*;

    let mut fsm = StateMachine::new(Idle).with_label("boss");
    fsm.add_global_transition(Dead, |v: &BossView| !v.alive);
    fsm.add_transition(Idle, Chase, |v: &BossView| v.has_target);
    fsm.add_transition(Chase, Idle, |v: &BossView| !v.has_target);
    fsm
}

/// Per-frame inputs for the boss
pub struct BossTick<'a> {
    pub delta_time: f32,
    pub position: Vec2,
    /// Current health over max health
    pub health_ratio: f32,
    pub world: &'a dyn WorldQuery,
    pub actuator: &'a mut dyn Actuator,
    pub animation: &'a dyn AnimationProgress,
}

/// Decision maker for the boss
pub struct BossBrain {
    config: BossConfig,
    fsm: StateMachine<BossState, BossView>,
    perception: Perception,
    sensed: SensedWorld,
    pilot: Pilot,
    rng: StdRng,
    flags: CombatFlags,
    routine: ActiveRoutine,
    phase: BossPhase,
    decision_timer: f32,
    ranged_cooldown: f32,
    stun_timer: f32,
}

impl BossBrain {
    /// Validate `config` and build a boss idling at `position`
    pub fn new(config: BossConfig, own_id: Option<EntityId>, position: Vec2) -> Result<Self> {
        config.validate()?;

        let mut rng = make_rng(config.seed);
        let steering = ContextSteering::from_config(&config.steering, &mut rng)?;

        Ok(Self {
            fsm: boss_fsm(),
            perception: Perception::from_config(&config.perception, own_id),
            sensed: SensedWorld::new(position)
                .with_memory_duration(config.perception.memory_duration),
            pilot: Pilot::new(steering),
            rng,
            flags: CombatFlags::default(),
            routine: ActiveRoutine::None,
            phase: BossPhase::Phase1,
            decision_timer: config.phase1.decision_delay,
            ranged_cooldown: 0.0,
            stun_timer: 0.0,
            config,
        })
    }

    /// Follow grid paths while chasing
    pub fn with_path_service(mut self, service: PathService) -> Self {
        self.pilot.attach_paths(service, self.config.path.clone());
        self
    }

    pub fn config(&self) -> &BossConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> BossState {
        self.fsm.current()
    }

    /// Current phase, updated every tick from health
    pub fn phase(&self) -> BossPhase {
        self.phase
    }

    /// Attack flags; hosts must not move the body while `movement_locked`
    pub fn flags(&self) -> CombatFlags {
        self.flags
    }

    /// What the boss currently perceives
    pub fn sensed(&self) -> &SensedWorld {
        &self.sensed
    }

    pub fn is_dead(&self) -> bool {
        self.fsm.is_in(BossState::Dead)
    }

    /// Seconds until the next Chase decision
    pub fn decision_timer(&self) -> f32 {
        self.decision_timer
    }

    /// Interrupt any routine and stand still for `duration` seconds
    pub fn apply_stun(&mut self, duration: f32, actuator: &mut dyn Actuator) {
        if self.is_dead() {
            return;
        }
        self.cancel_routine(actuator);
        actuator.move_in(Vec2::ZERO);
        self.stun_timer = self.stun_timer.max(duration);
        self.pilot.stop(&mut self.sensed);
        self.fsm.force_transition(BossState::Stunned);
    }

    fn cancel_routine(&mut self, actuator: &mut dyn Actuator) {
        match &mut self.routine {
            ActiveRoutine::Melee(melee) => melee.cancel(actuator, &mut self.flags),
            ActiveRoutine::Volley(volley) => volley.cancel(actuator, &mut self.flags),
            ActiveRoutine::None => {}
        }
        self.routine = ActiveRoutine::None;
    }

    fn update_phase(&mut self, health_ratio: f32) {
        let live = self.config.phase_for(health_ratio);
        let next = match self.config.phase_mode {
            PhaseMode::Live => live,
            PhaseMode::Ratchet => live.max(self.phase),
        };
        if next != self.phase {
            log::info!("Boss phase {:?} -> {:?} (health {:.2})", self.phase, next, health_ratio);
            self.phase = next;
        }
    }

    /// Run one frame
    pub fn tick(&mut self, input: BossTick<'_>) -> BossState {
        let BossTick {
            delta_time,
            position,
            health_ratio,
            world,
            actuator,
            animation,
        } = input;

        if self.is_dead() {
            return BossState::Dead;
        }

        self.sensed.position = position;
        self.perception.tick(delta_time, world, &mut self.sensed);
        self.sensed.ensure_current_target();
        self.update_phase(health_ratio);
        self.ranged_cooldown -= delta_time;

        let view = BossView {
            has_target: self.sensed.current_target().is_some(),
            alive: health_ratio > 0.0,
        };
        if let Some(change) = self.fsm.update(&view, delta_time) {
            self.on_enter(change, actuator);
        }

        let target = self.sensed.current_target_position();
        match self.fsm.current() {
            BossState::Dead => {}
            BossState::Idle => actuator.move_in(Vec2::ZERO),
            BossState::Stunned => {
                actuator.move_in(Vec2::ZERO);
                self.stun_timer -= delta_time;
                if self.stun_timer <= 0.0 {
                    self.stun_timer = 0.0;
                    self.enter_chase();
                }
            }
            BossState::Chase => self.chase(delta_time, target, actuator),
            BossState::Melee | BossState::Ranged => {
                let routine_input = RoutineInput {
                    position,
                    target,
                    delta_time,
                };
                let status = match &mut self.routine {
                    ActiveRoutine::Melee(melee) => {
                        melee.tick(routine_input, actuator, animation, &mut self.flags)
                    }
                    ActiveRoutine::Volley(volley) => {
                        volley.tick(routine_input, actuator, animation, &mut self.flags)
                    }
                    ActiveRoutine::None => RoutineStatus::Completed,
                };
                if status.is_done() {
                    self.routine = ActiveRoutine::None;
                    self.enter_chase();
                } else if self.flags.movement_locked {
                    actuator.move_in(Vec2::ZERO);
                }
            }
        }

        self.fsm.current()
    }

    fn on_enter(&mut self, change: StateChange<BossState>, actuator: &mut dyn Actuator) {
        match change.to {
            BossState::Dead => {
                log::info!("Boss defeated");
                self.cancel_routine(actuator);
                actuator.move_in(Vec2::ZERO);
                self.pilot.stop(&mut self.sensed);
            }
            BossState::Idle => {
                self.pilot.stop(&mut self.sensed);
            }
            _ => {}
        }
    }

    fn enter_chase(&mut self) {
        self.decision_timer = self.config.tuning(self.phase).decision_delay;
        self.fsm.force_transition(BossState::Chase);
    }

    fn chase(&mut self, delta_time: f32, target: Option<Vec2>, actuator: &mut dyn Actuator) {
        if let Some(target) = target {
            actuator.look_at(target);
        }

        if self.flags.movement_locked {
            actuator.move_in(Vec2::ZERO);
            return;
        }

        self.decision_timer -= delta_time;
        if self.decision_timer <= 0.0 && self.flags.can_attack {
            let tuning = self.config.tuning(self.phase).clone();
            self.decision_timer = tuning.decision_delay;

            if self.rng.gen::<f32>() < tuning.melee_chance {
                self.pilot.stop(&mut self.sensed);
                let melee = MeleeRoutine::start(self.config.melee.clone(), &mut self.flags);
                self.routine = ActiveRoutine::Melee(melee);
                self.fsm.force_transition(BossState::Melee);
                return;
            }
            if self.ranged_cooldown <= 0.0 {
                self.ranged_cooldown = tuning.ranged_cooldown;
                self.pilot.stop(&mut self.sensed);
                let volley =
                    VolleyRoutine::start(self.config.volley.clone(), &mut self.rng, &mut self.flags);
                self.routine = ActiveRoutine::Volley(volley);
                self.fsm.force_transition(BossState::Ranged);
                return;
            }
        }

        let direction = self.pilot.steer(delta_time, &mut self.sensed);
        actuator.move_in(direction);
    }
}
