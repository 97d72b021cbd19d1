//! Grunt enemy brain
//!
//! Chases with context steering, rolls for melee swings when close,
//! backs off when crowded and can be stunned.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::actuator::Actuator;
use crate::error::{AiError, Result};
use crate::handle::EntityId;
use crate::navigation::{PathFollowerConfig, PathService};
use crate::perception::{Perception, PerceptionConfig, SensedWorld};
use crate::pilot::Pilot;
use crate::routine::CombatFlags;
use crate::state_machine::{StateChange, StateMachine};
use crate::steering::{ContextSteering, SteeringConfig};
use crate::world::{LayerMask, WorldQuery};

/// Grunt states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyState {
    Idle,
    Chase,
    Attack,
    Retreat,
    Stunned,
}

/// Grunt tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Seconds between decisions
    pub decision_interval: f32,
    pub attack_distance: f32,
    /// Seconds between swings while attacking
    pub attack_delay: f32,
    /// Chance to commit to an attack when in range
    pub attack_chance: f32,
    /// Seconds between attack rolls
    pub attack_decision_cooldown: f32,
    pub retreat_enabled: bool,
    /// Retreat when closer than `attack_distance * retreat_ratio`
    pub retreat_ratio: f32,
    /// How far behind to look for walls before backing off
    pub wall_check_distance: f32,
    /// Leave Attack beyond `attack_distance * attack_exit_factor`
    pub attack_exit_factor: f32,
    /// Leave Retreat beyond `retreat distance * retreat_exit_factor`
    pub retreat_exit_factor: f32,
    /// Fixed seed for repeatable runs
    pub seed: Option<u64>,
    pub perception: PerceptionConfig,
    pub steering: SteeringConfig,
    pub path: PathFollowerConfig,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            decision_interval: 0.06,
            attack_distance: 0.5,
            attack_delay: 1.0,
            attack_chance: 0.5,
            attack_decision_cooldown: 0.3,
            retreat_enabled: false,
            retreat_ratio: 0.6,
            wall_check_distance: 1.0,
            attack_exit_factor: 1.1,
            retreat_exit_factor: 1.25,
            seed: None,
            perception: PerceptionConfig::default(),
            steering: SteeringConfig::default(),
            path: PathFollowerConfig::default(),
        }
    }
}

impl EnemyConfig {
    /// Fixed seed for repeatable runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_attack_chance(mut self, chance: f32) -> Self {
        self.attack_chance = chance;
        self
    }

    /// Enable backing off when the target gets too close
    pub fn with_retreat(mut self, enabled: bool) -> Self {
        self.retreat_enabled = enabled;
        self
    }

    /// Distance under which the grunt backs off
    pub fn retreat_distance(&self) -> f32 {
        self.attack_distance * self.retreat_ratio
    }

    /// Check ranges and nested sections
    pub fn validate(&self) -> Result<()> {
        if self.decision_interval <= 0.0 || self.attack_distance <= 0.0 {
            return Err(AiError::config(
                "enemy decision_interval and attack_distance must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.attack_chance) {
            return Err(AiError::config(format!(
                "attack_chance must be in [0, 1], got {}",
                self.attack_chance
            )));
        }
        if !(0.0..1.0).contains(&self.retreat_ratio) {
            return Err(AiError::config("retreat_ratio must be in [0, 1)"));
        }
        if self.attack_exit_factor < 1.0 || self.retreat_exit_factor < 1.0 {
            return Err(AiError::config("exit factors must be at least 1"));
        }
        self.perception.validate()?;
        self.steering.validate()?;
        self.path.validate()
    }
}

/// What the condition transitions look at
#[derive(Debug, Clone, Copy)]
pub struct EnemyView {
    pub has_target: bool,
    /// Distance to the current target, infinite without one
    pub distance: f32,
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

fn enemy_fsm(config: &EnemyConfig) -> StateMachine<EnemyState, EnemyView> {
    use EnemyState::*;

    let mut fsm = StateMachine::new(Idle).with_label("enemy");
    fsm.add_transition(Idle, Chase, |v: &EnemyView| v.has_target);
    for from in [Chase, Attack, Retreat] {
        fsm.add_transition_priority(from, Idle, |v: &EnemyView| !v.has_target, 10);
    }

    if config.retreat_enabled {
        let retreat_at = config.retreat_distance();
        fsm.add_transition_priority(Chase, Retreat, move |v: &EnemyView| v.distance < retreat_at, 5);
        fsm.add_transition_priority(Attack, Retreat, move |v: &EnemyView| v.distance < retreat_at, 5);

        let leave_retreat = retreat_at * config.retreat_exit_factor;
        fsm.add_transition(Retreat, Chase, move |v: &EnemyView| v.distance > leave_retreat);
    }

    let leave_attack = config.attack_distance * config.attack_exit_factor;
    fsm.add_transition(Attack, Chase, move |v: &EnemyView| v.distance > leave_attack);
    fsm
}

/// Decision maker for one grunt
pub struct EnemyBrain {
    config: EnemyConfig,
    fsm: StateMachine<EnemyState, EnemyView>,
    perception: Perception,
    sensed: SensedWorld,
    pilot: Pilot,
    rng: StdRng,
    flags: CombatFlags,
    decision_timer: f32,
    attack_timer: f32,
    attack_roll_timer: f32,
    stun_timer: f32,
    retreat_side: f32,
    move_direction: Vec2,
}

impl EnemyBrain {
    /// Validate `config` and build a grunt idling at `position`
    pub fn new(config: EnemyConfig, own_id: Option<EntityId>, position: Vec2) -> Result<Self> {
        config.validate()?;

        let mut rng = make_rng(config.seed);
        let steering = ContextSteering::from_config(&config.steering, &mut rng)?;
        let retreat_side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };

        Ok(Self {
            fsm: enemy_fsm(&config),
            perception: Perception::from_config(&config.perception, own_id),
            sensed: SensedWorld::new(position)
                .with_memory_duration(config.perception.memory_duration),
            pilot: Pilot::new(steering),
            rng,
            flags: CombatFlags::default(),
            decision_timer: 0.0,
            attack_timer: 0.0,
            attack_roll_timer: 0.0,
            stun_timer: 0.0,
            retreat_side,
            move_direction: Vec2::ZERO,
            config,
        })
    }

    /// Follow grid paths while chasing
    pub fn with_path_service(mut self, service: PathService) -> Self {
        self.pilot.attach_paths(service, self.config.path.clone());
        self
    }

    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> EnemyState {
        self.fsm.current()
    }

    /// What the grunt currently perceives
    pub fn sensed(&self) -> &SensedWorld {
        &self.sensed
    }

    /// Direction re-issued to the actuator every tick
    pub fn move_direction(&self) -> Vec2 {
        self.move_direction
    }

    /// Attack flags; the body stays put while `movement_locked`
    pub fn flags(&self) -> CombatFlags {
        self.flags
    }

    pub fn is_stunned(&self) -> bool {
        self.fsm.is_in(EnemyState::Stunned)
    }

    /// Interrupt everything and stand still for `duration` seconds
    pub fn apply_stun(&mut self, duration: f32, actuator: &mut dyn Actuator) {
        actuator.cancel_attack();
        actuator.move_in(Vec2::ZERO);
        self.move_direction = Vec2::ZERO;
        self.flags.is_attacking = false;
        self.flags.movement_locked = false;
        self.stun_timer = self.stun_timer.max(duration);
        self.pilot.stop(&mut self.sensed);
        self.fsm.force_transition(EnemyState::Stunned);
    }

    /// Run one frame
    pub fn tick(
        &mut self,
        delta_time: f32,
        position: Vec2,
        world: &dyn WorldQuery,
        actuator: &mut dyn Actuator,
    ) -> EnemyState {
        self.sensed.position = position;
        self.perception.tick(delta_time, world, &mut self.sensed);
        self.sensed.ensure_current_target();

        let target = self.sensed.current_target_position();
        if let (Some(target), false) = (target, self.is_stunned()) {
            actuator.look_at(target);
            if let Some(facing) = (target - position).try_normalize() {
                self.sensed.facing = facing;
            }
        }

        self.attack_timer -= delta_time;
        if self.attack_timer <= 0.0 && !self.flags.can_attack {
            self.flags.can_attack = true;
            self.flags.is_attacking = false;
        }
        self.attack_roll_timer -= delta_time;
        self.decision_timer -= delta_time;
        if self.decision_timer <= 0.0 {
            self.decision_timer = self.config.decision_interval;
            self.decide(world, actuator);
        }

        if self.flags.movement_locked {
            self.move_direction = Vec2::ZERO;
        }
        actuator.move_in(self.move_direction);
        self.fsm.current()
    }

    fn view(&self) -> EnemyView {
        let distance = self
            .sensed
            .current_target_position()
            .map_or(f32::INFINITY, |t| t.distance(self.sensed.position));
        EnemyView {
            has_target: self.sensed.current_target().is_some(),
            distance,
        }
    }

    fn decide(&mut self, world: &dyn WorldQuery, actuator: &mut dyn Actuator) {
        let interval = self.config.decision_interval;
        let view = self.view();

        if self.is_stunned() {
            self.move_direction = Vec2::ZERO;
            self.stun_timer -= interval;
            if self.stun_timer <= 0.0 {
                self.stun_timer = 0.0;
                let next = if view.has_target {
                    EnemyState::Chase
                } else {
                    EnemyState::Idle
                };
                self.fsm.force_transition(next);
            }
            return;
        }

        if let Some(change) = self.fsm.update(&view, interval) {
            self.on_enter(change);
        }

        match self.fsm.current() {
            EnemyState::Idle | EnemyState::Stunned => self.move_direction = Vec2::ZERO,
            EnemyState::Chase => self.chase(view, interval),
            EnemyState::Attack => {
                self.move_direction = Vec2::ZERO;
                self.swing_when_ready(actuator);
            }
            EnemyState::Retreat => self.retreat(world, actuator),
        }
    }

    fn on_enter(&mut self, change: StateChange<EnemyState>) {
        if change.from == EnemyState::Attack {
            self.flags.movement_locked = false;
        }
        if change.to == EnemyState::Idle {
            self.move_direction = Vec2::ZERO;
            self.pilot.stop(&mut self.sensed);
        }
    }

    fn chase(&mut self, view: EnemyView, interval: f32) {
        if view.distance < self.config.attack_distance && self.attack_roll_timer <= 0.0 {
            self.attack_roll_timer = self.config.attack_decision_cooldown;
            if self.rng.gen::<f32>() < self.config.attack_chance {
                self.move_direction = Vec2::ZERO;
                self.flags.movement_locked = true;
                self.fsm.force_transition(EnemyState::Attack);
                return;
            }
        }
        self.move_direction = self.pilot.steer(interval, &mut self.sensed);
    }

    fn swing_when_ready(&mut self, actuator: &mut dyn Actuator) {
        if self.flags.can_attack {
            actuator.attack();
            self.flags.begin_attack();
            self.attack_timer = self.config.attack_delay;
        }
    }

    fn retreat(&mut self, world: &dyn WorldQuery, actuator: &mut dyn Actuator) {
        let Some(target) = self.sensed.current_target_position() else {
            self.move_direction = Vec2::ZERO;
            return;
        };

        let position = self.sensed.position;
        let away = (position - target).try_normalize().unwrap_or(-self.sensed.facing);
        let blocked = world
            .raycast(position, away, self.config.wall_check_distance, LayerMask::WALLS)
            .is_some();

        if blocked {
            self.move_direction = Vec2::ZERO;
            self.swing_when_ready(actuator);
        } else {
            let side = away.perp() * self.retreat_side;
            self.move_direction = (away * 0.7 + side * 0.3).normalize_or_zero();
        }
    }
}
