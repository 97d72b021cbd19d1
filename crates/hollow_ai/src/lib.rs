//! Hollow AI - Steering, Navigation and Combat Brains
//!
//! This crate drives the enemies of Hollow, a top-down action game.
//!
//! # Features
//!
//! - Context steering over a fixed table of directions
//! - Pluggable steering behaviours (avoidance, separation, strafing, seek, path following)
//! - Periodic perception with short-term target memory
//! - Grid navigation graph built from tile layers, with A* search
//! - Generic finite state machine
//! - Enemy and boss brains with timed attack routines and boss phases
//!
//! # Architecture
//!
//! ```text
//!   WorldQuery ──► Perception ──► SensedWorld ──► ContextSteering ──► direction
//!                                     ▲                │
//!                     PathFollower ───┘                ▼
//!                         ▲                       EnemyBrain / BossBrain ──► Actuator
//!                    PathService (NavGrid + A*)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hollow_ai::prelude::*;
//!
//! let tiles = LayeredTiles::from_rows(&[".....", "..#..", "....."]);
//! let paths = PathService::new(NavGrid::build(GridConfig::default(), &tiles)?);
//!
//! let mut brain = EnemyBrain::new(EnemyConfig::default(), id, spawn)?
//!     .with_path_service(paths.clone());
//! let state = brain.tick(dt, position, &world, &mut actuator);
//! ```

pub mod actuator;
pub mod boss;
pub mod config;
pub mod context;
pub mod direction;
pub mod enemy;
pub mod error;
pub mod grid;
pub mod handle;
pub mod navigation;
pub mod perception;
pub mod pilot;
pub mod routine;
pub mod state_machine;
pub mod steering;
pub mod world;

pub use error::{AiError, Result};

pub mod prelude {
    pub use crate::actuator::{Actuator, AnimationProgress, Command, NoAnimation, RecordingActuator};
    pub use crate::boss::{BossBrain, BossConfig, BossPhase, BossState, BossTick, PhaseMode};
    pub use crate::config::AiConfig;
    pub use crate::context::{ContextMap, ContextSolver, Resolution, SolverConfig};
    pub use crate::direction::Directions;
    pub use crate::enemy::{EnemyBrain, EnemyConfig, EnemyState};
    pub use crate::error::{AiError, Result};
    pub use crate::grid::{GridConfig, LayeredTiles, NavGrid, NodeId, TileClassifier};
    pub use crate::handle::EntityId;
    pub use crate::navigation::{find_path, PathFollower, PathFollowerConfig, PathService};
    pub use crate::perception::{Perception, PerceptionConfig, SensedWorld};
    pub use crate::routine::{CombatFlags, MeleeConfig, VolleyConfig};
    pub use crate::state_machine::{State, StateChange, StateMachine, Transition};
    pub use crate::steering::{ContextSteering, SteeringBehaviour, SteeringConfig};
    pub use crate::world::{LayerMask, Obstacle, StaticWorld, WorldQuery};
}
