//! Hollow Sim - Headless Arena
//!
//! Loads a TOML scenario, builds a kinematic arena around it and runs
//! the Hollow AI against a scripted player at a fixed tick rate.

pub mod arena;
pub mod error;
pub mod scenario;

pub use arena::{Arena, Summary};
pub use error::{Result, SimError};
pub use scenario::Scenario;
