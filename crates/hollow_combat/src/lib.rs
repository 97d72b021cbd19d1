//! Hollow Combat - Health and Hits
//!
//! Vitals shared by the player, grunts and the boss. The boss brain
//! reads [`Health::ratio`] to pick its phase.
//!
//! # Example
//!
//! ```ignore
//! use hollow_combat::prelude::*;
//!
//! let mut health = Health::new(100.0).with_invulnerability_on_hit(0.5);
//! let (dealt, died) = health.apply_damage(25.0);
//!
//! for event in health.update(dt) {
//!     log::info!("{:?}", event);
//! }
//! ```

pub mod health;

pub mod prelude {
    pub use crate::health::{Health, HealthEvent};
}

pub use prelude::*;
