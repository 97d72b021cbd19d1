//! Movement decisions shared by the brains
//!
//! A [`Pilot`] owns an agent's steering pipeline and, when a
//! [`PathService`] is attached, a [`PathFollower`] that feeds waypoints
//! toward the current target into the sensed world before steering
//! runs. Without a path (none attached, or no route found) the
//! behaviours steer directly.

use glam::Vec2;

use crate::navigation::{PathFollower, PathFollowerConfig, PathService};
use crate::perception::SensedWorld;
use crate::steering::ContextSteering;

/// Steering plus optional path following for one agent
pub struct Pilot {
    steering: ContextSteering,
    paths: Option<(PathService, PathFollower)>,
}

impl Pilot {
    /// Pilot that steers directly, without paths
    pub fn new(steering: ContextSteering) -> Self {
        Self {
            steering,
            paths: None,
        }
    }

    /// Route through `service` before steering
    pub fn attach_paths(&mut self, service: PathService, config: PathFollowerConfig) {
        self.paths = Some((service, PathFollower::new(config)));
    }

    /// Whether a path service is attached
    pub fn has_paths(&self) -> bool {
        self.paths.is_some()
    }

    pub fn steering(&self) -> &ContextSteering {
        &self.steering
    }

    /// Direction toward the current target, or zero
    pub fn steer(&mut self, delta_time: f32, sensed: &mut SensedWorld) -> Vec2 {
        if let Some((service, follower)) = &mut self.paths {
            let destination = sensed.current_target_position();
            follower.tick(delta_time, service, sensed, destination);
        }
        self.steering.decide(sensed)
    }

    /// Forget any path in progress
    pub fn stop(&mut self, sensed: &mut SensedWorld) {
        if let Some((_, follower)) = &mut self.paths {
            follower.clear(sensed);
        }
        sensed.current_waypoint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridConfig, LayeredTiles, NavGrid};
    use crate::handle::EntityId;
    use crate::steering::{PathFollowing, PathFollowingConfig, Seek, SeekConfig};
    use crate::direction::Directions;

    fn sensed_at(position: Vec2, target: Vec2) -> SensedWorld {
        let mut sensed = SensedWorld::new(position);
        sensed.begin_detection();
        sensed.observe_target(EntityId::from_index(1), target);
        sensed.end_detection();
        sensed.ensure_current_target();
        sensed
    }

    #[test]
    fn test_direct_steering_without_paths() {
        let steering = ContextSteering::eight_way().with_behaviour(Seek::new(SeekConfig::default()));
        let mut pilot = Pilot::new(steering);
        let mut sensed = sensed_at(Vec2::ZERO, Vec2::new(5.0, 0.0));
        assert_eq!(pilot.steer(0.1, &mut sensed), Directions::eight()[2]);
        assert_eq!(sensed.current_waypoint, None);
    }

    #[test]
    fn test_path_bends_route_around_wall() {
        // Target due east behind a wall; the path leads around it
        let tiles = LayeredTiles::from_rows(&[".....", "..#..", "..#..", "....."]);
        let grid = NavGrid::build(GridConfig::default(), &tiles).unwrap();

        let steering = ContextSteering::eight_way()
            .with_behaviour(PathFollowing::new(PathFollowingConfig::default()));
        let mut pilot = Pilot::new(steering);
        pilot.attach_paths(PathService::new(grid), PathFollowerConfig::default());

        let mut sensed = sensed_at(Vec2::new(1.5, 1.5), Vec2::new(3.5, 1.5));
        let dir = pilot.steer(0.1, &mut sensed);
        assert!(sensed.current_waypoint.is_some());
        assert_ne!(dir, Directions::eight()[2]);
        assert_ne!(dir, Vec2::ZERO);

        pilot.stop(&mut sensed);
        assert_eq!(sensed.current_waypoint, None);
    }
}
