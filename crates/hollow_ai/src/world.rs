//! World queries consumed by detectors and brains
//!
//! The host game owns physics; the AI only sees it through
//! [`WorldQuery`]. [`StaticWorld`] is a small in-memory implementation
//! for tests and headless tools.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::handle::EntityId;

/// Bit mask selecting query layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);
    pub const PLAYER: Self = Self::layer(1);
    pub const ENEMIES: Self = Self::layer(2);
    pub const PROJECTILES: Self = Self::layer(3);
    pub const WALLS: Self = Self::layer(5);
    pub const OBSTACLES: Self = Self::layer(6);

    /// Mask with a single layer bit set
    pub const fn layer(id: u32) -> Self {
        Self(1 << id)
    }

    /// Layers in either mask
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the masks share a layer
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Obstacle geometry seen by avoidance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Circle { center: Vec2, radius: f32 },
    Aabb { min: Vec2, max: Vec2 },
}

impl Obstacle {
    /// Circle from its center and radius
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::Circle { center, radius }
    }

    /// Axis-aligned box from its center and half extents
    pub fn aabb(center: Vec2, half_extents: Vec2) -> Self {
        Self::Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Closest point on (or in) the shape to `point`
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        match *self {
            Obstacle::Circle { center, radius } => {
                let offset = point - center;
                let distance = offset.length();
                if distance <= radius {
                    point
                } else {
                    center + offset / distance * radius
                }
            }
            Obstacle::Aabb { min, max } => point.clamp(min, max),
        }
    }

    /// Distance from `point` to the shape, zero inside it
    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.closest_point(point).distance(point)
    }

    pub fn center(&self) -> Vec2 {
        match *self {
            Obstacle::Circle { center, .. } => center,
            Obstacle::Aabb { min, max } => (min + max) * 0.5,
        }
    }

    /// Distance along a ray to the shape surface, if hit within `max_distance`
    pub fn ray_distance(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<f32> {
        let dir = direction.try_normalize()?;
        match *self {
            Obstacle::Circle { center, radius } => {
                let to_origin = origin - center;
                let b = to_origin.dot(dir);
                let c = to_origin.length_squared() - radius * radius;
                if c <= 0.0 {
                    return Some(0.0);
                }
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let t = -b - disc.sqrt();
                (t >= 0.0 && t <= max_distance).then_some(t)
            }
            Obstacle::Aabb { min, max } => {
                let mut t_min = 0.0f32;
                let mut t_max = max_distance;
                for axis in 0..2 {
                    let (o, d, lo, hi) = (origin[axis], dir[axis], min[axis], max[axis]);
                    if d.abs() < 1e-8 {
                        if o < lo || o > hi {
                            return None;
                        }
                    } else {
                        let inv = 1.0 / d;
                        let (t1, t2) = ((lo - o) * inv, (hi - o) * inv);
                        t_min = t_min.max(t1.min(t2));
                        t_max = t_max.min(t1.max(t2));
                        if t_min > t_max {
                            return None;
                        }
                    }
                }
                Some(t_min)
            }
        }
    }
}

/// Entity found by an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub id: EntityId,
    pub position: Vec2,
}

/// Result of a raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Entity hit, `None` for static geometry
    pub id: Option<EntityId>,
    pub point: Vec2,
    pub distance: f32,
}

/// Physics-side queries the AI relies on
pub trait WorldQuery {
    /// Entities on `mask` whose position lies within `radius` of `center`
    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<Hit>;

    /// Obstacle shapes on `mask` touching the circle
    fn overlap_obstacles(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<Obstacle>;

    /// First thing on `mask` along the ray
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, mask: LayerMask)
        -> Option<RayHit>;

    /// Current position of an entity, `None` once it no longer exists
    fn position_of(&self, id: EntityId) -> Option<Vec2>;
}

#[derive(Debug, Clone)]
struct StaticEntity {
    id: EntityId,
    position: Vec2,
    radius: f32,
    layers: LayerMask,
}

#[derive(Debug, Clone)]
struct StaticObstacle {
    shape: Obstacle,
    layers: LayerMask,
}

/// In-memory world with explicit entities and obstacles
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    entities: Vec<StaticEntity>,
    obstacles: Vec<StaticObstacle>,
}

impl StaticWorld {
    /// Empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or move an entity
    pub fn set_entity(&mut self, id: EntityId, position: Vec2, layers: LayerMask) {
        self.set_entity_with_radius(id, position, 0.25, layers);
    }

    /// Add or move an entity with an explicit body radius
    pub fn set_entity_with_radius(
        &mut self,
        id: EntityId,
        position: Vec2,
        radius: f32,
        layers: LayerMask,
    ) {
        match self.entities.iter_mut().find(|e| e.id == id) {
            Some(entity) => {
                entity.position = position;
                entity.radius = radius;
                entity.layers = layers;
            }
            None => self.entities.push(StaticEntity {
                id,
                position,
                radius,
                layers,
            }),
        }
    }

    /// Unknown ids are ignored
    pub fn move_entity(&mut self, id: EntityId, position: Vec2) {
        if let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) {
            entity.position = position;
        }
    }

    /// Remove an entity; queries stop reporting it
    pub fn remove_entity(&mut self, id: EntityId) {
        self.entities.retain(|e| e.id != id);
    }

    pub fn add_obstacle(&mut self, shape: Obstacle, layers: LayerMask) {
        self.obstacles.push(StaticObstacle { shape, layers });
    }

    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear();
    }
}

impl WorldQuery for StaticWorld {
    fn overlap_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<Hit> {
        self.entities
            .iter()
            .filter(|e| e.layers.intersects(mask))
            .filter(|e| e.position.distance(center) <= radius)
            .map(|e| Hit {
                id: e.id,
                position: e.position,
            })
            .collect()
    }

    fn overlap_obstacles(&self, center: Vec2, radius: f32, mask: LayerMask) -> Vec<Obstacle> {
        self.obstacles
            .iter()
            .filter(|o| o.layers.intersects(mask))
            .filter(|o| o.shape.distance_to(center) <= radius)
            .map(|o| o.shape)
            .collect()
    }

    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize()?;

        let obstacle_hits = self
            .obstacles
            .iter()
            .filter(|o| o.layers.intersects(mask))
            .filter_map(|o| o.shape.ray_distance(origin, dir, max_distance))
            .map(|distance| RayHit {
                id: None,
                point: origin + dir * distance,
                distance,
            });

        let entity_hits = self
            .entities
            .iter()
            .filter(|e| e.layers.intersects(mask))
            .filter_map(|e| {
                Obstacle::circle(e.position, e.radius)
                    .ray_distance(origin, dir, max_distance)
                    .map(|distance| RayHit {
                        id: Some(e.id),
                        point: origin + dir * distance,
                        distance,
                    })
            });

        obstacle_hits
            .chain(entity_hits)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn position_of(&self, id: EntityId) -> Option<Vec2> {
        self.entities.iter().find(|e| e.id == id).map(|e| e.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::PLAYER.union(LayerMask::ENEMIES);
        assert!(mask.intersects(LayerMask::PLAYER));
        assert!(!mask.intersects(LayerMask::WALLS));
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }

    #[test]
    fn test_closest_point_circle() {
        let circle = Obstacle::circle(Vec2::new(5.0, 0.0), 1.0);
        let p = circle.closest_point(Vec2::ZERO);
        assert_abs_diff_eq!(p.x, 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(circle.distance_to(Vec2::ZERO), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_closest_point_aabb() {
        let block = Obstacle::aabb(Vec2::new(0.0, 3.0), Vec2::splat(1.0));
        assert_abs_diff_eq!(block.distance_to(Vec2::ZERO), 2.0, epsilon = 1e-5);
        assert_eq!(block.distance_to(Vec2::new(0.5, 3.0)), 0.0);
    }

    #[test]
    fn test_ray_distance() {
        let circle = Obstacle::circle(Vec2::new(5.0, 0.0), 1.0);
        let t = circle.ray_distance(Vec2::ZERO, Vec2::X, 10.0).unwrap();
        assert_abs_diff_eq!(t, 4.0, epsilon = 1e-5);
        assert!(circle.ray_distance(Vec2::ZERO, Vec2::Y, 10.0).is_none());
        assert!(circle.ray_distance(Vec2::ZERO, Vec2::X, 3.0).is_none());

        let block = Obstacle::aabb(Vec2::new(0.0, 3.0), Vec2::splat(1.0));
        let t = block.ray_distance(Vec2::ZERO, Vec2::Y, 10.0).unwrap();
        assert_abs_diff_eq!(t, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_static_world_overlap_respects_mask() {
        let mut world = StaticWorld::new();
        world.set_entity(EntityId::from_index(1), Vec2::new(1.0, 0.0), LayerMask::PLAYER);
        world.set_entity(EntityId::from_index(2), Vec2::new(0.0, 1.0), LayerMask::ENEMIES);

        let hits = world.overlap_circle(Vec2::ZERO, 2.0, LayerMask::PLAYER);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, EntityId::from_index(1));
    }

    #[test]
    fn test_static_world_raycast_nearest() {
        let mut world = StaticWorld::new();
        world.add_obstacle(
            Obstacle::aabb(Vec2::new(3.0, 0.0), Vec2::splat(0.5)),
            LayerMask::WALLS,
        );
        world.set_entity(EntityId::from_index(1), Vec2::new(6.0, 0.0), LayerMask::PLAYER);

        let hit = world
            .raycast(Vec2::ZERO, Vec2::X, 10.0, LayerMask::WALLS.union(LayerMask::PLAYER))
            .unwrap();
        assert_eq!(hit.id, None);
        assert_abs_diff_eq!(hit.distance, 2.5, epsilon = 1e-5);

        let hit = world.raycast(Vec2::ZERO, Vec2::X, 10.0, LayerMask::PLAYER).unwrap();
        assert_eq!(hit.id, Some(EntityId::from_index(1)));
    }

    #[test]
    fn test_position_of_removed_entity() {
        let mut world = StaticWorld::new();
        let id = EntityId::from_index(9);
        world.set_entity(id, Vec2::ONE, LayerMask::PLAYER);
        assert_eq!(world.position_of(id), Some(Vec2::ONE));
        world.remove_entity(id);
        assert_eq!(world.position_of(id), None);
    }
}
