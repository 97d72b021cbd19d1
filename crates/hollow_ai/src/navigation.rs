//! Path search and path following over a [`NavGrid`]

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::{RwLock, RwLockReadGuard};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::grid::{NavGrid, NodeId, TileClassifier};
use crate::perception::SensedWorld;

/// Working state for one node during one search
#[derive(Debug, Clone, Copy)]
struct SearchRecord {
    cost_so_far: f32,
    parent: Option<NodeId>,
    closed: bool,
}

impl Default for SearchRecord {
    fn default() -> Self {
        Self {
            cost_so_far: f32::INFINITY,
            parent: None,
            closed: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    node: NodeId,
    estimate: f32,
    seq: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // Reversed so the max-heap pops the lowest estimate, oldest first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .partial_cmp(&self.estimate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A* from `start` to `goal`
///
/// The path excludes `start` and ends with `goal`. It is empty when the
/// goal is unreachable or equal to the start.
pub fn find_path(grid: &NavGrid, start: NodeId, goal: NodeId) -> Result<Vec<NodeId>> {
    let start_pos = grid.position(start)?;
    let goal_pos = grid.position(goal)?;
    if start == goal {
        return Ok(Vec::new());
    }

    let mut records = vec![SearchRecord::default(); grid.node_count()];
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    records[start.index()].cost_so_far = 0.0;
    open.push(OpenEntry {
        node: start,
        estimate: start_pos.distance(goal_pos),
        seq,
    });

    while let Some(current) = open.pop() {
        if current.node == goal {
            return Ok(reconstruct(&records, start, goal));
        }

        let record = &mut records[current.node.index()];
        if record.closed {
            continue;
        }
        record.closed = true;
        let current_cost = record.cost_so_far;

        let node = &grid.nodes()[current.node.index()];
        for &neighbour in node.neighbours() {
            let next = &grid.nodes()[neighbour.index()];
            let entry = &mut records[neighbour.index()];
            if entry.closed {
                continue;
            }

            let tentative = current_cost + node.position.distance(next.position);
            if tentative < entry.cost_so_far {
                entry.cost_so_far = tentative;
                entry.parent = Some(current.node);
                seq += 1;
                open.push(OpenEntry {
                    node: neighbour,
                    estimate: tentative + next.position.distance(goal_pos),
                    seq,
                });
            }
        }
    }

    Ok(Vec::new())
}

fn reconstruct(records: &[SearchRecord], start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(parent) = records[current.index()].parent {
        if parent == start {
            break;
        }
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Sum of segment lengths along a node path, starting at `start`
pub fn path_length(grid: &NavGrid, start: NodeId, path: &[NodeId]) -> Result<f32> {
    let mut previous = grid.position(start)?;
    let mut total = 0.0;
    for id in path {
        let position = grid.position(*id)?;
        total += previous.distance(position);
        previous = position;
    }
    Ok(total)
}

/// Shared handle to a navigation grid
///
/// Cloning is cheap. Any number of searches may run at once; a rebuild
/// waits for them and blocks new ones until it is done.
#[derive(Debug, Clone)]
pub struct PathService {
    grid: Arc<RwLock<NavGrid>>,
}

impl PathService {
    /// Share `grid` between all clones of the service
    pub fn new(grid: NavGrid) -> Self {
        Self {
            grid: Arc::new(RwLock::new(grid)),
        }
    }

    /// Read access to the grid
    pub fn grid(&self) -> RwLockReadGuard<'_, NavGrid> {
        self.grid.read()
    }

    /// A* between two nodes under a read lock
    pub fn find_path(&self, start: NodeId, goal: NodeId) -> Result<Vec<NodeId>> {
        let grid = self.grid.read();
        let path = find_path(&grid, start, goal)?;
        if path.is_empty() && start != goal {
            log::debug!("No path from {} to {}", start, goal);
        }
        Ok(path)
    }

    /// World waypoints between the nodes nearest to two positions
    pub fn path_between(&self, from: Vec2, to: Vec2) -> Vec<Vec2> {
        let grid = self.grid.read();
        let (Some(start), Some(goal)) = (grid.nearest_node(from), grid.nearest_node(to)) else {
            log::warn!("Path requested on an empty grid");
            return Vec::new();
        };

        match find_path(&grid, start, goal) {
            Ok(nodes) => nodes
                .into_iter()
                .map(|id| grid.nodes()[id.index()].position)
                .collect(),
            Err(e) => {
                log::warn!("Path search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Node closest to a world position
    pub fn nearest_node(&self, position: Vec2) -> Option<NodeId> {
        self.grid.read().nearest_node(position)
    }

    /// Node farthest from a world position, for fleeing
    pub fn furthest_node(&self, position: Vec2) -> Option<NodeId> {
        self.grid.read().furthest_node(position)
    }

    pub fn position(&self, id: NodeId) -> Result<Vec2> {
        self.grid.read().position(id)
    }

    /// Uniformly random node, for patrols
    pub fn random_node(&self, rng: &mut impl Rng) -> Option<NodeId> {
        let grid = self.grid.read();
        if grid.is_empty() {
            return None;
        }
        Some(NodeId(rng.gen_range(0..grid.node_count()) as u32))
    }

    pub fn node_count(&self) -> usize {
        self.grid.read().node_count()
    }

    /// Regenerate the grid; waits for in-flight searches
    pub fn rebuild(&self, tiles: &dyn TileClassifier) {
        let mut grid = self.grid.write();
        grid.rebuild(tiles);
        log::info!("Navigation grid rebuilt with {} nodes", grid.node_count());
    }
}

/// Path follower timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFollowerConfig {
    /// Seconds between forced re-plans
    pub repath_interval: f32,
    /// Re-plan early when the destination moves this far from the path end
    pub retarget_distance: f32,
    /// A waypoint this close counts as reached
    pub reach_threshold: f32,
}

impl Default for PathFollowerConfig {
    fn default() -> Self {
        Self {
            repath_interval: 1.0,
            retarget_distance: 1.0,
            reach_threshold: 0.2,
        }
    }
}

impl PathFollowerConfig {
    /// All distances and intervals must be positive
    pub fn validate(&self) -> Result<()> {
        if self.repath_interval <= 0.0 {
            return Err(AiError::config("repath_interval must be positive"));
        }
        if self.retarget_distance < 0.0 || self.reach_threshold < 0.0 {
            return Err(AiError::config("path follower distances must not be negative"));
        }
        Ok(())
    }
}

/// Walks an agent along grid paths toward a moving destination
#[derive(Debug, Clone, Default)]
pub struct PathFollower {
    pub config: PathFollowerConfig,
    path: Vec<Vec2>,
    index: usize,
    timer: f32,
    planned_for: Option<Vec2>,
}

impl PathFollower {
    /// Follower with no path yet
    pub fn new(config: PathFollowerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Waypoints of the active path
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    /// Next waypoint to walk to
    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.path.get(self.index).copied()
    }

    /// True once every waypoint was reached, or with no path
    pub fn is_finished(&self) -> bool {
        self.index >= self.path.len()
    }

    /// Drop the current path and forget the destination
    pub fn clear(&mut self, sensed: &mut SensedWorld) {
        self.path.clear();
        self.index = 0;
        self.timer = 0.0;
        self.planned_for = None;
        sensed.current_waypoint = None;
    }

    /// Re-plan if due, advance along the path and publish the waypoint
    pub fn tick(
        &mut self,
        delta_time: f32,
        service: &PathService,
        sensed: &mut SensedWorld,
        destination: Option<Vec2>,
    ) -> Option<Vec2> {
        let Some(destination) = destination else {
            self.clear(sensed);
            return None;
        };

        self.timer -= delta_time;
        let drifted = self
            .planned_for
            .map_or(true, |p| p.distance(destination) > self.config.retarget_distance);

        if self.timer <= 0.0 || drifted {
            self.path = service.path_between(sensed.position, destination);
            self.index = 0;
            self.timer = self.config.repath_interval;
            self.planned_for = Some(destination);
            log::trace!("Planned {} waypoints toward {}", self.path.len(), destination);
        }

        while let Some(waypoint) = self.path.get(self.index) {
            if sensed.position.distance(*waypoint) >= self.config.reach_threshold {
                break;
            }
            self.index += 1;
        }

        let waypoint = self.current_waypoint();
        sensed.current_waypoint = waypoint;
        waypoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellBounds, GridConfig, LayeredTiles};
    use approx::assert_relative_eq;
    use glam::IVec2;

    fn open(width: i32, height: i32) -> NavGrid {
        NavGrid::build(
            GridConfig::default(),
            &LayeredTiles::open(CellBounds::from_size(width, height)),
        )
        .unwrap()
    }

    fn at(grid: &NavGrid, x: i32, y: i32) -> NodeId {
        grid.node_at_cell(IVec2::new(x, y)).unwrap()
    }

    #[test]
    fn test_open_grid_corner_to_corner() {
        let grid = open(5, 5);
        let start = at(&grid, 0, 0);
        let goal = at(&grid, 4, 4);

        let path = find_path(&grid, start, goal).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(*path.last().unwrap(), goal);
        for (i, id) in path.iter().enumerate() {
            let step = i as i32 + 1;
            assert_eq!(grid.node(*id).unwrap().cell, IVec2::new(step, step));
        }
    }

    #[test]
    fn test_same_node_is_empty() {
        let grid = open(3, 3);
        let n = at(&grid, 1, 1);
        assert!(find_path(&grid, n, n).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_is_empty() {
        let tiles = LayeredTiles::from_rows(&["..#..", "..#..", "..#.."]);
        let grid = NavGrid::build(GridConfig::default(), &tiles).unwrap();
        let path = find_path(&grid, at(&grid, 0, 0), at(&grid, 4, 2)).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_unknown_node_is_error() {
        let grid = open(2, 2);
        assert!(matches!(
            find_path(&grid, NodeId(0), NodeId(99)),
            Err(AiError::UnknownNode(NodeId(99)))
        ));
    }

    #[test]
    fn test_routes_around_wall() {
        let tiles = LayeredTiles::from_rows(&[".....", ".###.", "....."]);
        let grid = NavGrid::build(GridConfig::default(), &tiles).unwrap();
        let start = at(&grid, 0, 1);
        let goal = at(&grid, 4, 1);

        let path = find_path(&grid, start, goal).unwrap();
        assert_eq!(*path.last().unwrap(), goal);
        for id in &path {
            assert!(tiles.is_walkable(grid.node(*id).unwrap().cell));
        }
        // Up one diagonal, two straights, down one diagonal
        let expected = 2.0 * std::f32::consts::SQRT_2 + 2.0;
        assert_relative_eq!(path_length(&grid, start, &path).unwrap(), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_corner_cutting_changes_route() {
        let tiles = LayeredTiles::from_rows(&["#.", ".#"]);

        let cutting = NavGrid::build(GridConfig::default(), &tiles).unwrap();
        let path = find_path(&cutting, at(&cutting, 0, 0), at(&cutting, 1, 1)).unwrap();
        assert_eq!(path.len(), 1);

        let strict =
            NavGrid::build(GridConfig::default().with_corner_cutting(false), &tiles).unwrap();
        let path = find_path(&strict, at(&strict, 0, 0), at(&strict, 1, 1)).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_optimal_on_open_grid() {
        // Octile distance is the true shortest length on an open 8-way grid
        let grid = open(7, 5);
        for (sx, sy, gx, gy) in [(0, 0, 6, 4), (6, 0, 0, 3), (2, 4, 5, 0), (0, 2, 6, 2)] {
            let start = at(&grid, sx, sy);
            let path = find_path(&grid, start, at(&grid, gx, gy)).unwrap();
            let dx = (gx - sx).abs() as f32;
            let dy = (gy - sy).abs() as f32;
            let octile = dx.max(dy) + (std::f32::consts::SQRT_2 - 1.0) * dx.min(dy);
            assert_relative_eq!(path_length(&grid, start, &path).unwrap(), octile, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let grid = open(6, 6);
        let a = find_path(&grid, at(&grid, 0, 0), at(&grid, 5, 2)).unwrap();
        let b = find_path(&grid, at(&grid, 0, 0), at(&grid, 5, 2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_concurrent_searches() {
        let service = PathService::new(open(20, 20));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    let start = service.grid().node_at_cell(IVec2::new(i, 0)).unwrap();
                    let goal = service.grid().node_at_cell(IVec2::new(19, 19 - i)).unwrap();
                    (0..25)
                        .map(|_| service.find_path(start, goal).unwrap().len())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            let lengths = handle.join().unwrap();
            assert!(lengths.windows(2).all(|w| w[0] == w[1]));
            assert!(lengths[0] > 0);
        }
    }

    #[test]
    fn test_service_rebuild() {
        let service = PathService::new(open(3, 3));
        assert_eq!(service.node_count(), 9);
        service.rebuild(&LayeredTiles::from_rows(&["...", "###", "..."]));
        assert_eq!(service.node_count(), 6);
        assert!(service.path_between(Vec2::new(0.5, 0.5), Vec2::new(0.5, 2.5)).is_empty());
    }

    #[test]
    fn test_path_between_world_positions() {
        let service = PathService::new(open(5, 1));
        let path = service.path_between(Vec2::new(0.5, 0.5), Vec2::new(4.2, 0.7));
        assert_eq!(path.len(), 4);
        assert_eq!(path.last().copied(), Some(Vec2::new(4.5, 0.5)));
    }

    #[test]
    fn test_random_node() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let service = PathService::new(open(4, 4));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let id = service.random_node(&mut rng).unwrap();
            assert!(id.index() < 16);
        }
        let empty = PathService::new(NavGrid::new(GridConfig::default()).unwrap());
        assert_eq!(empty.random_node(&mut rng), None);
    }

    #[test]
    fn test_follower_publishes_and_advances() {
        let service = PathService::new(open(5, 1));
        let mut follower = PathFollower::new(PathFollowerConfig::default());
        let mut sensed = SensedWorld::new(Vec2::new(0.5, 0.5));
        let destination = Some(Vec2::new(4.5, 0.5));

        let wp = follower.tick(0.1, &service, &mut sensed, destination);
        assert_eq!(wp, Some(Vec2::new(1.5, 0.5)));
        assert_eq!(sensed.current_waypoint, wp);

        sensed.position = Vec2::new(1.45, 0.5);
        let wp = follower.tick(0.1, &service, &mut sensed, destination);
        assert_eq!(wp, Some(Vec2::new(2.5, 0.5)));

        let mut wp = None;
        for x in [2.45, 3.45, 4.45] {
            sensed.position = Vec2::new(x, 0.5);
            wp = follower.tick(0.1, &service, &mut sensed, destination);
        }
        assert_eq!(wp, None);
        assert!(follower.is_finished());
        assert_eq!(sensed.current_waypoint, None);
    }

    #[test]
    fn test_follower_replans_on_drift() {
        let service = PathService::new(open(5, 5));
        let mut follower = PathFollower::new(PathFollowerConfig::default());
        let mut sensed = SensedWorld::new(Vec2::new(0.5, 0.5));

        follower.tick(0.01, &service, &mut sensed, Some(Vec2::new(4.5, 0.5)));
        assert_eq!(follower.path().last().copied(), Some(Vec2::new(4.5, 0.5)));

        follower.tick(0.01, &service, &mut sensed, Some(Vec2::new(4.5, 4.5)));
        assert_eq!(follower.path().last().copied(), Some(Vec2::new(4.5, 4.5)));

        follower.tick(0.01, &service, &mut sensed, None);
        assert!(follower.path().is_empty());
        assert_eq!(sensed.current_waypoint, None);
    }
}
