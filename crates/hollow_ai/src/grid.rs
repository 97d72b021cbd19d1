//! Walkable node grid
//!
//! One node per walkable cell, linked to up to eight walkable
//! neighbours. The grid is immutable between rebuilds; path searches
//! keep their own bookkeeping and only ever read it.

use std::collections::HashMap;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};

/// Stable index of a node inside one [`NavGrid`] build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Position in [`NavGrid::nodes`]
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A walkable cell
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub cell: IVec2,
    /// World-space centre of the cell
    pub position: Vec2,
    neighbours: Vec<NodeId>,
}

impl GraphNode {
    /// Walkable cells reachable in one step
    pub fn neighbours(&self) -> &[NodeId] {
        &self.neighbours
    }
}

/// Rectangular block of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    pub min: IVec2,
    pub size: IVec2,
}

impl CellBounds {
    /// Negative sizes collapse to an empty block
    pub fn new(min: IVec2, size: IVec2) -> Self {
        Self {
            min,
            size: size.max(IVec2::ZERO),
        }
    }

    /// Block anchored at the origin cell
    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(IVec2::ZERO, IVec2::new(width, height))
    }

    pub fn width(&self) -> i32 {
        self.size.x
    }

    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Number of cells covered
    pub fn area(&self) -> usize {
        (self.size.x * self.size.y) as usize
    }

    /// Whether `cell` lies inside the block
    pub fn contains(&self, cell: IVec2) -> bool {
        let rel = cell - self.min;
        rel.x >= 0 && rel.y >= 0 && rel.x < self.size.x && rel.y < self.size.y
    }

    /// Cells row by row, starting at `min`
    pub fn cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        (0..self.size.y).flat_map(move |y| (0..self.size.x).map(move |x| self.min + IVec2::new(x, y)))
    }

    fn offset(&self, cell: IVec2) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let rel = cell - self.min;
        Some((rel.y * self.size.x + rel.x) as usize)
    }
}

/// Walkability source for grid construction
pub trait TileClassifier {
    fn bounds(&self) -> CellBounds;
    fn is_walkable(&self, cell: IVec2) -> bool;
}

/// Two boolean layers: a cell is walkable when it has floor and no wall
#[derive(Debug, Clone)]
pub struct LayeredTiles {
    bounds: CellBounds,
    floor: Vec<bool>,
    wall: Vec<bool>,
}

impl LayeredTiles {
    /// No floor and no walls anywhere
    pub fn new(bounds: CellBounds) -> Self {
        Self {
            bounds,
            floor: vec![false; bounds.area()],
            wall: vec![false; bounds.area()],
        }
    }

    /// Every cell floored, no walls
    pub fn open(bounds: CellBounds) -> Self {
        let mut tiles = Self::new(bounds);
        tiles.floor.iter_mut().for_each(|f| *f = true);
        tiles
    }

    /// Parse an ASCII map, first row on top
    ///
    /// `.` is floor, `#` is floor with a wall, anything else is void.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        let height = rows.len() as i32;
        let width = rows
            .iter()
            .map(|r| r.as_ref().chars().count())
            .max()
            .unwrap_or(0) as i32;

        let mut tiles = Self::new(CellBounds::from_size(width, height));
        for (row, line) in rows.iter().enumerate() {
            let y = height - 1 - row as i32;
            for (x, ch) in line.as_ref().chars().enumerate() {
                let cell = IVec2::new(x as i32, y);
                match ch {
                    '.' => tiles.set_floor(cell, true),
                    '#' => {
                        tiles.set_floor(cell, true);
                        tiles.set_wall(cell, true);
                    }
                    _ => {}
                }
            }
        }
        tiles
    }

    /// Cells outside the bounds are ignored
    pub fn set_floor(&mut self, cell: IVec2, value: bool) {
        if let Some(i) = self.bounds.offset(cell) {
            self.floor[i] = value;
        }
    }

    pub fn set_wall(&mut self, cell: IVec2, value: bool) {
        if let Some(i) = self.bounds.offset(cell) {
            self.wall[i] = value;
        }
    }

    pub fn has_floor(&self, cell: IVec2) -> bool {
        self.bounds.offset(cell).map_or(false, |i| self.floor[i])
    }

    /// False outside the bounds
    pub fn has_wall(&self, cell: IVec2) -> bool {
        self.bounds.offset(cell).map_or(false, |i| self.wall[i])
    }

    /// Cells carrying a wall
    pub fn wall_cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.bounds.cells().filter(move |c| self.has_wall(*c))
    }
}

impl TileClassifier for LayeredTiles {
    fn bounds(&self) -> CellBounds {
        self.bounds
    }

    fn is_walkable(&self, cell: IVec2) -> bool {
        self.has_floor(cell) && !self.has_wall(cell)
    }
}

/// Grid construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// World size of one cell
    pub cell_size: f32,
    /// World position of cell (0, 0)'s lower-left corner
    pub origin: Vec2,
    /// Link diagonals even when both adjacent cardinal cells are blocked
    pub allow_corner_cutting: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            origin: Vec2::ZERO,
            allow_corner_cutting: true,
        }
    }
}

impl GridConfig {
    /// World units per cell
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// World position of cell (0, 0)'s lower corner
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Allow diagonal steps past blocked corners
    pub fn with_corner_cutting(mut self, allow: bool) -> Self {
        self.allow_corner_cutting = allow;
        self
    }

    /// Reject non-positive or non-finite cell sizes
    pub fn validate(&self) -> Result<()> {
        if self.cell_size <= 0.0 || !self.cell_size.is_finite() {
            return Err(AiError::config(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        Ok(())
    }
}

const NEIGHBOUR_OFFSETS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(1, 1),
    IVec2::new(-1, 1),
    IVec2::new(1, -1),
    IVec2::new(-1, -1),
];

/// Node graph over the walkable cells of a level
#[derive(Debug, Clone, Default)]
pub struct NavGrid {
    config: GridConfig,
    nodes: Vec<GraphNode>,
    by_cell: HashMap<IVec2, NodeId>,
}

impl NavGrid {
    /// Empty grid; call [`NavGrid::rebuild`] to populate it
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            nodes: Vec::new(),
            by_cell: HashMap::new(),
        })
    }

    /// Validate `config` and generate nodes from `tiles`
    pub fn build(config: GridConfig, tiles: &dyn TileClassifier) -> Result<Self> {
        let mut grid = Self::new(config)?;
        grid.rebuild(tiles);
        Ok(grid)
    }

    /// Throw away all nodes and regenerate them from `tiles`
    pub fn rebuild(&mut self, tiles: &dyn TileClassifier) {
        self.nodes.clear();
        self.by_cell.clear();

        for cell in tiles.bounds().cells() {
            if !tiles.is_walkable(cell) {
                continue;
            }
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(GraphNode {
                cell,
                position: self.cell_to_world(cell),
                neighbours: Vec::new(),
            });
            self.by_cell.insert(cell, id);
        }

        for i in 0..self.nodes.len() {
            let cell = self.nodes[i].cell;
            let neighbours: Vec<NodeId> = NEIGHBOUR_OFFSETS
                .iter()
                .filter(|offset| self.diagonal_allowed(cell, **offset))
                .filter_map(|offset| self.by_cell.get(&(cell + *offset)).copied())
                .collect();
            self.nodes[i].neighbours = neighbours;
        }

        log::debug!(
            "Built nav grid: {} nodes over {:?}",
            self.nodes.len(),
            tiles.bounds()
        );
    }

    fn diagonal_allowed(&self, cell: IVec2, offset: IVec2) -> bool {
        if self.config.allow_corner_cutting || offset.x == 0 || offset.y == 0 {
            return true;
        }
        self.by_cell.contains_key(&(cell + IVec2::new(offset.x, 0)))
            && self.by_cell.contains_key(&(cell + IVec2::new(0, offset.y)))
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// All nodes, indexed by [`NodeId`]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when no cell was walkable
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Look up a node, failing for ids from another build
    pub fn node(&self, id: NodeId) -> Result<&GraphNode> {
        self.nodes.get(id.index()).ok_or(AiError::UnknownNode(id))
    }

    /// World-space centre of a node
    pub fn position(&self, id: NodeId) -> Result<Vec2> {
        self.node(id).map(|n| n.position)
    }

    /// Node for a cell, if the cell is walkable
    pub fn node_at_cell(&self, cell: IVec2) -> Option<NodeId> {
        self.by_cell.get(&cell).copied()
    }

    /// Centre of `cell` in world space
    pub fn cell_to_world(&self, cell: IVec2) -> Vec2 {
        self.config.origin + (cell.as_vec2() + Vec2::splat(0.5)) * self.config.cell_size
    }

    /// Cell containing a world position
    pub fn world_to_cell(&self, position: Vec2) -> IVec2 {
        ((position - self.config.origin) / self.config.cell_size)
            .floor()
            .as_ivec2()
    }

    /// Node whose centre is closest to `position`
    pub fn nearest_node(&self, position: Vec2) -> Option<NodeId> {
        if let Some(id) = self.node_at_cell(self.world_to_cell(position)) {
            return Some(id);
        }
        self.extreme_node(position, |candidate, best| candidate < best)
    }

    /// Node whose centre is furthest from `position`
    pub fn furthest_node(&self, position: Vec2) -> Option<NodeId> {
        self.extreme_node(position, |candidate, best| candidate > best)
    }

    fn extreme_node(&self, position: Vec2, better: impl Fn(f32, f32) -> bool) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            let d = node.position.distance_squared(position);
            if best.map_or(true, |(_, b)| better(d, b)) {
                best = Some((NodeId(i as u32), d));
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(width: i32, height: i32) -> NavGrid {
        NavGrid::build(
            GridConfig::default(),
            &LayeredTiles::open(CellBounds::from_size(width, height)),
        )
        .unwrap()
    }

    #[test]
    fn test_floor_and_not_wall() {
        let mut tiles = LayeredTiles::new(CellBounds::from_size(3, 1));
        tiles.set_floor(IVec2::new(0, 0), true);
        tiles.set_floor(IVec2::new(1, 0), true);
        tiles.set_wall(IVec2::new(1, 0), true);
        tiles.set_wall(IVec2::new(2, 0), true);

        assert!(tiles.is_walkable(IVec2::new(0, 0)));
        assert!(!tiles.is_walkable(IVec2::new(1, 0)));
        assert!(!tiles.is_walkable(IVec2::new(2, 0)));
        assert!(!tiles.is_walkable(IVec2::new(5, 0)));
    }

    #[test]
    fn test_from_rows_top_row_is_highest() {
        let tiles = LayeredTiles::from_rows(&["#..", ".. "]);
        assert_eq!(tiles.bounds(), CellBounds::from_size(3, 2));
        assert!(tiles.has_wall(IVec2::new(0, 1)));
        assert!(tiles.is_walkable(IVec2::new(0, 0)));
        assert!(!tiles.has_floor(IVec2::new(2, 0)));
        assert_eq!(tiles.wall_cells().collect::<Vec<_>>(), vec![IVec2::new(0, 1)]);
    }

    #[test]
    fn test_open_grid_neighbour_counts() {
        let grid = open(3, 3);
        assert_eq!(grid.node_count(), 9);

        let centre = grid.node_at_cell(IVec2::new(1, 1)).unwrap();
        assert_eq!(grid.node(centre).unwrap().neighbours().len(), 8);

        let corner = grid.node_at_cell(IVec2::ZERO).unwrap();
        assert_eq!(grid.node(corner).unwrap().neighbours().len(), 3);
    }

    #[test]
    fn test_neighbours_are_symmetric() {
        let tiles = LayeredTiles::from_rows(&["..#..", ".#...", "...#.", "#...."]);
        for cutting in [true, false] {
            let grid =
                NavGrid::build(GridConfig::default().with_corner_cutting(cutting), &tiles).unwrap();
            for (i, node) in grid.nodes().iter().enumerate() {
                for n in node.neighbours() {
                    let back = grid.node(*n).unwrap().neighbours();
                    assert!(back.contains(&NodeId(i as u32)));
                }
            }
        }
    }

    #[test]
    fn test_corner_cutting_modes() {
        // Two floor cells touching only at a corner
        let tiles = LayeredTiles::from_rows(&["#.", ".#"]);

        let cutting = NavGrid::build(GridConfig::default(), &tiles).unwrap();
        let a = cutting.node_at_cell(IVec2::new(0, 0)).unwrap();
        let b = cutting.node_at_cell(IVec2::new(1, 1)).unwrap();
        assert_eq!(cutting.node(a).unwrap().neighbours(), &[b]);

        let strict =
            NavGrid::build(GridConfig::default().with_corner_cutting(false), &tiles).unwrap();
        let a = strict.node_at_cell(IVec2::new(0, 0)).unwrap();
        assert!(strict.node(a).unwrap().neighbours().is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let tiles = LayeredTiles::from_rows(&["...", ".#.", "..."]);
        let mut grid = NavGrid::build(GridConfig::default(), &tiles).unwrap();
        let first = grid.nodes().to_vec();
        grid.rebuild(&tiles);
        assert_eq!(grid.nodes(), first.as_slice());
        assert_eq!(grid.node_count(), 8);
    }

    #[test]
    fn test_cell_world_mapping() {
        let config = GridConfig::default()
            .with_cell_size(2.0)
            .with_origin(Vec2::new(-4.0, 0.0));
        let grid = NavGrid::new(config).unwrap();
        assert_eq!(grid.cell_to_world(IVec2::new(1, 0)), Vec2::new(-1.0, 1.0));
        assert_eq!(grid.world_to_cell(Vec2::new(-1.0, 1.0)), IVec2::new(1, 0));
        assert_eq!(grid.world_to_cell(Vec2::new(-4.5, 0.0)), IVec2::new(-1, 0));
    }

    #[test]
    fn test_nearest_and_furthest() {
        let grid = open(4, 1);
        let near = grid.nearest_node(Vec2::new(0.2, 0.4)).unwrap();
        assert_eq!(grid.node(near).unwrap().cell, IVec2::ZERO);

        // Outside the grid falls back to a scan
        let near = grid.nearest_node(Vec2::new(10.0, 0.5)).unwrap();
        assert_eq!(grid.node(near).unwrap().cell, IVec2::new(3, 0));

        let far = grid.furthest_node(Vec2::new(0.5, 0.5)).unwrap();
        assert_eq!(grid.node(far).unwrap().cell, IVec2::new(3, 0));

        let empty = NavGrid::new(GridConfig::default()).unwrap();
        assert_eq!(empty.nearest_node(Vec2::ZERO), None);
    }

    #[test]
    fn test_unknown_node() {
        let grid = open(1, 1);
        assert_eq!(grid.node(NodeId(7)).unwrap_err(), AiError::UnknownNode(NodeId(7)));
    }

    #[test]
    fn test_invalid_cell_size() {
        assert!(NavGrid::new(GridConfig::default().with_cell_size(0.0)).is_err());
    }
}
