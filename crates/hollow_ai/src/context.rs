//! Danger/interest maps and the context solver

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::direction::Directions;
use crate::error::{AiError, Result};

/// Per-direction danger and interest, rebuilt every decision tick
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMap {
    danger: Vec<f32>,
    interest: Vec<f32>,
}

impl ContextMap {
    /// Zeroed map with one slot per direction
    pub fn new(slots: usize) -> Self {
        Self {
            danger: vec![0.0; slots],
            interest: vec![0.0; slots],
        }
    }

    /// Empty map with one slot per direction
    pub fn for_directions(directions: &Directions) -> Self {
        Self::new(directions.len())
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.danger.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.danger.is_empty()
    }

    /// Danger per slot, in `[0, 1]`
    pub fn danger(&self) -> &[f32] {
        &self.danger
    }

    /// Interest per slot, in `[0, 1]`
    pub fn interest(&self) -> &[f32] {
        &self.interest
    }

    /// Raise danger in a slot (never lowers it)
    #[inline]
    pub fn raise_danger(&mut self, slot: usize, value: f32) {
        let d = &mut self.danger[slot];
        *d = d.max(value);
    }

    /// Raise interest in a slot (never lowers it)
    #[inline]
    pub fn raise_interest(&mut self, slot: usize, value: f32) {
        let i = &mut self.interest[slot];
        *i = i.max(value);
    }

    /// Add to interest in a slot; negative amounts are ignored
    #[inline]
    pub fn add_interest(&mut self, slot: usize, amount: f32) {
        self.interest[slot] += amount.max(0.0);
    }

    /// Reset every slot to zero
    pub fn clear(&mut self) {
        self.danger.iter_mut().for_each(|d| *d = 0.0);
        self.interest.iter_mut().for_each(|i| *i = 0.0);
    }

    /// First slot that is lower than in `before`, if any
    pub(crate) fn first_lowered_slot(&self, before: &ContextMap) -> Option<usize> {
        (0..self.len()).find(|&i| {
            self.danger[i] < before.danger[i] || self.interest[i] < before.interest[i]
        })
    }
}

/// How surviving interest becomes a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Pick the single strongest slot
    #[default]
    Strongest,
    /// Interest minus danger, weighted sum of all slots
    Blend,
}

/// Context solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Danger strictly above this suppresses interest in that slot
    pub danger_threshold: f32,
    pub resolution: Resolution,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            danger_threshold: 0.5,
            resolution: Resolution::Strongest,
        }
    }
}

impl SolverConfig {
    /// Threshold must lie in `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if !self.danger_threshold.is_finite() || self.danger_threshold < 0.0 {
            return Err(AiError::config(format!(
                "danger_threshold must be a non-negative number, got {}",
                self.danger_threshold
            )));
        }
        Ok(())
    }
}

/// Reduces a [`ContextMap`] to one movement direction
#[derive(Debug, Clone, Default)]
pub struct ContextSolver {
    pub config: SolverConfig,
}

impl ContextSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Set the danger level above which a slot is discarded
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.config.danger_threshold = threshold;
        self
    }

    /// Set how interest and danger are combined
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.config.resolution = resolution;
        self
    }

    /// Chosen direction, or zero to hold position
    ///
    /// The result is a direction, not a velocity: `Strongest` yields a
    /// unit table entry, `Blend` a unit vector or zero.
    pub fn solve(&self, map: &ContextMap, directions: &Directions) -> Vec2 {
        assert_eq!(
            map.len(),
            directions.len(),
            "context map has {} slots but direction table has {}",
            map.len(),
            directions.len()
        );

        let threshold = self.config.danger_threshold;
        let surviving = |i: usize| {
            if map.danger[i] > threshold {
                0.0
            } else {
                map.interest[i]
            }
        };

        match self.config.resolution {
            Resolution::Strongest => {
                let mut best: Option<(usize, f32)> = None;
                for i in 0..map.len() {
                    let value = surviving(i);
                    if value > 0.0 && best.map_or(true, |(_, v)| value > v) {
                        best = Some((i, value));
                    }
                }
                best.map_or(Vec2::ZERO, |(i, _)| directions[i])
            }
            Resolution::Blend => {
                let sum = (0..map.len()).fold(Vec2::ZERO, |acc, i| {
                    let weight = (surviving(i) - map.danger[i]).clamp(0.0, 1.0);
                    acc + directions[i] * weight
                });
                sum.normalize_or_zero()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs() -> &'static Directions {
        Directions::eight()
    }

    #[test]
    fn test_raise_never_lowers() {
        let mut map = ContextMap::new(8);
        map.raise_danger(0, 0.8);
        map.raise_danger(0, 0.3);
        assert_eq!(map.danger()[0], 0.8);

        map.add_interest(1, 1.0);
        map.add_interest(1, -5.0);
        map.raise_interest(1, 0.5);
        assert_eq!(map.interest()[1], 1.0);
    }

    #[test]
    fn test_clear() {
        let mut map = ContextMap::new(8);
        map.raise_danger(3, 1.0);
        map.add_interest(4, 2.0);
        map.clear();
        assert!(map.danger().iter().all(|d| *d == 0.0));
        assert!(map.interest().iter().all(|i| *i == 0.0));
    }

    #[test]
    fn test_zero_interest_holds_position() {
        let solver = ContextSolver::default();
        let map = ContextMap::new(8);
        assert_eq!(solver.solve(&map, dirs()), Vec2::ZERO);

        let blend = ContextSolver::default().with_resolution(Resolution::Blend);
        assert_eq!(blend.solve(&map, dirs()), Vec2::ZERO);
    }

    #[test]
    fn test_full_danger_holds_position() {
        for resolution in [Resolution::Strongest, Resolution::Blend] {
            let solver = ContextSolver::default().with_resolution(resolution);
            let mut map = ContextMap::new(8);
            for i in 0..8 {
                map.raise_danger(i, 0.9);
                map.add_interest(i, 1.0 + i as f32);
            }
            assert_eq!(solver.solve(&map, dirs()), Vec2::ZERO);
        }
    }

    #[test]
    fn test_picks_strongest_interest() {
        let solver = ContextSolver::default();
        let mut map = ContextMap::new(8);
        map.add_interest(2, 0.4);
        map.add_interest(5, 0.9);
        assert_eq!(solver.solve(&map, dirs()), dirs()[5]);
    }

    #[test]
    fn test_danger_suppresses_slot() {
        let solver = ContextSolver::default();
        let mut map = ContextMap::new(8);
        map.add_interest(0, 1.0);
        map.add_interest(1, 0.6);
        map.raise_danger(0, 0.7);
        assert_eq!(solver.solve(&map, dirs()), dirs()[1]);

        // At exactly the threshold the slot survives
        let mut map = ContextMap::new(8);
        map.add_interest(0, 1.0);
        map.raise_danger(0, 0.5);
        assert_eq!(solver.solve(&map, dirs()), dirs()[0]);
    }

    #[test]
    fn test_ties_take_lowest_index() {
        let solver = ContextSolver::default();
        let mut map = ContextMap::new(8);
        map.add_interest(6, 1.0);
        map.add_interest(3, 1.0);
        assert_eq!(solver.solve(&map, dirs()), dirs()[3]);
    }

    #[test]
    fn test_blend_averages() {
        let solver = ContextSolver::default().with_resolution(Resolution::Blend);
        let mut map = ContextMap::new(8);
        map.add_interest(0, 1.0);
        map.add_interest(2, 1.0);
        let dir = solver.solve(&map, dirs());
        assert!((dir - Vec2::new(1.0, 1.0).normalize()).length() < 1e-5);
    }

    #[test]
    #[should_panic]
    fn test_mismatched_map_panics() {
        let solver = ContextSolver::default();
        solver.solve(&ContextMap::new(4), dirs());
    }

    #[test]
    fn test_first_lowered_slot() {
        let mut before = ContextMap::new(8);
        before.raise_danger(2, 0.5);
        let mut after = before.clone();
        assert_eq!(after.first_lowered_slot(&before), None);
        after.danger[2] = 0.1;
        assert_eq!(after.first_lowered_slot(&before), Some(2));
    }
}
