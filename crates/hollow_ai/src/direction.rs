//! Discretized direction table
//!
//! Context steering scores a fixed set of evenly spaced unit vectors.
//! Index 0 points north `(0, 1)` and indices advance clockwise, so the
//! default eight-way table reads N, NE, E, SE, S, SW, W, NW.

use glam::Vec2;
use std::ops::Index;
use std::sync::OnceLock;

use crate::error::{AiError, Result};

/// Number of entries in the default table
pub const DEFAULT_DIRECTION_COUNT: usize = 8;

/// Ordered set of unit vectors evenly distributed in angle
#[derive(Debug, Clone, PartialEq)]
pub struct Directions {
    dirs: Vec<Vec2>,
}

impl Directions {
    /// Build a table of `count` directions (step = 360° / count)
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(AiError::EmptyDirectionTable);
        }

        let step = std::f32::consts::TAU / count as f32;
        let dirs = (0..count)
            .map(|i| {
                let angle = std::f32::consts::FRAC_PI_2 - step * i as f32;
                Vec2::new(angle.cos(), angle.sin()).normalize()
            })
            .collect();

        Ok(Self { dirs })
    }

    /// The shared eight-way table
    pub fn eight() -> &'static Directions {
        static EIGHT: OnceLock<Directions> = OnceLock::new();
        EIGHT.get_or_init(|| Self {
            dirs: (0..DEFAULT_DIRECTION_COUNT)
                .map(|i| {
                    let angle = std::f32::consts::FRAC_PI_2
                        - std::f32::consts::FRAC_PI_4 * i as f32;
                    Vec2::new(angle.cos(), angle.sin()).normalize()
                })
                .collect(),
        })
    }

    /// Number of directions in the table
    #[inline]
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Get the i-th direction
    pub fn direction_at(&self, index: usize) -> Result<Vec2> {
        self.dirs
            .get(index)
            .copied()
            .ok_or(AiError::DirectionOutOfRange {
                index,
                count: self.dirs.len(),
            })
    }

    /// Index of the entry best aligned with `v`
    ///
    /// Ties resolve to the lowest index. Returns `None` for a zero or
    /// non-finite vector, which has no meaningful direction.
    pub fn closest_index(&self, v: Vec2) -> Option<usize> {
        let v = v.try_normalize()?;

        let mut best = 0;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, dir) in self.dirs.iter().enumerate() {
            let dot = v.dot(*dir);
            if dot > best_dot {
                best = i;
                best_dot = dot;
            }
        }
        Some(best)
    }

    /// Directions in slot order
    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.dirs.iter().copied()
    }

    /// Raw slot table
    pub fn as_slice(&self) -> &[Vec2] {
        &self.dirs
    }
}

impl Index<usize> for Directions {
    type Output = Vec2;

    fn index(&self, index: usize) -> &Vec2 {
        &self.dirs[index]
    }
}
