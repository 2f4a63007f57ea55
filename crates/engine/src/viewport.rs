//! The set of chunks a player should have loaded, and the load/unload diff
//! between two such sets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::world::position::ChunkPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewShape {
    /// Every chunk within Chebyshev distance `radius`.
    Square,
    /// Chunks with `dx² + dz² <= radius²`.
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub center: ChunkPos,
    pub radius: i32,
    pub shape: ViewShape,
}

impl Viewport {
    pub fn square(center: ChunkPos, radius: i32) -> Self {
        Self {
            center,
            radius: radius.max(0),
            shape: ViewShape::Square,
        }
    }

    pub fn circle(center: ChunkPos, radius: i32) -> Self {
        Self {
            center,
            radius: radius.max(0),
            shape: ViewShape::Circle,
        }
    }

    pub fn recentered(&self, center: ChunkPos) -> Self {
        Self { center, ..*self }
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        let dx = pos.x - self.center.x;
        let dz = pos.z - self.center.z;
        match self.shape {
            ViewShape::Square => dx.abs() <= self.radius && dz.abs() <= self.radius,
            ViewShape::Circle => dx * dx + dz * dz <= self.radius * self.radius,
        }
    }

    /// Every chunk in view, nearest to the center first.
    pub fn chunks(&self) -> Vec<ChunkPos> {
        let r = self.radius;
        let mut out: Vec<ChunkPos> = (-r..=r)
            .flat_map(|dx| (-r..=r).map(move |dz| (dx, dz)))
            .map(|(dx, dz)| ChunkPos::new(self.center.x + dx, self.center.z + dz))
            .filter(|p| self.contains(*p))
            .collect();
        sort_by_distance(&mut out, self.center);
        out
    }
}

/// Result of moving from one viewport to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewportDiff {
    /// In the new viewport only, nearest to the new center first.
    pub load: Vec<ChunkPos>,
    /// In the old viewport only.
    pub unload: Vec<ChunkPos>,
    /// In both.
    pub unchanged: Vec<ChunkPos>,
}

impl ViewportDiff {
    pub fn is_empty(&self) -> bool {
        self.load.is_empty() && self.unload.is_empty()
    }
}

/// Symmetric difference between `old` and `new`. With no old viewport,
/// everything in `new` is a load.
pub fn diff(old: Option<&Viewport>, new: &Viewport) -> ViewportDiff {
    let new_set: HashSet<ChunkPos> = new.chunks().into_iter().collect();
    let Some(old) = old else {
        return ViewportDiff {
            load: new.chunks(),
            ..Default::default()
        };
    };
    let old_set: HashSet<ChunkPos> = old.chunks().into_iter().collect();

    let mut load: Vec<ChunkPos> = new_set.difference(&old_set).copied().collect();
    let mut unload: Vec<ChunkPos> = old_set.difference(&new_set).copied().collect();
    let mut unchanged: Vec<ChunkPos> = new_set.intersection(&old_set).copied().collect();
    sort_by_distance(&mut load, new.center);
    sort_by_distance(&mut unload, old.center);
    unchanged.sort();
    ViewportDiff {
        load,
        unload,
        unchanged,
    }
}

fn sort_by_distance(chunks: &mut [ChunkPos], center: ChunkPos) {
    chunks.sort_by_key(|p| {
        let dx = i64::from(p.x - center.x);
        let dz = i64::from(p.z - center.z);
        (dx * dx + dz * dz, *p)
    });
}
