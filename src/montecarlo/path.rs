use crate::common::{Real, Time};
use crate::time::TimeGrid;

/// A single realized trajectory along a time grid, read-only after
/// generation.
#[derive(Debug, Clone)]
pub struct Path {
    grid: TimeGrid,
    values: Vec<Real>,
}

impl Path {
    pub(crate) fn new(grid: TimeGrid, values: Vec<Real>) -> Self {
        debug_assert_eq!(grid.len(), values.len());
        Self { grid, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn first(&self) -> Real {
        self.values[0]
    }

    pub fn last(&self) -> Real {
        *self.values.last().expect("paths are never empty")
    }

    pub fn entries(&self) -> impl Iterator<Item = (Time, Real)> + '_ {
        self.grid
            .times()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Real;

    fn index(&self, i: usize) -> &Real {
        &self.values[i]
    }
}

/// One path per asset, all sharing the same grid.
#[derive(Debug, Clone)]
pub struct MultiPath {
    paths: Vec<Path>,
}

impl MultiPath {
    pub(crate) fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    pub fn asset_count(&self) -> usize {
        self.paths.len()
    }

    pub fn path_len(&self) -> usize {
        self.paths.first().map_or(0, Path::len)
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }
}

impl std::ops::Index<usize> for MultiPath {
    type Output = Path;

    fn index(&self, i: usize) -> &Path {
        &self.paths[i]
    }
}
