//! Buffered pair lists over the asymmetric unit and its symmetry mates.
//!
//! `lists[s][i]` holds every atom `k` whose copy under symmetry operator `s`
//! lies within `cutoff + buffer` of atom `i` (minimum image). The identity
//! list keeps only `k > i`; the other operators keep `k >= i`, so that an
//! atom interacting with its own image appears once. Lists are sorted.
//!
//! A list stays valid until some atom has moved more than half the margin
//! between the list radius and the cutoff since the last build. The margin is
//! the buffer unless the cell is too narrow to hold `cutoff + buffer`.

use super::error::EngineError;
use crate::core::crystal::Crystal;
use itertools::iproduct;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct NeighborList {
    cutoff: f64,
    buffer: f64,
    lists: Vec<Vec<Vec<usize>>>,
    reference: Vec<Point3<f64>>,
    counts: Vec<usize>,
    valid: bool,
}

impl NeighborList {
    pub fn new(cutoff: f64, buffer: f64) -> Self {
        Self {
            cutoff,
            buffer,
            lists: Vec::new(),
            reference: Vec::new(),
            counts: Vec::new(),
            valid: false,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    /// The list radius, `cutoff + buffer`.
    pub fn radius(&self) -> f64 {
        self.cutoff + self.buffer
    }

    /// The list radius actually searched in `crystal`, clamped to half the
    /// narrowest cell width.
    pub fn radius_in(&self, crystal: &Crystal) -> f64 {
        self.radius().min(crystal.max_image_radius())
    }

    /// Forces the next [`Self::update`] to rebuild.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn lists(&self) -> &[Vec<Vec<usize>>] {
        &self.lists
    }

    pub fn neighbors(&self, sym_op: usize, atom: usize) -> &[usize] {
        self.lists
            .get(sym_op)
            .and_then(|per_atom| per_atom.get(atom))
            .map_or(&[], Vec::as_slice)
    }

    /// Number of listed partners of each atom, summed over all operators.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn num_pairs(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Whether the lists no longer match `coordinates`.
    ///
    /// `coordinates[s]` holds the reduced coordinates of the copy generated
    /// by symmetry operator `s`; copy 0 is the asymmetric unit.
    pub fn needs_rebuild(&self, crystal: &Crystal, coordinates: &[Vec<Point3<f64>>]) -> bool {
        if !self.valid || coordinates.len() != self.lists.len() {
            return true;
        }
        let current = coordinates.first().map_or(&[][..], Vec::as_slice);
        if current.len() != self.reference.len() {
            return true;
        }
        let limit = 0.5 * (self.radius_in(crystal) - self.cutoff).max(0.0);
        let limit2 = limit * limit;
        current.iter().zip(&self.reference).any(|(now, then)| {
            let mut dx = now - then;
            crystal.image(&mut dx) > limit2
        })
    }

    /// Rebuilds the lists when forced or stale; returns whether it rebuilt.
    ///
    /// For periodic crystals the cutoff must not exceed half the narrowest
    /// cell width; the buffered radius is clamped to that half width.
    #[instrument(skip_all, name = "neighbor_list")]
    pub fn update(
        &mut self,
        crystal: &Crystal,
        coordinates: &[Vec<Point3<f64>>],
        force: bool,
    ) -> Result<bool, EngineError> {
        let half_width = crystal.max_image_radius();
        if self.cutoff > half_width {
            return Err(EngineError::CellTooSmall {
                cutoff: self.cutoff,
                half_width,
            });
        }
        if !force && !self.needs_rebuild(crystal, coordinates) {
            return Ok(false);
        }

        let radius = self.radius_in(crystal);
        self.lists = if crystal.is_aperiodic() {
            vec![tree_search(coordinates.first().map_or(&[][..], Vec::as_slice), radius)]
        } else {
            cell_search(crystal, coordinates, radius)
        };
        self.reference = coordinates.first().cloned().unwrap_or_default();
        let num_atoms = self.reference.len();
        self.counts = (0..num_atoms)
            .map(|i| self.lists.iter().map(|per_atom| per_atom[i].len()).sum())
            .collect();
        self.valid = true;

        debug!(
            atoms = num_atoms,
            sym_ops = self.lists.len(),
            pairs = self.num_pairs(),
            radius,
            "Neighbor list rebuilt."
        );
        Ok(true)
    }
}

fn tree_search(positions: &[Point3<f64>], radius: f64) -> Vec<Vec<usize>> {
    if positions.is_empty() {
        return Vec::new();
    }
    let points: Vec<[f64; 3]> = positions.iter().map(|p| [p.x, p.y, p.z]).collect();
    let kdtree: KdTree<f64, 3> = (&points).into();
    let radius_sq = radius * radius;
    points
        .iter()
        .enumerate()
        .map(|(i, query)| {
            let mut list: Vec<usize> = kdtree
                .within_unsorted::<SquaredEuclidean>(query, radius_sq)
                .into_iter()
                .map(|neighbour| neighbour.item as usize)
                .filter(|&k| k > i)
                .collect();
            list.sort_unstable();
            list
        })
        .collect()
}

fn cell_search(crystal: &Crystal, coordinates: &[Vec<Point3<f64>>], radius: f64) -> Vec<Vec<Vec<usize>>> {
    let Some(asymmetric) = coordinates.first() else {
        return Vec::new();
    };
    let widths = crystal.perpendicular_widths();
    let dims = widths.map(|w| ((w / radius).floor() as usize).max(1));
    let cell_of = |p: &Point3<f64>| -> [usize; 3] {
        let f = crystal.wrapped_fractional(p);
        [
            ((f.x * dims[0] as f64) as usize).min(dims[0] - 1),
            ((f.y * dims[1] as f64) as usize).min(dims[1] - 1),
            ((f.z * dims[2] as f64) as usize).min(dims[2] - 1),
        ]
    };
    let flat = |c: [usize; 3]| (c[0] * dims[1] + c[1]) * dims[2] + c[2];
    let adjacent = |axis: usize, c: usize| -> Vec<usize> {
        let n = dims[axis];
        if n < 3 {
            (0..n).collect()
        } else {
            vec![(c + n - 1) % n, c, (c + 1) % n]
        }
    };
    let radius2 = radius * radius;
    let home: Vec<[usize; 3]> = asymmetric.iter().map(cell_of).collect();

    coordinates
        .iter()
        .enumerate()
        .map(|(sym_op, copy)| {
            let mut bins = vec![Vec::new(); dims[0] * dims[1] * dims[2]];
            for (k, p) in copy.iter().enumerate() {
                bins[flat(cell_of(p))].push(k);
            }
            asymmetric
                .iter()
                .enumerate()
                .map(|(i, xi)| {
                    let [ca, cb, cc] = home[i];
                    let mut list = Vec::new();
                    for (a, b, c) in iproduct!(adjacent(0, ca), adjacent(1, cb), adjacent(2, cc)) {
                        for &k in &bins[flat([a, b, c])] {
                            if k < i || (sym_op == 0 && k == i) {
                                continue;
                            }
                            let mut dx = copy[k] - xi;
                            if crystal.image(&mut dx) <= radius2 {
                                list.push(k);
                            }
                        }
                    }
                    list.sort_unstable();
                    list
                })
                .collect()
        })
        .collect()
}
