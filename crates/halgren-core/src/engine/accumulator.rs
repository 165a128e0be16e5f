//! Per-worker scratch state and the reduction that merges it.
//!
//! During a parallel region each worker writes only into its own
//! [`ThreadAccumulator`], including gradient slots of atoms owned by other
//! workers' outer loops. The merge happens afterwards, summing workers in
//! thread order so that a fixed thread count always yields the same bits.

use nalgebra::Vector3;
use rayon::prelude::*;

/// Excluded-partner scratch mask for the outer atom currently processed.
///
/// Entries are `true` for allowed partners. [`Self::exclude`] and
/// [`Self::restore`] must be paired around each outer atom.
#[derive(Debug, Clone, Default)]
pub struct ExclusionMask {
    allowed: Vec<bool>,
}

impl ExclusionMask {
    pub fn new(num_atoms: usize) -> Self {
        Self {
            allowed: vec![true; num_atoms],
        }
    }

    pub fn resize(&mut self, num_atoms: usize) {
        self.allowed.clear();
        self.allowed.resize(num_atoms, true);
    }

    #[inline]
    pub fn exclude(&mut self, partners: &[usize]) {
        for &k in partners {
            self.allowed[k] = false;
        }
    }

    #[inline]
    pub fn restore(&mut self, partners: &[usize]) {
        for &k in partners {
            self.allowed[k] = true;
        }
    }

    #[inline]
    pub fn allows(&self, atom: usize) -> bool {
        self.allowed[atom]
    }
}

/// Everything one worker accumulates during a single evaluation.
#[derive(Debug, Clone, Default)]
pub struct ThreadAccumulator {
    pub mask: ExclusionMask,
    pub energy: f64,
    pub interactions: usize,
    pub dedl: f64,
    pub d2edl2: f64,
    pub gradient: Vec<Vector3<f64>>,
    pub lambda_gradient: Vec<Vector3<f64>>,
}

impl ThreadAccumulator {
    pub fn new(num_atoms: usize) -> Self {
        Self {
            mask: ExclusionMask::new(num_atoms),
            ..Self::default()
        }
    }

    /// Zeroes the scalars, reopens the mask and sizes the gradient buffers
    /// for this pass.
    ///
    /// Buffers that are not requested are left empty. The mask is rebuilt
    /// even at an unchanged size, since an aborted pass may have left
    /// partners excluded.
    pub fn reset(&mut self, num_atoms: usize, gradient: bool, lambda_gradient: bool) {
        self.energy = 0.0;
        self.interactions = 0;
        self.dedl = 0.0;
        self.d2edl2 = 0.0;
        self.mask.resize(num_atoms);
        zero(&mut self.gradient, if gradient { num_atoms } else { 0 });
        zero(&mut self.lambda_gradient, if lambda_gradient { num_atoms } else { 0 });
    }
}

fn zero(buffer: &mut Vec<Vector3<f64>>, len: usize) {
    buffer.clear();
    buffer.resize(len, Vector3::zeros());
}

/// Scalar totals of a parallel region.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub energy: f64,
    pub interactions: usize,
    pub dedl: f64,
    pub d2edl2: f64,
}

pub fn reduce_scalars(workers: &[ThreadAccumulator]) -> Totals {
    workers.iter().fold(Totals::default(), |acc, w| Totals {
        energy: acc.energy + w.energy,
        interactions: acc.interactions + w.interactions,
        dedl: acc.dedl + w.dedl,
        d2edl2: acc.d2edl2 + w.d2edl2,
    })
}

/// Sums one per-atom buffer over all workers, in thread order, into `target`.
///
/// Workers whose selected buffer is empty contribute nothing.
pub fn reduce_vectors<F>(workers: &[ThreadAccumulator], select: F, target: &mut [Vector3<f64>])
where
    F: Fn(&ThreadAccumulator) -> &[Vector3<f64>] + Sync,
{
    target.par_iter_mut().enumerate().for_each(|(i, slot)| {
        for w in workers {
            if let Some(g) = select(w).get(i) {
                *slot += g;
            }
        }
    });
}
