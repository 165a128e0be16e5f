use super::params::Forcefield;
use std::collections::HashMap;

/// Combined van der Waals parameters for every pair of classes.
///
/// Radii use the cubic-mean rule and well depths the HHG (harmonic mean of
/// square roots) rule. Both matrices are stored dense and are symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct VdwTypeTable {
    classes: Vec<u32>,
    index_of: HashMap<u32, usize>,
    class_radius: Vec<f64>,
    reduction: Vec<f64>,
    radmin: Vec<f64>,
    eps: Vec<f64>,
}

impl VdwTypeTable {
    pub fn from_forcefield(forcefield: &Forcefield) -> Self {
        let classes = forcefield.vdw_classes();
        let n = classes.len();
        let mut index_of = HashMap::with_capacity(n);
        let mut class_radius = Vec::with_capacity(n);
        let mut well_depth = Vec::with_capacity(n);
        let mut reduction = Vec::with_capacity(n);
        for (index, class) in classes.iter().enumerate() {
            // Classes come from the forcefield's own key set.
            if let Some(param) = forcefield.vdw(*class) {
                index_of.insert(*class, index);
                class_radius.push(param.radius);
                well_depth.push(param.well_depth);
                reduction.push(param.reduction);
            }
        }

        let mut radmin = vec![0.0; n * n];
        let mut eps = vec![0.0; n * n];
        for i in 0..n {
            for j in i..n {
                let r = cubic_mean_radius(class_radius[i], class_radius[j]);
                let e = hhg_epsilon(well_depth[i], well_depth[j]);
                radmin[i * n + j] = r;
                radmin[j * n + i] = r;
                eps[i * n + j] = e;
                eps[j * n + i] = e;
            }
        }

        Self {
            classes,
            index_of,
            class_radius,
            reduction,
            radmin,
            eps,
        }
    }

    #[inline]
    pub fn num_types(&self) -> usize {
        self.classes.len()
    }

    /// Dense type index of a vdW class.
    #[inline]
    pub fn type_index(&self, class: u32) -> Option<usize> {
        self.index_of.get(&class).copied()
    }

    pub fn class_of(&self, type_index: usize) -> u32 {
        self.classes[type_index]
    }

    /// Combined minimum-energy distance for a type pair.
    #[inline]
    pub fn radius(&self, ti: usize, tk: usize) -> f64 {
        self.radmin[ti * self.classes.len() + tk]
    }

    /// Combined well depth for a type pair.
    #[inline]
    pub fn epsilon(&self, ti: usize, tk: usize) -> f64 {
        self.eps[ti * self.classes.len() + tk]
    }

    /// Uncombined R-min diameter of a single type.
    #[inline]
    pub fn class_radius(&self, ti: usize) -> f64 {
        self.class_radius[ti]
    }

    #[inline]
    pub fn reduction(&self, ti: usize) -> f64 {
        self.reduction[ti]
    }
}

/// Cubic-mean combining rule on R-min diameters.
pub fn cubic_mean_radius(radius_i: f64, radius_j: f64) -> f64 {
    let ri = 0.5 * radius_i;
    let rj = 0.5 * radius_j;
    let ri2 = ri * ri;
    let rj2 = rj * rj;
    let denom = ri2 + rj2;
    if denom <= 0.0 {
        return 0.0;
    }
    2.0 * (ri2 * ri + rj2 * rj) / denom
}

/// HHG combining rule for well depths.
pub fn hhg_epsilon(eps_i: f64, eps_j: f64) -> f64 {
    let se = eps_i.sqrt() + eps_j.sqrt();
    if se <= 0.0 {
        return 0.0;
    }
    4.0 * (eps_i * eps_j) / (se * se)
}
