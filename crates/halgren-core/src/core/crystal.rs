use nalgebra::{Matrix3, Point3, Vector3};
use phf::{Map, phf_map};
use thiserror::Error;

/// Symmetry-mate separations below this distance (Angstroms) flag a special position.
const SPECIAL_POSITION_CUTOFF: f64 = 0.3;
const DEFAULT_PERIODIC_VDW_CUTOFF: f64 = 9.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CrystalError {
    #[error("Invalid unit cell: {0}")]
    InvalidCell(String),
    #[error("Unknown space group '{0}'")]
    UnknownSpaceGroup(String),
}

/// Compile-time description of a symmetry operator in fractional coordinates.
#[derive(Debug)]
struct SymOpSpec {
    rot: [[f64; 3]; 3],
    tr: [f64; 3],
}

const IDENTITY: SymOpSpec = SymOpSpec {
    rot: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    tr: [0.0, 0.0, 0.0],
};

const P1: &[SymOpSpec] = &[IDENTITY];

const P_1: &[SymOpSpec] = &[
    IDENTITY,
    SymOpSpec {
        rot: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
        tr: [0.0, 0.0, 0.0],
    },
];

const P21: &[SymOpSpec] = &[
    IDENTITY,
    SymOpSpec {
        rot: [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
        tr: [0.0, 0.5, 0.0],
    },
];

const P21_C: &[SymOpSpec] = &[
    IDENTITY,
    SymOpSpec {
        rot: [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
        tr: [0.0, 0.5, 0.5],
    },
    SymOpSpec {
        rot: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
        tr: [0.0, 0.0, 0.0],
    },
    SymOpSpec {
        rot: [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
        tr: [0.0, 0.5, 0.5],
    },
];

const P212121: &[SymOpSpec] = &[
    IDENTITY,
    SymOpSpec {
        rot: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]],
        tr: [0.5, 0.0, 0.5],
    },
    SymOpSpec {
        rot: [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
        tr: [0.0, 0.5, 0.5],
    },
    SymOpSpec {
        rot: [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
        tr: [0.5, 0.5, 0.0],
    },
];

#[rustfmt::skip]
static SPACE_GROUPS: Map<&'static str, &'static [SymOpSpec]> = phf_map! {
    "P1" => P1,
    "P-1" => P_1,
    "P21" => P21, "P2(1)" => P21,
    "P21/c" => P21_C, "P2(1)/c" => P21_C,
    "P212121" => P212121, "P2(1)2(1)2(1)" => P212121,
};

/// A crystallographic symmetry operator acting on fractional coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymOp {
    pub rot: Matrix3<f64>,
    pub tr: Vector3<f64>,
}

impl SymOp {
    pub fn identity() -> Self {
        Self {
            rot: Matrix3::identity(),
            tr: Vector3::zeros(),
        }
    }

    fn from_spec(spec: &SymOpSpec) -> Self {
        let r = spec.rot;
        Self {
            rot: Matrix3::new(
                r[0][0], r[0][1], r[0][2], r[1][0], r[1][1], r[1][2], r[2][0], r[2][1], r[2][2],
            ),
            tr: Vector3::new(spec.tr[0], spec.tr[1], spec.tr[2]),
        }
    }

    #[inline]
    pub fn apply_fractional(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.rot * frac + self.tr
    }
}

/// Looks up the symmetry operators of a space group by its Hermann-Mauguin name.
///
/// The identity operator is always first.
pub fn space_group_ops(name: &str) -> Result<Vec<SymOp>, CrystalError> {
    let key = name.trim().replace(' ', "");
    SPACE_GROUPS
        .get(key.as_str())
        .map(|specs| specs.iter().map(SymOp::from_spec).collect())
        .ok_or_else(|| CrystalError::UnknownSpaceGroup(name.to_string()))
}

/// Periodic boundary conditions and space-group symmetry.
///
/// An aperiodic crystal has a single identity operator and never wraps
/// separation vectors; its nominal edge only seeds the default cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    space_group: String,
    aperiodic: bool,
    to_cartesian: Matrix3<f64>,
    to_fractional: Matrix3<f64>,
    sym_ops: Vec<SymOp>,
}

impl Crystal {
    /// Creates a periodic crystal; angles are in degrees.
    pub fn new(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        space_group: &str,
    ) -> Result<Self, CrystalError> {
        let sym_ops = space_group_ops(space_group)?;
        let (to_cartesian, to_fractional) = lattice_matrices(a, b, c, alpha, beta, gamma)?;
        Ok(Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            space_group: space_group.trim().to_string(),
            aperiodic: false,
            to_cartesian,
            to_fractional,
            sym_ops,
        })
    }

    /// Creates a non-periodic "crystal" for gas-phase systems.
    pub fn aperiodic(edge: f64) -> Self {
        let edge = edge.abs().max(1.0);
        Self {
            a: edge,
            b: edge,
            c: edge,
            alpha: 90.0,
            beta: 90.0,
            gamma: 90.0,
            space_group: "P1".to_string(),
            aperiodic: true,
            to_cartesian: Matrix3::identity() * edge,
            to_fractional: Matrix3::identity() / edge,
            sym_ops: vec![SymOp::identity()],
        }
    }

    #[inline]
    pub fn is_aperiodic(&self) -> bool {
        self.aperiodic
    }

    pub fn space_group(&self) -> &str {
        &self.space_group
    }

    #[inline]
    pub fn num_sym_ops(&self) -> usize {
        self.sym_ops.len()
    }

    pub fn sym_ops(&self) -> &[SymOp] {
        &self.sym_ops
    }

    pub fn special_position_cutoff(&self) -> f64 {
        SPECIAL_POSITION_CUTOFF
    }

    /// Unit cell volume in cubic Angstroms; `None` for aperiodic systems.
    pub fn volume(&self) -> Option<f64> {
        (!self.aperiodic).then(|| self.to_cartesian.determinant().abs())
    }

    /// Distances between opposite faces of the unit cell.
    pub fn perpendicular_widths(&self) -> [f64; 3] {
        let a = self.to_cartesian.column(0).into_owned();
        let b = self.to_cartesian.column(1).into_owned();
        let c = self.to_cartesian.column(2).into_owned();
        let volume = self.to_cartesian.determinant().abs();
        [
            volume / b.cross(&c).norm(),
            volume / c.cross(&a).norm(),
            volume / a.cross(&b).norm(),
        ]
    }

    /// Half of the narrowest perpendicular width; the largest radius for which
    /// the minimum-image convention is exact.
    pub fn max_image_radius(&self) -> f64 {
        if self.aperiodic {
            return f64::INFINITY;
        }
        let w = self.perpendicular_widths();
        0.5 * w[0].min(w[1]).min(w[2])
    }

    /// The van der Waals cutoff used when none is configured.
    pub fn default_vdw_cutoff(&self) -> f64 {
        if self.aperiodic {
            (self.a / 2.0 - 3.0).max(1.0)
        } else {
            DEFAULT_PERIODIC_VDW_CUTOFF
        }
    }

    #[inline]
    pub fn to_fractional(&self, xyz: &Point3<f64>) -> Vector3<f64> {
        self.to_fractional * xyz.coords
    }

    #[inline]
    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.to_cartesian * frac)
    }

    /// Applies a symmetry operator to a Cartesian position.
    #[inline]
    pub fn apply_sym_op(&self, xyz: &Point3<f64>, op: &SymOp) -> Point3<f64> {
        if self.aperiodic {
            return *xyz;
        }
        self.to_cartesian(&op.apply_fractional(&self.to_fractional(xyz)))
    }

    /// The Cartesian rotation `ToCart * Rot * ToFrac` of a symmetry operator.
    pub fn transformation_operator(&self, op: &SymOp) -> Matrix3<f64> {
        if self.aperiodic {
            return Matrix3::identity();
        }
        self.to_cartesian * op.rot * self.to_fractional
    }

    /// Replaces `dx` with its minimum image and returns its squared length.
    #[inline]
    pub fn image(&self, dx: &mut Vector3<f64>) -> f64 {
        if !self.aperiodic {
            let mut frac = self.to_fractional * *dx;
            frac.apply(|f| *f -= f.round());
            *dx = self.to_cartesian * frac;
        }
        dx.norm_squared()
    }

    /// Fractional coordinates wrapped into `[0, 1)`.
    pub fn wrapped_fractional(&self, xyz: &Point3<f64>) -> Vector3<f64> {
        let mut frac = self.to_fractional(xyz);
        frac.apply(|f| {
            *f -= f.floor();
            if *f >= 1.0 {
                *f = 0.0;
            }
        });
        frac
    }
}

fn lattice_matrices(
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> Result<(Matrix3<f64>, Matrix3<f64>), CrystalError> {
    if !(a > 0.0 && b > 0.0 && c > 0.0) {
        return Err(CrystalError::InvalidCell(format!(
            "cell lengths must be positive (a={a}, b={b}, c={c})"
        )));
    }
    let (ca, cb, cg) = (
        alpha.to_radians().cos(),
        beta.to_radians().cos(),
        gamma.to_radians().cos(),
    );
    let sg = gamma.to_radians().sin();
    if sg.abs() < 1e-8 {
        return Err(CrystalError::InvalidCell(format!("degenerate gamma {gamma}")));
    }
    let cx = c * cb;
    let cy = c * (ca - cb * cg) / sg;
    let cz2 = c * c - cx * cx - cy * cy;
    if cz2 <= 0.0 {
        return Err(CrystalError::InvalidCell(format!(
            "angles ({alpha}, {beta}, {gamma}) do not form a valid cell"
        )));
    }
    #[rustfmt::skip]
    let to_cartesian = Matrix3::new(
        a,   b * cg, cx,
        0.0, b * sg, cy,
        0.0, 0.0,    cz2.sqrt(),
    );
    let to_fractional = to_cartesian
        .try_inverse()
        .ok_or_else(|| CrystalError::InvalidCell("singular lattice matrix".to_string()))?;
    Ok((to_cartesian, to_fractional))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    #[test]
    fn cubic_cell_has_expected_volume_and_widths() {
        let crystal = Crystal::new(20.0, 20.0, 20.0, 90.0, 90.0, 90.0, "P1").unwrap();
        assert!((crystal.volume().unwrap() - 8000.0).abs() < 1e-8);
        for w in crystal.perpendicular_widths() {
            assert!((w - 20.0).abs() < TOLERANCE);
        }
        assert!((crystal.max_image_radius() - 10.0).abs() < TOLERANCE);
    }

    #[test]
    fn image_returns_minimum_image_separation() {
        let crystal = Crystal::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0, "P1").unwrap();
        let mut dx = Vector3::new(9.0, -6.0, 0.5);
        let r2 = crystal.image(&mut dx);
        assert!((dx.x + 1.0).abs() < TOLERANCE);
        assert!((dx.y - 4.0).abs() < TOLERANCE);
        assert!((r2 - (1.0 + 16.0 + 0.25)).abs() < TOLERANCE);
    }

    #[test]
    fn aperiodic_image_never_wraps() {
        let crystal = Crystal::aperiodic(30.0);
        let mut dx = Vector3::new(25.0, 0.0, 0.0);
        assert_eq!(crystal.image(&mut dx), 625.0);
        assert_eq!(dx.x, 25.0);
        assert!(crystal.volume().is_none());
        assert_eq!(crystal.num_sym_ops(), 1);
        assert!((crystal.default_vdw_cutoff() - 12.0).abs() < TOLERANCE);
    }

    #[test]
    fn triclinic_fractional_transform_is_consistent() {
        let crystal = Crystal::new(12.0, 14.0, 16.0, 80.0, 95.0, 105.0, "P1").unwrap();
        let p = Point3::new(1.5, -2.0, 7.25);
        let back = crystal.to_cartesian(&crystal.to_fractional(&p));
        assert!((back - p).norm() < 1e-10);
    }

    #[test]
    fn p21_transformation_operator_is_cartesian_rotation_for_orthogonal_cells() {
        let crystal = Crystal::new(10.0, 12.0, 14.0, 90.0, 90.0, 90.0, "P21").unwrap();
        let op = crystal.sym_ops()[1];
        let t = crystal.transformation_operator(&op);
        assert!((t - op.rot).norm() < TOLERANCE);

        let p = Point3::new(1.0, 2.0, 3.0);
        let mate = crystal.apply_sym_op(&p, &op);
        assert!((mate - Point3::new(-1.0, 8.0, -3.0)).norm() < TOLERANCE);
    }

    #[test]
    fn space_group_lookup_puts_identity_first() {
        for name in ["P1", "P-1", "P21", "P21/c", "P212121", "P 21 21 21"] {
            let ops = space_group_ops(name).unwrap();
            assert_eq!(ops[0], SymOp::identity(), "space group {name}");
        }
        assert_eq!(space_group_ops("P212121").unwrap().len(), 4);
    }

    #[test]
    fn unknown_space_group_is_rejected() {
        let result = Crystal::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0, "Fd-3m");
        assert!(matches!(result, Err(CrystalError::UnknownSpaceGroup(_))));
    }

    #[test]
    fn invalid_angles_are_rejected() {
        let result = Crystal::new(10.0, 10.0, 10.0, 10.0, 170.0, 90.0, "P1");
        assert!(matches!(result, Err(CrystalError::InvalidCell(_))));
    }

    #[test]
    fn wrapped_fractional_lies_in_unit_interval() {
        let crystal = Crystal::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0, "P1").unwrap();
        let f = crystal.wrapped_fractional(&Point3::new(-0.5, 10.5, 35.0));
        assert!((f.x - 0.95).abs() < TOLERANCE);
        assert!((f.y - 0.05).abs() < TOLERANCE);
        assert!((f.z - 0.5).abs() < TOLERANCE);
    }
}
