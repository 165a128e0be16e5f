//! TOML description of a molecular system for the non-bonded engine.
//!
//! This is an input format for driving the engine from the command line and
//! from tests, not a molecular structure file reader:
//!
//! ```toml
//! bonds = [[0, 1], [0, 2]]
//!
//! [crystal]
//! a = 24.0
//! b = 24.0
//! c = 24.0
//! space-group = "P21/c"
//!
//! [[atoms]]
//! name = "OW"
//! position = [0.0, 0.0, 0.0]
//! class = 1
//! ```
//!
//! A system without a `[crystal]` table is aperiodic.

use crate::core::crystal::{Crystal, CrystalError};
use crate::core::models::atom::Atom;
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Padding added to the coordinate span to size an aperiodic box.
const APERIODIC_PADDING: f64 = 24.0;
const DEFAULT_OVERLAP_SCALE: f64 = 0.69;

#[derive(Debug, Error)]
pub enum SystemLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid crystal: {0}")]
    Crystal(#[from] CrystalError),
    #[error("Bond ({0}, {1}) references a missing atom or joins an atom to itself")]
    InvalidBond(usize, usize),
    #[error("Inconsistent data: {0}")]
    Inconsistent(String),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CrystalSpec {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    #[serde(default = "right_angle")]
    pub alpha: f64,
    #[serde(default = "right_angle")]
    pub beta: f64,
    #[serde(default = "right_angle")]
    pub gamma: f64,
    #[serde(default = "default_space_group")]
    pub space_group: String,
}

fn right_angle() -> f64 {
    90.0
}

fn default_space_group() -> String {
    "P1".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AtomSpec {
    pub name: String,
    pub position: [f64; 3],
    #[serde(default)]
    pub class: Option<u32>,
    #[serde(default)]
    pub softcore: bool,
    #[serde(default)]
    pub hydrogen: bool,
    /// Base radius for descreening; needed only with Born data.
    #[serde(default)]
    pub base_radius: Option<f64>,
    #[serde(default)]
    pub overlap_scale: Option<f64>,
    #[serde(default)]
    pub born_radius: Option<f64>,
    #[serde(default)]
    pub born_gradient: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SystemFile {
    #[serde(default)]
    pub crystal: Option<CrystalSpec>,
    #[serde(default)]
    pub atoms: Vec<AtomSpec>,
    #[serde(default)]
    pub bonds: Vec<[usize; 2]>,
}

/// Per-atom inputs of the Born-radius chain-rule gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct BornData {
    pub base_radii: Vec<f64>,
    pub overlap_scales: Vec<f64>,
    pub born_radii: Vec<f64>,
    pub born_gradient: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LoadedSystem {
    pub system: MolecularSystem,
    pub crystal: Crystal,
    pub born: Option<BornData>,
}

impl SystemFile {
    pub fn load(path: &Path) -> Result<Self, SystemLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| SystemLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn parse(content: &str, origin: &str) -> Result<Self, SystemLoadError> {
        toml::from_str(content).map_err(|e| SystemLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })
    }

    /// Builds the molecular system, its crystal and optional Born data.
    pub fn into_system(self) -> Result<LoadedSystem, SystemLoadError> {
        let mut system = MolecularSystem::new();
        for spec in &self.atoms {
            let [x, y, z] = spec.position;
            let mut atom = Atom::new(&spec.name, Point3::new(x, y, z))
                .with_softcore(spec.softcore)
                .with_hydrogen(spec.hydrogen);
            atom.vdw_class = spec.class;
            system.add_atom(atom);
        }
        for &[i, j] in &self.bonds {
            system.add_bond(i, j).ok_or(SystemLoadError::InvalidBond(i, j))?;
        }

        let crystal = match &self.crystal {
            Some(c) => Crystal::new(c.a, c.b, c.c, c.alpha, c.beta, c.gamma, &c.space_group)?,
            None => Crystal::aperiodic(coordinate_span(&self.atoms) + APERIODIC_PADDING),
        };
        let born = born_data(&self.atoms)?;

        Ok(LoadedSystem {
            system,
            crystal,
            born,
        })
    }
}

fn coordinate_span(atoms: &[AtomSpec]) -> f64 {
    (0..3)
        .map(|axis| {
            let (lo, hi) = atoms.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(a.position[axis]), hi.max(a.position[axis]))
            });
            if hi >= lo { hi - lo } else { 0.0 }
        })
        .fold(0.0, f64::max)
}

fn born_data(atoms: &[AtomSpec]) -> Result<Option<BornData>, SystemLoadError> {
    let with_born = atoms
        .iter()
        .filter(|a| a.born_radius.is_some() || a.born_gradient.is_some())
        .count();
    if with_born == 0 {
        return Ok(None);
    }
    let mut data = BornData {
        base_radii: Vec::with_capacity(atoms.len()),
        overlap_scales: Vec::with_capacity(atoms.len()),
        born_radii: Vec::with_capacity(atoms.len()),
        born_gradient: Vec::with_capacity(atoms.len()),
    };
    for (index, atom) in atoms.iter().enumerate() {
        let (Some(base), Some(born), Some(grad)) = (atom.base_radius, atom.born_radius, atom.born_gradient)
        else {
            return Err(SystemLoadError::Inconsistent(format!(
                "atom {index} ({}) lacks base-radius, born-radius or born-gradient while other atoms define them",
                atom.name
            )));
        };
        data.base_radii.push(base);
        data.overlap_scales.push(atom.overlap_scale.unwrap_or(DEFAULT_OVERLAP_SCALE));
        data.born_radii.push(born);
        data.born_gradient.push(grad);
    }
    Ok(Some(data))
}
