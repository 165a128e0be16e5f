use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Per-class van der Waals parameters of the buffered 14-7 potential.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct VdwClassParam {
    pub class: u32,
    /// Minimum-energy diameter (R-min) in Angstroms.
    pub radius: f64,
    pub well_depth: f64,
    /// Hydrogen reduction factor; 0 disables reduction.
    #[serde(default)]
    pub reduction: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct ForcefieldFile {
    #[serde(default)]
    vdw: Vec<VdwClassParam>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forcefield {
    vdw: HashMap<u32, VdwClassParam>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
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
    #[error("Invalid parameter for vdW class {class} in '{path}': {reason}")]
    InvalidValue {
        path: String,
        class: u32,
        reason: String,
    },
    #[error("Duplicate vdW class {class} in '{path}'")]
    DuplicateClass { path: String, class: u32 },
}

impl Forcefield {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    /// Parses parameter TOML; `origin` only labels errors.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ParamLoadError> {
        let file: ForcefieldFile = toml::from_str(content).map_err(|e| ParamLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        Self::from_params(file.vdw, origin)
    }

    pub fn from_params(
        params: impl IntoIterator<Item = VdwClassParam>,
        origin: &str,
    ) -> Result<Self, ParamLoadError> {
        let mut vdw = HashMap::new();
        for param in params {
            validate(&param, origin)?;
            let class = param.class;
            if vdw.insert(class, param).is_some() {
                return Err(ParamLoadError::DuplicateClass {
                    path: origin.to_string(),
                    class,
                });
            }
        }
        Ok(Self { vdw })
    }

    pub fn vdw(&self, class: u32) -> Option<&VdwClassParam> {
        self.vdw.get(&class)
    }

    /// All classes, sorted ascending.
    pub fn vdw_classes(&self) -> Vec<u32> {
        let mut classes: Vec<u32> = self.vdw.keys().copied().collect();
        classes.sort_unstable();
        classes
    }

    pub fn num_vdw_classes(&self) -> usize {
        self.vdw.len()
    }
}

fn validate(param: &VdwClassParam, origin: &str) -> Result<(), ParamLoadError> {
    let invalid = |reason: String| ParamLoadError::InvalidValue {
        path: origin.to_string(),
        class: param.class,
        reason,
    };
    if !(param.radius.is_finite() && param.radius > 0.0) {
        return Err(invalid(format!("radius must be positive, got {}", param.radius)));
    }
    if !(param.well_depth.is_finite() && param.well_depth >= 0.0) {
        return Err(invalid(format!(
            "well depth must be non-negative, got {}",
            param.well_depth
        )));
    }
    if !(0.0..1.0).contains(&param.reduction) {
        return Err(invalid(format!(
            "reduction factor must lie in [0, 1), got {}",
            param.reduction
        )));
    }
    Ok(())
}
