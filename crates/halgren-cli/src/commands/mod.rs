pub mod energy;
pub mod scan;

use crate::cli::InputArgs;
use crate::error::{CliError, Result};
use halgren::core::forcefield::params::Forcefield;
use halgren::core::io::system::{LoadedSystem, SystemFile};
use serde::Serialize;
use std::path::Path;
use tracing::info;

fn load_inputs(inputs: &InputArgs) -> Result<(LoadedSystem, Forcefield)> {
    info!("Loading system from {:?}", &inputs.input);
    let parse_error = |e: anyhow::Error| CliError::FileParsing {
        path: inputs.input.clone(),
        source: e,
    };
    let loaded = SystemFile::load(&inputs.input)
        .map_err(|e| parse_error(e.into()))?
        .into_system()
        .map_err(|e| parse_error(e.into()))?;
    info!(
        atoms = loaded.system.num_atoms(),
        periodic = !loaded.crystal.is_aperiodic(),
        born = loaded.born.is_some(),
        "System loaded."
    );

    info!("Loading force field from {:?}", &inputs.forcefield);
    let forcefield = Forcefield::load(&inputs.forcefield).map_err(|e| CliError::FileParsing {
        path: inputs.forcefield.clone(),
        source: e.into(),
    })?;
    Ok((loaded, forcefield))
}

fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let content = toml::to_string(report).map_err(|e| CliError::Other(e.into()))?;
    std::fs::write(path, content)?;
    info!("Results written to {:?}", path);
    Ok(())
}
